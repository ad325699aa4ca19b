//! Session lifecycle manager: the registry of live sessions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::config::{is_sensitive, redact, ConfigStore, SecretStore, SENSITIVE_KEYS};
use super::session::{Session, SessionInfo};
use super::{SessionConfig, SessionId};
use crate::error::RelayError;
use crate::Result;

/// Registry of live sessions, one per conversation, with their coarse
/// idle-timeout timers.
///
/// Sessions are created lazily on first access and removed on explicit stop
/// or when their idle timer fires. The idle timer is armed once at creation
/// and is not re-armed by activity.
pub struct SessionManager {
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
    idle_timers: Mutex<HashMap<SessionId, JoinHandle<()>>>,
    config_store: Arc<dyn ConfigStore>,
    secret_store: Arc<dyn SecretStore>,
    defaults: SessionConfig,
}

impl SessionManager {
    /// Create a manager with built-in default configuration.
    pub fn new(
        config_store: Arc<dyn ConfigStore>,
        secret_store: Arc<dyn SecretStore>,
    ) -> Arc<Self> {
        Self::with_defaults(config_store, secret_store, SessionConfig::default())
    }

    /// Create a manager whose new sessions start from `defaults`.
    pub fn with_defaults(
        config_store: Arc<dyn ConfigStore>,
        secret_store: Arc<dyn SecretStore>,
        defaults: SessionConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timers: Mutex::new(HashMap::new()),
            config_store,
            secret_store,
            defaults,
        })
    }

    /// The session for `id` if one is currently live.
    pub fn peek(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.read().ok()?.get(id).cloned()
    }

    /// Number of live sessions.
    pub fn count(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Get the session for `id`, creating and starting it if absent.
    ///
    /// Creation loads persisted configuration merged over the defaults,
    /// arms the coarse idle timer, and spawns the agent process. A spawn
    /// failure leaves the session absent.
    pub fn get_or_start(self: &Arc<Self>, id: &SessionId) -> Result<Arc<Session>> {
        if let Some(existing) = self.peek(id) {
            return Ok(existing);
        }

        let config = self.config_store.load(id, &self.defaults)?;
        let idle_secs = config.idle_timeout_secs;
        let session = Arc::new(Session::new(
            id.clone(),
            config,
            Arc::clone(&self.config_store),
            Arc::clone(&self.secret_store),
        ));

        {
            let mut sessions = self.sessions.write().map_err(|_| RelayError::LockPoisoned)?;
            if let Some(existing) = sessions.get(id) {
                return Ok(Arc::clone(existing));
            }
            sessions.insert(id.clone(), Arc::clone(&session));
        }

        self.arm_idle_timer(id, idle_secs)?;

        if let Err(e) = session.start() {
            // Spawn failed: the session is treated as absent
            if let Ok(mut sessions) = self.sessions.write() {
                sessions.remove(id);
            }
            self.cancel_idle_timer(id);
            return Err(e);
        }

        Ok(session)
    }

    /// Stop the session for `id` and remove it from the registry.
    ///
    /// A no-op when the session is absent.
    pub async fn stop(&self, id: &SessionId) -> Result<()> {
        let session = {
            let mut sessions = self.sessions.write().map_err(|_| RelayError::LockPoisoned)?;
            sessions.remove(id)
        };
        if let Some(session) = session {
            session.shutdown().await?;
        }
        self.cancel_idle_timer(id);
        Ok(())
    }

    /// Observable state for `id`, starting the session if needed.
    pub fn info(self: &Arc<Self>, id: &SessionId) -> Result<SessionInfo> {
        self.get_or_start(id)?.info()
    }

    /// Persist the live session's configuration, if the session exists.
    pub fn persist(&self, id: &SessionId) -> Result<()> {
        if let Some(session) = self.peek(id) {
            self.config_store.persist(id, &session.config()?)?;
        }
        Ok(())
    }

    /// Set an env override for the session's agent process.
    ///
    /// Secret-flagged values, and values whose key name looks sensitive, go
    /// to the secret store; any plain copy of the same key is removed so a
    /// secret never has a clear-text shadow.
    pub fn set_env(&self, id: &SessionId, key: &str, value: &str, secret: bool) -> Result<()> {
        if secret || is_sensitive(key) {
            self.secret_store.set(id, key, value)?;
            self.config_store.remove_plain_env(id, key)?;
        } else {
            self.config_store.set_plain_env(id, key, value)?;
        }

        // Make sure a config document exists alongside the overrides
        let config = self.config_store.load(id, &self.defaults)?;
        self.config_store.persist(id, &config)?;

        if let Some(session) = self.peek(id) {
            session.start()?;
        }
        Ok(())
    }

    /// Remove an env override from both stores.
    pub fn unset_env(&self, id: &SessionId, key: &str) -> Result<()> {
        self.secret_store.delete(id, key)?;
        self.config_store.remove_plain_env(id, key)
    }

    /// List env overrides with redacted values.
    ///
    /// Secrets are surfaced from the fixed sensitive-key allow-list only;
    /// secrets stored under other names are not listed.
    pub fn list_env(&self, id: &SessionId) -> Result<Vec<(String, String)>> {
        let plain = self.config_store.plain_env(id)?;
        let mut entries: Vec<(String, String)> = plain
            .into_iter()
            .map(|(key, value)| (key, redact(&value)))
            .collect();
        entries.sort();

        for key in SENSITIVE_KEYS {
            if let Some(value) = self.secret_store.get(id, key)? {
                entries.push(((*key).to_string(), redact(&value)));
            }
        }
        Ok(entries)
    }

    fn arm_idle_timer(self: &Arc<Self>, id: &SessionId, secs: u64) -> Result<()> {
        let manager = Arc::clone(self);
        let timer_id = id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            info!(session = %timer_id, "idle timeout reached, stopping session");
            if let Err(e) = manager.stop(&timer_id).await {
                debug!(session = %timer_id, error = %e, "idle stop failed");
            }
        });

        let mut timers = self.idle_timers.lock().map_err(|_| RelayError::LockPoisoned)?;
        if let Some(previous) = timers.insert(id.clone(), handle) {
            previous.abort();
        }
        Ok(())
    }

    fn cancel_idle_timer(&self, id: &SessionId) {
        if let Ok(mut timers) = self.idle_timers.lock() {
            if let Some(timer) = timers.remove(id) {
                timer.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{JsonConfigStore, MemorySecretStore};
    use tempfile::TempDir;

    fn manager() -> (TempDir, Arc<SessionManager>) {
        let dir = TempDir::new().unwrap();
        let manager = SessionManager::new(
            Arc::new(JsonConfigStore::new(dir.path())),
            Arc::new(MemorySecretStore::new()),
        );
        (dir, manager)
    }

    #[tokio::test]
    async fn test_peek_absent() {
        let (_dir, manager) = manager();
        assert!(manager.peek(&SessionId::new("nope")).is_none());
        assert_eq!(manager.count(), 0);
    }

    #[tokio::test]
    async fn test_stop_absent_is_noop() {
        let (_dir, manager) = manager();
        assert!(manager.stop(&SessionId::new("nope")).await.is_ok());
    }

    #[tokio::test]
    async fn test_plain_env_set_and_list() {
        let (_dir, manager) = manager();
        let id = SessionId::new("chan-env");

        manager.set_env(&id, "HTTP_PROXY", "http://proxy:8080", false).unwrap();
        let listed = manager.list_env(&id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].0, "HTTP_PROXY");
        // Value is redacted, not echoed
        assert_ne!(listed[0].1, "http://proxy:8080");
    }

    #[tokio::test]
    async fn test_sensitive_env_routed_to_secret_store() {
        let (_dir, manager) = manager();
        let id = SessionId::new("chan-secret");

        // Key name alone triggers secret routing
        manager.set_env(&id, "AGENT_API_TOKEN", "tok-12345678", false).unwrap();

        // Nothing in the plain document
        assert!(manager.config_store.plain_env(&id).unwrap().is_empty());

        // Listed via the allow-list, redacted
        let listed = manager.list_env(&id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].0, "AGENT_API_TOKEN");
        assert_eq!(listed[0].1, "to***78");
    }

    #[tokio::test]
    async fn test_secret_set_removes_plain_shadow() {
        let (_dir, manager) = manager();
        let id = SessionId::new("chan-shadow");

        manager.config_store.set_plain_env(&id, "AGENT_API_TOKEN", "old").unwrap();
        manager.set_env(&id, "AGENT_API_TOKEN", "new-value", true).unwrap();

        assert!(manager.config_store.plain_env(&id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unset_env_clears_both_stores() {
        let (_dir, manager) = manager();
        let id = SessionId::new("chan-unset");

        manager.set_env(&id, "HTTP_PROXY", "x", false).unwrap();
        manager.set_env(&id, "AGENT_API_TOKEN", "y12345678", true).unwrap();
        manager.unset_env(&id, "HTTP_PROXY").unwrap();
        manager.unset_env(&id, "AGENT_API_TOKEN").unwrap();

        assert!(manager.list_env(&id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unlisted_secret_names_are_missed() {
        let (_dir, manager) = manager();
        let id = SessionId::new("chan-unlisted");

        // Goes to the secret store via name detection, but the listing
        // allow-list does not know this key
        manager.set_env(&id, "OTHER_SECRET", "hidden-value", false).unwrap();
        assert!(manager.list_env(&id).unwrap().is_empty());
    }
}
