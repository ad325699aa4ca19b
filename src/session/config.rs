//! Per-session configuration and its persistence.
//!
//! Configuration is a flat JSON document per session, merged over built-in
//! defaults at load time. Plain environment overrides live in a sibling
//! document; secret-valued overrides go to a [`SecretStore`] and never
//! touch disk in the clear.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::SessionId;
use crate::error::RelayError;
use crate::Result;

/// Default coarse idle timeout: 45 minutes.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 45 * 60;

/// Secret keys surfaced by listing operations.
///
/// Secret backends cannot be enumerated portably, so listing relies on this
/// fixed allow-list; secrets stored under other names exist but are not
/// listed.
pub const SENSITIVE_KEYS: &[&str] = &["AGENT_API_TOKEN"];

/// Environment variable naming an agent binary override.
pub const AGENT_BIN_ENV: &str = "TUI_RELAY_AGENT";

static SENSITIVE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)TOKEN|SECRET|KEY|PASSWORD").expect("sensitive pattern"));

/// Per-session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Workspace root the agent operates in; also the child's working
    /// directory.
    pub workspace_root: Option<PathBuf>,
    /// Model name passed to the agent.
    pub model: Option<String>,
    /// Rules file passed to the agent.
    pub rules: Option<PathBuf>,
    /// Explicit agent binary path.
    pub agent_bin: Option<PathBuf>,
    /// Whether every submitted turn runs through the prompt enhancer.
    pub enhancer_default: bool,
    /// Coarse idle timeout in seconds.
    pub idle_timeout_secs: u64,
    /// Terminal columns.
    pub cols: u16,
    /// Terminal rows.
    pub rows: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            workspace_root: None,
            model: None,
            rules: None,
            agent_bin: None,
            enhancer_default: true,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            cols: 120,
            rows: 30,
        }
    }
}

/// Persistence seam for session configuration and plain env overrides.
pub trait ConfigStore: Send + Sync {
    /// Load the persisted config for `id`, or a copy of `defaults` when
    /// nothing has been persisted yet.
    fn load(&self, id: &SessionId, defaults: &SessionConfig) -> Result<SessionConfig>;

    /// Persist the config for `id`.
    fn persist(&self, id: &SessionId, config: &SessionConfig) -> Result<()>;

    /// All plain (non-secret) env overrides for `id`.
    fn plain_env(&self, id: &SessionId) -> Result<HashMap<String, String>>;

    /// Set one plain env override.
    fn set_plain_env(&self, id: &SessionId, key: &str, value: &str) -> Result<()>;

    /// Remove one plain env override, if present.
    fn remove_plain_env(&self, id: &SessionId, key: &str) -> Result<()>;
}

/// Storage seam for secret-valued env overrides.
///
/// The in-memory implementation below is the default; an OS keychain
/// backing fits behind the same trait.
pub trait SecretStore: Send + Sync {
    fn get(&self, id: &SessionId, key: &str) -> Result<Option<String>>;
    fn set(&self, id: &SessionId, key: &str, value: &str) -> Result<()>;
    fn delete(&self, id: &SessionId, key: &str) -> Result<()>;
}

/// JSON-file config store: `<dir>/<id>.json` for config,
/// `<dir>/<id>.env.json` for plain env overrides.
pub struct JsonConfigStore {
    dir: PathBuf,
}

impl JsonConfigStore {
    /// Create a store rooted at `dir`. The directory is created lazily on
    /// first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn config_path(&self, id: &SessionId) -> PathBuf {
        self.dir.join(format!("{}.json", id.as_str()))
    }

    fn env_path(&self, id: &SessionId) -> PathBuf {
        self.dir.join(format!("{}.env.json", id.as_str()))
    }

    fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    fn write_env(&self, id: &SessionId, env: &HashMap<String, String>) -> Result<()> {
        self.ensure_dir()?;
        let json = serde_json::to_string_pretty(env)?;
        std::fs::write(self.env_path(id), json)?;
        Ok(())
    }
}

impl ConfigStore for JsonConfigStore {
    fn load(&self, id: &SessionId, defaults: &SessionConfig) -> Result<SessionConfig> {
        let path = self.config_path(id);
        if !path.exists() {
            return Ok(defaults.clone());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn persist(&self, id: &SessionId, config: &SessionConfig) -> Result<()> {
        self.ensure_dir()?;
        let json = serde_json::to_string_pretty(config)?;
        std::fs::write(self.config_path(id), json)?;
        Ok(())
    }

    fn plain_env(&self, id: &SessionId) -> Result<HashMap<String, String>> {
        let path = self.env_path(id);
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn set_plain_env(&self, id: &SessionId, key: &str, value: &str) -> Result<()> {
        let mut env = self.plain_env(id)?;
        env.insert(key.to_string(), value.to_string());
        self.write_env(id, &env)
    }

    fn remove_plain_env(&self, id: &SessionId, key: &str) -> Result<()> {
        let mut env = self.plain_env(id)?;
        if env.remove(key).is_some() {
            self.write_env(id, &env)?;
        }
        Ok(())
    }
}

/// Process-local secret store.
pub struct MemorySecretStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entry_key(id: &SessionId, key: &str) -> String {
        format!("{}:{}", id.as_str(), key)
    }
}

impl Default for MemorySecretStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, id: &SessionId, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().map_err(|_| RelayError::LockPoisoned)?;
        Ok(entries.get(&Self::entry_key(id, key)).cloned())
    }

    fn set(&self, id: &SessionId, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| RelayError::LockPoisoned)?;
        entries.insert(Self::entry_key(id, key), value.to_string());
        Ok(())
    }

    fn delete(&self, id: &SessionId, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| RelayError::LockPoisoned)?;
        entries.remove(&Self::entry_key(id, key));
        Ok(())
    }
}

/// Whether an env key name looks secret-valued.
pub fn is_sensitive(key: &str) -> bool {
    SENSITIVE_NAME.is_match(key)
}

/// Redact a value for listing: short values become stars, longer ones keep
/// the first and last two characters.
pub fn redact(value: &str) -> String {
    let count = value.chars().count();
    if count <= 6 {
        "*".repeat(count)
    } else {
        let head: String = value.chars().take(2).collect();
        let tail: String = value.chars().skip(count - 2).collect();
        format!("{head}***{tail}")
    }
}

/// Build the child environment as an explicit ordered merge: inherited
/// process env, then persisted plain overrides, then secret overrides.
///
/// The result is passed into spawn as a value; ambient env is never
/// mutated.
pub fn combined_env(
    config_store: &dyn ConfigStore,
    secret_store: &dyn SecretStore,
    id: &SessionId,
) -> Result<HashMap<String, String>> {
    let mut env: HashMap<String, String> = std::env::vars().collect();
    env.extend(config_store.plain_env(id)?);
    for key in SENSITIVE_KEYS {
        if let Some(value) = secret_store.get(id, key)? {
            env.insert((*key).to_string(), value);
        }
    }
    Ok(env)
}

/// Resolve the agent binary: config override, then the `TUI_RELAY_AGENT`
/// env var, then the bare name on PATH.
pub fn resolve_agent_bin(config: &SessionConfig) -> PathBuf {
    if let Some(bin) = &config.agent_bin {
        if bin.exists() {
            return bin.clone();
        }
    }
    if let Ok(env_bin) = std::env::var(AGENT_BIN_ENV) {
        let path = PathBuf::from(&env_bin);
        if path.exists() {
            return path;
        }
    }
    PathBuf::from("agent")
}

/// Spawn arguments derived from configuration.
pub fn agent_args(config: &SessionConfig) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(root) = &config.workspace_root {
        args.push("--workspace-root".to_string());
        args.push(root.display().to_string());
    }
    if let Some(rules) = &config.rules {
        args.push("--rules".to_string());
        args.push(rules.display().to_string());
    }
    if let Some(model) = &config.model {
        args.push("--model".to_string());
        args.push(model.clone());
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, JsonConfigStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonConfigStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert!(config.enhancer_default);
        assert_eq!(config.idle_timeout_secs, DEFAULT_IDLE_TIMEOUT_SECS);
        assert_eq!(config.cols, 120);
        assert_eq!(config.rows, 30);
        assert!(config.workspace_root.is_none());
    }

    #[test]
    fn test_load_missing_returns_defaults() {
        let (_dir, store) = store();
        let id = SessionId::new("chan-1");
        let mut defaults = SessionConfig::default();
        defaults.model = Some("sonnet".into());

        let loaded = store.load(&id, &defaults).unwrap();
        assert_eq!(loaded.model.as_deref(), Some("sonnet"));
    }

    #[test]
    fn test_persist_and_load_round_trip() {
        let (_dir, store) = store();
        let id = SessionId::new("chan-2");

        let mut config = SessionConfig::default();
        config.workspace_root = Some(PathBuf::from("/tmp/project"));
        config.idle_timeout_secs = 120;
        store.persist(&id, &config).unwrap();

        let loaded = store.load(&id, &SessionConfig::default()).unwrap();
        assert_eq!(loaded.workspace_root, Some(PathBuf::from("/tmp/project")));
        assert_eq!(loaded.idle_timeout_secs, 120);
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let (dir, store) = store();
        let id = SessionId::new("chan-3");
        std::fs::write(
            dir.path().join("chan-3.json"),
            r#"{ "model": "opus" }"#,
        )
        .unwrap();

        let loaded = store.load(&id, &SessionConfig::default()).unwrap();
        assert_eq!(loaded.model.as_deref(), Some("opus"));
        assert_eq!(loaded.cols, 120);
        assert!(loaded.enhancer_default);
    }

    #[test]
    fn test_plain_env_round_trip() {
        let (_dir, store) = store();
        let id = SessionId::new("chan-4");

        assert!(store.plain_env(&id).unwrap().is_empty());
        store.set_plain_env(&id, "HTTP_PROXY", "http://proxy:8080").unwrap();
        store.set_plain_env(&id, "NO_COLOR", "1").unwrap();
        store.remove_plain_env(&id, "NO_COLOR").unwrap();

        let env = store.plain_env(&id).unwrap();
        assert_eq!(env.len(), 1);
        assert_eq!(env.get("HTTP_PROXY").map(String::as_str), Some("http://proxy:8080"));
    }

    #[test]
    fn test_memory_secret_store() {
        let store = MemorySecretStore::new();
        let id = SessionId::new("chan-5");

        assert!(store.get(&id, "AGENT_API_TOKEN").unwrap().is_none());
        store.set(&id, "AGENT_API_TOKEN", "tok-123").unwrap();
        assert_eq!(
            store.get(&id, "AGENT_API_TOKEN").unwrap().as_deref(),
            Some("tok-123")
        );

        // Scoped per session
        let other = SessionId::new("chan-6");
        assert!(store.get(&other, "AGENT_API_TOKEN").unwrap().is_none());

        store.delete(&id, "AGENT_API_TOKEN").unwrap();
        assert!(store.get(&id, "AGENT_API_TOKEN").unwrap().is_none());
    }

    #[test]
    fn test_is_sensitive() {
        assert!(is_sensitive("AGENT_API_TOKEN"));
        assert!(is_sensitive("my_secret"));
        assert!(is_sensitive("SSH_KEY"));
        assert!(is_sensitive("db_password"));
        assert!(!is_sensitive("HTTP_PROXY"));
        assert!(!is_sensitive("PATH"));
    }

    #[test]
    fn test_redact() {
        assert_eq!(redact("abc"), "***");
        assert_eq!(redact("abcdef"), "******");
        assert_eq!(redact("abcdefg"), "ab***fg");
        assert_eq!(redact("tok-1234567890"), "to***90");
    }

    #[test]
    fn test_combined_env_precedence() {
        let (_dir, config_store) = store();
        let secret_store = MemorySecretStore::new();
        let id = SessionId::new("chan-7");

        config_store
            .set_plain_env(&id, "AGENT_API_TOKEN", "plain-copy")
            .unwrap();
        secret_store.set(&id, "AGENT_API_TOKEN", "secret-copy").unwrap();

        let env = combined_env(&config_store, &secret_store, &id).unwrap();
        // Secret overrides win over plain overrides
        assert_eq!(
            env.get("AGENT_API_TOKEN").map(String::as_str),
            Some("secret-copy")
        );
        // Inherited ambient env is present underneath
        assert!(env.contains_key("PATH") || env.len() > 1);
    }

    #[test]
    fn test_agent_args_from_config() {
        let mut config = SessionConfig::default();
        assert!(agent_args(&config).is_empty());

        config.workspace_root = Some(PathBuf::from("/work"));
        config.model = Some("opus".into());
        let args = agent_args(&config);
        assert_eq!(args, vec!["--workspace-root", "/work", "--model", "opus"]);
    }

    #[test]
    fn test_resolve_agent_bin_falls_back_to_path_name() {
        let config = SessionConfig {
            agent_bin: Some(PathBuf::from("/definitely/not/here")),
            ..Default::default()
        };
        // Nonexistent override is ignored
        assert_eq!(resolve_agent_bin(&config), PathBuf::from("agent"));
    }

    #[test]
    #[cfg(unix)]
    fn test_resolve_agent_bin_prefers_existing_override() {
        let config = SessionConfig {
            agent_bin: Some(PathBuf::from("/bin/cat")),
            ..Default::default()
        };
        assert_eq!(resolve_agent_bin(&config), PathBuf::from("/bin/cat"));
    }
}
