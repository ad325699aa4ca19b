//! One relay session: an agent process plus its ingestion pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::{agent_args, combined_env, resolve_agent_bin, ConfigStore, SecretStore};
use super::{SessionConfig, SessionId, SessionState};
use crate::error::RelayError;
use crate::pty::{AgentCommand, AgentPty, PtySize};
use crate::relay::{spawn_read_pump, spawn_stream, PresentationSink, RelayPipeline};
use crate::Result;

/// Grace period between the interrupt signal and force-kill during stop.
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(750);

/// Delay between writing turn text and the submitting carriage return,
/// giving the TUI time to settle the input box.
pub const SUBMIT_DELAY: Duration = Duration::from_millis(600);

/// Control byte that toggles the agent's prompt enhancer.
const ENHANCE_KEY: &str = "\x10";

/// Snapshot of a session's observable state.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub pid: Option<u32>,
    pub state: SessionState,
    pub workspace_root: Option<std::path::PathBuf>,
    pub model: Option<String>,
    pub rules: Option<std::path::PathBuf>,
    pub enhancer_default: bool,
    pub idle_timeout_secs: u64,
    pub cols: u16,
    pub rows: u16,
    /// Milliseconds since the agent last produced output.
    pub idle_ms: u128,
}

/// A relay session: owns at most one live agent process and the pipeline
/// that turns its terminal output into chat messages.
pub struct Session {
    id: SessionId,
    config: Mutex<SessionConfig>,
    state: Mutex<SessionState>,
    process: Mutex<Option<crate::pty::AgentProcess>>,
    pipeline: Arc<RelayPipeline>,
    stream_task: Mutex<Option<JoinHandle<()>>>,
    enhance_once: AtomicBool,
    config_store: Arc<dyn ConfigStore>,
    secret_store: Arc<dyn SecretStore>,
}

impl Session {
    /// Create a stopped session. The process starts on
    /// [`start`](Self::start) or the first [`send`](Self::send).
    pub fn new(
        id: SessionId,
        config: SessionConfig,
        config_store: Arc<dyn ConfigStore>,
        secret_store: Arc<dyn SecretStore>,
    ) -> Self {
        Self {
            id,
            config: Mutex::new(config),
            state: Mutex::new(SessionState::Starting),
            process: Mutex::new(None),
            pipeline: Arc::new(RelayPipeline::new()),
            stream_task: Mutex::new(None),
            enhance_once: AtomicBool::new(false),
            config_store,
            secret_store,
        }
    }

    /// The session's identifier.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// The relay pipeline owned by this session.
    pub fn pipeline(&self) -> &Arc<RelayPipeline> {
        &self.pipeline
    }

    /// A copy of the current configuration.
    pub fn config(&self) -> Result<SessionConfig> {
        Ok(self
            .config
            .lock()
            .map_err(|_| RelayError::LockPoisoned)?
            .clone())
    }

    /// Start the agent process if it is not already live.
    pub fn start(&self) -> Result<()> {
        let mut process_guard = self.process.lock().map_err(|_| RelayError::LockPoisoned)?;
        if let Some(process) = process_guard.as_ref() {
            if process.is_alive() {
                return Ok(());
            }
        }

        let config = self.config()?;
        {
            let mut state = self.state.lock().map_err(|_| RelayError::LockPoisoned)?;
            let _ = state.transition_to(SessionState::Starting);
        }

        let env = combined_env(self.config_store.as_ref(), self.secret_store.as_ref(), &self.id)?;
        let command = AgentCommand {
            program: resolve_agent_bin(&config),
            args: agent_args(&config),
            cwd: config
                .workspace_root
                .clone()
                .or_else(|| std::env::current_dir().ok())
                .unwrap_or_else(|| std::path::PathBuf::from(".")),
            env,
        };

        let pty = AgentPty::new();
        let spawned = pty.spawn(&command, PtySize::new(config.rows, config.cols))?;
        spawn_read_pump(
            spawned.reader,
            self.pipeline.buffer(),
            spawned.process.exited_flag(),
        );

        info!(session = %self.id, pid = spawned.process.pid(), "agent process started");
        *process_guard = Some(spawned.process);

        let mut state = self.state.lock().map_err(|_| RelayError::LockPoisoned)?;
        let _ = state.transition_to(SessionState::Running);
        Ok(())
    }

    /// Stop the agent process: interrupt, wait out the grace period, then
    /// force-kill if it is still alive. Best-effort throughout.
    pub async fn stop_process(&self) -> Result<()> {
        let process = {
            let mut guard = self.process.lock().map_err(|_| RelayError::LockPoisoned)?;
            guard.take()
        };
        let Some(process) = process else {
            return Ok(());
        };

        {
            let mut state = self.state.lock().map_err(|_| RelayError::LockPoisoned)?;
            let _ = state.transition_to(SessionState::Stopping);
        }

        if let Err(e) = process.interrupt() {
            debug!(session = %self.id, error = %e, "interrupt write failed");
        }
        tokio::time::sleep(SHUTDOWN_GRACE).await;
        if process.is_alive() {
            if let Err(e) = process.kill() {
                warn!(session = %self.id, error = %e, "force-kill failed");
            }
        }
        info!(session = %self.id, "agent process stopped");
        Ok(())
    }

    /// Full teardown: cancel the streaming timer and stop the process.
    pub async fn shutdown(&self) -> Result<()> {
        self.detach_streaming()?;
        self.stop_process().await
    }

    /// Cancel the streaming timer, if one is attached.
    pub fn detach_streaming(&self) -> Result<()> {
        let mut guard = self
            .stream_task
            .lock()
            .map_err(|_| RelayError::LockPoisoned)?;
        if let Some(task) = guard.take() {
            task.abort();
        }
        Ok(())
    }

    /// Attach a streaming consumer. Any previously attached timer is
    /// cancelled and replaced.
    pub fn attach_streaming(&self, sink: Arc<dyn PresentationSink>) -> Result<()> {
        let handle = spawn_stream(Arc::clone(&self.pipeline), sink);
        let mut guard = self
            .stream_task
            .lock()
            .map_err(|_| RelayError::LockPoisoned)?;
        if let Some(previous) = guard.replace(handle) {
            previous.abort();
        }
        Ok(())
    }

    /// Submit a new turn: write `text` to the agent's terminal and press
    /// return after a short settle delay.
    ///
    /// Begins a new turn first, so the rolling transcript restarts and
    /// finalization is re-armed.
    pub fn send(&self, text: &str) -> Result<()> {
        self.start()?;
        self.pipeline.begin_turn();

        let process = self.current_process()?;
        process.write(text)?;

        let one_shot = self.enhance_once.swap(false, Ordering::SeqCst);
        let enhance = self.config()?.enhancer_default || one_shot;
        if enhance {
            process.write(ENHANCE_KEY)?;
        }

        let deferred = process.clone();
        let id = self.id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(SUBMIT_DELAY).await;
            if let Err(e) = deferred.write("\r") {
                debug!(session = %id, error = %e, "deferred submit failed");
            }
        });
        Ok(())
    }

    /// Press return without new text (submit whatever is in the input box).
    pub fn submit(&self) -> Result<()> {
        self.start()?;
        self.current_process()?.write("\r")
    }

    /// Run the next [`send`](Self::send) through the prompt enhancer even
    /// when the session default is off.
    pub fn enhance_next(&self) {
        self.enhance_once.store(true, Ordering::SeqCst);
    }

    /// Resize the terminal and persist the new dimensions.
    pub fn resize(&self, cols: u16, rows: u16) -> Result<()> {
        let config = {
            let mut guard = self.config.lock().map_err(|_| RelayError::LockPoisoned)?;
            guard.cols = cols;
            guard.rows = rows;
            guard.clone()
        };
        if let Ok(process) = self.current_process() {
            process.resize(cols, rows)?;
        }
        self.config_store.persist(&self.id, &config)
    }

    /// Switch models: best-effort in-TUI command, then persist so restarts
    /// pick the model up via the spawn flag.
    pub fn set_model(&self, name: &str) -> Result<()> {
        self.start()?;
        let process = self.current_process()?;
        process.write(&format!("/model {name}"))?;

        let deferred = process.clone();
        let id = self.id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if let Err(e) = deferred.write("\r") {
                debug!(session = %id, error = %e, "model submit failed");
            }
        });

        let config = {
            let mut guard = self.config.lock().map_err(|_| RelayError::LockPoisoned)?;
            guard.model = Some(name.to_string());
            guard.clone()
        };
        self.config_store.persist(&self.id, &config)
    }

    /// Move the session to a new workspace root. Restarts the agent.
    pub async fn set_workspace_root(&self, path: impl Into<std::path::PathBuf>) -> Result<()> {
        {
            let mut guard = self.config.lock().map_err(|_| RelayError::LockPoisoned)?;
            guard.workspace_root = Some(path.into());
        }
        self.restart().await
    }

    /// Point the agent at a rules file. Restarts the agent.
    pub async fn set_rules(&self, path: impl Into<std::path::PathBuf>) -> Result<()> {
        {
            let mut guard = self.config.lock().map_err(|_| RelayError::LockPoisoned)?;
            guard.rules = Some(path.into());
        }
        self.restart().await
    }

    /// Remove the rules file. Restarts the agent.
    pub async fn clear_rules(&self) -> Result<()> {
        {
            let mut guard = self.config.lock().map_err(|_| RelayError::LockPoisoned)?;
            guard.rules = None;
        }
        self.restart().await
    }

    /// Update the coarse idle timeout. Persist-only: the running timer is
    /// not re-armed.
    pub fn set_idle_timeout(&self, secs: u64) -> Result<()> {
        let config = {
            let mut guard = self.config.lock().map_err(|_| RelayError::LockPoisoned)?;
            guard.idle_timeout_secs = secs;
            guard.clone()
        };
        self.config_store.persist(&self.id, &config)
    }

    /// Observable session state.
    pub fn info(&self) -> Result<SessionInfo> {
        let config = self.config()?;
        let pid = {
            let guard = self.process.lock().map_err(|_| RelayError::LockPoisoned)?;
            guard.as_ref().filter(|p| p.is_alive()).map(|p| p.pid())
        };
        let state = *self.state.lock().map_err(|_| RelayError::LockPoisoned)?;
        Ok(SessionInfo {
            pid,
            state,
            workspace_root: config.workspace_root,
            model: config.model,
            rules: config.rules,
            enhancer_default: config.enhancer_default,
            idle_timeout_secs: config.idle_timeout_secs,
            cols: config.cols,
            rows: config.rows,
            idle_ms: self.pipeline.buffer().idle().as_millis(),
        })
    }

    /// Persist config, stop the process, discard in-flight pipeline state,
    /// and start again. The dropped buffer and transcript cause a visible
    /// gap in the relayed stream.
    async fn restart(&self) -> Result<()> {
        let config = self.config()?;
        self.config_store.persist(&self.id, &config)?;
        self.stop_process().await?;
        self.pipeline.discard();
        self.start()
    }

    fn current_process(&self) -> Result<crate::pty::AgentProcess> {
        self.process
            .lock()
            .map_err(|_| RelayError::LockPoisoned)?
            .as_ref()
            .cloned()
            .ok_or_else(|| {
                RelayError::ProcessUnavailable("agent process is not running".to_string())
            })
    }
}
