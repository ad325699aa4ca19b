//! Session management module.
//!
//! One session per conversation: an agent process, its relay pipeline, and
//! the configuration both were built from. The [`SessionManager`] is the
//! registry that creates sessions lazily, arms their coarse idle timers,
//! and tears them down.

mod config;
mod id;
mod manager;
mod session;
mod state;

pub use config::{
    agent_args, combined_env, is_sensitive, redact, resolve_agent_bin, ConfigStore,
    JsonConfigStore, MemorySecretStore, SecretStore, SessionConfig, AGENT_BIN_ENV,
    DEFAULT_IDLE_TIMEOUT_SECS, SENSITIVE_KEYS,
};
pub use id::SessionId;
pub use manager::SessionManager;
pub use session::{Session, SessionInfo, SHUTDOWN_GRACE, SUBMIT_DELAY};
pub use state::SessionState;
