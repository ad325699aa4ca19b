//! # tui-relay
//!
//! Relay a TUI coding agent's terminal stream into chat-sized messages.
//!
//! A long-lived interactive agent CLI runs behind a chat-style front end;
//! its output is a continuously-repainted terminal UI with no structured
//! protocol. This crate captures that stream, reconstructs the new,
//! meaningful content out of the chrome (borders, spinners, progress bars,
//! duplicate redraws), maintains a bounded rolling transcript, and decides
//! when a reply is done so it can be delivered in transport-sized chunks.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tui_relay::{ConsoleSink, JsonConfigStore, MemorySecretStore, SessionId, SessionManager};
//!
//! #[tokio::main]
//! async fn main() -> tui_relay::Result<()> {
//!     tui_relay::logging::try_init().ok();
//!
//!     let manager = SessionManager::new(
//!         Arc::new(JsonConfigStore::new("data/sessions")),
//!         Arc::new(MemorySecretStore::new()),
//!     );
//!
//!     // One session per conversation; the agent process starts lazily
//!     let id = SessionId::new("console");
//!     let session = manager.get_or_start(&id)?;
//!
//!     // Stream the live window and final chunks to stdout
//!     session.attach_streaming(Arc::new(ConsoleSink))?;
//!     session.send("explain this repository")?;
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod logging;
pub mod output;
pub mod pty;
pub mod relay;
pub mod session;

// Re-export commonly used types
pub use error::{RelayError, Result};
pub use output::{split_chunks, AnsiStripper, FrameFilter, TRANSPORT_LIMIT};
pub use pty::{AgentProcess, AgentPty, PtySize};
pub use relay::{
    ConsoleSink, IngestBuffer, PresentationSink, RelayPipeline, RollingTranscript,
    IDLE_THRESHOLD, MAX_FINAL_CHUNKS, MAX_TRANSCRIPT_CHARS,
};
pub use session::{
    ConfigStore, JsonConfigStore, MemorySecretStore, SecretStore, Session, SessionConfig,
    SessionId, SessionInfo, SessionManager, SessionState,
};
