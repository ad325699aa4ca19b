//! PTY (Pseudo-Terminal) abstraction layer.
//!
//! Spawns the interactive agent CLI under a pseudo-terminal and exposes the
//! handle the relay core needs: write, resize, kill, exit observation, and
//! a process identifier. Works on both Unix PTY and Windows ConPTY through
//! portable-pty.

mod native;

pub use native::{AgentCommand, AgentPty, SpawnedAgent};

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::RelayError;
use crate::Result;

/// Size of a PTY in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PtySize {
    /// Number of rows (height).
    pub rows: u16,
    /// Number of columns (width).
    pub cols: u16,
}

impl PtySize {
    /// Create a new PtySize with the given dimensions.
    pub fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }
}

impl Default for PtySize {
    fn default() -> Self {
        Self {
            rows: 30,
            cols: 120,
        }
    }
}

struct ProcessInner {
    writer: Mutex<Box<dyn Write + Send>>,
    master: Mutex<Box<dyn portable_pty::MasterPty + Send>>,
    child: Mutex<Box<dyn portable_pty::Child + Send + Sync>>,
    pid: u32,
    exited: Arc<AtomicBool>,
}

/// Handle to a live agent process.
///
/// Cheap to clone; all clones refer to the same underlying process. The
/// reader half is handed to the read pump at spawn time and is not part of
/// this handle.
#[derive(Clone)]
pub struct AgentProcess {
    inner: Arc<ProcessInner>,
}

impl AgentProcess {
    pub(crate) fn new(
        writer: Box<dyn Write + Send>,
        master: Box<dyn portable_pty::MasterPty + Send>,
        child: Box<dyn portable_pty::Child + Send + Sync>,
        pid: u32,
    ) -> Self {
        Self {
            inner: Arc::new(ProcessInner {
                writer: Mutex::new(writer),
                master: Mutex::new(master),
                child: Mutex::new(child),
                pid,
                exited: Arc::new(AtomicBool::new(false)),
            }),
        }
    }

    /// Write text to the process's terminal input.
    pub fn write(&self, text: &str) -> Result<()> {
        let mut writer = self
            .inner
            .writer
            .lock()
            .map_err(|_| RelayError::LockPoisoned)?;
        writer.write_all(text.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Send the interrupt sequence (Ctrl+C) to the terminal.
    pub fn interrupt(&self) -> Result<()> {
        self.write("\x03")
    }

    /// Resize the terminal.
    pub fn resize(&self, cols: u16, rows: u16) -> Result<()> {
        let master = self
            .inner
            .master
            .lock()
            .map_err(|_| RelayError::LockPoisoned)?;
        master
            .resize(portable_pty::PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| RelayError::Pty(e.to_string()))
    }

    /// Force-terminate the process.
    pub fn kill(&self) -> Result<()> {
        let mut child = self
            .inner
            .child
            .lock()
            .map_err(|_| RelayError::LockPoisoned)?;
        child.kill().map_err(RelayError::Io)
    }

    /// Whether the process is still running.
    pub fn is_alive(&self) -> bool {
        if self.inner.exited.load(Ordering::SeqCst) {
            return false;
        }
        match self.inner.child.lock() {
            Ok(mut child) => matches!(child.try_wait(), Ok(None)),
            Err(_) => false,
        }
    }

    /// Process identifier of the spawned child.
    pub fn pid(&self) -> u32 {
        self.inner.pid
    }

    /// Flag raised by the read pump once the PTY closes.
    pub fn exited_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.inner.exited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pty_size_default() {
        let size = PtySize::default();
        assert_eq!(size.rows, 30);
        assert_eq!(size.cols, 120);
    }

    #[test]
    fn test_pty_size_new() {
        let size = PtySize::new(40, 100);
        assert_eq!(size.rows, 40);
        assert_eq!(size.cols, 100);
    }

    #[test]
    fn test_pty_size_equality() {
        assert_eq!(PtySize::new(30, 120), PtySize::default());
        assert_ne!(PtySize::new(24, 80), PtySize::default());
    }
}
