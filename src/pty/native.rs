//! Agent process spawning via portable-pty.

use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;

use portable_pty::{native_pty_system, CommandBuilder, PtySize as NativePtySize};

use super::{AgentProcess, PtySize};
use crate::error::RelayError;
use crate::Result;

/// Fully-resolved spawn description for the agent CLI.
///
/// The environment is an explicit, pre-merged map passed in as a value;
/// spawning never mutates ambient process state.
#[derive(Debug, Clone)]
pub struct AgentCommand {
    /// Program to execute.
    pub program: PathBuf,
    /// Command-line arguments.
    pub args: Vec<String>,
    /// Working directory for the child.
    pub cwd: PathBuf,
    /// Complete child environment.
    pub env: HashMap<String, String>,
}

/// A freshly spawned agent: the relay-facing handle plus the raw reader
/// destined for the read pump.
pub struct SpawnedAgent {
    pub process: AgentProcess,
    pub reader: Box<dyn Read + Send>,
}

/// Wrapper around the native PTY system.
pub struct AgentPty {
    pty_system: Box<dyn portable_pty::PtySystem + Send>,
}

impl AgentPty {
    /// Create a new AgentPty instance.
    pub fn new() -> Self {
        Self {
            pty_system: native_pty_system(),
        }
    }

    /// Spawn the agent CLI in a new PTY of the given size.
    ///
    /// On Windows the command is routed through the command interpreter so
    /// that `.cmd` launcher shims resolve.
    pub fn spawn(&self, command: &AgentCommand, size: PtySize) -> Result<SpawnedAgent> {
        let native_size = NativePtySize {
            rows: size.rows,
            cols: size.cols,
            pixel_width: 0,
            pixel_height: 0,
        };

        let pair = self
            .pty_system
            .openpty(native_size)
            .map_err(|e| RelayError::Pty(e.to_string()))?;

        #[cfg(unix)]
        let mut cmd = {
            let mut c = CommandBuilder::new(&command.program);
            for arg in &command.args {
                c.arg(arg);
            }
            c
        };

        #[cfg(windows)]
        let mut cmd = {
            let interpreter =
                std::env::var("COMSPEC").unwrap_or_else(|_| "cmd.exe".to_string());
            let mut c = CommandBuilder::new(interpreter);
            c.arg("/c");
            c.arg(&command.program);
            for arg in &command.args {
                c.arg(arg);
            }
            c
        };

        cmd.cwd(&command.cwd);
        cmd.env_clear();
        for (key, value) in &command.env {
            cmd.env(key, value);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| RelayError::Pty(e.to_string()))?;

        let pid = child.process_id().unwrap_or(0);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| RelayError::Pty(e.to_string()))?;

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| RelayError::Pty(e.to_string()))?;

        Ok(SpawnedAgent {
            process: AgentProcess::new(writer, pair.master, child, pid),
            reader,
        })
    }
}

impl Default for AgentPty {
    fn default() -> Self {
        Self::new()
    }
}
