//! Command-line interface for tui-relay.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::path::PathBuf;

/// Command-line arguments.
#[derive(Debug, Clone)]
pub struct Args {
    /// Session identifier for the console relay.
    pub session: String,
    /// Directory holding per-session config documents.
    pub data_dir: PathBuf,
    /// Workspace root for the agent.
    pub workspace: Option<PathBuf>,
    /// Model name for the agent.
    pub model: Option<String>,
    /// Rules file for the agent.
    pub rules: Option<PathBuf>,
    /// Agent binary override.
    pub agent_bin: Option<PathBuf>,
    /// Disable the prompt enhancer default.
    pub no_enhancer: bool,
    /// Run a captured raw frame through the frame filter and exit.
    pub filter_file: Option<PathBuf>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            session: "console".to_string(),
            data_dir: PathBuf::from("data/sessions"),
            workspace: None,
            model: None,
            rules: None,
            agent_bin: None,
            no_enhancer: false,
            filter_file: None,
            log_level: None,
            version: false,
            help: false,
        }
    }
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('s') | Long("session") => {
                result.session = parser.value()?.parse()?;
            }
            Short('d') | Long("data-dir") => {
                result.data_dir = parser.value()?.parse()?;
            }
            Short('w') | Long("workspace") => {
                result.workspace = Some(parser.value()?.parse()?);
            }
            Short('m') | Long("model") => {
                result.model = Some(parser.value()?.parse()?);
            }
            Short('r') | Long("rules") => {
                result.rules = Some(parser.value()?.parse()?);
            }
            Short('b') | Long("agent-bin") => {
                result.agent_bin = Some(parser.value()?.parse()?);
            }
            Long("no-enhancer") => {
                result.no_enhancer = true;
            }
            Long("filter") => {
                result.filter_file = Some(parser.value()?.parse()?);
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"tui-relay {version}
Relay a TUI coding agent's terminal stream into chat-sized messages

USAGE:
    tui-relay [OPTIONS]

OPTIONS:
    -s, --session <ID>      Session identifier [default: console]
    -d, --data-dir <DIR>    Session config directory [default: data/sessions]
    -w, --workspace <DIR>   Workspace root for the agent
    -m, --model <NAME>      Model name for the agent
    -r, --rules <FILE>      Rules file for the agent
    -b, --agent-bin <FILE>  Agent binary override
        --no-enhancer       Disable the prompt enhancer default
        --filter <FILE>     Filter a captured raw frame and exit
    -l, --log-level <LVL>   Log level (error, warn, info, debug, trace)
    -h, --help              Print help
    -V, --version           Print version

ENVIRONMENT VARIABLES:
    TUI_RELAY_AGENT         Agent binary path (fallback when --agent-bin is unset)
    RUST_LOG                Log filter directives

EXAMPLES:
    # Relay an agent in the current directory to the console
    tui-relay

    # Pin the workspace and model
    tui-relay -w ~/projects/app -m sonnet

    # Check what the frame filter makes of a captured frame
    tui-relay --filter frame.txt
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("tui-relay {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(args: &[&str]) -> Vec<OsString> {
        std::iter::once("tui-relay")
            .chain(args.iter().copied())
            .map(OsString::from)
            .collect()
    }

    #[test]
    fn test_default_args() {
        let result = parse_args_from(args(&[])).unwrap();
        assert_eq!(result.session, "console");
        assert_eq!(result.data_dir, PathBuf::from("data/sessions"));
        assert!(!result.no_enhancer);
        assert!(result.filter_file.is_none());
    }

    #[test]
    fn test_workspace_and_model() {
        let result = parse_args_from(args(&["-w", "/work", "-m", "sonnet"])).unwrap();
        assert_eq!(result.workspace, Some(PathBuf::from("/work")));
        assert_eq!(result.model, Some("sonnet".to_string()));
    }

    #[test]
    fn test_long_options() {
        let result = parse_args_from(args(&[
            "--session",
            "chan-9",
            "--rules",
            "/etc/rules.md",
            "--agent-bin",
            "/usr/local/bin/agent",
        ]))
        .unwrap();
        assert_eq!(result.session, "chan-9");
        assert_eq!(result.rules, Some(PathBuf::from("/etc/rules.md")));
        assert_eq!(result.agent_bin, Some(PathBuf::from("/usr/local/bin/agent")));
    }

    #[test]
    fn test_no_enhancer() {
        let result = parse_args_from(args(&["--no-enhancer"])).unwrap();
        assert!(result.no_enhancer);
    }

    #[test]
    fn test_filter_mode() {
        let result = parse_args_from(args(&["--filter", "frame.txt"])).unwrap();
        assert_eq!(result.filter_file, Some(PathBuf::from("frame.txt")));
    }

    #[test]
    fn test_help_flag() {
        assert!(parse_args_from(args(&["-h"])).unwrap().help);
        assert!(parse_args_from(args(&["--help"])).unwrap().help);
    }

    #[test]
    fn test_version_flag() {
        assert!(parse_args_from(args(&["-V"])).unwrap().version);
        assert!(parse_args_from(args(&["--version"])).unwrap().version);
    }

    #[test]
    fn test_log_level() {
        let result = parse_args_from(args(&["-l", "debug"])).unwrap();
        assert_eq!(result.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_unexpected_positional() {
        assert!(parse_args_from(args(&["stray"])).is_err());
    }

    #[test]
    fn test_unknown_flag() {
        assert!(parse_args_from(args(&["--nope"])).is_err());
    }
}
