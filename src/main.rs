//! tui-relay binary entry point: a local console relay.
//!
//! Spawns the configured agent CLI, reads turns from stdin, and streams the
//! live window and final chunks to stdout. `--filter` instead runs a
//! captured raw frame through the frame filter and prints the result.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use tui_relay::cli::{self, Args};
use tui_relay::{
    logging, ConsoleSink, FrameFilter, JsonConfigStore, MemorySecretStore, SessionConfig,
    SessionId, SessionManager,
};

fn defaults_from_args(args: &Args) -> SessionConfig {
    SessionConfig {
        workspace_root: args.workspace.clone(),
        model: args.model.clone(),
        rules: args.rules.clone(),
        agent_bin: args.agent_bin.clone(),
        enhancer_default: !args.no_enhancer,
        ..SessionConfig::default()
    }
}

#[tokio::main]
async fn main() -> tui_relay::Result<()> {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("tui-relay: {e}");
            std::process::exit(2);
        }
    };

    if args.help {
        cli::print_help();
        return Ok(());
    }
    if args.version {
        cli::print_version();
        return Ok(());
    }

    logging::init_with(args.log_level.as_deref());

    // Filter check harness: one frame in, settled content out
    if let Some(path) = &args.filter_file {
        let raw = std::fs::read_to_string(path)?;
        println!("{}", FrameFilter::clean(&raw));
        return Ok(());
    }

    info!("tui-relay v{}", env!("CARGO_PKG_VERSION"));

    let manager = SessionManager::with_defaults(
        Arc::new(JsonConfigStore::new(&args.data_dir)),
        Arc::new(MemorySecretStore::new()),
        defaults_from_args(&args),
    );
    let id = SessionId::new(args.session.clone());

    let session = manager.get_or_start(&id)?;
    session.attach_streaming(Arc::new(ConsoleSink))?;
    info!(session = %id, "relay ready; type a prompt, or /quit to exit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                let Ok(Some(line)) = line else { break };
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                if let Err(e) = handle_line(&manager, &id, &line).await {
                    warn!(error = %e, "command failed");
                }
                if line == "/quit" {
                    break;
                }
            }
        }
    }

    manager.stop(&id).await?;
    info!("relay stopped");
    Ok(())
}

async fn handle_line(
    manager: &Arc<SessionManager>,
    id: &SessionId,
    line: &str,
) -> tui_relay::Result<()> {
    let session = manager.get_or_start(id)?;
    match line.split_once(' ').map_or((line, ""), |(a, b)| (a, b)) {
        ("/quit", _) => Ok(()),
        ("/info", _) => {
            let info = session.info()?;
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(())
        }
        ("/enhance", _) => {
            session.enhance_next();
            Ok(())
        }
        ("/submit", _) => session.submit(),
        ("/model", name) if !name.is_empty() => session.set_model(name),
        ("/resize", dims) => {
            let mut parts = dims.split_whitespace();
            match (
                parts.next().and_then(|c| c.parse().ok()),
                parts.next().and_then(|r| r.parse().ok()),
            ) {
                (Some(cols), Some(rows)) => session.resize(cols, rows),
                _ => {
                    eprintln!("usage: /resize <cols> <rows>");
                    Ok(())
                }
            }
        }
        _ => session.send(line),
    }
}
