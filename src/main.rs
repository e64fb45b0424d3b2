//! SnapKV - An In-Process Key-Value Store with TTL and Snapshots
//!
//! This is the entry point for the `snapkv` command. It opens the one store
//! for this process and either runs a single command given on the command
//! line or starts an interactive session on stdin/stdout.

use anyhow::{bail, Context};
use snapkv::commands::{parse_words, CommandHandler};
use snapkv::config::{Action, Config};
use snapkv::session::{Session, SessionStats, ThreadReader};
use snapkv::storage::Store;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn print_help() {
    println!(
        r#"
SnapKV - An In-Process Key-Value Store with TTL and Snapshots

USAGE:
    snapkv [OPTIONS] [COMMAND...]

OPTIONS:
    -s, --snapshot <PATH>    Snapshot file (default: {})
    -v, --version            Print version information
    -h, --help               Print this help message

With no COMMAND an interactive session starts. Type HELP inside it.

{}

EXAMPLES:
    snapkv SET name Ariz
    snapkv SET session abc123 --ttl 60
    snapkv SET tags red,green,red --set true
    snapkv TTL session
    snapkv --snapshot /tmp/other.json ALL

Set RUST_LOG=debug to see what the store is doing.
"#,
        snapkv::DEFAULT_SNAPSHOT_PATH,
        snapkv::commands::USAGE
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match Config::from_args(std::env::args().skip(1))? {
        Action::Run(config) => config,
        Action::Help => {
            print_help();
            return Ok(());
        }
        Action::Version => {
            println!("SnapKV version {}", snapkv::VERSION);
            return Ok(());
        }
    };

    // Logs go to stderr so they never mix with replies
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // The one store for this process, shared by handle
    let store = Arc::new(Store::open(&config.snapshot_path));
    info!(
        snapshot = %config.snapshot_path.display(),
        keys = store.len(),
        "Store opened"
    );

    let handler = CommandHandler::new(Arc::clone(&store));

    if !config.command.is_empty() {
        return run_once(handler, config.command).await;
    }

    let stats = Arc::new(SessionStats::new());
    // Blocking stdin reads live on their own thread, outside the runtime
    let stdin = ThreadReader::stdin().context("failed to start input thread")?;
    let mut session = Session::new(
        stdin,
        tokio::io::stdout(),
        handler,
        Arc::clone(&stats),
    )
    .with_prompt("-> ");

    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Interrupted, leaving session"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        result = session.run() => result.context("session failed")?,
        _ = shutdown => println!(),
    }

    let store_stats = store.stats();
    info!(
        commands = stats.commands_processed.load(Ordering::Relaxed),
        keys = store_stats.keys,
        snapshots = store_stats.snapshots,
        "Session ended"
    );
    Ok(())
}

/// Runs one command from the process arguments and prints its reply.
async fn run_once(handler: CommandHandler, words: Vec<String>) -> anyhow::Result<()> {
    let parsed = parse_words(&words).context("invalid command")?;
    if let Some(warning) = &parsed.warning {
        eprintln!("Warning: {}", warning);
    }

    let reply = tokio::task::spawn_blocking(move || handler.execute(parsed.command)).await?;
    println!("{}", reply);

    if reply.is_error() {
        bail!("command failed");
    }
    Ok(())
}
