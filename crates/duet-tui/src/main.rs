//! duet terminal client entry point.

use std::{fs::OpenOptions, path::PathBuf, sync::Mutex, time::Duration};

use clap::Parser;
use duet_tui::{App, Runtime, RuntimeConfig, TerminalDriver, palette};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// duet terminal client
#[derive(Parser, Debug)]
#[command(name = "duet-tui")]
#[command(about = "Terminal client for the duet chat relay")]
#[command(version)]
struct Args {
    /// Relay base URL
    #[arg(short, long, env = "DUET_SERVER", default_value = "ws://127.0.0.1:8080")]
    server: String,

    /// Write logs to this file. The terminal belongs to the UI, so nothing is
    /// logged without it.
    #[arg(long, env = "DUET_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Log level, overridden by `RUST_LOG`
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Quiet period after the last keystroke before "stopped typing" is sent
    #[arg(long, default_value_t = 3000)]
    typing_window_ms: u64,

    /// How long the farewell screen stays up on exit
    #[arg(long, default_value_t = 1000)]
    grace_ms: u64,
}

fn init_logging(args: &Args) -> std::io::Result<()> {
    let Some(path) = &args.log_file else {
        return Ok(());
    };
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(filter)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(&args)?;

    let config = RuntimeConfig {
        typing_window: Duration::from_millis(args.typing_window_ms),
        grace_period: Duration::from_millis(args.grace_ms),
    };
    let color = palette::random_tag();
    tracing::info!(server = %args.server, color, "duet client starting");

    let driver = TerminalDriver::new(args.server)?;
    let runtime = Runtime::new(driver, App::new(color), config);

    Ok(runtime.run().await?)
}
