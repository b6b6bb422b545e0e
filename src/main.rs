use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use dualsub::settings::PipelineConfig;
use dualsub::RunOptions;

/// Translated second subtitle track, driven over stdin/stdout JSON lines.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Settings JSON file; defaults are used when absent or unreadable
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Coalescing window for caption mutations, in milliseconds
    #[arg(long, default_value_t = 100)]
    throttle_ms: u64,

    /// Interval of the reconciliation poll, in milliseconds
    #[arg(long, default_value_t = 2000, value_parser = clap::value_parser!(u64).range(100..))]
    poll_ms: u64,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dualsub::init_tracing(cli.log_json);

    let config = PipelineConfig {
        throttle_window: Duration::from_millis(cli.throttle_ms),
        poll_interval: Duration::from_millis(cli.poll_ms),
        ..PipelineConfig::default()
    };

    dualsub::run(RunOptions {
        settings_path: cli.settings,
        config,
    })
    .await
}
