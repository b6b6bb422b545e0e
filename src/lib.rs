//! dualsub: live translated second subtitle track for streaming captions.
//! Main library: tracing setup, pipeline wiring, host bridge.

pub mod caption;
pub mod cancellation;
pub mod context;
pub mod host;
pub mod metrics;
pub mod orchestrator;
pub mod overlay;
pub mod pipeline;
pub mod settings;
pub mod state_machine;
pub mod translate;

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::BufReader;
use tracing::{info, warn};

use caption::SharedSurface;
use host::{JsonLinesSink, SharedWriter};
use metrics::MetricsRegistry;
use pipeline::Pipeline;
use settings::{PipelineConfig, Settings};
use translate::TranslationService;

/// Everything the binary needs to start a session.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub settings_path: Option<PathBuf>,
    pub config: PipelineConfig,
}

/// Logs go to stderr; stdout is reserved for overlay commands.
pub fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("dualsub=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Run the stdin/stdout bridge until stdin closes.
pub async fn run(options: RunOptions) -> anyhow::Result<()> {
    info!("dualsub starting");

    let settings = Settings::load_or_default(options.settings_path.as_deref());
    let config = options.config;

    let service = Arc::new(TranslationService::new(
        config.http_timeout,
        config.service_cache_capacity,
    )?);
    let metrics = Arc::new(MetricsRegistry::new());
    let surface = Arc::new(SharedSurface::new());
    let stdout: SharedWriter = Arc::new(Mutex::new(std::io::stdout()));

    let (pipeline, handle) = Pipeline::new(
        surface.clone(),
        service,
        settings,
        config,
        Box::new(JsonLinesSink::new(Arc::clone(&stdout))),
        Arc::clone(&metrics),
    );
    let pipeline_task = tokio::spawn(pipeline.run());

    let stdin = BufReader::new(tokio::io::stdin());
    if let Err(e) = host::run_host(stdin, stdout, surface, handle.clone(), metrics).await {
        warn!(error = %e, "host bridge failed");
        handle.shutdown();
    }

    pipeline_task.await?;
    info!("dualsub stopped");
    Ok(())
}
