//! JSON-lines bridge between the page and the pipeline.
//! stdin carries caption-surface state, settings and navigation;
//! stdout carries overlay commands. One JSON object per line each way.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

use crate::caption::SharedSurface;
use crate::metrics::{MetricsRegistry, MetricsSnapshot};
use crate::overlay::{OverlayStyle, PresentationSink};
use crate::pipeline::PipelineHandle;
use crate::settings::{Settings, API_KEY_ENV};

#[derive(Debug, Error)]
pub enum HostError {
    #[error("host IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("host protocol error: {0}")]
    Protocol(#[from] serde_json::Error),
}

/// Messages from the page side.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    /// Caption container present; markup of each text container.
    Captions { blocks: Vec<String> },
    /// Caption container gone from the page.
    CaptionsRemoved,
    Settings { settings: Settings },
    Navigate { url: String },
    Metrics,
}

/// Commands to the overlay side.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkCommand<'a> {
    Show { text: &'a str },
    Hide,
    Style { style: &'a OverlayStyle },
    Metrics { summary: &'a MetricsSnapshot },
}

pub type SharedWriter = Arc<Mutex<dyn Write + Send>>;

fn write_command(out: &SharedWriter, command: &SinkCommand<'_>) -> Result<(), HostError> {
    let mut out = out.lock();
    serde_json::to_writer(&mut *out, command)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

/// Sink that serializes overlay commands onto a shared writer.
pub struct JsonLinesSink {
    out: SharedWriter,
}

impl JsonLinesSink {
    pub fn new(out: SharedWriter) -> Self {
        Self { out }
    }

    fn emit(&self, command: SinkCommand<'_>) {
        if let Err(e) = write_command(&self.out, &command) {
            warn!(error = %e, "overlay command write failed");
        }
    }
}

impl PresentationSink for JsonLinesSink {
    fn show(&mut self, text: &str) {
        self.emit(SinkCommand::Show { text });
    }

    fn hide(&mut self) {
        self.emit(SinkCommand::Hide);
    }

    fn restyle(&mut self, style: &OverlayStyle) {
        self.emit(SinkCommand::Style { style });
    }
}

/// Read host messages until EOF, then stop the pipeline.
pub async fn run_host<R>(
    reader: R,
    out: SharedWriter,
    surface: Arc<SharedSurface>,
    handle: PipelineHandle,
    metrics: Arc<MetricsRegistry>,
) -> Result<(), HostError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let message: HostMessage = match serde_json::from_str(line) {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "ignoring malformed host message");
                continue;
            }
        };

        match message {
            HostMessage::Captions { blocks } => {
                surface.set_blocks(blocks);
                handle.mutation();
            }
            HostMessage::CaptionsRemoved => {
                surface.remove();
                handle.mutation();
            }
            HostMessage::Settings { mut settings } => {
                settings.override_credentials(std::env::var(API_KEY_ENV).ok());
                handle.update_settings(settings);
            }
            HostMessage::Navigate { url } => {
                handle.navigate(url);
            }
            HostMessage::Metrics => {
                let summary = metrics.snapshot();
                write_command(&out, &SinkCommand::Metrics { summary: &summary })?;
            }
        }
        debug!(phase = %handle.phase(), "host message handled");
    }

    info!("host input closed");
    handle.shutdown();
    Ok(())
}
