use std::path::PathBuf;
use std::sync::Once;

use tracing::Level;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    filter::EnvFilter, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, Layer,
};

use crate::error::Result;

// Log targets, one per pipeline stage.
pub const PDF_PARSE: &str = "pdf_parse";
pub const PAGE_SCAN: &str = "page_scan";
pub const CODE_MATCH: &str = "code_match";
pub const OUTPUT_ASSEMBLY: &str = "output_assembly";

const STAGE_TARGETS: &[&str] = &[PDF_PARSE, PAGE_SCAN, CODE_MATCH, OUTPUT_ASSEMBLY];

// Keeps the non-blocking writer alive for the process lifetime.
static INIT: Once = Once::new();

/// Stage targets at `level`, everything else at info. `RUST_LOG` wins
/// when set.
fn stage_filter(level: Level) -> EnvFilter {
    let directives = STAGE_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",");
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("info,{directives}")))
}

pub fn init_logging(verbose: bool) -> WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(writer)
        .with_filter(stage_filter(level));

    INIT.call_once(|| {
        tracing_subscriber::registry().with(stdout_layer).init();
    });

    guard
}

/// Like [`init_logging`], but also mirrors stage events at debug level
/// into a log file under `log_dir`.
pub fn init_logging_with_dir(verbose: bool, log_dir: PathBuf) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::NEVER, log_dir, "refmark.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(file_writer)
        .with_filter(stage_filter(Level::DEBUG));

    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_filter(stage_filter(level));

    INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(file_layer)
            .with(stdout_layer)
            .init();
    });

    Ok(guard)
}
