use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_FILTER: &str = "info";

/// Installs the global tracing subscriber writing to a timestamped file in `log_dir`
///
/// The level comes from `RUST_LOG` when set, `info` otherwise.
pub fn init_logger(log_dir: &str) -> Result<()> {
    if !Path::new(log_dir).exists() {
        fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir))?;
    }

    let log_file = Path::new(log_dir).join(log_file_name(Local::now()));
    let writer = fs::File::create(&log_file)
        .with_context(|| format!("Failed to create log file: {}", log_file.display()))?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_target(false)
        .with_ansi(false)
        .with_writer(writer)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    info!("Logger initialized: {}", log_file.display());

    Ok(())
}

fn log_file_name(at: chrono::DateTime<Local>) -> String {
    format!("url_feature_api_{}.log", at.format("%Y%m%d_%H%M%S"))
}
