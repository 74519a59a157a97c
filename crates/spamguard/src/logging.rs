use std::fs::File;
use std::path::Path;

use anyhow::Context;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    filter::filter_fn, fmt::layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

pub const LOGGING_ENV: &str = "SPAMGUARD_LOG";
pub const LOGGING_FILE_ENV: &str = "SPAMGUARD_LOG_FILE";

pub fn setup_logging(log_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = log_path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context("failed to create the log directory")?;
    }

    let log_file = File::options()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("failed to open the log file {:?}", log_path))?;

    tracing_subscriber::registry()
        .with(
            layer()
                .with_writer(std::io::stderr)
                .with_filter(LevelFilter::INFO)
                .and_then(
                    layer()
                        .with_writer(std::io::stderr)
                        .with_line_number(true)
                        .with_file(true)
                        .with_filter(filter_fn(|metadata| metadata.level() > &LevelFilter::INFO)),
                )
                .with_filter(
                    EnvFilter::builder()
                        .with_env_var(LOGGING_ENV)
                        .with_default_directive(LevelFilter::WARN.into())
                        .from_env_lossy(),
                ),
        )
        .with(
            layer()
                .with_writer(log_file)
                .with_ansi(false)
                .with_filter(
                    EnvFilter::builder()
                        .with_env_var(LOGGING_FILE_ENV)
                        .with_default_directive(LevelFilter::INFO.into())
                        .from_env_lossy(),
                ),
        )
        .try_init()
        .context("failed to initialize tracing_subscriber")
}
