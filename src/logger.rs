use std::result::Result;

use snafu::ResultExt;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{registry, EnvFilter};

use crate::config::Config;
use crate::error::{ApplicationError, InitializeLoggerSnafu, InstallLoggerSnafu};

/// Used when `RUST_LOG` is not set.
const DEFAULT_DIRECTIVES: &str = "info";

/// Logs pretty lines to stdout and JSON lines to a daily file in `log_dir`. The returned guard flushes the file
/// writer when dropped, keep it alive for as long as the program runs.
pub fn init(config: &Config) -> Result<WorkerGuard, ApplicationError> {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) => EnvFilter::try_new(directives),
        Err(_) => EnvFilter::try_new(DEFAULT_DIRECTIVES),
    }
    .context(InitializeLoggerSnafu)?;

    let (file_layer, guard) = {
        let file_appender = tracing_appender::rolling::daily(&config.log_dir, "agora.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let layer = layer().with_ansi(false).json().with_writer(non_blocking);

        (layer, guard)
    };

    let console_layer = layer().pretty().with_writer(std::io::stdout);

    let subscriber = registry().with(filter).with(console_layer).with(file_layer);
    tracing::subscriber::set_global_default(subscriber).context(InstallLoggerSnafu)?;

    Ok(guard)
}
