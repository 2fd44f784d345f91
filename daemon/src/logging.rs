//! Tracing subscriber setup

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ta_shared::{LogFormat, LoggingConfig};

/// Installs the global subscriber. `RUST_LOG` takes precedence over the
/// configured level.
pub fn init_logging(config: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .flatten_event(true)
                .with_ansi(false)
                .with_file(config.source_location)
                .with_line_number(config.source_location);
            let _ = registry.with(layer).try_init();
        }
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .pretty()
                .with_ansi(config.colored)
                .with_file(config.source_location)
                .with_line_number(config.source_location);
            let _ = registry.with(layer).try_init();
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_ansi(config.colored)
                .with_file(config.source_location)
                .with_line_number(config.source_location);
            let _ = registry.with(layer).try_init();
        }
    }
}
