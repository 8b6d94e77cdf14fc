use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::time::UtcTime;

use crate::config::Config;

/// Initializes logging for the avatar cache.
///
/// The configured level applies to this crate only; everything else is
/// logged at `info`. Setting `RUST_LOG` overrides the configuration.
pub fn init_logging(config: &Config) {
    let filter = std::env::var(EnvFilter::DEFAULT_ENV)
        .unwrap_or_else(|_| format!("info,prtracker_avatars={}", config.logging.level));

    tracing_subscriber::fmt()
        .with_timer(UtcTime::rfc_3339())
        .with_target(true)
        .with_env_filter(filter)
        .compact()
        .init();
}
