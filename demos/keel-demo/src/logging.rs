use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Installs the global subscriber.
///
/// `KEEL_LOG` takes the usual `EnvFilter` directives, `default_level` applies when it is unset
/// or invalid.
pub fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_env("KEEL_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));

    let stdout = fmt::layer().with_target(true).with_thread_names(true);
    Registry::default().with(filter).with(stdout).init();

    tracing::debug!("Logging initialized");
}
