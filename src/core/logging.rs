use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `RUST_LOG` wins over `LOG_LEVEL`; an unparsable level degrades to `info`.
fn filter_for(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn init_logging(log_level: &str) {
    let installed = tracing_subscriber::registry()
        .with(filter_for(log_level))
        .with(fmt::layer().compact().with_target(false))
        .try_init();

    match installed {
        Ok(()) => tracing::info!("📝 Logging at {}", log_level),
        Err(e) => tracing::debug!("Subscriber already set, keeping it: {}", e),
    }
}
