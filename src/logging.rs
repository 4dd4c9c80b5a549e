//! Logging setup for binaries embedding the engine

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence when set; otherwise the provided level is
/// applied to the `geoguardian` target with `info` for everything else.
pub fn init(level: &str) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("info,geoguardian={level}"))),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
