use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a stderr fmt subscriber filtered by `RUST_LOG` (default `salescube=info`).
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "salescube=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
