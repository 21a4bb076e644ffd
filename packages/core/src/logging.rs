use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset or invalid. HTTP client internals
/// are noisy at `info`.
pub const DEFAULT_FILTER: &str = "info,hyper=warn,reqwest=warn";

/// Initialize structured logging for the monitor.
///
/// This must be called once at startup (in main.rs). Loop events carry a
/// `target_loop{target_id=..}` span prefix.
pub fn init_logging() {
    fmt()
        .with_env_filter(filter_from(std::env::var("RUST_LOG").ok().as_deref()))
        .with_target(false)
        .compact()
        .init();

    tracing::info!("Logging initialized");
}

fn filter_from(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}
