//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Filter used when neither `RUST_LOG` nor an explicit filter is given.
pub const DEFAULT_LOG_FILTER: &str = "healyx_core=info";

/// Pick the filter directive: `RUST_LOG` wins, then `requested`, then the default.
fn env_filter(requested: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        requested
            .and_then(|f| EnvFilter::try_new(f).ok())
            .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
    })
}

/// Install the global fmt subscriber.
///
/// Returns false if a subscriber was already installed; the shell may call
/// this more than once.
pub fn init_logging(filter: Option<&str>) -> bool {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter(filter))
        .try_init()
        .is_ok();
    if installed {
        tracing::info!("Healyx core v{} logging initialized", env!("CARGO_PKG_VERSION"));
    }
    installed
}
