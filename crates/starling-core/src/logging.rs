//! Logging setup for applications embedding starling.

use tracing_subscriber::EnvFilter;

/// Installs a global `tracing` subscriber.
///
/// Honors `RUST_LOG` when set; otherwise defaults to `info` with the noisy
/// wgpu internals capped at `warn`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,wgpu_core=warn,wgpu_hal=warn,naga=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
