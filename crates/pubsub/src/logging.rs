//! Logging setup for applications built on the client.
//!
//! The library crates only emit `tracing` events. Call [`init`] once at
//! start-up to print them.

use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber.
///
/// `RUST_LOG` wins when it is set; otherwise events at `default_level`
/// (`"error"`, `"warn"`, `"info"`, `"debug"` or `"trace"`) and above are
/// shown. Calling this again, or after another subscriber was installed,
/// does nothing.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
