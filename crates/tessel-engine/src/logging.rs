//! Subscriber setup for binaries and examples.
//!
//! The library only emits `tracing` events; nothing here runs unless a
//! binary calls [`init`].

use tracing_subscriber::EnvFilter;

/// Install a formatted subscriber filtered by `RUST_LOG`, defaulting to
/// `warn`. Does nothing if a global subscriber is already set.
pub fn init() {
    init_with_default("warn");
}

/// Like [`init`] with a custom fallback filter such as `"tessel_engine=info"`.
pub fn init_with_default(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
