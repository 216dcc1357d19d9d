//! A thin `tracing` facade so every layer logs with the same fields
//! instead of each inventing its own.
//!
//! Deliberately small: this is not a metrics surface, just consistent
//! span/event shape for dispatch, transact and transport-frame logging.

use tracing::{span, Level, Span};

/// A span covering one Looper dispatch of a single message.
pub fn dispatch_span(what: i32) -> Span {
    span!(Level::TRACE, "looper.dispatch", what)
}

/// A span covering one binder transaction, local or remote.
pub fn transact_span(uri: &str, what: i32, transaction_id: Option<u32>) -> Span {
    span!(Level::DEBUG, "binder.transact", uri, what, transaction_id)
}

/// A span covering one wire frame read or written by a transport plugin.
pub fn frame_span(direction: &'static str, uri: &str, transaction_id: u32) -> Span {
    span!(Level::TRACE, "transport.frame", direction, uri, transaction_id)
}

/// Initializes a `tracing_subscriber` fmt layer honoring `RUST_LOG`,
/// defaulting to `info` when unset. Intended for binaries and tests, not
/// for `mindroid-core` itself to call implicitly.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
