//! Driver for the twin expression engine.
//!
//! Parses, simplifies, describes, evaluates and binds expressions from the
//! command line, with buildings and environments loaded from JSON fixtures.

pub mod commands;
pub mod fixture;

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call more than once. Enable with `RUST_LOG=tx_bind=debug` or
/// `RUST_LOG=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}
