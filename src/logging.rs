//! Logging and tracing initialization.
//!
//! Call one of these once, **before** creating the [`App`](crate::App).
//! The log level is controlled by the `RUST_LOG` environment variable:
//!
//! ```bash
//! # Show all logs including request traces
//! RUST_LOG=debug cargo run
//!
//! # Fine-grained control
//! RUST_LOG=byline=debug,tower_http=debug,sqlx=warn cargo run
//! ```

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging with sensible defaults (formatted output to stdout).
///
/// Defaults to `info` when `RUST_LOG` is not set.
///
/// # Panics
///
/// Panics if called more than once.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize JSON-formatted logging (recommended for production log
/// aggregation).
///
/// # Panics
///
/// Panics if called more than once.
pub fn init_logging_json() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}
