//! Tracing setup.
//!
//! Library code only emits `tracing` events; installing a subscriber is up
//! to the application. [`init_tracing`] is a convenience for applications
//! that do not have their own setup:
//!
//! ```ignore
//! let config = archlink::ClientConfig::default();
//! archlink::init_tracing(&config.log_filter)?;
//! ```

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::ArchlinkError;

/// Installs a global `fmt` subscriber.
///
/// `RUST_LOG` wins when it is set; otherwise `default_filter` is used.
///
/// # Errors
///
/// Returns [`ArchlinkError::Tracing`] if the filter does not parse or a
/// global subscriber is already installed.
pub fn init_tracing(default_filter: &str) -> Result<(), ArchlinkError> {
    let filter = build_filter(std::env::var("RUST_LOG").ok().as_deref(), default_filter)?;

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(true));
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| ArchlinkError::Tracing(e.to_string()))
}

fn build_filter(env: Option<&str>, default_filter: &str) -> Result<EnvFilter, ArchlinkError> {
    let directives = match env {
        Some(env) if !env.trim().is_empty() => env,
        _ => default_filter,
    };
    EnvFilter::try_new(directives).map_err(|e| ArchlinkError::Tracing(e.to_string()))
}
