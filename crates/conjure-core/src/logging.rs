//! Optional subscriber setup for hosts that want the decoder's events.
//!
//! The library only emits `tracing` events; installing a subscriber is the
//! host's call. `RUST_LOG` takes precedence over the directive passed here.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::{Result, TensorError};

/// Install a global fmt subscriber filtered by `RUST_LOG` or `default_filter`
/// (e.g. `"conjure_core=debug"`). Fails if a subscriber is already set.
pub fn init_tracing(default_filter: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| TensorError::Config(e.to_string()))?;

    let fmt_layer = fmt::layer()
        .compact()
        .with_target(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .map_err(|e| TensorError::Config(e.to_string()))
}
