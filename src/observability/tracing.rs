use anyhow::{Error, Result};
use once_cell::sync::OnceCell;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// Initialize the tracing subscriber exactly once.
///
/// Uses `RUST_LOG` when set, `info` otherwise, and emits JSON-formatted
/// structured events.
///
/// # Errors
/// Returns an error when subscriber installation fails.
pub fn init() -> Result<()> {
    TRACING_INIT.get_or_try_init(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let fmt_layer = tracing_subscriber::fmt::layer().with_target(false).json();

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e: tracing_subscriber::util::TryInitError| Error::msg(e.to_string()))
    })?;
    Ok(())
}
