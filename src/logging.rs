use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// sqlx logs every executed statement at debug under `sqlx::query`.
pub const DEFAULT_FILTER: &str = "info,sqlx::query=debug";

/// Installs the global subscriber. `RUST_LOG` replaces [`DEFAULT_FILTER`],
/// e.g. `RUST_LOG=warn,sqlx::query=debug` keeps the statement log while
/// silencing per-row progress.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .compact();

    let filter_layer = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
