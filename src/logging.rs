use anyhow::Context as _;

const DEFAULT_FILTER: &str = "info";

/// Route `tracing` events to stderr, filtered by `RUST_LOG` (default `info`).
pub fn init() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(DEFAULT_FILTER))
        .context("build log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    tracing::trace!(default = DEFAULT_FILTER, "logging initialized");
    Ok(())
}
