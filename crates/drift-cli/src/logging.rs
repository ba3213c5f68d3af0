use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Map a configured level name onto a tracing filter directive.
///
/// Accepts the upper-case names used by existing configuration documents
/// (`WARNING`, `CRITICAL`) as well as tracing's own names.
pub fn level_directive(name: &str) -> Option<&'static str> {
    match name.trim().to_ascii_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" | "warning" => Some("warn"),
        "error" | "critical" | "fatal" => Some("error"),
        "off" => Some("off"),
        _ => None,
    }
}

/// Filter used when `RUST_LOG` is unset.
pub fn default_directive(verbose: bool, configured: Option<&str>) -> &'static str {
    if verbose {
        return "debug";
    }
    configured.and_then(level_directive).unwrap_or("warn")
}

/// Initialize a tracing subscriber writing to stderr.
///
/// `RUST_LOG` wins over `--verbose`, which wins over the level named in
/// the configuration document.
pub fn init(
    verbose: bool,
    configured: Option<&str>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_level(true)
        .compact();

    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(verbose, configured)))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
