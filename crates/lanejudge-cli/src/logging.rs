use tracing_subscriber::EnvFilter;

/// Initialize logging on stderr.
///
/// An explicit level wins; otherwise `RUST_LOG`, then the config file's
/// level, then `warn`, so log lines don't drown the operator prompts.
pub fn init_logging(cli_level: Option<&str>, config_level: Option<&str>) {
    let filter = match cli_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config_level.unwrap_or("warn"))),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
