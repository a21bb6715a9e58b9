use tracing_subscriber::EnvFilter;

/// Filter directives, e.g. `CC_SESSIONS_LOG=debug`.
pub const LOG_ENV: &str = "CC_SESSIONS_LOG";

const DEFAULT_LEVEL: &str = "warn";

/// Diagnostics go to stderr only; stdout is reserved for hook output.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(DEFAULT_LEVEL))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .without_time()
        .try_init();
}
