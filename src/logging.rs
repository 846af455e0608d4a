use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Install the global subscriber. Logs go to stderr; stdout carries the
/// transcript and CSV output.
///
/// `RUST_LOG` wins when set. Otherwise `verbose` selects debug, and debug
/// builds default to info while release builds only show warnings.
pub fn init(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else if cfg!(debug_assertions) {
        LevelFilter::INFO
    } else {
        LevelFilter::WARN
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    // A subscriber may already be installed (e.g. by a test harness).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_names(true)
        .try_init();
}
