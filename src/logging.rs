//! Diagnostic output for the command line.

use tracing::metadata::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a filter directive, e.g. `contentgraph=debug`.
pub const LOG_ENV: &str = "CONTENTGRAPH_LOG";

/// Installs a stderr subscriber. `CONTENTGRAPH_LOG` wins over `verbosity`.
///
/// Calling it twice is harmless; the second call leaves the first subscriber in place.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::builder()
        .with_default_directive(level_from_verbosity(verbosity).into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .try_init();
}

pub fn level_from_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}
