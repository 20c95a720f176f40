//! Log output setup.

use formsafe_core::config::ErrorReporting;
use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber writing to stderr.
///
/// `RUST_LOG` wins when set; otherwise the filter follows `reporting`.
/// Returns false if a global subscriber was already installed.
pub fn init_tracing(reporting: ErrorReporting) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(reporting.as_filter()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
