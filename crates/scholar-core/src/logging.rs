//! Tracing subscriber setup shared by binaries.
//!
//! Diagnostics go to stderr; stdout is reserved for command output (answers,
//! generated pages) so it can be piped or redirected cleanly.

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Build the filter from `RUST_LOG` if set, otherwise from `level`.
///
/// Unknown levels fall back to `info`.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// A formatting subscriber writing to `writer`.
pub fn subscriber<W>(level: &str, writer: W) -> impl tracing::Subscriber + Send + Sync
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_target(false)
        .with_writer(writer)
        .finish()
}

/// Install the global subscriber on stderr. Later calls are ignored.
pub fn init(level: &str) {
    let _ = tracing::subscriber::set_global_default(subscriber(level, std::io::stderr));
}
