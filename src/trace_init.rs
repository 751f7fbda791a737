//! JSON-lines tracing for decode runs, compiled in with the `trace` feature.
//!
//! Chart building and search emit `debug` spans; this writes them, one JSON
//! object per line, next to whatever else the run produces.

/// File created inside the trace directory.
pub const TRACE_FILE: &str = "phrasal-trace.jsonl";

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "phrasal_core=debug,phrasal=debug";

#[cfg(feature = "trace")]
static INSTALLED: std::sync::Once = std::sync::Once::new();

/// Install the file subscriber writing to `dir/`[`TRACE_FILE`]. Later calls
/// are ignored.
#[cfg(feature = "trace")]
pub fn init_tracing(dir: &std::path::Path) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    INSTALLED.call_once(|| {
        let (writer, guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::never(dir, TRACE_FILE));
        // The writer thread must outlive main.
        std::mem::forget(guard);

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        tracing_subscriber::fmt()
            .json()
            .with_writer(writer)
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_env_filter(filter)
            .init();
    });
}

#[cfg(not(feature = "trace"))]
pub fn init_tracing(_dir: &std::path::Path) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(feature = "trace"))]
    #[test]
    fn disabled_init_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        init_tracing(dir.path());
        assert!(!dir.path().join(TRACE_FILE).exists());
    }
}
