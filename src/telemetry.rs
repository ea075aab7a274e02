//! Diagnostic logging setup
//!
//! Logs go to stderr in a compact single-line format with RFC 3339 UTC
//! timestamps. `RUST_LOG` wins when set; otherwise the level comes from the
//! number of `-v` flags.

use std::io::{self, IsTerminal};

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::EnvFilter;

/// Target prefix of events emitted by this crate
pub const TARGET_PREFIX: &str = "movie_ingest";

#[derive(Clone, Debug, Default)]
struct ChronoRfc3339Utc;

impl FormatTime for ChronoRfc3339Utc {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Utc::now();
        w.write_str(&now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
    }
}

/// Filter used when `RUST_LOG` is not set
pub fn default_directives(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    format!("warn,{TARGET_PREFIX}={level}")
}

/// Install the global subscriber. Calling it twice is a no-op.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(ChronoRfc3339Utc)
        .with_target(false)
        .with_ansi(io::stderr().is_terminal())
        .with_writer(io::stderr)
        .compact()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_by_verbosity() {
        assert_eq!(default_directives(0), "warn,movie_ingest=info");
        assert_eq!(default_directives(1), "warn,movie_ingest=debug");
        assert_eq!(default_directives(4), "warn,movie_ingest=trace");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init(0);
        init(2);
    }
}
