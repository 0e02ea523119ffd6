//! Log setup for the `roster` binary.
//!
//! What shows up at each level:
//!
//! - `error`/`warn` (`-q`): unreadable session data being discarded, view
//!   and chart write failures.
//! - `info` (default): sign-in and sign-out, each roster mutation by record
//!   id, database open, export.
//! - `debug` (`-v`): store reads and writes with key and size, search match
//!   counts, edit-form changes, shell commands.
//! - `trace` (`-vv`): everything above, nothing extra from roster itself.
//!
//! Output goes to stderr; stdout carries tables and CSV.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How much roster logs, chosen by `-q` / `-v` / `-vv`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// `-q`: errors only.
    Quiet,
    /// No flag: lifecycle and mutations.
    #[default]
    Normal,
    /// `-v`: store traffic.
    Verbose,
    /// `-vv`.
    Trace,
}

impl Verbosity {
    /// The roster-level filter for this verbosity.
    #[must_use]
    pub fn level(self) -> LevelFilter {
        match self {
            Self::Quiet => LevelFilter::ERROR,
            Self::Normal => LevelFilter::INFO,
            Self::Verbose => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }
}

/// Build the filter: a parseable `rust_log` wins, otherwise only the
/// `roster` target is enabled at the verbosity's level.
#[must_use]
pub fn build_filter(verbosity: Verbosity, rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(format!("roster={}", verbosity.level())))
}

/// Install the stderr subscriber. Later calls are no-ops.
///
/// ```no_run
/// use roster::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::Verbose);
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(verbosity, rust_log.as_deref());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
