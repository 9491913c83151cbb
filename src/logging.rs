//! Logging setup and the component-tagged event macros.
//!
//! Levels come from the `[logging]` table of the configuration:
//!
//! ```toml
//! [logging]
//! default = "warn"
//!
//! [logging.modules]
//! watch = "debug"
//! ```
//!
//! A `RUST_LOG` value takes precedence over the table when set, e.g.
//! `RUST_LOG=watch=debug,selection=trace vigil --watch`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;

use crate::config::LoggingConfig;

/// Wall-clock timestamps trimmed to `HH:MM:SS.mmm`.
struct ShortTime;

impl FormatTime for ShortTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// The config table as filter directives: the default level first, then
/// one `module=level` directive per override.
fn filter_from(config: &LoggingConfig) -> EnvFilter {
    let directives = std::iter::once(config.default.clone())
        .chain(
            config
                .modules
                .iter()
                .map(|(module, level)| format!("{module}={level}")),
        )
        .collect::<Vec<_>>()
        .join(",");
    EnvFilter::new(directives)
}

/// Install the global subscriber. A `RUST_LOG` value overrides the
/// config table. Later calls are no-ops, so an embedder that already
/// installed its own subscriber wins.
pub fn init_with_config(config: &LoggingConfig) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(spec) => EnvFilter::new(spec),
        Err(_) => filter_from(config),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(ShortTime)
        .try_init();
}

/// Install the global subscriber with the default levels (quiet, `warn`).
pub fn init() {
    init_with_config(&LoggingConfig::default());
}

/// Shared body of the event macros: one `[component] event` line at the
/// given level, with an optional formatted detail tail.
#[doc(hidden)]
#[macro_export]
macro_rules! __event {
    ($level:ident, $component:expr, $event:expr) => {
        tracing::$level!("[{}] {}", $component, $event)
    };
    ($level:ident, $component:expr, $event:expr, $($arg:tt)*) => {
        tracing::$level!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}

/// Progress line tagged with the emitting component.
///
/// ```ignore
/// log_event!("watch", "cycle finished", "{} suites", results.total_suites);
/// log_event!("scm", "detected git");
/// ```
#[macro_export]
macro_rules! log_event {
    ($($args:tt)*) => {
        $crate::__event!(info, $($args)*)
    };
}

/// Diagnostic line tagged with the emitting component.
#[macro_export]
macro_rules! debug_event {
    ($($args:tt)*) => {
        $crate::__event!(debug, $($args)*)
    };
}
