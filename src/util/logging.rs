//! Diagnostic logging for the `tcy` binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left to the
//! binary. Output goes to stderr so stdout stays parseable.
//!
//! The level comes from `--log-level`, then `TCY_LOG`, then `RUST_LOG`, then `warn`.
//! Directives work as usual:
//!
//! ```bash
//! TCY_LOG="task_cycle::ops::rewrite=debug" tcy filter tr.json
//! ```

use std::io::IsTerminal;
use std::str::FromStr;

use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "TCY_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Single-line events
    #[default]
    Compact,
    /// Multi-line events with source locations
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("unknown log format: {}", s)),
        }
    }
}

impl LogFormat {
    pub fn variants() -> &'static [&'static str] {
        &["compact", "pretty", "json"]
    }
}

/// Resolve the filter directive from the flag and environment
fn filter_directive(level: Option<&str>) -> String {
    level
        .map(str::to_string)
        .or_else(|| std::env::var(LOG_ENV).ok())
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "warn".to_string())
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(level: Option<&str>, format: LogFormat) -> Result<(), Box<dyn std::error::Error>> {
    let directive = filter_directive(level);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));

    let layer = fmt::Layer::default()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_level(true)
        .with_span_events(FmtSpan::NONE);

    match format {
        LogFormat::Compact => {
            Registry::default()
                .with(filter)
                .with(layer.with_target(false).compact())
                .try_init()?;
        }
        LogFormat::Pretty => {
            Registry::default()
                .with(filter)
                .with(
                    layer
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true)
                        .pretty(),
                )
                .try_init()?;
        }
        LogFormat::Json => {
            Registry::default()
                .with(filter)
                .with(layer.with_target(true).json())
                .try_init()?;
        }
    }
    Ok(())
}
