//! Process-wide logging setup
//!
//! Library code logs through the `log` facade. [`init_logger`] installs a
//! `tracing-subscriber` formatter on stdout which also receives `log` records,
//! printing timestamp, source file and line, level and message.

use log::LevelFilter;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing_subscriber::filter::LevelFilter as SubscriberLevel;

use crate::error::UtilsError;

static INSTALLED: OnceLock<LevelFilter> = OnceLock::new();

/// Handle returned by [`init_logger`]
#[derive(Debug, Clone, PartialEq)]
pub struct Logger {
    name: String,
    level: LevelFilter,
}

impl Logger {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Level the process-wide subscriber was installed with
    pub fn level(&self) -> LevelFilter {
        self.level
    }
}

/// Install the stdout subscriber and return a named handle.
///
/// Only the first call installs anything; later calls return a handle
/// carrying the level that is actually in effect.
pub fn init_logger(log_name: &str, level: LevelFilter) -> Logger {
    let level = *INSTALLED.get_or_init(|| {
        // Fails only when another global subscriber is already set.
        let _ = tracing_subscriber::fmt()
            .with_max_level(subscriber_level(level))
            .with_writer(std::io::stdout)
            .with_file(true)
            .with_line_number(true)
            .with_target(false)
            .try_init();
        level
    });

    Logger {
        name: log_name.to_string(),
        level,
    }
}

/// Parse a level name such as `info` or `DEBUG`
pub fn parse_level(value: &str) -> crate::Result<LevelFilter> {
    LevelFilter::from_str(value.trim()).map_err(|_| {
        UtilsError::Validation {
            message: format!(
                "Unknown log level '{}': use off, error, warn, info, debug or trace",
                value
            ),
        }
        .into()
    })
}

fn subscriber_level(level: LevelFilter) -> SubscriberLevel {
    match level {
        LevelFilter::Off => SubscriberLevel::OFF,
        LevelFilter::Error => SubscriberLevel::ERROR,
        LevelFilter::Warn => SubscriberLevel::WARN,
        LevelFilter::Info => SubscriberLevel::INFO,
        LevelFilter::Debug => SubscriberLevel::DEBUG,
        LevelFilter::Trace => SubscriberLevel::TRACE,
    }
}

pub fn print_verbose(verbose: bool, msg: &str) {
    if verbose {
        println!("Verbose: {}", msg);
    }
}
