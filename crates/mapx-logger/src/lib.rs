//! Process-wide log backend: `[SEVERITY] <local time> <message>` on stderr.

pub mod severity;
pub mod systime;

use std::env;

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use once_cell::sync::OnceCell;

pub use severity::LogSeverity;
pub use systime::now;

/// Environment variable consulted when no level is given explicitly.
pub const LEVEL_ENV: &str = "MAPX_LOG";

static LOGGER: OnceCell<Logger> = OnceCell::new();

struct Logger {
    level: LevelFilter,
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            log(record.args().to_string(), record.level().into());
        }
    }

    fn flush(&self) {}
}

pub fn log(msg: String, log_severity: LogSeverity) {
    eprintln!("{}", format_line(&msg, log_severity, &now()));
}

fn format_line(msg: &str, log_severity: LogSeverity, time: &str) -> String {
    format!("[{}] {} {}", log_severity, time, msg)
}

/// Installs the logger. Only the first call takes effect.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    let logger = LOGGER.get_or_init(|| Logger { level });
    log::set_logger(logger)?;
    log::set_max_level(logger.level);
    Ok(())
}

/// Level named by `MAPX_LOG`, or `default` if it is unset or unparsable.
pub fn level_from_env(default: LevelFilter) -> LevelFilter {
    env::var(LEVEL_ENV)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
