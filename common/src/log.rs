//! Severity classes for run logging.
//!
//! `tracing` has no notion of a "success" level, so success events are plain
//! INFO events emitted on [`SUCCESS_TARGET`]. Use the [`success!`](crate::success)
//! macro instead of spelling the target out.

use tracing::{Level, Metadata};

pub const SUCCESS_TARGET: &str = "adshard::success";

#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        $crate::tracing::info!(target: $crate::log::SUCCESS_TARGET, $($arg)*)
    };
}

/// How an event is tagged in the terminal and in the run log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Debug,
    Info,
    Success,
    Warn,
    Error,
}

impl Severity {
    pub fn of(meta: &Metadata<'_>) -> Self {
        match *meta.level() {
            Level::ERROR => Severity::Error,
            Level::WARN => Severity::Warn,
            Level::INFO if meta.target() == SUCCESS_TARGET => Severity::Success,
            Level::INFO => Severity::Info,
            Level::DEBUG | Level::TRACE => Severity::Debug,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Success => "SUCCESS",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}
