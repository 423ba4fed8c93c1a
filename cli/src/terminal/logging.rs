//! Terminal and run-log output.
//!
//! Every line goes through `tracing`. The terminal gets a symbol-prefixed
//! rendering; a [`RunLog`] additionally appends each event, timestamped and
//! tagged with its [`Severity`], to a file named after the run start time.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use chrono::{DateTime, Local, SecondsFormat};
use colored::*;
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::format::{self, Writer};
use tracing_subscriber::fmt::{FmtContext, FormatEvent};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use adshard_common::log::Severity;

use crate::terminal::spinner::SpinnerWriter;

/// Decorative output (headers, tables). Shown on the terminal only.
pub const PRINT_TARGET: &str = "adshard::print";

pub struct AdshardFormatter;

impl<S, N> FormatEvent<S, N> for AdshardFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> format::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();

        if meta.target() != PRINT_TARGET {
            let (symbol, color_func): (&str, fn(ColoredString) -> ColoredString) = match Severity::of(meta) {
                Severity::Debug => ("[?]", |s| s.blue()),
                Severity::Info => ("[*]", |s| s.bright_black().bold()),
                Severity::Success => ("[+]", |s| s.green().bold()),
                Severity::Warn => ("[!]", |s| s.yellow().bold()),
                Severity::Error => ("[-]", |s| s.red().bold()),
            };
            write!(writer, "{} ", color_func(symbol.into()))?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// `<RFC 3339 timestamp> [SEVERITY] message fields`
pub struct RunFileFormatter;

impl<S, N> FormatEvent<S, N> for RunFileFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> format::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let now: String = Local::now().to_rfc3339_opts(SecondsFormat::Millis, false);
        let tag: &str = Severity::of(event.metadata()).tag();

        write!(writer, "{now} [{tag}] ")?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Terminal output only, for commands that do not touch the directory.
pub fn init_terminal() -> DefaultGuard {
    let subscriber = tracing_subscriber::registry().with(env_filter()).with(
        fmt::layer()
            .event_format(AdshardFormatter)
            .with_writer(|| SpinnerWriter),
    );
    tracing::subscriber::set_default(subscriber)
}

pub fn log_file_name(started_at: &DateTime<Local>) -> String {
    format!("adshard_{}.log", started_at.format("%Y%m%d_%H%M%S"))
}

/// The logging context of one run.
///
/// Owns the log file and the subscriber that writes to it. Output stops being
/// recorded when the value is dropped.
pub struct RunLog {
    path: PathBuf,
    started_at: DateTime<Local>,
    _guard: DefaultGuard,
}

impl RunLog {
    pub fn start(dir: &Path) -> anyhow::Result<Self> {
        let started_at: DateTime<Local> = Local::now();

        fs::create_dir_all(dir).with_context(|| format!("creating log directory {}", dir.display()))?;
        let path: PathBuf = dir.join(log_file_name(&started_at));
        let file: File = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening log file {}", path.display()))?;

        let terminal_layer = fmt::layer()
            .event_format(AdshardFormatter)
            .with_writer(|| SpinnerWriter);

        let file_layer = fmt::layer()
            .event_format(RunFileFormatter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .with_filter(filter_fn(|meta: &Metadata<'_>| meta.target() != PRINT_TARGET));

        let subscriber = tracing_subscriber::registry()
            .with(env_filter())
            .with(terminal_layer)
            .with(file_layer);

        Ok(Self {
            path,
            started_at,
            _guard: tracing::subscriber::set_default(subscriber),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adshard_common::success;
    use chrono::TimeZone;
    use tempfile::TempDir;
    use tracing::{error, info};

    #[test]
    fn test_log_file_name() {
        let started = Local.with_ymd_and_hms(2026, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(log_file_name(&started), "adshard_20260307_090501.log");
    }

    #[test]
    fn test_run_log_records_severity_classes() {
        let dir = TempDir::new().unwrap();
        let run_log = RunLog::start(dir.path()).unwrap();
        let path = run_log.path().to_path_buf();

        info!("reading groups");
        success!("Added HOST01 to WECGroupC");
        error!("Failed to add HOST02 to WECGroup1");
        tracing::info!(target: PRINT_TARGET, "──── banner ────");
        drop(run_log);
        info!("after the run");

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3, "{content}");
        assert!(lines[0].ends_with("[INFO] reading groups"));
        assert!(lines[1].ends_with("[SUCCESS] Added HOST01 to WECGroupC"));
        assert!(lines[2].ends_with("[ERROR] Failed to add HOST02 to WECGroup1"));
        assert!(lines.iter().all(|l| DateTime::parse_from_rfc3339(l.split(' ').next().unwrap()).is_ok()));
    }
}
