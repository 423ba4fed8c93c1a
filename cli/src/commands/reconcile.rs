use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::Context;
use colored::*;
use tracing::{error, info, warn};

use adshard_core::ShardService;
use adshard_core::reconciler::{Outcome, PassReport, PassSummary};
use adshard_protocols::ldap::LdapDirectory;

use crate::commands::ReconcileArgs;
use crate::terminal::logging::RunLog;
use crate::terminal::{colors, print, spinner};

/// Exit status when at least one machine could not be added.
const EXIT_PARTIAL_FAILURE: u8 = 2;

pub async fn reconcile(args: ReconcileArgs) -> anyhow::Result<ExitCode> {
    let run_log = RunLog::start(&args.log_dir)?;
    print::banner();
    print::header("starting shard pass");
    info!(
        "Run started {} (log: {})",
        run_log.started_at().format("%Y-%m-%d %H:%M:%S"),
        run_log.path().display()
    );

    let start_time: Instant = Instant::now();
    let code = match run_pass(&args).await {
        Ok(report) => {
            pass_ends(&report, start_time.elapsed(), args.dry_run);
            exit_code(&report.summary)
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    };

    Ok(code)
}

async fn run_pass(args: &ReconcileArgs) -> anyhow::Result<PassReport> {
    let cfg = args.to_config()?;
    if cfg.dry_run {
        warn!("Dry run: no membership will be changed");
    }

    let settings = args.connection.to_settings();
    let directory = LdapDirectory::connect(&settings)
        .await
        .with_context(|| format!("connecting to {}", settings.url))?;

    let service = ShardService::new(Box::new(directory)).with_progress(Box::new(spinner::report_progress));

    spinner::start("Reading directory...");
    let result = service.run(&cfg).await;
    spinner::finish();

    Ok(result?)
}

fn exit_code(summary: &PassSummary) -> ExitCode {
    if summary.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_PARTIAL_FAILURE)
    }
}

fn pass_ends(report: &PassReport, total_time: Duration, dry_run: bool) {
    let summary = &report.summary;

    if summary.machines == 0 {
        print::header("no machines found");
        return;
    }

    print::header("shard pass");
    print_counts(summary, dry_run);

    if !summary.per_group.is_empty() {
        print::header("assignments");
        print::align_keys(summary.per_group.keys().map(String::as_str));
        for (group, count) in &summary.per_group {
            print::aligned_line(group, count.to_string());
        }
    }

    if !summary.is_clean() {
        print::header("failures");
        for failed in report.failures() {
            if let Outcome::AddFailed { reason } = &failed.outcome {
                print::aligned_line(failed.machine.name(), format!("{} ({reason})", failed.machine.group()).red());
            }
        }
    }

    print::fat_separator();
    let added: ColoredString = format!("{} added", summary.added).bold().green();
    let failed: ColoredString = match summary.failed {
        0 => "0 failed".normal(),
        n => format!("{n} failed").bold().red(),
    };
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();
    let output: ColoredString =
        format!("Pass Complete: {added}, {failed} in {total_time}").color(colors::TEXT_DEFAULT);
    print::centerln(&output.to_string());
}

fn print_counts(summary: &PassSummary, dry_run: bool) {
    let mut rows: Vec<(&str, String)> = vec![
        ("Machines", summary.machines.to_string()),
        ("Already member", summary.already_member.to_string()),
        ("Added", summary.added.to_string()),
        ("Failed", summary.failed.to_string()),
    ];
    if dry_run {
        rows.push(("Would add", summary.planned.to_string()));
    }
    if summary.skipped > 0 {
        rows.push(("Skipped", summary.skipped.to_string()));
    }

    print::align_keys(rows.iter().map(|(key, _)| *key));
    for (key, value) in rows {
        print::aligned_line(key, value);
    }
}
