//! fixity - content-integrity baseline for directory trees
//!
//! Every file under a monitored directory is hashed with a strong digest
//! (BLAKE3) and a fast checksum (XXH3-64) and recorded in a SQLite store. The
//! first observation of a file is its baseline; later runs refresh only the
//! latest hashes, so a file whose latest hashes differ from its baseline has
//! changed on disk. Files sharing a baseline are reported as duplicates.

pub mod cli;
pub mod config;
pub mod error;
pub mod integrity;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;
pub mod store;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;

use crate::cli::Cli;
use crate::config::Settings;
use crate::error::ExitCode;
use crate::integrity::{
    duplicate_rows, purge_records, Analyzer, IntegrityScanner, ScanConfig, ScanSummary,
};
use crate::output::csv::{
    CsvReport, RecordRow, RunLogRow, ALL_FILES_REPORT, DUPLICATES_REPORT, FAILURES_REPORT,
    MISSING_REPORT, RUNLOG_REPORT,
};
use crate::output::text::{self, thousands, Console};
use crate::progress::Progress;
use crate::store::{IntegrityStore, NewRunLog};

/// Run one invocation: scan (unless report-only), log the run, then produce
/// the requested reports.
///
/// # Errors
///
/// Configuration problems surface as [`config::ConfigError`] (exit code 2);
/// store, report and other failures as general errors.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    let start = Instant::now();
    logging::init_logging(cli.verbose, cli.quiet);
    text::init_colors(cli.no_color);
    let console = Console::new(cli.quiet);

    let config_path = config::resolve_config_path(cli.config_path.as_deref())?;

    if cli.create_config {
        config::write_template(&config_path)?;
        console.success(&format!(
            "Config template written to {}. Fill in monitor_dir and db_path before the first run.",
            config_path.display()
        ));
        return Ok(ExitCode::Success);
    }

    let settings = Settings::load(&config_path)?;
    let db_path = settings.db_full_path();
    let store = IntegrityStore::open(&db_path)
        .with_context(|| format!("Failed to open store {}", db_path.display()))?;
    log::info!("Using store {}", db_path.display());

    let summary = if cli.report_only {
        log::info!("Report-only run, skipping scan");
        None
    } else {
        Some(scan(&cli, &settings, &store)?)
    };

    let run_seconds = start.elapsed().as_secs_f64();
    store
        .append_run_log(&NewRunLog {
            monitor_dir: settings.monitor_dir.display().to_string(),
            db_path: db_path.display().to_string(),
            ignore_ext: settings.ignore_ext_display(),
            run_seconds,
            prg_args: cli.invocation_json(),
            files_processed: summary.as_ref().map_or(0, |s| s.processed as u64),
            files_errored: summary.as_ref().map_or(0, |s| s.error_count() as u64),
        })
        .context("Failed to append run log")?;

    if let Some(ref summary) = summary {
        report_scan(&console, summary);
    }
    if cli.proc_time {
        console.notice(&format!("Processing time: {run_seconds:.2} seconds"));
    }

    if summary.as_ref().is_some_and(|s| s.interrupted) {
        return Ok(ExitCode::Interrupted);
    }

    if cli.wants_reports() {
        let dir = report_dir(&cli, &settings)?;
        produce_reports(&cli, &console, &settings, &store, &CsvReport::new(&dir))?;
    }

    if summary.as_ref().is_some_and(ScanSummary::has_errors) {
        Ok(ExitCode::PartialSuccess)
    } else {
        Ok(ExitCode::Success)
    }
}

fn scan(cli: &Cli, settings: &Settings, store: &IntegrityStore) -> anyhow::Result<ScanSummary> {
    let handler = signal::install_handler()?;
    let progress = Arc::new(Progress::new(cli.quiet));

    let config = ScanConfig::default()
        .with_walker_config(settings.walker_config())
        .with_io_threads(usize::from(cli.io_threads))
        .with_shutdown_flag(handler.get_flag())
        .with_progress_callback(progress);

    IntegrityScanner::new(config)
        .scan(&settings.monitor_dir, store)
        .with_context(|| format!("Scan of {} failed", settings.monitor_dir.display()))
}

fn report_scan(console: &Console, summary: &ScanSummary) {
    let line = format!(
        "Checked {} files: {} new, {} rechecked, {} skipped",
        thousands(summary.processed as u64),
        thousands(summary.inserted as u64),
        thousands(summary.updated as u64),
        thousands(summary.error_count() as u64)
    );

    if summary.interrupted {
        console.alert(&format!(
            "Scan interrupted. {} of {} files recorded before stopping.",
            thousands(summary.processed as u64),
            thousands(summary.total_files as u64)
        ));
    } else if summary.has_errors() {
        console.alert(&line);
        for error in &summary.errors {
            console.alert(&format!("  {error}"));
        }
    } else {
        console.success(&line);
    }
}

/// Reports go to `--output-dir` (created if needed) or next to the config.
fn report_dir(cli: &Cli, settings: &Settings) -> anyhow::Result<PathBuf> {
    match cli.output_dir {
        Some(ref dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
            Ok(dir.clone())
        }
        None => Ok(settings
            .config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)),
    }
}

fn produce_reports(
    cli: &Cli,
    console: &Console,
    settings: &Settings,
    store: &IntegrityStore,
    reports: &CsvReport,
) -> anyhow::Result<()> {
    let analyzer = Analyzer::new(store);

    if cli.run_log {
        let rows: Vec<RunLogRow> = store.run_logs()?.iter().map(RunLogRow::from).collect();
        match reports.write_file(RUNLOG_REPORT, &rows)? {
            Some(path) => console.success(&format!(
                "Run log written to file: {}",
                path.display()
            )),
            None => console.notice("No records found."),
        }
    }

    if cli.all_rows {
        let rows: Vec<RecordRow> = store.all_records()?.iter().map(RecordRow::from).collect();
        match reports.write_file(ALL_FILES_REPORT, &rows)? {
            Some(path) => console.success(&format!(
                "All {} tracked files written to file: {}",
                thousands(rows.len() as u64),
                path.display()
            )),
            None => console.notice("No records found."),
        }
    }

    if cli.failures {
        let rows: Vec<RecordRow> = analyzer.drifted()?.iter().map(RecordRow::from).collect();
        match reports.write_file(FAILURES_REPORT, &rows)? {
            Some(path) => console.alert(&format!(
                "Checksum report for files with a deviation. Recommend you restore these files from back up. Report written to file: {}",
                path.display()
            )),
            None => console.success(&format!(
                "No failures detected. Checked {} files.",
                thousands(store.total_rows()?)
            )),
        }
    }

    if cli.duplicates {
        let groups = analyzer.duplicates()?;
        let rows = duplicate_rows(&groups);
        match reports.write_file(DUPLICATES_REPORT, &rows)? {
            Some(path) => console.notice(&format!(
                "{} potential duplicates in {} groups. Report written to file: {}",
                thousands(rows.len() as u64),
                thousands(groups.len() as u64),
                path.display()
            )),
            None => console.success("No duplicates found..."),
        }
    }

    if cli.missing || cli.purge_missing {
        let missing = analyzer.missing()?;

        if cli.missing {
            let rows: Vec<RecordRow> = missing.iter().map(RecordRow::from).collect();
            match reports.write_file(MISSING_REPORT, &rows)? {
                Some(path) => console.alert(&format!(
                    "{} tracked files no longer exist. Report written to file: {}",
                    thousands(rows.len() as u64),
                    path.display()
                )),
                None => console.success("No missing files found."),
            }
        }

        if cli.purge_missing {
            let removed = purge_records(store, &missing)?;
            console.notice(&format!(
                "Purged {} records for missing files.",
                thousands(removed as u64)
            ));
        }
    }

    if cli.db_stats {
        println!("{}", text::render_stats(&analyzer.stats()?, settings));
    }

    Ok(())
}
