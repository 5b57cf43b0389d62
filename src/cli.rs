//! Command-line interface definitions for fixity.
//!
//! A single command: scan the configured tree (unless `--report-only`), log
//! the run, then produce any requested reports.
//!
//! # Example
//!
//! ```bash
//! # Scan using the default config file
//! fixity
//!
//! # Scan, then export drifted files and duplicates next to the config
//! fixity -f -d ~/fixity/photos.toml
//!
//! # Reports only, no scan
//! fixity -r --db-stats --run-log
//!
//! # Write a config template to fill in
//! fixity --create-config ~/fixity/photos.toml
//! ```

use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

/// Content-integrity baseline for a directory tree.
///
/// Every file under the monitored directory is hashed and recorded; the
/// first observation becomes its baseline. Later runs compare against it to
/// reveal silent corruption, and files sharing a baseline are reported as
/// duplicates.
#[derive(Debug, Parser, Serialize)]
#[command(name = "fixity")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,

    /// Skip the scan and only produce the requested reports
    #[arg(short, long)]
    pub report_only: bool,

    /// Print the processing time
    #[arg(short, long)]
    pub proc_time: bool,

    /// Export the run history
    #[arg(long)]
    pub run_log: bool,

    /// Export files whose content deviates from the baseline
    #[arg(short, long)]
    pub failures: bool,

    /// Export every tracked file
    #[arg(short, long)]
    pub all_rows: bool,

    /// Export files sharing their baseline content with another file
    #[arg(short, long)]
    pub duplicates: bool,

    /// Print store statistics
    #[arg(long)]
    pub db_stats: bool,

    /// Export tracked files that no longer exist on disk
    #[arg(long)]
    pub missing: bool,

    /// Delete tracked files that no longer exist on disk from the store
    #[arg(long)]
    pub purge_missing: bool,

    /// Write a config template to CONFIG_PATH and exit
    #[arg(long)]
    pub create_config: bool,

    /// Directory for CSV reports (default: the config file's directory)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Number of hashing threads (1 hashes sequentially)
    ///
    /// More threads help on SSDs and network storage; on a single spinning
    /// disk they mostly add seeking.
    #[arg(long, value_name = "N", default_value = "1", value_parser = clap::value_parser!(u16).range(1..=256))]
    pub io_threads: u16,

    /// Config file (default: fixity.toml in the platform config directory)
    #[arg(value_name = "CONFIG_PATH")]
    pub config_path: Option<PathBuf>,
}

impl Cli {
    /// Invocation parameters as recorded in the run log.
    #[must_use]
    pub fn invocation_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Whether any report was requested.
    #[must_use]
    pub fn wants_reports(&self) -> bool {
        self.run_log
            || self.failures
            || self.all_rows
            || self.duplicates
            || self.db_stats
            || self.missing
            || self.purge_missing
    }
}
