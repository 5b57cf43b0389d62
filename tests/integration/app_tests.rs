use clap::Parser;
use fixity::cli::Cli;
use fixity::config::ConfigError;
use fixity::error::ExitCode;
use fixity::run_app;
use fixity::store::IntegrityStore;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    root: PathBuf,
    monitor: PathBuf,
    config: PathBuf,
    reports: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let monitor = root.join("monitor");
        let reports = root.join("reports");
        fs::create_dir(&monitor).unwrap();

        let config = root.join("fixity.toml");
        fs::write(
            &config,
            "monitor_dir = 'monitor'\ndb_path = '.'\nignore_extensions = ['INI']\n",
        )
        .unwrap();

        Self {
            _dir: dir,
            root,
            monitor,
            config,
            reports,
        }
    }

    fn run(&self, flags: &[&str]) -> anyhow::Result<ExitCode> {
        let reports = self.reports.to_string_lossy().into_owned();
        let config = self.config.to_string_lossy().into_owned();
        let mut args = vec!["fixity", "-q", "-o", reports.as_str()];
        args.extend_from_slice(flags);
        args.push(config.as_str());
        run_app(Cli::try_parse_from(args).unwrap())
    }

    fn store(&self) -> IntegrityStore {
        IntegrityStore::open(&self.root.join("checksums.db")).unwrap()
    }

    fn report(&self, name: &str) -> PathBuf {
        self.reports.join(name)
    }
}

fn csv_rows(path: &Path) -> Vec<csv::StringRecord> {
    csv::Reader::from_path(path)
        .unwrap()
        .records()
        .map(Result::unwrap)
        .collect()
}

#[test]
fn test_scan_then_reports() {
    let fx = Fixture::new();
    fs::write(fx.monitor.join("x.txt"), "hello").unwrap();
    fs::write(fx.monitor.join("y.txt"), "hello").unwrap();
    fs::write(fx.monitor.join("z.ini"), "ignored").unwrap();

    assert_eq!(fx.run(&[]).unwrap(), ExitCode::Success);
    assert_eq!(fx.store().total_rows().unwrap(), 2);

    let code = fx.run(&["-r", "-a", "-d", "-f", "--run-log"]).unwrap();
    assert_eq!(code, ExitCode::Success);

    assert_eq!(csv_rows(&fx.report("all_files.csv")).len(), 2);
    assert_eq!(csv_rows(&fx.report("duplicates.csv")).len(), 2);
    assert!(!fx.report("failures.csv").exists());
    assert_eq!(csv_rows(&fx.report("runlog.csv")).len(), 2);
}

#[test]
fn test_report_only_does_not_scan() {
    let fx = Fixture::new();
    fs::write(fx.monitor.join("a.txt"), "a").unwrap();

    assert_eq!(fx.run(&["-r"]).unwrap(), ExitCode::Success);

    let store = fx.store();
    assert_eq!(store.total_rows().unwrap(), 0);
    let logs = store.run_logs().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].files_processed, 0);

    let args: serde_json::Value = serde_json::from_str(&logs[0].prg_args).unwrap();
    assert_eq!(args["report_only"], true);
}

#[test]
fn test_run_log_records_each_invocation() {
    let fx = Fixture::new();
    fs::write(fx.monitor.join("a.txt"), "a").unwrap();
    fs::write(fx.monitor.join("b.txt"), "b").unwrap();

    fx.run(&[]).unwrap();
    fx.run(&["-p"]).unwrap();

    let logs = fx.store().run_logs().unwrap();
    assert_eq!(logs.len(), 2);
    assert!(logs.iter().all(|l| l.files_processed == 2));
    assert!(logs.iter().all(|l| l.ignore_ext == "INI"));
    assert_eq!(logs[0].monitor_dir, fx.monitor.display().to_string());
    assert!(logs.iter().all(|l| l.run_seconds >= 0.0));
}

#[test]
fn test_drift_detected_end_to_end() {
    let fx = Fixture::new();
    fs::write(fx.monitor.join("x.txt"), "hello").unwrap();
    fx.run(&[]).unwrap();

    fs::write(fx.monitor.join("x.txt"), "world").unwrap();
    assert_eq!(fx.run(&["-f"]).unwrap(), ExitCode::Success);

    let rows = csv_rows(&fx.report("failures.csv"));
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][2], "x.txt");
}

#[test]
fn test_stale_failures_report_is_removed() {
    let fx = Fixture::new();
    fs::write(fx.monitor.join("x.txt"), "hello").unwrap();
    fx.run(&[]).unwrap();

    fs::write(fx.monitor.join("x.txt"), "world").unwrap();
    fx.run(&["-f"]).unwrap();
    assert!(fx.report("failures.csv").exists());

    // Restored from backup: the old report must not linger.
    fs::write(fx.monitor.join("x.txt"), "hello").unwrap();
    assert_eq!(fx.run(&["-f"]).unwrap(), ExitCode::Success);
    assert!(!fx.report("failures.csv").exists());
}

#[test]
fn test_missing_and_purge() {
    let fx = Fixture::new();
    fs::write(fx.monitor.join("a.txt"), "a").unwrap();
    fs::write(fx.monitor.join("b.txt"), "b").unwrap();
    fx.run(&[]).unwrap();

    fs::remove_file(fx.monitor.join("b.txt")).unwrap();
    fx.run(&["-r", "--missing"]).unwrap();
    assert_eq!(csv_rows(&fx.report("missing.csv")).len(), 1);
    assert_eq!(fx.store().total_rows().unwrap(), 2);

    fx.run(&["-r", "--purge-missing"]).unwrap();
    assert_eq!(fx.store().total_rows().unwrap(), 1);

    fx.run(&["-r", "--missing"]).unwrap();
    assert!(!fx.report("missing.csv").exists());
}

#[test]
fn test_db_stats_on_empty_store() {
    let fx = Fixture::new();
    assert_eq!(fx.run(&["--db-stats"]).unwrap(), ExitCode::Success);
    assert_eq!(fx.store().total_rows().unwrap(), 0);
}

#[test]
fn test_missing_config_is_config_error() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("absent.toml");
    let cli = Cli::try_parse_from(["fixity", "-q", config.to_str().unwrap()]).unwrap();

    let err = run_app(cli).unwrap_err();
    assert!(err.downcast_ref::<ConfigError>().is_some());
    assert_eq!(ExitCode::for_error(&err), ExitCode::ConfigError);
}

#[test]
fn test_invalid_config_does_not_touch_store() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("fixity.toml");
    fs::write(&config, "monitor_dir = 'nowhere'\ndb_path = '.'\n").unwrap();
    let cli = Cli::try_parse_from(["fixity", "-q", config.to_str().unwrap()]).unwrap();

    let err = run_app(cli).unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::ConfigError);
    assert!(!dir.path().join("checksums.db").exists());
}

#[test]
fn test_create_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("new.toml");
    let path = config.to_str().unwrap();

    let cli = Cli::try_parse_from(["fixity", "-q", "--create-config", path]).unwrap();
    assert_eq!(run_app(cli).unwrap(), ExitCode::Success);
    assert!(config.exists());

    let cli = Cli::try_parse_from(["fixity", "-q", "--create-config", path]).unwrap();
    let err = run_app(cli).unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::ConfigError);
}
