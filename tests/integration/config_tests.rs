use fixity::config::{resolve_config_path, write_template, Config, ConfigError, Settings};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_config(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("fixity.toml");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_load_full_config() {
    let dir = TempDir::new().unwrap();
    let monitor = dir.path().join("photos");
    fs::create_dir(&monitor).unwrap();
    let config = Config {
        monitor_dir: Some(monitor.clone()),
        db_path: Some(dir.path().to_path_buf()),
        db_file_name: "photos.db".to_string(),
        ignore_extensions: vec!["xmp".to_string(), "DS_STORE".to_string()],
        follow_symlinks: true,
    };
    let path = write_config(dir.path(), &toml::to_string(&config).unwrap());

    let settings = Settings::load(&path).unwrap();
    assert_eq!(settings.monitor_dir, monitor.canonicalize().unwrap());
    assert_eq!(settings.db_file_name, "photos.db");
    assert_eq!(settings.ignore_extensions, vec!["XMP", "DS_STORE"]);
    assert_eq!(settings.config_path, path);
    assert!(settings.walker_config().follow_symlinks);
}

#[test]
fn test_load_applies_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), "monitor_dir = \".\"\ndb_path = \".\"\n");

    let settings = Settings::load(&path).unwrap();
    assert_eq!(settings.db_file_name, "checksums.db");
    assert_eq!(settings.ignore_extensions, vec!["XMP", "INI"]);
    assert_eq!(settings.monitor_dir, dir.path().canonicalize().unwrap());
}

#[test]
fn test_ignore_extensions_as_comma_string() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        dir.path(),
        "monitor_dir = \".\"\ndb_path = \".\"\nignore_extensions = \"xmp, .ini,THM\"\n",
    );

    let settings = Settings::load(&path).unwrap();
    assert_eq!(settings.ignore_extensions, vec!["XMP", "INI", "THM"]);
}

#[test]
fn test_empty_ignore_list() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        dir.path(),
        "monitor_dir = \".\"\ndb_path = \".\"\nignore_extensions = []\n",
    );

    let settings = Settings::load(&path).unwrap();
    assert!(settings.ignore_extensions.is_empty());
    assert_eq!(settings.ignore_ext_display(), "");
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = Settings::load(&dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::MissingFile(_)));
}

#[test]
fn test_malformed_toml() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), "monitor_dir = [unterminated\n");

    let err = Settings::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

fn load_err(dir: &Path, body: &str) -> ConfigError {
    Settings::load(&write_config(dir, body)).unwrap_err()
}

#[test]
fn test_each_invalid_key() {
    let dir = TempDir::new().unwrap();
    let d = dir.path();
    fs::write(d.join("file.txt"), "x").unwrap();

    assert!(matches!(
        load_err(d, "db_path = \".\"\n"),
        ConfigError::MissingKey("monitor_dir")
    ));
    assert!(matches!(
        load_err(d, "monitor_dir = \".\"\n"),
        ConfigError::MissingKey("db_path")
    ));
    assert!(matches!(
        load_err(d, "monitor_dir = \"missing\"\ndb_path = \".\"\n"),
        ConfigError::InvalidMonitorDir(_)
    ));
    assert!(matches!(
        load_err(d, "monitor_dir = \"file.txt\"\ndb_path = \".\"\n"),
        ConfigError::InvalidMonitorDir(_)
    ));
    assert!(matches!(
        load_err(d, "monitor_dir = \".\"\ndb_path = \"missing\"\n"),
        ConfigError::InvalidDbPath(_)
    ));
    assert!(matches!(
        load_err(d, "monitor_dir = \".\"\ndb_path = \".\"\ndb_file_name = \"  \"\n"),
        ConfigError::EmptyDbFileName
    ));
}

#[test]
fn test_template_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("fixity.toml");

    write_template(&path).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("monitor_dir"));
    assert!(text.contains("db_file_name = 'checksums.db'"));

    // Placeholder paths parse but do not validate.
    let err = Settings::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidMonitorDir(_)));

    let err = write_template(&path).unwrap_err();
    assert!(matches!(err, ConfigError::AlreadyExists(_)));
}

#[test]
fn test_resolve_config_path() {
    let abs = std::env::temp_dir().join("fixity.toml");
    assert_eq!(resolve_config_path(Some(&abs)).unwrap(), abs);

    let rel = resolve_config_path(Some(Path::new("conf/fixity.toml"))).unwrap();
    assert!(rel.is_absolute());
    assert!(rel.ends_with("conf/fixity.toml"));
}
