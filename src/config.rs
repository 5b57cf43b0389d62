//! Configuration loading, validation and template creation.
//!
//! Configuration is layered with figment: built-in defaults, then the TOML
//! config file, then `FIXITY_*` environment variables. The merged [`Config`]
//! is validated into [`Settings`], the explicit value every component is
//! constructed from.
//!
//! ```toml
//! monitor_dir = "/srv/photos/originals"
//! db_path = "/var/lib/fixity"
//! db_file_name = "checksums.db"
//! ignore_extensions = ["XMP", "INI"]
//! follow_symlinks = false
//! ```
//!
//! Relative paths in the file are resolved against the directory holding the
//! config file.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Deserializer, Serialize};

use crate::scanner::{normalize_extension, WalkerConfig};

/// Name of the config file looked up when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "fixity.toml";

/// Prefix for environment overrides (`FIXITY_MONITOR_DIR`, ...).
pub const ENV_PREFIX: &str = "FIXITY_";

const TEMPLATE: &str = r#"# fixity configuration

# The full path to the directory to monitor.
# example: 'C:\Pictures\Originals'
# example: '/users/joe/pictures/originals'
monitor_dir = 'path to directory to monitor'

# Folder that holds the database file. The file itself is created on the
# first run. Just the folder.
db_path = 'database path here'

# Database file name. The extension .db is commonly used.
db_file_name = 'checksums.db'

# File extensions to ignore. Case doesn't matter.
ignore_extensions = ['XMP', 'INI']

# Descend into symlinked directories. Symlinked files are always checked.
follow_symlinks = false
"#;

/// Errors raised while loading or creating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file does not exist.
    #[error("Config file {0} is not there. Create it with --create-config.")]
    MissingFile(PathBuf),

    /// `--create-config` would overwrite an existing file.
    #[error("Config file {0} is already there.")]
    AlreadyExists(PathBuf),

    /// The file is not valid TOML or has values of the wrong type.
    #[error("Invalid config file {path}: {source}")]
    Parse {
        /// Config file
        path: PathBuf,
        /// Underlying figment error
        #[source]
        source: Box<figment::Error>,
    },

    /// A required setting has no value.
    #[error("Setting '{0}' is required in the config file.")]
    MissingKey(&'static str),

    /// `monitor_dir` is missing or not a directory.
    #[error("The path {0} is not a valid directory. Cannot monitor what isn't there.")]
    InvalidMonitorDir(PathBuf),

    /// `db_path` is missing or not a directory.
    #[error("The path {0} is not a valid directory. Cannot create the database file.")]
    InvalidDbPath(PathBuf),

    /// `db_file_name` is empty.
    #[error("Database file name in the config file is required.")]
    EmptyDbFileName,

    /// No platform config directory could be determined.
    #[error("Failed to determine the configuration directory")]
    NoConfigDir,

    /// Writing the template failed.
    #[error("Cannot write config file {path}: {source}")]
    Write {
        /// Target file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Raw configuration as read from the layered providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory to monitor
    #[serde(default)]
    pub monitor_dir: Option<PathBuf>,

    /// Folder holding the database file
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    /// Database file name
    #[serde(default = "default_db_file_name")]
    pub db_file_name: String,

    /// Extensions to skip; a list or a comma separated string
    #[serde(
        default = "default_ignore_extensions",
        deserialize_with = "string_or_list"
    )]
    pub ignore_extensions: Vec<String>,

    /// Descend into symlinked directories
    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_db_file_name() -> String {
    "checksums.db".to_string()
}

fn default_ignore_extensions() -> Vec<String> {
    vec!["XMP".to_string(), "INI".to_string()]
}

fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        One(String),
        Many(Vec<String>),
    }

    let items = match StringOrList::deserialize(deserializer)? {
        StringOrList::One(s) => s.split(',').map(str::to_string).collect(),
        StringOrList::Many(v) => v,
    };
    Ok(items)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            monitor_dir: None,
            db_path: None,
            db_file_name: default_db_file_name(),
            ignore_extensions: default_ignore_extensions(),
            follow_symlinks: false,
        }
    }
}

impl Config {
    /// Figment with defaults, the given TOML file and environment overrides.
    #[must_use]
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX))
    }
}

/// Validated settings for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Config file the settings came from
    pub config_path: PathBuf,
    /// Canonical directory to monitor
    pub monitor_dir: PathBuf,
    /// Canonical folder holding the database
    pub db_dir: PathBuf,
    /// Database file name
    pub db_file_name: String,
    /// Normalized extensions to skip (upper-case, no dot)
    pub ignore_extensions: Vec<String>,
    /// Descend into symlinked directories
    pub follow_symlinks: bool,
}

impl Settings {
    /// Load and validate settings from a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file is missing or invalid, or any
    /// configured path fails validation.
    pub fn load(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.is_file() {
            return Err(ConfigError::MissingFile(config_path.to_path_buf()));
        }

        let config: Config =
            Config::figment(config_path)
                .extract()
                .map_err(|e| ConfigError::Parse {
                    path: config_path.to_path_buf(),
                    source: Box::new(e),
                })?;

        log::debug!("Loaded config from {}", config_path.display());
        Self::from_config(config, config_path)
    }

    /// Validate an already merged [`Config`].
    ///
    /// Relative paths are resolved against the config file's directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for the first failing check.
    pub fn from_config(config: Config, config_path: &Path) -> Result<Self, ConfigError> {
        let base = config_path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        let monitor_dir = config
            .monitor_dir
            .ok_or(ConfigError::MissingKey("monitor_dir"))?;
        let monitor_dir = canonical_dir(&base, &monitor_dir)
            .ok_or_else(|| ConfigError::InvalidMonitorDir(base.join(&monitor_dir)))?;

        let db_path = config.db_path.ok_or(ConfigError::MissingKey("db_path"))?;
        let db_dir = canonical_dir(&base, &db_path)
            .ok_or_else(|| ConfigError::InvalidDbPath(base.join(&db_path)))?;

        let db_file_name = config.db_file_name.trim().to_string();
        if db_file_name.is_empty() {
            return Err(ConfigError::EmptyDbFileName);
        }

        let mut ignore_extensions: Vec<String> = Vec::new();
        for ext in config.ignore_extensions.iter().map(|e| normalize_extension(e)) {
            if !ext.is_empty() && !ignore_extensions.contains(&ext) {
                ignore_extensions.push(ext);
            }
        }

        Ok(Self {
            config_path: config_path.to_path_buf(),
            monitor_dir,
            db_dir,
            db_file_name,
            ignore_extensions,
            follow_symlinks: config.follow_symlinks,
        })
    }

    /// Full path of the database file.
    #[must_use]
    pub fn db_full_path(&self) -> PathBuf {
        self.db_dir.join(&self.db_file_name)
    }

    /// Ignored extensions joined for display and the run log.
    #[must_use]
    pub fn ignore_ext_display(&self) -> String {
        self.ignore_extensions.join(", ")
    }

    /// Walker configuration derived from these settings.
    #[must_use]
    pub fn walker_config(&self) -> WalkerConfig {
        WalkerConfig::with_ignored_extensions(&self.ignore_extensions)
            .follow_symlinks(self.follow_symlinks)
    }
}

fn canonical_dir(base: &Path, path: &Path) -> Option<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    let canonical = joined.canonicalize().ok()?;
    canonical.is_dir().then_some(canonical)
}

/// Resolve the config file path from the CLI argument.
///
/// Absolute paths are used as is, relative ones are taken from the current
/// directory, and no argument means [`DEFAULT_CONFIG_FILE`] in the platform
/// config directory.
///
/// # Errors
///
/// Returns [`ConfigError::NoConfigDir`] when no argument is given and the
/// platform directory cannot be determined.
pub fn resolve_config_path(arg: Option<&Path>) -> Result<PathBuf, ConfigError> {
    match arg {
        Some(p) if p.is_absolute() => Ok(p.to_path_buf()),
        Some(p) => Ok(std::env::current_dir()
            .map(|cwd| cwd.join(p))
            .unwrap_or_else(|_| p.to_path_buf())),
        None => default_config_path(),
    }
}

/// Platform-specific default config file location.
///
/// # Errors
///
/// Returns [`ConfigError::NoConfigDir`] if no home directory is known.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let project_dirs = ProjectDirs::from("org", "fixity", "fixity").ok_or(ConfigError::NoConfigDir)?;
    Ok(project_dirs.config_dir().join(DEFAULT_CONFIG_FILE))
}

/// Write a commented template config file.
///
/// # Errors
///
/// Returns [`ConfigError::AlreadyExists`] rather than overwriting, or
/// [`ConfigError::Write`] if the file cannot be written.
pub fn write_template(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        return Err(ConfigError::AlreadyExists(path.to_path_buf()));
    }

    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, TEMPLATE).map_err(write_err)?;

    log::debug!("Wrote config template to {}", path.display());
    Ok(())
}
