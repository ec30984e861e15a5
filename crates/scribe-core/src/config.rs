//! Configuration for scribe
//!
//! All settings have defaults; a config file only needs the values it
//! changes. Files ending in `.toml` are read as TOML, anything else as JSON.
//! Relative paths are resolved against the data directory.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable naming a JSON config file
pub const CONFIG_ENV: &str = "SCRIBE_CONFIG";
/// Environment variable overriding `server.addr`
pub const ADDR_ENV: &str = "SCRIBE_ADDR";
/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "SCRIBE_DATA_DIR";

/// System-wide configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScribeConfig {
    pub server: ServerConfig,
    pub paths: PathsConfig,
    pub identifiers: IdentifierConfig,
    pub backups: BackupConfig,
    pub cors: CorsConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:5000".to_string(),
        }
    }
}

/// On-disk locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Base for every relative path below
    pub data_dir: PathBuf,
    /// One `<project>.json` note document per project
    pub notes_dir: PathBuf,
    pub notes_backups_dir: PathBuf,
    /// One `<project>.json` key list per project
    pub users_dir: PathBuf,
    /// One `<project>.json` task document per project
    pub tasks_dir: PathBuf,
    pub tasks_backups_dir: PathBuf,
    /// One `<project>.md` prompt per project
    pub prompts_dir: PathBuf,
    /// One folder per project of free-form files
    pub disk_dir: PathBuf,
    /// Type hierarchy document
    pub hierarchy_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            notes_dir: PathBuf::from("notes"),
            notes_backups_dir: PathBuf::from("notes/backups"),
            users_dir: PathBuf::from("users"),
            tasks_dir: PathBuf::from("tasks"),
            tasks_backups_dir: PathBuf::from("tasks/backups"),
            prompts_dir: PathBuf::from("prompts"),
            disk_dir: PathBuf::from("disk"),
            hierarchy_file: PathBuf::from("config/type_hierarchy.json"),
        }
    }
}

impl PathsConfig {
    /// Resolve a configured path against `data_dir`
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }

    pub fn notes_dir(&self) -> PathBuf {
        self.resolve(&self.notes_dir)
    }

    pub fn notes_backups_dir(&self) -> PathBuf {
        self.resolve(&self.notes_backups_dir)
    }

    pub fn users_dir(&self) -> PathBuf {
        self.resolve(&self.users_dir)
    }

    pub fn tasks_dir(&self) -> PathBuf {
        self.resolve(&self.tasks_dir)
    }

    pub fn tasks_backups_dir(&self) -> PathBuf {
        self.resolve(&self.tasks_backups_dir)
    }

    pub fn prompts_dir(&self) -> PathBuf {
        self.resolve(&self.prompts_dir)
    }

    pub fn disk_dir(&self) -> PathBuf {
        self.resolve(&self.disk_dir)
    }

    pub fn hierarchy_file(&self) -> PathBuf {
        self.resolve(&self.hierarchy_file)
    }
}

/// Identifier parsing mode
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentifierConfig {
    /// Reject identifiers containing text outside `<type:name>` segments
    pub strict: bool,
}

/// Backup-before-overwrite settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    pub enabled: bool,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Cross-origin settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins; empty allows any origin
    pub allowed_origins: Vec<String>,
}

impl ScribeConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults rooted at `data_dir`
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let mut config = Self::default();
        config.paths.data_dir = data_dir.into();
        config
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load configuration from a JSON or TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::Missing(path.to_path_buf())
            } else {
                ConfigError::Io {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
            }
        })?;
        let parsed = if path.extension().is_some_and(|ext| ext == "toml") {
            Self::from_toml(&raw).map_err(|e| e.to_string())
        } else {
            Self::from_json(&raw).map_err(|e| e.to_string())
        };
        parsed.map_err(|message| ConfigError::Malformed {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Build configuration from the process environment
    ///
    /// Starts from `$SCRIBE_CONFIG` if set (defaults otherwise), then applies
    /// `$SCRIBE_ADDR` and `$SCRIBE_DATA_DIR`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// [`ScribeConfig::from_env`] with an injectable variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup(CONFIG_ENV) {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Some(addr) = lookup(ADDR_ENV) {
            config.server.addr = addr;
        }
        if let Some(dir) = lookup(DATA_DIR_ENV) {
            config.paths.data_dir = PathBuf::from(dir);
        }
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "server.addr is not a socket address: {:?}",
                self.server.addr
            )));
        }

        let paths = [
            ("notes_dir", &self.paths.notes_dir),
            ("users_dir", &self.paths.users_dir),
            ("tasks_dir", &self.paths.tasks_dir),
            ("prompts_dir", &self.paths.prompts_dir),
            ("disk_dir", &self.paths.disk_dir),
            ("hierarchy_file", &self.paths.hierarchy_file),
        ];
        if let Some((name, _)) = paths.iter().find(|(_, p)| p.as_os_str().is_empty()) {
            return Err(ConfigError::Invalid(format!("paths.{} must not be empty", name)));
        }

        Ok(())
    }
}
