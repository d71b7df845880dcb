//! gator's settings and the logged-in user, kept in
//! `~/.config/gator/config.toml`.
//!
//! The file does not exist until the first `register` or `login` writes it,
//! and every key is optional. gator rewrites it on every user switch.
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// A value parsed but makes no sense
    #[error("Invalid config value: {0}")]
    Invalid(String),

    #[error("HOME environment variable not set")]
    NoHome,
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file. Defaults to `gator.db` beside the config file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,

    /// Name of the logged-in user, set by `register` and `login`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_user: Option<String>,

    /// User-Agent sent with every feed request.
    pub user_agent: String,

    /// Fetch+ingest tasks the collector runs at once. Must be at least 1.
    pub max_concurrent_fetches: usize,

    pub fetch_timeout_secs: u64,

    /// Pause before `aggservice` restarts a collector that exited.
    pub restart_delay_secs: u64,

    /// How long `aggservice` lets the collector wind down on shutdown.
    pub shutdown_grace_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: None,
            current_user: None,
            user_agent: "gator".to_string(),
            max_concurrent_fetches: 5,
            fetch_timeout_secs: 30,
            restart_delay_secs: 5,
            shutdown_grace_secs: 30,
        }
    }
}

/// Config files past this size are refused unread (1 MiB)
const MAX_FILE_SIZE: u64 = 1_048_576;

const KNOWN_KEYS: [&str; 7] = [
    "db_path",
    "current_user",
    "user_agent",
    "max_concurrent_fetches",
    "fetch_timeout_secs",
    "restart_delay_secs",
    "shutdown_grace_secs",
];

impl Config {
    /// `~/.config/gator/config.toml`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let home = std::env::var_os("HOME").ok_or(ConfigError::NoHome)?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("gator")
            .join("config.toml"))
    }

    /// Read the config at `path`, or the defaults before the first save.
    ///
    /// Keys gator does not know are logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// `TooLarge` past 1 MiB, `Parse` for malformed TOML or a mistyped value,
    /// `Invalid` for a value out of range.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = match std::fs::File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config yet, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let mut bytes = Vec::new();
        file.take(MAX_FILE_SIZE + 1).read_to_end(&mut bytes)?;
        if bytes.len() as u64 > MAX_FILE_SIZE {
            return Err(ConfigError::TooLarge(format!(
                "{} is over {MAX_FILE_SIZE} bytes",
                path.display()
            )));
        }
        let content = String::from_utf8(bytes)
            .map_err(|e| ConfigError::Invalid(format!("config is not UTF-8: {e}")))?;

        let table: toml::Table = content.parse()?;
        for key in table.keys().filter(|k| !KNOWN_KEYS.contains(&k.as_str())) {
            tracing::warn!(key = %key, path = %path.display(), "Ignoring unknown config key");
        }

        let config: Config = toml::Value::Table(table).try_into()?;
        config.validate()?;
        tracing::debug!(path = %path.display(), user = ?config.current_user, "Loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_fetches == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_fetches must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Remember `name` as the current user and persist the file.
    pub fn set_user(&mut self, path: &Path, name: &str) -> Result<(), ConfigError> {
        self.current_user = Some(name.to_string());
        self.save(path)
    }

    /// Write the config to `path`, creating its directory if needed.
    ///
    /// The file is written to a temporary sibling and renamed into place, so a
    /// crash never leaves a half-written config behind.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }

        // Unpredictable temp name; create_new refuses to follow an existing file
        let suffix = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let temp_path = path.with_extension(format!("tmp.{:016x}", suffix));

        let result = (|| -> std::io::Result<()> {
            let mut temp_file = std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&temp_path)?;
            temp_file.write_all(content.as_bytes())?;
            temp_file.sync_all()?;
            std::fs::rename(&temp_path, path)
        })();

        if let Err(e) = result {
            let _ = std::fs::remove_file(&temp_path);
            return Err(ConfigError::Io(e));
        }
        tracing::debug!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Database location, resolving the default and a leading `~/`.
    pub fn database_path(&self, config_path: &Path) -> PathBuf {
        match &self.db_path {
            Some(p) => expand_home(p),
            None => config_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("gator.db"),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_secs(self.restart_delay_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gator_config_test_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_defaults_match_collector_settings() {
        let config = Config::default();
        assert_eq!(config.user_agent, "gator");
        assert_eq!(config.max_concurrent_fetches, 5);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(30));
        assert_eq!(config.restart_delay(), Duration::from_secs(5));
        assert_eq!(config.shutdown_grace(), Duration::from_secs(30));
        assert!(config.current_user.is_none());
        assert!(config.db_path.is_none());
    }

    #[test]
    fn test_first_run_without_file_uses_defaults() {
        let dir = test_dir("first_run");
        let config = Config::load(&dir.join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_blank_file_uses_defaults() {
        let dir = test_dir("whitespace");
        let path = dir.join("config.toml");
        std::fs::write(&path, "   \n  \n  ").unwrap();

        assert_eq!(Config::load(&path).unwrap(), Config::default());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_logged_in_user_and_concurrency_read_back() {
        let dir = test_dir("partial");
        let path = dir.join("config.toml");
        std::fs::write(&path, "current_user = \"alice\"\nmax_concurrent_fetches = 2\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.current_user.as_deref(), Some("alice"));
        assert_eq!(config.max_concurrent_fetches, 2);
        assert_eq!(config.user_agent, "gator"); // default

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_malformed_or_mistyped_values_are_parse_errors() {
        let dir = test_dir("invalid");
        let path = dir.join("config.toml");
        std::fs::write(&path, "this is not [valid toml").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));

        std::fs::write(&path, "max_concurrent_fetches = \"five\"\n").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unrecognized_key_does_not_block_startup() {
        let dir = test_dir("unknown");
        let path = dir.join("config.toml");
        std::fs::write(&path, "user_agent = \"x\"\ntotally_fake_key = 42\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.user_agent, "x");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_zero_fetch_concurrency_is_invalid() {
        let dir = test_dir("zero_concurrency");
        let path = dir.join("config.toml");
        std::fs::write(&path, "max_concurrent_fetches = 0\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_oversized_file_is_refused() {
        let dir = test_dir("too_large");
        let path = dir.join("config.toml");
        std::fs::write(&path, "a".repeat(1_048_577)).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_set_user_creates_dir_and_round_trips() {
        let dir = test_dir("set_user");
        let path = dir.join("nested").join("config.toml");

        let mut config = Config {
            max_concurrent_fetches: 3,
            ..Config::default()
        };
        config.set_user(&path, "bob").unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.current_user.as_deref(), Some("bob"));
        assert_eq!(loaded.max_concurrent_fetches, 3);

        // Switching users overwrites in place and leaves no temp files
        config.set_user(&path, "carol").unwrap();
        assert_eq!(
            Config::load(&path).unwrap().current_user.as_deref(),
            Some("carol")
        );
        let entries = std::fs::read_dir(dir.join("nested")).unwrap().count();
        assert_eq!(entries, 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_database_path_defaults_beside_config() {
        let config = Config::default();
        assert_eq!(
            config.database_path(Path::new("/etc/gator/config.toml")),
            PathBuf::from("/etc/gator/gator.db")
        );

        let explicit = Config {
            db_path: Some(PathBuf::from("/var/lib/gator.db")),
            ..Config::default()
        };
        assert_eq!(
            explicit.database_path(Path::new("/etc/gator/config.toml")),
            PathBuf::from("/var/lib/gator.db")
        );
    }
}
