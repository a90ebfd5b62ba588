//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/notebatch/config.toml)
//! 3. Environment variables (NOTEBATCH_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::paging::DEFAULT_PAGE_SIZE;

/// Environment variable prefix
const ENV_PREFIX: &str = "NOTEBATCH";

/// Keys accepted by [`Config::set_value`]
pub const KEYS: &[&str] = &[
    "data_dir",
    "page_size",
    "throttle_ms",
    "sync_count",
    "remote_prefix",
    "remote_latency_ms",
    "fetch_timeout_secs",
];

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the SQLite database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Notes added to a list window per growth step
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Delay before a window growth step is applied
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,

    /// Notes requested by a sync when no count is given
    #[serde(default = "default_sync_count")]
    pub sync_count: usize,

    /// Id prefix of the mock remote feed
    #[serde(default = "default_remote_prefix")]
    pub remote_prefix: String,

    /// Simulated latency of the mock remote
    #[serde(default = "default_remote_latency_ms")]
    pub remote_latency_ms: u64,

    /// Upper bound on one remote fetch
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            page_size: default_page_size(),
            throttle_ms: default_throttle_ms(),
            sync_count: default_sync_count(),
            remote_prefix: default_remote_prefix(),
            remote_latency_ms: default_remote_latency_ms(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (NOTEBATCH_DATA_DIR, NOTEBATCH_PAGE_SIZE, ...)
    /// 2. Config file (~/.config/notebatch/config.toml or NOTEBATCH_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load from `path` when given, otherwise from the default location
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Set one key from its string form
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "data_dir" => self.data_dir = PathBuf::from(value),
            "page_size" => self.page_size = parse(key, value)?,
            "throttle_ms" => self.throttle_ms = parse(key, value)?,
            "sync_count" => self.sync_count = parse(key, value)?,
            "remote_prefix" => self.remote_prefix = value.to_string(),
            "remote_latency_ms" => self.remote_latency_ms = parse(key, value)?,
            "fetch_timeout_secs" => self.fetch_timeout_secs = parse(key, value)?,
            _ => bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                KEYS.join(", ")
            ),
        }
        self.validate()
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        for key in KEYS {
            let var = format!("{}_{}", ENV_PREFIX, key.to_ascii_uppercase());
            if let Ok(val) = std::env::var(&var) {
                self.set_value(key, &val)
                    .with_context(|| format!("Invalid value in {}", var))?;
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            bail!("page_size must be at least 1");
        }
        if self.fetch_timeout_secs == 0 {
            bail!("fetch_timeout_secs must be at least 1");
        }
        if self.remote_prefix.is_empty() {
            bail!("remote_prefix must not be empty");
        }
        Ok(())
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with NOTEBATCH_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("notebatch")
            .join("config.toml")
    }

    /// Get the path to the SQLite database
    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join("notebatch.db")
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for {}: '{}'", key, value))
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("notebatch")
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_throttle_ms() -> u64 {
    200
}

fn default_sync_count() -> usize {
    500
}

fn default_remote_prefix() -> String {
    "mock".to_string()
}

fn default_remote_latency_ms() -> u64 {
    500
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Serializes tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Locks env access and restores the listed vars on drop
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "NOTEBATCH_DATA_DIR",
        "NOTEBATCH_PAGE_SIZE",
        "NOTEBATCH_THROTTLE_MS",
        "NOTEBATCH_SYNC_COUNT",
        "NOTEBATCH_REMOTE_PREFIX",
        "NOTEBATCH_REMOTE_LATENCY_MS",
        "NOTEBATCH_FETCH_TIMEOUT_SECS",
        "NOTEBATCH_CONFIG",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.page_size, 50);
        assert_eq!(config.throttle_ms, 200);
        assert_eq!(config.sync_count, 500);
        assert_eq!(config.remote_prefix, "mock");
        assert_eq!(config.remote_latency_ms, 500);
        assert_eq!(config.fetch_timeout_secs, 30);
        assert!(config.data_dir.ends_with("notebatch"));
        assert!(config.sqlite_path().ends_with("notebatch.db"));
    }

    #[test]
    fn test_env_overrides() {
        let _guard = EnvGuard::new(ENV_VARS);

        env::set_var("NOTEBATCH_DATA_DIR", "/tmp/notebatch-test");
        env::set_var("NOTEBATCH_PAGE_SIZE", "25");
        env::set_var("NOTEBATCH_REMOTE_PREFIX", "mockV2");

        let mut config = Config::default();
        config.apply_env_overrides().unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/notebatch-test"));
        assert_eq!(config.page_size, 25);
        assert_eq!(config.remote_prefix, "mockV2");
        assert_eq!(config.sync_count, 500);
    }

    #[test]
    fn test_env_override_invalid_number() {
        let _guard = EnvGuard::new(ENV_VARS);

        env::set_var("NOTEBATCH_SYNC_COUNT", "lots");
        let err = Config::default().apply_env_overrides().unwrap_err();
        assert!(format!("{:#}", err).contains("NOTEBATCH_SYNC_COUNT"));
    }

    #[test]
    fn test_load_from_str_partial() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            sync_count = 1000
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.sync_count, 1000);
        assert_eq!(config.page_size, 50);
    }

    #[test]
    fn test_load_from_str_rejects_zero_page_size() {
        let _guard = EnvGuard::new(ENV_VARS);
        assert!(Config::load_from_str("page_size = 0").is_err());
    }

    #[test]
    fn test_set_value() {
        let mut config = Config::default();
        config.set_value("throttle_ms", "350").unwrap();
        config.set_value("remote_latency_ms", " 0 ").unwrap();
        assert_eq!(config.throttle_ms, 350);
        assert_eq!(config.remote_latency_ms, 0);

        assert!(config.set_value("page_size", "-1").is_err());
        assert!(config.set_value("fetch_timeout_secs", "0").is_err());

        let err = config.set_value("colour", "blue").unwrap_err();
        assert!(err.to_string().contains("Valid keys"));
    }

    #[test]
    fn test_save_and_load_from_path() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config {
            data_dir: temp_dir.path().join("data"),
            ..Config::default()
        };
        config.set_value("sync_count", "42").unwrap();
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded, config);
        assert!(loaded.data_dir.exists());
    }

    #[test]
    fn test_load_with_cli_override() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let data_dir = temp_dir.path().join("data");
        std::fs::write(
            &path,
            format!("data_dir = {:?}\npage_size = 10\n", data_dir.display().to_string()),
        )
        .unwrap();

        let config = Config::load_with_cli_override(Some(&path)).unwrap();
        assert_eq!(config.page_size, 10);
        assert_eq!(config.data_dir, data_dir);
    }

    #[test]
    fn test_config_file_path_env() {
        let _guard = EnvGuard::new(ENV_VARS);

        assert!(Config::config_file_path().ends_with("notebatch/config.toml"));

        env::set_var("NOTEBATCH_CONFIG", "/etc/notebatch.toml");
        assert_eq!(Config::config_file_path(), PathBuf::from("/etc/notebatch.toml"));
    }
}
