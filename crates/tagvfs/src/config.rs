//! Configuration for tagvfs
//!
//! Loaded from `tagvfs.toml`; every field has a default, so a missing file
//! or a partial file is fine. All repository paths hang off `repository`:
//!
//! ```text
//! <repository>/tags.duckdb     tagging store
//! <repository>/archive/        object contents, one flat file per inode
//! <repository>/logs/           rotated logs
//! ```

use crate::error::{Result, TagvfsError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "tagvfs.toml";
pub const DATABASE_FILE_NAME: &str = "tags.duckdb";
pub const ARCHIVE_DIR_NAME: &str = "archive";
pub const LOGS_DIR_NAME: &str = "logs";

/// Resolve the tagvfs home directory.
///
/// Priority:
/// 1) TAGVFS_HOME
/// 2) ~/.tagvfs
/// 3) ./.tagvfs
pub fn tagvfs_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("TAGVFS_HOME") {
        return PathBuf::from(override_path);
    }
    dirs::home_dir()
        .map(|home| home.join(".tagvfs"))
        .unwrap_or_else(|| PathBuf::from(".").join(".tagvfs"))
}

/// Default config file location: <home>/tagvfs.toml
pub fn default_config_path() -> PathBuf {
    tagvfs_home().join(CONFIG_FILE_NAME)
}

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the store, the archive and the logs
    #[serde(default = "tagvfs_home")]
    pub repository: PathBuf,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub reasoner: ReasonerConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub dedup: DedupConfig,

    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Keep the tagging store in memory (tests, throwaway mounts)
    pub in_memory: bool,
    /// Open the store read-only; every mutation fails
    pub read_only: bool,
    /// How AND-terms are combined into one set
    pub intersect: IntersectStrategy,
}

/// Set-builder strategy for AND-branches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntersectStrategy {
    /// Native `INTERSECT` when the backend has it, nested subqueries otherwise
    #[default]
    Auto,
    Native,
    Nested,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasonerConfig {
    /// Whether a bare `=` delimiter applies relation reasoning
    pub enabled: bool,
}

impl Default for ReasonerConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupMode {
    /// Deduplicate inside the operation that finalized the object
    Inline,
    /// Hand the object to the background worker
    #[default]
    Background,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub mode: DedupMode,
    /// Bound of the worker queue; producers block when it is full
    pub queue_capacity: usize,
    /// Read size while hashing object contents
    pub chunk_size: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            mode: DedupMode::Background,
            queue_capacity: 1024,
            chunk_size: 64 * 1024,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::for_repository(tagvfs_home())
    }
}

impl Config {
    /// Default configuration rooted at `repository`.
    pub fn for_repository(repository: impl Into<PathBuf>) -> Self {
        Self {
            repository: repository.into(),
            store: StoreConfig::default(),
            reasoner: ReasonerConfig::default(),
            cache: CacheConfig::default(),
            dedup: DedupConfig::default(),
            log: LogSettings::default(),
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| TagvfsError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| TagvfsError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.dedup.queue_capacity == 0 {
            return Err(TagvfsError::Config(
                "dedup.queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.dedup.chunk_size == 0 {
            return Err(TagvfsError::Config(
                "dedup.chunk_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.repository.join(DATABASE_FILE_NAME)
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.repository.join(ARCHIVE_DIR_NAME)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.repository.join(LOGS_DIR_NAME)
    }

    /// Store URL understood by `tagvfs_db::DbConnection::open_from_url`.
    pub fn database_url(&self) -> String {
        if self.store.in_memory {
            "duckdb::memory:".to_string()
        } else {
            format!("duckdb:{}", self.database_path().display())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::for_repository("/srv/tags");
        assert_eq!(config.database_path(), PathBuf::from("/srv/tags/tags.duckdb"));
        assert_eq!(config.archive_dir(), PathBuf::from("/srv/tags/archive"));
        assert_eq!(config.store.intersect, IntersectStrategy::Auto);
        assert!(config.reasoner.enabled);
        assert_eq!(config.dedup.mode, DedupMode::Background);
        assert_eq!(config.dedup.chunk_size, 65536);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            repository = "/data/repo"

            [store]
            intersect = "nested"

            [dedup]
            mode = "inline"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.repository, PathBuf::from("/data/repo"));
        assert_eq!(parsed.store.intersect, IntersectStrategy::Nested);
        assert!(!parsed.store.in_memory);
        assert_eq!(parsed.dedup.mode, DedupMode::Inline);
        assert_eq!(parsed.dedup.queue_capacity, 1024);
        assert!(parsed.cache.enabled);
    }

    #[test]
    fn test_config_roundtrip_and_validation() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);

        let mut config = Config::for_repository(tmp.path());
        config.dedup.queue_capacity = 0;
        config.save(&path).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, TagvfsError::Config(_)));
    }

    #[test]
    fn test_memory_url() {
        let mut config = Config::for_repository("/r");
        assert_eq!(config.database_url(), "duckdb:/r/tags.duckdb");
        config.store.in_memory = true;
        assert_eq!(config.database_url(), "duckdb::memory:");
    }
}
