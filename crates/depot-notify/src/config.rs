//! `depot.toml` configuration.
//!
//! ```toml
//! [controller]
//! max_attempts = 3
//!
//! [refresh]
//! snapshot_limit = 10
//!
//! [storage]
//! versions_dir = ".depot/store"
//! queue = ".depot/queue.jsonl"
//! archive = ".depot/archive.jsonl"
//!
//! [repository]
//! fixture = "repository.json"
//!
//! [worker]
//! poll_interval_ms = 1000
//! ```
//!
//! Every section is optional. `DEPOT_MAX_ATTEMPTS` and `DEPOT_SNAPSHOT_LIMIT`
//! override the file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::event::DEFAULT_MAX_ATTEMPTS;
use crate::refresh::DEFAULT_SNAPSHOT_LIMIT;

pub const CONFIG_FILE: &str = "depot.toml";
pub const ENV_MAX_ATTEMPTS: &str = "DEPOT_MAX_ATTEMPTS";
pub const ENV_SNAPSHOT_LIMIT: &str = "DEPOT_SNAPSHOT_LIMIT";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid value for {key}: `{value}`")]
    InvalidOverride { key: &'static str, value: String },

    #[error("{field} must be at least 1")]
    OutOfRange { field: &'static str },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepotConfig {
    pub controller: ControllerConfig,
    pub refresh: RefreshConfig,
    pub storage: StorageConfig,
    pub repository: RepositoryConfig,
    pub worker: WorkerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub max_attempts: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub snapshot_limit: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            snapshot_limit: DEFAULT_SNAPSHOT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub versions_dir: PathBuf,
    pub queue: PathBuf,
    pub archive: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            versions_dir: PathBuf::from(".depot/store"),
            queue: PathBuf::from(".depot/queue.jsonl"),
            archive: PathBuf::from(".depot/archive.jsonl"),
        }
    }
}

impl StorageConfig {
    /// Rebase relative paths onto `base`.
    pub fn resolved_against(&self, base: &Path) -> Self {
        let rebase = |path: &Path| {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                base.join(path)
            }
        };
        Self {
            versions_dir: rebase(&self.versions_dir),
            queue: rebase(&self.queue),
            archive: rebase(&self.archive),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub fixture: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub poll_interval_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
        }
    }
}

impl DepotConfig {
    pub fn from_toml(contents: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: origin.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load `path`, or `depot.toml` in the working directory when present.
    ///
    /// An explicit path must exist; the implicit one falls back to defaults.
    /// Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::read(path)?,
            None => {
                let implicit = Path::new(CONFIG_FILE);
                if implicit.exists() {
                    Self::read(implicit)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml(&contents, path)
    }

    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(raw) = lookup(ENV_MAX_ATTEMPTS) {
            self.controller.max_attempts = parse_override(ENV_MAX_ATTEMPTS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_SNAPSHOT_LIMIT) {
            self.refresh.snapshot_limit = parse_override(ENV_SNAPSHOT_LIMIT, &raw)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.controller.max_attempts == 0 {
            return Err(ConfigError::OutOfRange {
                field: "controller.max_attempts",
            });
        }
        if self.worker.poll_interval_ms == 0 {
            return Err(ConfigError::OutOfRange {
                field: "worker.poll_interval_ms",
            });
        }
        Ok(())
    }
}

fn parse_override<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidOverride {
        key,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn empty_file_yields_defaults() {
        let config = DepotConfig::from_toml("", Path::new("depot.toml")).expect("parse");
        assert_eq!(config, DepotConfig::default());
        assert_eq!(config.controller.max_attempts, 3);
        assert_eq!(config.refresh.snapshot_limit, 10);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let raw = r#"
            [controller]
            max_attempts = 5

            [repository]
            fixture = "fixtures/repo.json"
        "#;
        let config = DepotConfig::from_toml(raw, Path::new("depot.toml")).expect("parse");
        assert_eq!(config.controller.max_attempts, 5);
        assert_eq!(config.refresh.snapshot_limit, DEFAULT_SNAPSHOT_LIMIT);
        assert_eq!(
            config.repository.fixture,
            Some(PathBuf::from("fixtures/repo.json"))
        );
        assert_eq!(config.worker.poll_interval_ms, 1000);
    }

    #[test]
    fn unknown_types_fail_with_origin() {
        let err = DepotConfig::from_toml("[controller]\nmax_attempts = \"many\"", Path::new("x.toml"))
            .expect_err("string attempts must fail");
        assert!(matches!(err, ConfigError::Parse { ref path, .. } if path == "x.toml"));
    }

    #[test]
    fn environment_overrides_file_values() {
        let vars = BTreeMap::from([
            (ENV_MAX_ATTEMPTS, "7".to_string()),
            (ENV_SNAPSHOT_LIMIT, " 2 ".to_string()),
        ]);
        let mut config = DepotConfig::default();
        config
            .apply_env_overrides(|key| vars.get(key).cloned())
            .expect("overrides apply");
        assert_eq!(config.controller.max_attempts, 7);
        assert_eq!(config.refresh.snapshot_limit, 2);

        let err = config
            .apply_env_overrides(|key| (key == ENV_MAX_ATTEMPTS).then(|| "x".to_string()))
            .expect_err("garbage override must fail");
        assert!(matches!(err, ConfigError::InvalidOverride { key, .. } if key == ENV_MAX_ATTEMPTS));
    }

    #[test]
    fn zero_attempts_are_rejected() {
        let mut config = DepotConfig::default();
        config.controller.max_attempts = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { field: "controller.max_attempts" })
        ));
    }

    #[test]
    fn relative_storage_paths_rebase() {
        let storage = StorageConfig::default().resolved_against(Path::new("/srv/depot"));
        assert_eq!(storage.queue, PathBuf::from("/srv/depot/.depot/queue.jsonl"));
    }
}
