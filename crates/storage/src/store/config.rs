#![forbid(unsafe_code)]

use super::StoreError;
use serde::Deserialize;
use std::path::Path;

const ENV_DB_FILE: &str = "FORKLORE_DB_FILE";
const ENV_BUSY_TIMEOUT_MS: &str = "FORKLORE_BUSY_TIMEOUT_MS";
const ENV_MAX_BRANCH_DEPTH: &str = "FORKLORE_MAX_BRANCH_DEPTH";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub db_file_name: String,
    pub busy_timeout_ms: u64,
    pub max_branch_depth: usize,
    pub default_vote_threshold: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_file_name: "forklore.db".to_string(),
            busy_timeout_ms: 5_000,
            max_branch_depth: 128,
            default_vote_threshold: 1_000,
        }
    }
}

impl StoreConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, StoreError> {
        let config: Self =
            toml::from_str(contents).map_err(|err| StoreError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `path` when it exists, falls back to defaults otherwise, then
    /// applies `FORKLORE_*` environment overrides.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path).map_err(|err| {
                StoreError::Config(format!("failed to read {}: {err}", path.display()))
            })?;
            Self::from_toml_str(&contents)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), StoreError> {
        if let Some(value) = lookup(ENV_DB_FILE) {
            self.db_file_name = value;
        }
        if let Some(value) = lookup(ENV_BUSY_TIMEOUT_MS) {
            self.busy_timeout_ms = parse_override(ENV_BUSY_TIMEOUT_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_BRANCH_DEPTH) {
            self.max_branch_depth = parse_override(ENV_MAX_BRANCH_DEPTH, &value)?;
        }
        self.validate()
    }

    fn validate(&self) -> Result<(), StoreError> {
        if self.db_file_name.trim().is_empty() {
            return Err(StoreError::Config("db_file_name must not be empty".to_string()));
        }
        if self.max_branch_depth == 0 {
            return Err(StoreError::Config("max_branch_depth must be >= 1".to_string()));
        }
        if self.default_vote_threshold < 0 {
            return Err(StoreError::Config(
                "default_vote_threshold must be >= 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, StoreError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| StoreError::Config(format!("{key} is not a valid number: {value}")))
}
