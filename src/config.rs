//! Configuration for pathfinder-seeder
//!
//! ```toml
//! [database]
//! path = "pathfinder.db"
//! busy_timeout_ms = 5000
//!
//! [reconcile]
//! target_size = 50
//! ratio = "equal"          # or "aptitude_weighted"
//! mode = "top_up"          # or "reset"
//! seed = 42                # omit for an entropy-seeded run
//! match_difficulty = false
//!
//! [[categories]]
//! code = "tenth_pass"
//! display_name = "Class 10"
//! sets = 4
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::db::test_sets::{CategorySeed, Scope};
use crate::error::ConfigError;
use crate::planner::RatioProfile;
use crate::reconcile::{RunMode, RunSettings, DEFAULT_TARGET_SIZE};
use crate::synth::SynthOptions;

/// Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub reconcile: ReconcileConfig,

    /// Categories and test sets created by `setup`
    #[serde(default = "default_categories")]
    pub categories: Vec<CategorySeed>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database file
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    /// How long to wait on a locked database
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Questions per test set
    #[serde(default = "default_target_size")]
    pub target_size: u32,

    #[serde(default)]
    pub ratio: RatioProfile,

    #[serde(default)]
    pub mode: RunMode,

    /// Seed for answer placement and leftover fill
    #[serde(default)]
    pub seed: Option<u64>,

    /// Narrow aptitude templates to each category's difficulty
    #[serde(default)]
    pub match_difficulty: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("pathfinder.db")
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_target_size() -> u32 {
    DEFAULT_TARGET_SIZE
}

fn default_categories() -> Vec<CategorySeed> {
    vec![
        CategorySeed::new("tenth_pass", "Class 10", 4),
        CategorySeed::new("twelfth_pass", "Class 12", 4),
        CategorySeed::new("undergraduate", "Undergraduate", 4),
        CategorySeed::new("postgraduate", "Postgraduate", 4),
        CategorySeed::new("engineering_cse", "Engineering (CSE)", 4),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            reconcile: ReconcileConfig::default(),
            categories: default_categories(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            target_size: DEFAULT_TARGET_SIZE,
            ratio: RatioProfile::default(),
            mode: RunMode::default(),
            seed: None,
            match_difficulty: false,
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when it exists, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reconcile.target_size == 0 {
            return Err(ConfigError::Invalid {
                field: "reconcile.target_size",
                detail: "must be at least 1".to_string(),
            });
        }
        if let Some(seed) = self.categories.iter().find(|c| c.code.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "categories.code",
                detail: format!("empty code for '{}'", seed.display_name),
            });
        }
        Ok(())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.database.busy_timeout_ms)
    }

    /// Settings for a run over `scope`
    pub fn run_settings(&self, scope: Scope) -> RunSettings {
        RunSettings {
            mode: self.reconcile.mode,
            scope,
            target_size: self.reconcile.target_size,
            ratios: self.reconcile.ratio.into(),
            synth: SynthOptions {
                match_difficulty: self.reconcile.match_difficulty,
            },
        }
    }
}
