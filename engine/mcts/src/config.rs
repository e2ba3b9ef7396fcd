//! MCTS configuration parameters.
//!
//! Settings are resolved with the following priority (highest to lowest):
//! 1. Environment variables (`MCTS_<KEY>`)
//! 2. A TOML file, either a bare table or an `[mcts]` section
//! 3. Built-in defaults
//!
//! ```text
//! MCTS_EXPLORATION_CONSTANT=1.0
//! MCTS_ITERATIONS=5000
//! MCTS_TIME_LIMIT_MS=250
//! MCTS_MAX_ROLLOUT_DEPTH=200
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Macro to reduce env override boilerplate
macro_rules! env_override {
    // Parseable field
    ($config:ident . $field:ident, $key:expr) => {
        if let Ok(raw) = std::env::var($key) {
            match raw.parse() {
                Ok(v) => $config.$field = v,
                Err(_) => warn!("Ignoring {}={:?}: not a valid value", $key, raw),
            }
        }
    };
    // Optional parseable field
    ($config:ident . $field:ident, $key:expr, optional) => {
        if let Ok(raw) = std::env::var($key) {
            match raw.parse() {
                Ok(v) => $config.$field = Some(v),
                Err(_) => warn!("Ignoring {}={:?}: not a valid value", $key, raw),
            }
        }
    };
}

/// How long a search runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchBudget {
    /// Run exactly this many iterations.
    Iterations(u32),
    /// Start new iterations until this much wall-clock time has passed.
    Time(Duration),
}

/// Configuration for Monte Carlo Tree Search.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MctsConfig {
    /// Exploration constant `C` of the UCB1 formula.
    /// Higher values encourage exploration, 0.0 is pure exploitation.
    /// Conventionally sqrt(2).
    pub exploration_constant: f64,

    /// Default number of iterations per search.
    pub iterations: u32,

    /// Default wall-clock budget in milliseconds.
    /// Takes precedence over `iterations` when set.
    pub time_limit_ms: Option<u64>,

    /// Maximum number of random transitions in one rollout.
    /// When reached, the rollout falls back to `State::estimated_reward`.
    /// `None` lets rollouts run until a terminal state.
    pub max_rollout_depth: Option<u32>,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            exploration_constant: std::f64::consts::SQRT_2,
            iterations: 1000,
            time_limit_ms: None,
            max_rollout_depth: None,
        }
    }
}

impl MctsConfig {
    /// Create a fast config for testing.
    pub fn for_testing() -> Self {
        Self {
            iterations: 50,
            ..Self::default()
        }
    }

    /// Builder pattern: set the exploration constant.
    pub fn with_exploration_constant(mut self, c: f64) -> Self {
        self.exploration_constant = c;
        self
    }

    /// Builder pattern: set the number of iterations.
    pub fn with_iterations(mut self, n: u32) -> Self {
        self.iterations = n;
        self
    }

    /// Builder pattern: set the wall-clock budget.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit_ms = Some(limit.as_millis() as u64);
        self
    }

    /// Builder pattern: cap the rollout length.
    pub fn with_max_rollout_depth(mut self, depth: u32) -> Self {
        self.max_rollout_depth = Some(depth);
        self
    }

    /// The default budget: the time limit if set, otherwise the iteration
    /// count.
    pub fn budget(&self) -> SearchBudget {
        match self.time_limit_ms {
            Some(ms) => SearchBudget::Time(Duration::from_millis(ms)),
            None => SearchBudget::Iterations(self.iterations),
        }
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.exploration_constant.is_finite() || self.exploration_constant < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "exploration_constant must be finite and non-negative, got {}",
                self.exploration_constant
            )));
        }
        if self.iterations == 0 {
            return Err(ConfigError::Invalid("iterations must be at least 1".into()));
        }
        if self.time_limit_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "time_limit_ms must be positive when set".into(),
            ));
        }
        if self.max_rollout_depth == Some(0) {
            return Err(ConfigError::Invalid(
                "max_rollout_depth must be positive when set".into(),
            ));
        }
        Ok(())
    }

    /// Parse a config from TOML. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = toml::from_str(content)?;
        let config: Self = match table.get("mcts") {
            Some(section) => section.clone().try_into()?,
            None => toml::Value::Table(table).try_into()?,
        };
        Ok(config)
    }

    /// Load a config file, apply environment overrides and validate.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading MCTS config from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Environment variables follow the pattern: MCTS_<KEY>. Values that do
    /// not parse are ignored.
    pub fn apply_env_overrides(self) -> Self {
        let mut config = self;
        env_override!(config.exploration_constant, "MCTS_EXPLORATION_CONSTANT");
        env_override!(config.iterations, "MCTS_ITERATIONS");
        env_override!(config.time_limit_ms, "MCTS_TIME_LIMIT_MS", optional);
        env_override!(config.max_rollout_depth, "MCTS_MAX_ROLLOUT_DEPTH", optional);
        config
    }
}
