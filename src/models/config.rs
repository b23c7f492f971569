use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Player configuration. Every field has a default so a partial TOML file
/// (or none at all) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Maximum number of snapshots retained per dataset.
    #[serde(default = "default_sample_budget")]
    pub sample_budget: usize,
    /// Wall-clock time between stride-sized steps at 1x speed.
    #[serde(default = "default_base_interval_ms")]
    pub base_interval_ms: u64,
    /// Period of the scheduling signal that drives the advance loop.
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    /// Ticks moved by a single step forward/back.
    #[serde(default = "default_jump_step")]
    pub jump_step: u64,
    /// Speeds offered to the user. Any positive multiplier is accepted.
    #[serde(default = "default_speed_presets")]
    pub speed_presets: Vec<f64>,
    /// Log ingestion progress every this many rows.
    #[serde(default = "default_progress_every")]
    pub progress_every: u64,
}

fn default_sample_budget() -> usize {
    10_000
}

fn default_base_interval_ms() -> u64 {
    500
}

fn default_frame_interval_ms() -> u64 {
    16
}

fn default_jump_step() -> u64 {
    100
}

fn default_speed_presets() -> Vec<f64> {
    vec![0.5, 1.0, 2.0, 4.0, 10.0]
}

fn default_progress_every() -> u64 {
    100_000
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sample_budget: default_sample_budget(),
            base_interval_ms: default_base_interval_ms(),
            frame_interval_ms: default_frame_interval_ms(),
            jump_step: default_jump_step(),
            speed_presets: default_speed_presets(),
            progress_every: default_progress_every(),
        }
    }
}

impl PlayerConfig {
    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AppError::FileRead(format!("{}: {}", path.display(), e)))?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, then the TOML file if it exists, then environment overrides.
    pub fn resolve(path: Option<&Path>) -> Result<Self, AppError> {
        let mut config = match path {
            Some(p) if p.exists() => Self::load(p)?,
            _ => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `DEPTH_PLAYER_*` environment variables on top of the current values.
    pub fn apply_env_overrides(&mut self) -> Result<(), AppError> {
        if let Some(v) = env_number("DEPTH_PLAYER_SAMPLE_BUDGET")? {
            self.sample_budget = v as usize;
        }
        if let Some(v) = env_number("DEPTH_PLAYER_BASE_INTERVAL_MS")? {
            self.base_interval_ms = v;
        }
        if let Some(v) = env_number("DEPTH_PLAYER_FRAME_INTERVAL_MS")? {
            self.frame_interval_ms = v;
        }
        if let Some(v) = env_number("DEPTH_PLAYER_JUMP_STEP")? {
            self.jump_step = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.sample_budget == 0 {
            return Err(AppError::InvalidConfig("sample_budget must be at least 1".into()));
        }
        if self.base_interval_ms == 0 {
            return Err(AppError::InvalidConfig("base_interval_ms must be positive".into()));
        }
        if self.frame_interval_ms == 0 {
            return Err(AppError::InvalidConfig("frame_interval_ms must be positive".into()));
        }
        if self.jump_step == 0 {
            return Err(AppError::InvalidConfig("jump_step must be at least 1".into()));
        }
        if let Some(bad) = self.speed_presets.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
            return Err(AppError::InvalidConfig(format!(
                "speed preset {} is not a positive multiplier",
                bad
            )));
        }
        Ok(())
    }

    pub fn base_interval(&self) -> Duration {
        Duration::from_millis(self.base_interval_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

fn env_number(key: &str) -> Result<Option<u64>, AppError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| AppError::InvalidConfig(format!("{}={}: {}", key, raw, e))),
        Err(_) => Ok(None),
    }
}
