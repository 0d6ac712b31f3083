use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::animate::DEFAULT_STEP;
use crate::geometry::GeometryConfig;
use crate::render::RenderOptions;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("geometry.skew must be a finite number, got {0}")]
    Skew(f64),
    #[error("geometry.minSeparation must be finite and greater than zero, got {0}")]
    MinSeparation(f64),
    #[error("animation.step must be finite and greater than zero, got {0}")]
    Step(f64),
    #[error("animation.frameIntervalMs must be greater than zero")]
    FrameInterval,
    #[error("render.nodeRadius must be finite and greater than zero, got {0}")]
    NodeRadius(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct AnimationConfig {
    /// Distance a converging child travels per tick.
    pub step: f64,
    pub frame_interval_ms: u64,
    /// Upper bound on ticks spent by a single `settle` call.
    pub max_settle_ticks: usize,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            step: DEFAULT_STEP,
            frame_interval_ms: 16,
            max_settle_ticks: 100_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct EditorConfig {
    pub geometry: GeometryConfig,
    pub animation: AnimationConfig,
    pub render: RenderOptions,
}

impl EditorConfig {
    pub fn from_json(contents: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(contents).context("failed to parse editor configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        Self::from_json(&contents).with_context(|| format!("invalid config '{}'", path.display()))
    }

    /// Loads `path` when given, otherwise the defaults.
    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let geometry = &self.geometry;
        if !geometry.skew.is_finite() {
            return Err(ConfigError::Skew(geometry.skew));
        }
        if !(geometry.min_separation.is_finite() && geometry.min_separation > 0.0) {
            return Err(ConfigError::MinSeparation(geometry.min_separation));
        }
        let step = self.animation.step;
        if !(step.is_finite() && step > 0.0) {
            return Err(ConfigError::Step(step));
        }
        if self.animation.frame_interval_ms == 0 {
            return Err(ConfigError::FrameInterval);
        }
        let radius = self.render.node_radius;
        if !(radius.is_finite() && radius > 0.0) {
            return Err(ConfigError::NodeRadius(radius));
        }
        Ok(())
    }
}
