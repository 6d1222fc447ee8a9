//! Viewer settings.
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. TOML file given with `--config`
//! 3. Command-line flags

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::crawler::ScanOptions;
use crate::error::{TreeError, TreeResult};

pub const DEFAULT_RESIZE_STEP: f64 = 0.01;
pub const DEFAULT_TICK_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerConfig {
    /// Seed for leaf colours; random when unset.
    pub seed: Option<u64>,
    /// Fraction a leaf grows or shrinks per resize key press.
    pub resize_step: f64,
    pub skip_hidden: bool,
    /// Event poll interval of the viewer loop.
    pub tick_ms: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            seed: None,
            resize_step: DEFAULT_RESIZE_STEP,
            skip_hidden: false,
            tick_ms: DEFAULT_TICK_MS,
        }
    }
}

impl ViewerConfig {
    pub fn load(path: &Path) -> TreeResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| TreeError::io(path, e))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> TreeResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> TreeResult<()> {
        if !self.resize_step.is_finite() || self.resize_step <= 0.0 {
            return Err(TreeError::Config(format!(
                "resize_step must be a positive number, got {}",
                self.resize_step
            )));
        }
        if self.tick_ms == 0 {
            return Err(TreeError::Config("tick_ms must be at least 1".into()));
        }
        Ok(())
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            skip_hidden: self.skip_hidden,
        }
    }
}
