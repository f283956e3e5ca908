// src/config.rs

use crate::types::Config;
use anyhow::{bail, Context, Result};
use std::fs;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading config {}", path))?;
        Self::from_yaml_str(&contents).with_context(|| format!("parsing config {}", path))
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let d = &self.decider;
        if d.change_lane_fail_freeze_time < 0.0 || d.change_lane_success_freeze_time < 0.0 {
            bail!(
                "freeze windows must be non-negative (fail={}, success={})",
                d.change_lane_fail_freeze_time,
                d.change_lane_success_freeze_time
            );
        }

        let c = &self.clearance;
        if c.lateral_shift <= 0.0 {
            bail!("clearance.lateral_shift must be positive, got {}", c.lateral_shift);
        }
        if c.distance_buffer < 0.0 {
            bail!(
                "clearance.distance_buffer must be non-negative, got {}",
                c.distance_buffer
            );
        }
        Ok(())
    }
}
