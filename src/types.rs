// src/types.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub decider: DeciderConfig,
    pub clearance: ClearanceConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeciderConfig {
    /// Skip arbitration entirely and always put the change-lane path first
    pub reckless_change_lane: bool,
    /// Seconds to wait after a failed change before offering it again
    pub change_lane_fail_freeze_time: f64,
    /// Seconds to wait after a completed change before starting another
    pub change_lane_success_freeze_time: f64,
}

impl Default for DeciderConfig {
    fn default() -> Self {
        Self {
            reckless_change_lane: false,
            change_lane_fail_freeze_time: 1.0,
            change_lane_success_freeze_time: 1.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClearanceConfig {
    /// Half-width (m) of the lateral corridor around the target lane
    pub lateral_shift: f64,
    pub safe_time_same_direction: f64,
    pub safe_time_opposite_direction: f64,
    pub forward_min_safe_distance_same_direction: f64,
    pub backward_min_safe_distance_same_direction: f64,
    pub forward_min_safe_distance_opposite_direction: f64,
    /// Fixed, not speed dependent
    pub backward_min_safe_distance_opposite_direction: f64,
    /// Hysteresis band (m) applied around every safe distance
    pub distance_buffer: f64,
}

impl Default for ClearanceConfig {
    fn default() -> Self {
        Self {
            lateral_shift: 2.5,
            safe_time_same_direction: 3.0,
            safe_time_opposite_direction: 5.0,
            forward_min_safe_distance_same_direction: 6.0,
            backward_min_safe_distance_same_direction: 8.0,
            forward_min_safe_distance_opposite_direction: 50.0,
            backward_min_safe_distance_opposite_direction: 1.0,
            distance_buffer: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
