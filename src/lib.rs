// src/lib.rs
//
// Lane-change arbitration core of a motion planner.
//
//   planning::decider    cross-cycle change-lane state machine
//   planning::clearance  obstacle clearance gate with per-obstacle hysteresis
//   scenario             scripted replay used by the binary

pub mod clock;
pub mod config;
pub mod geometry;
pub mod planning;
pub mod scenario;
pub mod types;

pub use types::{ClearanceConfig, Config, DeciderConfig, LoggingConfig};
