// src/planning/mod.rs
//
// Lane-change arbitration, run once per planning cycle:
//
//   candidates ─▶ decider (status + freeze windows) ─▶ surviving change-lane path
//                                                          │
//                              clearance (obstacles + hysteresis) ◀┘
//
// The decider may already drop the change-lane candidate; only a surviving
// one is handed to the clearance gate by the planning loop.

pub mod clearance;
pub mod decider;
pub mod error;
pub mod hysteresis;
pub mod status;
pub mod types;

pub use clearance::{is_same_direction, ClearanceEvaluator, SafetyDistances};
pub use decider::{
    current_path_id, prioritize_change_lane, remove_change_lane, ChangeLaneAction,
    ChangeLaneDecider,
};
pub use error::DecisionError;
pub use hysteresis::hysteresis_filter;
pub use status::{
    BlockingRegistry, ChangeLanePhase, LaneChangeStatus, PlanningSession, StatusSnapshot,
};
pub use types::{
    CandidatePath, Gear, Obstacle, ObstacleId, PredictedTrajectory, TrajectoryPoint, VehicleState,
};
