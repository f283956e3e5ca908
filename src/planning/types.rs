// src/planning/types.rs
//
// Inputs the arbiter reads each cycle. All of these are produced by other
// planner stages; the arbiter never allocates them, it only reorders or drops
// candidates in the caller's sequence.

use crate::geometry::{ReferenceLine, SlBoundary, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gear {
    #[default]
    Drive,
    Reverse,
    Neutral,
    Park,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VehicleState {
    /// Signed speed along the heading (m/s); negative when reversing
    pub linear_velocity: f64,
    /// Heading of the vehicle body (rad)
    pub heading: f64,
    pub gear: Gear,
}

impl VehicleState {
    /// Direction the vehicle actually travels in, flipped when in reverse.
    pub fn moving_direction(&self) -> f64 {
        match self.gear {
            Gear::Reverse => crate::geometry::normalize_angle(self.heading + std::f64::consts::PI),
            Gear::Drive | Gear::Neutral | Gear::Park => self.heading,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObstacleId(pub String);

impl ObstacleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ObstacleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub position: Vec2,
    /// Heading at this point (rad)
    pub theta: f64,
    /// Seconds relative to the prediction start
    pub relative_time: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictedTrajectory {
    pub points: Vec<TrajectoryPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: ObstacleId,
    #[serde(default)]
    pub is_virtual: bool,
    #[serde(default)]
    pub is_static: bool,
    /// m/s, non-negative
    pub speed: f64,
    #[serde(default)]
    pub trajectory: Option<PredictedTrajectory>,
    pub perception_polygon: Vec<Vec2>,
}

impl Obstacle {
    /// Heading of the first predicted point, if a usable prediction exists.
    pub fn predicted_heading(&self) -> Option<f64> {
        self.trajectory
            .as_ref()
            .and_then(|t| t.points.first())
            .map(|p| p.theta)
    }
}

/// One reference-line option under consideration this cycle.
#[derive(Clone)]
pub struct CandidatePath {
    pub lane_id: String,
    pub is_change_lane_path: bool,
    /// Ego footprint projected on this candidate's reference line
    pub adc_sl_boundary: SlBoundary,
    pub vehicle_state: VehicleState,
    pub reference_line: Arc<dyn ReferenceLine>,
    /// Obstacles registered in this candidate's path decision
    pub obstacles: Vec<Obstacle>,
}

impl CandidatePath {
    pub fn new(
        lane_id: impl Into<String>,
        is_change_lane_path: bool,
        reference_line: Arc<dyn ReferenceLine>,
    ) -> Self {
        Self {
            lane_id: lane_id.into(),
            is_change_lane_path,
            adc_sl_boundary: SlBoundary::default(),
            vehicle_state: VehicleState::default(),
            reference_line,
            obstacles: Vec::new(),
        }
    }
}

impl fmt::Debug for CandidatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidatePath")
            .field("lane_id", &self.lane_id)
            .field("is_change_lane_path", &self.is_change_lane_path)
            .field("adc_sl_boundary", &self.adc_sl_boundary)
            .field("vehicle_state", &self.vehicle_state)
            .field("obstacles", &self.obstacles.len())
            .finish()
    }
}
