// src/scenario.rs
//
// Scripted replay: a YAML list of planning cycles is fed through the decider
// and the clearance gate exactly the way a planning loop would, producing
// one report per cycle.
//
// Geometry is kept simple: a candidate lane has a straight reference line
// parallel to the x axis, offset laterally by `lateral_offset`, unless it
// lists its own `reference_line` points. The ego drives along y = 0.

use crate::clock::{Clock, ManualClock};
use crate::geometry::{
    PolylineReferenceLine, ReferenceLine, SlBoundary, StraightReferenceLine, Vec2,
};
use crate::planning::{
    CandidatePath, ChangeLaneAction, ChangeLaneDecider, ClearanceEvaluator, Gear,
    LaneChangeStatus, Obstacle, ObstacleId, PlanningSession, PredictedTrajectory,
    StatusSnapshot, TrajectoryPoint, VehicleState,
};
use crate::types::Config;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub initial_status: StatusSnapshot,
    /// Record FAILED when the clearance gate vetoes an in-progress change
    #[serde(default)]
    pub fail_on_blocked: bool,
    pub cycles: Vec<CycleInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CycleInput {
    pub time: f64,
    pub ego: EgoInput,
    pub candidates: Vec<CandidateInput>,
    #[serde(default)]
    pub obstacles: Vec<ObstacleInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EgoInput {
    /// x of the rear bumper
    #[serde(default)]
    pub s: f64,
    #[serde(default = "default_ego_length")]
    pub length: f64,
    #[serde(default = "default_ego_width")]
    pub width: f64,
    pub speed: f64,
    #[serde(default)]
    pub heading: f64,
    #[serde(default)]
    pub gear: Gear,
}

fn default_ego_length() -> f64 {
    4.8
}

fn default_ego_width() -> f64 {
    1.9
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateInput {
    pub lane_id: String,
    #[serde(default)]
    pub change_lane: bool,
    #[serde(default)]
    pub lateral_offset: f64,
    /// World-frame centre line; overrides `lateral_offset` when present
    #[serde(default)]
    pub reference_line: Option<Vec<Vec2>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObstacleInput {
    pub id: String,
    pub speed: f64,
    #[serde(default)]
    pub is_virtual: bool,
    #[serde(default)]
    pub is_static: bool,
    /// Heading of the first predicted point; omitted means no prediction
    #[serde(default)]
    pub heading: Option<f64>,
    pub polygon: Vec<Vec2>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub time: f64,
    pub action: Option<ChangeLaneAction>,
    pub error: Option<String>,
    /// Lane ids left after arbitration, in priority order
    pub candidates: Vec<String>,
    /// Only evaluated when a change-lane candidate ended up in front
    pub clear_to_change: Option<bool>,
    pub blocking: Vec<ObstacleId>,
    pub status: StatusSnapshot,
}

impl Scenario {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading scenario {}", path))?;
        Self::from_yaml_str(&contents).with_context(|| format!("parsing scenario {}", path))
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }
}

pub fn run_scenario(config: &Config, scenario: &Scenario) -> Result<Vec<CycleReport>> {
    let status = LaneChangeStatus::restore(&scenario.initial_status)
        .context("restoring initial change-lane status")?;
    let mut session = PlanningSession::with_status(status);

    let clock = ManualClock::new(0.0);
    let decider = ChangeLaneDecider::new(config.decider.clone(), &clock);
    let evaluator = ClearanceEvaluator::new(config.clearance.clone());

    let mut reports = Vec::with_capacity(scenario.cycles.len());

    for cycle in &scenario.cycles {
        clock.set(cycle.time);
        let obstacles: Vec<Obstacle> = cycle.obstacles.iter().map(build_obstacle).collect();
        session
            .blocking_mut()
            .retain(obstacles.iter().map(|o| &o.id));

        let mut candidates = cycle
            .candidates
            .iter()
            .map(|c| build_candidate(c, &cycle.ego, &obstacles))
            .collect::<Result<Vec<CandidatePath>>>()
            .with_context(|| format!("building candidates at t={:.2}s", cycle.time))?;

        let now = clock.now_seconds();
        let (action, error) = match decider.apply_at(&mut session, &mut candidates, now) {
            Ok(action) => (Some(action), None),
            Err(e) => {
                warn!("t={:.2}s: arbitration failed: {}", cycle.time, e);
                (None, Some(e.to_string()))
            }
        };

        // A failed cycle keeps the current lane; the gate only runs on a decision
        let mut clear_to_change = None;
        if let Some(front) = candidates
            .first()
            .filter(|c| action.is_some() && c.is_change_lane_path)
        {
            let clear = evaluator.is_clear_to_change_lane(front, session.blocking_mut());
            clear_to_change = Some(clear);

            if !clear && scenario.fail_on_blocked {
                if let Some(path_id) = session.change_lane_status().path_id() {
                    let path_id = path_id.to_string();
                    decider.mark_failed(&mut session, path_id, now);
                }
            }
        }

        debug!(
            "t={:.2}s action={:?} clear={:?} lanes={:?}",
            cycle.time,
            action,
            clear_to_change,
            candidates.iter().map(|c| c.lane_id.as_str()).collect::<Vec<_>>()
        );

        reports.push(CycleReport {
            time: cycle.time,
            action,
            error,
            candidates: candidates.iter().map(|c| c.lane_id.clone()).collect(),
            clear_to_change,
            blocking: session.blocking().blocking_ids(),
            status: session.change_lane_status().snapshot(),
        });
    }

    info!("✓ Replayed {} cycles", reports.len());
    Ok(reports)
}

fn build_candidate(
    input: &CandidateInput,
    ego: &EgoInput,
    obstacles: &[Obstacle],
) -> Result<CandidatePath> {
    let line: Arc<dyn ReferenceLine> = match &input.reference_line {
        Some(points) => Arc::new(PolylineReferenceLine::new(points.clone()).ok_or_else(|| {
            anyhow!(
                "lane '{}': reference line needs at least two distinct points",
                input.lane_id
            )
        })?),
        None => Arc::new(StraightReferenceLine::new(
            Vec2::new(0.0, input.lateral_offset),
            0.0,
        )),
    };
    let half_w = ego.width / 2.0;
    let footprint = [
        Vec2::new(ego.s, -half_w),
        Vec2::new(ego.s + ego.length, -half_w),
        Vec2::new(ego.s + ego.length, half_w),
        Vec2::new(ego.s, half_w),
    ];
    let adc_sl_boundary =
        SlBoundary::from_points(footprint.iter().map(|p| line.xy_to_sl(*p))).unwrap_or_default();

    let mut candidate = CandidatePath::new(input.lane_id.clone(), input.change_lane, line);
    candidate.adc_sl_boundary = adc_sl_boundary;
    candidate.vehicle_state = VehicleState {
        linear_velocity: if ego.gear == Gear::Reverse {
            -ego.speed.abs()
        } else {
            ego.speed
        },
        heading: ego.heading,
        gear: ego.gear,
    };
    candidate.obstacles = obstacles.to_vec();
    Ok(candidate)
}

fn build_obstacle(input: &ObstacleInput) -> Obstacle {
    let trajectory = input.heading.map(|theta| PredictedTrajectory {
        points: vec![TrajectoryPoint {
            position: input.polygon.first().copied().unwrap_or_default(),
            theta,
            relative_time: 0.0,
        }],
    });
    Obstacle {
        id: ObstacleId::new(input.id.clone()),
        is_virtual: input.is_virtual,
        is_static: input.is_static,
        speed: input.speed,
        trajectory,
        perception_polygon: input.polygon.clone(),
    }
}
