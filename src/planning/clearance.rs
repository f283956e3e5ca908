// src/planning/clearance.rs
//
// Gate for a change-lane candidate: is any moving obstacle close enough,
// ahead and behind at once, to veto the change right now?
//
// For each obstacle:
//   - project its perception polygon onto the candidate's reference line
//   - ignore it if it sits outside the target-lane corridor
//   - pick same/opposite direction safety distances from relative speed
//   - debounce both gaps with the obstacle's previous blocking state
//
// The first blocking obstacle ends the scan. Blocking memory lives in a
// BlockingRegistry owned by the caller, not on the obstacles themselves.

use super::hysteresis::hysteresis_filter;
use super::status::BlockingRegistry;
use super::types::{CandidatePath, Obstacle, VehicleState};
use crate::geometry::{normalize_angle, SlBoundary};
use crate::types::ClearanceConfig;
use std::f64::consts::FRAC_PI_2;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyDistances {
    pub forward: f64,
    pub backward: f64,
}

pub struct ClearanceEvaluator {
    config: ClearanceConfig,
}

impl ClearanceEvaluator {
    pub fn new(config: ClearanceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClearanceConfig {
        &self.config
    }

    /// Returns false as soon as one obstacle blocks. Every obstacle scanned
    /// up to that point gets its blocking flag rewritten in `blocking`.
    pub fn is_clear_to_change_lane(
        &self,
        candidate: &CandidatePath,
        blocking: &mut BlockingRegistry,
    ) -> bool {
        let ego_start_s = candidate.adc_sl_boundary.start_s;
        let ego_end_s = candidate.adc_sl_boundary.end_s;
        let ego_v = candidate.vehicle_state.linear_velocity.abs();

        for obstacle in &candidate.obstacles {
            if obstacle.is_virtual || obstacle.is_static {
                debug!("skip virtual or static obstacle {}", obstacle.id);
                continue;
            }

            let boundary = match self.project(candidate, obstacle) {
                Some(b) => b,
                None => {
                    // Nothing to project: no conflict this cycle, so release any memory
                    warn!("Obstacle {} has an empty perception polygon", obstacle.id);
                    blocking.set_blocking(&obstacle.id, false);
                    continue;
                }
            };

            if candidate.is_change_lane_path
                && (boundary.end_l < -self.config.lateral_shift
                    || boundary.start_l > self.config.lateral_shift)
            {
                continue;
            }

            let same_direction = is_same_direction(obstacle, &candidate.vehicle_state);
            let safe = self.safety_distances(same_direction, ego_v, obstacle.speed);

            let was_blocking = blocking.is_blocking(&obstacle.id);
            let backward_unsafe = hysteresis_filter(
                ego_start_s - boundary.end_s,
                safe.backward,
                self.config.distance_buffer,
                was_blocking,
            );
            let forward_unsafe = hysteresis_filter(
                boundary.start_s - ego_end_s,
                safe.forward,
                self.config.distance_buffer,
                was_blocking,
            );

            if backward_unsafe && forward_unsafe {
                blocking.set_blocking(&obstacle.id, true);
                debug!(
                    "Lane change blocked by obstacle {} (s=[{:.1}, {:.1}], same_dir={})",
                    obstacle.id, boundary.start_s, boundary.end_s, same_direction
                );
                return false;
            }
            blocking.set_blocking(&obstacle.id, false);
        }
        true
    }

    /// Forward/backward distances the ego needs from an obstacle.
    pub fn safety_distances(
        &self,
        same_direction: bool,
        ego_v: f64,
        obstacle_v: f64,
    ) -> SafetyDistances {
        let c = &self.config;
        if same_direction {
            SafetyDistances {
                forward: c
                    .forward_min_safe_distance_same_direction
                    .max((ego_v - obstacle_v) * c.safe_time_same_direction),
                backward: c
                    .backward_min_safe_distance_same_direction
                    .max((obstacle_v - ego_v) * c.safe_time_same_direction),
            }
        } else {
            SafetyDistances {
                forward: c
                    .forward_min_safe_distance_opposite_direction
                    .max((ego_v + obstacle_v) * c.safe_time_opposite_direction),
                backward: c.backward_min_safe_distance_opposite_direction,
            }
        }
    }

    fn project(&self, candidate: &CandidatePath, obstacle: &Obstacle) -> Option<SlBoundary> {
        let line = &candidate.reference_line;
        SlBoundary::from_points(obstacle.perception_polygon.iter().map(|p| line.xy_to_sl(*p)))
    }
}

/// Rough direction check from the first predicted heading. Obstacles with
/// no prediction are assumed to travel with the ego.
pub fn is_same_direction(obstacle: &Obstacle, vehicle_state: &VehicleState) -> bool {
    match obstacle.predicted_heading() {
        Some(obstacle_heading) => {
            let diff = normalize_angle(obstacle_heading - vehicle_state.moving_direction()).abs();
            diff < FRAC_PI_2
        }
        None => true,
    }
}
