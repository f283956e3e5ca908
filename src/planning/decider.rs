// src/planning/decider.rs
//
// Cross-cycle change-lane arbitration.
//
// Every cycle the planner hands over its candidate paths: one "current lane"
// path plus, optionally, paths flagged as change-lane. Based on the status
// recorded in previous cycles the decider either keeps the change-lane path
// in front, drops it, or leaves the list alone, and records the new status.
//
//   UNSET ──first cycle──▶ SUCCESS
//   SUCCESS ──success freeze expired, change offered──▶ IN_PROGRESS
//   FAILED  ──fail freeze expired, change offered────▶ IN_PROGRESS
//   IN_PROGRESS ──no change offered / target moved──▶ SUCCESS
//
// The two freeze windows debounce the upstream candidate generator so a
// change is not re-entered or re-exited every cycle.

use super::error::DecisionError;
use super::status::{ChangeLanePhase, LaneChangeStatus, PlanningSession};
use super::types::CandidatePath;
use crate::clock::Clock;
use crate::types::DeciderConfig;
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// What a successful cycle did to the candidate list and status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeLaneAction {
    /// Reckless mode: change-lane path moved to front, status untouched
    Reckless,
    /// First decision of the session, recorded SUCCESS on the current lane
    Bootstrapped,
    /// Nothing to arbitrate, status kept
    Held,
    /// IN_PROGRESS with no change offered any more, recorded SUCCESS
    Completed,
    /// Still changing towards the same target, change-lane path kept in front
    Continued,
    /// Target moved while changing; change-lane paths dropped, recorded SUCCESS
    Retargeted,
    /// Failure freeze still running, change-lane paths dropped
    FailureCooldown,
    /// Success freeze still running, change-lane paths dropped
    SuccessCooldown,
    /// Failure freeze expired, retrying the change
    Retried,
    /// Success freeze expired, starting a new change
    Started,
}

impl ChangeLaneAction {
    /// True when a change-lane candidate was put in front this cycle.
    pub fn prioritizes_change(self) -> bool {
        matches!(
            self,
            ChangeLaneAction::Reckless
                | ChangeLaneAction::Continued
                | ChangeLaneAction::Retried
                | ChangeLaneAction::Started
        )
    }
}

pub struct ChangeLaneDecider<C: Clock> {
    config: DeciderConfig,
    clock: C,
}

impl<C: Clock> ChangeLaneDecider<C> {
    pub fn new(config: DeciderConfig, clock: C) -> Self {
        Self { config, clock }
    }

    pub fn config(&self) -> &DeciderConfig {
        &self.config
    }

    /// Run one arbitration cycle over `candidates`, reordering or shrinking
    /// it in place and updating the session's change-lane status.
    pub fn apply(
        &self,
        session: &mut PlanningSession,
        candidates: &mut Vec<CandidatePath>,
    ) -> Result<ChangeLaneAction, DecisionError> {
        self.apply_at(session, candidates, self.clock.now_seconds())
    }

    /// Same as `apply`, with the cycle's clock reading supplied by a caller
    /// that needs the same timestamp for later steps of the cycle.
    pub fn apply_at(
        &self,
        session: &mut PlanningSession,
        candidates: &mut Vec<CandidatePath>,
        now: f64,
    ) -> Result<ChangeLaneAction, DecisionError> {
        if candidates.is_empty() {
            error!("Candidate paths empty, skipping change-lane arbitration");
            return Err(DecisionError::EmptyInput);
        }

        if self.config.reckless_change_lane {
            prioritize_change_lane(candidates);
            debug!("Reckless change lane: prioritized without arbitration");
            return Ok(ChangeLaneAction::Reckless);
        }

        let (prev_phase, prev_path_id, prev_timestamp) = match session.change_lane_status() {
            LaneChangeStatus::Unset => {
                let path_id = match current_path_id(candidates) {
                    Some(id) => id.to_string(),
                    None => {
                        warn!("Bootstrapping change-lane status without a current lane");
                        String::new()
                    }
                };
                info!("✓ Change-lane status bootstrapped on '{}'", path_id);
                session.set_change_lane_status(ChangeLanePhase::Success, path_id, now);
                return Ok(ChangeLaneAction::Bootstrapped);
            }
            LaneChangeStatus::Recorded {
                phase,
                path_id,
                timestamp,
            } => (*phase, path_id.clone(), *timestamp),
        };

        if candidates.len() == 1 {
            return Ok(match prev_phase {
                ChangeLanePhase::Success | ChangeLanePhase::Failed => ChangeLaneAction::Held,
                ChangeLanePhase::InProgress => {
                    let path_id = candidates[0].lane_id.clone();
                    info!("✅ Change lane completed on '{}'", path_id);
                    session.set_change_lane_status(ChangeLanePhase::Success, path_id, now);
                    ChangeLaneAction::Completed
                }
            });
        }

        let current = match current_path_id(candidates) {
            Some(id) => id.to_string(),
            None => {
                error!(
                    "The vehicle is not on any reference line ({} candidates, all change-lane)",
                    candidates.len()
                );
                return Err(DecisionError::NoActiveLane);
            }
        };
        let elapsed = now - prev_timestamp;

        let action = match prev_phase {
            ChangeLanePhase::InProgress => {
                if prev_path_id == current {
                    prioritize_change_lane(candidates);
                    ChangeLaneAction::Continued
                } else {
                    remove_change_lane(candidates);
                    info!(
                        "Change lane target moved '{}' → '{}', treating as completed",
                        prev_path_id, current
                    );
                    session.set_change_lane_status(ChangeLanePhase::Success, current, now);
                    ChangeLaneAction::Retargeted
                }
            }
            ChangeLanePhase::Failed => {
                if elapsed < self.config.change_lane_fail_freeze_time {
                    remove_change_lane(candidates);
                    debug!(
                        "⏸ Failure freeze: {:.2}s of {:.2}s",
                        elapsed, self.config.change_lane_fail_freeze_time
                    );
                    ChangeLaneAction::FailureCooldown
                } else {
                    prioritize_change_lane(candidates);
                    info!("🔁 Retrying change lane from '{}'", current);
                    session.set_change_lane_status(ChangeLanePhase::InProgress, current, now);
                    ChangeLaneAction::Retried
                }
            }
            ChangeLanePhase::Success => {
                if elapsed < self.config.change_lane_success_freeze_time {
                    remove_change_lane(candidates);
                    debug!(
                        "⏸ Success freeze: {:.2}s of {:.2}s",
                        elapsed, self.config.change_lane_success_freeze_time
                    );
                    ChangeLaneAction::SuccessCooldown
                } else {
                    prioritize_change_lane(candidates);
                    info!("🔀 Starting change lane from '{}'", current);
                    session.set_change_lane_status(ChangeLanePhase::InProgress, current, now);
                    ChangeLaneAction::Started
                }
            }
        };

        Ok(action)
    }

    /// Record that the change away from `path_id` was abandoned (e.g. the
    /// clearance gate kept vetoing it). Starts the failure freeze.
    ///
    /// `timestamp` is the reading the cycle passed to `apply_at`, so the
    /// clock is read once per cycle.
    pub fn mark_failed(
        &self,
        session: &mut PlanningSession,
        path_id: impl Into<String>,
        timestamp: f64,
    ) {
        let path_id = path_id.into();
        warn!("❌ Change lane from '{}' failed", path_id);
        session.set_change_lane_status(ChangeLanePhase::Failed, path_id, timestamp);
    }
}

/// Lane id of the first candidate that is not a change-lane path.
pub fn current_path_id(candidates: &[CandidatePath]) -> Option<&str> {
    candidates
        .iter()
        .find(|c| !c.is_change_lane_path)
        .map(|c| c.lane_id.as_str())
}

/// Move the first change-lane candidate to the front, keeping the order of
/// the others. No-op when there is none.
pub fn prioritize_change_lane(candidates: &mut [CandidatePath]) {
    if let Some(pos) = candidates.iter().position(|c| c.is_change_lane_path) {
        candidates[..=pos].rotate_right(1);
    }
}

/// Drop every change-lane candidate, keeping the order of the others.
pub fn remove_change_lane(candidates: &mut Vec<CandidatePath>) {
    candidates.retain(|c| !c.is_change_lane_path);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::geometry::{StraightReferenceLine, Vec2};
    use std::sync::Arc;

    fn cand(id: &str, change: bool) -> CandidatePath {
        CandidatePath::new(
            id,
            change,
            Arc::new(StraightReferenceLine::new(Vec2::new(0.0, 0.0), 0.0)),
        )
    }

    fn ids(candidates: &[CandidatePath]) -> Vec<&str> {
        candidates.iter().map(|c| c.lane_id.as_str()).collect()
    }

    fn decider(clock: &ManualClock) -> ChangeLaneDecider<&ManualClock> {
        ChangeLaneDecider::new(
            DeciderConfig {
                reckless_change_lane: false,
                change_lane_fail_freeze_time: 2.0,
                change_lane_success_freeze_time: 1.5,
            },
            clock,
        )
    }

    // ────────────────────────────────────────────────────────────
    // Helpers
    // ────────────────────────────────────────────────────────────

    #[test]
    fn test_prioritize_moves_first_change_lane_only() {
        let mut list = vec![
            cand("a", false),
            cand("b", false),
            cand("c", true),
            cand("d", true),
        ];
        prioritize_change_lane(&mut list);
        assert_eq!(ids(&list), vec!["c", "a", "b", "d"]);

        let mut none = vec![cand("a", false), cand("b", false)];
        prioritize_change_lane(&mut none);
        assert_eq!(ids(&none), vec!["a", "b"]);
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut list = vec![
            cand("x", true),
            cand("a", false),
            cand("y", true),
            cand("b", false),
        ];
        remove_change_lane(&mut list);
        assert_eq!(ids(&list), vec!["a", "b"]);
    }

    // ────────────────────────────────────────────────────────────
    // Error paths
    // ────────────────────────────────────────────────────────────

    #[test]
    fn test_empty_input_leaves_status_untouched() {
        let clock = ManualClock::new(5.0);
        let mut session = PlanningSession::new();
        session.set_change_lane_status(ChangeLanePhase::Failed, "a", 1.0);
        let before = session.change_lane_status().clone();

        let mut list = Vec::new();
        assert_eq!(
            decider(&clock).apply(&mut session, &mut list),
            Err(DecisionError::EmptyInput)
        );
        assert_eq!(session.change_lane_status(), &before);
    }

    #[test]
    fn test_no_active_lane() {
        let clock = ManualClock::new(5.0);
        let mut session = PlanningSession::new();
        session.set_change_lane_status(ChangeLanePhase::Success, "a", 0.0);

        let mut list = vec![cand("x", true), cand("y", true)];
        assert_eq!(
            decider(&clock).apply(&mut session, &mut list),
            Err(DecisionError::NoActiveLane)
        );
        assert_eq!(ids(&list), vec!["x", "y"]);
    }

    // ────────────────────────────────────────────────────────────
    // State machine
    // ────────────────────────────────────────────────────────────

    #[test]
    fn test_bootstrap_records_success_on_current_lane() {
        let clock = ManualClock::new(3.0);
        let mut session = PlanningSession::new();
        let mut list = vec![cand("A", false), cand("B", true)];

        let action = decider(&clock).apply(&mut session, &mut list).unwrap();
        assert_eq!(action, ChangeLaneAction::Bootstrapped);
        assert_eq!(
            session.change_lane_status(),
            &LaneChangeStatus::recorded(ChangeLanePhase::Success, "A", 3.0)
        );
        assert_eq!(ids(&list), vec!["A", "B"]);
    }

    #[test]
    fn test_failure_cooldown_blocks_retry() {
        let clock = ManualClock::new(10.0);
        let mut session = PlanningSession::new();
        session.set_change_lane_status(ChangeLanePhase::Failed, "A", 10.0);
        let before = session.change_lane_status().clone();

        clock.set(11.0);
        let mut list = vec![cand("A", false), cand("B", true)];
        let action = decider(&clock).apply(&mut session, &mut list).unwrap();

        assert_eq!(action, ChangeLaneAction::FailureCooldown);
        assert_eq!(ids(&list), vec!["A"]);
        assert_eq!(session.change_lane_status(), &before);
    }

    #[test]
    fn test_failure_cooldown_expiry_allows_retry() {
        let clock = ManualClock::new(10.0);
        let mut session = PlanningSession::new();
        session.set_change_lane_status(ChangeLanePhase::Failed, "A", 10.0);

        clock.set(12.1);
        let mut list = vec![cand("A", false), cand("B", true)];
        let action = decider(&clock).apply(&mut session, &mut list).unwrap();

        assert_eq!(action, ChangeLaneAction::Retried);
        assert_eq!(ids(&list), vec!["B", "A"]);
        assert_eq!(
            session.change_lane_status(),
            &LaneChangeStatus::recorded(ChangeLanePhase::InProgress, "A", 12.1)
        );
    }

    #[test]
    fn test_mid_maneuver_keeps_change_lane_in_front() {
        let clock = ManualClock::new(20.0);
        let mut session = PlanningSession::new();
        session.set_change_lane_status(ChangeLanePhase::InProgress, "A", 18.0);
        let before = session.change_lane_status().clone();

        let mut list = vec![cand("A", false), cand("B", true)];
        let action = decider(&clock).apply(&mut session, &mut list).unwrap();

        assert_eq!(action, ChangeLaneAction::Continued);
        assert_eq!(ids(&list), vec!["B", "A"]);
        assert_eq!(session.change_lane_status(), &before);
    }

    #[test]
    fn test_target_moved_during_change_counts_as_success() {
        let clock = ManualClock::new(20.0);
        let mut session = PlanningSession::new();
        session.set_change_lane_status(ChangeLanePhase::InProgress, "A", 18.0);

        let mut list = vec![cand("B", true), cand("C", false)];
        let action = decider(&clock).apply(&mut session, &mut list).unwrap();

        assert_eq!(action, ChangeLaneAction::Retargeted);
        assert_eq!(ids(&list), vec!["C"]);
        assert_eq!(
            session.change_lane_status(),
            &LaneChangeStatus::recorded(ChangeLanePhase::Success, "C", 20.0)
        );
    }

    #[test]
    fn test_success_freeze_then_new_change() {
        let clock = ManualClock::new(0.0);
        let mut session = PlanningSession::new();
        session.set_change_lane_status(ChangeLanePhase::Success, "A", 0.0);
        let d = decider(&clock);

        clock.set(1.0);
        let mut list = vec![cand("A", false), cand("B", true)];
        assert_eq!(
            d.apply(&mut session, &mut list).unwrap(),
            ChangeLaneAction::SuccessCooldown
        );
        assert_eq!(ids(&list), vec!["A"]);
        assert_eq!(session.change_lane_status().timestamp(), Some(0.0));

        clock.set(1.5);
        let mut list = vec![cand("A", false), cand("B", true)];
        assert_eq!(
            d.apply(&mut session, &mut list).unwrap(),
            ChangeLaneAction::Started
        );
        assert_eq!(ids(&list), vec!["B", "A"]);
        assert_eq!(
            session.change_lane_status(),
            &LaneChangeStatus::recorded(ChangeLanePhase::InProgress, "A", 1.5)
        );
    }

    #[test]
    fn test_single_candidate_completes_in_progress() {
        let clock = ManualClock::new(7.0);
        let mut session = PlanningSession::new();
        session.set_change_lane_status(ChangeLanePhase::InProgress, "A", 5.0);

        let mut list = vec![cand("B", false)];
        let action = decider(&clock).apply(&mut session, &mut list).unwrap();
        assert_eq!(action, ChangeLaneAction::Completed);
        assert_eq!(
            session.change_lane_status(),
            &LaneChangeStatus::recorded(ChangeLanePhase::Success, "B", 7.0)
        );
    }

    #[test]
    fn test_single_candidate_holds_frozen_states() {
        let clock = ManualClock::new(7.0);
        for phase in [ChangeLanePhase::Success, ChangeLanePhase::Failed] {
            let mut session = PlanningSession::new();
            session.set_change_lane_status(phase, "A", 6.9);
            let before = session.change_lane_status().clone();

            let mut list = vec![cand("A", false)];
            let action = decider(&clock).apply(&mut session, &mut list).unwrap();
            assert_eq!(action, ChangeLaneAction::Held);
            assert_eq!(session.change_lane_status(), &before);
            assert_eq!(ids(&list), vec!["A"]);
        }
    }

    #[test]
    fn test_never_more_than_one_change_lane_in_front() {
        let clock = ManualClock::new(100.0);
        let mut session = PlanningSession::new();
        session.set_change_lane_status(ChangeLanePhase::Success, "A", 0.0);

        let mut list = vec![cand("A", false), cand("B", true), cand("C", true)];
        let action = decider(&clock).apply(&mut session, &mut list).unwrap();
        assert!(action.prioritizes_change());
        assert_eq!(ids(&list), vec!["B", "A", "C"]);
    }

    #[test]
    fn test_reckless_mode_skips_status() {
        let clock = ManualClock::new(1.0);
        let d = ChangeLaneDecider::new(
            DeciderConfig {
                reckless_change_lane: true,
                ..DeciderConfig::default()
            },
            &clock,
        );
        let mut session = PlanningSession::new();
        let mut list = vec![cand("A", false), cand("B", true)];

        assert_eq!(
            d.apply(&mut session, &mut list).unwrap(),
            ChangeLaneAction::Reckless
        );
        assert_eq!(ids(&list), vec!["B", "A"]);
        assert_eq!(session.change_lane_status(), &LaneChangeStatus::Unset);
    }

    #[test]
    fn test_mark_failed_starts_freeze() {
        let clock = ManualClock::new(4.0);
        let d = decider(&clock);
        let mut session = PlanningSession::new();
        session.set_change_lane_status(ChangeLanePhase::InProgress, "A", 2.0);

        d.mark_failed(&mut session, "A", clock.now_seconds());
        assert_eq!(
            session.change_lane_status(),
            &LaneChangeStatus::recorded(ChangeLanePhase::Failed, "A", 4.0)
        );

        clock.set(5.0);
        let mut list = vec![cand("A", false), cand("B", true)];
        assert_eq!(
            d.apply(&mut session, &mut list).unwrap(),
            ChangeLaneAction::FailureCooldown
        );
    }

    #[test]
    fn test_apply_at_uses_supplied_time() {
        // Clock far in the future; the supplied reading decides the freeze
        let clock = ManualClock::new(100.0);
        let d = decider(&clock);
        let mut session = PlanningSession::new();
        session.set_change_lane_status(ChangeLanePhase::Failed, "A", 10.0);

        let mut list = vec![cand("A", false), cand("B", true)];
        assert_eq!(
            d.apply_at(&mut session, &mut list, 11.0).unwrap(),
            ChangeLaneAction::FailureCooldown
        );
        assert_eq!(ids(&list), vec!["A"]);

        let mut list = vec![cand("A", false), cand("B", true)];
        assert_eq!(
            d.apply_at(&mut session, &mut list, 12.5).unwrap(),
            ChangeLaneAction::Retried
        );
        d.mark_failed(&mut session, "A", 12.5);
        assert_eq!(session.change_lane_status().timestamp(), Some(12.5));
    }
}
