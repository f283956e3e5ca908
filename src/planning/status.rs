// src/planning/status.rs
//
// State that outlives a planning cycle: the change-lane status record and
// the per-obstacle blocking memory. Both belong to the PlanningSession,
// which the planner owns and passes into the arbiter every cycle.

use super::error::DecisionError;
use super::types::ObstacleId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeLanePhase {
    InProgress,
    Failed,
    Success,
}

impl ChangeLanePhase {
    /// Wire code used by status snapshots.
    pub fn code(self) -> i32 {
        match self {
            ChangeLanePhase::InProgress => 1,
            ChangeLanePhase::Failed => 2,
            ChangeLanePhase::Success => 3,
        }
    }

    pub fn from_code(code: i32) -> Result<Self, DecisionError> {
        match code {
            1 => Ok(ChangeLanePhase::InProgress),
            2 => Ok(ChangeLanePhase::Failed),
            3 => Ok(ChangeLanePhase::Success),
            other => Err(DecisionError::UnknownState(format!("code {}", other))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChangeLanePhase::InProgress => "IN_PROGRESS",
            ChangeLanePhase::Failed => "FAILED",
            ChangeLanePhase::Success => "SUCCESS",
        }
    }
}

impl fmt::Display for ChangeLanePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeLanePhase {
    type Err = DecisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IN_PROGRESS" | "IN_CHANGE_LANE" => Ok(ChangeLanePhase::InProgress),
            "FAILED" | "CHANGE_LANE_FAILED" => Ok(ChangeLanePhase::Failed),
            "SUCCESS" | "CHANGE_LANE_SUCCESS" => Ok(ChangeLanePhase::Success),
            _ => Err(DecisionError::UnknownState(s.to_string())),
        }
    }
}

/// Change-lane status carried across cycles. A recorded phase always comes
/// with the path id and timestamp written in the same update.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LaneChangeStatus {
    #[default]
    Unset,
    Recorded {
        phase: ChangeLanePhase,
        path_id: String,
        timestamp: f64,
    },
}

impl LaneChangeStatus {
    pub fn recorded(phase: ChangeLanePhase, path_id: impl Into<String>, timestamp: f64) -> Self {
        LaneChangeStatus::Recorded {
            phase,
            path_id: path_id.into(),
            timestamp,
        }
    }

    /// Rebuild a status from an external snapshot. The phase may be a name or
    /// a numeric code; a missing phase means nothing was ever decided.
    pub fn restore(snapshot: &StatusSnapshot) -> Result<Self, DecisionError> {
        match &snapshot.phase {
            None => Ok(LaneChangeStatus::Unset),
            Some(raw) => {
                let parsed = match raw.trim().parse::<i32>() {
                    Ok(code) => ChangeLanePhase::from_code(code),
                    Err(_) => raw.parse(),
                };
                let phase = parsed.map_err(|e| {
                    error!("🚨 Corrupted change-lane status snapshot: {:?}", snapshot);
                    e
                })?;
                Ok(LaneChangeStatus::Recorded {
                    phase,
                    path_id: snapshot.path_id.clone(),
                    timestamp: snapshot.timestamp,
                })
            }
        }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        match self {
            LaneChangeStatus::Unset => StatusSnapshot::default(),
            LaneChangeStatus::Recorded {
                phase,
                path_id,
                timestamp,
            } => StatusSnapshot {
                phase: Some(phase.as_str().to_string()),
                path_id: path_id.clone(),
                timestamp: *timestamp,
            },
        }
    }

    pub fn phase(&self) -> Option<ChangeLanePhase> {
        match self {
            LaneChangeStatus::Unset => None,
            LaneChangeStatus::Recorded { phase, .. } => Some(*phase),
        }
    }

    pub fn path_id(&self) -> Option<&str> {
        match self {
            LaneChangeStatus::Unset => None,
            LaneChangeStatus::Recorded { path_id, .. } => Some(path_id),
        }
    }

    pub fn timestamp(&self) -> Option<f64> {
        match self {
            LaneChangeStatus::Unset => None,
            LaneChangeStatus::Recorded { timestamp, .. } => Some(*timestamp),
        }
    }
}

/// Loosely typed form of the status, as stored outside the process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusSnapshot {
    pub phase: Option<String>,
    pub path_id: String,
    pub timestamp: f64,
}

/// Per-obstacle hysteresis memory for the clearance check.
#[derive(Debug, Clone, Default)]
pub struct BlockingRegistry {
    flags: HashMap<ObstacleId, bool>,
}

impl BlockingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unseen obstacles are treated as not blocking.
    pub fn is_blocking(&self, id: &ObstacleId) -> bool {
        self.flags.get(id).copied().unwrap_or(false)
    }

    pub fn set_blocking(&mut self, id: &ObstacleId, blocking: bool) {
        match self.flags.get_mut(id) {
            Some(flag) => *flag = blocking,
            None => {
                self.flags.insert(id.clone(), blocking);
            }
        }
    }

    /// Forget obstacles that are no longer perceived.
    pub fn retain<'a, I>(&mut self, live_ids: I)
    where
        I: IntoIterator<Item = &'a ObstacleId>,
    {
        let live: HashSet<&ObstacleId> = live_ids.into_iter().collect();
        self.flags.retain(|id, _| live.contains(id));
    }

    /// Currently blocking obstacles, sorted for stable output.
    pub fn blocking_ids(&self) -> Vec<ObstacleId> {
        let mut ids: Vec<ObstacleId> = self
            .flags
            .iter()
            .filter(|(_, blocking)| **blocking)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

/// Everything the arbiter remembers between cycles of one planning session.
#[derive(Debug, Clone, Default)]
pub struct PlanningSession {
    change_lane: LaneChangeStatus,
    blocking: BlockingRegistry,
}

impl PlanningSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(status: LaneChangeStatus) -> Self {
        Self {
            change_lane: status,
            blocking: BlockingRegistry::new(),
        }
    }

    pub fn change_lane_status(&self) -> &LaneChangeStatus {
        &self.change_lane
    }

    /// Replaces phase, path id and timestamp together.
    pub fn set_change_lane_status(
        &mut self,
        phase: ChangeLanePhase,
        path_id: impl Into<String>,
        timestamp: f64,
    ) {
        self.change_lane = LaneChangeStatus::recorded(phase, path_id, timestamp);
    }

    pub fn blocking(&self) -> &BlockingRegistry {
        &self.blocking
    }

    pub fn blocking_mut(&mut self) -> &mut BlockingRegistry {
        &mut self.blocking
    }
}
