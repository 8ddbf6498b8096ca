//! CycleReport - 1 サイクル分の結果
//!
//! distro ごとに「計画できたか / なぜ止まったか」を残します。
//! ログに出すだけでなく、CLI はこれをそのまま JSON で出力します。

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{AllocationDecision, DistroId, SchedulerError};

/// Outcome of one distro in one cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DistroOutcome {
    Planned {
        primary_depth: usize,
        secondary_depth: usize,
        delta: i64,
        capacity_saturated: bool,
    },
    Failed {
        kind: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: BTreeMap<DistroId, DistroOutcome>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub decisions: Vec<AllocationDecision>,

    /// Set when the distro list itself could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,

    pub primary_queues: usize,
    pub secondary_queues: usize,
}

impl CycleReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            outcomes: BTreeMap::new(),
            decisions: Vec::new(),
            aborted: None,
            primary_queues: 0,
            secondary_queues: 0,
        }
    }

    pub fn aborted(started_at: DateTime<Utc>, reason: impl Into<String>) -> Self {
        Self {
            aborted: Some(reason.into()),
            ..Self::new(started_at)
        }
    }

    pub fn record_planned(&mut self, distro: DistroId, decision: AllocationDecision) {
        self.outcomes.insert(
            distro,
            DistroOutcome::Planned {
                primary_depth: decision.primary_depth,
                secondary_depth: decision.secondary_depth,
                delta: decision.delta,
                capacity_saturated: decision.capacity_saturated,
            },
        );
        self.decisions.push(decision);
    }

    pub fn record_failed(&mut self, distro: DistroId, error: &SchedulerError) {
        self.outcomes.insert(
            distro,
            DistroOutcome::Failed {
                kind: error.kind(),
                reason: error.to_string(),
            },
        );
    }

    pub fn planned(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, DistroOutcome::Planned { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.planned()
    }

    pub fn outcome(&self, distro: &DistroId) -> Option<&DistroOutcome> {
        self.outcomes.get(distro)
    }

    /// Every distro was planned and the cycle was not aborted.
    pub fn is_clean(&self) -> bool {
        self.aborted.is_none() && self.failed() == 0
    }
}
