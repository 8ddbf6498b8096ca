//! Tunable planner: weighted multi-factor score.
//!
//! score = priority_factor * priority
//!       + time_in_queue_factor * minutes waited
//!       + dependents_factor * transitive dependents in the queue
//!       + expected_runtime_factor * expected runtime in minutes
//!
//! Sorted by score descending, then the shared tie-break.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::{DependencyGraph, Planner, tie_break};
use crate::domain::{PlannerVersion, PlannerWeights, Task, TaskId};

#[derive(Debug, Clone)]
pub struct TunablePlanner {
    weights: PlannerWeights,
}

impl TunablePlanner {
    /// `weights` should already be validated (`PlannerSettings::resolve`).
    pub fn new(weights: PlannerWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &PlannerWeights {
        &self.weights
    }

    fn score(&self, task: &Task, dependents: usize, now: DateTime<Utc>) -> f64 {
        let w = &self.weights;
        let waited_min = task.time_in_queue(now).as_secs_f64() / 60.0;
        let runtime_min = task
            .expected_duration
            .map_or(0.0, |d| d.as_secs_f64() / 60.0);

        w.priority_factor * task.priority as f64
            + w.time_in_queue_factor * waited_min
            + w.dependents_factor * dependents as f64
            + w.expected_runtime_factor * runtime_min
    }
}

impl Planner for TunablePlanner {
    fn version(&self) -> PlannerVersion {
        PlannerVersion::Tunable
    }

    fn rank<'a>(&self, candidates: &'a [Task], now: DateTime<Utc>) -> Vec<&'a Task> {
        let graph = DependencyGraph::from_tasks(candidates);
        let scores: HashMap<&TaskId, f64> = candidates
            .iter()
            .map(|t| (&t.id, self.score(t, graph.descendant_count(&t.id), now)))
            .collect();

        let mut ranked: Vec<&Task> = candidates.iter().collect();
        ranked.sort_by(|a, b| {
            let sa = scores.get(&a.id).copied().unwrap_or(0.0);
            let sb = scores.get(&b.id).copied().unwrap_or(0.0);
            sb.total_cmp(&sa).then_with(|| tie_break(a, b))
        });
        ranked
    }
}
