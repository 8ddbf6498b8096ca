//! Legacy planner: plain priority ordering.

use chrono::{DateTime, Utc};

use super::{Planner, tie_break};
use crate::domain::{PlannerVersion, Task};

#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyPlanner;

impl Planner for LegacyPlanner {
    fn version(&self) -> PlannerVersion {
        PlannerVersion::Legacy
    }

    fn rank<'a>(&self, candidates: &'a [Task], _now: DateTime<Utc>) -> Vec<&'a Task> {
        let mut ranked: Vec<&Task> = candidates.iter().collect();
        ranked.sort_by(|a, b| tie_break(a, b));
        ranked
    }
}
