//! Queue builder: candidate set -> planner -> `TaskQueue` with a fresh generation.
//!
//! Design intent:
//! - Membership is decided here, not by the inventory: a primary queue only
//!   takes tasks the distro owns, a secondary queue only takes tasks that list
//!   the distro as an alias. Passing the whole task population is safe.
//! - The only non-pure step is generation assignment.
//! - Re-running with the same candidates yields the same order.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::domain::{DistroId, QueueKey, QueueKind, Task, TaskQueue, TaskQueueItem};
use crate::planner::Planner;
use crate::ports::GenerationIssuer;

#[derive(Clone)]
pub struct QueueBuilder {
    issuer: Arc<dyn GenerationIssuer>,
}

impl QueueBuilder {
    pub fn new(issuer: Arc<dyn GenerationIssuer>) -> Self {
        Self { issuer }
    }

    /// Build the queue of `kind` for `distro` from `tasks`.
    ///
    /// Planning happens at the generation's `issued_at`.
    pub fn build(
        &self,
        kind: QueueKind,
        distro: &DistroId,
        planner: &dyn Planner,
        tasks: &[Task],
    ) -> TaskQueue {
        let key = QueueKey::new(kind, distro.clone());
        let generation = self.issuer.issue(key.clone(), planner.version());

        let candidates = select_candidates(kind, distro, tasks);
        let ordered = planner.plan(&candidates, generation.issued_at);

        let is_alias = kind == QueueKind::Secondary;
        let items: Vec<TaskQueueItem> = ordered
            .into_iter()
            .map(|task| TaskQueueItem::from_task(task, is_alias))
            .collect();

        debug!(
            distro = %distro,
            generation = %generation,
            len = items.len(),
            "queue built"
        );

        TaskQueue {
            key,
            generation,
            items,
        }
    }

    pub fn build_primary(
        &self,
        distro: &DistroId,
        planner: &dyn Planner,
        tasks: &[Task],
    ) -> TaskQueue {
        self.build(QueueKind::Primary, distro, planner, tasks)
    }

    /// `None` when no other distro's task names `distro` as an alias.
    pub fn build_secondary(
        &self,
        distro: &DistroId,
        planner: &dyn Planner,
        tasks: &[Task],
    ) -> Option<TaskQueue> {
        let queue = self.build(QueueKind::Secondary, distro, planner, tasks);
        (!queue.is_empty()).then_some(queue)
    }
}

/// Runnable members of the queue, first occurrence of each id kept.
fn select_candidates(kind: QueueKind, distro: &DistroId, tasks: &[Task]) -> Vec<Task> {
    let mut seen = HashSet::new();
    tasks
        .iter()
        .filter(|t| t.is_runnable())
        .filter(|t| match kind {
            QueueKind::Primary => t.distro == *distro,
            QueueKind::Secondary => t.is_aliased_to(distro),
        })
        .filter(|t| seen.insert(t.id.clone()))
        .cloned()
        .collect()
}
