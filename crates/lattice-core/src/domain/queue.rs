//! Persisted task queues and their generation identifiers.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use super::distro::PlannerVersion;
use super::ids::{DistroId, TaskId, VersionId};
use super::task::Task;

/// Primary queues hold a distro's own tasks; secondary queues hold tasks
/// other distros declared this distro as an alias for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueKind {
    Primary,
    Secondary,
}

/// Storage key of a queue.
///
/// The two variants never collide even for the same distro, so a primary and a
/// secondary queue are always separate records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "distro", rename_all = "snake_case")]
pub enum QueueKey {
    Primary(DistroId),
    Secondary(DistroId),
}

impl QueueKey {
    pub fn new(kind: QueueKind, distro: DistroId) -> Self {
        match kind {
            QueueKind::Primary => QueueKey::Primary(distro),
            QueueKind::Secondary => QueueKey::Secondary(distro),
        }
    }

    pub fn kind(&self) -> QueueKind {
        match self {
            QueueKey::Primary(_) => QueueKind::Primary,
            QueueKey::Secondary(_) => QueueKind::Secondary,
        }
    }

    pub fn distro(&self) -> &DistroId {
        match self {
            QueueKey::Primary(d) | QueueKey::Secondary(d) => d,
        }
    }
}

impl fmt::Display for QueueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueKey::Primary(d) => write!(f, "primary:{d}"),
            QueueKey::Secondary(d) => write!(f, "secondary:{d}"),
        }
    }
}

/// Identifies one planning pass for one queue key.
///
/// Generations are compared with [`Generation::is_newer_than`], which orders by
/// `(issued_at, sequence)`. `sequence` is strictly increasing per issuer, so
/// two passes in the same millisecond are still distinguishable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Generation {
    pub key: QueueKey,
    pub issued_at: DateTime<Utc>,
    pub sequence: u64,
    pub planner: PlannerVersion,

    /// Audit id (time-sortable).
    pub run_id: Ulid,
}

impl Generation {
    pub fn is_newer_than(&self, other: &Generation) -> bool {
        (self.issued_at, self.sequence) > (other.issued_at, other.sequence)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}-{}", self.key, self.planner, self.sequence)
    }
}

/// One task reference inside a persisted queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskQueueItem {
    pub id: TaskId,
    pub distro: DistroId,
    pub version: VersionId,
    pub priority: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_duration_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<TaskId>,

    /// Placed here through an alias rather than primary ownership.
    pub is_alias: bool,
}

impl TaskQueueItem {
    pub fn from_task(task: &Task, is_alias: bool) -> Self {
        Self {
            id: task.id.clone(),
            distro: task.distro.clone(),
            version: task.version.clone(),
            priority: task.priority,
            expected_duration_secs: task.expected_duration.map(|d| d.as_secs()),
            dependencies: task.depends_on.clone(),
            is_alias,
        }
    }
}

/// An ordered queue produced by one planning pass. Always replaced whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskQueue {
    pub key: QueueKey,
    pub generation: Generation,
    pub items: Vec<TaskQueueItem>,
}

impl TaskQueue {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
