//! Task as seen by the scheduler.
//!
//! The ingestion/dispatch pipeline owns the task document; the scheduler only
//! reads it and decides where it sits in a queue.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{DistroId, TaskId, VersionId};

/// Lifecycle status as reported by the external pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting to be planned and claimed.
    #[default]
    Undispatched,

    /// Claimed by a host (no longer schedulable).
    Dispatched,

    /// Running on a host.
    Started,

    /// Finished (success or failure, the scheduler does not care which).
    Finished,
}

/// A unit of work waiting for a host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,

    /// Primary owner. The task always has a slot in this distro's queue.
    pub distro: DistroId,

    /// Other distros whose idle capacity may also run this task.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub distro_aliases: Vec<DistroId>,

    /// Higher runs first.
    #[serde(default)]
    pub priority: i64,

    pub version: VersionId,

    /// Tasks that must complete before this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<TaskId>,

    /// Historical runtime estimate, if one exists.
    #[serde(default, with = "duration_secs")]
    pub expected_duration: Option<Duration>,

    /// When the task became runnable (enqueue time).
    pub activated_at: DateTime<Utc>,

    #[serde(default)]
    pub status: TaskStatus,
}

impl Task {
    /// Convenience constructor used by tests and fixtures.
    pub fn new(
        id: impl Into<TaskId>,
        distro: impl Into<DistroId>,
        version: impl Into<VersionId>,
        activated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            distro: distro.into(),
            distro_aliases: Vec::new(),
            priority: 0,
            version: version.into(),
            depends_on: Vec::new(),
            expected_duration: None,
            activated_at,
            status: TaskStatus::Undispatched,
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_alias(mut self, distro: impl Into<DistroId>) -> Self {
        self.distro_aliases.push(distro.into());
        self
    }

    pub fn with_dependency(mut self, task: impl Into<TaskId>) -> Self {
        self.depends_on.push(task.into());
        self
    }

    pub fn with_expected_duration(mut self, duration: Duration) -> Self {
        self.expected_duration = Some(duration);
        self
    }

    /// Only undispatched tasks can be planned.
    pub fn is_runnable(&self) -> bool {
        self.status == TaskStatus::Undispatched
    }

    /// Does `distro` list this task as runnable through an alias?
    pub fn is_aliased_to(&self, distro: &DistroId) -> bool {
        self.distro != *distro && self.distro_aliases.iter().any(|a| a == distro)
    }

    /// Time spent waiting since activation, never negative.
    pub fn time_in_queue(&self, now: DateTime<Utc>) -> Duration {
        (now - self.activated_at).to_std().unwrap_or_default()
    }
}

/// Expected durations are persisted as whole seconds.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}
