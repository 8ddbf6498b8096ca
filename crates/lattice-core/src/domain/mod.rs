//! Domain model (ids, tasks, distros, hosts, queues, allocation decisions, errors).

pub mod allocation;
pub mod distro;
pub mod errors;
pub mod host;
pub mod ids;
pub mod queue;
pub mod task;

pub use allocation::{AllocationDecision, CreationIntent, TerminationIntent};
pub use distro::{
    Distro, HostAllocatorSettings, OsFamily, PlannerSettings, PlannerVersion, PlannerWeights,
    ProviderMode,
};
pub use errors::{ConfigError, ExternalError, SchedulerError};
pub use host::{BillingGranularity, Host, HostStatus, Provider};
pub use ids::{DistroId, HostId, TaskId, VersionId};
pub use queue::{Generation, QueueKey, QueueKind, TaskQueue, TaskQueueItem};
pub use task::{Task, TaskStatus};
