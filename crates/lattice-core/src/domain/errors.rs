//! Errors - エラー型と分類
//!
//! - `ConfigError`: 設定不備（即時失敗、前回の状態を維持）
//! - `ExternalError`: 外部呼び出しの失敗（ports が返す）
//! - `SchedulerError`: 1 distro のサイクルを止める失敗

use thiserror::Error;

use super::ids::DistroId;
use super::queue::{Generation, QueueKey};

/// Invalid planner/provider/scheduler configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unknown planner version '{0}' (expected 'legacy' or 'tunable')")]
    UnknownPlannerVersion(String),

    #[error("planner version 'tunable' requires weights")]
    MissingWeights,

    #[error("planner weight '{name}' must be finite and non-negative, got {value}")]
    InvalidWeight { name: &'static str, value: f64 },

    #[error("invalid host bounds: minimum {min} exceeds maximum {max}")]
    InvalidHostBounds { min: u32, max: u32 },

    #[error("'{name}' must be within [0, 1], got {value}")]
    InvalidFraction { name: &'static str, value: f64 },

    #[error("unknown region '{0}'")]
    UnknownRegion(String),

    #[error("invalid scheduler setting '{name}': {reason}")]
    InvalidSetting { name: &'static str, reason: String },

    #[error("failed to read config: {0}")]
    Io(String),

    #[error("failed to parse config: {0}")]
    Parse(String),
}

/// Failure reported by an external collaborator (inventory, pricing, provisioning).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExternalError {
    #[error("external source unavailable: {0}")]
    Unavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("external call timed out")]
    Timeout,
}

/// Why one distro's scheduling cycle stopped.
///
/// None of these cross distro boundaries: the next cycle retries naturally.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("{operation} failed after {attempts} attempt(s): {source}")]
    TransientExternal {
        operation: String,
        attempts: u32,
        #[source]
        source: ExternalError,
    },

    #[error("{operation} exceeded the cycle deadline")]
    DeadlineExceeded { operation: String },

    #[error("queue write for {key} lost to newer generation {winning} (attempted {attempted})")]
    InconsistentQueueWrite {
        key: QueueKey,
        attempted: Generation,
        winning: Generation,
    },

    #[error("distro {0} not found")]
    UnknownDistro(DistroId),
}

impl SchedulerError {
    /// Short label used in structured logs and cycle reports.
    pub fn kind(&self) -> &'static str {
        match self {
            SchedulerError::Configuration(_) => "configuration",
            SchedulerError::TransientExternal { .. } => "transient_external",
            SchedulerError::DeadlineExceeded { .. } => "deadline_exceeded",
            SchedulerError::InconsistentQueueWrite { .. } => "inconsistent_queue_write",
            SchedulerError::UnknownDistro(_) => "unknown_distro",
        }
    }
}
