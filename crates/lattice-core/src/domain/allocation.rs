//! Allocation decisions handed to the provisioning worker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::host::Provider;
use super::ids::{DistroId, HostId};
use super::queue::Generation;

/// Request to create `count` hosts of one distro.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreationIntent {
    pub distro: DistroId,
    pub provider: Provider,
    pub instance_type: String,
    pub count: u32,

    /// Availability zone chosen by spot pricing, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,

    /// Prices compared when the provider was chosen automatically.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_demand_price: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spot_price: Option<f64>,
}

/// Request to terminate one idle host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminationIntent {
    pub host: HostId,
    pub next_billing_boundary: DateTime<Utc>,
}

/// One distro's allocation result for one cycle.
///
/// `delta` is signed: positive provisions, negative terminates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationDecision {
    pub distro: DistroId,
    pub generation: Generation,
    pub decided_at: DateTime<Utc>,

    pub delta: i64,

    pub primary_depth: usize,
    pub secondary_depth: usize,
    pub active_hosts: u32,
    pub free_hosts: u32,

    /// Demand exceeded `maximum_hosts`. Reported, never an error.
    pub capacity_saturated: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<CreationIntent>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub terminate: Vec<TerminationIntent>,

    pub reasoning: String,
}
