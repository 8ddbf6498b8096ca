//! Distro configuration: planner, provider, and host capacity settings.
//!
//! Distros are edited through external configuration management; the scheduler
//! validates what it reads and refuses to plan with a broken configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::ConfigError;
use super::ids::DistroId;

/// Which planner orders a distro's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannerVersion {
    /// Priority descending, then enqueue time, then id.
    Legacy,

    /// Weighted multi-factor score.
    Tunable,
}

impl PlannerVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            PlannerVersion::Legacy => "legacy",
            PlannerVersion::Tunable => "tunable",
        }
    }
}

impl fmt::Display for PlannerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlannerVersion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" | "simple" => Ok(PlannerVersion::Legacy),
            "tunable" | "weighted" => Ok(PlannerVersion::Tunable),
            other => Err(ConfigError::UnknownPlannerVersion(other.to_string())),
        }
    }
}

/// Coefficients of the tunable planner's linear score.
///
/// `expected_runtime_factor` is the only signed weight: negative prefers short
/// tasks (throughput), positive prefers long tasks (host-hour efficiency).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlannerWeights {
    #[serde(default = "default_priority_factor")]
    pub priority_factor: f64,

    /// Per minute waited in the queue.
    #[serde(default)]
    pub time_in_queue_factor: f64,

    /// Per transitive dependent inside the candidate set.
    #[serde(default)]
    pub dependents_factor: f64,

    /// Per minute of expected runtime.
    #[serde(default)]
    pub expected_runtime_factor: f64,
}

fn default_priority_factor() -> f64 {
    1.0
}

impl Default for PlannerWeights {
    fn default() -> Self {
        Self {
            priority_factor: default_priority_factor(),
            time_in_queue_factor: 0.0,
            dependents_factor: 0.0,
            expected_runtime_factor: 0.0,
        }
    }
}

impl PlannerWeights {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let unsigned = [
            ("priority_factor", self.priority_factor),
            ("time_in_queue_factor", self.time_in_queue_factor),
            ("dependents_factor", self.dependents_factor),
        ];
        for (name, value) in unsigned {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }
        if !self.expected_runtime_factor.is_finite() {
            return Err(ConfigError::InvalidWeight {
                name: "expected_runtime_factor",
                value: self.expected_runtime_factor,
            });
        }
        Ok(())
    }
}

/// Planner configuration as stored on the distro.
///
/// `version` stays a raw string so an unknown name surfaces as a
/// `ConfigError` at planning time instead of breaking inventory reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerSettings {
    #[serde(default = "default_planner_version")]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<PlannerWeights>,
}

fn default_planner_version() -> String {
    PlannerVersion::Legacy.as_str().to_string()
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            version: default_planner_version(),
            weights: None,
        }
    }
}

impl PlannerSettings {
    pub fn legacy() -> Self {
        Self::default()
    }

    pub fn tunable(weights: PlannerWeights) -> Self {
        Self {
            version: PlannerVersion::Tunable.as_str().to_string(),
            weights: Some(weights),
        }
    }

    /// Parse and validate; fails before any queue is touched.
    pub fn resolve(&self) -> Result<(PlannerVersion, Option<PlannerWeights>), ConfigError> {
        let version: PlannerVersion = self.version.parse()?;
        match version {
            PlannerVersion::Legacy => Ok((version, None)),
            PlannerVersion::Tunable => {
                let weights = self.weights.ok_or(ConfigError::MissingWeights)?;
                weights.validate()?;
                Ok((version, Some(weights)))
            }
        }
    }
}

/// How new hosts of a distro are purchased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderMode {
    /// Always on-demand.
    #[default]
    OnDemand,

    /// Always spot.
    Spot,

    /// Compare prices per request.
    Auto,
}

/// Capacity bounds and allocation knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HostAllocatorSettings {
    #[serde(default)]
    pub minimum_hosts: u32,

    #[serde(default = "default_maximum_hosts")]
    pub maximum_hosts: u32,

    /// Share of secondary (alias) queue depth counted as demand.
    #[serde(default = "default_alias_depth_fraction")]
    pub alias_depth_fraction: f64,
}

fn default_maximum_hosts() -> u32 {
    10
}

fn default_alias_depth_fraction() -> f64 {
    0.5
}

impl Default for HostAllocatorSettings {
    fn default() -> Self {
        Self {
            minimum_hosts: 0,
            maximum_hosts: default_maximum_hosts(),
            alias_depth_fraction: default_alias_depth_fraction(),
        }
    }
}

impl HostAllocatorSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.minimum_hosts > self.maximum_hosts {
            return Err(ConfigError::InvalidHostBounds {
                min: self.minimum_hosts,
                max: self.maximum_hosts,
            });
        }
        let fraction = self.alias_depth_fraction;
        if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
            return Err(ConfigError::InvalidFraction {
                name: "alias_depth_fraction",
                value: fraction,
            });
        }
        Ok(())
    }
}

/// Operating system family, derived from the distro's arch descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsFamily {
    Linux,
    Suse,
    Windows,
}

impl OsFamily {
    /// `windows_amd64` -> Windows, `suse_*` -> SUSE, everything else is Linux.
    pub fn from_arch(arch: &str) -> Self {
        let arch = arch.to_ascii_lowercase();
        if arch.starts_with("windows") {
            OsFamily::Windows
        } else if arch.starts_with("suse") {
            OsFamily::Suse
        } else {
            OsFamily::Linux
        }
    }
}

/// A named execution environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distro {
    pub id: DistroId,

    /// e.g. `linux_amd64`, `windows_amd64`.
    #[serde(default = "default_arch")]
    pub arch: String,

    #[serde(default)]
    pub instance_type: String,

    /// Empty means the scheduler's configured region.
    #[serde(default)]
    pub region: String,

    #[serde(default)]
    pub planner: PlannerSettings,

    #[serde(default)]
    pub provider: ProviderMode,

    #[serde(default)]
    pub host_allocator: HostAllocatorSettings,

    /// Disabled distros keep their queue but never get new hosts.
    #[serde(default)]
    pub disabled: bool,
}

fn default_arch() -> String {
    "linux_amd64".to_string()
}

impl Distro {
    pub fn new(id: impl Into<DistroId>) -> Self {
        Self {
            id: id.into(),
            arch: default_arch(),
            instance_type: "m5.xlarge".to_string(),
            region: String::new(),
            planner: PlannerSettings::default(),
            provider: ProviderMode::default(),
            host_allocator: HostAllocatorSettings::default(),
            disabled: false,
        }
    }

    pub fn os(&self) -> OsFamily {
        OsFamily::from_arch(&self.arch)
    }
}
