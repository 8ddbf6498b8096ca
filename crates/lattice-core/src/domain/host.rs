//! Host inventory model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::distro::{Distro, OsFamily};
use super::ids::{HostId, TaskId};

/// Capacity purchase model actually used for a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    OnDemand,
    Spot,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::OnDemand => "on_demand",
            Provider::Spot => "spot",
        }
    }
}

/// Billing interval, derived from provider + OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingGranularity {
    Hourly,
    PerSecond,
}

impl BillingGranularity {
    /// Linux is billed per second; Windows and SUSE by the hour.
    pub fn for_os(os: OsFamily) -> Self {
        match os {
            OsFamily::Linux => BillingGranularity::PerSecond,
            OsFamily::Windows | OsFamily::Suse => BillingGranularity::Hourly,
        }
    }
}

/// Host state as reported by the host inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostStatus {
    /// Requested from the provider, not yet booted.
    Provisioning,

    /// Booted, running setup.
    Starting,

    Running,

    /// Draining before termination; never receives new work.
    Decommissioned,

    Quarantined,

    Terminated,
}

impl HostStatus {
    /// Counts toward the distro's host total.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            HostStatus::Provisioning | HostStatus::Starting | HostStatus::Running
        )
    }

    /// Will be able to take work once it finishes booting.
    pub fn is_coming_up(self) -> bool {
        matches!(self, HostStatus::Provisioning | HostStatus::Starting)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub id: HostId,

    /// Snapshot of the distro configuration taken when the host was created.
    pub distro: Distro,

    pub provider: Provider,

    pub status: HostStatus,

    pub created_at: DateTime<Utc>,

    /// When the provider reported the host running (billing starts here).
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub running_task: Option<TaskId>,

    /// Expected finish of `running_task`, if its runtime is known.
    #[serde(default)]
    pub running_task_expected_end: Option<DateTime<Utc>>,
}

impl Host {
    pub fn new(
        id: impl Into<HostId>,
        distro: Distro,
        provider: Provider,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            distro,
            provider,
            status: HostStatus::Running,
            created_at,
            started_at: None,
            running_task: None,
            running_task_expected_end: None,
        }
    }

    pub fn billing(&self) -> BillingGranularity {
        BillingGranularity::for_os(self.distro.os())
    }

    /// Running with nothing to do.
    pub fn is_idle(&self) -> bool {
        self.status == HostStatus::Running && self.running_task.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn billing_follows_os() {
        let created = Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0).unwrap();

        let mut windows = Distro::new("win");
        windows.arch = "windows_amd64".to_string();
        let host = Host::new("h1", windows, Provider::OnDemand, created);
        assert_eq!(host.billing(), BillingGranularity::Hourly);

        let host = Host::new("h2", Distro::new("linux"), Provider::Spot, created);
        assert_eq!(host.billing(), BillingGranularity::PerSecond);
    }

    #[test]
    fn idle_means_running_without_task() {
        let created = Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0).unwrap();
        let mut host = Host::new("h1", Distro::new("d"), Provider::OnDemand, created);
        assert!(host.is_idle());

        host.running_task = Some(TaskId::new("t"));
        assert!(!host.is_idle());

        host.running_task = None;
        host.status = HostStatus::Starting;
        assert!(!host.is_idle());
        assert!(host.status.is_coming_up());
    }
}
