//! Static inventory and pricing loaded from a JSON snapshot.
//!
//! Used by the CLI and by tests in place of the real task/host/pricing
//! collaborators. Failures can be injected to exercise retry paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::domain::{Distro, DistroId, ExternalError, Host, Task};
use crate::ports::{HostInventory, PricingSource, SpotPriceSample, TaskInventory};

/// Published on-demand price for one (os, instance type, region) triple.
///
/// `os` and `region` use billing names ("Linux", "US East (N. Virginia)").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnDemandQuote {
    pub os: String,
    pub instance_type: String,
    pub region: String,
    pub price: f64,
}

/// Spot history for one availability zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotQuote {
    pub os: String,
    pub instance_type: String,
    pub zone: String,
    pub samples: Vec<SpotPriceSample>,
}

/// Everything the scheduler reads from the outside world, in one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    #[serde(default)]
    pub distros: Vec<Distro>,

    #[serde(default)]
    pub tasks: Vec<Task>,

    #[serde(default)]
    pub hosts: Vec<Host>,

    #[serde(default)]
    pub on_demand_prices: Vec<OnDemandQuote>,

    #[serde(default)]
    pub spot_prices: Vec<SpotQuote>,
}

impl InventorySnapshot {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Task, distro and host inventory held in memory.
#[derive(Default)]
pub struct StaticInventory {
    distros: RwLock<Vec<Distro>>,
    tasks: RwLock<Vec<Task>>,
    hosts: RwLock<Vec<Host>>,

    /// The next N calls of any kind fail with `Unavailable`.
    failures: AtomicU32,
}

impl StaticInventory {
    pub fn new(distros: Vec<Distro>, tasks: Vec<Task>, hosts: Vec<Host>) -> Self {
        Self {
            distros: RwLock::new(distros),
            tasks: RwLock::new(tasks),
            hosts: RwLock::new(hosts),
            failures: AtomicU32::new(0),
        }
    }

    pub fn from_snapshot(snapshot: &InventorySnapshot) -> Self {
        Self::new(
            snapshot.distros.clone(),
            snapshot.tasks.clone(),
            snapshot.hosts.clone(),
        )
    }

    pub async fn set_tasks(&self, tasks: Vec<Task>) {
        *self.tasks.write().await = tasks;
    }

    pub async fn upsert_distro(&self, distro: Distro) {
        let mut distros = self.distros.write().await;
        match distros.iter_mut().find(|d| d.id == distro.id) {
            Some(existing) => *existing = distro,
            None => distros.push(distro),
        }
    }

    pub fn fail_next(&self, calls: u32) {
        self.failures.store(calls, Ordering::SeqCst);
    }

    fn injected_failure(&self) -> Result<(), ExternalError> {
        let consumed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match consumed {
            Ok(_) => Err(ExternalError::Unavailable("injected inventory failure".into())),
            Err(_) => Ok(()),
        }
    }
}

#[async_trait]
impl TaskInventory for StaticInventory {
    async fn list_distros(&self) -> Result<Vec<DistroId>, ExternalError> {
        self.injected_failure()?;
        Ok(self.distros.read().await.iter().map(|d| d.id.clone()).collect())
    }

    async fn distro(&self, id: &DistroId) -> Result<Option<Distro>, ExternalError> {
        self.injected_failure()?;
        Ok(self.distros.read().await.iter().find(|d| d.id == *id).cloned())
    }

    async fn runnable_tasks(&self, distro: &DistroId) -> Result<Vec<Task>, ExternalError> {
        self.injected_failure()?;
        let tasks = self.tasks.read().await;
        Ok(tasks
            .iter()
            .filter(|t| t.is_runnable() && t.distro == *distro)
            .cloned()
            .collect())
    }

    async fn alias_tasks(&self, distro: &DistroId) -> Result<Vec<Task>, ExternalError> {
        self.injected_failure()?;
        let tasks = self.tasks.read().await;
        Ok(tasks
            .iter()
            .filter(|t| t.is_runnable() && t.is_aliased_to(distro))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl HostInventory for StaticInventory {
    async fn hosts(&self, distro: &DistroId) -> Result<Vec<Host>, ExternalError> {
        self.injected_failure()?;
        let hosts = self.hosts.read().await;
        Ok(hosts
            .iter()
            .filter(|h| h.distro.id == *distro)
            .cloned()
            .collect())
    }
}

/// Pricing fixtures with call counting.
#[derive(Default)]
pub struct StaticPricingSource {
    on_demand: HashMap<(String, String, String), f64>,
    spot: HashMap<(String, String, String), Vec<SpotPriceSample>>,

    /// Artificial latency so concurrent callers overlap in tests.
    latency: Duration,

    unavailable: bool,

    on_demand_calls: AtomicUsize,
    spot_calls: AtomicUsize,
}

impl StaticPricingSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: &InventorySnapshot) -> Self {
        let mut source = Self::new();
        for q in &snapshot.on_demand_prices {
            source = source.with_on_demand(&q.os, &q.instance_type, &q.region, q.price);
        }
        for q in &snapshot.spot_prices {
            source = source.with_spot(&q.instance_type, &q.zone, &q.os, q.samples.clone());
        }
        source
    }

    pub fn with_on_demand(mut self, os: &str, instance_type: &str, region: &str, price: f64) -> Self {
        self.on_demand.insert(
            (os.to_string(), instance_type.to_string(), region.to_string()),
            price,
        );
        self
    }

    pub fn with_spot(
        mut self,
        instance_type: &str,
        zone: &str,
        os: &str,
        samples: Vec<SpotPriceSample>,
    ) -> Self {
        self.spot.insert(
            (instance_type.to_string(), zone.to_string(), os.to_string()),
            samples,
        );
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Every call fails with `Unavailable`.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn on_demand_calls(&self) -> usize {
        self.on_demand_calls.load(Ordering::SeqCst)
    }

    pub fn spot_calls(&self) -> usize {
        self.spot_calls.load(Ordering::SeqCst)
    }

    async fn respond(&self) -> Result<(), ExternalError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.unavailable {
            return Err(ExternalError::Unavailable("pricing api down".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PricingSource for StaticPricingSource {
    async fn on_demand_price(
        &self,
        os: &str,
        instance_type: &str,
        region: &str,
    ) -> Result<f64, ExternalError> {
        self.on_demand_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await?;
        self.on_demand
            .get(&(os.to_string(), instance_type.to_string(), region.to_string()))
            .copied()
            .ok_or_else(|| ExternalError::NotFound(format!("{os}/{instance_type}/{region}")))
    }

    async fn spot_price_history(
        &self,
        instance_type: &str,
        zone: &str,
        os: &str,
    ) -> Result<Vec<SpotPriceSample>, ExternalError> {
        self.spot_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await?;
        self.spot
            .get(&(instance_type.to_string(), zone.to_string(), os.to_string()))
            .cloned()
            .ok_or_else(|| ExternalError::NotFound(format!("{instance_type}/{zone}/{os}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn inventory_splits_primary_and_alias_tasks() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let inventory = StaticInventory::new(
            vec![Distro::new("A"), Distro::new("B")],
            vec![
                Task::new("one", "A", "v", t0).with_alias("B"),
                Task::new("two", "B", "v", t0),
            ],
            vec![],
        );

        let a = DistroId::new("A");
        let b = DistroId::new("B");
        assert_eq!(inventory.runnable_tasks(&a).await.unwrap().len(), 1);
        assert_eq!(inventory.alias_tasks(&a).await.unwrap().len(), 0);
        assert_eq!(inventory.runnable_tasks(&b).await.unwrap()[0].id.as_str(), "two");
        assert_eq!(inventory.alias_tasks(&b).await.unwrap()[0].id.as_str(), "one");
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let inventory = StaticInventory::new(vec![Distro::new("A")], vec![], vec![]);
        inventory.fail_next(2);

        assert!(inventory.list_distros().await.is_err());
        assert!(inventory.list_distros().await.is_err());
        assert_eq!(inventory.list_distros().await.unwrap().len(), 1);
    }

    #[test]
    fn snapshot_json_loads_with_defaults() {
        let json = r#"{
            "distros": [{ "id": "ubuntu" }],
            "tasks": [{ "id": "t1", "distro": "ubuntu", "version": "v1",
                        "activated_at": "2024-01-01T00:00:00Z", "priority": 10 }],
            "on_demand_prices": [{ "os": "Linux", "instance_type": "m5.xlarge",
                                   "region": "US East (N. Virginia)", "price": 0.192 }]
        }"#;
        let snapshot = InventorySnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.distros.len(), 1);
        assert_eq!(snapshot.tasks[0].priority, 10);
        assert!(snapshot.hosts.is_empty());
        assert_eq!(snapshot.on_demand_prices[0].price, 0.192);
    }

    #[tokio::test]
    async fn pricing_counts_calls_and_reports_missing_keys() {
        let source = StaticPricingSource::new().with_on_demand("Linux", "m5.xlarge", "US East (N. Virginia)", 0.1);

        assert_eq!(
            source.on_demand_price("Linux", "m5.xlarge", "US East (N. Virginia)").await,
            Ok(0.1)
        );
        assert!(matches!(
            source.on_demand_price("Windows", "m5.xlarge", "US East (N. Virginia)").await,
            Err(ExternalError::NotFound(_))
        ));
        assert_eq!(source.on_demand_calls(), 2);
    }
}
