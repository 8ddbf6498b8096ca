//! SchedulerBuilder - スケジューラの構築とワイヤリング
//!
//! # 設計原則
//! - 外部との接点（ports）はすべて注入する
//! - 起動時検証（Fail-fast 設計）: 設定不備や配線漏れは `build()` で止める
//! - Clock と GenerationIssuer だけはデフォルトを持つ

use std::sync::Arc;

use crate::app::scheduler::Scheduler;
use crate::cloud::{PriceOracle, ProviderSelector};
use crate::config::SchedulerConfig;
use crate::domain::ConfigError;
use crate::ports::{
    Clock, DecisionSink, GenerationIssuer, HostInventory, PricingSource, ProvisioningSink,
    QueueStore, SequentialGenerationIssuer, SystemClock, TaskInventory,
};
use crate::queue::QueueBuilder;

/// SchedulerBuilder は Scheduler を構築
///
/// # 使用例
/// ```ignore
/// let scheduler = SchedulerBuilder::new(config)
///     .inventory(inventory)
///     .queue_store(Arc::new(InMemoryQueueStore::new()))
///     .pricing(pricing)
///     .provisioning(provisioning)
///     .decisions(decisions)
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - build() 時に設定を検証する
/// - 必須の port が 1 つでも欠けていれば、欠けている名前をすべて返す
pub struct SchedulerBuilder {
    config: SchedulerConfig,
    tasks: Option<Arc<dyn TaskInventory>>,
    hosts: Option<Arc<dyn HostInventory>>,
    store: Option<Arc<dyn QueueStore>>,
    pricing: Option<Arc<dyn PricingSource>>,
    provisioning: Option<Arc<dyn ProvisioningSink>>,
    decisions: Option<Arc<dyn DecisionSink>>,
    clock: Arc<dyn Clock>,
    issuer: Option<Arc<dyn GenerationIssuer>>,
}

/// BuildError はスケジューラ構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing components: {0:?}. These ports must be provided before build().")]
    MissingComponents(Vec<&'static str>),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

impl SchedulerBuilder {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            tasks: None,
            hosts: None,
            store: None,
            pricing: None,
            provisioning: None,
            decisions: None,
            clock: Arc::new(SystemClock),
            issuer: None,
        }
    }

    /// Task and host inventory from one adapter.
    pub fn inventory<I>(self, inventory: Arc<I>) -> Self
    where
        I: TaskInventory + HostInventory + 'static,
    {
        self.task_inventory(inventory.clone()).host_inventory(inventory)
    }

    pub fn task_inventory(mut self, tasks: Arc<dyn TaskInventory>) -> Self {
        self.tasks = Some(tasks);
        self
    }

    pub fn host_inventory(mut self, hosts: Arc<dyn HostInventory>) -> Self {
        self.hosts = Some(hosts);
        self
    }

    pub fn queue_store(mut self, store: Arc<dyn QueueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn pricing(mut self, pricing: Arc<dyn PricingSource>) -> Self {
        self.pricing = Some(pricing);
        self
    }

    pub fn provisioning(mut self, sink: Arc<dyn ProvisioningSink>) -> Self {
        self.provisioning = Some(sink);
        self
    }

    pub fn decisions(mut self, sink: Arc<dyn DecisionSink>) -> Self {
        self.decisions = Some(sink);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// デフォルトは `SequentialGenerationIssuer`（注入した Clock を使う）
    pub fn generation_issuer(mut self, issuer: Arc<dyn GenerationIssuer>) -> Self {
        self.issuer = Some(issuer);
        self
    }

    /// Scheduler を構築
    ///
    /// # 検証
    /// - `SchedulerConfig::validate()` が通ること
    /// - 必須 port（inventory, queue store, pricing, sinks）がすべて設定済みであること
    pub fn build(self) -> Result<Scheduler, BuildError> {
        self.config.validate()?;

        let missing: Vec<&'static str> = [
            ("task_inventory", self.tasks.is_none()),
            ("host_inventory", self.hosts.is_none()),
            ("queue_store", self.store.is_none()),
            ("pricing", self.pricing.is_none()),
            ("provisioning", self.provisioning.is_none()),
            ("decisions", self.decisions.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();

        let (Some(tasks), Some(hosts), Some(store), Some(pricing), Some(provisioning), Some(decisions)) = (
            self.tasks,
            self.hosts,
            self.store,
            self.pricing,
            self.provisioning,
            self.decisions,
        ) else {
            return Err(BuildError::MissingComponents(missing));
        };

        let retry = self.config.retry_policy();
        let oracle = PriceOracle::with_ttls(
            pricing,
            self.clock.clone(),
            retry.clone(),
            self.config.pricing.on_demand_ttl(),
            self.config.pricing.spot_ttl(),
        );
        let selector = ProviderSelector::new(
            Arc::new(oracle),
            self.config.pricing.availability_zones.clone(),
        );
        let issuer = self.issuer.unwrap_or_else(|| -> Arc<dyn GenerationIssuer> {
            Arc::new(SequentialGenerationIssuer::new(self.clock.clone()))
        });

        Ok(Scheduler {
            allocator: self.config.allocator.allocator(),
            retry,
            tasks,
            hosts,
            store,
            queues: QueueBuilder::new(issuer),
            selector,
            provisioning,
            decisions,
            clock: self.clock,
            config: self.config,
        })
    }
}
