//! Scheduler - distro ごとのスケジューリングサイクル
//!
//! 1 distro の流れ:
//! 1. distro 設定を読む → planner・ホスト上限・region を検証（不正なら即失敗）
//! 2. primary / alias 候補とホスト一覧を読む
//! 3. 2 本のキューを組んで保存し、読み戻して深さを得る
//! 4. allocator → 作成があるときだけ provider を選ぶ
//! 5. 決定を DecisionSink / ProvisioningSink に渡す
//!
//! # 設計原則
//! - distro 同士は独立（1 つの失敗が他を止めない）
//! - 各 distro は `cycle_deadline` で打ち切る
//! - 外部の読み取りはリトライ付き、キューの書き込みは 1 回だけ（古い世代は負ける）

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{debug, error, info, instrument, warn};

use crate::allocator::{AllocationInput, HostAllocator};
use crate::app::status::CycleReport;
use crate::cloud::{ProviderSelector, region_full_name};
use crate::config::SchedulerConfig;
use crate::domain::{
    AllocationDecision, DistroId, ExternalError, Generation, ProviderMode, QueueKey, QueueKind,
    SchedulerError, TaskQueue,
};
use crate::planner::PlannerKind;
use crate::ports::{
    Clock, DecisionSink, HostInventory, ProvisioningSink, QueueStore, QueueWriteError,
    TaskInventory,
};
use crate::queue::QueueBuilder;
use crate::retry::{RetryPolicy, retry_with_backoff};

/// Scheduler は全 distro のキュー計画とホスト割り当てを回す
///
/// `SchedulerBuilder` で構築する。
pub struct Scheduler {
    pub(super) config: SchedulerConfig,
    pub(super) retry: RetryPolicy,
    pub(super) tasks: Arc<dyn TaskInventory>,
    pub(super) hosts: Arc<dyn HostInventory>,
    pub(super) store: Arc<dyn QueueStore>,
    pub(super) queues: QueueBuilder,
    pub(super) selector: ProviderSelector,
    pub(super) allocator: HostAllocator,
    pub(super) provisioning: Arc<dyn ProvisioningSink>,
    pub(super) decisions: Arc<dyn DecisionSink>,
    pub(super) clock: Arc<dyn Clock>,
}

impl Scheduler {
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn queue_store(&self) -> &Arc<dyn QueueStore> {
        &self.store
    }

    pub fn selector(&self) -> &ProviderSelector {
        &self.selector
    }

    /// One full pass for one distro.
    #[instrument(skip(self), fields(distro = %distro_id))]
    pub async fn schedule_distro(
        &self,
        distro_id: &DistroId,
    ) -> Result<AllocationDecision, SchedulerError> {
        let tasks = &self.tasks;
        let mut distro = retry_with_backoff(&self.retry, "read distro", move || {
            tasks.distro(distro_id)
        })
        .await?
        .ok_or_else(|| SchedulerError::UnknownDistro(distro_id.clone()))?;
        if distro.region.is_empty() {
            distro.region = self.config.pricing.region.clone();
        }

        let planner = PlannerKind::from_settings(&distro.planner)?;
        distro.host_allocator.validate()?;
        if distro.provider == ProviderMode::Auto {
            region_full_name(&distro.region)?;
        }

        // 書き込みの前に全部読む（途中で失敗しても半端なキューを残さない）
        let runnable = retry_with_backoff(&self.retry, "list runnable tasks", move || {
            tasks.runnable_tasks(distro_id)
        })
        .await?;
        let aliased = retry_with_backoff(&self.retry, "list alias tasks", move || {
            tasks.alias_tasks(distro_id)
        })
        .await?;
        let host_inventory = &self.hosts;
        let hosts = retry_with_backoff(&self.retry, "list hosts", move || {
            host_inventory.hosts(distro_id)
        })
        .await?;

        let primary = self.queues.build_primary(&distro.id, &planner, &runnable);
        let written = self.persist(primary).await?;

        let secondary_key = QueueKey::Secondary(distro.id.clone());
        match self.queues.build_secondary(&distro.id, &planner, &aliased) {
            Some(queue) => {
                self.persist(queue).await?;
            }
            None => {
                let store = &self.store;
                let key = &secondary_key;
                let removed =
                    retry_with_backoff(&self.retry, "remove secondary queue", move || {
                        store.remove(key)
                    })
                    .await?;
                if removed {
                    debug!("alias queue emptied, removed");
                }
            }
        }

        let primary_key = QueueKey::Primary(distro.id.clone());
        let (primary_depth, stored) = self.read_back(&primary_key).await?;
        let (secondary_depth, _) = self.read_back(&secondary_key).await?;
        let generation = stored.unwrap_or(written);

        let input = AllocationInput {
            distro: &distro,
            primary_depth,
            secondary_depth,
            hosts: &hosts,
            now: self.clock.now(),
        };
        let plan = self.allocator.allocate(&input);
        let provider = if plan.create > 0 {
            Some(self.selector.select(&distro).await)
        } else {
            None
        };
        let decision = plan.into_decision(&input, generation, provider);

        if decision.capacity_saturated {
            warn!(
                maximum_hosts = distro.host_allocator.maximum_hosts,
                reasoning = %decision.reasoning,
                "capacity saturated"
            );
        }

        self.emit(&decision).await?;
        info!(
            generation = %decision.generation,
            delta = decision.delta,
            primary_depth,
            secondary_depth,
            "allocation decided"
        );
        Ok(decision)
    }

    /// Plan every distro concurrently, each bounded by the cycle deadline.
    pub async fn run_cycle(self: &Arc<Self>) -> CycleReport {
        let started_at = self.clock.now();
        let tasks = &self.tasks;
        let distros = match retry_with_backoff(&self.retry, "list distros", move || {
            tasks.list_distros()
        })
        .await
        {
            Ok(distros) => distros,
            Err(e) => {
                error!(error = %e, "cannot list distros, skipping cycle");
                return CycleReport::aborted(started_at, e.to_string());
            }
        };

        let deadline = self.config.cycle_deadline();
        let mut set = JoinSet::new();
        for distro in distros {
            let this = Arc::clone(self);
            set.spawn(async move {
                let result = match timeout(deadline, this.schedule_distro(&distro)).await {
                    Ok(result) => result,
                    Err(_) => Err(SchedulerError::DeadlineExceeded {
                        operation: format!("scheduling distro {distro}"),
                    }),
                };
                (distro, result)
            });
        }

        let mut report = CycleReport::new(started_at);
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((distro, Ok(decision))) => report.record_planned(distro, decision),
                Ok((distro, Err(e))) => {
                    match &e {
                        SchedulerError::InconsistentQueueWrite { .. } => {
                            warn!(distro = %distro, kind = e.kind(), error = %e, "distro skipped this cycle")
                        }
                        _ => error!(distro = %distro, kind = e.kind(), error = %e, "distro cycle aborted"),
                    }
                    report.record_failed(distro, &e);
                }
                Err(join_error) => error!(error = %join_error, "distro task panicked"),
            }
        }

        report.primary_queues = self.queue_count(QueueKind::Primary).await;
        report.secondary_queues = self.queue_count(QueueKind::Secondary).await;
        report.finished_at = self.clock.now();
        info!(
            planned = report.planned(),
            failed = report.failed(),
            primary_queues = report.primary_queues,
            secondary_queues = report.secondary_queues,
            "scheduling cycle finished"
        );
        report
    }

    /// Tick every `cycle_interval` until `shutdown` flips to true.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.config.cycle_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    // sender が消えたら止める
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }

            self.run_cycle().await;
        }
        info!("scheduler stopped");
    }

    async fn persist(&self, queue: TaskQueue) -> Result<Generation, SchedulerError> {
        let key = queue.key.clone();
        match self.store.replace(queue).await {
            Ok(generation) => Ok(generation),
            Err(QueueWriteError::Stale { attempted, winning }) => {
                warn!(
                    key = %key,
                    attempted = %attempted,
                    winning = %winning,
                    "queue write lost to a newer generation"
                );
                Err(SchedulerError::InconsistentQueueWrite {
                    key,
                    attempted,
                    winning,
                })
            }
            Err(QueueWriteError::External(source)) => Err(SchedulerError::TransientExternal {
                operation: format!("replace queue {key}"),
                attempts: 1,
                source,
            }),
        }
    }

    /// Depth and generation of what is stored under `key` now.
    async fn read_back(
        &self,
        key: &QueueKey,
    ) -> Result<(usize, Option<Generation>), SchedulerError> {
        let store = &self.store;
        let stored = retry_with_backoff(&self.retry, "read queue", move || store.get(key)).await?;
        Ok(stored.map_or((0, None), |q| (q.len(), Some(q.generation.clone()))))
    }

    async fn queue_count(&self, kind: QueueKind) -> usize {
        match self.store.count(kind).await {
            Ok(count) => count,
            Err(e) => {
                warn!(kind = ?kind, error = %e, "cannot count queues");
                0
            }
        }
    }

    /// Record the decision, then hand intents to the provisioning worker.
    ///
    /// Provisioning calls are not retried here: the next cycle re-decides.
    async fn emit(&self, decision: &AllocationDecision) -> Result<(), SchedulerError> {
        let sink = &self.decisions;
        retry_with_backoff(&self.retry, "record decision", move || sink.record(decision)).await?;

        if let Some(create) = &decision.create {
            self.provisioning
                .create_hosts(create)
                .await
                .map_err(|source| provisioning_error("create hosts", source))?;
        }

        for terminate in &decision.terminate {
            if let Err(e) = self.provisioning.terminate_host(terminate).await {
                warn!(host = %terminate.host, error = %e, "terminate request failed");
            }
        }
        Ok(())
    }
}

fn provisioning_error(operation: &str, source: ExternalError) -> SchedulerError {
    SchedulerError::TransientExternal {
        operation: operation.to_string(),
        attempts: 1,
        source,
    }
}

/// Running scheduler loop handle.
/// - `request_shutdown()` で次の tick を待たずに止まる（実行中のサイクルは最後まで走る）
/// - `shutdown_and_join()` でループの終了を待てる
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn spawn(scheduler: Arc<Scheduler>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(scheduler.run(shutdown_rx));
        Self { shutdown_tx, join }
    }

    pub fn request_shutdown(&self) {
        // receiver はループ終了後に drop されているかもしれない
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        if let Err(e) = self.join.await {
            error!(error = %e, "scheduler loop panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::SchedulerBuilder;
    use crate::app::status::DistroOutcome;
    use crate::domain::{
        Distro, Host, HostAllocatorSettings, PlannerSettings, PlannerVersion, PlannerWeights,
        Provider, Task, TaskQueueItem,
    };
    use crate::impls::{
        InMemoryQueueStore, RecordingDecisionSink, RecordingProvisioningSink, StaticInventory,
        StaticPricingSource,
    };
    use crate::ports::{FixedClock, SpotPriceSample};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rstest::rstest;
    use ulid::Ulid;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn distro(id: &str, planner: PlannerSettings) -> Distro {
        let mut d = Distro::new(id);
        d.planner = planner;
        d.host_allocator = HostAllocatorSettings {
            minimum_hosts: 0,
            maximum_hosts: 10,
            alias_depth_fraction: 0.5,
        };
        d
    }

    struct Harness {
        scheduler: Arc<Scheduler>,
        inventory: Arc<StaticInventory>,
        store: Arc<InMemoryQueueStore>,
        provisioning: Arc<RecordingProvisioningSink>,
        decisions: Arc<RecordingDecisionSink>,
    }

    fn fast_config() -> SchedulerConfig {
        let mut config = SchedulerConfig::default();
        config.retry.base_delay_ms = 1;
        config.cycle_interval_secs = 1;
        config
    }

    fn harness_with(
        config: SchedulerConfig,
        inventory: StaticInventory,
        pricing: StaticPricingSource,
    ) -> Harness {
        let inventory = Arc::new(inventory);
        let store = Arc::new(InMemoryQueueStore::new());
        let provisioning = Arc::new(RecordingProvisioningSink::new());
        let decisions = Arc::new(RecordingDecisionSink::new());
        let scheduler = SchedulerBuilder::new(config)
            .inventory(inventory.clone())
            .queue_store(store.clone())
            .pricing(Arc::new(pricing))
            .provisioning(provisioning.clone())
            .decisions(decisions.clone())
            .clock(Arc::new(FixedClock::new(t0())))
            .build()
            .unwrap();
        Harness {
            scheduler: Arc::new(scheduler),
            inventory,
            store,
            provisioning,
            decisions,
        }
    }

    fn harness(inventory: StaticInventory) -> Harness {
        harness_with(fast_config(), inventory, StaticPricingSource::new())
    }

    /// Two distros: A belongs to "one"; B belongs to "other" and may also run on "one".
    fn one_and_other(planner: PlannerSettings) -> StaticInventory {
        StaticInventory::new(
            vec![
                distro("one", planner.clone()),
                distro("other", planner),
            ],
            vec![
                Task::new("A", "one", "v1", t0() - Duration::minutes(10)).with_priority(5),
                Task::new("B", "other", "v1", t0() - Duration::minutes(20)).with_alias("one"),
            ],
            vec![],
        )
    }

    fn ids(queue: &TaskQueue) -> Vec<&str> {
        queue.items.iter().map(|i| i.id.as_str()).collect()
    }

    #[rstest]
    #[case::legacy(PlannerSettings::legacy())]
    #[case::tunable(PlannerSettings::tunable(PlannerWeights::default()))]
    #[tokio::test]
    async fn cycle_builds_primary_and_alias_queues(#[case] planner: PlannerSettings) {
        let h = harness(one_and_other(planner));
        let report = h.scheduler.run_cycle().await;
        assert!(report.is_clean(), "{report:?}");

        let one_primary = h.store.get(&QueueKey::Primary("one".into())).await.unwrap().unwrap();
        let one_secondary = h.store.get(&QueueKey::Secondary("one".into())).await.unwrap().unwrap();
        let other_primary = h.store.get(&QueueKey::Primary("other".into())).await.unwrap().unwrap();
        assert_eq!(ids(&one_primary), vec!["A"]);
        assert_eq!(ids(&one_secondary), vec!["B"]);
        assert!(one_secondary.items.iter().all(|i| i.is_alias));
        assert_eq!(ids(&other_primary), vec!["B"]);
        assert!(h.store.get(&QueueKey::Secondary("other".into())).await.unwrap().is_none());

        assert_eq!(report.primary_queues, 2);
        assert_eq!(report.secondary_queues, 1);
        assert_eq!(h.decisions.decisions().await.len(), 2);
    }

    #[rstest]
    #[case::legacy(PlannerSettings::legacy())]
    #[case::tunable(PlannerSettings::tunable(PlannerWeights::default()))]
    #[tokio::test]
    async fn aliased_pair_is_stored_once_per_collection(#[case] planner: PlannerSettings) {
        let inventory = StaticInventory::new(
            vec![distro("A", planner.clone()), distro("B", planner)],
            vec![
                Task::new("other", "A", "v1", t0()).with_priority(200).with_alias("B"),
                Task::new("one", "A", "v1", t0()).with_priority(2000).with_alias("B"),
            ],
            vec![],
        );
        let h = harness(inventory);
        h.scheduler.schedule_distro(&"A".into()).await.unwrap();
        h.scheduler.schedule_distro(&"B".into()).await.unwrap();

        let primary = h.store.get(&QueueKey::Primary("A".into())).await.unwrap().unwrap();
        let secondary = h.store.get(&QueueKey::Secondary("B".into())).await.unwrap().unwrap();
        assert_eq!(ids(&primary), vec!["one", "other"]);
        assert_eq!(ids(&secondary), vec!["one", "other"]);
        assert_eq!(h.store.count(QueueKind::Secondary).await.unwrap(), 1);
        assert!(h.store.get(&QueueKey::Secondary("A".into())).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn decision_counts_alias_depth_fractionally() {
        let h = harness(one_and_other(PlannerSettings::legacy()));
        let decision = h.scheduler.schedule_distro(&"one".into()).await.unwrap();

        assert_eq!(decision.primary_depth, 1);
        assert_eq!(decision.secondary_depth, 1);
        // ceil(1 + 0.5 * 1)
        assert_eq!(decision.delta, 2);
        let created = h.provisioning.created().await;
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].count, 2);
        assert_eq!(created[0].provider, Provider::OnDemand);
        assert_eq!(decision.generation.key, QueueKey::Primary("one".into()));
    }

    #[tokio::test]
    async fn stale_queue_write_skips_allocation() {
        let h = harness(one_and_other(PlannerSettings::legacy()));
        let future = Generation {
            key: QueueKey::Primary("one".into()),
            issued_at: t0() + Duration::days(365),
            sequence: 1,
            planner: PlannerVersion::Legacy,
            run_id: Ulid::nil(),
        };
        h.store
            .replace(TaskQueue {
                key: future.key.clone(),
                generation: future.clone(),
                items: Vec::<TaskQueueItem>::new(),
            })
            .await
            .unwrap();

        let err = h.scheduler.schedule_distro(&"one".into()).await.unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::InconsistentQueueWrite { ref winning, .. } if *winning == future
        ));
        assert!(h.decisions.decisions().await.is_empty());
        assert!(h.provisioning.created().await.is_empty());
    }

    #[tokio::test]
    async fn transient_inventory_failures_are_retried() {
        let h = harness(one_and_other(PlannerSettings::legacy()));
        h.inventory.fail_next(2);
        let decision = h.scheduler.schedule_distro(&"one".into()).await;
        assert!(decision.is_ok());
    }

    #[tokio::test]
    async fn unknown_distro_is_reported() {
        let h = harness(one_and_other(PlannerSettings::legacy()));
        let err = h.scheduler.schedule_distro(&"ghost".into()).await.unwrap_err();
        assert!(matches!(err, SchedulerError::UnknownDistro(id) if id.as_str() == "ghost"));
    }

    #[tokio::test]
    async fn emptied_alias_queue_is_removed() {
        let h = harness(one_and_other(PlannerSettings::legacy()));
        h.scheduler.run_cycle().await;
        assert!(h.store.get(&QueueKey::Secondary("one".into())).await.unwrap().is_some());

        h.inventory
            .set_tasks(vec![Task::new("A", "one", "v1", t0())])
            .await;
        h.scheduler.run_cycle().await;
        assert!(h.store.get(&QueueKey::Secondary("one".into())).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn auto_provider_uses_prices() {
        let mut one = distro("one", PlannerSettings::legacy());
        one.provider = ProviderMode::Auto;
        one.instance_type = "m4.large".to_string();
        let inventory = StaticInventory::new(
            vec![one],
            vec![Task::new("A", "one", "v1", t0())],
            vec![],
        );
        let pricing = StaticPricingSource::new()
            .with_on_demand("Linux", "m4.large", "US East (N. Virginia)", 0.1)
            .with_spot("m4.large", "", "Linux", vec![SpotPriceSample { at: t0(), price: 0.03 }]);
        let h = harness_with(fast_config(), inventory, pricing);

        let decision = h.scheduler.schedule_distro(&"one".into()).await.unwrap();
        let create = decision.create.unwrap();
        assert_eq!(create.provider, Provider::Spot);
        assert_eq!(create.spot_price, Some(0.03));
        assert_eq!(create.on_demand_price, Some(0.1));
    }

    #[tokio::test]
    async fn slow_distro_hits_the_cycle_deadline() {
        let mut one = distro("one", PlannerSettings::legacy());
        one.provider = ProviderMode::Auto;
        let inventory = StaticInventory::new(
            vec![one],
            vec![Task::new("A", "one", "v1", t0())],
            vec![],
        );
        let pricing = StaticPricingSource::new().with_latency(std::time::Duration::from_secs(5));
        let mut config = fast_config();
        config.cycle_deadline_secs = 1;
        let h = harness_with(config, inventory, pricing);

        let report = h.scheduler.run_cycle().await;
        assert!(matches!(
            report.outcome(&"one".into()),
            Some(DistroOutcome::Failed { kind: "deadline_exceeded", .. })
        ));
    }

    #[tokio::test]
    async fn inventory_outage_aborts_the_cycle() {
        let h = harness(one_and_other(PlannerSettings::legacy()));
        h.inventory.fail_next(100);
        let report = h.scheduler.run_cycle().await;
        assert!(report.aborted.is_some());
        assert!(report.outcomes.is_empty());
    }

    #[tokio::test]
    async fn loop_runs_until_shutdown() {
        let h = harness(one_and_other(PlannerSettings::legacy()));
        let handle = SchedulerHandle::spawn(h.scheduler.clone());

        let decisions = h.decisions.clone();
        tokio::time::timeout(std::time::Duration::from_secs(5), async move {
            while decisions.decisions().await.is_empty() {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        handle.shutdown_and_join().await;
    }

    fn unknown_planner(d: &mut Distro) {
        d.planner = PlannerSettings {
            version: "quantum".to_string(),
            weights: None,
        };
    }

    fn bad_bounds(d: &mut Distro) {
        d.host_allocator.minimum_hosts = 5;
        d.host_allocator.maximum_hosts = 2;
    }

    fn bad_fraction(d: &mut Distro) {
        d.host_allocator.alias_depth_fraction = 1.5;
    }

    fn unknown_auto_region(d: &mut Distro) {
        d.provider = ProviderMode::Auto;
        d.region = "mars-1".to_string();
    }

    #[rstest]
    #[case::unknown_planner(unknown_planner)]
    #[case::min_above_max(bad_bounds)]
    #[case::fraction_above_one(bad_fraction)]
    #[case::auto_with_unknown_region(unknown_auto_region)]
    #[tokio::test]
    async fn invalid_distro_settings_fail_only_that_distro(#[case] breakage: fn(&mut Distro)) {
        let inventory = one_and_other(PlannerSettings::legacy());
        let mut other = distro("other", PlannerSettings::legacy());
        breakage(&mut other);
        inventory.upsert_distro(other).await;
        let h = harness(inventory);

        let report = h.scheduler.run_cycle().await;
        assert!(matches!(
            report.outcome(&"other".into()),
            Some(DistroOutcome::Failed { kind: "configuration", .. })
        ));
        assert!(matches!(
            report.outcome(&"one".into()),
            Some(DistroOutcome::Planned { .. })
        ));
        // 失敗した distro のキューは書かれない
        assert!(h.store.get(&QueueKey::Primary("other".into())).await.unwrap().is_none());
        assert_eq!(h.decisions.decisions().await.len(), 1);
    }

    struct UnreachableHosts;

    #[async_trait]
    impl HostInventory for UnreachableHosts {
        async fn hosts(&self, _distro: &DistroId) -> Result<Vec<Host>, ExternalError> {
            Err(ExternalError::Unavailable("host inventory down".to_string()))
        }
    }

    #[tokio::test]
    async fn host_inventory_failure_leaves_queues_untouched() {
        let store = Arc::new(InMemoryQueueStore::new());
        let decisions = Arc::new(RecordingDecisionSink::new());
        let scheduler = SchedulerBuilder::new(fast_config())
            .task_inventory(Arc::new(one_and_other(PlannerSettings::legacy())))
            .host_inventory(Arc::new(UnreachableHosts))
            .queue_store(store.clone())
            .pricing(Arc::new(StaticPricingSource::new()))
            .provisioning(Arc::new(RecordingProvisioningSink::new()))
            .decisions(decisions.clone())
            .clock(Arc::new(FixedClock::new(t0())))
            .build()
            .unwrap();

        let err = scheduler.schedule_distro(&"one".into()).await.unwrap_err();
        assert!(matches!(err, SchedulerError::TransientExternal { .. }));
        assert!(store.get(&QueueKey::Primary("one".into())).await.unwrap().is_none());
        assert!(store.get(&QueueKey::Secondary("one".into())).await.unwrap().is_none());
        assert!(decisions.decisions().await.is_empty());
    }

    #[tokio::test]
    async fn distro_without_region_prices_in_the_configured_region() {
        let mut one = distro("one", PlannerSettings::legacy());
        one.provider = ProviderMode::Auto;
        one.instance_type = "m4.large".to_string();
        assert!(one.region.is_empty());
        let inventory = StaticInventory::new(
            vec![one],
            vec![Task::new("A", "one", "v1", t0())],
            vec![],
        );
        let pricing = StaticPricingSource::new()
            .with_on_demand("Linux", "m4.large", "US East (N. Virginia)", 0.1)
            .with_on_demand("Linux", "m4.large", "EU (Ireland)", 0.12)
            .with_spot("m4.large", "", "Linux", vec![SpotPriceSample { at: t0(), price: 0.5 }]);
        let mut config = fast_config();
        config.pricing.region = "eu-west-1".to_string();
        let h = harness_with(config, inventory, pricing);

        let decision = h.scheduler.schedule_distro(&"one".into()).await.unwrap();
        let create = decision.create.unwrap();
        assert_eq!(create.on_demand_price, Some(0.12));
        assert_eq!(create.provider, Provider::OnDemand);
    }
}
