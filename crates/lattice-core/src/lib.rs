//! lattice-core
//!
//! Per-distro task queue planning and host allocation.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, task, distro, host, queue, allocation, errors）
//! - **ports**: 抽象化レイヤー（TaskInventory, HostInventory, QueueStore, PricingSource, sinks, Clock）
//! - **planner**: キュー順序の戦略（legacy / tunable）と依存関係パス
//! - **queue**: 候補タスク → 世代付き TaskQueue
//! - **allocator**: キューの深さとホスト一覧 → ホスト増減
//! - **cloud**: 価格キャッシュ、spot / on-demand の選択、課金境界
//! - **app**: Scheduler（サイクルとループ）と SchedulerBuilder
//! - **impls**: 実装（InMemoryQueueStore、JSON スナップショットなど開発用）
//! - **config** / **retry**: 設定とリトライ

pub mod allocator;
pub mod app;
pub mod cloud;
pub mod config;
pub mod domain;
pub mod impls;
pub mod planner;
pub mod ports;
pub mod queue;
pub mod retry;

pub use allocator::{AllocationPlan, HostAllocator};
pub use app::{BuildError, CycleReport, DistroOutcome, Scheduler, SchedulerBuilder, SchedulerHandle};
pub use config::SchedulerConfig;
pub use domain::{AllocationDecision, SchedulerError};
