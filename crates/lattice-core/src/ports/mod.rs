//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部システム（タスク/ホストの正本、価格 API、プロビジョニングワーカー）
//! へのインターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - 外部の正本は読むだけ（スケジューラが書くのはキューと決定のみ）
//! - 外部呼び出しの失敗は `ExternalError` で返す（リトライは呼び出し側）
//! - グローバル状態は持たない（テストでは in-memory 実装を注入する）

pub mod clock;
pub mod generation;
pub mod inventory;
pub mod pricing;
pub mod queue_store;
pub mod sinks;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::generation::{GenerationIssuer, SequentialGenerationIssuer};
pub use self::inventory::{HostInventory, TaskInventory};
pub use self::pricing::{PricingSource, SpotPriceSample};
pub use self::queue_store::{QueueStore, QueueWriteError};
pub use self::sinks::{DecisionSink, ProvisioningSink};
