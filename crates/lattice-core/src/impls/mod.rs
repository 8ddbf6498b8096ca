//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports の in-memory 実装を含めます。
//!
//! # 含まれる実装
//! - **InMemoryQueueStore**: primary / secondary を分けたキューストア
//! - **StaticInventory** / **StaticPricingSource**: JSON スナップショットから作る外部データ
//! - **RecordingProvisioningSink** / **RecordingDecisionSink**: 送られたものを溜めるだけ
//!
//! 本番用の実装（DB、クラウド API、プロビジョニングワーカー）は別クレートの責務です。

pub mod memory_store;
pub mod recording;
pub mod snapshot;

// 主要な型を再エクスポート
pub use self::memory_store::InMemoryQueueStore;
pub use self::recording::{RecordingDecisionSink, RecordingProvisioningSink};
pub use self::snapshot::{
    InventorySnapshot, OnDemandQuote, SpotQuote, StaticInventory, StaticPricingSource,
};
