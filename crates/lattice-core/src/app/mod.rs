//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてスケジューリングサイクルを実装します。
//!
//! # 主要コンポーネント
//! - **SchedulerBuilder**: ports の注入と起動時検証
//! - **Scheduler**: distro ごとのサイクル（計画 → 保存 → 割り当て → 通知）と定期ループ
//! - **SchedulerHandle**: ループの起動と停止
//! - **CycleReport**: 1 サイクル分の結果

pub mod builder;
pub mod scheduler;
pub mod status;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, SchedulerBuilder};
pub use self::scheduler::{Scheduler, SchedulerHandle};
pub use self::status::{CycleReport, DistroOutcome};
