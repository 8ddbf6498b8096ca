//! QueueStore port - 計画済みキューの永続化
//!
//! QueueStore はキュー全体を丸ごと置き換えます（部分更新はしない）。
//!
//! # 実装
//! - **InMemoryQueueStore**（`impls::memory_store`）

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::errors::ExternalError;
use crate::domain::queue::{Generation, QueueKey, QueueKind, TaskQueue};

/// replace の失敗
#[derive(Debug, Error)]
pub enum QueueWriteError {
    /// A newer generation already owns the key. Not retried.
    #[error("stale write for {}: stored generation {winning} is newer than {attempted}", attempted.key)]
    Stale {
        attempted: Generation,
        winning: Generation,
    },

    #[error(transparent)]
    External(#[from] ExternalError),
}

/// QueueStore はキーごとにキューを原子的に置き換える
///
/// # 設計原則
/// - 1 キーへの書き込みは以前の内容を完全に置き換える（読み手は半端な状態を見ない）
/// - 異なるキーへの書き込みは互いに独立
/// - 同一キーでは世代の新しい方が勝つ（last-writer-wins）
/// - primary と secondary は別コレクション
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Replace the queue stored under `queue.key`.
    ///
    /// Returns the generation now stored, or `Stale` with the winner if a newer
    /// generation was already present.
    async fn replace(&self, queue: TaskQueue) -> Result<Generation, QueueWriteError>;

    /// Point-in-time snapshot of one queue.
    async fn get(&self, key: &QueueKey) -> Result<Option<Arc<TaskQueue>>, ExternalError>;

    /// Drop a queue that no longer has any candidates. Returns whether it existed.
    async fn remove(&self, key: &QueueKey) -> Result<bool, ExternalError>;

    /// Number of persisted queues of one kind.
    async fn count(&self, kind: QueueKind) -> Result<usize, ExternalError>;
}
