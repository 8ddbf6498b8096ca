//! InMemoryQueueStore - 開発用・テスト用のキューストア
//!
//! # 実装詳細
//! - primary と secondary を別々の HashMap（別コレクション）で管理
//! - 値は `Arc<TaskQueue>`：置き換えはポインタの差し替えだけ
//! - 読み手は Arc を clone して取り出すので、書き込み途中の状態を見ない

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::{DistroId, ExternalError, Generation, QueueKey, QueueKind, TaskQueue};
use crate::ports::{QueueStore, QueueWriteError};

type Collection = RwLock<HashMap<DistroId, Arc<TaskQueue>>>;

#[derive(Default)]
pub struct InMemoryQueueStore {
    primary: Collection,
    secondary: Collection,
}

impl InMemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn collection(&self, kind: QueueKind) -> &Collection {
        match kind {
            QueueKind::Primary => &self.primary,
            QueueKind::Secondary => &self.secondary,
        }
    }
}

#[async_trait]
impl QueueStore for InMemoryQueueStore {
    async fn replace(&self, queue: TaskQueue) -> Result<Generation, QueueWriteError> {
        let key = queue.key.clone();
        let mut guard = self.collection(key.kind()).write().await;

        // 比較と差し替えは同じロック区間で行う
        if let Some(stored) = guard.get(key.distro())
            && stored.generation.is_newer_than(&queue.generation)
        {
            return Err(QueueWriteError::Stale {
                attempted: queue.generation,
                winning: stored.generation.clone(),
            });
        }

        let generation = queue.generation.clone();
        debug!(key = %key, generation = %generation, len = queue.len(), "queue replaced");
        guard.insert(key.distro().clone(), Arc::new(queue));
        Ok(generation)
    }

    async fn get(&self, key: &QueueKey) -> Result<Option<Arc<TaskQueue>>, ExternalError> {
        let guard = self.collection(key.kind()).read().await;
        Ok(guard.get(key.distro()).cloned())
    }

    async fn remove(&self, key: &QueueKey) -> Result<bool, ExternalError> {
        let mut guard = self.collection(key.kind()).write().await;
        Ok(guard.remove(key.distro()).is_some())
    }

    async fn count(&self, kind: QueueKind) -> Result<usize, ExternalError> {
        Ok(self.collection(kind).read().await.len())
    }
}
