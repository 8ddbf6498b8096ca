//! Inventory ports - タスク・distro・ホストの読み取り
//!
//! 正本は外部（取り込みパイプラインとホスト管理）にあり、
//! スケジューラは読むだけです。

use async_trait::async_trait;

use crate::domain::distro::Distro;
use crate::domain::errors::ExternalError;
use crate::domain::host::Host;
use crate::domain::ids::DistroId;
use crate::domain::task::Task;

/// TaskInventory は distro 設定と実行可能タスクを提供
///
/// # 契約
/// - `runnable_tasks`: distro が所有する未割り当てタスク
/// - `alias_tasks`: 他 distro が所有し、この distro を alias に宣言したタスク
/// - 失敗は `ExternalError`（呼び出し側がリトライする）
#[async_trait]
pub trait TaskInventory: Send + Sync {
    async fn list_distros(&self) -> Result<Vec<DistroId>, ExternalError>;

    async fn distro(&self, id: &DistroId) -> Result<Option<Distro>, ExternalError>;

    async fn runnable_tasks(&self, distro: &DistroId) -> Result<Vec<Task>, ExternalError>;

    async fn alias_tasks(&self, distro: &DistroId) -> Result<Vec<Task>, ExternalError>;
}

/// HostInventory lists a distro's hosts with status and timestamps.
#[async_trait]
pub trait HostInventory: Send + Sync {
    async fn hosts(&self, distro: &DistroId) -> Result<Vec<Host>, ExternalError>;
}
