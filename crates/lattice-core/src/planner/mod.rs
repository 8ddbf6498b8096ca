//! Planner - 1 distro のキュー順序を決める戦略
//!
//! # 戦略
//! - **legacy**: priority 降順 → 有効化時刻昇順 → task id 昇順
//! - **tunable**: 重み付きスコア（priority / 待ち時間 / 後続数 / 予想実行時間）
//!
//! # 設計原則
//! - 純粋関数（入力: 候補タスク + 現在時刻、出力: 全順序）
//! - 戦略は distro 設定から 1 サイクルに 1 回だけ解決する（`PlannerKind`）
//! - ランク付けの後に依存関係パスを通し、依存先より前に置かない

mod dependency;
mod legacy;
mod tunable;

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::domain::{ConfigError, PlannerSettings, PlannerVersion, Task};

pub use self::dependency::{DependencyGraph, DependencyOrder};
pub use self::legacy::LegacyPlanner;
pub use self::tunable::TunablePlanner;

/// Planner は候補タスクを全順序に並べる
pub trait Planner: Send + Sync {
    fn version(&self) -> PlannerVersion;

    /// Best first. Ignores dependencies.
    fn rank<'a>(&self, candidates: &'a [Task], now: DateTime<Utc>) -> Vec<&'a Task>;

    /// Rank, then move every task behind its in-queue dependencies.
    fn plan<'a>(&self, candidates: &'a [Task], now: DateTime<Utc>) -> Vec<&'a Task> {
        let ranked = self.rank(candidates, now);
        let graph = DependencyGraph::from_tasks(ranked.iter().copied());
        let order = graph.order(ranked);

        if !order.unresolved.is_empty() {
            warn!(
                planner = %self.version(),
                unresolved = order.unresolved.len(),
                tasks = ?order.unresolved,
                "dependency cycle among queued tasks, appending in rank order"
            );
        }
        order.ordered
    }
}

/// Shared tie-break: priority desc, activation asc, id asc.
///
/// Both planners end with this comparison, so they agree whenever the tunable
/// score cannot tell two tasks apart.
pub(crate) fn tie_break(a: &Task, b: &Task) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.activated_at.cmp(&b.activated_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Planner resolved from a distro's settings.
#[derive(Debug, Clone)]
pub enum PlannerKind {
    Legacy(LegacyPlanner),
    Tunable(TunablePlanner),
}

impl PlannerKind {
    /// Fails fast on an unknown version or invalid weights.
    pub fn from_settings(settings: &PlannerSettings) -> Result<Self, ConfigError> {
        match settings.resolve()? {
            (PlannerVersion::Legacy, _) => Ok(PlannerKind::Legacy(LegacyPlanner)),
            (PlannerVersion::Tunable, weights) => Ok(PlannerKind::Tunable(TunablePlanner::new(
                weights.unwrap_or_default(),
            ))),
        }
    }
}

impl Planner for PlannerKind {
    fn version(&self) -> PlannerVersion {
        match self {
            PlannerKind::Legacy(p) => p.version(),
            PlannerKind::Tunable(p) => p.version(),
        }
    }

    fn rank<'a>(&self, candidates: &'a [Task], now: DateTime<Utc>) -> Vec<&'a Task> {
        match self {
            PlannerKind::Legacy(p) => p.rank(candidates, now),
            PlannerKind::Tunable(p) => p.rank(candidates, now),
        }
    }
}
