//! Sink ports - 割り当て結果の送り先
//!
//! - ProvisioningSink: 外部のプロビジョニングワーカーへ作成・終了要求を渡す
//! - DecisionSink: 監視向けの決定フィード
//!
//! どちらも at-least-once を想定（冪等性は受け手の責務）。

use async_trait::async_trait;

use crate::domain::allocation::{AllocationDecision, CreationIntent, TerminationIntent};
use crate::domain::errors::ExternalError;

#[async_trait]
pub trait ProvisioningSink: Send + Sync {
    async fn create_hosts(&self, intent: &CreationIntent) -> Result<(), ExternalError>;

    async fn terminate_host(&self, intent: &TerminationIntent) -> Result<(), ExternalError>;
}

/// DecisionSink は 1 サイクル 1 distro ごとの決定を記録
#[async_trait]
pub trait DecisionSink: Send + Sync {
    async fn record(&self, decision: &AllocationDecision) -> Result<(), ExternalError>;
}
