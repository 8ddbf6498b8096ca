//! Recording sinks - 送られた要求・決定をメモリに溜める
//!
//! CLI はサイクル後に決定を取り出して出力し、テストは中身を検証する。

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{AllocationDecision, CreationIntent, ExternalError, TerminationIntent};
use crate::ports::{DecisionSink, ProvisioningSink};

#[derive(Default)]
pub struct RecordingProvisioningSink {
    created: Mutex<Vec<CreationIntent>>,
    terminated: Mutex<Vec<TerminationIntent>>,
}

impl RecordingProvisioningSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn created(&self) -> Vec<CreationIntent> {
        self.created.lock().await.clone()
    }

    pub async fn terminated(&self) -> Vec<TerminationIntent> {
        self.terminated.lock().await.clone()
    }
}

#[async_trait]
impl ProvisioningSink for RecordingProvisioningSink {
    async fn create_hosts(&self, intent: &CreationIntent) -> Result<(), ExternalError> {
        self.created.lock().await.push(intent.clone());
        Ok(())
    }

    async fn terminate_host(&self, intent: &TerminationIntent) -> Result<(), ExternalError> {
        self.terminated.lock().await.push(intent.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingDecisionSink {
    decisions: Mutex<Vec<AllocationDecision>>,
}

impl RecordingDecisionSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn decisions(&self) -> Vec<AllocationDecision> {
        self.decisions.lock().await.clone()
    }

    /// Take everything recorded so far, leaving the sink empty.
    pub async fn drain(&self) -> Vec<AllocationDecision> {
        std::mem::take(&mut *self.decisions.lock().await)
    }
}

#[async_trait]
impl DecisionSink for RecordingDecisionSink {
    async fn record(&self, decision: &AllocationDecision) -> Result<(), ExternalError> {
        self.decisions.lock().await.push(decision.clone());
        Ok(())
    }
}
