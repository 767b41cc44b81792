//! Completion notification
//!
//! One canonical observer contract for pipeline completion, and the one
//! consumer the binary ships: a recorder writing the last-run log behind
//! the "days since last run" report.

use crate::core::CompletionEvent;
use crate::persistence::CompletionLog;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Observer invoked once when a pipeline reaches its terminal step
#[async_trait]
pub trait CompletionNotifier: Send + Sync {
    async fn pipeline_completed(&self, event: &CompletionEvent) -> Result<()>;
}

/// Records the latest completion per pipeline id into a [`CompletionLog`]
pub struct LastRunRecorder {
    log: Arc<dyn CompletionLog>,
}

impl LastRunRecorder {
    pub fn new(log: Arc<dyn CompletionLog>) -> Self {
        Self { log }
    }
}

#[async_trait]
impl CompletionNotifier for LastRunRecorder {
    async fn pipeline_completed(&self, event: &CompletionEvent) -> Result<()> {
        self.log.record_completion(event).await?;
        Ok(())
    }
}
