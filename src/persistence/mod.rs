//! Persistence layer for pipeline state and the completion log

#[cfg(feature = "sqlite")]
pub mod store;

#[cfg(feature = "sqlite")]
pub use store::SqliteStateStore;

use crate::core::{CompletionEvent, PipelineState};
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

/// State store failure
#[derive(Debug, Error)]
pub enum StoreError {
    #[cfg(feature = "sqlite")]
    #[error("state store backend error: {0}")]
    Backend(#[from] sqlx::Error),

    #[error("failed to encode pipeline state: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("state version conflict: expected {expected}, found {found}")]
    Conflict { expected: u64, found: u64 },
}

/// Storage contract for resumable pipeline state
///
/// One record per pipeline id; a `save` followed by a `load` from the same
/// process observes the saved value. Plain `save` is last-write-wins:
/// concurrent advances of the same pipeline id can silently discard each
/// other. Callers wanting stronger guarantees can use [`compare_and_save`],
/// which the orchestrator deliberately does not.
///
/// [`compare_and_save`]: StateStore::compare_and_save
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the state for a pipeline id, if any
    async fn load(&self, pipeline_id: &str) -> Result<Option<PipelineState>, StoreError>;

    /// Save the state under its pipeline id, overwriting unconditionally
    async fn save(&self, state: &PipelineState) -> Result<(), StoreError>;

    /// Delete the state for a pipeline id; absent state is a no-op
    async fn delete(&self, pipeline_id: &str) -> Result<(), StoreError>;

    /// Save only if the stored version still matches `expected_version`
    ///
    /// `expected_version` of 0 expects no stored record. Fails with
    /// [`StoreError::Conflict`] on mismatch.
    async fn compare_and_save(
        &self,
        state: &PipelineState,
        expected_version: u64,
    ) -> Result<(), StoreError>;
}

/// Write interface of the last-run log consuming completion events
///
/// One entry per pipeline id holding the latest completion; backs the
/// "days since last run" report. Not required for orchestrator correctness.
#[async_trait]
pub trait CompletionLog: Send + Sync {
    /// Record a completion, replacing any previous entry for the pipeline
    async fn record_completion(&self, event: &CompletionEvent) -> Result<(), StoreError>;

    /// Latest completion for a pipeline id, if any
    async fn last_completion(
        &self,
        pipeline_id: &str,
    ) -> Result<Option<CompletionEvent>, StoreError>;

    /// Latest completion per pipeline id, sorted by pipeline id
    async fn last_completions(&self) -> Result<Vec<CompletionEvent>, StoreError>;
}

/// In-memory store (for testing or ephemeral use)
#[derive(Default)]
pub struct MemoryStateStore {
    states: RwLock<HashMap<String, PipelineState>>,
    completions: RwLock<HashMap<String, CompletionEvent>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self, pipeline_id: &str) -> Result<Option<PipelineState>, StoreError> {
        let states = self.states.read().await;
        Ok(states.get(pipeline_id).cloned())
    }

    async fn save(&self, state: &PipelineState) -> Result<(), StoreError> {
        let mut states = self.states.write().await;
        states.insert(state.pipeline_id.clone(), state.clone());
        Ok(())
    }

    async fn delete(&self, pipeline_id: &str) -> Result<(), StoreError> {
        let mut states = self.states.write().await;
        states.remove(pipeline_id);
        Ok(())
    }

    async fn compare_and_save(
        &self,
        state: &PipelineState,
        expected_version: u64,
    ) -> Result<(), StoreError> {
        let mut states = self.states.write().await;
        let found = states.get(&state.pipeline_id).map(|s| s.version).unwrap_or(0);
        if found != expected_version {
            return Err(StoreError::Conflict {
                expected: expected_version,
                found,
            });
        }
        states.insert(state.pipeline_id.clone(), state.clone());
        Ok(())
    }
}

#[async_trait]
impl CompletionLog for MemoryStateStore {
    async fn record_completion(&self, event: &CompletionEvent) -> Result<(), StoreError> {
        let mut completions = self.completions.write().await;
        completions.insert(event.pipeline_id.clone(), event.clone());
        Ok(())
    }

    async fn last_completion(
        &self,
        pipeline_id: &str,
    ) -> Result<Option<CompletionEvent>, StoreError> {
        let completions = self.completions.read().await;
        Ok(completions.get(pipeline_id).cloned())
    }

    async fn last_completions(&self) -> Result<Vec<CompletionEvent>, StoreError> {
        let completions = self.completions.read().await;
        let mut events: Vec<_> = completions.values().cloned().collect();
        events.sort_by(|a, b| a.pipeline_id.cmp(&b.pipeline_id));
        Ok(events)
    }
}
