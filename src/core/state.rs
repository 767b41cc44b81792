//! Persisted execution state models

use crate::core::context::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The persisted, resumable state of one pipeline run
///
/// One record per pipeline id. "Not started" is the absence of a record;
/// completion deletes the record so the next run starts a fresh instance.
/// All cross-request state round-trips through this struct, since each
/// request may be served by a different process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    /// Pipeline this state belongs to
    pub pipeline_id: String,

    /// Index of the current step in the resolved definition
    pub step_index: usize,

    /// Whether the current step's pre-execute hook has already run
    ///
    /// Pre-execute runs once per step presentation, not once per request:
    /// a page reload must not re-run a side-effecting pre hook.
    pub presented: bool,

    /// Write counter, bumped on every save; used by compare_and_save
    pub version: u64,

    /// Data accumulated by the steps so far
    pub context: Context,

    /// When this run was first created
    pub started_at: DateTime<Utc>,

    /// When this state was last written
    pub updated_at: DateTime<Utc>,
}

impl PipelineState {
    /// Initial state for a pipeline's first run
    pub fn new(pipeline_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            pipeline_id: pipeline_id.into(),
            step_index: 0,
            presented: false,
            version: 0,
            context: Context::new(),
            started_at: now,
            updated_at: now,
        }
    }

    /// Mark the current step as presented (pre-execute done)
    pub fn mark_presented(&mut self) {
        self.presented = true;
        self.touch();
    }

    /// Advance to the next step after a successful post-execute
    pub fn advance(&mut self) {
        self.step_index += 1;
        self.presented = false;
        self.touch();
    }

    fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }
}

/// Emitted exactly once when a pipeline's step index passes the last step
///
/// Not persisted by the core; observers persist what they need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionEvent {
    /// Pipeline that completed
    pub pipeline_id: String,

    /// Whether the run finished successfully
    pub success: bool,

    /// When the run completed
    pub timestamp: DateTime<Utc>,
}

impl CompletionEvent {
    pub fn success(pipeline_id: impl Into<String>) -> Self {
        Self {
            pipeline_id: pipeline_id.into(),
            success: true,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_starts_at_zero() {
        let state = PipelineState::new("demo");
        assert_eq!(state.step_index, 0);
        assert!(!state.presented);
        assert_eq!(state.version, 0);
        assert!(state.context.is_empty());
    }

    #[test]
    fn test_advance_clears_presented_and_bumps_version() {
        let mut state = PipelineState::new("demo");
        state.mark_presented();
        assert!(state.presented);
        assert_eq!(state.version, 1);

        state.advance();
        assert_eq!(state.step_index, 1);
        assert!(!state.presented);
        assert_eq!(state.version, 2);
    }

    #[test]
    fn test_state_round_trips_through_json() {
        let mut state = PipelineState::new("demo");
        state.context.set("choice", "B");
        state.advance();

        let encoded = serde_json::to_string(&state).unwrap();
        let decoded: PipelineState = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, state);
    }
}
