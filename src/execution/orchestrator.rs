//! The orchestrator - advances a pipeline one step per request
//!
//! Each `run`/`submit`/`reset` call is one complete, synchronous unit of
//! work bounded by one inbound request. The suspend point is the response
//! boundary: after returning a form, resumption relies on a future,
//! unrelated request reading the persisted state back, possibly in a
//! different process.

use crate::core::{
    CompletionEvent, Context, PipelineRegistry, PipelineState, Presentation, StepRegistry,
};
use crate::execution::notifier::CompletionNotifier;
use crate::persistence::{StateStore, StoreError};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Pipeline-level failure surfaced to the caller
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unknown pipeline '{0}'")]
    UnknownPipeline(String),

    #[error("unknown step '{0}'")]
    UnknownStep(String),

    #[error("step '{step_id}' failed: {reason}")]
    StepExecution {
        step_id: String,
        reason: anyhow::Error,
    },

    #[error("pipeline '{0}' has no step awaiting input")]
    NoPendingStep(String),

    #[error("step '{step_id}' requires input field '{field}'")]
    MissingInput { step_id: String, field: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What the caller must do next after an orchestrator call
#[derive(Debug, Clone)]
pub enum StepResult {
    /// The current step collects input; present the form and wait
    AwaitingInput {
        pipeline_id: String,
        step_id: String,
        step_label: String,
        step_index: usize,
        total_steps: usize,
        form: crate::core::FormSpec,
        /// Context snapshot after pre-execute, for rendering dynamic choices
        context: Context,
    },
    /// The current step needs no input; submit an empty input set to advance
    Continue {
        pipeline_id: String,
        step_id: String,
        step_index: usize,
    },
    /// The step advanced; run again to present the next step
    Advanced {
        pipeline_id: String,
        next_step_id: String,
        step_index: usize,
    },
    /// The pipeline passed its last step; persisted state is cleared
    Completed { event: CompletionEvent },
}

/// The core state machine
///
/// Holds its collaborators by explicit injection; no ambient globals. It
/// keeps no in-memory state across calls beyond them.
pub struct Orchestrator {
    steps: Arc<StepRegistry>,
    pipelines: Arc<PipelineRegistry>,
    store: Arc<dyn StateStore>,
    notifiers: Vec<Arc<dyn CompletionNotifier>>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("notifiers", &self.notifiers.len())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Create an orchestrator, validating every registered pipeline
    ///
    /// Fails fast at startup if a pipeline is empty or references a step
    /// id that is not registered.
    pub fn new(
        steps: Arc<StepRegistry>,
        pipelines: Arc<PipelineRegistry>,
        store: Arc<dyn StateStore>,
    ) -> anyhow::Result<Self> {
        for pipeline in pipelines.all() {
            if pipeline.is_empty() {
                anyhow::bail!("pipeline '{}' has no steps", pipeline.id);
            }
            for step_id in pipeline.steps() {
                if steps.resolve(step_id).is_none() {
                    anyhow::bail!(
                        "pipeline '{}' references unregistered step '{}'",
                        pipeline.id,
                        step_id
                    );
                }
            }
        }

        Ok(Self {
            steps,
            pipelines,
            store,
            notifiers: Vec::new(),
        })
    }

    /// Attach a completion notifier
    pub fn with_notifier(mut self, notifier: Arc<dyn CompletionNotifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    /// Present the current step of a pipeline, creating state on first run
    ///
    /// Runs `pre_execute` once per step presentation: a repeated `run` for
    /// the same step index (a page reload) returns the same result without
    /// re-running the hook. Never advances the step index.
    pub async fn run(&self, pipeline_id: &str) -> Result<StepResult, PipelineError> {
        let definition = self
            .pipelines
            .resolve(pipeline_id)
            .ok_or_else(|| PipelineError::UnknownPipeline(pipeline_id.to_string()))?;

        let mut state = match self.store.load(pipeline_id).await? {
            Some(state) if state.step_index >= definition.len() => {
                // The persisted index no longer fits the live definition
                // (steps were removed in a redeploy). The state is stale.
                warn!(
                    pipeline_id,
                    step_index = state.step_index,
                    steps = definition.len(),
                    "discarding stale pipeline state"
                );
                self.store.delete(pipeline_id).await?;
                PipelineState::new(pipeline_id)
            }
            Some(state) => state,
            None => {
                info!(pipeline_id, "starting pipeline");
                PipelineState::new(pipeline_id)
            }
        };

        let step_id = definition
            .step_at(state.step_index)
            .ok_or_else(|| PipelineError::UnknownPipeline(pipeline_id.to_string()))?
            .to_string();
        let step = self
            .steps
            .resolve(&step_id)
            .ok_or_else(|| PipelineError::UnknownStep(step_id.clone()))?;

        if !state.presented {
            let mut context = state.context.clone();
            if let Some(pre) = &step.pre_execute {
                debug!(pipeline_id, step_id = %step_id, "running pre-execute");
                context = pre(context).map_err(|reason| PipelineError::StepExecution {
                    step_id: step_id.clone(),
                    reason,
                })?;
            }
            state.context = context;
            state.mark_presented();
            self.store.save(&state).await?;
        }

        match &step.presentation {
            Presentation::Form(form) => Ok(StepResult::AwaitingInput {
                pipeline_id: pipeline_id.to_string(),
                step_id: step.id.clone(),
                step_label: step.label.clone(),
                step_index: state.step_index,
                total_steps: definition.len(),
                form: form.clone(),
                context: state.context.clone(),
            }),
            Presentation::Auto => Ok(StepResult::Continue {
                pipeline_id: pipeline_id.to_string(),
                step_id: step.id.clone(),
                step_index: state.step_index,
            }),
        }
    }

    /// Apply collected input to the current step and advance
    ///
    /// Runs `post_execute` once per advance. On hook failure the persisted
    /// state is left unchanged, so the same step can be retried. Past the
    /// last step the state is cleared and a completion event is emitted,
    /// so a subsequent `run` starts a fresh instance.
    pub async fn submit(
        &self,
        pipeline_id: &str,
        input: HashMap<String, Value>,
    ) -> Result<StepResult, PipelineError> {
        let definition = self
            .pipelines
            .resolve(pipeline_id)
            .ok_or_else(|| PipelineError::UnknownPipeline(pipeline_id.to_string()))?;

        let mut state = self
            .store
            .load(pipeline_id)
            .await?
            .ok_or_else(|| PipelineError::NoPendingStep(pipeline_id.to_string()))?;

        // A step that was never presented has not run its pre-execute;
        // accepting input for it would skip the hook.
        if !state.presented || state.step_index >= definition.len() {
            return Err(PipelineError::NoPendingStep(pipeline_id.to_string()));
        }

        let step_id = definition
            .step_at(state.step_index)
            .ok_or_else(|| PipelineError::NoPendingStep(pipeline_id.to_string()))?
            .to_string();
        let step = self
            .steps
            .resolve(&step_id)
            .ok_or_else(|| PipelineError::UnknownStep(step_id.clone()))?;

        for field in step.required_fields() {
            if !input.contains_key(field) {
                return Err(PipelineError::MissingInput {
                    step_id: step_id.clone(),
                    field: field.to_string(),
                });
            }
        }

        let mut context = state.context.clone();
        context.merge(input);
        if let Some(post) = &step.post_execute {
            debug!(pipeline_id, step_id = %step_id, "running post-execute");
            context = post(context).map_err(|reason| PipelineError::StepExecution {
                step_id: step_id.clone(),
                reason,
            })?;
        }

        state.context = context;
        state.advance();

        if state.step_index >= definition.len() {
            // Terminal: clear state first so a failing observer cannot
            // leave a completed pipeline parked.
            self.store.delete(pipeline_id).await?;
            let event = CompletionEvent::success(pipeline_id);
            info!(pipeline_id, "pipeline completed");
            self.notify(&event).await;
            Ok(StepResult::Completed { event })
        } else {
            self.store.save(&state).await?;
            let next_step_id = definition
                .step_at(state.step_index)
                .unwrap_or(&step_id)
                .to_string();
            info!(pipeline_id, step_id = %step_id, next = %next_step_id, "step advanced");
            Ok(StepResult::Advanced {
                pipeline_id: pipeline_id.to_string(),
                next_step_id,
                step_index: state.step_index,
            })
        }
    }

    /// Return a pipeline to the not-started condition
    ///
    /// Idempotent: resetting a pipeline with no existing state is a no-op.
    pub async fn reset(&self, pipeline_id: &str) -> Result<(), PipelineError> {
        if self.pipelines.resolve(pipeline_id).is_none() {
            return Err(PipelineError::UnknownPipeline(pipeline_id.to_string()));
        }

        self.store.delete(pipeline_id).await?;
        info!(pipeline_id, "pipeline reset");
        Ok(())
    }

    /// Emit a completion event to all notifiers
    ///
    /// Completion is already committed when notifiers run; a failing
    /// notifier is logged and never fails the request.
    async fn notify(&self, event: &CompletionEvent) {
        for notifier in &self.notifiers {
            if let Err(error) = notifier.pipeline_completed(event).await {
                warn!(
                    pipeline_id = %event.pipeline_id,
                    %error,
                    "completion notifier failed"
                );
            }
        }
    }
}
