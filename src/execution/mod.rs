//! Pipeline execution

pub mod notifier;
pub mod orchestrator;

pub use notifier::{CompletionNotifier, LastRunRecorder};
pub use orchestrator::{Orchestrator, PipelineError, StepResult};
