//! conveyor - a resumable, form-driven pipeline orchestrator
//!
//! A pipeline is a named, ordered sequence of steps. Each step can collect
//! input through a form, run transformation hooks over a shared context,
//! and resume exactly where it left off on the next request, since all
//! cross-request state round-trips through a persistent state store.

pub mod catalog;
pub mod cli;
pub mod core;
pub mod execution;
pub mod gateway;
pub mod persistence;

// Re-export commonly used types
pub use crate::core::{
    CompletionEvent, Context, FormField, FormSpec, PipelineDefinition, PipelineRegistry,
    PipelineState, Presentation, StepDefinition, StepRegistry,
};
pub use execution::{CompletionNotifier, LastRunRecorder, Orchestrator, PipelineError, StepResult};
pub use gateway::{
    Account, Action, AllowAll, Gateway, GatewayRequest, GatewayResponse, PermissionGate,
    StaticPermissions,
};
pub use persistence::{CompletionLog, MemoryStateStore, StateStore, StoreError};

#[cfg(feature = "sqlite")]
pub use persistence::SqliteStateStore;
