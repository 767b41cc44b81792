//! Execution gateway - the request/response adapter
//!
//! Translates one inbound request into exactly one orchestrator call and
//! the result into an HTTP-like response: a form to render, a redirect for
//! the client to follow, a completion view, or an error with a status
//! code. The permission check runs before the orchestrator is invoked;
//! denial short-circuits with no state mutation.

use crate::core::{CompletionEvent, Context, FormSpec};
use crate::execution::{Orchestrator, PipelineError, StepResult};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// The caller on whose behalf a request runs
#[derive(Debug, Clone)]
pub struct Account {
    pub name: String,
}

impl Account {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// What a request wants to do with a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Execute,
    Reset,
}

impl Action {
    /// Capability string gating this action, e.g. `execute demo pipeline`
    pub fn capability(&self, pipeline_id: &str) -> String {
        match self {
            Action::Execute => format!("execute {} pipeline", pipeline_id),
            Action::Reset => format!("reset {} pipeline", pipeline_id),
        }
    }
}

/// External capability check; the gateway only calls it, roles live elsewhere
pub trait PermissionGate: Send + Sync {
    fn allows(&self, account: &Account, action: Action, pipeline_id: &str) -> bool;
}

/// Grants everything; for single-operator deployments and tests
pub struct AllowAll;

impl PermissionGate for AllowAll {
    fn allows(&self, _account: &Account, _action: Action, _pipeline_id: &str) -> bool {
        true
    }
}

/// Fixed account-to-capability grants populated at startup
#[derive(Debug, Default)]
pub struct StaticPermissions {
    grants: HashMap<String, HashSet<String>>,
}

impl StaticPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant an account one capability string
    pub fn grant(&mut self, account: impl Into<String>, capability: impl Into<String>) {
        self.grants
            .entry(account.into())
            .or_default()
            .insert(capability.into());
    }
}

impl PermissionGate for StaticPermissions {
    fn allows(&self, account: &Account, action: Action, pipeline_id: &str) -> bool {
        self.grants
            .get(&account.name)
            .is_some_and(|caps| caps.contains(&action.capability(pipeline_id)))
    }
}

/// One inbound request
#[derive(Debug, Clone)]
pub enum GatewayRequest {
    /// Present the current step (`input: None`) or apply collected input
    Execute {
        pipeline_id: String,
        input: Option<HashMap<String, Value>>,
    },
    /// Discard persisted state
    Reset { pipeline_id: String },
}

impl GatewayRequest {
    fn action(&self) -> Action {
        match self {
            GatewayRequest::Execute { .. } => Action::Execute,
            GatewayRequest::Reset { .. } => Action::Reset,
        }
    }

    pub fn pipeline_id(&self) -> &str {
        match self {
            GatewayRequest::Execute { pipeline_id, .. } => pipeline_id,
            GatewayRequest::Reset { pipeline_id } => pipeline_id,
        }
    }
}

/// One outbound response
#[derive(Debug, Clone)]
pub enum GatewayResponse {
    /// Render this form and collect input
    Form {
        pipeline_id: String,
        step_id: String,
        step_label: String,
        step_index: usize,
        total_steps: usize,
        form: FormSpec,
        /// Context snapshot for rendering dynamic choices
        context: Context,
    },
    /// Issue this follow-up request
    Redirect { to: GatewayRequest },
    /// The pipeline completed
    Done { event: CompletionEvent },
    /// The reset was applied
    ResetDone { pipeline_id: String },
    /// HTTP-like failure
    Error { status: u16, message: String },
}

/// Turns requests into orchestrator calls behind a permission check
pub struct Gateway {
    orchestrator: Arc<Orchestrator>,
    permissions: Arc<dyn PermissionGate>,
}

impl Gateway {
    pub fn new(orchestrator: Arc<Orchestrator>, permissions: Arc<dyn PermissionGate>) -> Self {
        Self {
            orchestrator,
            permissions,
        }
    }

    /// Handle one request with exactly one orchestrator call
    pub async fn handle(&self, account: &Account, request: GatewayRequest) -> GatewayResponse {
        let request_id = Uuid::new_v4();
        let action = request.action();
        let pipeline_id = request.pipeline_id().to_string();

        debug!(
            %request_id,
            account = %account.name,
            ?action,
            pipeline_id = %pipeline_id,
            "handling gateway request"
        );

        if !self.permissions.allows(account, action, &pipeline_id) {
            info!(
                %request_id,
                account = %account.name,
                pipeline_id = %pipeline_id,
                "permission denied"
            );
            return GatewayResponse::Error {
                status: 403,
                message: format!(
                    "account '{}' lacks '{}'",
                    account.name,
                    action.capability(&pipeline_id)
                ),
            };
        }

        match request {
            GatewayRequest::Execute {
                pipeline_id,
                input: None,
            } => match self.orchestrator.run(&pipeline_id).await {
                Ok(result) => Self::step_response(result),
                Err(error) => Self::error_response(error),
            },
            GatewayRequest::Execute {
                pipeline_id,
                input: Some(input),
            } => match self.orchestrator.submit(&pipeline_id, input).await {
                Ok(result) => Self::step_response(result),
                Err(error) => Self::error_response(error),
            },
            GatewayRequest::Reset { pipeline_id } => {
                match self.orchestrator.reset(&pipeline_id).await {
                    Ok(()) => GatewayResponse::ResetDone { pipeline_id },
                    Err(error) => Self::error_response(error),
                }
            }
        }
    }

    fn step_response(result: StepResult) -> GatewayResponse {
        match result {
            StepResult::AwaitingInput {
                pipeline_id,
                step_id,
                step_label,
                step_index,
                total_steps,
                form,
                context,
            } => GatewayResponse::Form {
                pipeline_id,
                step_id,
                step_label,
                step_index,
                total_steps,
                form,
                context,
            },
            // An automatic step advances on an empty submission.
            StepResult::Continue { pipeline_id, .. } => GatewayResponse::Redirect {
                to: GatewayRequest::Execute {
                    pipeline_id,
                    input: Some(HashMap::new()),
                },
            },
            // After an advance, re-request to present the next step.
            StepResult::Advanced { pipeline_id, .. } => GatewayResponse::Redirect {
                to: GatewayRequest::Execute {
                    pipeline_id,
                    input: None,
                },
            },
            StepResult::Completed { event } => GatewayResponse::Done { event },
        }
    }

    fn error_response(error: PipelineError) -> GatewayResponse {
        let status = match &error {
            PipelineError::UnknownPipeline(_) | PipelineError::UnknownStep(_) => 404,
            PipelineError::NoPendingStep(_) => 409,
            PipelineError::MissingInput { .. } => 422,
            PipelineError::StepExecution { .. } | PipelineError::Store(_) => 500,
        };

        GatewayResponse::Error {
            status,
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_strings() {
        assert_eq!(Action::Execute.capability("demo"), "execute demo pipeline");
        assert_eq!(Action::Reset.capability("demo"), "reset demo pipeline");
    }

    #[test]
    fn test_static_permissions() {
        let mut perms = StaticPermissions::new();
        perms.grant("alex", "execute demo pipeline");

        let alex = Account::new("alex");
        assert!(perms.allows(&alex, Action::Execute, "demo"));
        assert!(!perms.allows(&alex, Action::Reset, "demo"));
        assert!(!perms.allows(&Account::new("sam"), Action::Execute, "demo"));
    }
}
