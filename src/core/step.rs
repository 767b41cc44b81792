//! Step domain model

use crate::core::context::Context;
use anyhow::Result;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// A hook run over the context before or after a step
///
/// The context is taken by value and the returned context replaces it; a
/// failing hook leaves the persisted state exactly as it was.
pub type Hook = Arc<dyn Fn(Context) -> Result<Context> + Send + Sync>;

/// What the caller must present for a step
#[derive(Debug, Clone, Serialize)]
pub enum Presentation {
    /// The step collects input through a form
    Form(FormSpec),
    /// The step needs no input and advances on an empty submission
    Auto,
}

/// A form the caller renders to collect step input
#[derive(Debug, Clone, Serialize)]
pub struct FormSpec {
    /// Human-facing form title
    pub title: String,

    /// Fields to collect, in display order
    pub fields: Vec<FormField>,
}

/// A single form field
#[derive(Debug, Clone, Serialize)]
pub struct FormField {
    /// Key the collected value is stored under in the context
    pub name: String,

    /// Human-facing field label
    pub label: String,

    /// Whether a submission without this field is rejected
    pub required: bool,

    /// Context key holding a JSON array of choices for this field
    ///
    /// Lets a pre-execute hook populate the choices dynamically; the
    /// renderer reads the array out of the context snapshot.
    pub options_key: Option<String>,
}

impl FormField {
    /// A required field with no dynamic choices
    pub fn required(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            required: true,
            options_key: None,
        }
    }

    /// An optional field with no dynamic choices
    pub fn optional(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            required: false,
            options_key: None,
        }
    }

    /// Attach a context key the renderer reads choices from
    pub fn with_options_key(mut self, key: impl Into<String>) -> Self {
        self.options_key = Some(key.into());
        self
    }
}

/// A single step in a pipeline
///
/// Steps are stateless: all mutable data lives in the [`Context`]. A step
/// with neither hook is a pass-through.
#[derive(Clone)]
pub struct StepDefinition {
    /// Unique step identifier
    pub id: String,

    /// Human-facing label
    pub label: String,

    /// What the caller presents for this step
    pub presentation: Presentation,

    /// Runs once per presentation, before the step is shown
    pub pre_execute: Option<Hook>,

    /// Runs once per advance, after the step's input is collected
    pub post_execute: Option<Hook>,
}

impl StepDefinition {
    /// Create a form step
    pub fn form(id: impl Into<String>, label: impl Into<String>, form: FormSpec) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            presentation: Presentation::Form(form),
            pre_execute: None,
            post_execute: None,
        }
    }

    /// Create a step that advances without input
    pub fn auto(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            presentation: Presentation::Auto,
            pre_execute: None,
            post_execute: None,
        }
    }

    /// Attach a pre-execute hook
    pub fn with_pre<F>(mut self, hook: F) -> Self
    where
        F: Fn(Context) -> Result<Context> + Send + Sync + 'static,
    {
        self.pre_execute = Some(Arc::new(hook));
        self
    }

    /// Attach a post-execute hook
    pub fn with_post<F>(mut self, hook: F) -> Self
    where
        F: Fn(Context) -> Result<Context> + Send + Sync + 'static,
    {
        self.post_execute = Some(Arc::new(hook));
        self
    }

    /// Names of required form fields, empty for auto steps
    pub fn required_fields(&self) -> Vec<&str> {
        match &self.presentation {
            Presentation::Form(form) => form
                .fields
                .iter()
                .filter(|f| f.required)
                .map(|f| f.name.as_str())
                .collect(),
            Presentation::Auto => Vec::new(),
        }
    }
}

impl fmt::Debug for StepDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinition")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("presentation", &self.presentation)
            .field("pre_execute", &self.pre_execute.as_ref().map(|_| "<hook>"))
            .field("post_execute", &self.post_execute.as_ref().map(|_| "<hook>"))
            .finish()
    }
}

impl FormSpec {
    pub fn new(title: impl Into<String>, fields: Vec<FormField>) -> Self {
        Self {
            title: title.into(),
            fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_fields() {
        let step = StepDefinition::form(
            "select",
            "Select a source",
            FormSpec::new(
                "Select",
                vec![
                    FormField::required("source", "Source"),
                    FormField::optional("note", "Note"),
                ],
            ),
        );

        assert_eq!(step.required_fields(), vec!["source"]);
    }

    #[test]
    fn test_auto_step_has_no_required_fields() {
        let step = StepDefinition::auto("transform", "Transform");
        assert!(step.required_fields().is_empty());
    }

    #[test]
    fn test_hooks_thread_context_by_value() {
        let step = StepDefinition::auto("write", "Write marker")
            .with_pre(|mut ctx| {
                ctx.set("marker", "pre");
                Ok(ctx)
            });

        let out = (step.pre_execute.unwrap())(Context::new()).unwrap();
        assert_eq!(out.get_str("marker"), Some("pre"));
    }
}
