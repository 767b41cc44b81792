//! Test fixtures shared across integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use conveyor::{
    FormField, FormSpec, MemoryStateStore, Orchestrator, PipelineDefinition, PipelineRegistry,
    PipelineState, StateStore, StepDefinition, StepRegistry, StoreError,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Build input as the gateway would collect it from a form
pub fn input(pairs: &[(&str, &str)]) -> HashMap<String, Value> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), json!(value)))
        .collect()
}

/// The two-step demo: `select` collects a choice, `confirm` surfaces it
pub fn demo_registries() -> (Arc<StepRegistry>, Arc<PipelineRegistry>) {
    let mut steps = StepRegistry::new();
    steps
        .register(StepDefinition::form(
            "select",
            "Select a value",
            FormSpec::new("Select", vec![FormField::required("choice", "Choice")]),
        ))
        .unwrap();
    steps
        .register(
            StepDefinition::form("confirm", "Confirm", FormSpec::new("Confirm", vec![]))
                .with_pre(|mut ctx| {
                    let choice = ctx
                        .get_str("choice")
                        .ok_or_else(|| anyhow::anyhow!("no choice was selected"))?
                        .to_string();
                    ctx.set("confirmation", format!("You chose {}", choice));
                    Ok(ctx)
                }),
        )
        .unwrap();

    let mut pipelines = PipelineRegistry::new();
    pipelines
        .register(PipelineDefinition::new(
            "demo",
            "Demo",
            vec!["select", "confirm"],
        ))
        .unwrap();

    (Arc::new(steps), Arc::new(pipelines))
}

/// Three pass-through form steps recording their visit order in the context
pub fn letters_registries() -> (Arc<StepRegistry>, Arc<PipelineRegistry>) {
    let mut steps = StepRegistry::new();
    for id in ["a", "b", "c"] {
        steps
            .register(
                StepDefinition::form(id, id, FormSpec::new(id, vec![])).with_post(move |mut ctx| {
                    let mut visited = ctx
                        .get("visited")
                        .and_then(Value::as_array)
                        .cloned()
                        .unwrap_or_default();
                    visited.push(json!(id));
                    ctx.set("visited", visited);
                    Ok(ctx)
                }),
            )
            .unwrap();
    }

    let mut pipelines = PipelineRegistry::new();
    pipelines
        .register(PipelineDefinition::new(
            "letters",
            "Letters",
            vec!["a", "b", "c"],
        ))
        .unwrap();

    (Arc::new(steps), Arc::new(pipelines))
}

/// Two steps where the second one's post-execute always fails
pub fn flaky_registries() -> (Arc<StepRegistry>, Arc<PipelineRegistry>) {
    let mut steps = StepRegistry::new();
    steps
        .register(StepDefinition::form(
            "first",
            "First",
            FormSpec::new("First", vec![]),
        ))
        .unwrap();
    steps
        .register(
            StepDefinition::form("explode", "Explode", FormSpec::new("Explode", vec![]))
                .with_post(|_ctx| anyhow::bail!("downstream dependency unavailable")),
        )
        .unwrap();

    let mut pipelines = PipelineRegistry::new();
    pipelines
        .register(PipelineDefinition::new(
            "flaky",
            "Flaky",
            vec!["first", "explode"],
        ))
        .unwrap();

    (Arc::new(steps), Arc::new(pipelines))
}

/// Orchestrator over an in-memory store
pub fn orchestrator(
    steps: Arc<StepRegistry>,
    pipelines: Arc<PipelineRegistry>,
) -> (Orchestrator, Arc<MemoryStateStore>) {
    let store = Arc::new(MemoryStateStore::new());
    let orchestrator = Orchestrator::new(steps, pipelines, store.clone()).unwrap();
    (orchestrator, store)
}

/// State store wrapper counting writes, for asserting "no store mutation"
pub struct RecordingStore {
    inner: MemoryStateStore,
    saves: AtomicUsize,
    deletes: AtomicUsize,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStateStore::new(),
            saves: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }

    pub fn writes(&self) -> usize {
        self.saves.load(Ordering::SeqCst) + self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateStore for RecordingStore {
    async fn load(&self, pipeline_id: &str) -> Result<Option<PipelineState>, StoreError> {
        self.inner.load(pipeline_id).await
    }

    async fn save(&self, state: &PipelineState) -> Result<(), StoreError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(state).await
    }

    async fn delete(&self, pipeline_id: &str) -> Result<(), StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(pipeline_id).await
    }

    async fn compare_and_save(
        &self,
        state: &PipelineState,
        expected_version: u64,
    ) -> Result<(), StoreError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.compare_and_save(state, expected_version).await
    }
}
