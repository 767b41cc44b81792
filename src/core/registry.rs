//! Step and pipeline registries
//!
//! Immutable lookup tables populated by explicit registration at process
//! start. No runtime registration, no reflection-based discovery.

use crate::core::{pipeline::PipelineDefinition, step::StepDefinition};
use anyhow::{bail, Result};
use std::collections::HashMap;

/// Lookup of step implementations by id
#[derive(Debug, Default)]
pub struct StepRegistry {
    steps: HashMap<String, StepDefinition>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a step; duplicate ids are a startup error
    pub fn register(&mut self, step: StepDefinition) -> Result<()> {
        if self.steps.contains_key(&step.id) {
            bail!("step '{}' is already registered", step.id);
        }
        self.steps.insert(step.id.clone(), step);
        Ok(())
    }

    /// Look up a step by id
    pub fn resolve(&self, id: &str) -> Option<&StepDefinition> {
        self.steps.get(id)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Lookup of pipeline definitions by id
#[derive(Debug, Default)]
pub struct PipelineRegistry {
    pipelines: HashMap<String, PipelineDefinition>,
}

impl PipelineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pipeline; duplicate ids are a startup error
    pub fn register(&mut self, pipeline: PipelineDefinition) -> Result<()> {
        if self.pipelines.contains_key(&pipeline.id) {
            bail!("pipeline '{}' is already registered", pipeline.id);
        }
        self.pipelines.insert(pipeline.id.clone(), pipeline);
        Ok(())
    }

    /// Look up a pipeline by id
    pub fn resolve(&self, id: &str) -> Option<&PipelineDefinition> {
        self.pipelines.get(id)
    }

    /// Registered pipelines, sorted by id for stable listings
    pub fn all(&self) -> Vec<&PipelineDefinition> {
        let mut defs: Vec<_> = self.pipelines.values().collect();
        defs.sort_by(|a, b| a.id.cmp(&b.id));
        defs
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}
