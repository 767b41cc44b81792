//! Built-in pipeline catalog
//!
//! Registers the steps and pipelines the binary ships with. All discovery
//! is explicit registration at process start.

use crate::core::{
    FormField, FormSpec, PipelineDefinition, PipelineRegistry, StepDefinition, StepRegistry,
};
use anyhow::{anyhow, Result};
use serde_json::json;

/// Register the built-in steps and pipelines
pub fn register(steps: &mut StepRegistry, pipelines: &mut PipelineRegistry) -> Result<()> {
    register_demo(steps, pipelines)?;
    register_dataset_import(steps, pipelines)?;
    Ok(())
}

/// Two-step demo: pick a value, then confirm it on the next request
fn register_demo(steps: &mut StepRegistry, pipelines: &mut PipelineRegistry) -> Result<()> {
    steps.register(StepDefinition::form(
        "select",
        "Select a value",
        FormSpec::new(
            "Select",
            vec![FormField::required("choice", "Choice")],
        ),
    ))?;

    steps.register(
        StepDefinition::form(
            "confirm",
            "Confirm the selection",
            FormSpec::new("Confirm", vec![]),
        )
        .with_pre(|mut ctx| {
            let choice = ctx
                .get_str("choice")
                .ok_or_else(|| anyhow!("no choice was selected"))?
                .to_string();
            ctx.set("confirmation", format!("You chose {}", choice));
            Ok(ctx)
        }),
    )?;

    pipelines.register(PipelineDefinition::new(
        "demo",
        "Demo pipeline",
        vec!["select", "confirm"],
    ))?;

    Ok(())
}

/// Three-step import: choose a source, normalize it automatically, review
fn register_dataset_import(
    steps: &mut StepRegistry,
    pipelines: &mut PipelineRegistry,
) -> Result<()> {
    steps.register(
        StepDefinition::form(
            "choose-source",
            "Choose a data source",
            FormSpec::new(
                "Choose source",
                vec![FormField::required("source", "Source file")
                    .with_options_key("available_sources")],
            ),
        )
        .with_pre(|mut ctx| {
            // In a real deployment this would scan an inbox directory.
            ctx.set("available_sources", json!(["accounts.csv", "orders.csv"]));
            Ok(ctx)
        }),
    )?;

    steps.register(StepDefinition::auto("normalize", "Normalize rows").with_post(
        |mut ctx| {
            let source = ctx
                .get_str("source")
                .ok_or_else(|| anyhow!("no source to normalize"))?
                .to_string();
            ctx.set("normalized", true);
            ctx.set("normalized_from", source);
            Ok(ctx)
        },
    ))?;

    steps.register(
        StepDefinition::form(
            "review",
            "Review the import",
            FormSpec::new("Review", vec![FormField::optional("note", "Note")]),
        )
        .with_pre(|mut ctx| {
            let source = ctx.get_str("normalized_from").unwrap_or("?").to_string();
            ctx.set("summary", format!("normalized rows from {}", source));
            Ok(ctx)
        }),
    )?;

    pipelines.register(PipelineDefinition::new(
        "dataset-import",
        "Dataset import",
        vec!["choose-source", "normalize", "review"],
    ))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_registers_cleanly() {
        let mut steps = StepRegistry::new();
        let mut pipelines = PipelineRegistry::new();
        register(&mut steps, &mut pipelines).unwrap();

        assert!(pipelines.resolve("demo").is_some());
        assert!(pipelines.resolve("dataset-import").is_some());
        for pipeline in pipelines.all() {
            for step_id in pipeline.steps() {
                assert!(steps.resolve(step_id).is_some(), "missing step {}", step_id);
            }
        }
    }
}
