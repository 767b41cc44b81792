//! CLI output formatting

use crate::core::{CompletionEvent, PipelineDefinition, PipelineState};
use crate::gateway::GatewayResponse;
use chrono::{DateTime, Utc};
use console::Emoji;
use serde_json::Value;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static FORM: Emoji<'_, '_> = Emoji("📝 ", "> ");
pub static RESET: Emoji<'_, '_> = Emoji("🔄 ", "~ ");

/// Render a gateway response for the terminal
pub fn render_response(response: &GatewayResponse) -> String {
    match response {
        GatewayResponse::Form {
            pipeline_id,
            step_label,
            step_index,
            total_steps,
            form,
            context,
            ..
        } => {
            let mut out = format!(
                "{} {} — step {}/{}: {}\n",
                FORM,
                style(pipeline_id).bold(),
                step_index + 1,
                total_steps,
                style(step_label).cyan()
            );

            if let Some(summary) = context.get_str("summary") {
                out.push_str(&format!("   {}\n", style(summary).dim()));
            }
            if let Some(confirmation) = context.get_str("confirmation") {
                out.push_str(&format!("   {}\n", style(confirmation).dim()));
            }

            for field in &form.fields {
                let marker = if field.required { "*" } else { " " };
                out.push_str(&format!("   {}{} ({})", marker, field.label, field.name));

                if let Some(options) = field
                    .options_key
                    .as_deref()
                    .and_then(|key| context.get(key))
                    .and_then(Value::as_array)
                {
                    let choices: Vec<&str> =
                        options.iter().filter_map(Value::as_str).collect();
                    out.push_str(&format!(" [{}]", choices.join(", ")));
                }
                out.push('\n');
            }

            if form.fields.is_empty() {
                out.push_str("   (no input needed; submit to continue)\n");
            }
            out.push_str(&format!(
                "   {} conveyor submit {} key=value...",
                style("next:").dim(),
                pipeline_id
            ));
            out
        }
        GatewayResponse::Redirect { to } => {
            format!("{} continuing {}", INFO, to.pipeline_id())
        }
        GatewayResponse::Done { event } => format!(
            "{} {} completed at {}",
            CHECK,
            style(&event.pipeline_id).bold(),
            event.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        GatewayResponse::ResetDone { pipeline_id } => {
            format!("{} {} reset", RESET, style(pipeline_id).bold())
        }
        GatewayResponse::Error { status, message } => format!(
            "{} {} {}",
            CROSS,
            style(format!("[{}]", status)).red(),
            message
        ),
    }
}

/// Render one pipeline's listing line
pub fn format_pipeline_line(
    definition: &PipelineDefinition,
    state: Option<&PipelineState>,
) -> String {
    let position = match state {
        Some(state) => style(format!(
            "at step {}/{}",
            state.step_index + 1,
            definition.len()
        ))
        .yellow()
        .to_string(),
        None => style("not started").dim().to_string(),
    };

    format!(
        "{} {} ({} steps) — {}",
        INFO,
        style(&definition.id).bold(),
        definition.len(),
        position
    )
}

/// Render one last-run report line
pub fn format_last_run(event: &CompletionEvent, now: DateTime<Utc>) -> String {
    let days = (now - event.timestamp).num_days();
    let ago = match days {
        0 => "today".to_string(),
        1 => "1 day ago".to_string(),
        n => format!("{} days ago", n),
    };

    let icon = if event.success { CHECK } else { CROSS };
    format!("{} {} — last run {}", icon, style(&event.pipeline_id).bold(), ago)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_format_last_run_days() {
        let now = Utc::now();
        let mut event = CompletionEvent::success("demo");

        event.timestamp = now;
        assert!(format_last_run(&event, now).contains("today"));

        event.timestamp = now - Duration::days(1);
        assert!(format_last_run(&event, now).contains("1 day ago"));

        event.timestamp = now - Duration::days(12);
        assert!(format_last_run(&event, now).contains("12 days ago"));
    }

    #[test]
    fn test_format_pipeline_line_not_started() {
        let def = PipelineDefinition::new("demo", "Demo", vec!["select", "confirm"]);
        let line = format_pipeline_line(&def, None);
        assert!(line.contains("demo"));
        assert!(line.contains("not started"));
    }
}
