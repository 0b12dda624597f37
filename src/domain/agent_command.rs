//! Rendering an agent's command template into a shell command line.

use crate::domain::AppError;
use crate::domain::compose::ComposedPrompt;
use crate::domain::config::AgentEntry;
use crate::domain::template::{TemplateData, TemplateRenderer, referenced_fields};

pub const BIN: &str = "bin";
pub const MODEL: &str = "model";
pub const PROMPT: &str = "prompt";
pub const ROLE: &str = "role";

/// Render `agent.command` with shell-quoted `bin`, `model`, `prompt`, and `role`.
///
/// When the template has no `role` placeholder the role text leads the prompt
/// instead of being dropped.
pub fn render_agent_command(
    renderer: &dyn TemplateRenderer,
    name: &str,
    agent: &AgentEntry,
    model: Option<&str>,
    composed: &ComposedPrompt,
) -> Result<String, AppError> {
    let takes_role = referenced_fields(&agent.command).iter().any(|field| field == ROLE);
    let role_text = composed.role_text.as_deref().unwrap_or_default();

    let prompt = if takes_role || role_text.trim().is_empty() {
        composed.prompt.clone()
    } else if composed.prompt.trim().is_empty() {
        role_text.trim().to_string()
    } else {
        format!("{}\n\n{}", role_text.trim(), composed.prompt)
    };

    let model = agent.resolve_model(model).unwrap_or_default();
    let data = TemplateData::new()
        .with_var(BIN, quote(&agent.bin))
        .with_var(MODEL, quote(&model))
        .with_var(PROMPT, quote(&prompt))
        .with_var(ROLE, quote(if takes_role { role_text } else { "" }));

    let rendered = renderer
        .render(&format!("agents.{}", name), &agent.command, &data)
        .map_err(|err| AppError::AgentLaunch {
            agent: name.to_string(),
            details: err.to_string(),
        })?;

    let line = rendered.trim();
    if line.is_empty() {
        return Err(AppError::AgentLaunch {
            agent: name.to_string(),
            details: "command template rendered to an empty command".to_string(),
        });
    }
    Ok(line.to_string())
}

fn quote(value: &str) -> String {
    if value.is_empty() { String::new() } else { shell_words::quote(value).into_owned() }
}
