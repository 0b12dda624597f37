//! API Facade for the application.
//!
//! This module glues configuration loading, context creation and the domain
//! pipeline together for the CLI.

use std::path::PathBuf;

use tracing::debug;

use crate::adapters::agents::{self, DetectedAgent};
use crate::adapters::files::FsAssetReader;
use crate::adapters::registry::CancelSignal;
use crate::adapters::shell::ProcessShellRunner;
use crate::adapters::template::MinijinjaTemplateRenderer;
use crate::app::AppContext;
use crate::app::config_loader::{self, ConfigPaths};
use crate::domain::{
    ComposedPrompt, Composer, MergedConfig, PromptBody, Selection, TemplateRenderer,
    render_agent_command,
};
use crate::ports::{AssetReader, ShellRunner};

pub use crate::domain::{AppError, FetchedModule, ModuleRef};

/// What to compose and where to send it.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub project_dir: PathBuf,
    pub agent: Option<String>,
    pub role: Option<String>,
    pub model: Option<String>,
    /// Context names or tags.
    pub contexts: Vec<String>,
    pub body: PromptBody,
    /// Print instead of launching.
    pub dry_run: bool,
    /// Ask the registry even when imports are cached.
    pub refresh: bool,
}

/// A composed prompt and, when an agent is selected, the command that runs it.
#[derive(Debug, Clone)]
pub struct LaunchPlan {
    pub composed: ComposedPrompt,
    pub agent: Option<String>,
    pub command_line: Option<String>,
    pub shell: Option<String>,
    pub working_dir: PathBuf,
}

/// Create the production `AppContext`.
fn create_context() -> AppContext<ProcessShellRunner, FsAssetReader, MinijinjaTemplateRenderer> {
    AppContext::new(ProcessShellRunner::new(), FsAssetReader, MinijinjaTemplateRenderer::new())
}

// =============================================================================
// Prompt API
// =============================================================================

/// Load configuration for `options.project_dir` and plan the launch.
pub fn plan(options: &RunOptions, cancel: CancelSignal) -> Result<LaunchPlan, AppError> {
    let paths = ConfigPaths::discover(&options.project_dir);
    let config = config_loader::load_config(&paths, options.refresh, cancel)?;
    plan_with(&create_context(), &config, options)
}

/// Compose the prompt and render the agent command against an already merged configuration.
pub fn plan_with<S, A, T>(
    ctx: &AppContext<S, A, T>,
    config: &MergedConfig,
    options: &RunOptions,
) -> Result<LaunchPlan, AppError>
where
    S: ShellRunner,
    A: AssetReader,
    T: TemplateRenderer,
{
    let agent = select_agent(config, options);
    if agent.is_none() && !options.dry_run {
        return Err(AppError::NoAgentSelected);
    }
    let agent_entry = agent.as_deref().map(|name| config.agent(name)).transpose()?;

    let resolver = ctx.resolver(config, &options.project_dir);
    let selection = Selection {
        role: options.role.clone(),
        context_tags: options.contexts.clone(),
        body: options.body.clone(),
    };
    let composed = Composer::new(config, &resolver).compose(&selection)?;

    let command_line = match (agent.as_deref(), agent_entry) {
        (Some(name), Some(entry)) => Some(render_agent_command(
            ctx.renderer(),
            name,
            entry,
            options.model.as_deref(),
            &composed,
        )?),
        _ => None,
    };

    Ok(LaunchPlan {
        composed,
        agent,
        command_line,
        shell: config.settings.shell.clone(),
        working_dir: options.project_dir.clone(),
    })
}

/// Agent precedence: explicit option, then the task's agent, then `settings.default_agent`.
fn select_agent(config: &MergedConfig, options: &RunOptions) -> Option<String> {
    let task_agent = match &options.body {
        PromptBody::Task { name, .. } => config.tasks.get(name).and_then(|t| t.agent.clone()),
        _ => None,
    };
    let selected = options
        .agent
        .clone()
        .or(task_agent)
        .or_else(|| config.settings.default_agent.clone())
        .filter(|name| !name.trim().is_empty());
    debug!(agent = ?selected, "agent selected");
    selected
}

/// Hand the planned command to the agent. Returns its exit code where the
/// process is not replaced.
pub fn launch(plan: &LaunchPlan) -> Result<i32, AppError> {
    match (&plan.agent, &plan.command_line) {
        (Some(agent), Some(command_line)) => {
            agents::launch_agent(agent, command_line, plan.shell.as_deref(), &plan.working_dir)
        }
        _ => Err(AppError::NoAgentSelected),
    }
}

// =============================================================================
// Detection API
// =============================================================================

/// Configured and well-known agent binaries present on `PATH`.
pub fn detect(project_dir: PathBuf, cancel: CancelSignal) -> Result<Vec<DetectedAgent>, AppError> {
    let paths = ConfigPaths::discover(&project_dir);
    let config = config_loader::load_config(&paths, false, cancel)?;
    Ok(agents::detect_agents(&config))
}

// =============================================================================
// Module API
// =============================================================================

/// Resolve `reference` to its newest concrete version.
pub fn module_latest(
    project_dir: PathBuf,
    reference: &str,
    cancel: CancelSignal,
) -> Result<ModuleRef, AppError> {
    let module = ModuleRef::parse(reference)?;
    let paths = ConfigPaths::discover(&project_dir);
    let layers = config_loader::read_user_layers(&paths)?;
    let client = config_loader::registry_client(&paths, &layers, cancel)?;
    Ok(client.resolve_latest(&module)?)
}

/// Fetch `reference` into the module cache.
pub fn module_fetch(
    project_dir: PathBuf,
    reference: &str,
    cancel: CancelSignal,
) -> Result<FetchedModule, AppError> {
    let module = ModuleRef::parse(reference)?;
    let paths = ConfigPaths::discover(&project_dir);
    let layers = config_loader::read_user_layers(&paths)?;
    let client = config_loader::registry_client(&paths, &layers, cancel)?;
    Ok(client.fetch(&module)?)
}
