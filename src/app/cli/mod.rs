//! CLI Adapter.

mod module;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::adapters::registry::CancelSignal;
use crate::app::api::{self, LaunchPlan, RunOptions};
use crate::domain::{AppError, PromptBody};
use crate::logging::init_logging;

#[derive(Parser)]
#[command(name = "kickoff")]
#[command(version)]
#[command(
    about = "Compose prompts from layered configuration and hand them to AI agents",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Agent to launch
    #[arg(short, long, global = true)]
    agent: Option<String>,
    /// Role to compose with
    #[arg(short, long, global = true)]
    role: Option<String>,
    /// Model alias or identifier passed to the agent
    #[arg(short, long, global = true)]
    model: Option<String>,
    /// Context name or tag to include (repeatable)
    #[arg(short = 'c', long = "context", global = true)]
    contexts: Vec<String>,
    /// Project directory (defaults to the current directory)
    #[arg(short = 'C', long = "directory", global = true)]
    directory: Option<PathBuf>,
    /// Print the prompt or agent command instead of launching
    #[arg(long, global = true)]
    dry_run: bool,
    /// Query the registry even for cached imports
    #[arg(long, global = true)]
    refresh: bool,
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose role and contexts, then launch the agent
    #[clap(visible_alias = "s")]
    Start,
    /// Compose with a configured task
    #[clap(visible_alias = "t")]
    Task {
        /// Task name
        name: String,
        /// Free-text instructions available to the task as {{.instructions}}
        instructions: Vec<String>,
    },
    /// Compose with literal prompt text
    #[clap(visible_alias = "p")]
    Prompt {
        /// Prompt text
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// List agent binaries found on PATH
    Detect,
    /// Module registry operations
    #[clap(visible_alias = "mod")]
    Module {
        #[command(subcommand)]
        command: module::ModuleCommands,
    },
}

/// Entry point for the CLI.
pub fn run() {
    let cli = Cli::parse();

    init_logging(cli.global.verbose);
    let cancel = install_interrupt_handler();

    let result: Result<i32, AppError> = project_dir(&cli.global).and_then(|project_dir| {
        match cli.command {
            Commands::Start => compose(&cli.global, project_dir, PromptBody::Empty, cancel),
            Commands::Task { name, instructions } => {
                let instructions = join_words(instructions);
                let body = PromptBody::Task { name, instructions };
                compose(&cli.global, project_dir, body, cancel)
            }
            Commands::Prompt { text } => {
                let body = PromptBody::Literal(text.join(" "));
                compose(&cli.global, project_dir, body, cancel)
            }
            Commands::Detect => run_detect(project_dir, cancel).map(|_| 0),
            Commands::Module { command } => {
                module::run_module(command, project_dir, cancel).map(|_| 0)
            }
        }
    });

    match result {
        Ok(exit_code) => {
            if exit_code != 0 {
                std::process::exit(exit_code);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// First Ctrl-C abandons registry retries; a second one exits.
fn install_interrupt_handler() -> CancelSignal {
    let cancel = CancelSignal::new();
    let handler_signal = cancel.clone();
    let installed = ctrlc::set_handler(move || {
        if handler_signal.is_cancelled() {
            std::process::exit(130);
        }
        handler_signal.cancel();
    });
    if let Err(e) = installed {
        tracing::debug!(error = %e, "interrupt handler not installed");
    }
    cancel
}

fn project_dir(global: &GlobalArgs) -> Result<PathBuf, AppError> {
    match &global.directory {
        Some(dir) if dir.is_dir() => Ok(dir.clone()),
        Some(dir) => Err(AppError::config_error(format!(
            "Project directory {} does not exist",
            dir.display()
        ))),
        None => Ok(std::env::current_dir()?),
    }
}

fn join_words(words: Vec<String>) -> Option<String> {
    let joined = words.join(" ");
    if joined.trim().is_empty() { None } else { Some(joined) }
}

fn compose(
    global: &GlobalArgs,
    project_dir: PathBuf,
    body: PromptBody,
    cancel: CancelSignal,
) -> Result<i32, AppError> {
    let options = RunOptions {
        project_dir,
        agent: global.agent.clone(),
        role: global.role.clone(),
        model: global.model.clone(),
        contexts: global.contexts.clone(),
        body,
        dry_run: global.dry_run,
        refresh: global.refresh,
    };

    let plan = api::plan(&options, cancel)?;
    for warning in &plan.composed.warnings {
        eprintln!("warning: {}", warning);
    }

    if options.dry_run {
        print_preview(&plan);
        return Ok(0);
    }
    api::launch(&plan)
}

fn print_preview(plan: &LaunchPlan) {
    if let Some(command_line) = &plan.command_line {
        println!("{}", command_line);
        return;
    }
    let role_text = plan.composed.role_text.as_deref().map(str::trim).unwrap_or_default();
    let prompt = plan.composed.prompt.trim();
    match (role_text.is_empty(), prompt.is_empty()) {
        (false, false) => println!("{}\n\n{}", role_text, prompt),
        (false, true) => println!("{}", role_text),
        (true, _) => println!("{}", prompt),
    }
}

fn run_detect(project_dir: PathBuf, cancel: CancelSignal) -> Result<(), AppError> {
    let found = api::detect(project_dir, cancel)?;
    if found.is_empty() {
        println!("No agents found on PATH");
        return Ok(());
    }
    for agent in found {
        println!("{}\t{}", agent.name, agent.path.display());
    }
    Ok(())
}
