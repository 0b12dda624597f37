//! Module registry commands.

use std::path::PathBuf;

use clap::Subcommand;

use crate::adapters::registry::CancelSignal;
use crate::domain::AppError;

#[derive(Subcommand)]
pub enum ModuleCommands {
    /// Resolve a module reference to its newest concrete version
    Latest {
        /// Module reference, e.g. example.com/prompts@v1
        reference: String,
    },
    /// Download a module bundle into the cache
    Fetch {
        /// Module reference, e.g. example.com/prompts@v1.2.0
        reference: String,
    },
}

pub fn run_module(
    command: ModuleCommands,
    project_dir: PathBuf,
    cancel: CancelSignal,
) -> Result<(), AppError> {
    match command {
        ModuleCommands::Latest { reference } => {
            let resolved = crate::app::api::module_latest(project_dir, &reference, cancel)?;
            println!("{}", resolved);
        }
        ModuleCommands::Fetch { reference } => {
            let fetched = crate::app::api::module_fetch(project_dir, &reference, cancel)?;
            println!("{} {}", fetched.reference, fetched.location.display());
        }
    }
    Ok(())
}
