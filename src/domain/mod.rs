pub mod agent_command;
pub mod compose;
pub mod config;
pub mod error;
pub mod module_ref;
pub mod template;
pub mod utd;

pub use agent_command::render_agent_command;
pub use compose::{ComposedPrompt, Composer, PromptBody, Selection};
pub use config::{
    AgentEntry, ConfigLayer, ConfigTree, EntryKind, LayerKind, MergedConfig, Settings, UtdEntry,
};
pub use error::{AppError, RegistryError};
pub use module_ref::{FetchedModule, ModuleRef, VersionSpec};
pub use template::{TemplateData, TemplateError, TemplateRenderer};
pub use utd::{ResolveError, ResolvedText, ResolverDefaults, UtdResolver};
