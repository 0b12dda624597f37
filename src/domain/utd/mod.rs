//! File/command/prompt resolution shared by tasks, roles, and contexts.

mod error;
mod markers;
mod resolver;
mod sources;

pub use error::ResolveError;
pub use markers::InputDemand;
pub use resolver::{ResolvedText, ResolverDefaults, UtdResolver};
pub use sources::UtdSources;
