pub mod agents;
pub mod files;
pub mod registry;
pub mod shell;
pub mod template;
