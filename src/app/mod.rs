pub mod api;
pub mod cli;
pub mod config_loader;
mod context;

pub use context::AppContext;
