//! kickoff: compose prompts for AI agents from layered, declarative configuration.

pub mod adapters;
pub mod app;
pub mod domain;
pub mod logging;
pub mod ports;

#[cfg(test)]
pub(crate) mod testing;

pub use app::api::{LaunchPlan, RunOptions};
pub use domain::AppError;
