//! Placeholder scan that gates lazy file reads and command runs.

use crate::domain::template::{COMMAND, COMMAND_OUTPUT, FILE, FILE_CONTENTS, referenced_fields};

/// Which inputs a template needs materialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputDemand {
    pub file: bool,
    pub command: bool,
}

impl InputDemand {
    /// Inspect template text before any I/O.
    pub fn scan(template: &str) -> Self {
        let mut demand = Self::default();
        for field in referenced_fields(template) {
            match field.as_str() {
                FILE | FILE_CONTENTS => demand.file = true,
                COMMAND | COMMAND_OUTPUT => demand.command = true,
                _ => {}
            }
        }
        demand
    }
}
