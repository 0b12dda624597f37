use serde::Deserialize;
use url::Url;

use super::entry::validate_timeout;
use crate::domain::AppError;

/// Default command timeout when neither the entry nor settings name one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// The `[settings]` block.
///
/// Unlike named entries, settings merge per field: the closest layer that sets
/// a field wins for that field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Default shell for entry commands.
    #[serde(default)]
    pub shell: Option<String>,
    /// Default command timeout in seconds.
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub default_agent: Option<String>,
    #[serde(default)]
    pub default_role: Option<String>,
    /// Remote bundles layered beneath this configuration.
    #[serde(default)]
    pub imports: Vec<String>,
    /// Registry base URL; bundles are fetched from their host when unset.
    #[serde(default)]
    pub registry: Option<Url>,
}

impl Settings {
    pub fn timeout_secs(&self) -> u64 {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(timeout) = self.timeout {
            validate_timeout(timeout, "settings.timeout")?;
        }
        for import in &self.imports {
            if import.trim().is_empty() {
                return Err(AppError::InvalidConfig(
                    "settings.imports must not contain empty references".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Combine settings from two files of the same layer; a field set in both is an error.
    pub(crate) fn absorb_sibling(&mut self, other: Settings, layer: &str) -> Result<(), AppError> {
        fn take<T>(
            slot: &mut Option<T>,
            value: Option<T>,
            field: &str,
            layer: &str,
        ) -> Result<(), AppError> {
            if value.is_some() {
                if slot.is_some() {
                    return Err(AppError::InvalidConfig(format!(
                        "settings.{} is set more than once in {}",
                        field, layer
                    )));
                }
                *slot = value;
            }
            Ok(())
        }

        take(&mut self.shell, other.shell, "shell", layer)?;
        take(&mut self.timeout, other.timeout, "timeout", layer)?;
        take(&mut self.default_agent, other.default_agent, "default_agent", layer)?;
        take(&mut self.default_role, other.default_role, "default_role", layer)?;
        take(&mut self.registry, other.registry, "registry", layer)?;
        extend_unique(&mut self.imports, other.imports);
        Ok(())
    }

    /// Overlay settings from a closer layer.
    pub(crate) fn overlay(&mut self, closer: &Settings) {
        if closer.shell.is_some() {
            self.shell = closer.shell.clone();
        }
        if closer.timeout.is_some() {
            self.timeout = closer.timeout;
        }
        if closer.default_agent.is_some() {
            self.default_agent = closer.default_agent.clone();
        }
        if closer.default_role.is_some() {
            self.default_role = closer.default_role.clone();
        }
        if closer.registry.is_some() {
            self.registry = closer.registry.clone();
        }
        extend_unique(&mut self.imports, closer.imports.clone());
    }
}

fn extend_unique(target: &mut Vec<String>, items: Vec<String>) {
    for item in items {
        if !target.contains(&item) {
            target.push(item);
        }
    }
}
