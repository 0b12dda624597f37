use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

use crate::domain::AppError;

/// Lowest accepted per-command timeout in seconds.
pub const MIN_TIMEOUT_SECS: u64 = 1;
/// Highest accepted per-command timeout in seconds.
pub const MAX_TIMEOUT_SECS: u64 = 3600;

/// Category of a named configuration entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryKind {
    Agent,
    Role,
    Context,
    Task,
}

impl EntryKind {
    /// Top-level table name in configuration files.
    pub fn table_name(&self) -> &'static str {
        match self {
            EntryKind::Agent => "agents",
            EntryKind::Role => "roles",
            EntryKind::Context => "contexts",
            EntryKind::Task => "tasks",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntryKind::Agent => "agent",
            EntryKind::Role => "role",
            EntryKind::Context => "context",
            EntryKind::Task => "task",
        };
        f.write_str(label)
    }
}

/// A task, role, or context definition.
///
/// Each entry produces text from some combination of a file, a shell command,
/// and an inline prompt template. Which combination is present decides how the
/// entry resolves; see [`crate::domain::utd`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UtdEntry {
    #[serde(default)]
    pub description: Option<String>,
    /// Path to a file whose contents feed the entry.
    #[serde(default)]
    pub file: Option<String>,
    /// Shell command whose output feeds the entry.
    #[serde(default)]
    pub command: Option<String>,
    /// Inline template text.
    #[serde(default)]
    pub prompt: Option<String>,
    /// Shell override for `command`, e.g. `"zsh"` or `"python3 -c"`.
    #[serde(default)]
    pub shell: Option<String>,
    /// Command timeout in seconds.
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Contexts only: always included.
    #[serde(default)]
    pub required: bool,
    /// Contexts only: included when no context tags are selected.
    #[serde(default)]
    pub default: bool,
    /// Tasks only: role to compose with.
    #[serde(default)]
    pub role: Option<String>,
    /// Tasks only: agent to hand the prompt to.
    #[serde(default)]
    pub agent: Option<String>,
    /// Directory that relative `file` paths resolve against. Set by the layer
    /// that loaded the entry.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl UtdEntry {
    /// Returns the field value when it is present and not blank.
    pub fn file(&self) -> Option<&str> {
        non_blank(self.file.as_deref())
    }

    pub fn command(&self) -> Option<&str> {
        non_blank(self.command.as_deref())
    }

    pub fn prompt(&self) -> Option<&str> {
        non_blank(self.prompt.as_deref())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub(crate) fn validate(&self, kind: EntryKind, name: &str) -> Result<(), AppError> {
        if let Some(timeout) = self.timeout {
            validate_timeout(timeout, &format!("{}.{}.timeout", kind.table_name(), name))?;
        }
        if kind != EntryKind::Task {
            if self.role.is_some() {
                return Err(AppError::InvalidConfig(format!(
                    "{}.{}: 'role' is only valid on tasks",
                    kind.table_name(),
                    name
                )));
            }
            if self.agent.is_some() {
                return Err(AppError::InvalidConfig(format!(
                    "{}.{}: 'agent' is only valid on tasks",
                    kind.table_name(),
                    name
                )));
            }
        }
        Ok(())
    }
}

/// An AI agent binary and the command template used to launch it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentEntry {
    /// Executable name looked up on `PATH`.
    pub bin: String,
    /// Launch template using `{{.bin}}`, `{{.model}}`, `{{.prompt}}`, `{{.role}}`.
    pub command: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default_model: Option<String>,
    /// Model alias to model identifier.
    #[serde(default)]
    pub models: BTreeMap<String, String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl AgentEntry {
    /// Map a model alias to its identifier, falling back to the default model.
    pub fn resolve_model(&self, requested: Option<&str>) -> Option<String> {
        let wanted = non_blank(requested).or(non_blank(self.default_model.as_deref()))?;
        Some(self.models.get(wanted).cloned().unwrap_or_else(|| wanted.to_string()))
    }

    pub(crate) fn validate(&self, name: &str) -> Result<(), AppError> {
        if self.bin.trim().is_empty() {
            return Err(AppError::InvalidConfig(format!("agents.{}.bin must not be empty", name)));
        }
        if self.command.trim().is_empty() {
            return Err(AppError::InvalidConfig(format!(
                "agents.{}.command must not be empty",
                name
            )));
        }
        Ok(())
    }
}

pub(crate) fn validate_timeout(timeout: u64, field: &str) -> Result<(), AppError> {
    if !(MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&timeout) {
        return Err(AppError::InvalidConfig(format!(
            "{} must be between {} and {} seconds (got {})",
            field, MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS, timeout
        )));
    }
    Ok(())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_count_as_absent() {
        let entry = UtdEntry {
            file: Some("  ".to_string()),
            command: Some("git status".to_string()),
            prompt: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(entry.file(), None);
        assert_eq!(entry.command(), Some("git status"));
        assert_eq!(entry.prompt(), None);
    }

    #[test]
    fn timeout_bounds_are_enforced() {
        let ok = UtdEntry { timeout: Some(3600), ..Default::default() };
        assert!(ok.validate(EntryKind::Context, "env").is_ok());

        let zero = UtdEntry { timeout: Some(0), ..Default::default() };
        let result = zero.validate(EntryKind::Context, "env");
        assert!(matches!(result, Err(AppError::InvalidConfig(_))));

        let long = UtdEntry { timeout: Some(3601), ..Default::default() };
        let err = long.validate(EntryKind::Task, "review").unwrap_err();
        assert!(err.to_string().contains("tasks.review.timeout"));
    }

    #[test]
    fn role_reference_rejected_outside_tasks() {
        let entry = UtdEntry { role: Some("dev".to_string()), ..Default::default() };
        assert!(entry.validate(EntryKind::Context, "env").is_err());
        assert!(entry.validate(EntryKind::Task, "review").is_ok());
    }

    #[test]
    fn model_alias_resolution() {
        let agent = AgentEntry {
            bin: "claude".to_string(),
            command: "{{.bin}} {{.prompt}}".to_string(),
            default_model: Some("fast".to_string()),
            models: BTreeMap::from([
                ("fast".to_string(), "claude-haiku".to_string()),
                ("deep".to_string(), "claude-opus".to_string()),
            ]),
            ..Default::default()
        };

        assert_eq!(agent.resolve_model(None).as_deref(), Some("claude-haiku"));
        assert_eq!(agent.resolve_model(Some("deep")).as_deref(), Some("claude-opus"));
        assert_eq!(agent.resolve_model(Some("custom-id")).as_deref(), Some("custom-id"));

        let bare = AgentEntry { models: BTreeMap::new(), default_model: None, ..agent };
        assert_eq!(bare.resolve_model(None), None);
    }
}
