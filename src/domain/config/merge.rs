//! Proximity-ordered merge of configuration layers.

use std::collections::BTreeMap;

use super::entry::{AgentEntry, EntryKind, UtdEntry};
use super::layer::{ConfigLayer, LayerKind};
use super::settings::Settings;
use crate::domain::AppError;

/// A task reference to a role or agent that no layer defines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceIssue {
    pub task: String,
    pub kind: EntryKind,
    pub name: String,
}

impl ReferenceIssue {
    pub fn to_error(&self) -> AppError {
        AppError::UnknownReference {
            task: self.task.clone(),
            kind: self.kind,
            name: self.name.clone(),
        }
    }
}

/// The unification of all loaded layers. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedConfig {
    pub settings: Settings,
    pub agents: BTreeMap<String, AgentEntry>,
    pub roles: BTreeMap<String, UtdEntry>,
    pub contexts: BTreeMap<String, UtdEntry>,
    pub tasks: BTreeMap<String, UtdEntry>,
    origins: BTreeMap<(EntryKind, String), LayerKind>,
    reference_issues: Vec<ReferenceIssue>,
}

/// Validate every layer, then merge them.
///
/// A structural problem in any layer aborts the whole load.
pub fn load(layers: Vec<ConfigLayer>) -> Result<MergedConfig, AppError> {
    for layer in &layers {
        layer.tree().validate().map_err(|err| match err {
            AppError::InvalidConfig(message) => AppError::InvalidConfig(format!(
                "{} ({} layer: {})",
                message,
                layer.kind(),
                layer.source()
            )),
            other => other,
        })?;
    }
    Ok(merge_layers(&layers))
}

/// Merge layers Registry → Cache → Global → Local.
///
/// A name defined in several layers takes the closest layer's entry whole;
/// fields are never combined across layers. Layers of the same kind apply in
/// the order given.
pub fn merge_layers(layers: &[ConfigLayer]) -> MergedConfig {
    let mut ordered: Vec<&ConfigLayer> = layers.iter().collect();
    ordered.sort_by_key(|layer| layer.kind());

    let mut merged = MergedConfig::default();
    for layer in ordered {
        let tree = layer.tree();
        let origins = &mut merged.origins;
        merged.settings.overlay(&tree.settings);
        replace_entries(&mut merged.agents, &tree.agents, EntryKind::Agent, layer, origins);
        replace_entries(&mut merged.roles, &tree.roles, EntryKind::Role, layer, origins);
        replace_entries(&mut merged.contexts, &tree.contexts, EntryKind::Context, layer, origins);
        replace_entries(&mut merged.tasks, &tree.tasks, EntryKind::Task, layer, origins);
    }
    merged.reference_issues = find_reference_issues(&merged);
    merged
}

fn replace_entries<V: Clone>(
    target: &mut BTreeMap<String, V>,
    incoming: &BTreeMap<String, V>,
    kind: EntryKind,
    layer: &ConfigLayer,
    origins: &mut BTreeMap<(EntryKind, String), LayerKind>,
) {
    for (name, value) in incoming {
        target.insert(name.clone(), value.clone());
        origins.insert((kind, name.clone()), layer.kind());
    }
}

fn find_reference_issues(merged: &MergedConfig) -> Vec<ReferenceIssue> {
    let mut issues = Vec::new();
    for (task, entry) in &merged.tasks {
        if let Some(role) = entry.role.as_deref().filter(|r| !merged.roles.contains_key(*r)) {
            issues.push(ReferenceIssue {
                task: task.clone(),
                kind: EntryKind::Role,
                name: role.to_string(),
            });
        }
        if let Some(agent) = entry.agent.as_deref().filter(|a| !merged.agents.contains_key(*a)) {
            issues.push(ReferenceIssue {
                task: task.clone(),
                kind: EntryKind::Agent,
                name: agent.to_string(),
            });
        }
    }
    issues
}

impl MergedConfig {
    pub fn task(&self, name: &str) -> Result<&UtdEntry, AppError> {
        lookup(&self.tasks, EntryKind::Task, name)
    }

    pub fn role(&self, name: &str) -> Result<&UtdEntry, AppError> {
        lookup(&self.roles, EntryKind::Role, name)
    }

    pub fn context(&self, name: &str) -> Result<&UtdEntry, AppError> {
        lookup(&self.contexts, EntryKind::Context, name)
    }

    pub fn agent(&self, name: &str) -> Result<&AgentEntry, AppError> {
        lookup(&self.agents, EntryKind::Agent, name)
    }

    /// The layer that supplied an entry.
    pub fn origin(&self, kind: EntryKind, name: &str) -> Option<LayerKind> {
        self.origins.get(&(kind, name.to_string())).copied()
    }

    /// Dangling role/agent references found after merging.
    pub fn reference_issues(&self) -> &[ReferenceIssue] {
        &self.reference_issues
    }

    /// The first dangling reference of a task, if any.
    pub fn reference_issue_for(&self, task: &str) -> Option<&ReferenceIssue> {
        self.reference_issues.iter().find(|issue| issue.task == task)
    }
}

fn lookup<'a, V>(
    entries: &'a BTreeMap<String, V>,
    kind: EntryKind,
    name: &str,
) -> Result<&'a V, AppError> {
    entries.get(name).ok_or_else(|| AppError::EntryNotFound { kind, name: name.to_string() })
}
