use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use super::entry::{AgentEntry, EntryKind, UtdEntry};
use super::settings::Settings;
use crate::domain::AppError;

/// Configuration entries and settings from one layer (or the merge of several).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigTree {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub agents: BTreeMap<String, AgentEntry>,
    #[serde(default)]
    pub roles: BTreeMap<String, UtdEntry>,
    #[serde(default)]
    pub contexts: BTreeMap<String, UtdEntry>,
    #[serde(default)]
    pub tasks: BTreeMap<String, UtdEntry>,
}

impl ConfigTree {
    /// Parse one configuration file. `source` names the file in error messages.
    pub fn parse(content: &str, source: &str) -> Result<Self, AppError> {
        toml::from_str(content).map_err(|err| AppError::ConfigParse {
            path: source.to_string(),
            details: err.message().to_string(),
        })
    }

    /// Structural checks that the schema alone cannot express.
    pub fn validate(&self) -> Result<(), AppError> {
        self.settings.validate()?;
        for (name, agent) in &self.agents {
            agent.validate(name)?;
        }
        for kind in [EntryKind::Role, EntryKind::Context, EntryKind::Task] {
            for (name, entry) in self.entries(kind) {
                entry.validate(kind, name)?;
            }
        }
        Ok(())
    }

    /// Fold in another file of the same layer. Names may not repeat within a layer.
    pub fn absorb_sibling(&mut self, other: ConfigTree, layer: &str) -> Result<(), AppError> {
        self.settings.absorb_sibling(other.settings, layer)?;
        insert_unique(&mut self.agents, other.agents, EntryKind::Agent, layer)?;
        insert_unique(&mut self.roles, other.roles, EntryKind::Role, layer)?;
        insert_unique(&mut self.contexts, other.contexts, EntryKind::Context, layer)?;
        insert_unique(&mut self.tasks, other.tasks, EntryKind::Task, layer)?;
        Ok(())
    }

    /// Template-resolved entries of a kind; agents are not among them.
    pub fn entries(&self, kind: EntryKind) -> &BTreeMap<String, UtdEntry> {
        static NO_ENTRIES: BTreeMap<String, UtdEntry> = BTreeMap::new();
        match kind {
            EntryKind::Role => &self.roles,
            EntryKind::Context => &self.contexts,
            EntryKind::Task => &self.tasks,
            EntryKind::Agent => &NO_ENTRIES,
        }
    }

    /// Record the directory relative `file` paths resolve against, unless already set.
    pub(crate) fn anchor_files(&mut self, base_dir: &Path) {
        for entry in self
            .roles
            .values_mut()
            .chain(self.contexts.values_mut())
            .chain(self.tasks.values_mut())
        {
            if entry.base_dir.is_none() {
                entry.base_dir = Some(base_dir.to_path_buf());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.settings == Settings::default()
            && self.agents.is_empty()
            && self.roles.is_empty()
            && self.contexts.is_empty()
            && self.tasks.is_empty()
    }
}

fn insert_unique<V>(
    target: &mut BTreeMap<String, V>,
    incoming: BTreeMap<String, V>,
    kind: EntryKind,
    layer: &str,
) -> Result<(), AppError> {
    for (name, value) in incoming {
        if target.contains_key(&name) {
            return Err(AppError::DuplicateEntry { kind, name, layer: layer.to_string() });
        }
        target.insert(name, value);
    }
    Ok(())
}
