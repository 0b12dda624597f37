//! Prompt composition: role, contexts, and task resolved into one prompt.

use tracing::debug;

use crate::domain::AppError;
use crate::domain::config::{EntryKind, MergedConfig, UtdEntry};
use crate::domain::template::{INSTRUCTIONS, TemplateData};
use crate::domain::utd::{ResolvedText, UtdResolver};

/// The main body of a composed prompt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PromptBody {
    /// Role and contexts only.
    #[default]
    Empty,
    /// A configured task, with optional free-text instructions.
    Task { name: String, instructions: Option<String> },
    /// Literal text supplied by the caller.
    Literal(String),
}

/// What the caller asked to compose.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    /// Explicit role; overrides the task's and the configured default.
    pub role: Option<String>,
    /// Context names or tags. Empty selects contexts marked `default`.
    pub context_tags: Vec<String>,
    pub body: PromptBody,
}

/// Result of a composition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComposedPrompt {
    /// Name of the role that resolved, if any.
    pub role: Option<String>,
    pub role_text: Option<String>,
    /// Names of the contexts included, in order.
    pub contexts: Vec<String>,
    pub task: Option<String>,
    /// Contexts followed by the task or literal text.
    pub prompt: String,
    pub warnings: Vec<String>,
}

/// Applies the fatal-vs-warn policy: task failures abort, role and context
/// failures are reported and skipped.
pub struct Composer<'c, 'r> {
    config: &'c MergedConfig,
    resolver: &'c UtdResolver<'r>,
}

impl<'c, 'r> Composer<'c, 'r> {
    pub fn new(config: &'c MergedConfig, resolver: &'c UtdResolver<'r>) -> Self {
        Self { config, resolver }
    }

    pub fn compose(&self, selection: &Selection) -> Result<ComposedPrompt, AppError> {
        let mut composed = ComposedPrompt::default();

        let task = match &selection.body {
            PromptBody::Task { name, .. } => {
                let entry = self.config.task(name)?;
                if let Some(issue) = self.config.reference_issue_for(name) {
                    return Err(issue.to_error());
                }
                Some((name.as_str(), entry))
            }
            _ => None,
        };

        if let Some((name, text)) =
            self.resolve_role(selection.role.as_deref(), task, &mut composed.warnings)?
        {
            composed.role = Some(name);
            composed.role_text = Some(text);
        }

        let mut sections = Vec::new();
        for (name, entry) in self.select_contexts(&selection.context_tags) {
            let resolved = self.resolve_optional(EntryKind::Context, name, entry);
            let warnings = &mut composed.warnings;
            if let Some(resolved) = collect(EntryKind::Context, name, resolved, warnings) {
                composed.contexts.push(name.to_string());
                sections.push(resolved.text);
            }
        }

        match (&selection.body, task) {
            (PromptBody::Task { instructions, .. }, Some((name, entry))) => {
                let mut extra = TemplateData::new();
                extra.insert(INSTRUCTIONS, instructions.clone().unwrap_or_default());
                let resolved = self
                    .resolver
                    .resolve(&template_name(EntryKind::Task, name), entry, &extra)
                    .map_err(|source| AppError::Resolution {
                        kind: EntryKind::Task,
                        name: name.to_string(),
                        source,
                    })?;
                composed.warnings.extend(prefixed(EntryKind::Task, name, resolved.warnings));
                composed.task = Some(name.to_string());
                sections.push(resolved.text);
            }
            (PromptBody::Literal(text), _) => sections.push(text.clone()),
            _ => {}
        }

        composed.prompt = join_sections(sections);
        Ok(composed)
    }

    /// Role precedence: explicit > task's role > `settings.default_role`.
    fn resolve_role(
        &self,
        explicit: Option<&str>,
        task: Option<(&str, &UtdEntry)>,
        warnings: &mut Vec<String>,
    ) -> Result<Option<(String, String)>, AppError> {
        let requested =
            explicit.or_else(|| task.and_then(|(_, entry)| entry.role.as_deref()));

        let (name, entry) = match requested {
            Some(name) => (name, self.config.role(name)?),
            None => match self.config.settings.default_role.as_deref() {
                Some(name) => match self.config.roles.get(name) {
                    Some(entry) => (name, entry),
                    None => {
                        let message = format!("default role '{}' is not defined", name);
                        debug!("{}", message);
                        warnings.push(message);
                        return Ok(None);
                    }
                },
                None => return Ok(None),
            },
        };

        let resolved = self.resolve_optional(EntryKind::Role, name, entry);
        Ok(collect(EntryKind::Role, name, resolved, warnings)
            .map(|resolved| (name.to_string(), resolved.text)))
    }

    /// Required contexts, plus defaults (no tags or the `default` tag) and any
    /// context whose name or tags match.
    fn select_contexts<'e>(&'e self, tags: &[String]) -> Vec<(&'e str, &'e UtdEntry)> {
        let wants_defaults = tags.is_empty() || tags.iter().any(|t| t == "default");
        self.config
            .contexts
            .iter()
            .filter(|(name, entry)| {
                entry.required
                    || (wants_defaults && entry.default)
                    || tags.iter().any(|t| t == *name || entry.has_tag(t))
            })
            .map(|(name, entry)| (name.as_str(), entry))
            .collect()
    }

    fn resolve_optional(
        &self,
        kind: EntryKind,
        name: &str,
        entry: &UtdEntry,
    ) -> Result<ResolvedText, AppError> {
        debug!(%kind, name, "resolving optional entry");
        let empty = TemplateData::new();
        self.resolver.resolve(&template_name(kind, name), entry, &empty).map_err(|source| {
            AppError::Resolution { kind, name: name.to_string(), source }
        })
    }
}

/// Keep a successful resolution; turn a failure into a warning.
fn collect(
    kind: EntryKind,
    name: &str,
    resolved: Result<ResolvedText, AppError>,
    warnings: &mut Vec<String>,
) -> Option<ResolvedText> {
    match resolved {
        Ok(resolved) => {
            warnings.extend(prefixed(kind, name, resolved.warnings.clone()));
            Some(resolved)
        }
        Err(err) => {
            debug!(%kind, name, error = %err, "skipping entry that failed to resolve");
            warnings.push(format!("{} '{}' skipped: {}", kind, name, err));
            None
        }
    }
}

fn prefixed(kind: EntryKind, name: &str, warnings: Vec<String>) -> Vec<String> {
    warnings.into_iter().map(|w| format!("{} '{}': {}", kind, name, w)).collect()
}

fn template_name(kind: EntryKind, name: &str) -> String {
    format!("{}.{}", kind.table_name(), name)
}

fn join_sections(sections: Vec<String>) -> String {
    sections
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
