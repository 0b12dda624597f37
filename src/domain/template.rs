//! Template rendering contract and the placeholder vocabulary.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use thiserror::Error;

pub const FILE: &str = "file";
pub const FILE_CONTENTS: &str = "file_contents";
pub const COMMAND: &str = "command";
pub const COMMAND_OUTPUT: &str = "command_output";
pub const DATE: &str = "date";
pub const INSTRUCTIONS: &str = "instructions";

/// Flat key/value data a template renders against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateData {
    values: BTreeMap<String, String>,
}

impl TemplateData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(|s| s.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}

/// Template failures. Both variants name the template they came from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// Unbalanced or unknown directives.
    #[error("template syntax error in {template}{}: {details}", line_suffix(.line))]
    Syntax { template: String, line: Option<usize>, details: String },

    /// The template parsed but evaluating it failed.
    #[error("failed to render {template}{}: {details}", line_suffix(.line))]
    Render { template: String, line: Option<usize>, details: String },
}

fn line_suffix(line: &Option<usize>) -> String {
    line.map(|l| format!(" (line {})", l)).unwrap_or_default()
}

/// Trait for rendering templates.
///
/// Implementations are pure: every input is already materialized in `data`.
/// A field missing from `data` renders as empty; malformed syntax is an error.
pub trait TemplateRenderer {
    /// Render `template` against `data`. `name` identifies the template in errors.
    fn render(
        &self,
        name: &str,
        template: &str,
        data: &TemplateData,
    ) -> Result<String, TemplateError>;
}

fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"(?s)\{\{.*?\}\}|\{%.*?%\}").expect("tag pattern is valid"))
}

fn dotted_field_pattern() -> &'static Regex {
    static FIELD: OnceLock<Regex> = OnceLock::new();
    FIELD.get_or_init(|| {
        Regex::new(r"([^\w.])\.([A-Za-z_][A-Za-z0-9_]*)").expect("field pattern is valid")
    })
}

fn identifier_pattern() -> &'static Regex {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    IDENT.get_or_init(|| {
        Regex::new(r"[^\w.]\.?([A-Za-z_][A-Za-z0-9_]*)").expect("identifier pattern is valid")
    })
}

fn string_literal_pattern() -> &'static Regex {
    static LITERAL: OnceLock<Regex> = OnceLock::new();
    LITERAL.get_or_init(|| {
        Regex::new(r#""(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'"#)
            .expect("string literal pattern is valid")
    })
}

/// Rewrite `{{.name}}`-style references into plain `{{ name }}` lookups.
///
/// Only text inside `{{ }}` and `{% %}` tags is touched, and string literals
/// within a tag are left as written.
pub fn normalize_field_references(template: &str) -> Cow<'_, str> {
    tag_pattern().replace_all(template, |tag: &Captures<'_>| rewrite_outside_literals(&tag[0]))
}

fn rewrite_outside_literals(tag: &str) -> String {
    let mut rewritten = String::with_capacity(tag.len());
    let mut code_start = 0;
    for literal in string_literal_pattern().find_iter(tag) {
        let code = &tag[code_start..literal.start()];
        rewritten.push_str(&dotted_field_pattern().replace_all(code, "${1}${2}"));
        rewritten.push_str(literal.as_str());
        code_start = literal.end();
    }
    rewritten.push_str(&dotted_field_pattern().replace_all(&tag[code_start..], "${1}${2}"));
    rewritten
}

/// Top-level identifiers referenced from any tag of `template`.
///
/// Attribute accesses such as `x.file` and words inside string literals do
/// not count as a reference to `file`.
pub fn referenced_fields(template: &str) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    for tag in tag_pattern().find_iter(template) {
        let code = string_literal_pattern().replace_all(tag.as_str(), " ");
        for ident in identifier_pattern().captures_iter(&code) {
            let name = ident[1].to_string();
            if !fields.contains(&name) {
                fields.push(name);
            }
        }
    }
    fields
}
