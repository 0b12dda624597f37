use minijinja::{Environment, ErrorKind, UndefinedBehavior};
use std::sync::OnceLock;

use crate::domain::template::{
    TemplateData, TemplateError, TemplateRenderer, normalize_field_references,
};

/// Template renderer using Minijinja.
///
/// `{{.name}}` references are accepted alongside plain `{{ name }}` lookups.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinijinjaTemplateRenderer;

impl MinijinjaTemplateRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl TemplateRenderer for MinijinjaTemplateRenderer {
    fn render(
        &self,
        name: &str,
        template: &str,
        data: &TemplateData,
    ) -> Result<String, TemplateError> {
        let env = ENV.get_or_init(|| {
            let mut env = Environment::new();
            env.set_undefined_behavior(UndefinedBehavior::Lenient);
            env.set_keep_trailing_newline(true);
            env
        });

        let source = normalize_field_references(template);
        env.render_str(&source, data.values()).map_err(|err| template_error(name, &err))
    }
}

static ENV: OnceLock<Environment<'static>> = OnceLock::new();

fn template_error(name: &str, err: &minijinja::Error) -> TemplateError {
    let template = name.to_string();
    let line = err.line();
    let details = err.detail().map(String::from).unwrap_or_else(|| err.kind().to_string());
    let syntax = matches!(
        err.kind(),
        ErrorKind::SyntaxError
            | ErrorKind::UnknownFilter
            | ErrorKind::UnknownTest
            | ErrorKind::UnknownFunction
            | ErrorKind::UnknownBlock
    );
    if syntax {
        TemplateError::Syntax { template, line, details }
    } else {
        TemplateError::Render { template, line, details }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(template: &str, data: &TemplateData) -> Result<String, TemplateError> {
        MinijinjaTemplateRenderer::new().render("tasks.sample", template, data)
    }

    #[test]
    fn substitutes_dotted_and_plain_fields() {
        let data = TemplateData::new().with_var("file", "/tmp/a.md").with_var("date", "today");
        assert_eq!(render("{{.file}} on {{ date }}", &data).unwrap(), "/tmp/a.md on today");
    }

    #[test]
    fn undefined_fields_render_empty() {
        assert_eq!(render("[{{.command_output}}]", &TemplateData::new()).unwrap(), "[]");
    }

    #[test]
    fn supports_conditionals_and_iteration() {
        let data = TemplateData::new().with_var("instructions", "fix it");
        let template = "{% if .instructions %}Do: {{ .instructions }}{% else %}nothing{% endif %}";
        assert_eq!(render(template, &data).unwrap(), "Do: fix it");

        let numbered =
            "{% for n in range(3) %}{{ n }}{% if not loop.last %},{% endif %}{% endfor %}";
        assert_eq!(render(numbered, &TemplateData::new()).unwrap(), "0,1,2");
    }

    #[test]
    fn string_literals_render_as_written() {
        let data = TemplateData::new().with_var("file", "/tmp/a.md");
        assert_eq!(
            render(r#"{{ "edit .file first" }} then {{.file}}"#, &data).unwrap(),
            "edit .file first then /tmp/a.md"
        );
    }

    #[test]
    fn keeps_trailing_newline() {
        assert_eq!(render("line\n", &TemplateData::new()).unwrap(), "line\n");
    }

    #[test]
    fn unbalanced_block_is_a_syntax_error() {
        let err = render("{% if file %}open", &TemplateData::new()).unwrap_err();
        match err {
            TemplateError::Syntax { template, .. } => assert_eq!(template, "tasks.sample"),
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_filter_is_a_syntax_error() {
        let err = render("{{ file | shout }}", &TemplateData::new()).unwrap_err();
        assert!(matches!(err, TemplateError::Syntax { .. }), "got {err:?}");
    }
}
