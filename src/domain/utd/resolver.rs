use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::ResolveError;
use super::markers::InputDemand;
use super::sources::UtdSources;
use crate::domain::config::{DEFAULT_TIMEOUT_SECS, UtdEntry};
use crate::domain::template::{
    COMMAND, COMMAND_OUTPUT, DATE, FILE, FILE_CONTENTS, TemplateData, TemplateRenderer,
};
use crate::ports::{AssetReader, ShellRunner};

/// Text produced for one entry plus non-fatal notes gathered on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedText {
    pub text: String,
    pub warnings: Vec<String>,
}

/// Fallbacks applied when an entry does not set its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverDefaults {
    pub shell: Option<String>,
    pub timeout_secs: u64,
    /// Working directory for commands and base for entries without their own.
    pub working_dir: Option<PathBuf>,
}

impl Default for ResolverDefaults {
    fn default() -> Self {
        Self { shell: None, timeout_secs: DEFAULT_TIMEOUT_SECS, working_dir: None }
    }
}

/// Resolves UTD entries into text.
///
/// The output template is chosen first (`prompt`, else file contents, else
/// command output). Files are read and commands run only when that template
/// references them.
pub struct UtdResolver<'a> {
    shell: &'a dyn ShellRunner,
    renderer: &'a dyn TemplateRenderer,
    assets: &'a dyn AssetReader,
    defaults: ResolverDefaults,
    date: String,
}

impl<'a> UtdResolver<'a> {
    pub fn new(
        shell: &'a dyn ShellRunner,
        renderer: &'a dyn TemplateRenderer,
        assets: &'a dyn AssetReader,
        defaults: ResolverDefaults,
    ) -> Self {
        let date = chrono::Local::now().to_rfc3339();
        Self { shell, renderer, assets, defaults, date }
    }

    /// Pin the `date` value, so every entry of one composition shares it.
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    /// Resolve `entry` into text. `name` labels the entry in template errors;
    /// `extra` adds values such as `instructions` to the template data.
    pub fn resolve(
        &self,
        name: &str,
        entry: &UtdEntry,
        extra: &TemplateData,
    ) -> Result<ResolvedText, ResolveError> {
        let sources = UtdSources::from_entry(entry).ok_or(ResolveError::NoSource)?;
        debug!(entry = name, sources = sources.label(), "resolving entry");

        let mut data = self.template_data(entry, extra);
        let mut warnings = Vec::new();

        let text = match sources {
            UtdSources::File(file) => {
                let contents = self.read_file(entry, file, &mut data)?;
                self.renderer.render(name, &contents, &data)?
            }
            UtdSources::Command(command) => self.run_command(entry, command, &mut data)?,
            UtdSources::Prompt(prompt) => self.renderer.render(name, prompt, &data)?,
            UtdSources::FileCommand { file, command } => {
                let contents = self.read_file(entry, file, &mut data)?;
                let demand = InputDemand::scan(&contents);
                self.materialize(entry, demand, None, Some(command), &mut data, &mut warnings)?;
                self.renderer.render(name, &contents, &data)?
            }
            UtdSources::FilePrompt { file, prompt } => {
                let demand = InputDemand::scan(prompt);
                self.materialize(entry, demand, Some(file), None, &mut data, &mut warnings)?;
                self.renderer.render(name, prompt, &data)?
            }
            UtdSources::CommandPrompt { command, prompt } => {
                let demand = InputDemand::scan(prompt);
                self.materialize(entry, demand, None, Some(command), &mut data, &mut warnings)?;
                self.renderer.render(name, prompt, &data)?
            }
            UtdSources::All { file, command, prompt } => {
                let demand = InputDemand::scan(prompt);
                self.materialize(
                    entry,
                    demand,
                    Some(file),
                    Some(command),
                    &mut data,
                    &mut warnings,
                )?;
                self.renderer.render(name, prompt, &data)?
            }
        };

        Ok(ResolvedText { text, warnings })
    }

    fn template_data(&self, entry: &UtdEntry, extra: &TemplateData) -> TemplateData {
        let mut data = extra.clone();
        let file = entry.file().map(|f| self.resolve_path(entry, f).display().to_string());
        data.insert(FILE, file.unwrap_or_default());
        data.insert(COMMAND, entry.command().unwrap_or_default());
        data.insert(DATE, self.date.clone());
        data
    }

    /// Read or run only what `demand` asks for; a defined but unused input becomes a warning.
    fn materialize(
        &self,
        entry: &UtdEntry,
        demand: InputDemand,
        file: Option<&str>,
        command: Option<&str>,
        data: &mut TemplateData,
        warnings: &mut Vec<String>,
    ) -> Result<(), ResolveError> {
        if let Some(file) = file {
            if demand.file {
                self.read_file(entry, file, data)?;
            } else {
                warnings.push(unused_field(FILE));
            }
        }
        if let Some(command) = command {
            if demand.command {
                self.run_command(entry, command, data)?;
            } else {
                warnings.push(unused_field(COMMAND));
            }
        }
        Ok(())
    }

    fn read_file(
        &self,
        entry: &UtdEntry,
        file: &str,
        data: &mut TemplateData,
    ) -> Result<String, ResolveError> {
        let path = self.resolve_path(entry, file);
        debug!(path = %path.display(), "reading entry file");
        let contents = self
            .assets
            .read_to_string(&path)
            .map_err(|source| ResolveError::FileRead { path: path.clone(), source })?;
        data.insert(FILE_CONTENTS, contents.clone());
        Ok(contents)
    }

    fn run_command(
        &self,
        entry: &UtdEntry,
        command: &str,
        data: &mut TemplateData,
    ) -> Result<String, ResolveError> {
        let timeout = entry.timeout.unwrap_or(self.defaults.timeout_secs);
        let shell = entry.shell.as_deref().or(self.defaults.shell.as_deref());
        debug!(command, timeout, "running entry command");

        let output = self
            .shell
            .run(command, self.defaults.working_dir.as_deref(), shell, timeout)
            .map_err(|source| ResolveError::Command { command: command.to_string(), source })?;

        if !output.success() {
            return Err(ResolveError::CommandExit {
                command: command.to_string(),
                code: output.exit_code.unwrap_or(-1),
                stderr: output.stderr,
            });
        }

        let stdout = output.stdout.trim_end().to_string();
        data.insert(COMMAND_OUTPUT, stdout.clone());
        Ok(stdout)
    }

    /// Expand `~/`, then anchor relative paths at the entry's config directory.
    fn resolve_path(&self, entry: &UtdEntry, file: &str) -> PathBuf {
        if let (Some(rest), Some(home)) = (file.strip_prefix("~/"), dirs::home_dir()) {
            return home.join(rest);
        }
        let path = Path::new(file);
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match entry.base_dir.as_deref().or(self.defaults.working_dir.as_deref()) {
            Some(base) => base.join(path),
            None => path.to_path_buf(),
        }
    }
}

fn unused_field(field: &str) -> String {
    format!("{} defined but not used", field)
}
