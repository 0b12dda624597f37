use crate::domain::config::UtdEntry;

/// Which of `file`, `command`, and `prompt` an entry defines.
///
/// The entry with none of the three has no variant: it is rejected before any
/// resolution happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtdSources<'a> {
    File(&'a str),
    Command(&'a str),
    Prompt(&'a str),
    FileCommand { file: &'a str, command: &'a str },
    FilePrompt { file: &'a str, prompt: &'a str },
    CommandPrompt { command: &'a str, prompt: &'a str },
    All { file: &'a str, command: &'a str, prompt: &'a str },
}

impl<'a> UtdSources<'a> {
    pub fn from_entry(entry: &'a UtdEntry) -> Option<Self> {
        let sources = match (entry.file(), entry.command(), entry.prompt()) {
            (None, None, None) => return None,
            (Some(file), None, None) => Self::File(file),
            (None, Some(command), None) => Self::Command(command),
            (None, None, Some(prompt)) => Self::Prompt(prompt),
            (Some(file), Some(command), None) => Self::FileCommand { file, command },
            (Some(file), None, Some(prompt)) => Self::FilePrompt { file, prompt },
            (None, Some(command), Some(prompt)) => Self::CommandPrompt { command, prompt },
            (Some(file), Some(command), Some(prompt)) => Self::All { file, command, prompt },
        };
        Some(sources)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Command(_) => "command",
            Self::Prompt(_) => "prompt",
            Self::FileCommand { .. } => "file+command",
            Self::FilePrompt { .. } => "file+prompt",
            Self::CommandPrompt { .. } => "command+prompt",
            Self::All { .. } => "file+command+prompt",
        }
    }
}
