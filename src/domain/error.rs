use std::io;

use thiserror::Error;

use super::config::EntryKind;
use super::utd::ResolveError;

/// Library-wide error type for kickoff operations.
#[derive(Debug, Error)]
pub enum AppError {
    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Configuration or environment issue.
    #[error("{0}")]
    Configuration(String),

    /// A configuration value failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configuration file could not be parsed against the schema.
    #[error("Failed to parse {path}: {details}")]
    ConfigParse { path: String, details: String },

    /// The same entry name appears twice within one layer.
    #[error("{kind} '{name}' is defined more than once in {layer}")]
    DuplicateEntry { kind: EntryKind, name: String, layer: String },

    /// A named entry does not exist in the merged configuration.
    #[error("{kind} '{name}' not found")]
    EntryNotFound { kind: EntryKind, name: String },

    /// A task names a role or agent that is not defined anywhere.
    #[error("Task '{task}' references unknown {kind} '{name}'")]
    UnknownReference { task: String, kind: EntryKind, name: String },

    /// An entry could not be resolved into text.
    #[error("Failed to resolve {kind} '{name}': {source}")]
    Resolution {
        kind: EntryKind,
        name: String,
        #[source]
        source: ResolveError,
    },

    /// No agent was selected and none is configured as default.
    #[error("No agent selected. Pass --agent or set settings.default_agent.")]
    NoAgentSelected,

    /// The agent command template could not be rendered or started.
    #[error("Agent '{agent}' could not be started: {details}")]
    AgentLaunch { agent: String, details: String },

    /// Remote module registry failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl AppError {
    pub fn config_error<S: Into<String>>(message: S) -> Self {
        AppError::Configuration(message.into())
    }

    /// Provide an `io::ErrorKind`-like view for callers mapping to exit codes.
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            AppError::Io(err) => err.kind(),
            AppError::Configuration(_)
            | AppError::InvalidConfig(_)
            | AppError::ConfigParse { .. }
            | AppError::DuplicateEntry { .. }
            | AppError::UnknownReference { .. }
            | AppError::NoAgentSelected => io::ErrorKind::InvalidInput,
            AppError::EntryNotFound { .. } => io::ErrorKind::NotFound,
            AppError::Resolution { .. } | AppError::AgentLaunch { .. } => io::ErrorKind::Other,
            AppError::Registry(err) => err.kind(),
        }
    }
}

/// Failures talking to, or materializing bundles from, the module registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The module reference string is malformed.
    #[error("Invalid module reference '{reference}': {reason}")]
    InvalidReference { reference: String, reason: String },

    /// The registry lists no version matching the reference.
    #[error("No versions found for {reference}")]
    NoVersions { reference: String },

    /// The registry request failed.
    #[error("Registry request to {url} failed: {message}")]
    Transport { url: String, message: String, status: Option<u16> },

    /// The downloaded bundle could not be unpacked into the cache.
    #[error("Failed to unpack {module}: {details}")]
    Unpack { module: String, details: String },

    /// Retries were abandoned because the caller cancelled.
    #[error("Registry fetch of {reference} cancelled")]
    Cancelled { reference: String },
}

impl RegistryError {
    /// Transport failures worth another attempt: no response, timeouts, rate limits, 5xx.
    pub fn is_retryable(&self) -> bool {
        match self {
            RegistryError::Transport { status: None, .. } => true,
            RegistryError::Transport { status: Some(code), .. } => {
                *code == 408 || *code == 429 || *code >= 500
            }
            _ => false,
        }
    }

    fn kind(&self) -> io::ErrorKind {
        match self {
            RegistryError::InvalidReference { .. } => io::ErrorKind::InvalidInput,
            RegistryError::NoVersions { .. } => io::ErrorKind::NotFound,
            RegistryError::Cancelled { .. } => io::ErrorKind::Interrupted,
            RegistryError::Transport { .. } | RegistryError::Unpack { .. } => io::ErrorKind::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(status: Option<u16>) -> RegistryError {
        RegistryError::Transport {
            url: "https://registry.example/x".to_string(),
            message: "failed".to_string(),
            status,
        }
    }

    #[test]
    fn transient_transport_failures_are_retryable() {
        assert!(transport(None).is_retryable());
        assert!(transport(Some(500)).is_retryable());
        assert!(transport(Some(503)).is_retryable());
        assert!(transport(Some(429)).is_retryable());
        assert!(transport(Some(408)).is_retryable());
    }

    #[test]
    fn client_errors_are_not_retryable() {
        assert!(!transport(Some(404)).is_retryable());
        assert!(!transport(Some(400)).is_retryable());
        assert!(
            !RegistryError::NoVersions { reference: "example.com/p@v0".to_string() }.is_retryable()
        );
    }

    #[test]
    fn unknown_reference_message_names_task() {
        let err = AppError::UnknownReference {
            task: "review".to_string(),
            kind: EntryKind::Role,
            name: "auditor".to_string(),
        };
        assert_eq!(err.to_string(), "Task 'review' references unknown role 'auditor'");
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
