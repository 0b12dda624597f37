//! Registry transport port definition.

use crate::domain::RegistryError;

/// One network operation against a module registry.
///
/// Implementations perform a single attempt; retries live in the client.
pub trait RegistryTransport {
    /// Raw version list for `module_path` (`<host>/<path>`), one version per line.
    fn list_versions(&self, module_path: &str) -> Result<Vec<String>, RegistryError>;

    /// Bundle archive bytes for `module_path` at `version`.
    fn download(&self, module_path: &str, version: &str) -> Result<Vec<u8>, RegistryError>;
}
