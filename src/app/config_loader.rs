//! Layer discovery: project, user, and imported bundles.

use std::env;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use url::Url;

use crate::adapters::files::read_layer_dir;
use crate::adapters::registry::{
    CancelSignal, HttpRegistryTransport, ModuleCache, RegistryClient, RetryPolicy,
};
use crate::domain::config::load;
use crate::domain::{
    AppError, ConfigLayer, FetchedModule, LayerKind, MergedConfig, ModuleRef, RegistryError,
};

/// Project configuration directory name.
pub const LOCAL_DIR: &str = ".kickoff";
pub const CONFIG_DIR_ENV: &str = "KICKOFF_CONFIG_DIR";
pub const CACHE_DIR_ENV: &str = "KICKOFF_CACHE_DIR";
pub const REGISTRY_ENV: &str = "KICKOFF_REGISTRY";

/// Where each layer is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub project_dir: PathBuf,
    pub local_dir: PathBuf,
    pub global_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
}

impl ConfigPaths {
    /// Standard locations for `project_dir`, honoring the directory overrides.
    pub fn discover(project_dir: &Path) -> Self {
        let global_dir =
            env_dir(CONFIG_DIR_ENV).or_else(|| dirs::config_dir().map(|d| d.join("kickoff")));
        let cache_dir = env_dir(CACHE_DIR_ENV)
            .or_else(|| dirs::cache_dir().map(|d| d.join("kickoff").join("modules")));
        Self {
            project_dir: project_dir.to_path_buf(),
            local_dir: project_dir.join(LOCAL_DIR),
            global_dir,
            cache_dir,
        }
    }
}

fn env_dir(name: &str) -> Option<PathBuf> {
    env::var_os(name).filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// Global and local layers, whichever exist. Relative files in the local layer
/// resolve against the project directory.
pub fn read_user_layers(paths: &ConfigPaths) -> Result<Vec<ConfigLayer>, AppError> {
    let mut layers = Vec::new();
    if let Some(global) = &paths.global_dir
        && let Some(layer) = read_layer_dir(LayerKind::Global, global, global)?
    {
        layers.push(layer);
    }
    if let Some(layer) = read_layer_dir(LayerKind::Local, &paths.local_dir, &paths.project_dir)? {
        layers.push(layer);
    }
    Ok(layers)
}

/// Imports declared by the local and global layers, local first, without repeats.
pub fn declared_imports(layers: &[ConfigLayer]) -> Vec<String> {
    let mut imports: Vec<String> = Vec::new();
    for kind in [LayerKind::Local, LayerKind::Global] {
        for layer in layers.iter().filter(|l| l.kind() == kind) {
            for import in &layer.tree().settings.imports {
                if !imports.contains(import) {
                    imports.push(import.clone());
                }
            }
        }
    }
    imports
}

/// Registry base URL: `KICKOFF_REGISTRY`, else the closest layer's `settings.registry`.
pub fn registry_base(layers: &[ConfigLayer]) -> Result<Option<Url>, AppError> {
    if let Some(raw) = env::var(REGISTRY_ENV).ok().filter(|v| !v.trim().is_empty()) {
        let url = Url::parse(raw.trim()).map_err(|e| {
            AppError::InvalidConfig(format!("{} is not a valid URL: {}", REGISTRY_ENV, e))
        })?;
        return Ok(Some(url));
    }
    Ok([LayerKind::Local, LayerKind::Global].iter().find_map(|kind| {
        layers
            .iter()
            .filter(|l| l.kind() == *kind)
            .find_map(|l| l.tree().settings.registry.clone())
    }))
}

/// Registry client for `layers`, caching under `paths.cache_dir`.
pub fn registry_client(
    paths: &ConfigPaths,
    layers: &[ConfigLayer],
    cancel: CancelSignal,
) -> Result<RegistryClient, AppError> {
    let cache_dir = paths.cache_dir.clone().ok_or_else(|| {
        AppError::config_error(format!(
            "No cache directory available for modules. Set {}.",
            CACHE_DIR_ENV
        ))
    })?;
    let transport = HttpRegistryTransport::new(registry_base(layers)?)?;
    Ok(RegistryClient::new(
        Box::new(transport),
        ModuleCache::new(cache_dir),
        RetryPolicy::default(),
        cancel,
    ))
}

/// One layer per import.
///
/// A cached bundle is used as is unless `refresh` is set; otherwise the
/// registry is asked. A transport failure falls back to any cached bundle.
pub fn import_layers(
    imports: &[String],
    client: &RegistryClient,
    refresh: bool,
) -> Result<Vec<ConfigLayer>, AppError> {
    imports.iter().map(|import| import_layer(import, client, refresh)).collect()
}

fn import_layer(
    import: &str,
    client: &RegistryClient,
    refresh: bool,
) -> Result<ConfigLayer, AppError> {
    let module = ModuleRef::parse(import)?;

    if !refresh && let Some(cached) = client.cache().lookup(&module) {
        debug!(module = %cached.reference, "using cached bundle");
        return bundle_layer(LayerKind::Cache, &cached);
    }

    match client.fetch(&module) {
        Ok(fetched) => bundle_layer(LayerKind::Registry, &fetched),
        Err(err @ RegistryError::Transport { .. }) => match client.cache().lookup(&module) {
            Some(cached) => {
                warn!(module = %module, error = %err, "registry unreachable; using cached bundle");
                bundle_layer(LayerKind::Cache, &cached)
            }
            None => Err(err.into()),
        },
        Err(err) => Err(err.into()),
    }
}

fn bundle_layer(kind: LayerKind, module: &FetchedModule) -> Result<ConfigLayer, AppError> {
    read_layer_dir(kind, &module.location, &module.location)?.ok_or_else(|| {
        AppError::config_error(format!(
            "Bundle {} is missing at {}",
            module.reference,
            module.location.display()
        ))
    })
}

/// Read every layer and merge them.
pub fn load_config(
    paths: &ConfigPaths,
    refresh: bool,
    cancel: CancelSignal,
) -> Result<MergedConfig, AppError> {
    let mut layers = read_user_layers(paths)?;
    let imports = declared_imports(&layers);
    if !imports.is_empty() {
        let client = registry_client(paths, &layers, cancel)?;
        layers.extend(import_layers(&imports, &client, refresh)?);
    }
    load(layers)
}
