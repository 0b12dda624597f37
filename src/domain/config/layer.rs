use std::fmt;
use std::path::Path;

use super::tree::ConfigTree;

/// Where a layer came from. Declaration order is merge order: later variants
/// sit closer to the working directory and win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerKind {
    /// Bundle fetched from the registry during this invocation.
    Registry,
    /// Bundle already materialized in the module cache.
    Cache,
    /// User-wide configuration directory.
    Global,
    /// Project configuration directory.
    Local,
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LayerKind::Registry => "registry",
            LayerKind::Cache => "cache",
            LayerKind::Global => "global",
            LayerKind::Local => "local",
        };
        f.write_str(label)
    }
}

/// One parsed configuration source. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLayer {
    kind: LayerKind,
    source: String,
    tree: ConfigTree,
}

impl ConfigLayer {
    /// Build a layer, anchoring relative `file` paths of its entries at `base_dir`.
    pub fn new(
        kind: LayerKind,
        source: impl Into<String>,
        base_dir: &Path,
        mut tree: ConfigTree,
    ) -> Self {
        tree.anchor_files(base_dir);
        Self { kind, source: source.into(), tree }
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    /// Human-readable origin, e.g. the directory the layer was read from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tree(&self) -> &ConfigTree {
        &self.tree
    }
}
