//! Filesystem access: entry assets and configuration directories.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::{AppError, ConfigLayer, ConfigTree, LayerKind};
use crate::ports::AssetReader;

/// Reads entry files straight from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsAssetReader;

impl AssetReader for FsAssetReader {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

/// `*.toml` files directly inside `dir`, in lexical order.
pub fn config_files(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "toml") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Read every configuration file of `dir` into one layer.
///
/// Returns `None` when the directory does not exist. Relative `file` paths in
/// the layer resolve against `base_dir`. A name defined in two files of the
/// same directory is an error.
pub fn read_layer_dir(
    kind: LayerKind,
    dir: &Path,
    base_dir: &Path,
) -> Result<Option<ConfigLayer>, AppError> {
    if !dir.is_dir() {
        return Ok(None);
    }

    let source = dir.display().to_string();
    let mut tree = ConfigTree::default();
    for file in config_files(dir)? {
        debug!(layer = %kind, file = %file.display(), "reading configuration file");
        let content = fs::read_to_string(&file)?;
        let parsed = ConfigTree::parse(&content, &file.display().to_string())?;
        tree.absorb_sibling(parsed, &source)?;
    }

    Ok(Some(ConfigLayer::new(kind, source, base_dir, tree)))
}
