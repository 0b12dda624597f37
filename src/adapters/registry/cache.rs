//! On-disk cache of unpacked module bundles.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use semver::Version;
use tar::{Archive, EntryType};
use tracing::{debug, warn};

use crate::domain::{FetchedModule, ModuleRef, RegistryError};

/// Written last; a bundle directory without it is ignored.
const COMPLETE_MARKER: &str = ".complete";

/// Bundles live at `<root>/<host>/<path>@v<version>/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleCache {
    root: PathBuf,
}

impl ModuleCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bundle_dir(&self, path: &str, version: &Version) -> PathBuf {
        self.root.join(format!("{}@v{}", path, version))
    }

    /// The newest complete cached bundle satisfying `reference`.
    pub fn lookup(&self, reference: &ModuleRef) -> Option<FetchedModule> {
        let available = self.cached_versions(reference.path());
        let version = reference.select_latest(&available).ok()?;
        let location = self.bundle_dir(reference.path(), &version);
        Some(FetchedModule {
            reference: reference.with_version(version.clone()),
            version: format!("v{}", version),
            location,
        })
    }

    fn cached_versions(&self, module_path: &str) -> Vec<String> {
        let module_dir = self.root.join(module_path);
        let (Some(parent), Some(name)) = (module_dir.parent(), module_dir.file_name()) else {
            return Vec::new();
        };
        let prefix = format!("{}@", name.to_string_lossy());
        let Ok(entries) = fs::read_dir(parent) else {
            return Vec::new();
        };

        entries
            .filter_map(Result::ok)
            .filter(|entry| entry.path().join(COMPLETE_MARKER).is_file())
            .filter_map(|entry| {
                let file_name = entry.file_name().to_string_lossy().into_owned();
                file_name.strip_prefix(&prefix).map(String::from)
            })
            .collect()
    }

    /// Unpack a `.tar.gz` bundle for a concrete reference and mark it complete.
    ///
    /// The archive is extracted next to its final location and renamed into
    /// place, so readers never see a partial bundle.
    pub fn store(
        &self,
        reference: &ModuleRef,
        version: &Version,
        archive: &[u8],
    ) -> Result<PathBuf, RegistryError> {
        let unpack_error = |details: String| RegistryError::Unpack {
            module: format!("{}@v{}", reference.path(), version),
            details,
        };

        let target = self.bundle_dir(reference.path(), version);
        let parent = target
            .parent()
            .ok_or_else(|| unpack_error("cache path has no parent".to_string()))?;
        fs::create_dir_all(parent).map_err(|e| unpack_error(e.to_string()))?;

        let staging = parent.join(format!(
            ".{}.partial-{}",
            target.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
            std::process::id()
        ));
        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(|e| unpack_error(e.to_string()))?;
        }
        fs::create_dir_all(&staging).map_err(|e| unpack_error(e.to_string()))?;

        let result = unpack(archive, &staging)
            .and_then(|()| fs::write(staging.join(COMPLETE_MARKER), version.to_string()))
            .and_then(|()| {
                if target.exists() {
                    fs::remove_dir_all(&target)?;
                }
                fs::rename(&staging, &target)
            });

        if let Err(err) = result {
            let _ = fs::remove_dir_all(&staging);
            return Err(unpack_error(err.to_string()));
        }
        debug!(location = %target.display(), "stored module bundle");
        Ok(target)
    }
}

/// Extract regular files and directories; links are skipped and entries that
/// would land outside `dest` are refused.
fn unpack(archive: &[u8], dest: &Path) -> io::Result<()> {
    let mut archive = Archive::new(GzDecoder::new(archive));
    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_type = entry.header().entry_type();
        if matches!(entry_type, EntryType::Symlink | EntryType::Link) {
            warn!(path = %entry.path()?.display(), "skipping link in module bundle");
            continue;
        }
        if !entry.unpack_in(dest)? {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("entry escapes bundle root: {}", entry.path()?.display()),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;

    pub(crate) fn bundle(files: &[(&str, &str)]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (path, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, content.as_bytes()).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn gzip_tar(write_entries: impl FnOnce(&mut tar::Builder<GzEncoder<Vec<u8>>>)) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        write_entries(&mut builder);
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn append_file(builder: &mut tar::Builder<GzEncoder<Vec<u8>>>, path: &str, content: &str) {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, content.as_bytes()).unwrap();
    }

    fn module(reference: &str) -> ModuleRef {
        ModuleRef::parse(reference).unwrap()
    }

    #[test]
    fn stores_and_finds_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ModuleCache::new(dir.path());
        let archive =
            bundle(&[("kickoff.toml", "[roles.dev]\nprompt = \"x\"\n"), ("docs/a.md", "A")]);

        let location = cache
            .store(&module("example.com/prompts"), &Version::new(0, 1, 0), &archive)
            .unwrap();

        assert_eq!(location, dir.path().join("example.com/prompts@v0.1.0"));
        assert!(location.join("kickoff.toml").is_file());
        assert_eq!(fs::read_to_string(location.join("docs/a.md")).unwrap(), "A");

        let found = cache.lookup(&module("example.com/prompts@v0")).unwrap();
        assert_eq!(found.version, "v0.1.0");
        assert_eq!(found.location, location);
        assert!(found.reference.is_concrete());
    }

    #[test]
    fn lookup_picks_newest_matching_complete_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ModuleCache::new(dir.path());
        let archive = bundle(&[("a.toml", "")]);
        for version in [Version::new(0, 1, 0), Version::new(0, 2, 0), Version::new(1, 0, 0)] {
            cache.store(&module("example.com/prompts"), &version, &archive).unwrap();
        }
        fs::create_dir_all(dir.path().join("example.com/prompts@v0.9.0")).unwrap();

        let found = cache.lookup(&module("example.com/prompts@v0")).unwrap();
        assert_eq!(found.version, "v0.2.0");

        assert!(cache.lookup(&module("example.com/prompts@v2")).is_none());
        assert!(cache.lookup(&module("example.com/other@v0")).is_none());
    }

    #[test]
    fn corrupt_archive_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ModuleCache::new(dir.path());

        let err = cache
            .store(&module("example.com/prompts"), &Version::new(0, 1, 0), b"not a gzip stream")
            .unwrap_err();

        assert!(matches!(err, RegistryError::Unpack { .. }));
        let leftovers: Vec<_> =
            fs::read_dir(dir.path().join("example.com")).unwrap().filter_map(Result::ok).collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn links_in_bundles_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ModuleCache::new(dir.path());
        let archive = gzip_tar(|builder| {
            append_file(builder, "kickoff.toml", "");
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(EntryType::Symlink);
            header.set_size(0);
            header.set_mode(0o777);
            header.set_link_name("/etc/passwd").unwrap();
            header.set_cksum();
            builder.append_data(&mut header, "passwd", io::empty()).unwrap();
        });

        let location =
            cache.store(&module("example.com/prompts"), &Version::new(0, 1, 0), &archive).unwrap();

        assert!(location.join("kickoff.toml").is_file());
        assert!(fs::symlink_metadata(location.join("passwd")).is_err());
    }

    #[test]
    fn entries_escaping_the_bundle_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ModuleCache::new(dir.path().join("modules"));
        let archive = gzip_tar(|builder| {
            append_file(builder, "kickoff.toml", "");
            let content = b"outside";
            let mut header = tar::Header::new_gnu();
            let name = b"../../escape.txt";
            header.as_gnu_mut().unwrap().name[..name.len()].copy_from_slice(name);
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append(&header, &content[..]).unwrap();
        });

        let err = cache
            .store(&module("example.com/prompts"), &Version::new(0, 1, 0), &archive)
            .unwrap_err();

        assert!(matches!(err, RegistryError::Unpack { .. }), "got {err:?}");
        assert!(!dir.path().join("escape.txt").exists());
        assert!(!dir.path().join("modules/escape.txt").exists());
        assert!(cache.lookup(&module("example.com/prompts@v0")).is_none());
    }
}
