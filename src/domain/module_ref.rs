//! Remote module references: `<host>/<path>@<version>`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use semver::Version;

use crate::domain::RegistryError;

/// The version part of a module reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSpec {
    /// No version given: newest available.
    Latest,
    /// `@v1` or `@v1.2`: newest within that major (and minor).
    Prefix { major: u64, minor: Option<u64> },
    /// `@v1.2.3`: exactly this version.
    Exact(Version),
}

impl VersionSpec {
    fn matches(&self, version: &Version) -> bool {
        match self {
            VersionSpec::Latest => true,
            VersionSpec::Prefix { major, minor } => {
                version.major == *major && minor.is_none_or(|m| version.minor == m)
            }
            VersionSpec::Exact(exact) => version == exact,
        }
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSpec::Latest => f.write_str("latest"),
            VersionSpec::Prefix { major, minor: None } => write!(f, "v{}", major),
            VersionSpec::Prefix { major, minor: Some(minor) } => write!(f, "v{}.{}", major, minor),
            VersionSpec::Exact(version) => write!(f, "v{}", version),
        }
    }
}

/// A reference to a published configuration bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRef {
    path: String,
    version: VersionSpec,
}

impl ModuleRef {
    pub fn parse(reference: &str) -> Result<Self, RegistryError> {
        let invalid = |reason: &str| RegistryError::InvalidReference {
            reference: reference.to_string(),
            reason: reason.to_string(),
        };

        let reference = reference.trim();
        let (path, version) = match reference.split_once('@') {
            Some((path, version)) => (path, Some(version)),
            None => (reference, None),
        };

        let path = path.trim_end_matches('/');
        let mut segments = path.split('/');
        let host = segments.next().unwrap_or_default();
        if !host.contains('.') || host.starts_with('.') || host.ends_with('.') {
            return Err(invalid("expected <host>/<path> with a dotted host name"));
        }
        let rest: Vec<&str> = segments.collect();
        if rest.is_empty() {
            return Err(invalid("missing module path after host"));
        }
        let segment_ok = |s: &&str| {
            !s.is_empty()
                && *s != "."
                && *s != ".."
                && s.chars().all(|c| c.is_ascii_alphanumeric() || "-_.~".contains(c))
        };
        if !rest.iter().all(|s| segment_ok(s)) || !segment_ok(&host) {
            return Err(invalid("path segments may contain only letters, digits, and -_.~"));
        }

        let version = match version {
            None | Some("latest") => VersionSpec::Latest,
            Some(raw) => parse_version_spec(raw).map_err(|reason| invalid(&reason))?,
        };

        Ok(Self { path: path.to_string(), version })
    }

    /// `<host>/<path>` without the version.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn version(&self) -> &VersionSpec {
        &self.version
    }

    /// Whether the reference already names one exact version.
    pub fn is_concrete(&self) -> bool {
        matches!(self.version, VersionSpec::Exact(_))
    }

    pub fn exact_version(&self) -> Option<&Version> {
        match &self.version {
            VersionSpec::Exact(version) => Some(version),
            _ => None,
        }
    }

    pub fn with_version(&self, version: Version) -> Self {
        Self { path: self.path.clone(), version: VersionSpec::Exact(version) }
    }

    /// Pick the highest version from `available` that satisfies this reference.
    ///
    /// Release versions win over pre-releases; a pre-release is chosen only
    /// when nothing else matches. Unparseable entries are skipped.
    pub fn select_latest(&self, available: &[String]) -> Result<Version, RegistryError> {
        let candidates: Vec<Version> = available
            .iter()
            .filter_map(|raw| parse_tag(raw.trim()))
            .filter(|version| self.version.matches(version))
            .collect();

        let stable = candidates.iter().filter(|v| v.pre.is_empty()).max();
        stable
            .or_else(|| candidates.iter().max())
            .cloned()
            .ok_or_else(|| RegistryError::NoVersions { reference: self.to_string() })
    }
}

impl FromStr for ModuleRef {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            VersionSpec::Latest => f.write_str(&self.path),
            version => write!(f, "{}@{}", self.path, version),
        }
    }
}

/// A bundle unpacked on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedModule {
    pub reference: ModuleRef,
    /// Tag form, e.g. `v0.1.0`.
    pub version: String,
    pub location: PathBuf,
}

fn parse_tag(raw: &str) -> Option<Version> {
    Version::parse(raw.strip_prefix('v').unwrap_or(raw)).ok()
}

fn parse_version_spec(raw: &str) -> Result<VersionSpec, String> {
    let bare =
        raw.strip_prefix('v').ok_or_else(|| format!("version '{}' must start with 'v'", raw))?;
    let parts: Vec<&str> = bare.splitn(3, '.').collect();
    let number = |s: &str| {
        s.parse::<u64>().map_err(|_| format!("'{}' is not a valid version number", raw))
    };
    match parts.as_slice() {
        [major] => Ok(VersionSpec::Prefix { major: number(major)?, minor: None }),
        [major, minor] => {
            Ok(VersionSpec::Prefix { major: number(major)?, minor: Some(number(minor)?) })
        }
        _ => Version::parse(bare)
            .map(VersionSpec::Exact)
            .map_err(|err| format!("'{}' is not a semantic version: {}", raw, err)),
    }
}
