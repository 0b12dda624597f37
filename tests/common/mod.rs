//! Shared testing utilities for kickoff CLI tests.

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Testing harness providing an isolated environment for CLI exercises.
///
/// Each context owns a project directory, a user configuration directory and
/// a module cache, all under one temporary root.
#[allow(dead_code)]
pub struct TestContext {
    root: TempDir,
    work_dir: PathBuf,
}

#[allow(dead_code)]
impl TestContext {
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp directory for tests");
        let work_dir = root.path().join("work");
        fs::create_dir_all(&work_dir).expect("Failed to create test work directory");
        Self { root, work_dir }
    }

    pub fn home(&self) -> &Path {
        self.root.path()
    }

    /// Project directory used for CLI invocations.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn global_dir(&self) -> PathBuf {
        self.root.path().join("config")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.path().join("cache")
    }

    /// Build a command for the compiled `kickoff` binary inside the project.
    pub fn cli(&self) -> Command {
        let mut cmd = Command::cargo_bin("kickoff").expect("Failed to locate kickoff binary");
        cmd.current_dir(self.work_dir())
            .env("HOME", self.home())
            .env("KICKOFF_CONFIG_DIR", self.global_dir())
            .env("KICKOFF_CACHE_DIR", self.cache_dir())
            .env_remove("KICKOFF_REGISTRY")
            .env_remove("KICKOFF_LOG");
        cmd
    }

    /// Write `.kickoff/<name>` in the project.
    pub fn write_local(&self, name: &str, content: &str) {
        write(&self.work_dir.join(".kickoff").join(name), content);
    }

    /// Write `<name>` in the user configuration directory.
    pub fn write_global(&self, name: &str, content: &str) {
        write(&self.global_dir().join(name), content);
    }

    /// Write a file relative to the project directory.
    pub fn write_project_file(&self, name: &str, content: &str) {
        write(&self.work_dir.join(name), content);
    }
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().expect("path has a parent"))
        .expect("Failed to create parent directory");
    fs::write(path, content).expect("Failed to write test file");
}

/// A `.tar.gz` bundle holding `files`.
#[allow(dead_code)]
pub fn bundle(files: &[(&str, &str)]) -> Vec<u8> {
    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, content.as_bytes()).expect("append bundle entry");
    }
    builder.into_inner().expect("finish tar").finish().expect("finish gzip")
}
