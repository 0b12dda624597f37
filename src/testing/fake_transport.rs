use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::domain::RegistryError;
use crate::ports::RegistryTransport;

/// Transport that replays scripted results and counts calls.
#[derive(Clone, Default)]
pub struct SequenceTransport {
    versions: Arc<Mutex<VecDeque<Result<Vec<String>, RegistryError>>>>,
    downloads: Arc<Mutex<VecDeque<Result<Vec<u8>, RegistryError>>>>,
    list_calls: Arc<Mutex<Vec<String>>>,
    download_calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl SequenceTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_versions(self, result: Result<Vec<&str>, RegistryError>) -> Self {
        let result = result.map(|v| v.into_iter().map(String::from).collect());
        self.versions.lock().unwrap().push_back(result);
        self
    }

    pub fn push_download(self, result: Result<Vec<u8>, RegistryError>) -> Self {
        self.downloads.lock().unwrap().push_back(result);
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.lock().unwrap().len()
    }

    pub fn download_calls(&self) -> Vec<(String, String)> {
        self.download_calls.lock().unwrap().clone()
    }
}

pub fn transport_failure(status: Option<u16>) -> RegistryError {
    RegistryError::Transport {
        url: "https://registry.test/example.com/prompts/@v/list".to_string(),
        message: "scripted failure".to_string(),
        status,
    }
}

impl RegistryTransport for SequenceTransport {
    fn list_versions(&self, module_path: &str) -> Result<Vec<String>, RegistryError> {
        self.list_calls.lock().unwrap().push(module_path.to_string());
        self.versions.lock().unwrap().pop_front().unwrap_or_else(|| Err(transport_failure(None)))
    }

    fn download(&self, module_path: &str, version: &str) -> Result<Vec<u8>, RegistryError> {
        self.download_calls.lock().unwrap().push((module_path.to_string(), version.to_string()));
        self.downloads.lock().unwrap().pop_front().unwrap_or_else(|| Err(transport_failure(None)))
    }
}
