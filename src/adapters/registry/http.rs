//! Registry transport over HTTP using reqwest.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use url::Url;

use crate::domain::RegistryError;
use crate::ports::RegistryTransport;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP transport for a module registry.
///
/// Layout: `<base>/<host>/<path>/@v/list` and `<base>/<host>/<path>/@v/<version>.tar.gz`.
/// Without a base the module host is contacted directly over HTTPS. One
/// request per call; retries happen in [`super::RegistryClient`].
#[derive(Debug, Clone)]
pub struct HttpRegistryTransport {
    base: Option<Url>,
    client: Client,
}

impl HttpRegistryTransport {
    pub fn new(base: Option<Url>) -> Result<Self, RegistryError> {
        Self::with_timeout(base, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base: Option<Url>, timeout: Duration) -> Result<Self, RegistryError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("kickoff/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RegistryError::Transport {
                url: base.as_ref().map(Url::to_string).unwrap_or_default(),
                message: format!("Failed to create HTTP client: {}", e),
                status: None,
            })?;
        Ok(Self { base, client })
    }

    fn url_for(&self, module_path: &str, file: &str) -> Result<Url, RegistryError> {
        let relative = format!("{}/@v/{}", module_path, file);
        let parsed = match &self.base {
            Some(base) => {
                let mut base = base.clone();
                if !base.path().ends_with('/') {
                    let path = format!("{}/", base.path());
                    base.set_path(&path);
                }
                base.join(&relative)
            }
            None => Url::parse(&format!("https://{}", relative)),
        };
        parsed.map_err(|e| RegistryError::InvalidReference {
            reference: module_path.to_string(),
            reason: format!("cannot build registry URL: {}", e),
        })
    }

    fn get(&self, url: &Url) -> Result<reqwest::blocking::Response, RegistryError> {
        self.client.get(url.clone()).send().map_err(|e| RegistryError::Transport {
            url: url.to_string(),
            message: format!("HTTP request failed: {}", e),
            status: None,
        })
    }
}

fn status_error(url: &Url, status: StatusCode) -> RegistryError {
    let message = if status == StatusCode::TOO_MANY_REQUESTS {
        "Rate limited".to_string()
    } else if status.is_server_error() {
        "Server error".to_string()
    } else {
        format!("unexpected status {}", status)
    };
    RegistryError::Transport { url: url.to_string(), message, status: Some(status.as_u16()) }
}

fn body_error(url: &Url, err: reqwest::Error) -> RegistryError {
    RegistryError::Transport {
        url: url.to_string(),
        message: format!("Failed to read response body: {}", err),
        status: None,
    }
}

impl RegistryTransport for HttpRegistryTransport {
    fn list_versions(&self, module_path: &str) -> Result<Vec<String>, RegistryError> {
        let url = self.url_for(module_path, "list")?;
        let response = self.get(&url)?;
        let status = response.status();

        // Unknown modules list nothing.
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(status_error(&url, status));
        }

        let body = response.text().map_err(|e| body_error(&url, e))?;
        Ok(body.lines().map(str::trim).filter(|l| !l.is_empty()).map(String::from).collect())
    }

    fn download(&self, module_path: &str, version: &str) -> Result<Vec<u8>, RegistryError> {
        let url = self.url_for(module_path, &format!("{}.tar.gz", version))?;
        let response = self.get(&url)?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(&url, status));
        }
        let bytes = response.bytes().map_err(|e| body_error(&url, e))?;
        Ok(bytes.to_vec())
    }
}
