//! Registry client: version resolution, retries, and cached fetches.

use std::time::Duration;

use tracing::{info, warn};

use super::cache::ModuleCache;
use super::cancel::CancelSignal;
use crate::domain::{FetchedModule, ModuleRef, RegistryError};
use crate::ports::RegistryTransport;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_DELAY_MS: u64 = 500;
const DEFAULT_MAX_DELAY_MS: u64 = 8_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms: base_delay_ms.max(1),
            max_delay_ms: DEFAULT_MAX_DELAY_MS.max(base_delay_ms),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn delay_for_retry(&self, failed_attempt: u32) -> Duration {
        // attempt=1 -> base, attempt=2 -> base*2, attempt=3 -> base*4, capped.
        let exponent = failed_attempt.saturating_sub(1).min(6);
        let backoff_ms = self.base_delay_ms.saturating_mul(1_u64 << exponent);
        Duration::from_millis(backoff_ms.min(self.max_delay_ms))
    }
}

pub struct RegistryClient {
    transport: Box<dyn RegistryTransport>,
    cache: ModuleCache,
    policy: RetryPolicy,
    cancel: CancelSignal,
}

impl RegistryClient {
    pub fn new(
        transport: Box<dyn RegistryTransport>,
        cache: ModuleCache,
        policy: RetryPolicy,
        cancel: CancelSignal,
    ) -> Self {
        Self { transport, cache, policy, cancel }
    }

    pub fn cache(&self) -> &ModuleCache {
        &self.cache
    }

    /// Turn an abbreviated reference into a concrete one.
    ///
    /// A concrete reference comes back unchanged without contacting the registry.
    pub fn resolve_latest(&self, reference: &ModuleRef) -> Result<ModuleRef, RegistryError> {
        if reference.is_concrete() {
            return Ok(reference.clone());
        }
        let versions = self.with_retry(reference, "list versions", || {
            self.transport.list_versions(reference.path())
        })?;
        let version = reference.select_latest(&versions)?;
        Ok(reference.with_version(version))
    }

    /// Resolve, download, and unpack a bundle. A bundle already complete in
    /// the cache for the resolved version is reused.
    pub fn fetch(&self, reference: &ModuleRef) -> Result<FetchedModule, RegistryError> {
        let concrete = self.resolve_latest(reference)?;
        if let Some(cached) = self.cache.lookup(&concrete) {
            info!(module = %concrete, "using cached module bundle");
            return Ok(cached);
        }

        let version = concrete.exact_version().cloned().ok_or_else(|| {
            RegistryError::InvalidReference {
                reference: concrete.to_string(),
                reason: "reference did not resolve to a concrete version".to_string(),
            }
        })?;
        let tag = format!("v{}", version);

        info!(module = %concrete, "downloading module bundle");
        let archive = self.with_retry(&concrete, "download", || {
            self.transport.download(concrete.path(), &tag)
        })?;
        let location = self.cache.store(&concrete, &version, &archive)?;

        Ok(FetchedModule { reference: concrete, version: tag, location })
    }

    fn with_retry<T>(
        &self,
        reference: &ModuleRef,
        operation: &str,
        mut call: impl FnMut() -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        let mut attempt = 1;
        loop {
            match call() {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if !error.is_retryable() || attempt >= self.policy.max_attempts {
                        return Err(error);
                    }

                    let delay = self.policy.delay_for_retry(attempt);
                    warn!(
                        module = %reference,
                        operation,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "registry request failed; retrying"
                    );
                    if self.cancel.wait_timeout(delay) {
                        return Err(RegistryError::Cancelled { reference: reference.to_string() });
                    }
                    attempt += 1;
                }
            }
        }
    }
}
