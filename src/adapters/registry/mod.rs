mod cache;
mod cancel;
mod client;
mod http;

pub use cache::ModuleCache;
pub use cancel::CancelSignal;
pub use client::{RegistryClient, RetryPolicy};
pub use http::HttpRegistryTransport;

#[cfg(test)]
pub(crate) use cache::tests::bundle;
