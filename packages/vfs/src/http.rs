//! HTTP archive source.
//!
//! Fetches archive bytes from a base URL with a blocking client. This runs
//! only during initialization, before the toolchain starts, so a blocking
//! fetch is acceptable.

use reqwest::blocking::Client;
use url::Url;

use crate::error::TransportError;
use crate::loader::ArchiveSource;

/// An [`ArchiveSource`] that fetches `{base_url}/{name}` over HTTP.
pub struct HttpSource {
    client: Client,
    base_url: Url,
}

impl HttpSource {
    /// Create a source rooted at the given base URL.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let base_url = Url::parse(base_url).map_err(|e| TransportError::new(base_url, e))?;
        Ok(Self {
            client: Client::new(),
            base_url,
        })
    }

    /// Create a source with a custom reqwest client.
    pub fn with_client(client: Client, base_url: &str) -> Result<Self, TransportError> {
        let base_url = Url::parse(base_url).map_err(|e| TransportError::new(base_url, e))?;
        Ok(Self { client, base_url })
    }
}

impl ArchiveSource for HttpSource {
    fn fetch(&mut self, name: &str) -> Result<Vec<u8>, TransportError> {
        let url = self
            .base_url
            .join(name)
            .map_err(|e| TransportError::new(name, e))?;
        let response = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| TransportError::new(name, e))?;
        let bytes = response.bytes().map_err(|e| TransportError::new(name, e))?;
        Ok(bytes.to_vec())
    }
}
