//! Fetch config files over HTTP.
//!
//! Files live in the publisher's well-known directory:
//! `<base>/.well-known/did-trustbloc/<domain>.json`. The response body is a
//! JWS in compact or JSON serialization whose payload is the config JSON.
//! No retries at this layer.

use std::str::FromStr;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::config::{ConfigService, ConsortiumData, SignedConfig, StakeholderData};
use crate::jose::Jws;
use crate::{Error, Result};

const WELL_KNOWN_DIR: &str = ".well-known/did-trustbloc";

/// Fetches and parses config files over a shared HTTP client.
#[derive(Clone, Debug)]
pub struct HttpConfig {
    client: reqwest::Client,
}

impl HttpConfig {
    /// Create a fetcher over the given client.
    #[must_use]
    pub const fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch<T: DeserializeOwned>(
        &self, url: &str, domain: &str, what: &str,
    ) -> Result<SignedConfig<T>> {
        let config_url = config_url(url, domain);
        tracing::debug!("fetching {what} config from {config_url}");

        let response = self
            .client
            .get(&config_url)
            .send()
            .await
            .map_err(|e| Error::ConfigFetch(format!("fetching {what} config from {config_url}: {e}")))?;
        if !response.status().is_success() {
            return Err(Error::ConfigFetch(format!(
                "fetching {what} config from {config_url}: status {}",
                response.status()
            )));
        }
        let body = response
            .text()
            .await
            .map_err(|e| Error::ConfigFetch(format!("reading {what} config from {config_url}: {e}")))?;

        let jws = Jws::from_str(&body)
            .map_err(|e| Error::ConfigFetch(format!("parsing {what} jws: {e}")))?;
        let payload =
            jws.payload().map_err(|e| Error::ConfigFetch(format!("parsing {what} jws: {e}")))?;
        let config = serde_json::from_slice(&payload)
            .map_err(|e| Error::ConfigFetch(format!("parsing {what} config: {e}")))?;

        Ok(SignedConfig { config, jws: Some(jws) })
    }
}

#[async_trait]
impl ConfigService for HttpConfig {
    async fn consortium(&self, url: &str, domain: &str) -> Result<ConsortiumData> {
        self.fetch(url, domain, "consortium").await
    }

    async fn stakeholder(&self, url: &str, domain: &str) -> Result<StakeholderData> {
        self.fetch(url, domain, "stakeholder").await
    }
}

/// Build the well-known config file URL for a domain. A base without a
/// scheme is assumed to be https.
fn config_url(url: &str, domain: &str) -> String {
    let base = if url.starts_with("http://") || url.starts_with("https://") {
        url.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", url.trim_end_matches('/'))
    };
    let name = domain
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    format!("{base}/{WELL_KNOWN_DIR}/{name}.json")
}
