//! # Resolver
//!
//! The public entry point for `did:trustbloc` resolution, and the consortium
//! validation protocol behind it.
//!
//! The first read for a domain validates the consortium governing it:
//! endorsement quorum over the consortium file, stakeholder self-signatures,
//! and DID configuration domain bindings. Successful validation is cached
//! for the lifetime of the resolver; concurrent reads for the same domain
//! converge on a single validation attempt.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::config::http::HttpConfig;
use crate::config::signature::{self, SignatureConfig};
use crate::config::{ConfigService, ConsortiumData, Stakeholder, StakeholderData};
use crate::didconfig::{DidConfigService, HttpDidConfig};
use crate::discovery::{Discovery, StaticDiscovery};
use crate::document::Document;
use crate::endpoint::EndpointService;
use crate::jose::Jwk;
use crate::selection::{Selection, StaticSelection};
use crate::{Error, Result};

/// The DID method name this resolver accepts by default.
pub const DEFAULT_METHOD: &str = "trustbloc";

/// Reads a DID document from a single resolution endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Resolve `did` at `endpoint`.
    async fn read(&self, endpoint: &str, did: &str) -> Result<Document>;
}

/// Transport calling the `GET <endpoint>/identifiers/<did>` resolution API.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport over the given client.
    #[must_use]
    pub const fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn read(&self, endpoint: &str, did: &str) -> Result<Document> {
        if endpoint.is_empty() {
            return Err(Error::InvalidInput("empty url".to_string()));
        }
        let base = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", endpoint.trim_end_matches('/'))
        };
        let url = format!("{base}/identifiers/{did}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::EndpointRead(format!("resolving {did} at {url}: {e}")))?;
        if !response.status().is_success() {
            return Err(Error::EndpointRead(format!(
                "resolving {did} at {url}: status {}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| Error::EndpointRead(format!("parsing DID document from {url}: {e}")))
    }
}

/// Resolves `did:trustbloc` DIDs against a validated consortium.
pub struct Resolver {
    method: String,
    resolver_url: Option<String>,
    config: Arc<dyn ConfigService>,
    endpoints: EndpointService,
    did_config: Arc<dyn DidConfigService>,
    transport: Arc<dyn Transport>,
    validated: DashMap<String, bool>,
    validating: DashMap<String, Arc<Mutex<()>>>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    /// Create a resolver with default options and services.
    #[must_use]
    pub fn new() -> Self {
        ResolverBuilder::default().assemble(reqwest::Client::new())
    }

    /// Create a builder to customize options or substitute services.
    #[must_use]
    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::default()
    }

    /// Returns true iff `method` is the DID method this resolver handles.
    #[must_use]
    pub fn accept(&self, method: &str) -> bool {
        method == self.method
    }

    /// Creating DIDs is not supported by this resolver.
    ///
    /// # Errors
    /// Always returns [`Error::Unsupported`].
    pub fn build(&self) -> Result<Document> {
        Err(Error::Unsupported)
    }

    /// Storing DID documents is a no-op for this resolver.
    ///
    /// # Errors
    /// Never fails.
    pub fn store(&self, _doc: &Document) -> Result<()> {
        Ok(())
    }

    /// Release resolver resources. Clears the validated-domain cache; the
    /// next read for any domain revalidates its consortium.
    pub fn close(&self) {
        self.validated.clear();
    }

    /// Resolve a DID to its document.
    ///
    /// The consortium governing the DID's domain is validated on the first
    /// read for that domain. Every selected endpoint is then queried
    /// concurrently and the results must agree canonically.
    ///
    /// # Errors
    /// Will return an error if the DID is malformed, consortium validation
    /// fails, no endpoints are available, any endpoint read fails, or the
    /// endpoints disagree.
    pub async fn read(&self, did: &str) -> Result<Document> {
        // Fixed resolver URL bypasses the consortium path (test/admin use).
        if let Some(url) = &self.resolver_url {
            if url.is_empty() {
                return Err(Error::InvalidInput("empty url".to_string()));
            }
            return self.transport.read(url, did).await;
        }

        let domain = parse_did(did)?;
        if !self.validated.contains_key(&domain) {
            self.validate_domain(&domain).await?;
        }

        let endpoints = self.endpoints.get_endpoints(&domain).await?;
        if endpoints.is_empty() {
            return Err(Error::NoEndpoints);
        }

        let reads = endpoints.iter().map(|endpoint| self.transport.read(&endpoint.url, did));
        let mut docs = futures::future::try_join_all(reads).await?;

        let canonical = canonical_bytes(&docs[0])?;
        for doc in &docs[1..] {
            if canonical_bytes(doc)? != canonical {
                return Err(Error::Mismatch);
            }
        }
        Ok(docs.swap_remove(0))
    }

    /// Validate the consortium published at `url`.
    ///
    /// Verifies the endorsement quorum over the consortium file, then for
    /// each endorsing member: the stakeholder file's self-signature, the
    /// member's co-signature on the consortium, and the DID configuration
    /// binding the member's DID to its domain.
    ///
    /// # Errors
    /// Will return an error if any link in the trust chain fails.
    pub async fn validate_consortium(&self, url: &str) -> Result<ConsortiumData> {
        let data = match self.config.consortium(url, url).await {
            Ok(data) => data,
            Err(Error::QuorumFailure(errors)) => return Err(Error::QuorumFailure(errors)),
            Err(e) => return Err(Error::ConfigFetch(format!("consortium invalid: {e}"))),
        };

        let endorsers = signature::endorsing_members(&data)?;
        for index in endorsers {
            let member = &data.config.members[index];
            let stakeholder = self
                .config
                .stakeholder(&member.domain, &member.domain)
                .await
                .map_err(|e| Error::ConfigFetch(format!("failed to fetch stakeholders: {e}")))?;
            self.verify_stakeholder(&data, &stakeholder).await?;
        }
        Ok(data)
    }

    /// Validate `domain` exactly once across concurrent callers. The first
    /// caller performs the work; the rest await the same attempt. A failed
    /// attempt leaves the domain unvalidated so the next caller retries.
    async fn validate_domain(&self, domain: &str) -> Result<()> {
        let guard = {
            let entry = self.validating.entry(domain.to_string()).or_default();
            Arc::clone(entry.value())
        };
        let _flight = guard.lock().await;

        if self.validated.contains_key(domain) {
            return Ok(());
        }

        tracing::debug!("validating consortium for domain {domain}");
        self.validate_consortium(domain).await?;
        self.validated.insert(domain.to_string(), true);
        self.validating.remove(domain);
        tracing::debug!("domain {domain} validated");
        Ok(())
    }

    async fn verify_stakeholder(
        &self, consortium: &ConsortiumData, stakeholder: &StakeholderData,
    ) -> Result<()> {
        let config = &stakeholder.config;
        let member = consortium
            .config
            .members
            .iter()
            .find(|m| m.domain == config.domain)
            .ok_or_else(|| {
                Error::StakeholderBinding(format!(
                    "stakeholder {} is not a consortium member",
                    config.domain
                ))
            })?;
        let jwk: Jwk = serde_json::from_value(member.public_key.jwk.clone()).map_err(|_| {
            Error::StakeholderBinding(format!("bad key for stakeholder: {}", member.domain))
        })?;

        if !stakeholder.jws.as_ref().is_some_and(|jws| jws.verify(&jwk).is_ok()) {
            return Err(Error::StakeholderBinding(format!(
                "stakeholder {} does not sign itself",
                config.domain
            )));
        }
        if !consortium.jws.as_ref().is_some_and(|jws| jws.verify(&jwk).is_ok()) {
            return Err(Error::StakeholderBinding(format!(
                "stakeholder {} does not sign consortium",
                config.domain
            )));
        }

        let doc = self.resolve_stakeholder_did(config).await?;
        self.did_config.verify_stakeholder(&config.domain, &doc).await
    }

    /// Resolve a stakeholder's DID at any one of its own endpoints.
    async fn resolve_stakeholder_did(&self, stakeholder: &Stakeholder) -> Result<Document> {
        let mut last_error = Error::EndpointRead("stakeholder has no endpoints".to_string());
        for endpoint in &stakeholder.endpoints {
            match self.transport.read(endpoint, &stakeholder.did).await {
                Ok(doc) => return Ok(doc),
                Err(e) => last_error = e,
            }
        }
        Err(Error::EndpointRead(format!("can't resolve stakeholder DID: {last_error}")))
    }
}

fn canonical_bytes(doc: &Document) -> Result<Vec<u8>> {
    doc.canonicalize()
        .map_err(|e| Error::EndpointRead(format!("can't canonicalize resolved document: {e}")))
}

/// Extract the consortium domain from a DID of the form
/// `did:<method>:<domain>:<suffix>`.
fn parse_did(did: &str) -> Result<String> {
    let parts: Vec<&str> = did.split(':').collect();
    if parts.len() != 4 || parts[0] != "did" || parts[1..].iter().any(|part| part.is_empty()) {
        return Err(Error::InvalidInput(format!("wrong did {did}")));
    }
    Ok(parts[2].to_string())
}

/// Configures and assembles a [`Resolver`].
///
/// Every collaborating service can be substituted, so the resolver is fully
/// testable without the network.
#[derive(Default)]
pub struct ResolverBuilder {
    method: Option<String>,
    resolver_url: Option<String>,
    auth_token: Option<String>,
    root_certificate: Option<reqwest::Certificate>,
    accept_invalid_certs: bool,
    config: Option<Arc<dyn ConfigService>>,
    discovery: Option<Arc<dyn Discovery>>,
    selection: Option<Arc<dyn Selection>>,
    did_config: Option<Arc<dyn DidConfigService>>,
    transport: Option<Arc<dyn Transport>>,
}

impl ResolverBuilder {
    /// Override the DID method name the resolver accepts.
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Bypass the consortium path and send every read to this URL. For
    /// test and admin use.
    #[must_use]
    pub fn resolver_url(mut self, url: impl Into<String>) -> Self {
        self.resolver_url = Some(url.into());
        self
    }

    /// Bearer token added to all outbound HTTP requests.
    #[must_use]
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Additional root certificate for the HTTP client.
    #[must_use]
    pub fn root_certificate(mut self, certificate: reqwest::Certificate) -> Self {
        self.root_certificate = Some(certificate);
        self
    }

    /// Disable TLS certificate verification. For test use only.
    #[must_use]
    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Substitute the config service.
    #[must_use]
    pub fn config_service(mut self, config: Arc<dyn ConfigService>) -> Self {
        self.config = Some(config);
        self
    }

    /// Substitute the discovery service.
    #[must_use]
    pub fn discovery(mut self, discovery: Arc<dyn Discovery>) -> Self {
        self.discovery = Some(discovery);
        self
    }

    /// Substitute the selection service.
    #[must_use]
    pub fn selection(mut self, selection: Arc<dyn Selection>) -> Self {
        self.selection = Some(selection);
        self
    }

    /// Substitute the DID configuration service.
    #[must_use]
    pub fn did_config_service(mut self, did_config: Arc<dyn DidConfigService>) -> Self {
        self.did_config = Some(did_config);
        self
    }

    /// Substitute the per-endpoint transport.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the resolver.
    ///
    /// # Errors
    /// Will return an error if the auth token is not a valid header value or
    /// the HTTP client cannot be constructed.
    pub fn build(self) -> Result<Resolver> {
        let client = self.client()?;
        Ok(self.assemble(client))
    }

    fn client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(certificate) = &self.root_certificate {
            builder = builder.add_root_certificate(certificate.clone());
        }
        if self.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if let Some(token) = &self.auth_token {
            let mut value = reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| Error::InvalidInput(format!("invalid auth token: {e}")))?;
            value.set_sensitive(true);
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert(reqwest::header::AUTHORIZATION, value);
            builder = builder.default_headers(headers);
        }
        builder.build().map_err(|e| Error::InvalidInput(format!("building http client: {e}")))
    }

    fn assemble(self, client: reqwest::Client) -> Resolver {
        let config = self.config.unwrap_or_else(|| {
            Arc::new(SignatureConfig::new(Arc::new(HttpConfig::new(client.clone()))))
                as Arc<dyn ConfigService>
        });
        let discovery = self.discovery.unwrap_or_else(|| {
            Arc::new(StaticDiscovery::new(Arc::clone(&config))) as Arc<dyn Discovery>
        });
        let selection = self
            .selection
            .unwrap_or_else(|| Arc::new(StaticSelection) as Arc<dyn Selection>);
        let did_config = self.did_config.unwrap_or_else(|| {
            Arc::new(HttpDidConfig::new(client.clone())) as Arc<dyn DidConfigService>
        });
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(HttpTransport::new(client)) as Arc<dyn Transport>);

        Resolver {
            method: self.method.unwrap_or_else(|| DEFAULT_METHOD.to_string()),
            resolver_url: self.resolver_url,
            config,
            endpoints: EndpointService::new(discovery, selection),
            did_config,
            transport,
            validated: DashMap::new(),
            validating: DashMap::new(),
        }
    }
}
