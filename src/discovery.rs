//! # Endpoint Discovery
//!
//! Discovers the resolution endpoints available for a consortium domain.
//! The static implementation walks the consortium's member list and collects
//! the endpoints each stakeholder publishes in its own config file.
//! Alternative implementations (dynamic peer discovery, cached registries)
//! share the [`Discovery`] seam.

use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;
use crate::config::{ConfigService, Endpoint};

/// Returns the endpoint URLs contributed by a domain's stakeholders.
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Discover the candidate endpoints for `domain`.
    async fn endpoints(&self, domain: &str) -> Result<Vec<Endpoint>>;
}

/// Discovers endpoints by fetching each consortium member's stakeholder
/// file. Failure to fetch any stakeholder is fatal and propagates.
pub struct StaticDiscovery {
    config: Arc<dyn ConfigService>,
}

impl StaticDiscovery {
    /// Create a discovery service over the given config service.
    #[must_use]
    pub fn new(config: Arc<dyn ConfigService>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Discovery for StaticDiscovery {
    async fn endpoints(&self, domain: &str) -> Result<Vec<Endpoint>> {
        let consortium = self.config.consortium(domain, domain).await?;

        let mut endpoints = Vec::new();
        for member in &consortium.config.members {
            let stakeholder = self.config.stakeholder(&member.domain, &member.domain).await?;
            endpoints.extend(
                stakeholder.config.endpoints.iter().map(|url| Endpoint { url: url.clone() }),
            );
        }
        Ok(endpoints)
    }
}
