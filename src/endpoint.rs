//! # Endpoint Service
//!
//! Composes discovery and selection into a single `domain -> endpoints`
//! operation.

use std::sync::Arc;

use crate::Result;
use crate::config::Endpoint;
use crate::discovery::Discovery;
use crate::selection::Selection;

/// Resolves a consortium domain to the set of endpoints to query.
pub struct EndpointService {
    discovery: Arc<dyn Discovery>,
    selection: Arc<dyn Selection>,
}

impl EndpointService {
    /// Create an endpoint service from a discovery and a selection service.
    #[must_use]
    pub fn new(discovery: Arc<dyn Discovery>, selection: Arc<dyn Selection>) -> Self {
        Self { discovery, selection }
    }

    /// Discover and select the endpoints for `domain`. Errors from either
    /// stage propagate verbatim.
    ///
    /// # Errors
    /// Will return an error if discovery or selection fails.
    pub async fn get_endpoints(&self, domain: &str) -> Result<Vec<Endpoint>> {
        let candidates = self.discovery.endpoints(domain).await?;
        self.selection.select(domain, candidates).await
    }
}
