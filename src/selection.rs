//! # Endpoint Selection
//!
//! Chooses which of the discovered endpoints to query. The static
//! implementation passes every candidate through; the [`Selection`] seam
//! exists for future policies (random subset, latency-weighted, geographic).

use async_trait::async_trait;

use crate::Result;
use crate::config::Endpoint;

/// Applies a selection policy to candidate endpoints.
#[async_trait]
pub trait Selection: Send + Sync {
    /// Choose a subset of the candidate endpoints for querying. Must not
    /// mutate the candidates it keeps.
    async fn select(&self, domain: &str, endpoints: Vec<Endpoint>) -> Result<Vec<Endpoint>>;
}

/// Selects every discovered endpoint, unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct StaticSelection;

#[async_trait]
impl Selection for StaticSelection {
    async fn select(&self, _domain: &str, endpoints: Vec<Endpoint>) -> Result<Vec<Endpoint>> {
        Ok(endpoints)
    }
}
