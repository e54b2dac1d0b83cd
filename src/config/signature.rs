//! Signature-verifying config service.
//!
//! Wraps another [`ConfigService`] and enforces the consortium's endorsement
//! policy before returning a consortium file. Stakeholder files pass through
//! untouched; their signatures are checked against the consortium member
//! list during stakeholder verification, not here.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use rand::seq::SliceRandom;

use crate::config::{ConfigService, ConsortiumData, StakeholderData};
use crate::jose::Jwk;
use crate::{Error, Result};

/// Enforces the endorsement quorum on fetched consortium files.
pub struct SignatureConfig {
    inner: Arc<dyn ConfigService>,
}

impl SignatureConfig {
    /// Wrap a config service.
    #[must_use]
    pub fn new(inner: Arc<dyn ConfigService>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ConfigService for SignatureConfig {
    async fn consortium(&self, url: &str, domain: &str) -> Result<ConsortiumData> {
        let data = match self.inner.consortium(url, domain).await {
            Ok(data) => data,
            Err(e) => return Err(Error::ConfigFetch(format!("wrapped config service: {e}"))),
        };
        endorsing_members(&data)?;
        Ok(data)
    }

    async fn stakeholder(&self, url: &str, domain: &str) -> Result<StakeholderData> {
        self.inner.stakeholder(url, domain).await
    }
}

/// Verify the consortium endorsement quorum, returning the indices of the
/// members whose keys produced a valid signature on the envelope.
///
/// Member keys are tried in a fresh random permutation on every call so no
/// stakeholder is privileged by list position; verification stops as soon as
/// the effective quorum is reached. Duplicate keys (same RFC 7638
/// thumbprint) are counted once. A malformed key counts as a failure for
/// that member without aborting the loop.
///
/// # Errors
/// Returns [`Error::QuorumFailure`] enumerating every failing key when fewer
/// than the effective quorum verify. An empty membership is a vacuous
/// success.
pub fn endorsing_members(data: &ConsortiumData) -> Result<Vec<usize>> {
    let members = &data.config.members;
    let quorum = data.config.effective_quorum();
    if quorum == 0 {
        return Ok(Vec::new());
    }

    let mut order: Vec<usize> = (0..members.len()).collect();
    order.shuffle(&mut rand::thread_rng());

    let mut endorsers = Vec::new();
    let mut seen = HashSet::new();
    let mut failures = Vec::new();

    for index in order {
        let member = &members[index];

        let jwk: Jwk = match serde_json::from_value(member.public_key.jwk.clone()) {
            Ok(jwk) => jwk,
            Err(_) => {
                let msg = format!("bad key for stakeholder: {}", member.domain);
                tracing::warn!("{msg}");
                failures.push(msg);
                continue;
            }
        };
        let thumbprint = match jwk.thumbprint() {
            Ok(thumbprint) => thumbprint,
            Err(_) => {
                let msg = format!("bad key for stakeholder: {}", member.domain);
                tracing::warn!("{msg}");
                failures.push(msg);
                continue;
            }
        };
        if !seen.insert(thumbprint) {
            continue;
        }

        let verified = match &data.jws {
            Some(jws) => jws.verify(&jwk).is_ok(),
            None => false,
        };
        if !verified {
            let msg = format!("key fails to verify for stakeholder: {}", member.domain);
            tracing::warn!("{msg}");
            failures.push(msg);
            continue;
        }

        endorsers.push(index);
        if endorsers.len() == quorum {
            return Ok(endorsers);
        }
    }

    Err(Error::QuorumFailure(failures.join(", ")))
}
