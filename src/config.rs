//! # Consortium Configuration
//!
//! Wire models for consortium and stakeholder config files, and the
//! `ConfigService` seam used to fetch them.
//!
//! Config files are immutable snapshots retrieved on demand: a consortium
//! file names the federation's members and its endorsement policy; a
//! stakeholder file names the endpoints a member contributes. Both travel
//! inside a JWS envelope which is preserved for signature verification.

pub mod http;
pub mod signature;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;
use crate::jose::Jws;

/// A consortium file: the set of stakeholders governing a DID domain and the
/// policy they are held to.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Consortium {
    /// The domain the consortium governs.
    pub domain: String,

    /// Endorsement policy for this file.
    pub policy: ConsortiumPolicy,

    /// The stakeholders that make up the consortium.
    #[serde(default)]
    pub members: Vec<StakeholderRef>,

    /// Content hash of the previous consortium file, for history chaining.
    /// Empty for the first file in a chain.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub previous: String,
}

impl Consortium {
    /// The number of distinct stakeholder signatures required to accept this
    /// file. A policy of zero, or one larger than the membership, means all
    /// members must sign.
    #[must_use]
    pub fn effective_quorum(&self) -> usize {
        let n = self.policy.num_queries;
        if n == 0 || n > self.members.len() { self.members.len() } else { n }
    }
}

/// Consortium endorsement policy.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConsortiumPolicy {
    /// Minimum number of distinct stakeholder signatures required on the
    /// consortium file. Zero means "all members".
    #[serde(default)]
    pub num_queries: usize,
}

/// A consortium's reference to one of its stakeholders.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StakeholderRef {
    /// The domain the stakeholder claims.
    pub domain: String,

    /// The stakeholder's DID.
    pub did: String,

    /// The key the stakeholder signs with.
    pub public_key: PublicKeyRef,
}

/// A stakeholder's signing key as listed in the consortium file.
///
/// The JWK is carried as raw JSON so that a malformed key is a
/// verification-time failure for that key alone, never a parse failure for
/// the whole consortium file.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PublicKeyRef {
    /// Key identifier, typically a DID URL.
    pub id: String,

    /// The JSON Web Key.
    pub jwk: Value,
}

/// A stakeholder file: the configuration a stakeholder publishes at its own
/// domain.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Stakeholder {
    /// The domain the stakeholder publishes under.
    pub domain: String,

    /// The stakeholder's DID.
    pub did: String,

    /// Stakeholder-specific settings.
    #[serde(default)]
    pub policy: StakeholderSettings,

    /// Resolution endpoints the stakeholder contributes.
    #[serde(default)]
    pub endpoints: Vec<String>,

    /// Content hash of the previous stakeholder file.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub previous: String,
}

/// Settings a stakeholder publishes about itself. Currently carried opaquely.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct StakeholderSettings {}

/// A parsed config file together with the signature envelope it arrived in.
#[derive(Clone, Debug)]
pub struct SignedConfig<T> {
    /// The decoded payload.
    pub config: T,

    /// The envelope the payload arrived in. `None` models an unsigned file;
    /// unsigned files fail every signature check.
    pub jws: Option<Jws>,
}

/// A fetched consortium file.
pub type ConsortiumData = SignedConfig<Consortium>;

/// A fetched stakeholder file.
pub type StakeholderData = SignedConfig<Stakeholder>;

/// A resolution endpoint contributed by a stakeholder.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Endpoint {
    /// The endpoint URL.
    pub url: String,
}

/// Fetches consortium and stakeholder config files.
///
/// `url` locates the file; `domain` names the file within the publisher's
/// well-known directory. Callers resolving a domain pass the same value for
/// both.
#[async_trait]
pub trait ConfigService: Send + Sync {
    /// Fetch and parse the consortium file published at `url`.
    async fn consortium(&self, url: &str, domain: &str) -> Result<ConsortiumData>;

    /// Fetch and parse the stakeholder file published at `url`.
    async fn stakeholder(&self, url: &str, domain: &str) -> Result<StakeholderData>;
}
