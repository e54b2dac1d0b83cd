//! # DID Configuration
//!
//! Verify the `/.well-known/did-configuration` document a domain publishes
//! to attest which DIDs it controls.
//!
//! Each entry in the document is a compact JWS whose claims bind a DID
//! (`sub`) to the publishing domain (`iss`), optionally bounded by an
//! expiry (`exp`). An entry proves the binding when its signature verifies
//! under a verification method of the DID's resolved document.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::jose::Jws;
use crate::{Error, Result};

const DID_CONFIGURATION_PATH: &str = ".well-known/did-configuration";

/// The DID configuration document published by a domain.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DidConfiguration {
    /// Domain-linkage entries, each a compact JWS.
    pub entries: Vec<String>,
}

/// Claims carried by a domain-linkage entry.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct LinkageClaims {
    /// The domain asserting the binding.
    pub iss: String,

    /// The DID being bound to the domain.
    pub sub: String,

    /// Expiry, in unix seconds. Absent or zero for no expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Confirms that a domain publishes a DID configuration binding a
/// stakeholder DID to itself.
#[async_trait]
pub trait DidConfigService: Send + Sync {
    /// Verify that `domain` attests control of the DID described by `doc`.
    async fn verify_stakeholder(&self, domain: &str, doc: &Document) -> Result<()>;
}

/// Fetches and verifies DID configuration documents over HTTP.
#[derive(Clone, Debug)]
pub struct HttpDidConfig {
    client: reqwest::Client,
}

impl HttpDidConfig {
    /// Create a verifier over the given client.
    #[must_use]
    pub const fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DidConfigService for HttpDidConfig {
    async fn verify_stakeholder(&self, domain: &str, doc: &Document) -> Result<()> {
        let url = configuration_url(domain);
        tracing::debug!("fetching did configuration from {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::ConfigFetch(format!("fetching did configuration from {url}: {e}")))?;
        if !response.status().is_success() {
            return Err(Error::ConfigFetch(format!(
                "fetching did configuration from {url}: status {}",
                response.status()
            )));
        }
        let configuration: DidConfiguration = response
            .json()
            .await
            .map_err(|e| Error::ConfigFetch(format!("did configuration invalid: {e}")))?;

        verify_binding(domain, doc, &configuration)
    }
}

/// Check a DID configuration document against a resolved DID document:
/// success iff at least one matching entry's signature verifies under one of
/// the document's verification methods.
///
/// # Errors
/// Will return [`Error::StakeholderBinding`] if no entry matches the DID and
/// domain, or no matching entry verifies.
pub fn verify_binding(
    domain: &str, doc: &Document, configuration: &DidConfiguration,
) -> Result<()> {
    let keys = doc.verification_jwks();
    if keys.is_empty() {
        return Err(Error::StakeholderBinding(format!(
            "no verification keys in DID document {}",
            doc.id
        )));
    }

    let mut matched = false;
    for entry in &configuration.entries {
        let Ok(jws) = Jws::from_str(entry) else { continue };
        let Ok(payload) = jws.payload() else { continue };
        let Ok(claims) = serde_json::from_slice::<LinkageClaims>(&payload) else { continue };

        if claims.sub != doc.id || !domains_match(&claims.iss, domain) {
            continue;
        }
        if claims.exp.is_some_and(|exp| exp != 0 && exp < Utc::now().timestamp()) {
            continue;
        }

        matched = true;
        if keys.iter().any(|key| jws.verify(key).is_ok()) {
            return Ok(());
        }
    }

    if matched {
        Err(Error::StakeholderBinding(format!(
            "no did configuration entry verifies for {}",
            doc.id
        )))
    } else {
        Err(Error::StakeholderBinding(format!("no did configuration entry matches {}", doc.id)))
    }
}

/// Build a signed DID configuration binding `did` to `domain`. An `expiry`
/// of zero means the entry does not expire.
///
/// # Errors
/// Will return an error if the claims cannot be serialized or signed.
pub fn create_did_configuration(
    domain: &str, did: &str, expiry: i64, key: &SigningKey,
) -> anyhow::Result<DidConfiguration> {
    let claims = LinkageClaims {
        iss: domain.to_string(),
        sub: did.to_string(),
        exp: if expiry == 0 { None } else { Some(expiry) },
    };
    let jws = Jws::sign(&serde_json::to_vec(&claims)?, &[key])?;
    Ok(DidConfiguration { entries: vec![jws.to_compact()?] })
}

fn configuration_url(domain: &str) -> String {
    let base = if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", domain.trim_end_matches('/'))
    };
    format!("{base}/{DID_CONFIGURATION_PATH}")
}

fn domains_match(a: &str, b: &str) -> bool {
    fn strip(domain: &str) -> &str {
        domain
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
    }
    strip(a) == strip(b)
}

#[cfg(test)]
mod tests {
    use rand::rngs::OsRng;

    use super::*;
    use crate::document::VerificationMethod;
    use crate::jose::Jwk;

    const DID: &str = "did:example:123456789abcdefghi";
    const DOMAIN: &str = "https://stakeholder.one";

    fn doc_with_key(key: &SigningKey) -> Document {
        Document {
            id: DID.to_string(),
            public_key: vec![VerificationMethod {
                id: format!("{DID}#key-1"),
                type_: "JwsVerificationKey2020".to_string(),
                controller: DID.to_string(),
                public_key_jwk: Some(Jwk::from_verifying_key(&key.verifying_key(), None)),
                ..VerificationMethod::default()
            }],
            ..Document::default()
        }
    }

    #[test]
    fn create_and_verify() {
        let key = SigningKey::generate(&mut OsRng);
        let configuration =
            create_did_configuration(DOMAIN, DID, 0, &key).expect("should create");
        verify_binding(DOMAIN, &doc_with_key(&key), &configuration).expect("should verify");
    }

    #[test]
    fn scheme_insensitive_issuer() {
        let key = SigningKey::generate(&mut OsRng);
        let configuration =
            create_did_configuration("stakeholder.one", DID, 0, &key).expect("should create");
        verify_binding(DOMAIN, &doc_with_key(&key), &configuration).expect("should verify");
    }

    #[test]
    fn no_matching_entry() {
        let key = SigningKey::generate(&mut OsRng);
        let configuration =
            create_did_configuration(DOMAIN, "did:example:other", 0, &key).expect("should create");

        let err =
            verify_binding(DOMAIN, &doc_with_key(&key), &configuration).expect_err("should fail");
        assert!(err.to_string().contains("no did configuration entry matches"));
    }

    #[test]
    fn entry_signed_by_unknown_key() {
        let key = SigningKey::generate(&mut OsRng);
        let other = SigningKey::generate(&mut OsRng);
        let configuration =
            create_did_configuration(DOMAIN, DID, 0, &other).expect("should create");

        let err =
            verify_binding(DOMAIN, &doc_with_key(&key), &configuration).expect_err("should fail");
        assert!(err.to_string().contains("no did configuration entry verifies"));
    }

    #[test]
    fn expired_entry() {
        let key = SigningKey::generate(&mut OsRng);
        let expired = Utc::now().timestamp() - 3600;
        let configuration =
            create_did_configuration(DOMAIN, DID, expired, &key).expect("should create");

        assert!(verify_binding(DOMAIN, &doc_with_key(&key), &configuration).is_err());
    }

    #[test]
    fn document_without_keys() {
        let key = SigningKey::generate(&mut OsRng);
        let configuration =
            create_did_configuration(DOMAIN, DID, 0, &key).expect("should create");
        let doc = Document { id: DID.to_string(), ..Document::default() };

        let err = verify_binding(DOMAIN, &doc, &configuration).expect_err("should fail");
        assert!(err.to_string().contains("no verification keys"));
    }
}
