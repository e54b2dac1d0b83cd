//! # DID Document
//!
//! The subset of the DID document model consumed by the resolver, plus the
//! canonicalization used to reconcile documents returned by independent
//! resolution endpoints.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::Kind;
use crate::jose::Jwk;

/// A DID document as returned by a resolution endpoint.
///
/// Fields not modelled here are preserved in `extra` so they survive
/// round-tripping and take part in canonical comparison.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// The context of the DID document.
    #[serde(rename = "@context", default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<Kind<Value>>,

    /// The DID for a particular DID subject.
    pub id: String,

    /// Public keys of the DID subject.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub public_key: Vec<VerificationMethod>,

    /// Verification methods the subject authenticates with. Entries are
    /// either inline methods or references to entries in `public_key`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authentication: Vec<Kind<VerificationMethod>>,

    /// Services exposed by the DID subject.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service: Vec<Service>,

    /// When the document was created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    /// When the document was last updated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,

    /// Proofs over the document.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proof: Vec<Value>,

    /// Additional properties not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Document {
    /// Collect every JWK-bearing verification method in the document. Used
    /// to verify DID configuration entries published by the document's
    /// controlling domain.
    #[must_use]
    pub fn verification_jwks(&self) -> Vec<Jwk> {
        let mut jwks: Vec<Jwk> =
            self.public_key.iter().filter_map(|vm| vm.public_key_jwk.clone()).collect();
        for entry in &self.authentication {
            if let Kind::Object(vm) = entry {
                if let Some(jwk) = &vm.public_key_jwk {
                    jwks.push(jwk.clone());
                }
            }
        }
        jwks
    }

    /// Produce a deterministic byte form of the document.
    ///
    /// Two documents with the same identity content produce identical bytes
    /// regardless of JSON key order, whitespace, or the ordering of the
    /// `service`, `publicKey`, and `authentication` arrays (sorted by `id`;
    /// inline references sort by the reference string). Issuance metadata
    /// (`created`, `updated`, `proof`) is excluded.
    ///
    /// Output uses JSON Canonicalization Scheme (RFC 8785) semantics.
    ///
    /// # Errors
    /// Will return an error if the document cannot be serialized.
    pub fn canonicalize(&self) -> Result<Vec<u8>> {
        let mut doc = self.clone();
        doc.created = None;
        doc.updated = None;
        doc.proof = Vec::new();
        doc.service.sort_by(|a, b| a.id.cmp(&b.id));
        doc.public_key.sort_by(|a, b| a.id.cmp(&b.id));
        doc.authentication.sort_by(|a, b| auth_id(a).cmp(auth_id(b)));
        Ok(serde_json_canonicalizer::to_string(&doc)?.into_bytes())
    }
}

fn auth_id(entry: &Kind<VerificationMethod>) -> &str {
    match entry {
        Kind::String(id) => id,
        Kind::Object(vm) => &vm.id,
    }
}

/// A cryptographic public key usable to authenticate or authorize
/// interactions with the DID subject.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    /// A DID URL that identifies the verification method.
    pub id: String,

    /// The verification method type.
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub type_: String,

    /// The DID of the controller of the verification method.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub controller: String,

    /// The public key as a JWK.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_jwk: Option<Jwk>,

    /// The public key as a base58 string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_base58: Option<String>,

    /// Additional properties not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A way of communicating with the DID subject or associated entities.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    /// A URI unique to the service.
    pub id: String,

    /// The service type.
    #[serde(rename = "type")]
    pub type_: String,

    /// One or more endpoints for the service.
    #[allow(clippy::struct_field_names)]
    pub service_endpoint: Kind<Value>,

    /// Additional properties not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical(json: &str) -> Vec<u8> {
        let doc: Document = serde_json::from_str(json).expect("should parse");
        doc.canonicalize().expect("should canonicalize")
    }

    // Service and key ordering must not affect the canonical form.
    #[test]
    fn reordered_services() {
        let doc1 = canonical(
            r#"{
              "@context": ["https://w3id.org/did/v1"],
              "publicKey": [{
                "id": "did:example:123456789abcdefghi#keys-3",
                "publicKeyBase58": "H3C2AVvLMv6gmMNam3uVAjZpfkcJCwDwnZn6z3wXmqPV",
                "type": "Secp256k1VerificationKey2018",
                "controller": "did:example:123456789abcdefghi"
              }],
              "id": "did:example:123456789abcdefghi",
              "authentication": [
                {
                  "id": "did:example:123456789abcdefghi#keys-2",
                  "type": "Ed25519VerificationKey2018",
                  "controller": "did:example:123456789abcdefghi",
                  "publicKeyBase58": "H3C2AVvLMv6gmMNam3uVAjZpfkcJCwDwnZn6z3wXmqPV"
                },
                "did:example:123456789abcdefghi#keys-3"
              ],
              "service": [{
                "id": "did:example:123456789abcdefghi#oidc",
                "type": "OpenIdConnectVersion1.0Service",
                "serviceEndpoint": "https://openid.example.com/"
              }, {
                "id": "did:example:123456789abcdefghi#messaging",
                "type": "MessagingService",
                "serviceEndpoint": "https://example.com/messages/8377464"
              }, {
                "id": "did:example:123456789abcdefghi#inbox",
                "description": "My public social inbox",
                "type": "SocialWebInboxService",
                "serviceEndpoint": "https://social.example.com/83hfh37dj",
                "spamCost": {
                  "amount": "0.50",
                  "currency": "USD"
                }
              }]
            }"#,
        );
        let doc2 = canonical(
            r#"{
              "@context": ["https://w3id.org/did/v1"],
              "publicKey": [{
                "id": "did:example:123456789abcdefghi#keys-3",
                "publicKeyBase58": "H3C2AVvLMv6gmMNam3uVAjZpfkcJCwDwnZn6z3wXmqPV",
                "type": "Secp256k1VerificationKey2018",
                "controller": "did:example:123456789abcdefghi"
              }],
              "id": "did:example:123456789abcdefghi",
              "authentication": [
                {
                  "id": "did:example:123456789abcdefghi#keys-2",
                  "type": "Ed25519VerificationKey2018",
                  "controller": "did:example:123456789abcdefghi",
                  "publicKeyBase58": "H3C2AVvLMv6gmMNam3uVAjZpfkcJCwDwnZn6z3wXmqPV"
                },
                "did:example:123456789abcdefghi#keys-3"
              ],
              "service": [{
                "id": "did:example:123456789abcdefghi#inbox",
                "description": "My public social inbox",
                "type": "SocialWebInboxService",
                "serviceEndpoint": "https://social.example.com/83hfh37dj",
                "spamCost": {
                  "amount": "0.50",
                  "currency": "USD"
                }
              }, {
                "id": "did:example:123456789abcdefghi#messaging",
                "type": "MessagingService",
                "serviceEndpoint": "https://example.com/messages/8377464"
              }, {
                "id": "did:example:123456789abcdefghi#oidc",
                "type": "OpenIdConnectVersion1.0Service",
                "serviceEndpoint": "https://openid.example.com/"
              }]
            }"#,
        );
        assert_eq!(doc1, doc2);
    }

    // JSON key order must not affect the canonical form.
    #[test]
    fn reordered_keys() {
        let doc1 = canonical(
            r#"{
              "@context": ["https://w3id.org/did/v1"],
              "id": "did:example:123456789abcdefghi",
              "authentication": [
                {
                  "id": "did:example:123456789abcdefghi#keys-2",
                  "controller": "did:example:123456789abcdefghi",
                  "publicKeyJwk": {
                    "kty": "OKP",
                    "crv": "Ed25519",
                    "x": "60-uLNeLPAT-gaV_7_9_g330m0aLRlqk-LEnQvz2lv0"
                  },
                  "type": "JwsVerificationKey2020"
                },
                "did:example:123456789abcdefghi#keys-3"
              ],
              "service": [{
                "id": "did:example:123456789abcdefghi#oidc",
                "type": "OpenIdConnectVersion1.0Service",
                "serviceEndpoint": "https://openid.example.com/"
              }]
            }"#,
        );
        let doc2 = canonical(
            r#"{
              "service": [{
                "type": "OpenIdConnectVersion1.0Service",
                "serviceEndpoint": "https://openid.example.com/",
                "id": "did:example:123456789abcdefghi#oidc"
              }],
              "id": "did:example:123456789abcdefghi",
              "authentication": [
                {
                  "id": "did:example:123456789abcdefghi#keys-2",
                  "type": "JwsVerificationKey2020",
                  "controller": "did:example:123456789abcdefghi",
                  "publicKeyJwk": {
                    "crv": "Ed25519",
                    "x": "60-uLNeLPAT-gaV_7_9_g330m0aLRlqk-LEnQvz2lv0",
                    "kty": "OKP"
                  }
                },
                "did:example:123456789abcdefghi#keys-3"
              ],
              "@context": ["https://w3id.org/did/v1"]
            }"#,
        );
        assert_eq!(doc1, doc2);
    }

    // Issuance metadata is not identity content.
    #[test]
    fn excludes_metadata() {
        let doc1 = canonical(r#"{"id": "did:example:abc"}"#);
        let doc2 = canonical(
            r#"{
              "id": "did:example:abc",
              "created": "2020-01-01T00:00:00Z",
              "updated": "2020-06-01T00:00:00Z",
              "proof": [{"type": "Ed25519Signature2018", "proofValue": "zbase"}]
            }"#,
        );
        assert_eq!(doc1, doc2);
    }

    #[test]
    fn different_ids_differ() {
        assert_ne!(canonical(r#"{"id": "did:example:abc"}"#), canonical(r#"{"id": "did:example:def"}"#));
    }

    #[test]
    fn unknown_fields_compared() {
        let doc1 = canonical(r#"{"id": "did:example:abc", "alsoKnownAs": ["did:example:xyz"]}"#);
        let doc2 = canonical(r#"{"id": "did:example:abc"}"#);
        assert_ne!(doc1, doc2);
    }

    #[test]
    fn verification_jwks_collects_inline() {
        let doc: Document = serde_json::from_str(
            r#"{
              "id": "did:example:123456789abcdefghi",
              "publicKey": [{
                "id": "did:example:123456789abcdefghi#key-2",
                "controller": "did:example:123456789abcdefghi",
                "publicKeyJwk": {
                  "kty": "OKP",
                  "crv": "Ed25519",
                  "x": "8rfXFZNHZs9GYzGbQLYDasGUAm1brAgTLI0jrD4KheU"
                },
                "type": "JwsVerificationKey2020"
              }],
              "authentication": [
                {
                  "id": "did:example:123456789abcdefghi#key-1",
                  "controller": "did:example:123456789abcdefghi",
                  "publicKeyJwk": {
                    "kty": "OKP",
                    "crv": "Ed25519",
                    "x": "bWRCy8DtNhRO3HdKTFB2eEG5Ac1J00D0DQPffOwtAD0"
                  },
                  "type": "JwsVerificationKey2020"
                },
                "did:example:123456789abcdefghi#key-2"
              ]
            }"#,
        )
        .expect("should parse");

        let jwks = doc.verification_jwks();
        assert_eq!(jwks.len(), 2);
        assert_eq!(jwks[0].x, "8rfXFZNHZs9GYzGbQLYDasGUAm1brAgTLI0jrD4KheU");
        assert_eq!(jwks[1].x, "bWRCy8DtNhRO3HdKTFB2eEG5Ac1J00D0DQPffOwtAD0");
    }
}
