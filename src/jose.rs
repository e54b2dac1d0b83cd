//! # JOSE
//!
//! Minimal JWS and JWK support for config file envelopes.
//!
//! Consortium and stakeholder files travel as JWS-signed JSON. The envelope
//! may carry more than one signature (general JSON serialization) so that
//! several stakeholders can endorse the same payload. Signing keys are
//! Ed25519 `OKP` keys carried as JWKs in the consortium member list.

use std::str::FromStr;

use anyhow::{Result, anyhow, bail};
use base64ct::{Base64UrlUnpadded, Encoding};
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// A JSON Web Key. Only Ed25519 `OKP` keys are supported for config file
/// signatures.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Jwk {
    /// Key type.
    pub kty: String,

    /// Curve.
    pub crv: String,

    /// Public key, base64url-encoded.
    pub x: String,

    /// Key identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl Jwk {
    /// Build a JWK from an Ed25519 verifying key.
    #[must_use]
    pub fn from_verifying_key(key: &VerifyingKey, kid: Option<String>) -> Self {
        Self {
            kty: "OKP".to_string(),
            crv: "Ed25519".to_string(),
            x: Base64UrlUnpadded::encode_string(key.as_bytes()),
            kid,
        }
    }

    /// Decode the JWK into an Ed25519 verifying key.
    ///
    /// # Errors
    /// Will return an error if the key type is not `OKP`/`Ed25519` or the
    /// key material does not decode to 32 bytes.
    pub fn verifying_key(&self) -> Result<VerifyingKey> {
        if self.kty != "OKP" || self.crv != "Ed25519" {
            bail!("unsupported key type {}:{}", self.kty, self.crv);
        }
        let bytes = Base64UrlUnpadded::decode_vec(&self.x)?;
        let bytes: [u8; 32] =
            bytes.as_slice().try_into().map_err(|_| anyhow!("invalid Ed25519 key length"))?;
        Ok(VerifyingKey::from_bytes(&bytes)?)
    }

    /// Compute the RFC 7638 thumbprint of the key: the JCS form of the
    /// required members, hashed with SHA-256 and base64url-encoded.
    ///
    /// Used to detect duplicate keys regardless of `kid` or member order.
    ///
    /// # Errors
    /// Will return an error if the required members cannot be canonicalized.
    pub fn thumbprint(&self) -> Result<String> {
        let required = serde_json::json!({"crv": self.crv, "kty": self.kty, "x": self.x});
        let canonical = serde_json_canonicalizer::to_string(&required)?;
        Ok(Base64UrlUnpadded::encode_string(&Sha256::digest(canonical.as_bytes())))
    }
}

/// Protected header of a single signature.
#[derive(Deserialize, Serialize)]
struct Protected {
    alg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    kid: Option<String>,
}

/// A single signature over the envelope payload.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct SignatureEntry {
    /// Base64url-encoded protected header.
    pub protected: String,

    /// Unprotected header values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<Value>,

    /// Base64url-encoded signature.
    pub signature: String,
}

/// A JWS envelope carrying one or more signatures over a payload.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Jws {
    /// Base64url-encoded payload.
    pub payload: String,

    /// Signatures over the payload.
    pub signatures: Vec<SignatureEntry>,
}

/// Superset of the compact, flattened, and general serializations used
/// during parsing. Single-signature envelopes are commonly emitted in the
/// flattened form.
#[derive(Deserialize)]
struct RawJws {
    payload: String,
    #[serde(default)]
    signatures: Vec<SignatureEntry>,
    protected: Option<String>,
    header: Option<Value>,
    signature: Option<String>,
}

impl FromStr for Jws {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.starts_with('{') {
            let raw: RawJws = serde_json::from_str(s)?;
            let mut signatures = raw.signatures;
            if let (Some(protected), Some(signature)) = (raw.protected, raw.signature) {
                signatures.push(SignatureEntry { protected, header: raw.header, signature });
            }
            if signatures.is_empty() {
                bail!("jws has no signatures");
            }
            return Ok(Self { payload: raw.payload, signatures });
        }

        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            bail!("invalid jws compact serialization");
        }
        Ok(Self {
            payload: parts[1].to_string(),
            signatures: vec![SignatureEntry {
                protected: parts[0].to_string(),
                header: None,
                signature: parts[2].to_string(),
            }],
        })
    }
}

impl Jws {
    /// Sign a payload with one or more keys, producing a multi-signature
    /// envelope.
    ///
    /// # Errors
    /// Will return an error if no keys are provided.
    pub fn sign(payload: &[u8], keys: &[&SigningKey]) -> Result<Self> {
        if keys.is_empty() {
            bail!("at least one signing key is required");
        }
        let encoded = Base64UrlUnpadded::encode_string(payload);
        let protected = Base64UrlUnpadded::encode_string(&serde_json::to_vec(&Protected {
            alg: "EdDSA".to_string(),
            kid: None,
        })?);

        let mut signatures = Vec::with_capacity(keys.len());
        for key in keys {
            let input = format!("{protected}.{encoded}");
            let signature = key.sign(input.as_bytes());
            signatures.push(SignatureEntry {
                protected: protected.clone(),
                header: None,
                signature: Base64UrlUnpadded::encode_string(&signature.to_bytes()),
            });
        }
        Ok(Self { payload: encoded, signatures })
    }

    /// Decode the payload bytes.
    ///
    /// # Errors
    /// Will return an error if the payload is not valid base64url.
    pub fn payload(&self) -> Result<Vec<u8>> {
        Ok(Base64UrlUnpadded::decode_vec(&self.payload)?)
    }

    /// Verify that at least one signature on the envelope validates under
    /// the given key.
    ///
    /// # Errors
    /// Will return an error if the key cannot be decoded or no signature
    /// verifies.
    pub fn verify(&self, jwk: &Jwk) -> Result<()> {
        let key = jwk.verifying_key()?;
        for entry in &self.signatures {
            if verify_entry(&key, &self.payload, entry).is_ok() {
                return Ok(());
            }
        }
        bail!("no signature verifies under the given key")
    }

    /// Serialize to the compact form. Only valid for single-signature
    /// envelopes.
    ///
    /// # Errors
    /// Will return an error if the envelope does not carry exactly one
    /// signature.
    pub fn to_compact(&self) -> Result<String> {
        if self.signatures.len() != 1 {
            bail!("compact serialization requires exactly one signature");
        }
        Ok(format!("{}.{}.{}", self.signatures[0].protected, self.payload, self.signatures[0].signature))
    }
}

fn verify_entry(key: &VerifyingKey, payload: &str, entry: &SignatureEntry) -> Result<()> {
    let header = Base64UrlUnpadded::decode_vec(&entry.protected)?;
    let protected: Protected = serde_json::from_slice(&header)?;
    if protected.alg != "EdDSA" {
        bail!("unsupported algorithm {}", protected.alg);
    }
    let sig_bytes = Base64UrlUnpadded::decode_vec(&entry.signature)?;
    let signature = Signature::from_slice(&sig_bytes)?;
    let input = format!("{}.{}", entry.protected, payload);
    key.verify(input.as_bytes(), &signature)?;
    Ok(())
}
