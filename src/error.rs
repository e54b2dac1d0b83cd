//! # Errors
//!
//! The error surface of the resolver. Composing layers prepend a context tag
//! (`wrapped config service`, `failed to fetch stakeholders`, `can't resolve
//! stakeholder DID`) so the final message names the failing hop; no error is
//! retried inside the crate.

use thiserror::Error;

/// Returns resolver-specific errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the resolver and its collaborating services.
#[derive(Debug, Error)]
pub enum Error {
    /// The caller supplied a malformed DID or an empty URL.
    #[error("{0}")]
    InvalidInput(String),

    /// A consortium, stakeholder, or DID configuration file could not be
    /// fetched or parsed. May be transient; the caller can retry later.
    #[error("{0}")]
    ConfigFetch(String),

    /// Fewer than the effective quorum of stakeholder signatures verified
    /// against the consortium envelope. The message enumerates each key that
    /// failed to parse or verify.
    #[error("insufficient stakeholder endorsement of consortium config file. errors are: [{0}]")]
    QuorumFailure(String),

    /// A stakeholder failed its self-signature, consortium co-signature, or
    /// DID configuration binding check. Trust in the consortium is broken
    /// until the underlying data is fixed.
    #[error("{0}")]
    StakeholderBinding(String),

    /// Endpoint discovery yielded no endpoints for the domain.
    #[error("list of endpoints is empty")]
    NoEndpoints,

    /// A resolution endpoint returned an error.
    #[error("{0}")]
    EndpointRead(String),

    /// Resolution endpoints returned documents that are not canonically
    /// equal. Indicates inconsistency between stakeholders, or an attack.
    #[error("mismatch between resolved documents")]
    Mismatch,

    /// The operation is not supported by this DID method implementation.
    #[error("build method not supported")]
    Unsupported,
}
