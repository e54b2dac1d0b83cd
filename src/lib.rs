//! # `did:trustbloc` Resolver
//!
//! Resolves DIDs anchored in a federated consortium.
//!
//! Given a DID of the form `did:trustbloc:<domain>:<suffix>`, the resolver
//! locates the consortium file governing `<domain>`, verifies that a
//! policy-defined quorum of stakeholders endorses it, binds each endorsing
//! stakeholder to the domain it claims via a DID configuration proof, then
//! queries the resolution endpoints published by the stakeholders and
//! reconciles the returned DID document across them.
//!
//! See [DID resolution](https://www.w3.org/TR/did-core/#did-resolution) for
//! more.

pub mod config;
pub mod core;
pub mod didconfig;
pub mod discovery;
pub mod document;
mod endpoint;
mod error;
pub mod jose;
mod resolver;
pub mod selection;

pub use self::endpoint::EndpointService;
pub use self::error::{Error, Result};
pub use self::resolver::{DEFAULT_METHOD, HttpTransport, Resolver, ResolverBuilder, Transport};
