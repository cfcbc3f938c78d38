//! Foundation types for the LDP repository.
//!
//! Every other crate in the workspace depends on `ldp-types`. It has no
//! knowledge of storage; it only describes how resources are named and what
//! is recorded about them.
//!
//! # Key Types
//!
//! - [`ResourceId`]: Parsed resource identifier (`info:fedora/...`) with its
//!   metadata, versions and ACL suffixes decomposed
//! - [`TransactionId`]: Opaque identity of a repository transaction
//! - [`ResourceHeaders`]: Server-managed properties persisted beside each resource
//! - [`Triple`] / [`RdfStream`]: Minimal RDF model with an N-Triples codec

pub mod error;
pub mod headers;
pub mod identifier;
pub mod rdf;
pub mod transaction;

pub use error::{IdentifierError, RdfError};
pub use headers::{ExternalHandling, InteractionModel, ResourceHeaders};
pub use identifier::{
    ResourceId, FCR_ACL, FCR_METADATA, FCR_TOMBSTONE, FCR_VERSIONS, FEDORA_ID_PREFIX,
    MEMENTO_LABEL_FORMAT,
};
pub use rdf::{RdfStream, Term, Triple};
pub use transaction::TransactionId;
