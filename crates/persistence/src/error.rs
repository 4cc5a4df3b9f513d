//! Error types for the dual-store persistence layer.
//!
//! One umbrella [`StorageError`] wraps the per-category enums. The
//! categories follow the write path: primary-store failures abort an
//! operation before any mirror interaction, mirror failures are absorbed
//! into a secondary status by the sync layer, and authorization failures
//! are raised before either store is touched.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use std::fmt;

use thiserror::Error;

use dossier_records::{InvalidRecordId, RecordId, Role};

use crate::core::document::Collection;
use crate::core::graph::NodeLabel;

/// The primary error type for all storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Record state errors
    #[error(transparent)]
    Record(#[from] RecordError),

    /// Primary document-store errors
    #[error(transparent)]
    Primary(#[from] PrimaryStoreError),

    /// Graph mirror errors
    #[error(transparent)]
    Mirror(#[from] MirrorError),

    /// Authorization and credential errors
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Payload validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Errors related to record state in the primary store.
#[derive(Error, Debug)]
pub enum RecordError {
    /// The requested record was not found.
    #[error("record not found: {collection}/{id}")]
    NotFound { collection: Collection, id: RecordId },

    /// A principal with the given username already exists.
    #[error("username already registered: {username}")]
    UsernameTaken { username: String },

    /// A stored document could not be decoded into its entity type.
    #[error("malformed stored document {collection}/{id}: {message}")]
    Malformed {
        collection: Collection,
        id: RecordId,
        message: String,
    },
}

/// Errors originating from the primary document store.
///
/// Any error in this category means the authoritative write (or read)
/// did not happen; the operation aborts and no mirror write is attempted.
#[derive(Error, Debug)]
pub enum PrimaryStoreError {
    /// Connection to the document backend failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Internal document backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    Serialization { message: String },
}

/// Errors originating from the graph mirror.
///
/// The sync layer absorbs these into a secondary status; they never
/// revert a committed primary-store mutation.
#[derive(Error, Debug)]
pub enum MirrorError {
    /// Connection to the graph backend failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Internal graph backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A relationship endpoint node does not exist in the mirror.
    #[error("mirror endpoint missing: {label}/{id}")]
    EndpointMissing { label: NodeLabel, id: String },

    /// A property key outside the label's whitelist reached the adapter.
    #[error("unknown property key for label {label}: {key}")]
    UnknownPropertyKey { label: NodeLabel, key: String },

    /// Multi-step consultation mirroring failed after at least one step
    /// succeeded, leaving partial state an operator can later repair.
    #[error("partial consultation mirror for {id}: {failed} failed after {completed:?}: {message}")]
    Partial {
        id: RecordId,
        completed: Vec<MirrorStep>,
        failed: MirrorStep,
        message: String,
    },
}

impl MirrorError {
    /// Returns `true` for the partial-mirror case, which operators must
    /// be able to tell apart from a clean mirror failure.
    pub fn is_partial(&self) -> bool {
        matches!(self, MirrorError::Partial { .. })
    }
}

/// One step of the three-step consultation mirroring sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorStep {
    /// The consultation node write.
    Node,
    /// The patient→consultation participation edge.
    AttendsEdge,
    /// The consultation→physician assignment edge.
    AssignedToEdge,
}

impl fmt::Display for MirrorStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MirrorStep::Node => write!(f, "node write"),
            MirrorStep::AttendsEdge => write!(f, "attends-edge write"),
            MirrorStep::AssignedToEdge => write!(f, "assigned-to-edge write"),
        }
    }
}

/// Errors related to authorization and credentials.
///
/// Raised before any store access is attempted.
#[derive(Error, Debug)]
pub enum AuthError {
    /// No principal could be resolved for the presented token.
    #[error("unauthenticated principal")]
    Unauthenticated,

    /// The caller's role does not permit the operation.
    #[error("access denied: operation requires {required} role, caller is {actual}")]
    Forbidden { required: Role, actual: Role },

    /// The caller's role permits the operation, but the record belongs to
    /// another principal.
    #[error("access denied: caller does not own record {id}")]
    NotRecordOwner { id: RecordId },

    /// Hashing or verifying a credential failed.
    #[error("credential hashing failed: {message}")]
    CredentialHash { message: String },
}

/// Errors related to request payload validation.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The document payload is not a JSON object.
    #[error("document payload must be a JSON object")]
    PayloadNotAnObject,

    /// Missing required field.
    #[error("missing required field: {field}")]
    MissingRequiredField { field: String },

    /// An update payload contained no fields after filtering.
    #[error("update contains no fields")]
    EmptyUpdate,

    /// A malformed identifier token.
    #[error(transparent)]
    InvalidIdentifier(#[from] InvalidRecordId),
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// Implement conversions from common error types

impl From<InvalidRecordId> for StorageError {
    fn from(err: InvalidRecordId) -> Self {
        StorageError::Validation(ValidationError::InvalidIdentifier(err))
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Primary(PrimaryStoreError::Serialization {
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "mongodb")]
impl From<mongodb::error::Error> for StorageError {
    fn from(err: mongodb::error::Error) -> Self {
        StorageError::Primary(PrimaryStoreError::Internal {
            backend_name: "mongodb".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}

#[cfg(feature = "neo4j")]
impl From<neo4rs::Error> for StorageError {
    fn from(err: neo4rs::Error) -> Self {
        StorageError::Mirror(MirrorError::Internal {
            backend_name: "neo4j".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}
