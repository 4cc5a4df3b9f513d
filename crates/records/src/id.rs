//! Opaque record identifier type.
//!
//! Every entity stored in the primary document store is addressed by a
//! [`RecordId`]: an opaque, store-issued token representable as a string.
//! The same value doubles as the cross-store join key — a mirrored graph
//! node carries the identifier of its primary-store record as a plain
//! property, so the two stores are only ever joined by value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Longest identifier accepted from an untrusted source.
const MAX_LEN: usize = 64;

/// An opaque identifier issued by the primary store.
///
/// Identifiers are treated as uninterpreted tokens: this type never parses
/// structure out of them. Backends may issue stricter forms (a MongoDB
/// ObjectId hex string, a UUID), but nothing outside the backend may rely
/// on that.
///
/// # Examples
///
/// ```
/// use dossier_records::RecordId;
///
/// let id = RecordId::new("662f9a1c8dd14a0f5b3c7e21");
/// assert_eq!(id.as_str(), "662f9a1c8dd14a0f5b3c7e21");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Creates an identifier from a value already issued by a store.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh identifier.
    ///
    /// Used by backends that assign identifiers client-side (the in-memory
    /// reference backend); server-assigning backends wrap their own tokens
    /// with [`RecordId::new`] instead.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Validates an identifier received from an untrusted source.
    ///
    /// Accepts non-empty strings of at most 64 ASCII alphanumerics,
    /// `_` or `-`. Anything else is rejected before it can reach a store
    /// query.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRecordId`] when the value is empty, too long, or
    /// contains a character outside the accepted set.
    ///
    /// # Examples
    ///
    /// ```
    /// use dossier_records::RecordId;
    ///
    /// assert!(RecordId::parse("662f9a1c8dd14a0f5b3c7e21").is_ok());
    /// assert!(RecordId::parse("").is_err());
    /// assert!(RecordId::parse("drop (n) --").is_err());
    /// ```
    pub fn parse(value: &str) -> Result<Self, InvalidRecordId> {
        let ok = !value.is_empty()
            && value.len() <= MAX_LEN
            && value
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        if ok {
            Ok(Self(value.to_string()))
        } else {
            Err(InvalidRecordId {
                value: value.to_string(),
            })
        }
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Rejection of a malformed identifier token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid record identifier: {value:?}")]
pub struct InvalidRecordId {
    /// The rejected value.
    pub value: String,
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl FromStr for RecordId {
    type Err = InvalidRecordId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordId::parse(s)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::new(s)
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        RecordId::new(s)
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
