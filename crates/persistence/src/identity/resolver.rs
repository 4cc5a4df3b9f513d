//! Token-to-principal resolution over the primary store.

use serde_json::Value;

use dossier_records::{RecordId, Role};

use crate::core::{Collection, DynDocumentStore, StoredDocument};
use crate::error::{AuthError, StorageResult};

/// The caller identity attached to every service operation.
///
/// Constructed by the transport layer from a [`Resolution`], or directly
/// in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    id: RecordId,
    role: Role,
}

impl Caller {
    /// Builds a caller from an already-resolved identity.
    pub fn new(id: RecordId, role: Role) -> Self {
        Caller { id, role }
    }

    /// The caller's record identifier.
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    /// The caller's role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Demands a role, before any store access happens.
    ///
    /// # Errors
    ///
    /// * `AuthError::Forbidden` - If the caller's role differs
    pub fn require(&self, required: Role) -> Result<(), AuthError> {
        if self.role == required {
            Ok(())
        } else {
            Err(AuthError::Forbidden {
                required,
                actual: self.role,
            })
        }
    }
}

/// A successfully resolved principal: its role and its backing record.
#[derive(Debug, Clone)]
pub struct ResolvedPrincipal {
    /// The role the token resolved to.
    pub role: Role,
    /// The record the token named.
    pub record: StoredDocument,
}

impl ResolvedPrincipal {
    /// The caller identity for service operations.
    pub fn caller(&self) -> Caller {
        Caller::new(self.record.id().clone(), self.role)
    }
}

/// The outcome of resolving an opaque principal token.
///
/// An unknown or malformed token is an outcome, not an error; only
/// primary-store failures surface as errors.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// The token named a genuine principal.
    Authenticated(ResolvedPrincipal),
    /// No collection yielded a genuine principal for the token.
    Unauthenticated,
}

impl Resolution {
    /// Returns `true` when a principal was resolved.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Resolution::Authenticated(_))
    }

    /// Unwraps the principal, turning the anonymous outcome into the
    /// error the service layer raises.
    pub fn authenticated(self) -> Result<ResolvedPrincipal, AuthError> {
        match self {
            Resolution::Authenticated(principal) => Ok(principal),
            Resolution::Unauthenticated => Err(AuthError::Unauthenticated),
        }
    }
}

/// Resolves opaque tokens against the primary store.
///
/// Collections are probed in the fixed priority order of
/// [`Role::PROBE_ORDER`]: administrator wins over physician, physician
/// wins over patient, should one token ever match more than one
/// collection. A hit only counts when the record carries what a genuine
/// principal of that kind must carry; a coincidental identifier match
/// falls through to the next collection.
#[derive(Clone)]
pub struct IdentityResolver {
    documents: DynDocumentStore,
}

impl IdentityResolver {
    /// Creates a resolver reading from the given primary store.
    pub fn new(documents: DynDocumentStore) -> Self {
        IdentityResolver { documents }
    }

    /// Resolves a token to a principal, or to [`Resolution::Unauthenticated`].
    ///
    /// Read-only: no store is mutated.
    pub async fn resolve(&self, token: &str) -> StorageResult<Resolution> {
        let Ok(id) = RecordId::parse(token) else {
            return Ok(Resolution::Unauthenticated);
        };

        for role in Role::PROBE_ORDER {
            let collection = Collection::for_role(role);
            let Some(record) = self.documents.find_by_id(collection, &id).await? else {
                continue;
            };
            if accepts(role, record.content()) {
                return Ok(Resolution::Authenticated(ResolvedPrincipal { role, record }));
            }
        }
        Ok(Resolution::Unauthenticated)
    }
}

/// Whether a probed record is a genuine principal of the given kind.
fn accepts(role: Role, content: &Value) -> bool {
    match role {
        // A principal-collection hit with any other role falls through
        Role::Admin => content.get("role").and_then(Value::as_str) == Some(Role::Admin.as_str()),
        Role::Medecin | Role::Patient => has_credential_fields(content),
    }
}

fn has_credential_fields(content: &Value) -> bool {
    content.get("username").is_some_and(Value::is_string)
        && content.get("password_hash").is_some_and(Value::is_string)
}
