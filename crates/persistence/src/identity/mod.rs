//! Identity and role resolution.
//!
//! Maps opaque principal tokens to `(role, record)` pairs by probing the
//! primary store's collections in a fixed priority order. The order is a
//! contract, not an accident: administrator over physician over patient.

mod resolver;

pub use resolver::{Caller, IdentityResolver, Resolution, ResolvedPrincipal};
