//! Strong type definitions for takegrant.
//!
//! All identifiers are newtypes over the store's integer row ids so a
//! principal id can never be passed where an object id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a principal (a registered user).
///
/// Issued by the identity layer. The authorization engine treats it as an
/// opaque subject reference and never re-derives or re-verifies it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PrincipalId(pub i64);

/// Identifier of a protected object.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub i64);

/// Position of a record in the audit trail. Monotonic in insertion order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AuditId(pub i64);

macro_rules! id_impls {
    ($name:ident) => {
        impl $name {
            /// Get the raw integer id.
            pub const fn get(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }
    };
}

id_impls!(PrincipalId);
id_impls!(ObjectId);
id_impls!(AuditId);

/// A registered principal as issued by the identity layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Store-assigned identifier.
    pub id: PrincipalId,
    /// Unique login name.
    pub username: String,
    /// Whether the principal may run administrative commands.
    pub is_admin: bool,
}

/// A protected object.
///
/// Ownership is fixed at creation and never transferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    pub id: ObjectId,
    /// Unique name.
    pub name: String,
    pub owner: PrincipalId,
    /// Opaque content. The engine never inspects it.
    pub content: String,
}

/// Parameters for creating an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewObject {
    pub name: String,
    pub content: String,
    pub owner: PrincipalId,
}

impl NewObject {
    /// Create object parameters.
    pub fn new(name: impl Into<String>, content: impl Into<String>, owner: PrincipalId) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            owner,
        }
    }
}
