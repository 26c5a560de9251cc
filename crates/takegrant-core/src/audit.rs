//! Audit trail values.
//!
//! The audit trail is the only external record of who caused which
//! mutation. Records name the *claimed* actor: the sink performs no
//! verification of its own. [`Actor`] makes the difference between an
//! authenticated principal and a bare claimed name visible at the call site,
//! but both persist as the same plain `actor` string.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::right::RightKind;
use crate::types::{AuditId, ObjectId, Principal, PrincipalId};

/// Actor name recorded when no principal is logged in.
pub const ANONYMOUS: &str = "anonymous";

/// Result of a security-relevant decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The operation was performed.
    Success,
    /// The operation was not performed (bad input, failed precondition, fault).
    Fail,
    /// Access was refused by a security check.
    Denied,
}

impl Outcome {
    /// Stable lowercase name, as persisted.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Fail => "fail",
            Outcome::Denied => "denied",
        }
    }

    /// `Success` if `ok`, otherwise `Fail`.
    pub const fn from_ok(ok: bool) -> Self {
        if ok {
            Outcome::Success
        } else {
            Outcome::Fail
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Outcome::Success),
            "fail" => Ok(Outcome::Fail),
            "denied" => Ok(Outcome::Denied),
            other => Err(CoreError::UnknownOutcome(other.to_string())),
        }
    }
}

/// Structured description of what was attempted.
///
/// Persisted as JSON so readers never parse free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum AuditAction {
    Register,
    Login,
    Logout,
    CreateObject {
        name: String,
    },
    ListObjects,
    ReadObject {
        object: ObjectId,
    },
    WriteObject {
        object: ObjectId,
    },
    DeleteObject {
        object: ObjectId,
    },
    Grant {
        kind: RightKind,
        object: ObjectId,
        grantee: PrincipalId,
    },
    Take {
        kind: RightKind,
        object: ObjectId,
        target: PrincipalId,
    },
    Check {
        kind: RightKind,
        object: ObjectId,
    },
    ListUsers,
    DeleteUser {
        principal: PrincipalId,
    },
    MakeAdmin {
        principal: PrincipalId,
    },
    /// A command refused before reaching the engine (malformed input).
    Rejected {
        command: String,
        reason: String,
    },
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditAction::Register => f.write_str("register"),
            AuditAction::Login => f.write_str("login"),
            AuditAction::Logout => f.write_str("logout"),
            AuditAction::CreateObject { name } => write!(f, "create object {name}"),
            AuditAction::ListObjects => f.write_str("list objects"),
            AuditAction::ReadObject { object } => write!(f, "read object {object}"),
            AuditAction::WriteObject { object } => write!(f, "write object {object}"),
            AuditAction::DeleteObject { object } => write!(f, "delete object {object}"),
            AuditAction::Grant {
                kind,
                object,
                grantee,
            } => write!(f, "grant {kind} obj {object} to user {grantee}"),
            AuditAction::Take {
                kind,
                object,
                target,
            } => write!(f, "take {kind} obj {object} from user {target}"),
            AuditAction::Check { kind, object } => write!(f, "check {kind} on object {object}"),
            AuditAction::ListUsers => f.write_str("list users"),
            AuditAction::DeleteUser { principal } => write!(f, "delete user {principal}"),
            AuditAction::MakeAdmin { principal } => write!(f, "make admin {principal}"),
            AuditAction::Rejected { command, reason } => write!(f, "{command} rejected: {reason}"),
        }
    }
}

/// Who an audit entry is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// A principal that authenticated in this session.
    Authenticated(Principal),
    /// A name asserted by the caller with no authentication context behind it.
    Claimed(String),
}

impl Actor {
    /// The actor used when nobody is logged in.
    pub fn anonymous() -> Self {
        Actor::Claimed(ANONYMOUS.to_string())
    }

    /// A claimed name.
    pub fn claimed(name: impl Into<String>) -> Self {
        Actor::Claimed(name.into())
    }

    /// The name written to the audit trail.
    pub fn name(&self) -> &str {
        match self {
            Actor::Authenticated(p) => &p.username,
            Actor::Claimed(name) => name,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An audit record before it is appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub actor: Actor,
    pub action: AuditAction,
    pub outcome: Outcome,
    pub target_principal: Option<PrincipalId>,
    pub object_name: Option<String>,
}

impl AuditEntry {
    /// Create an entry with no target principal or object name.
    pub fn new(actor: Actor, action: AuditAction, outcome: Outcome) -> Self {
        Self {
            actor,
            action,
            outcome,
            target_principal: None,
            object_name: None,
        }
    }

    /// Attach the principal the action was aimed at.
    pub fn with_target(mut self, target: PrincipalId) -> Self {
        self.target_principal = Some(target);
        self
    }

    /// Attach the object name, if known.
    pub fn with_object_name(mut self, name: Option<String>) -> Self {
        self.object_name = name;
        self
    }
}

/// An appended, immutable audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: AuditId,
    /// When the record was appended (Unix ms, store clock).
    pub timestamp: i64,
    /// The actor name as supplied by the caller.
    pub actor: String,
    pub action: AuditAction,
    pub outcome: Outcome,
    pub target_principal: Option<PrincipalId>,
    pub object_name: Option<String>,
}

impl AuditRecord {
    /// The record with store-assigned fields (`id`, `timestamp`) stripped.
    ///
    /// Two records with equal attribution compare equal here no matter when
    /// or in which order they were written.
    pub fn attribution(&self) -> (&str, &AuditAction, Outcome, Option<PrincipalId>, Option<&str>) {
        (
            &self.actor,
            &self.action,
            self.outcome,
            self.target_principal,
            self.object_name.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_roundtrip_names() {
        for o in [Outcome::Success, Outcome::Fail, Outcome::Denied] {
            assert_eq!(o.as_str().parse::<Outcome>().unwrap(), o);
        }
        assert!("maybe".parse::<Outcome>().is_err());
    }

    #[test]
    fn test_actor_names_are_indistinguishable() {
        let authenticated = Actor::Authenticated(Principal {
            id: PrincipalId(1),
            username: "user1".into(),
            is_admin: true,
        });
        let claimed = Actor::claimed("user1");

        assert_ne!(authenticated, claimed);
        assert_eq!(authenticated.name(), claimed.name());
        assert_eq!(Actor::anonymous().name(), ANONYMOUS);
    }

    #[test]
    fn test_action_json_is_tagged() {
        let action = AuditAction::Grant {
            kind: RightKind::Read,
            object: ObjectId(1),
            grantee: PrincipalId(3),
        };
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(json, r#"{"op":"grant","kind":"read","object":1,"grantee":3}"#);
        let back: AuditAction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, action);
    }

    #[test]
    fn test_action_display() {
        let action = AuditAction::Take {
            kind: RightKind::Write,
            object: ObjectId(1),
            target: PrincipalId(1),
        };
        assert_eq!(action.to_string(), "take write obj 1 from user 1");
    }

    #[test]
    fn test_entry_builder() {
        let entry = AuditEntry::new(Actor::claimed("u"), AuditAction::ListObjects, Outcome::Success)
            .with_target(PrincipalId(4))
            .with_object_name(Some("file1".into()));
        assert_eq!(entry.target_principal, Some(PrincipalId(4)));
        assert_eq!(entry.object_name.as_deref(), Some("file1"));
    }
}
