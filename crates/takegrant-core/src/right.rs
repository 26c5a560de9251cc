//! Rights: the (subject, object, kind) edges of the authorization graph.
//!
//! An edge has no identity beyond its triple. Two `Right` values with the
//! same subject, object and kind are the same edge.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{ObjectId, PrincipalId};

/// Kind of capability a principal can hold on an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RightKind {
    /// Observe the object's content.
    Read,
    /// Replace the object's content or delete the object.
    Write,
    /// Copy any right another principal holds on the object.
    Take,
}

impl RightKind {
    /// Every right kind, in canonical order.
    pub const ALL: [RightKind; 3] = [RightKind::Read, RightKind::Write, RightKind::Take];

    /// Rights the owning principal receives when an object is created.
    pub const OWNER_SEED: [RightKind; 3] = Self::ALL;

    /// Stable lowercase name, as persisted.
    pub const fn as_str(&self) -> &'static str {
        match self {
            RightKind::Read => "read",
            RightKind::Write => "write",
            RightKind::Take => "take",
        }
    }
}

impl fmt::Display for RightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RightKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "read" => Ok(RightKind::Read),
            "write" => Ok(RightKind::Write),
            "take" => Ok(RightKind::Take),
            other => Err(CoreError::UnknownRightKind(other.to_string())),
        }
    }
}

/// A single edge of the rights graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Right {
    pub subject: PrincipalId,
    pub object: ObjectId,
    pub kind: RightKind,
}

impl Right {
    /// Create an edge.
    pub const fn new(subject: PrincipalId, object: ObjectId, kind: RightKind) -> Self {
        Self {
            subject,
            object,
            kind,
        }
    }

    /// The edges an owner receives on a freshly created object.
    pub fn owner_seed(owner: PrincipalId, object: ObjectId) -> [Right; 3] {
        RightKind::OWNER_SEED.map(|kind| Right::new(owner, object, kind))
    }

    /// The same right on the same object, held by another subject.
    ///
    /// This is what `grant` and `take` produce: rights are copied, never moved.
    pub const fn copied_to(&self, subject: PrincipalId) -> Self {
        Self::new(subject, self.object, self.kind)
    }
}

impl fmt::Display for Right {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.subject, self.object, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kinds() {
        assert_eq!("read".parse::<RightKind>().unwrap(), RightKind::Read);
        assert_eq!(" Write ".parse::<RightKind>().unwrap(), RightKind::Write);
        assert_eq!("take".parse::<RightKind>().unwrap(), RightKind::Take);
        assert_eq!(
            "execute".parse::<RightKind>(),
            Err(CoreError::UnknownRightKind("execute".into()))
        );
    }

    #[test]
    fn test_owner_seed_is_all_three() {
        let seed = Right::owner_seed(PrincipalId(1), ObjectId(9));
        assert_eq!(seed.len(), 3);
        assert!(seed.iter().all(|r| r.subject == PrincipalId(1) && r.object == ObjectId(9)));
        let kinds: Vec<_> = seed.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, RightKind::ALL.to_vec());
    }

    #[test]
    fn test_copied_to_keeps_object_and_kind() {
        let r = Right::new(PrincipalId(1), ObjectId(2), RightKind::Write);
        let c = r.copied_to(PrincipalId(5));
        assert_eq!(c, Right::new(PrincipalId(5), ObjectId(2), RightKind::Write));
    }

    #[test]
    fn test_kind_serde_lowercase() {
        let json = serde_json::to_string(&RightKind::Take).unwrap();
        assert_eq!(json, "\"take\"");
    }
}
