//! Outcomes of authorization decisions.

use std::fmt;

use takegrant_core::Outcome;

/// Why a mutation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Denial {
    /// The caller lacks the right the operation requires.
    Unauthorized,
    /// The target of a take does not hold the right being taken.
    RightNotHeld,
}

impl Denial {
    pub fn reason(&self) -> &'static str {
        match self {
            Denial::Unauthorized => "caller does not hold the required right",
            Denial::RightNotHeld => "target does not hold this right",
        }
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Result of a `grant` or `take`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    /// A new edge was inserted.
    Applied,
    /// The recipient already held the right; nothing changed.
    AlreadyHeld,
    /// A precondition failed; nothing changed.
    Denied(Denial),
}

impl Decision {
    /// The boolean result: true unless a precondition failed.
    pub fn is_success(&self) -> bool {
        !matches!(self, Decision::Denied(_))
    }

    /// The denial reason, if any.
    pub fn denial(&self) -> Option<Denial> {
        match self {
            Decision::Denied(d) => Some(*d),
            _ => None,
        }
    }

    /// How a mutation with this decision is recorded in the audit trail.
    ///
    /// Refused mutations are recorded as `fail`; `denied` is reserved for
    /// refused reads and checks.
    pub fn outcome(&self) -> Outcome {
        Outcome::from_ok(self.is_success())
    }
}
