//! Identifiers for the two kinds of toggle points.
//!
//! Identifiers are opaque strings assigned by the environment (e.g. `"b1"`,
//! `"door3"`). Ordering is lexicographic so every set of identifiers the
//! kernel hands out iterates deterministically.

use std::fmt;

/// An interactive entity whose activation may change gate states.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriggerId(String);

/// An entity with an open/closed state controlled by zero or more triggers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GateId(String);

impl TriggerId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl GateId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TriggerId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<&str> for GateId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for TriggerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for GateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Either kind of entity, for queries that accept both (reachability,
/// enabling-gate search).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityId {
    Trigger(TriggerId),
    Gate(GateId),
}

impl EntityId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Trigger(t) => t.as_str(),
            Self::Gate(g) => g.as_str(),
        }
    }
}

impl From<TriggerId> for EntityId {
    fn from(t: TriggerId) -> Self {
        Self::Trigger(t)
    }
}

impl From<GateId> for EntityId {
    fn from(g: GateId) -> Self {
        Self::Gate(g)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
