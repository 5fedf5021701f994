//! `TraceV1`: the sequence of trigger interactions from the initial state.
//!
//! The environment cannot be rewound, so a trace is the only portable
//! representation of "where we are". Reaching any node, chromosome or
//! episode state means re-executing its trace in a fresh session.

use std::fmt;

use crate::model::ids::TriggerId;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TraceV1 {
    steps: Vec<TriggerId>,
}

impl TraceV1 {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, trigger: TriggerId) {
        self.steps.push(trigger);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    #[must_use]
    pub fn steps(&self) -> &[TriggerId] {
        &self.steps
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TriggerId> {
        self.steps.iter()
    }

    /// Keep only the first `len` steps.
    pub fn truncate(&mut self, len: usize) {
        self.steps.truncate(len);
    }

    #[must_use]
    pub fn contains(&self, trigger: &TriggerId) -> bool {
        self.steps.contains(trigger)
    }

    #[must_use]
    pub fn into_steps(self) -> Vec<TriggerId> {
        self.steps
    }

    /// JSON array of trigger names, in execution order.
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.steps
                .iter()
                .map(|t| serde_json::Value::String(t.as_str().to_string()))
                .collect(),
        )
    }
}

impl From<Vec<TriggerId>> for TraceV1 {
    fn from(steps: Vec<TriggerId>) -> Self {
        Self { steps }
    }
}

impl FromIterator<TriggerId> for TraceV1 {
    fn from_iter<I: IntoIterator<Item = TriggerId>>(iter: I) -> Self {
        Self {
            steps: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a TraceV1 {
    type Item = &'a TriggerId;
    type IntoIter = std::slice::Iter<'a, TriggerId>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

impl fmt::Display for TraceV1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, t) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{t}")?;
        }
        f.write_str("]")
    }
}
