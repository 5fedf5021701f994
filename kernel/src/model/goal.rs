//! Goal predicates: the optional target state of a run.
//!
//! A goal is a capability `evaluate(belief) -> bool` supplied by the caller.
//! Closures over the belief work directly through the blanket impl; the
//! named predicates below cover what configuration files can express.

use std::collections::BTreeSet;
use std::fmt;

use crate::model::belief::BeliefModelV1;
use crate::model::ids::GateId;

pub trait GoalPredicate: Send + Sync {
    fn evaluate(&self, belief: &dyn BeliefModelV1) -> bool;

    /// Short human-readable description for logs and reports.
    fn describe(&self) -> String {
        "custom goal".to_string()
    }
}

impl<F> GoalPredicate for F
where
    F: Fn(&dyn BeliefModelV1) -> bool + Send + Sync,
{
    fn evaluate(&self, belief: &dyn BeliefModelV1) -> bool {
        self(belief)
    }
}

/// Satisfied when one gate is observed open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOpen(pub GateId);

impl GoalPredicate for GateOpen {
    fn evaluate(&self, belief: &dyn BeliefModelV1) -> bool {
        belief.is_open(&self.0)
    }

    fn describe(&self) -> String {
        format!("gate {} open", self.0)
    }
}

/// Satisfied when every listed gate is observed open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllGatesOpen(pub BTreeSet<GateId>);

impl GoalPredicate for AllGatesOpen {
    fn evaluate(&self, belief: &dyn BeliefModelV1) -> bool {
        self.0.iter().all(|g| belief.is_open(g))
    }

    fn describe(&self) -> String {
        let names: Vec<&str> = self.0.iter().map(GateId::as_str).collect();
        format!("gates {} open", names.join(","))
    }
}

impl fmt::Debug for dyn GoalPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GoalPredicate({})", self.describe())
    }
}
