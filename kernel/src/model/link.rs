//! Tri-state link map between triggers and gates.
//!
//! A pair moves `Unknown → Linked` or `Unknown → NotLinked`. A later
//! observation may overwrite `NotLinked` with `Linked` (a recoverable
//! conflict), but `Linked` is never downgraded: a non-link reported for a
//! linked pair is ignored and surfaced as [`LinkRecordOutcome::NonLinkIgnored`]
//! so the caller can log it.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::ids::{GateId, TriggerId};

/// What is currently believed about one (trigger, gate) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkStatus {
    Linked,
    NotLinked,
    Unknown,
}

/// A causal trigger → gate relationship.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Link {
    pub trigger: TriggerId,
    pub gate: GateId,
}

impl Link {
    #[must_use]
    pub fn new(trigger: impl Into<TriggerId>, gate: impl Into<GateId>) -> Self {
        Self {
            trigger: trigger.into(),
            gate: gate.into(),
        }
    }
}

impl From<(&str, &str)> for Link {
    fn from((t, g): (&str, &str)) -> Self {
        Self::new(t, g)
    }
}

/// Result of a recording call, for logging at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRecordOutcome {
    /// The pair changed status.
    Recorded,
    /// The pair already had the recorded status.
    Unchanged,
    /// `NotLinked` was overwritten by `Linked`.
    ConflictOverwritten,
    /// A non-link was reported for a linked pair and dropped.
    NonLinkIgnored,
}

/// Mapping from (trigger, gate) to [`LinkStatus`].
///
/// Pairs that were never registered read as `Unknown`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkMapV1 {
    entries: BTreeMap<(TriggerId, GateId), LinkStatus>,
}

impl LinkMapV1 {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure every (trigger, gate) combination has an entry, inserting
    /// `Unknown` for new ones. Returns the number of pairs added.
    pub fn register_pairs<'a, T, G>(&mut self, triggers: T, gates: G) -> usize
    where
        T: IntoIterator<Item = &'a TriggerId>,
        G: IntoIterator<Item = &'a GateId> + Clone,
    {
        let mut added = 0;
        for t in triggers {
            for g in gates.clone() {
                self.entries
                    .entry((t.clone(), g.clone()))
                    .or_insert_with(|| {
                        added += 1;
                        LinkStatus::Unknown
                    });
            }
        }
        added
    }

    #[must_use]
    pub fn status(&self, trigger: &TriggerId, gate: &GateId) -> LinkStatus {
        self.entries
            .get(&(trigger.clone(), gate.clone()))
            .copied()
            .unwrap_or(LinkStatus::Unknown)
    }

    /// Mark `trigger → gate` as linked.
    pub fn record_link(&mut self, trigger: &TriggerId, gate: &GateId) -> LinkRecordOutcome {
        let slot = self
            .entries
            .entry((trigger.clone(), gate.clone()))
            .or_insert(LinkStatus::Unknown);
        let outcome = match *slot {
            LinkStatus::Linked => LinkRecordOutcome::Unchanged,
            LinkStatus::NotLinked => LinkRecordOutcome::ConflictOverwritten,
            LinkStatus::Unknown => LinkRecordOutcome::Recorded,
        };
        *slot = LinkStatus::Linked;
        outcome
    }

    /// Mark `trigger → gate` as not linked, unless it is already linked.
    pub fn record_non_link(&mut self, trigger: &TriggerId, gate: &GateId) -> LinkRecordOutcome {
        let slot = self
            .entries
            .entry((trigger.clone(), gate.clone()))
            .or_insert(LinkStatus::Unknown);
        match *slot {
            LinkStatus::Linked => LinkRecordOutcome::NonLinkIgnored,
            LinkStatus::NotLinked => LinkRecordOutcome::Unchanged,
            LinkStatus::Unknown => {
                *slot = LinkStatus::NotLinked;
                LinkRecordOutcome::Recorded
            }
        }
    }

    /// All pairs currently marked `Linked`.
    #[must_use]
    pub fn confirmed(&self) -> BTreeSet<Link> {
        self.entries
            .iter()
            .filter(|(_, s)| **s == LinkStatus::Linked)
            .map(|((t, g), _)| Link {
                trigger: t.clone(),
                gate: g.clone(),
            })
            .collect()
    }

    /// Triggers known to be linked to `gate`, in identifier order.
    #[must_use]
    pub fn linked_triggers(&self, gate: &GateId) -> Vec<TriggerId> {
        self.triggers_with_status(gate, LinkStatus::Linked)
    }

    /// Triggers whose link to `gate` is still `Unknown`, in identifier order.
    #[must_use]
    pub fn unknown_triggers(&self, gate: &GateId) -> Vec<TriggerId> {
        self.triggers_with_status(gate, LinkStatus::Unknown)
    }

    fn triggers_with_status(&self, gate: &GateId, status: LinkStatus) -> Vec<TriggerId> {
        self.entries
            .iter()
            .filter(|((_, g), s)| g == gate && **s == status)
            .map(|((t, _), _)| t.clone())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
