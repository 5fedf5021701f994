//! Belief contract: the only source of truth a strategy reads.
//!
//! The environment side (actuation layer) keeps entity states, positions and
//! room bookkeeping up to date as a side effect of ticks. The search side
//! reads those through this trait and writes exactly two things back: the
//! registry of (trigger, gate) pairs and link/non-link observations.

use std::collections::BTreeSet;

use crate::model::ids::{EntityId, GateId, TriggerId};
use crate::model::link::{Link, LinkMapV1, LinkRecordOutcome, LinkStatus};

/// Entities of the room the agent is currently in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomView {
    pub triggers: Vec<TriggerId>,
    pub gates: Vec<GateId>,
}

/// What a strategy may ask the belief about the world.
///
/// Implementations must answer from observed information only; hidden
/// wiring is never exposed through this trait.
pub trait BeliefModelV1 {
    /// Triggers the agent has observed so far.
    fn known_triggers(&self) -> BTreeSet<TriggerId>;

    /// Gates the agent has observed so far.
    fn known_gates(&self) -> BTreeSet<GateId>;

    /// Last observed activation state of `trigger` (`false` if unknown).
    fn is_active(&self, trigger: &TriggerId) -> bool;

    /// Last observed state of `gate` (`false` if unknown).
    fn is_open(&self, gate: &GateId) -> bool;

    /// Whether the agent can currently navigate to `id`.
    ///
    /// Gates count as reachable when the agent can stand next to them,
    /// regardless of whether they are open.
    fn is_reachable(&self, id: &EntityId) -> bool;

    /// Known triggers the agent can currently navigate to.
    fn reachable_triggers(&self) -> BTreeSet<TriggerId>;

    /// A closed, reachable gate other than `blocked` whose opening would make
    /// `blocked` reachable, computed by hypothetically opening each candidate
    /// and restoring the believed state afterwards.
    fn find_enabling_gate(&self, blocked: &EntityId) -> Option<GateId>;

    fn is_agent_alive(&self) -> bool;

    /// True when every gate of the agent's current room is believed closed.
    fn current_room_is_locked(&self) -> bool;

    /// The room the agent is in, if room bookkeeping has identified it.
    fn current_room(&self) -> Option<RoomView>;

    fn links(&self) -> &LinkMapV1;

    fn links_mut(&mut self) -> &mut LinkMapV1;

    // --- provided -------------------------------------------------------

    fn link_status(&self, trigger: &TriggerId, gate: &GateId) -> LinkStatus {
        self.links().status(trigger, gate)
    }

    fn confirmed_links(&self) -> BTreeSet<Link> {
        self.links().confirmed()
    }

    fn record_link(&mut self, trigger: &TriggerId, gate: &GateId) -> LinkRecordOutcome {
        self.links_mut().record_link(trigger, gate)
    }

    fn record_non_link(&mut self, trigger: &TriggerId, gate: &GateId) -> LinkRecordOutcome {
        self.links_mut().record_non_link(trigger, gate)
    }

    /// Pull every known trigger and gate into the link registry.
    /// Returns the number of newly registered pairs.
    fn register_known_entities(&mut self) -> usize {
        let triggers = self.known_triggers();
        let gates = self.known_gates();
        self.links_mut().register_pairs(&triggers, &gates)
    }

    fn open_gates(&self) -> BTreeSet<GateId> {
        self.known_gates()
            .into_iter()
            .filter(|g| self.is_open(g))
            .collect()
    }

    fn active_triggers(&self) -> BTreeSet<TriggerId> {
        self.known_triggers()
            .into_iter()
            .filter(|t| self.is_active(t))
            .collect()
    }
}

/// Value copy of the parts of a belief that outlive a session.
///
/// Sessions are torn down after every evaluation, so anything a strategy
/// wants to compare later (chromosome fitness, best belief) is captured here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BeliefSnapshotV1 {
    pub links: BTreeSet<Link>,
    pub open_gates: BTreeSet<GateId>,
    pub active_triggers: BTreeSet<TriggerId>,
    pub agent_alive: bool,
    /// Whether the run's goal predicate held when the snapshot was taken.
    pub goal_holds: bool,
}

impl BeliefSnapshotV1 {
    #[must_use]
    pub fn capture(belief: &dyn BeliefModelV1, goal_holds: bool) -> Self {
        Self {
            links: belief.confirmed_links(),
            open_gates: belief.open_gates(),
            active_triggers: belief.active_triggers(),
            agent_alive: belief.is_agent_alive(),
            goal_holds,
        }
    }
}
