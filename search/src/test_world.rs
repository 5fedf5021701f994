//! Single-room scripted world for unit tests of the engine and strategies.
//!
//! Every entity sits in one room and is revealed by one exploration tick.
//! Interacting takes two ticks (walk, toggle); observing takes one. Triggers
//! marked unreachable, or placed behind a closed gate, keep the agent
//! standing still.

use std::collections::{BTreeMap, BTreeSet};

use linkscout_kernel::model::belief::{BeliefModelV1, RoomView};
use linkscout_kernel::model::ids::{EntityId, GateId, TriggerId};
use linkscout_kernel::model::link::LinkMapV1;

use crate::clock::ManualClock;
use crate::contract::{
    ActuationLayerV1, GoalStatus, ObservedChange, Position, SessionCost, SubGoal, TickObservation,
};
use crate::error::Interrupted;

pub(crate) const TICK_MILLIS: u64 = 10;

#[derive(Debug, Default)]
pub(crate) struct TestBelief {
    triggers: BTreeSet<TriggerId>,
    gates: BTreeSet<GateId>,
    active: BTreeSet<TriggerId>,
    open: BTreeSet<GateId>,
    unreachable: BTreeSet<TriggerId>,
    behind: BTreeMap<EntityId, GateId>,
    room: Option<RoomView>,
    alive: bool,
    links: LinkMapV1,
}

impl BeliefModelV1 for TestBelief {
    fn known_triggers(&self) -> BTreeSet<TriggerId> {
        self.triggers.clone()
    }
    fn known_gates(&self) -> BTreeSet<GateId> {
        self.gates.clone()
    }
    fn is_active(&self, trigger: &TriggerId) -> bool {
        self.active.contains(trigger)
    }
    fn is_open(&self, gate: &GateId) -> bool {
        self.open.contains(gate)
    }
    fn is_reachable(&self, id: &EntityId) -> bool {
        let blocked = self.behind.get(id).is_some_and(|g| !self.open.contains(g));
        match id {
            EntityId::Trigger(t) => !blocked && !self.unreachable.contains(t),
            EntityId::Gate(_) => !blocked,
        }
    }
    fn reachable_triggers(&self) -> BTreeSet<TriggerId> {
        self.triggers
            .iter()
            .filter(|t| self.is_reachable(&EntityId::Trigger((*t).clone())))
            .cloned()
            .collect()
    }
    fn find_enabling_gate(&self, blocked: &EntityId) -> Option<GateId> {
        self.behind
            .get(blocked)
            .filter(|g| !self.open.contains(*g))
            .cloned()
    }
    fn is_agent_alive(&self) -> bool {
        self.alive
    }
    fn current_room_is_locked(&self) -> bool {
        self.room
            .as_ref()
            .is_some_and(|r| r.gates.iter().all(|g| !self.open.contains(g)))
    }
    fn current_room(&self) -> Option<RoomView> {
        self.room.clone()
    }
    fn links(&self) -> &LinkMapV1 {
        &self.links
    }
    fn links_mut(&mut self) -> &mut LinkMapV1 {
        &mut self.links
    }
}

pub(crate) struct TestWorld {
    wiring: BTreeMap<TriggerId, Vec<GateId>>,
    all_gates: BTreeSet<GateId>,
    hazards: BTreeSet<TriggerId>,
    initially_open: BTreeSet<GateId>,
    clock: ManualClock,
    pub restart_cost: u64,
    pub restart_free: u64,
    pub interrupt_after_ticks: Option<u64>,
    total_ticks: u64,
    belief: TestBelief,
    goal: Option<SubGoal>,
    progress: u32,
    x: f32,
}

impl TestWorld {
    pub(crate) fn new(wiring: &[(&str, &[&str])], gates: &[&str]) -> Self {
        Self {
            wiring: wiring
                .iter()
                .map(|(t, gs)| (TriggerId::from(*t), gs.iter().map(|g| GateId::from(*g)).collect()))
                .collect(),
            all_gates: gates.iter().map(|g| GateId::from(*g)).collect(),
            hazards: BTreeSet::new(),
            initially_open: BTreeSet::new(),
            clock: ManualClock::new(),
            restart_cost: 0,
            restart_free: 0,
            interrupt_after_ticks: None,
            total_ticks: 0,
            belief: TestBelief {
                alive: true,
                ..TestBelief::default()
            },
            goal: None,
            progress: 0,
            x: 0.0,
        }
    }

    /// b1 -> d1, b2 -> d2, b3 -> nothing.
    pub(crate) fn scenario() -> Self {
        Self::new(&[("b1", &["d1"]), ("b2", &["d2"]), ("b3", &[])], &["d1", "d2"])
    }

    pub(crate) fn clock(&self) -> ManualClock {
        self.clock.clone()
    }

    pub(crate) fn add_hazard(&mut self, name: &str) {
        let t = TriggerId::from(name);
        self.wiring.insert(t.clone(), Vec::new());
        self.hazards.insert(t);
    }

    pub(crate) fn make_unreachable(&mut self, name: &str) {
        self.belief.unreachable.insert(TriggerId::from(name));
    }

    /// `trigger` can only be reached while `gate` is open.
    pub(crate) fn place_behind(&mut self, trigger: &str, gate: &str) {
        self.belief
            .behind
            .insert(EntityId::Trigger(TriggerId::from(trigger)), GateId::from(gate));
    }

    /// `blocked` can only be reached while `gate` is open.
    pub(crate) fn place_gate_behind(&mut self, blocked: &str, gate: &str) {
        self.belief
            .behind
            .insert(EntityId::Gate(GateId::from(blocked)), GateId::from(gate));
    }

    /// Report the agent's room with these entities, so a room with every
    /// gate closed reads as locked.
    pub(crate) fn set_room(&mut self, triggers: &[&str], gates: &[&str]) {
        self.belief.room = Some(RoomView {
            triggers: triggers.iter().map(|t| TriggerId::from(*t)).collect(),
            gates: gates.iter().map(|g| GateId::from(*g)).collect(),
        });
    }

    pub(crate) fn set_initially_open(&mut self, name: &str) {
        self.initially_open.insert(GateId::from(name));
        self.belief.open.insert(GateId::from(name));
    }

    fn toggle(&mut self, trigger: &TriggerId, changes: &mut Vec<ObservedChange>) {
        if !self.belief.active.remove(trigger) {
            self.belief.active.insert(trigger.clone());
        }
        changes.push(ObservedChange::Trigger(trigger.clone()));
        for gate in self.wiring.get(trigger).cloned().unwrap_or_default() {
            if !self.belief.open.remove(&gate) {
                self.belief.open.insert(gate.clone());
            }
            changes.push(ObservedChange::Gate(gate));
        }
        if self.hazards.contains(trigger) {
            self.belief.alive = false;
        }
    }
}

impl ActuationLayerV1 for TestWorld {
    type Belief = TestBelief;

    fn restart(&mut self) -> Result<SessionCost, Interrupted> {
        self.clock.advance(self.restart_cost);
        self.belief.active.clear();
        self.belief.open = self.initially_open.clone();
        self.belief.alive = true;
        self.goal = None;
        self.progress = 0;
        self.x = 0.0;
        Ok(SessionCost {
            free_millis: self.restart_free,
        })
    }

    fn belief(&self) -> &TestBelief {
        &self.belief
    }

    fn belief_mut(&mut self) -> &mut TestBelief {
        &mut self.belief
    }

    fn dispatch(&mut self, goal: &SubGoal) {
        self.goal = Some(goal.clone());
        self.progress = 0;
    }

    fn tick(&mut self) -> Result<TickObservation, Interrupted> {
        if self.interrupt_after_ticks.is_some_and(|n| self.total_ticks >= n) {
            return Err(Interrupted::new("test interrupt"));
        }
        self.total_ticks += 1;
        self.clock.advance(TICK_MILLIS);
        self.progress += 1;

        let mut changes = Vec::new();
        let status = match self.goal.clone() {
            None => GoalStatus::InProgress,
            Some(SubGoal::Explore) => {
                self.belief.triggers.extend(self.wiring.keys().cloned());
                self.belief.gates.extend(self.all_gates.iter().cloned());
                GoalStatus::Succeeded
            }
            Some(SubGoal::Observe(_)) => GoalStatus::Succeeded,
            Some(SubGoal::Interact(t)) => self.step_interact(&t, false, &mut changes),
            Some(SubGoal::InteractThenObserve { trigger, .. }) => {
                self.step_interact(&trigger, true, &mut changes)
            }
        };
        Ok(TickObservation {
            status,
            changes,
            position: Some(Position::new(self.x, 0.0)),
        })
    }
}

impl TestWorld {
    fn step_interact(
        &mut self,
        trigger: &TriggerId,
        then_observe: bool,
        changes: &mut Vec<ObservedChange>,
    ) -> GoalStatus {
        if !self.belief.triggers.contains(trigger) {
            return GoalStatus::Failed;
        }
        if !self.belief.is_reachable(&EntityId::Trigger(trigger.clone())) {
            return GoalStatus::InProgress;
        }
        match self.progress {
            1 => {
                self.x += 1.0;
                GoalStatus::InProgress
            }
            2 => {
                self.toggle(trigger, changes);
                if then_observe {
                    GoalStatus::InProgress
                } else {
                    GoalStatus::Succeeded
                }
            }
            _ => GoalStatus::Succeeded,
        }
    }
}
