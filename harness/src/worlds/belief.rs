//! `RoomBelief`: what the simulated agent has seen.
//!
//! The simulator updates it as the agent enters rooms. Topology is learned
//! from observation only: a trigger's room once the trigger is seen, both
//! rooms of a gate once the gate is seen. Reachability is computed over the
//! gates believed open, never over the hidden world.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use linkscout_kernel::model::belief::{BeliefModelV1, RoomView};
use linkscout_kernel::model::ids::{EntityId, GateId, TriggerId};
use linkscout_kernel::model::link::LinkMapV1;

#[derive(Debug, Clone, Default)]
pub struct RoomBelief {
    agent_room: String,
    alive: bool,
    rooms_seen: BTreeSet<String>,
    trigger_rooms: BTreeMap<TriggerId, String>,
    gate_rooms: BTreeMap<GateId, (String, String)>,
    trigger_states: BTreeMap<TriggerId, bool>,
    gate_states: BTreeMap<GateId, bool>,
    links: LinkMapV1,
}

impl RoomBelief {
    pub(crate) fn new(start_room: &str) -> Self {
        Self {
            agent_room: start_room.to_string(),
            alive: true,
            ..Self::default()
        }
    }

    /// Forget entity states for a new session. Topology and links survive.
    pub(crate) fn reset_session(&mut self, start_room: &str) {
        self.agent_room = start_room.to_string();
        self.alive = true;
        self.trigger_states.clear();
        self.gate_states.clear();
    }

    pub(crate) fn enter_room(&mut self, room: &str) {
        self.agent_room = room.to_string();
        self.rooms_seen.insert(room.to_string());
    }

    /// Record a sighting. Returns whether a previously known state changed.
    pub(crate) fn see_trigger(&mut self, trigger: &TriggerId, room: &str, active: bool) -> bool {
        self.trigger_rooms
            .entry(trigger.clone())
            .or_insert_with(|| room.to_string());
        let previous = self.trigger_states.insert(trigger.clone(), active);
        previous.is_some_and(|p| p != active)
    }

    /// Record a sighting. Returns whether a previously known state changed.
    pub(crate) fn see_gate(&mut self, gate: &GateId, rooms: &(String, String), open: bool) -> bool {
        self.gate_rooms
            .entry(gate.clone())
            .or_insert_with(|| rooms.clone());
        let previous = self.gate_states.insert(gate.clone(), open);
        previous.is_some_and(|p| p != open)
    }

    pub(crate) fn mark_dead(&mut self) {
        self.alive = false;
    }

    #[must_use]
    pub fn agent_room(&self) -> &str {
        &self.agent_room
    }

    #[must_use]
    pub fn rooms_seen(&self) -> &BTreeSet<String> {
        &self.rooms_seen
    }

    /// Rooms connected to the agent's room through gates believed open,
    /// treating `extra_open` as open as well.
    fn reachable_rooms(&self, extra_open: Option<&GateId>) -> BTreeSet<String> {
        let mut reached = BTreeSet::from([self.agent_room.clone()]);
        let mut queue = VecDeque::from([self.agent_room.clone()]);
        while let Some(room) = queue.pop_front() {
            for (gate, (a, b)) in &self.gate_rooms {
                if !(self.is_open(gate) || extra_open == Some(gate)) {
                    continue;
                }
                let other = if *a == room {
                    b
                } else if *b == room {
                    a
                } else {
                    continue;
                };
                if reached.insert(other.clone()) {
                    queue.push_back(other.clone());
                }
            }
        }
        reached
    }

    fn reachable_within(&self, id: &EntityId, rooms: &BTreeSet<String>) -> bool {
        match id {
            EntityId::Trigger(t) => self.trigger_rooms.get(t).is_some_and(|r| rooms.contains(r)),
            EntityId::Gate(g) => self
                .gate_rooms
                .get(g)
                .is_some_and(|(a, b)| rooms.contains(a) || rooms.contains(b)),
        }
    }

    fn gates_of_current_room(&self) -> Vec<GateId> {
        self.gate_rooms
            .iter()
            .filter(|(_, (a, b))| *a == self.agent_room || *b == self.agent_room)
            .map(|(g, _)| g.clone())
            .collect()
    }
}

impl BeliefModelV1 for RoomBelief {
    fn known_triggers(&self) -> BTreeSet<TriggerId> {
        self.trigger_rooms.keys().cloned().collect()
    }

    fn known_gates(&self) -> BTreeSet<GateId> {
        self.gate_rooms.keys().cloned().collect()
    }

    fn is_active(&self, trigger: &TriggerId) -> bool {
        self.trigger_states.get(trigger).copied().unwrap_or(false)
    }

    fn is_open(&self, gate: &GateId) -> bool {
        self.gate_states.get(gate).copied().unwrap_or(false)
    }

    fn is_reachable(&self, id: &EntityId) -> bool {
        self.reachable_within(id, &self.reachable_rooms(None))
    }

    fn reachable_triggers(&self) -> BTreeSet<TriggerId> {
        let rooms = self.reachable_rooms(None);
        self.trigger_rooms
            .iter()
            .filter(|(_, r)| rooms.contains(*r))
            .map(|(t, _)| t.clone())
            .collect()
    }

    fn find_enabling_gate(&self, blocked: &EntityId) -> Option<GateId> {
        let reachable = self.reachable_rooms(None);
        if self.reachable_within(blocked, &reachable) {
            return None;
        }
        self.gate_rooms
            .iter()
            .filter(|(g, (a, b))| {
                !self.is_open(g)
                    && (reachable.contains(a) || reachable.contains(b))
                    && *blocked != EntityId::Gate((*g).clone())
            })
            .map(|(g, _)| g)
            .find(|g| self.reachable_within(blocked, &self.reachable_rooms(Some(*g))))
            .cloned()
    }

    fn is_agent_alive(&self) -> bool {
        self.alive
    }

    fn current_room_is_locked(&self) -> bool {
        let gates = self.gates_of_current_room();
        !gates.is_empty() && gates.iter().all(|g| !self.is_open(g))
    }

    fn current_room(&self) -> Option<RoomView> {
        let triggers = self
            .trigger_rooms
            .iter()
            .filter(|(_, r)| **r == self.agent_room)
            .map(|(t, _)| t.clone())
            .collect();
        Some(RoomView {
            triggers,
            gates: self.gates_of_current_room(),
        })
    }

    fn links(&self) -> &LinkMapV1 {
        &self.links
    }

    fn links_mut(&mut self) -> &mut LinkMapV1 {
        &mut self.links
    }
}
