//! `SimulatedWorld`: a deterministic rooms-and-gates environment.
//!
//! The agent moves one room per tick along the shortest path through gates
//! that are actually open. Entering a room reveals its triggers and the
//! gates on its walls; a state differing from the last sighting is reported
//! as a change, triggers before gates. Every tick advances a shared
//! [`ManualClock`] by a fixed cost, so a run with a fixed seed is
//! reproducible.
//!
//! Targets that cannot be reached leave the agent standing still with the
//! sub-goal in progress; the engine's turn cap or stuck detector ends it.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::debug;

use linkscout_kernel::model::belief::BeliefModelV1;
use linkscout_kernel::model::ids::{GateId, TriggerId};
use linkscout_search::clock::ManualClock;
use linkscout_search::contract::{
    ActuationLayerV1, GoalStatus, ObservedChange, Position, SessionCost, SubGoal, TickObservation,
};
use linkscout_search::error::Interrupted;

use crate::error::HarnessError;
use crate::worlds::belief::RoomBelief;
use crate::worlds::definition::{Layout, WorldDefinitionV1};

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Simulated cost of one tick.
pub const DEFAULT_TICK_MILLIS: u64 = 50;

/// Simulated cost of building a session. Charged to the budget.
pub const DEFAULT_SETUP_MILLIS: u64 = 400;

/// Simulated cost of tearing a session down. Refunded to the budget.
pub const DEFAULT_TEARDOWN_MILLIS: u64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimTimingV1 {
    pub tick_millis: u64,
    pub setup_millis: u64,
    pub teardown_millis: u64,
}

impl Default for SimTimingV1 {
    fn default() -> Self {
        Self {
            tick_millis: DEFAULT_TICK_MILLIS,
            setup_millis: DEFAULT_SETUP_MILLIS,
            teardown_millis: DEFAULT_TEARDOWN_MILLIS,
        }
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

enum Route {
    Here,
    Next(String),
    Unreachable,
}

pub struct SimulatedWorld {
    layout: Layout,
    timing: SimTimingV1,
    clock: ManualClock,
    tick_limit: Option<u64>,
    total_ticks: u64,

    open: BTreeSet<GateId>,
    active: BTreeSet<TriggerId>,
    agent_room: String,
    alive: bool,

    goal: Option<SubGoal>,
    explored: BTreeSet<String>,
    interacted: bool,

    belief: RoomBelief,
}

impl SimulatedWorld {
    /// Build a world in its initial state with the agent in the start room.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidWorld`] if `def` fails validation.
    pub fn new(def: &WorldDefinitionV1) -> Result<Self, HarnessError> {
        def.validate()?;
        let layout = Layout::new(def);
        let belief = RoomBelief::new(&layout.start_room);
        let mut world = Self {
            open: layout.initially_open.clone(),
            active: BTreeSet::new(),
            agent_room: layout.start_room.clone(),
            alive: true,
            goal: None,
            explored: BTreeSet::new(),
            interacted: false,
            belief,
            timing: SimTimingV1::default(),
            clock: ManualClock::new(),
            tick_limit: None,
            total_ticks: 0,
            layout,
        };
        world.observe_room(&mut Vec::new());
        Ok(world)
    }

    #[must_use]
    pub fn with_timing(mut self, timing: SimTimingV1) -> Self {
        self.timing = timing;
        self
    }

    /// Raise [`Interrupted`] from every call once `ticks` ticks have run,
    /// the way a caller-imposed hard timeout would.
    #[must_use]
    pub fn with_tick_limit(mut self, ticks: u64) -> Self {
        self.tick_limit = Some(ticks);
        self
    }

    /// The clock this world advances. Hand a clone to the engine.
    #[must_use]
    pub fn clock(&self) -> ManualClock {
        self.clock.clone()
    }

    #[must_use]
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    #[must_use]
    pub fn agent_room(&self) -> &str {
        &self.agent_room
    }

    fn interrupted(&self) -> bool {
        self.tick_limit.is_some_and(|n| self.total_ticks >= n)
    }

    fn position(&self) -> Position {
        let (x, y) = self
            .layout
            .positions
            .get(&self.agent_room)
            .copied()
            .unwrap_or_default();
        Position::new(f32::from(x), f32::from(y))
    }

    /// Next hop on a shortest path through open gates to any of `targets`.
    fn route(&self, targets: &BTreeSet<String>) -> Route {
        if targets.contains(&self.agent_room) {
            return Route::Here;
        }
        let mut first_hop: BTreeMap<String, String> = BTreeMap::new();
        let mut queue = VecDeque::from([self.agent_room.clone()]);
        let mut seen = BTreeSet::from([self.agent_room.clone()]);
        while let Some(room) = queue.pop_front() {
            for (gate, other) in self.layout.adjacency.get(&room).into_iter().flatten() {
                if !self.open.contains(gate) || !seen.insert(other.clone()) {
                    continue;
                }
                let hop = first_hop.get(&room).cloned().unwrap_or_else(|| other.clone());
                if targets.contains(other) {
                    return Route::Next(hop);
                }
                first_hop.insert(other.clone(), hop);
                queue.push_back(other.clone());
            }
        }
        Route::Unreachable
    }

    /// Rooms the agent could walk to right now.
    fn reachable_rooms(&self) -> BTreeSet<String> {
        let mut reached = BTreeSet::from([self.agent_room.clone()]);
        let mut queue = VecDeque::from([self.agent_room.clone()]);
        while let Some(room) = queue.pop_front() {
            for (gate, other) in self.layout.adjacency.get(&room).into_iter().flatten() {
                if self.open.contains(gate) && reached.insert(other.clone()) {
                    queue.push_back(other.clone());
                }
            }
        }
        reached
    }

    fn move_to(&mut self, room: String, changes: &mut Vec<ObservedChange>) {
        debug!(from = %self.agent_room, to = %room, "agent moved");
        self.agent_room = room;
        self.observe_room(changes);
    }

    /// Look around the current room: triggers first, then its gates.
    fn observe_room(&mut self, changes: &mut Vec<ObservedChange>) {
        let room = self.agent_room.clone();
        self.belief.enter_room(&room);
        for trigger in self.layout.triggers_in(&room) {
            let active = self.active.contains(&trigger);
            if self.belief.see_trigger(&trigger, &room, active) {
                changes.push(ObservedChange::Trigger(trigger));
            }
        }
        for gate in self.layout.gates_of(&room) {
            let open = self.open.contains(&gate);
            let Some(rooms) = self.layout.gate_rooms.get(&gate) else {
                continue;
            };
            if self.belief.see_gate(&gate, rooms, open) {
                changes.push(ObservedChange::Gate(gate));
            }
        }
    }

    fn toggle(&mut self, trigger: &TriggerId, changes: &mut Vec<ObservedChange>) {
        if !self.active.remove(trigger) {
            self.active.insert(trigger.clone());
        }
        for gate in self.layout.wiring.get(trigger).into_iter().flatten() {
            if !self.open.remove(gate) {
                self.open.insert(gate.clone());
            }
        }
        debug!(trigger = %trigger, room = %self.agent_room, "trigger toggled");
        self.observe_room(changes);
        if self.layout.hazards.contains(trigger) {
            debug!(trigger = %trigger, "hazard trigger killed the agent");
            self.alive = false;
            self.belief.mark_dead();
        }
    }

    fn walk(&mut self, targets: &BTreeSet<String>, changes: &mut Vec<ObservedChange>) -> Option<bool> {
        match self.route(targets) {
            Route::Here => Some(true),
            Route::Next(room) => {
                self.move_to(room, changes);
                Some(false)
            }
            Route::Unreachable => None,
        }
    }

    fn step_explore(&mut self, changes: &mut Vec<ObservedChange>) -> GoalStatus {
        self.explored.insert(self.agent_room.clone());
        let targets: BTreeSet<String> = self
            .reachable_rooms()
            .difference(&self.explored)
            .cloned()
            .collect();
        if targets.is_empty() {
            self.observe_room(changes);
            return GoalStatus::Succeeded;
        }
        match self.route(&targets) {
            Route::Next(room) => {
                self.move_to(room.clone(), changes);
                self.explored.insert(room);
                GoalStatus::InProgress
            }
            Route::Here | Route::Unreachable => GoalStatus::Succeeded,
        }
    }

    fn step_interact(&mut self, trigger: &TriggerId, changes: &mut Vec<ObservedChange>) -> GoalStatus {
        if !self.belief.known_triggers().contains(trigger) {
            return GoalStatus::Failed;
        }
        let Some(room) = self.layout.trigger_room.get(trigger).cloned() else {
            return GoalStatus::Failed;
        };
        match self.walk(&BTreeSet::from([room]), changes) {
            Some(true) => {
                self.toggle(trigger, changes);
                GoalStatus::Succeeded
            }
            Some(false) | None => GoalStatus::InProgress,
        }
    }

    fn step_observe(&mut self, gate: &GateId, changes: &mut Vec<ObservedChange>) -> GoalStatus {
        if !self.belief.known_gates().contains(gate) {
            return GoalStatus::Failed;
        }
        let Some((a, b)) = self.layout.gate_rooms.get(gate).cloned() else {
            return GoalStatus::Failed;
        };
        match self.walk(&BTreeSet::from([a, b]), changes) {
            Some(true) => {
                self.observe_room(changes);
                GoalStatus::Succeeded
            }
            Some(false) | None => GoalStatus::InProgress,
        }
    }
}

impl ActuationLayerV1 for SimulatedWorld {
    type Belief = RoomBelief;

    fn restart(&mut self) -> Result<SessionCost, Interrupted> {
        if self.interrupted() {
            return Err(Interrupted::new("simulation tick limit reached"));
        }
        self.clock
            .advance(self.timing.teardown_millis + self.timing.setup_millis);
        self.open = self.layout.initially_open.clone();
        self.active.clear();
        self.agent_room = self.layout.start_room.clone();
        self.alive = true;
        self.goal = None;
        self.explored.clear();
        self.interacted = false;
        self.belief.reset_session(&self.layout.start_room);
        self.observe_room(&mut Vec::new());
        Ok(SessionCost {
            free_millis: self.timing.teardown_millis,
        })
    }

    fn belief(&self) -> &RoomBelief {
        &self.belief
    }

    fn belief_mut(&mut self) -> &mut RoomBelief {
        &mut self.belief
    }

    fn dispatch(&mut self, goal: &SubGoal) {
        self.goal = Some(goal.clone());
        self.explored.clear();
        self.interacted = false;
    }

    fn tick(&mut self) -> Result<TickObservation, Interrupted> {
        if self.interrupted() {
            return Err(Interrupted::new("simulation tick limit reached"));
        }
        self.total_ticks += 1;
        self.clock.advance(self.timing.tick_millis);

        let mut changes = Vec::new();
        let status = if self.alive {
            match self.goal.clone() {
                None => GoalStatus::InProgress,
                Some(SubGoal::Explore) => self.step_explore(&mut changes),
                Some(SubGoal::Interact(t)) => self.step_interact(&t, &mut changes),
                Some(SubGoal::Observe(g)) => self.step_observe(&g, &mut changes),
                Some(SubGoal::InteractThenObserve { trigger, gate }) => {
                    if self.interacted {
                        self.step_observe(&gate, &mut changes)
                    } else {
                        match self.step_interact(&trigger, &mut changes) {
                            GoalStatus::Succeeded => {
                                self.interacted = true;
                                GoalStatus::InProgress
                            }
                            other => other,
                        }
                    }
                }
            }
        } else {
            GoalStatus::Failed
        };

        Ok(TickObservation {
            status,
            changes,
            position: Some(self.position()),
        })
    }
}
