//! Worklist exploration: a breadth-first sweep over discovered gates.
//!
//! Gates move between a FIFO `todo` list and a `done` set. Each round
//! explores, enqueues newly seen gates, and tries to open the front gate,
//! linked triggers first. Unreachable gates are repaired by promoting an
//! enabling gate, or rotated to the back. When an attempt reveals new
//! triggers, every done gate is re-queued because its candidate set grew.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::{debug, info};

use linkscout_kernel::model::belief::BeliefModelV1;
use linkscout_kernel::model::ids::{EntityId, GateId};

use crate::contract::ActuationLayerV1;
use crate::engine::{DeathPolicy, Engine, GateAttempt};
use crate::error::Interrupted;
use crate::policy::WorklistPolicy;
use crate::report::{TerminationReasonV1, UnresolvedGateV1, UnresolvedReasonV1};
use crate::strategy::Strategy;

#[derive(Debug, Clone, Default)]
pub struct WorklistStrategy {
    policy: WorklistPolicy,
    todo: VecDeque<GateId>,
    done: Vec<GateId>,
    seen: BTreeSet<GateId>,
    unresolved: BTreeMap<GateId, UnresolvedReasonV1>,
}

/// What to do with the front of `todo` this round.
enum Pick {
    Attempt(GateId),
    /// The front gate turned out open and moved to `done`.
    AlreadyOpen,
}

impl WorklistStrategy {
    #[must_use]
    pub fn new(policy: WorklistPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn todo(&self) -> &VecDeque<GateId> {
        &self.todo
    }

    #[must_use]
    pub fn done(&self) -> &[GateId] {
        &self.done
    }

    fn enqueue_new_gates(&mut self, belief: &dyn BeliefModelV1) {
        for gate in belief.known_gates() {
            if self.seen.insert(gate.clone()) {
                debug!(gate = %gate, "gate queued");
                self.todo.push_back(gate);
            }
        }
    }

    fn mark_done(&mut self, gate: &GateId) {
        self.todo.retain(|g| g != gate);
        if !self.done.contains(gate) {
            self.done.push(gate.clone());
        }
    }

    /// Steps 3-4: settle the front gate, repairing reachability if needed.
    fn pick(&mut self, belief: &dyn BeliefModelV1) -> Option<Pick> {
        // Promotions and rotations together are bounded by the number of
        // gates, so an enabling chain that never resolves still terminates.
        let mut repairs = self.todo.len() + self.done.len();
        loop {
            let front = self.todo.front()?.clone();
            if belief.is_open(&front) {
                debug!(gate = %front, "gate already open");
                self.unresolved.remove(&front);
                self.mark_done(&front);
                return Some(Pick::AlreadyOpen);
            }
            if belief.is_reachable(&EntityId::Gate(front.clone())) || repairs == 0 {
                return Some(Pick::Attempt(front));
            }
            repairs -= 1;
            if let Some(enabler) = belief.find_enabling_gate(&EntityId::Gate(front.clone())) {
                info!(gate = %front, enabler = %enabler, "unreachable gate; promoting enabler");
                self.todo.retain(|g| *g != enabler);
                self.done.retain(|g| *g != enabler);
                self.seen.insert(enabler.clone());
                self.todo.push_front(enabler);
                continue;
            }
            if self.todo.len() > 1 {
                debug!(gate = %front, "unreachable gate; rotating to back");
                self.todo.rotate_left(1);
                continue;
            }
            return Some(Pick::Attempt(front));
        }
    }
}

impl<E: ActuationLayerV1> Strategy<E> for WorklistStrategy {
    fn name(&self) -> &'static str {
        "worklist"
    }

    fn death_policy(&self) -> DeathPolicy {
        DeathPolicy::EndsSearch
    }

    fn run(&mut self, engine: &mut Engine<E>) -> Result<TerminationReasonV1, Interrupted> {
        let reason = loop {
            engine.explore()?;
            self.enqueue_new_gates(engine.belief());
            if engine.termination_reached() {
                break engine
                    .check_termination()
                    .unwrap_or(TerminationReasonV1::BudgetExhausted);
            }
            let gate = match self.pick(engine.belief()) {
                None => break TerminationReasonV1::WorklistExhausted,
                Some(Pick::AlreadyOpen) => continue,
                Some(Pick::Attempt(gate)) => gate,
            };

            let triggers_before = engine.belief().known_triggers().len();
            let attempt = engine.open_gate(&gate, self.policy)?;
            match attempt {
                GateAttempt::Opened => {
                    self.unresolved.remove(&gate);
                }
                GateAttempt::NotOpened => {
                    self.unresolved.insert(gate.clone(), UnresolvedReasonV1::NotOpened);
                }
                GateAttempt::NoCandidate => {
                    self.unresolved
                        .insert(gate.clone(), UnresolvedReasonV1::NoCandidateTrigger);
                }
            }
            if engine.belief().known_triggers().len() > triggers_before && !self.done.is_empty() {
                info!(requeued = self.done.len(), "new triggers found; re-queuing done gates");
                self.todo.extend(self.done.drain(..));
            }
            self.mark_done(&gate);
            debug!(gate = %gate, outcome = ?attempt, todo = self.todo.len(), "gate processed");
        };

        // A gate recorded as unresolved may have been opened later by another trigger.
        let belief = engine.belief();
        self.unresolved.retain(|g, _| !belief.is_open(g));
        info!(done = self.done.len(), unresolved = self.unresolved.len(), "worklist finished");
        Ok(reason)
    }

    fn unresolved_gates(&self) -> Vec<UnresolvedGateV1> {
        self.unresolved
            .iter()
            .map(|(gate, reason)| UnresolvedGateV1 {
                gate: gate.clone(),
                reason: *reason,
            })
            .collect()
    }
}
