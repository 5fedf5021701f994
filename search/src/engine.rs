//! Lifecycle engine: the operations every strategy composes with.
//!
//! The engine owns the actuation session, the budget, the goal predicate and
//! the random number generator. Strategies hold `&mut Engine` and call into
//! it; none of them talks to the actuation layer directly.
//!
//! # Edge inference
//!
//! After every tick the engine pulls newly observed entities into the link
//! registry, remembers the most recently toggled trigger, and records a link
//! from that trigger to every gate whose state changed. This is the only
//! place an `Unknown` pair becomes `Linked`.
//!
//! # Budget
//!
//! Elapsed clock time is charged at every checkpoint (top of each poll
//! iteration, around session restarts). Teardown time the actuation layer
//! declares free is refunded, never above the total.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use linkscout_kernel::model::belief::{BeliefModelV1, BeliefSnapshotV1};
use linkscout_kernel::model::goal::GoalPredicate;
use linkscout_kernel::model::ids::{EntityId, GateId, TriggerId};
use linkscout_kernel::model::link::{Link, LinkRecordOutcome, LinkStatus};
use linkscout_kernel::model::trace::TraceV1;

use crate::budget::Budget;
use crate::clock::Clock;
use crate::contract::{ActuationLayerV1, GoalStatus, ObservedChange, Position, SubGoal};
use crate::error::{Interrupted, SearchError};
use crate::policy::{EngineConfig, WorklistPolicy};
use crate::report::{RunCounters, TerminationReasonV1};

/// Whether agent death stops the whole run or only the current evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeathPolicy {
    /// Death is fatal to the run (worklist, random pairs).
    #[default]
    EndsSearch,
    /// Death invalidates the current chromosome, rollout or episode only.
    EndsEvaluation,
}

/// Outcome of [`Engine::open_gate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateAttempt {
    Opened,
    /// Every candidate was tried (or the run terminated) and the gate is closed.
    NotOpened,
    /// No trigger is linked or still unknown for the gate.
    NoCandidate,
}

/// Outcome of [`Engine::replay`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplayOutcome {
    /// Number of leading trace steps that were actually executed.
    pub executed: usize,
    /// Every step executed and the agent survived.
    pub completed: bool,
    pub died: bool,
    /// The goal predicate held before the trace ran out.
    pub goal_reached: bool,
}

pub struct Engine<E: ActuationLayerV1> {
    env: E,
    config: EngineConfig,
    clock: Box<dyn Clock>,
    budget: Budget,
    last_checkpoint: u64,
    goal: Option<Arc<dyn GoalPredicate>>,
    rng: StdRng,
    last_trigger: Option<TriggerId>,
    session_ticks: u64,
    counters: RunCounters,
    death_policy: DeathPolicy,
    harvested: BTreeSet<Link>,
    session_links: BTreeSet<Link>,
}

impl<E: ActuationLayerV1> Engine<E> {
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidConfig`] if the configuration fails
    /// validation or the budget is not positive.
    pub fn new(env: E, config: EngineConfig, clock: Box<dyn Clock>) -> Result<Self, SearchError> {
        config.validate()?;
        check_budget(config.total_budget_millis)?;
        let now = clock.now_millis();
        Ok(Self {
            budget: Budget::new(config.total_budget_millis),
            rng: StdRng::seed_from_u64(config.random_seed),
            env,
            config,
            clock,
            last_checkpoint: now,
            goal: None,
            last_trigger: None,
            session_ticks: 0,
            counters: RunCounters::default(),
            death_policy: DeathPolicy::default(),
            harvested: BTreeSet::new(),
            session_links: BTreeSet::new(),
        })
    }

    // --- configuration --------------------------------------------------

    /// Reset the budget to `total_millis`, starting now.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidConfig`] if `total_millis` is not positive.
    pub fn set_budget(&mut self, total_millis: i64) -> Result<(), SearchError> {
        check_budget(total_millis)?;
        self.config.total_budget_millis = total_millis;
        self.budget = Budget::new(total_millis);
        self.last_checkpoint = self.clock.now_millis();
        Ok(())
    }

    pub fn set_goal(&mut self, goal: Arc<dyn GoalPredicate>) {
        self.goal = Some(goal);
    }

    pub fn clear_goal(&mut self) {
        self.goal = None;
    }

    pub fn set_random_seed(&mut self, seed: u64) {
        self.config.random_seed = seed;
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn set_death_policy(&mut self, policy: DeathPolicy) {
        self.death_policy = policy;
    }

    // --- accessors ------------------------------------------------------

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }

    #[must_use]
    pub fn belief(&self) -> &E::Belief {
        self.env.belief()
    }

    #[must_use]
    pub fn into_env(self) -> E {
        self.env
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    #[must_use]
    pub fn budget(&self) -> Budget {
        self.budget
    }

    #[must_use]
    pub fn counters(&self) -> RunCounters {
        self.counters
    }

    #[must_use]
    pub fn has_goal(&self) -> bool {
        self.goal.is_some()
    }

    #[must_use]
    pub fn goal_description(&self) -> Option<String> {
        self.goal.as_ref().map(|g| g.describe())
    }

    /// Count one strategy-level evaluation (chromosome, rollout, episode, pair).
    pub fn note_evaluation(&mut self) {
        self.counters.evaluations += 1;
    }

    // --- lifecycle ------------------------------------------------------

    /// Charge the time elapsed since the previous checkpoint.
    pub fn checkpoint(&mut self) {
        let now = self.clock.now_millis();
        self.budget.charge(now.saturating_sub(self.last_checkpoint));
        self.last_checkpoint = now;
    }

    /// Start the run: reset counters and the checkpoint, then open the
    /// first session.
    ///
    /// # Errors
    ///
    /// Propagates [`Interrupted`] from the actuation layer.
    pub fn begin_run(&mut self) -> Result<(), Interrupted> {
        self.counters = RunCounters::default();
        self.last_checkpoint = self.clock.now_millis();
        self.restart_session()
    }

    /// Tear down the session and start from the initial world state.
    ///
    /// Setup time is charged; teardown time declared free is refunded.
    ///
    /// # Errors
    ///
    /// Propagates [`Interrupted`] from the actuation layer.
    pub fn restart_session(&mut self) -> Result<(), Interrupted> {
        self.harvest_links();
        self.checkpoint();
        let cost = self.env.restart()?;
        self.checkpoint();
        self.budget.refund(cost.free_millis);
        self.last_trigger = None;
        self.session_ticks = 0;
        self.session_links.clear();
        self.counters.sessions += 1;
        self.env.belief_mut().register_known_entities();
        debug!(
            session = self.counters.sessions,
            free_millis = cost.free_millis,
            remaining = self.budget.remaining(),
            "session restarted"
        );
        Ok(())
    }

    /// Whether the goal predicate holds on the current belief. `false` when
    /// no goal is set.
    #[must_use]
    pub fn goal_holds(&self) -> bool {
        self.goal
            .as_ref()
            .is_some_and(|g| g.evaluate(self.env.belief()))
    }

    /// The agent died during the current session.
    #[must_use]
    pub fn agent_dead(&self) -> bool {
        self.session_ticks > 0 && !self.env.belief().is_agent_alive()
    }

    /// The shared termination predicate, without charging elapsed time.
    #[must_use]
    pub fn check_termination(&self) -> Option<TerminationReasonV1> {
        if self.budget.is_exhausted() {
            return Some(TerminationReasonV1::BudgetExhausted);
        }
        if self.goal_holds() {
            return Some(TerminationReasonV1::GoalReached);
        }
        if self.death_policy == DeathPolicy::EndsSearch && self.agent_dead() {
            return Some(TerminationReasonV1::AgentDied);
        }
        None
    }

    /// Charge elapsed time, then evaluate the termination predicate.
    pub fn termination_reached(&mut self) -> bool {
        self.checkpoint();
        self.check_termination().is_some()
    }

    // --- sub-goals ------------------------------------------------------

    /// Dispatch `goal` and poll it until it succeeds, fails, hits
    /// `turn_cap` (`0` for no cap), gets stuck, or the run terminates.
    ///
    /// Agent death fails the sub-goal.
    ///
    /// # Errors
    ///
    /// Propagates [`Interrupted`] from the actuation layer.
    pub fn run_goal(&mut self, goal: &SubGoal, turn_cap: u32) -> Result<GoalStatus, Interrupted> {
        self.counters.sub_goals += 1;
        self.env.dispatch(goal);
        debug!(goal = %goal.describe(), turn_cap, "sub-goal dispatched");

        let stuck = self.config.stuck;
        let mut samples: VecDeque<Position> = VecDeque::with_capacity(stuck.window);
        let mut turns: u32 = 0;
        loop {
            self.checkpoint();
            if let Some(reason) = self.check_termination() {
                debug!(goal = %goal.describe(), reason = reason.as_str(), "sub-goal abandoned");
                return Ok(GoalStatus::InProgress);
            }
            if turn_cap > 0 && turns >= turn_cap {
                debug!(goal = %goal.describe(), turns, "sub-goal timed out");
                return Ok(GoalStatus::InProgress);
            }

            let obs = self.env.tick()?;
            turns += 1;
            self.session_ticks += 1;
            self.counters.turns += 1;
            self.absorb(&obs.changes);

            if !self.env.belief().is_agent_alive() {
                info!(goal = %goal.describe(), "agent died");
                return Ok(GoalStatus::Failed);
            }
            if obs.status != GoalStatus::InProgress {
                debug!(goal = %goal.describe(), turns, status = ?obs.status, "sub-goal finished");
                return Ok(obs.status);
            }

            if let Some(pos) = obs.position {
                if stuck.enabled && turns % stuck.sample_every == 0 {
                    if samples.len() == stuck.window {
                        samples.pop_front();
                    }
                    samples.push_back(pos);
                    if samples.len() == stuck.window && is_clustered(&samples, stuck.radius) {
                        warn!(goal = %goal.describe(), turns, "agent stuck; abandoning sub-goal");
                        return Ok(GoalStatus::InProgress);
                    }
                }
            }
        }
    }

    fn absorb(&mut self, changes: &[ObservedChange]) {
        let belief = self.env.belief_mut();
        let added = belief.register_known_entities();
        if added > 0 {
            debug!(added, "registered new trigger/gate pairs");
        }
        for change in changes {
            match change {
                ObservedChange::Trigger(t) => self.last_trigger = Some(t.clone()),
                ObservedChange::Gate(g) => {
                    let Some(t) = &self.last_trigger else {
                        continue;
                    };
                    self.session_links.insert(Link::new(t.clone(), g.clone()));
                    match belief.record_link(t, g) {
                        LinkRecordOutcome::Recorded => {
                            info!(trigger = %t, gate = %g, "link inferred");
                        }
                        LinkRecordOutcome::ConflictOverwritten => {
                            warn!(trigger = %t, gate = %g, "link overwrites earlier non-link");
                        }
                        LinkRecordOutcome::Unchanged | LinkRecordOutcome::NonLinkIgnored => {}
                    }
                }
            }
        }
    }

    /// # Errors
    ///
    /// Propagates [`Interrupted`] from the actuation layer.
    pub fn explore(&mut self) -> Result<GoalStatus, Interrupted> {
        let cap = self.config.exploration_turns;
        self.run_goal(&SubGoal::Explore, cap)
    }

    /// # Errors
    ///
    /// Propagates [`Interrupted`] from the actuation layer.
    pub fn interact(&mut self, trigger: &TriggerId) -> Result<GoalStatus, Interrupted> {
        let cap = self.config.turns_per_goal;
        self.run_goal(&SubGoal::Interact(trigger.clone()), cap)
    }

    /// Toggle `trigger`, then look at `gate`.
    ///
    /// If the trigger's state did not change the observation says nothing
    /// and is discarded. Otherwise a gate still closed afterwards is
    /// recorded as not linked to the trigger.
    ///
    /// # Errors
    ///
    /// Propagates [`Interrupted`] from the actuation layer.
    pub fn check_pair(&mut self, trigger: &TriggerId, gate: &GateId) -> Result<GoalStatus, Interrupted> {
        let before = self.env.belief().is_active(trigger);
        let goal = SubGoal::InteractThenObserve {
            trigger: trigger.clone(),
            gate: gate.clone(),
        };
        let cap = self.config.turns_per_goal;
        let status = self.run_goal(&goal, cap)?;
        if self.env.belief().is_active(trigger) == before {
            debug!(trigger = %trigger, gate = %gate, "trigger state unchanged; pair not judged");
            return Ok(status);
        }
        if !self.env.belief().is_open(gate) {
            match self.env.belief_mut().record_non_link(trigger, gate) {
                LinkRecordOutcome::NonLinkIgnored => {
                    warn!(trigger = %trigger, gate = %gate, "non-link ignored for linked pair");
                }
                LinkRecordOutcome::Recorded => {
                    debug!(trigger = %trigger, gate = %gate, "non-link recorded");
                }
                LinkRecordOutcome::Unchanged | LinkRecordOutcome::ConflictOverwritten => {}
            }
        }
        Ok(status)
    }

    /// Try to open `gate`: linked triggers first, then triggers whose link
    /// is still unknown, stopping at the first success.
    ///
    /// Before each candidate the fallbacks enabled in `policy` run, in this
    /// order: escaping a locked room, then opening the gates that cut the
    /// candidate off. Neither presses the candidate or a trigger linked to
    /// `gate`. A candidate that stays out of reach is skipped when the
    /// reachability fallback is on.
    ///
    /// # Errors
    ///
    /// Propagates [`Interrupted`] from the actuation layer.
    pub fn open_gate(&mut self, gate: &GateId, policy: WorklistPolicy) -> Result<GateAttempt, Interrupted> {
        let links = self.env.belief().links();
        let mut candidates = links.linked_triggers(gate);
        candidates.extend(links.unknown_triggers(gate));
        if candidates.is_empty() {
            debug!(gate = %gate, "no candidate trigger");
            return Ok(GateAttempt::NoCandidate);
        }
        for trigger in candidates {
            if self.termination_reached() {
                break;
            }
            if policy.unlock_when_trapped {
                self.unlock_if_trapped(Some((&trigger, gate)))?;
            }
            if policy.repair_reachability && !self.repair_reachability(&trigger, gate)? {
                debug!(gate = %gate, trigger = %trigger, "candidate out of reach; skipped");
                continue;
            }
            if !self.env.belief().is_agent_alive() {
                break;
            }
            if self.env.belief().is_open(gate) {
                debug!(gate = %gate, "gate opened by a fallback press");
                return Ok(GateAttempt::Opened);
            }
            self.check_pair(&trigger, gate)?;
            if self.env.belief().is_open(gate) {
                debug!(gate = %gate, trigger = %trigger, "gate opened");
                return Ok(GateAttempt::Opened);
            }
            if !self.env.belief().is_agent_alive() {
                break;
            }
        }
        Ok(GateAttempt::NotOpened)
    }

    /// If every gate of the current room is closed, press a trigger already
    /// linked to one of the room's gates, visiting the gates in random order.
    ///
    /// With `attempt = Some((candidate, target))` the press leaves that
    /// attempt intact: `target` is not used as an exit, and neither
    /// `candidate` nor any trigger linked to `target` is pressed.
    ///
    /// Returns whether a press was made.
    ///
    /// # Errors
    ///
    /// Propagates [`Interrupted`] from the actuation layer.
    pub fn unlock_if_trapped(&mut self, attempt: Option<(&TriggerId, &GateId)>) -> Result<bool, Interrupted> {
        let belief = self.env.belief();
        if !belief.current_room_is_locked() {
            return Ok(false);
        }
        let Some(room) = belief.current_room() else {
            return Ok(false);
        };
        let mut gates = room.gates;
        gates.shuffle(&mut self.rng);
        for gate in gates {
            if attempt.is_some_and(|(_, target)| *target == gate) {
                continue;
            }
            let Some(trigger) = self.fallback_trigger(&gate, attempt) else {
                continue;
            };
            info!(trigger = %trigger, gate = %gate, "room locked; trying to escape");
            self.check_pair(&trigger, &gate)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Open the gates that cut `candidate` off from the agent, one enabling
    /// gate per round, each with a trigger already linked to it.
    ///
    /// Neither `candidate` nor any trigger linked to `target` is pressed.
    /// Returns whether `candidate` is reachable afterwards.
    ///
    /// # Errors
    ///
    /// Propagates [`Interrupted`] from the actuation layer.
    pub fn repair_reachability(&mut self, candidate: &TriggerId, target: &GateId) -> Result<bool, Interrupted> {
        let blocked = EntityId::Trigger(candidate.clone());
        let rounds = self.env.belief().known_gates().len();
        for _ in 0..rounds {
            if self.env.belief().is_reachable(&blocked) || self.termination_reached() {
                break;
            }
            let Some(enabler) = self.env.belief().find_enabling_gate(&blocked) else {
                break;
            };
            let Some(trigger) = self.fallback_trigger(&enabler, Some((candidate, target))) else {
                debug!(candidate = %candidate, enabler = %enabler, "no usable trigger for enabling gate");
                break;
            };
            info!(
                candidate = %candidate,
                enabler = %enabler,
                trigger = %trigger,
                "candidate cut off; opening enabling gate"
            );
            self.check_pair(&trigger, &enabler)?;
            let belief = self.env.belief();
            if !belief.is_open(&enabler) || !belief.is_agent_alive() {
                break;
            }
        }
        Ok(self.env.belief().is_reachable(&blocked))
    }

    /// A reachable trigger linked to `gate` that leaves `attempt` intact.
    fn fallback_trigger(&self, gate: &GateId, attempt: Option<(&TriggerId, &GateId)>) -> Option<TriggerId> {
        let belief = self.env.belief();
        let reachable = belief.reachable_triggers();
        belief.links().linked_triggers(gate).into_iter().find(|t| {
            reachable.contains(t)
                && !attempt.is_some_and(|(candidate, target)| {
                    t == candidate || belief.link_status(t, target) == LinkStatus::Linked
                })
        })
    }

    /// Re-execute `trace` in a fresh session: explore, then interact with
    /// each trigger in order, re-exploring after every step.
    ///
    /// Stops early on death, on a failed or timed-out interaction, when the
    /// budget runs out, or (with `stop_at_goal`) once the goal holds.
    ///
    /// # Errors
    ///
    /// Propagates [`Interrupted`] from the actuation layer.
    pub fn replay(&mut self, trace: &TraceV1, stop_at_goal: bool) -> Result<ReplayOutcome, Interrupted> {
        self.restart_session()?;
        self.explore()?;
        let mut outcome = ReplayOutcome::default();
        for trigger in trace {
            self.checkpoint();
            if self.budget.is_exhausted() {
                break;
            }
            if stop_at_goal && self.goal_holds() {
                break;
            }
            let status = self.interact(trigger)?;
            if !self.env.belief().is_agent_alive() {
                outcome.executed += 1;
                outcome.died = true;
                break;
            }
            if !status.is_success() {
                debug!(trigger = %trigger, status = ?status, "replay step failed");
                break;
            }
            outcome.executed += 1;
            self.explore()?;
        }
        outcome.completed = !outcome.died && outcome.executed == trace.len();
        outcome.goal_reached = self.goal_holds();
        Ok(outcome)
    }

    /// Value of the current session: `max_value` when the goal holds,
    /// otherwise `link_weight * session links + open gates`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn state_value(&self, link_weight: f32, max_value: f32) -> f32 {
        if self.goal_holds() {
            return max_value;
        }
        link_weight * self.session_links.len() as f32 + self.env.belief().open_gates().len() as f32
    }

    /// Links observed since the last session restart.
    ///
    /// Scores must come from here: the belief's link registry keeps every
    /// link of the run, so it depends on what earlier sessions did.
    #[must_use]
    pub fn session_links(&self) -> &BTreeSet<Link> {
        &self.session_links
    }

    /// Snapshot of the current session, with links limited to
    /// [`Engine::session_links`].
    #[must_use]
    pub fn snapshot(&self) -> BeliefSnapshotV1 {
        let belief = self.env.belief();
        BeliefSnapshotV1 {
            links: self.session_links.clone(),
            open_gates: belief.open_gates(),
            active_triggers: belief.active_triggers(),
            agent_alive: belief.is_agent_alive(),
            goal_holds: self.goal_holds(),
        }
    }

    fn harvest_links(&mut self) {
        let confirmed = self.env.belief().confirmed_links();
        self.harvested.extend(confirmed);
    }

    /// Links confirmed in any session of this run.
    #[must_use]
    pub fn discovered_links(&self) -> BTreeSet<Link> {
        let mut links = self.harvested.clone();
        links.extend(self.env.belief().confirmed_links());
        links
    }
}

fn check_budget(total_millis: i64) -> Result<(), SearchError> {
    if total_millis <= 0 {
        return Err(SearchError::InvalidConfig {
            detail: format!("budget must be positive, got {total_millis} ms"),
        });
    }
    Ok(())
}

fn is_clustered(samples: &VecDeque<Position>, radius: f32) -> bool {
    let Some(anchor) = samples.front() else {
        return false;
    };
    let limit = radius * radius;
    samples.iter().all(|p| p.dist_sq(anchor) <= limit)
}
