//! Tabular Q-learning over abstracted states.
//!
//! A state is the set of active triggers plus whether the agent is alive, so
//! different traces reaching the same configuration share what they learn.
//! The step reward is the change in state value, where the value is
//! `link_weight * session links + open gates`, or `max_reward` when the goal
//! holds. Links count only when observed in the current episode.
//! Entries are added the first time a state is seen and never removed.

use std::collections::{BTreeMap, BTreeSet};

use rand::seq::{IteratorRandom, SliceRandom};
use rand::Rng;
use tracing::{debug, info};

use linkscout_kernel::model::belief::BeliefModelV1;
use linkscout_kernel::model::ids::TriggerId;
use linkscout_kernel::model::trace::TraceV1;

use crate::contract::ActuationLayerV1;
use crate::engine::Engine;
use crate::error::{Interrupted, SearchError};
use crate::policy::QLearningPolicy;
use crate::report::TerminationReasonV1;
use crate::strategy::Strategy;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QState {
    pub active_triggers: BTreeSet<TriggerId>,
    pub alive: bool,
}

impl QState {
    #[must_use]
    pub fn observe(belief: &dyn BeliefModelV1) -> Self {
        Self {
            active_triggers: belief.active_triggers(),
            alive: belief.is_agent_alive(),
        }
    }
}

pub type QTable = BTreeMap<QState, BTreeMap<TriggerId, f32>>;

/// How one episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeEnd {
    /// The goal held after an action.
    Goal,
    /// An action killed the agent or failed.
    Failure,
    /// `max_depth` actions were taken.
    DepthReached,
    /// The current state offers no action.
    NoAction,
    BudgetExhausted,
}

pub struct QLearningStrategy {
    policy: QLearningPolicy,
    table: QTable,
    visits: BTreeMap<QState, u32>,
    winning: Option<TraceV1>,
    goal_seen: bool,
    episodes: u64,
}

impl QLearningStrategy {
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidPolicy`] if the policy fails validation.
    pub fn new(policy: QLearningPolicy) -> Result<Self, SearchError> {
        policy.validate()?;
        Ok(Self {
            policy,
            table: QTable::new(),
            visits: BTreeMap::new(),
            winning: None,
            goal_seen: false,
            episodes: 0,
        })
    }

    #[must_use]
    pub fn q_table(&self) -> &QTable {
        &self.table
    }

    #[must_use]
    pub fn visit_count(&self, state: &QState) -> u32 {
        self.visits.get(state).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn episodes(&self) -> u64 {
        self.episodes
    }

    /// Make sure `state` has a row, one zero entry per reachable trigger.
    fn ensure_row(&mut self, state: &QState, belief: &dyn BeliefModelV1) {
        if !self.table.contains_key(state) {
            let row = belief.reachable_triggers().into_iter().map(|t| (t, 0.0)).collect();
            self.table.insert(state.clone(), row);
        }
    }

    fn max_q(&self, state: &QState) -> f32 {
        self.table
            .get(state)
            .and_then(|row| row.values().copied().reduce(f32::max))
            .unwrap_or(0.0)
    }

    /// Uniform random with probability ε, otherwise uniformly among the
    /// argmax actions.
    fn choose_action<R: Rng + ?Sized>(&self, state: &QState, rng: &mut R) -> Option<TriggerId> {
        let row = self.table.get(state)?;
        if rng.gen::<f32>() < self.policy.explore_probability {
            return row.keys().choose(rng).cloned();
        }
        let best = row.values().copied().reduce(f32::max)?;
        let ties: Vec<&TriggerId> = row.iter().filter(|(_, q)| **q >= best).map(|(t, _)| t).collect();
        ties.choose(rng).map(|t| (*t).clone())
    }

    fn set_q(&mut self, state: &QState, action: &TriggerId, value: f32) {
        if let Some(q) = self.table.get_mut(state).and_then(|row| row.get_mut(action)) {
            *q = value;
        }
    }

    fn q(&self, state: &QState, action: &TriggerId) -> f32 {
        self.table
            .get(state)
            .and_then(|row| row.get(action))
            .copied()
            .unwrap_or(0.0)
    }

    /// Play one episode from the initial state.
    ///
    /// # Errors
    ///
    /// Propagates [`Interrupted`] from the actuation layer.
    pub fn play_episode<E: ActuationLayerV1>(
        &mut self,
        engine: &mut Engine<E>,
    ) -> Result<EpisodeEnd, Interrupted> {
        self.episodes += 1;
        engine.note_evaluation();
        engine.restart_session()?;
        engine.explore()?;

        let weight = self.policy.link_weight;
        let max = self.policy.max_reward;
        let mut trace = TraceV1::new();
        let mut value = engine.state_value(weight, max);
        let mut state = QState::observe(engine.belief());

        for _ in 0..self.policy.max_depth {
            engine.checkpoint();
            if engine.budget().is_exhausted() {
                return Ok(EpisodeEnd::BudgetExhausted);
            }
            self.ensure_row(&state, engine.belief());
            *self.visits.entry(state.clone()).or_insert(0) += 1;

            let Some(action) = self.choose_action(&state, engine.rng()) else {
                return Ok(EpisodeEnd::NoAction);
            };
            let status = engine.interact(&action)?;
            if !engine.belief().is_agent_alive() || !status.is_success() {
                debug!(action = %action, status = ?status, "action failed; penalised");
                self.set_q(&state, &action, self.policy.failure_penalty);
                return Ok(EpisodeEnd::Failure);
            }
            trace.push(action.clone());
            engine.explore()?;

            let next_value = engine.state_value(weight, max);
            let reward = next_value - value;
            let next_state = QState::observe(engine.belief());
            let goal = engine.goal_holds();

            let future = if goal {
                0.0
            } else {
                self.ensure_row(&next_state, engine.belief());
                self.max_q(&next_state)
            };
            let alpha = self.policy.alpha;
            let updated = (1.0 - alpha) * self.q(&state, &action) + alpha * (reward + self.policy.gamma * future);
            self.set_q(&state, &action, updated);

            if goal {
                self.goal_seen = true;
                if self.policy.single_search_mode && self.winning.is_none() {
                    info!(trace = %trace, episode = self.episodes, "winning play found");
                    self.winning = Some(trace);
                }
                return Ok(EpisodeEnd::Goal);
            }
            state = next_state;
            value = next_value;
        }
        Ok(EpisodeEnd::DepthReached)
    }
}

impl<E: ActuationLayerV1> Strategy<E> for QLearningStrategy {
    fn name(&self) -> &'static str {
        "q-learning"
    }

    fn run(&mut self, engine: &mut Engine<E>) -> Result<TerminationReasonV1, Interrupted> {
        loop {
            if self.policy.single_search_mode && self.winning.is_some() {
                return Ok(TerminationReasonV1::WinningTraceFound);
            }
            engine.checkpoint();
            if engine.budget().is_exhausted() {
                info!(episodes = self.episodes, states = self.table.len(), "q-learning out of budget");
                return Ok(TerminationReasonV1::BudgetExhausted);
            }
            let end = self.play_episode(engine)?;
            debug!(episode = self.episodes, end = ?end, states = self.table.len(), "episode finished");
        }
    }

    fn is_goal_solved(&self, engine: &Engine<E>) -> bool {
        self.goal_seen || engine.goal_holds()
    }

    fn winning_trace(&self) -> Option<TraceV1> {
        self.winning.clone()
    }
}
