//! The strategy seam and the strategy catalogue.
//!
//! A strategy composes with [`Engine`]: it holds no reference to the
//! environment and keeps only its own carry-over state (worklist,
//! population, tree, Q-table) between evaluations.

use std::collections::BTreeSet;

use linkscout_kernel::model::link::Link;
use linkscout_kernel::model::trace::TraceV1;

use crate::contract::ActuationLayerV1;
use crate::engine::{DeathPolicy, Engine};
use crate::error::{Interrupted, SearchError};
use crate::evolutionary::EvolutionaryStrategy;
use crate::mcts::MctsStrategy;
use crate::policy::{EvolutionaryPolicy, MctsPolicy, QLearningPolicy, RandomPairsPolicy, WorklistPolicy};
use crate::qlearning::QLearningStrategy;
use crate::random_pairs::RandomPairsStrategy;
use crate::report::{TerminationReasonV1, UnresolvedGateV1};
use crate::worklist::WorklistStrategy;

pub trait Strategy<E: ActuationLayerV1> {
    /// Stable name used in reports and configuration files.
    fn name(&self) -> &'static str;

    fn death_policy(&self) -> DeathPolicy {
        DeathPolicy::EndsEvaluation
    }

    /// Drive the search until a termination condition holds.
    ///
    /// # Errors
    ///
    /// Only [`Interrupted`], propagated from the actuation layer. Every
    /// other failure is absorbed.
    fn run(&mut self, engine: &mut Engine<E>) -> Result<TerminationReasonV1, Interrupted>;

    fn discovered_links(&self, engine: &Engine<E>) -> BTreeSet<Link> {
        engine.discovered_links()
    }

    fn is_goal_solved(&self, engine: &Engine<E>) -> bool {
        engine.goal_holds()
    }

    /// The trace that reached the goal, in single-search mode.
    fn winning_trace(&self) -> Option<TraceV1> {
        None
    }

    fn unresolved_gates(&self) -> Vec<UnresolvedGateV1> {
        Vec::new()
    }
}

/// Which strategy to run, with its policy.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyConfig {
    Worklist(WorklistPolicy),
    Evolutionary(EvolutionaryPolicy),
    Mcts(MctsPolicy),
    QLearning(QLearningPolicy),
    RandomPairs(RandomPairsPolicy),
}

impl StrategyConfig {
    /// Names accepted by [`from_name`](Self::from_name).
    pub const NAMES: [&'static str; 5] = ["worklist", "evolutionary", "mcts", "q-learning", "random-pairs"];

    /// The strategy with default policy, by name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "worklist" => Some(Self::Worklist(WorklistPolicy::new())),
            "evolutionary" => Some(Self::Evolutionary(EvolutionaryPolicy::default())),
            "mcts" => Some(Self::Mcts(MctsPolicy::default())),
            "q-learning" | "qlearning" => Some(Self::QLearning(QLearningPolicy::default())),
            "random-pairs" => Some(Self::RandomPairs(RandomPairsPolicy::default())),
            _ => None,
        }
    }

    /// # Errors
    ///
    /// Returns [`SearchError::InvalidPolicy`] if the policy fails validation.
    pub fn build<E: ActuationLayerV1>(&self) -> Result<Box<dyn Strategy<E>>, SearchError> {
        Ok(match self {
            Self::Worklist(p) => Box::new(WorklistStrategy::new(*p)),
            Self::Evolutionary(p) => Box::new(EvolutionaryStrategy::new(p.clone())?),
            Self::Mcts(p) => Box::new(MctsStrategy::new(p.clone())?),
            Self::QLearning(p) => Box::new(QLearningStrategy::new(p.clone())?),
            Self::RandomPairs(p) => Box::new(RandomPairsStrategy::new(*p)),
        })
    }
}
