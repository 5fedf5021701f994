//! Engine configuration and per-strategy policies.
//!
//! Every tunable is an explicit value handed to a constructor. Each policy
//! has a `validate()` pre-flight check; constructors refuse invalid policies
//! with [`SearchError`] before any session is opened.

use crate::error::SearchError;

/// Default total budget: three minutes.
pub const DEFAULT_TOTAL_BUDGET_MILLIS: i64 = 180_000;

/// Default turn cap for a single sub-goal.
pub const DEFAULT_TURNS_PER_GOAL: u32 = 150;

/// Default turn cap for one exploration sweep.
pub const DEFAULT_EXPLORATION_TURNS: u32 = 150;

/// Configuration shared by every strategy through the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Total wall-clock allowance in milliseconds.
    pub total_budget_millis: i64,
    /// Turn cap per dispatched sub-goal. `0` disables the cap.
    pub turns_per_goal: u32,
    /// Turn cap per exploration sweep. `0` disables the cap.
    pub exploration_turns: u32,
    /// Seed for the engine's random number generator.
    pub random_seed: u64,
    pub stuck: StuckPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            total_budget_millis: DEFAULT_TOTAL_BUDGET_MILLIS,
            turns_per_goal: DEFAULT_TURNS_PER_GOAL,
            exploration_turns: DEFAULT_EXPLORATION_TURNS,
            random_seed: 0,
            stuck: StuckPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidConfig`] if the stuck detector is
    /// enabled with a zero sampling period, a window shorter than two, or a
    /// radius that is negative or NaN.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.stuck.enabled {
            if self.stuck.sample_every == 0 {
                return Err(SearchError::InvalidConfig {
                    detail: "stuck.sample_every must be positive".into(),
                });
            }
            if self.stuck.window < 2 {
                return Err(SearchError::InvalidConfig {
                    detail: "stuck.window must be at least 2".into(),
                });
            }
            if self.stuck.radius.is_nan() || self.stuck.radius < 0.0 {
                return Err(SearchError::InvalidConfig {
                    detail: "stuck.radius must be a non-negative number".into(),
                });
            }
        }
        Ok(())
    }
}

/// Stuck detection: the agent position is sampled every `sample_every`
/// ticks; when the last `window` samples all lie within `radius` of the
/// oldest one, the current sub-goal is abandoned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StuckPolicy {
    pub enabled: bool,
    pub sample_every: u32,
    pub window: usize,
    pub radius: f32,
}

impl Default for StuckPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            sample_every: 10,
            window: 10,
            radius: 1.0,
        }
    }
}

fn check_probability(strategy: &'static str, name: &str, p: f32) -> Result<(), SearchError> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(SearchError::InvalidPolicy {
            strategy,
            detail: format!("{name} must be within [0, 1], got {p}"),
        })
    }
}

/// Fallback presses worklist exploration may make around each candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorklistPolicy {
    /// Before each candidate, escape a room whose gates are all closed by
    /// pressing a trigger already linked to one of them.
    pub unlock_when_trapped: bool,
    /// Before each candidate, open the gates that cut it off from the agent
    /// using triggers already linked to them.
    pub repair_reachability: bool,
}

impl WorklistPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only the worklist itself, without fallback presses.
    #[must_use]
    pub fn without_fallbacks() -> Self {
        Self {
            unlock_when_trapped: false,
            repair_reachability: false,
        }
    }
}

impl Default for WorklistPolicy {
    fn default() -> Self {
        Self {
            unlock_when_trapped: true,
            repair_reachability: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvolutionaryPolicy {
    /// Upper bound on the population. Must exceed 4.
    pub max_population_size: usize,
    /// Chromosomes that selection never drops. At most half the population.
    pub elites_to_keep: usize,
    pub max_chromosome_length: usize,
    pub mutation_probability: f32,
    pub insertion_probability: f32,
    pub crossover_probability: f32,
    /// Fitness awarded when the goal predicate holds.
    pub max_fitness: f32,
    /// Extension only inserts triggers not already in the chromosome.
    pub only_extend_with_new_gene: bool,
    /// Stop after this many consecutive generations that produce no
    /// chromosome worth evaluating.
    pub max_stale_generations: u32,
}

impl Default for EvolutionaryPolicy {
    fn default() -> Self {
        Self {
            max_population_size: 20,
            elites_to_keep: 10,
            max_chromosome_length: 8,
            mutation_probability: 0.2,
            insertion_probability: 0.3,
            crossover_probability: 0.2,
            max_fitness: 10_000.0,
            only_extend_with_new_gene: true,
            max_stale_generations: 50,
        }
    }
}

impl EvolutionaryPolicy {
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidPolicy`] for a population of 4 or fewer,
    /// more elites than half the population, a zero chromosome length,
    /// a non-positive maximum fitness, or a probability outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), SearchError> {
        const NAME: &str = "evolutionary";
        if self.max_population_size <= 4 {
            return Err(SearchError::InvalidPolicy {
                strategy: NAME,
                detail: "max_population_size must be at least 5".into(),
            });
        }
        if self.elites_to_keep > self.max_population_size / 2 {
            return Err(SearchError::InvalidPolicy {
                strategy: NAME,
                detail: format!(
                    "elites_to_keep ({}) exceeds half of max_population_size ({})",
                    self.elites_to_keep, self.max_population_size
                ),
            });
        }
        if self.max_chromosome_length == 0 {
            return Err(SearchError::InvalidPolicy {
                strategy: NAME,
                detail: "max_chromosome_length must be positive".into(),
            });
        }
        if !(self.max_fitness > 0.0) {
            return Err(SearchError::InvalidPolicy {
                strategy: NAME,
                detail: "max_fitness must be positive".into(),
            });
        }
        if self.max_stale_generations == 0 {
            return Err(SearchError::InvalidPolicy {
                strategy: NAME,
                detail: "max_stale_generations must be positive".into(),
            });
        }
        check_probability(NAME, "mutation_probability", self.mutation_probability)?;
        check_probability(NAME, "insertion_probability", self.insertion_probability)?;
        check_probability(NAME, "crossover_probability", self.crossover_probability)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MctsPolicy {
    pub max_depth: usize,
    /// Reward of a state satisfying the goal predicate.
    pub max_reward: f32,
    /// Weight of the UCB1 exploration term.
    pub exploration_constant: f32,
    /// Stop as soon as any play reaches `max_reward`.
    pub single_search_mode: bool,
}

impl Default for MctsPolicy {
    fn default() -> Self {
        Self {
            max_depth: 8,
            max_reward: 10_000.0,
            exploration_constant: 2.0,
            single_search_mode: true,
        }
    }
}

impl MctsPolicy {
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidPolicy`] for a zero depth, a
    /// non-positive reward ceiling or a negative exploration constant.
    pub fn validate(&self) -> Result<(), SearchError> {
        const NAME: &str = "mcts";
        if self.max_depth == 0 {
            return Err(SearchError::InvalidPolicy {
                strategy: NAME,
                detail: "max_depth must be at least 1".into(),
            });
        }
        if !(self.max_reward > 0.0) {
            return Err(SearchError::InvalidPolicy {
                strategy: NAME,
                detail: "max_reward must be positive".into(),
            });
        }
        if !(self.exploration_constant >= 0.0) {
            return Err(SearchError::InvalidPolicy {
                strategy: NAME,
                detail: "exploration_constant must be non-negative".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QLearningPolicy {
    /// Maximum number of actions per episode.
    pub max_depth: usize,
    /// Probability of a uniformly random action (ε).
    pub explore_probability: f32,
    /// Learning rate (α).
    pub alpha: f32,
    /// Discount factor (γ).
    pub gamma: f32,
    /// Value of a state satisfying the goal predicate.
    pub max_reward: f32,
    /// Weight of links observed in the current session in the state value.
    pub link_weight: f32,
    /// Q-value assigned to an action that kills the agent or fails.
    pub failure_penalty: f32,
    pub single_search_mode: bool,
}

impl Default for QLearningPolicy {
    fn default() -> Self {
        Self {
            max_depth: 8,
            explore_probability: 0.1,
            alpha: 0.8,
            gamma: 0.99,
            max_reward: 10_000.0,
            link_weight: 1.0,
            failure_penalty: -100.0,
            single_search_mode: true,
        }
    }
}

impl QLearningPolicy {
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidPolicy`] for a zero depth, a
    /// non-positive reward ceiling, or ε, α, γ outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), SearchError> {
        const NAME: &str = "q-learning";
        if self.max_depth == 0 {
            return Err(SearchError::InvalidPolicy {
                strategy: NAME,
                detail: "max_depth must be at least 1".into(),
            });
        }
        if !(self.max_reward > 0.0) {
            return Err(SearchError::InvalidPolicy {
                strategy: NAME,
                detail: "max_reward must be positive".into(),
            });
        }
        check_probability(NAME, "explore_probability", self.explore_probability)?;
        check_probability(NAME, "alpha", self.alpha)?;
        check_probability(NAME, "gamma", self.gamma)
    }
}

/// Random trigger/gate pairing baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomPairsPolicy {
    /// Stop after this many pairs. `None` runs until the budget is spent.
    pub max_pairs: Option<u64>,
}

impl Default for RandomPairsPolicy {
    fn default() -> Self {
        Self { max_pairs: None }
    }
}
