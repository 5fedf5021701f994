//! Run orchestration: configuration in, report out.
//!
//! A [`RunConfigV1`] names a strategy, a world (built-in fixture or JSON
//! file), an optional goal, and policy overrides. [`run_config`] loads the
//! world, builds the engine on the simulator's clock, runs the strategy and
//! optionally compares the discovered links with a ground-truth file.
//!
//! Overrides that do not apply to the chosen strategy are rejected rather
//! than ignored.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use linkscout_kernel::model::goal::{AllGatesOpen, GateOpen, GoalPredicate};
use linkscout_kernel::model::ids::GateId;
use linkscout_kernel::proof::hash::ContentHash;
use linkscout_search::engine::Engine;
use linkscout_search::policy::EngineConfig;
use linkscout_search::report::RunReportV1;
use linkscout_search::search::run_strategy;
use linkscout_search::strategy::StrategyConfig;

use crate::error::HarnessError;
use crate::ground_truth::{GroundTruthComparisonV1, GroundTruthV1};
use crate::worlds::definition::WorldDefinitionV1;
use crate::worlds::fixtures;
use crate::worlds::simulator::SimulatedWorld;

/// Where the world comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum WorldSourceV1 {
    /// A built-in world from [`fixtures::by_name`].
    Fixture(String),
    /// A JSON world description, relative to the configuration file.
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum GoalSpecV1 {
    GateOpen(String),
    AllGatesOpen(Vec<String>),
}

impl GoalSpecV1 {
    #[must_use]
    pub fn to_predicate(&self) -> Arc<dyn GoalPredicate> {
        match self {
            Self::GateOpen(g) => Arc::new(GateOpen(GateId::new(g.as_str()))),
            Self::AllGatesOpen(gs) => Arc::new(AllGatesOpen(
                gs.iter().map(|g| GateId::new(g.as_str())).collect::<BTreeSet<_>>(),
            )),
        }
    }
}

/// Optional per-strategy policy overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyOverridesV1 {
    pub unlock_when_trapped: Option<bool>,
    pub repair_reachability: Option<bool>,
    pub max_population_size: Option<usize>,
    pub elites_to_keep: Option<usize>,
    pub max_chromosome_length: Option<usize>,
    pub mutation_probability: Option<f32>,
    pub insertion_probability: Option<f32>,
    pub crossover_probability: Option<f32>,
    pub max_stale_generations: Option<u32>,
    pub max_depth: Option<usize>,
    pub exploration_constant: Option<f32>,
    pub explore_probability: Option<f32>,
    pub alpha: Option<f32>,
    pub gamma: Option<f32>,
    pub single_search_mode: Option<bool>,
    pub max_pairs: Option<u64>,
}

impl PolicyOverridesV1 {
    fn set_fields(&self) -> Vec<&'static str> {
        let flags = [
            ("unlock_when_trapped", self.unlock_when_trapped.is_some()),
            ("repair_reachability", self.repair_reachability.is_some()),
            ("max_population_size", self.max_population_size.is_some()),
            ("elites_to_keep", self.elites_to_keep.is_some()),
            ("max_chromosome_length", self.max_chromosome_length.is_some()),
            ("mutation_probability", self.mutation_probability.is_some()),
            ("insertion_probability", self.insertion_probability.is_some()),
            ("crossover_probability", self.crossover_probability.is_some()),
            ("max_stale_generations", self.max_stale_generations.is_some()),
            ("max_depth", self.max_depth.is_some()),
            ("exploration_constant", self.exploration_constant.is_some()),
            ("explore_probability", self.explore_probability.is_some()),
            ("alpha", self.alpha.is_some()),
            ("gamma", self.gamma.is_some()),
            ("single_search_mode", self.single_search_mode.is_some()),
            ("max_pairs", self.max_pairs.is_some()),
        ];
        flags.iter().filter(|(_, set)| *set).map(|(name, _)| *name).collect()
    }

    /// Apply to `config`, refusing fields the strategy has no use for.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] naming the first foreign field.
    pub fn apply(&self, config: &mut StrategyConfig) -> Result<(), HarnessError> {
        let (strategy, allowed) = match config {
            StrategyConfig::Worklist(p) => {
                set(&mut p.unlock_when_trapped, self.unlock_when_trapped);
                set(&mut p.repair_reachability, self.repair_reachability);
                ("worklist", WORKLIST_FIELDS)
            }
            StrategyConfig::Evolutionary(p) => {
                set(&mut p.max_population_size, self.max_population_size);
                set(&mut p.elites_to_keep, self.elites_to_keep);
                set(&mut p.max_chromosome_length, self.max_chromosome_length);
                set(&mut p.mutation_probability, self.mutation_probability);
                set(&mut p.insertion_probability, self.insertion_probability);
                set(&mut p.crossover_probability, self.crossover_probability);
                set(&mut p.max_stale_generations, self.max_stale_generations);
                ("evolutionary", EVOLUTIONARY_FIELDS)
            }
            StrategyConfig::Mcts(p) => {
                set(&mut p.max_depth, self.max_depth);
                set(&mut p.exploration_constant, self.exploration_constant);
                set(&mut p.single_search_mode, self.single_search_mode);
                ("mcts", MCTS_FIELDS)
            }
            StrategyConfig::QLearning(p) => {
                set(&mut p.max_depth, self.max_depth);
                set(&mut p.explore_probability, self.explore_probability);
                set(&mut p.alpha, self.alpha);
                set(&mut p.gamma, self.gamma);
                set(&mut p.single_search_mode, self.single_search_mode);
                ("q-learning", QLEARNING_FIELDS)
            }
            StrategyConfig::RandomPairs(p) => {
                if self.max_pairs.is_some() {
                    p.max_pairs = self.max_pairs;
                }
                ("random-pairs", RANDOM_PAIRS_FIELDS)
            }
        };
        if let Some(field) = self.set_fields().into_iter().find(|f| !allowed.contains(f)) {
            return Err(HarnessError::Config {
                detail: format!("policy field {field} does not apply to strategy {strategy}"),
            });
        }
        Ok(())
    }
}

const WORKLIST_FIELDS: &[&str] = &["unlock_when_trapped", "repair_reachability"];
const EVOLUTIONARY_FIELDS: &[&str] = &[
    "max_population_size",
    "elites_to_keep",
    "max_chromosome_length",
    "mutation_probability",
    "insertion_probability",
    "crossover_probability",
    "max_stale_generations",
];
const MCTS_FIELDS: &[&str] = &["max_depth", "exploration_constant", "single_search_mode"];
const QLEARNING_FIELDS: &[&str] = &["max_depth", "explore_probability", "alpha", "gamma", "single_search_mode"];
const RANDOM_PAIRS_FIELDS: &[&str] = &["max_pairs"];

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfigV1 {
    pub strategy: String,
    pub world: WorldSourceV1,
    #[serde(default)]
    pub goal: Option<GoalSpecV1>,
    #[serde(default)]
    pub budget_millis: Option<i64>,
    #[serde(default)]
    pub turns_per_goal: Option<u32>,
    #[serde(default)]
    pub seed: u64,
    /// Wiring file to compare against, relative to the configuration file.
    #[serde(default)]
    pub ground_truth: Option<PathBuf>,
    #[serde(default)]
    pub policy: PolicyOverridesV1,
}

impl RunConfigV1 {
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] for malformed JSON or unknown fields.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, HarnessError> {
        serde_json::from_slice(bytes).map_err(|e| HarnessError::Config {
            detail: e.to_string(),
        })
    }

    /// # Errors
    ///
    /// [`HarnessError::Io`] if the file cannot be read, otherwise as
    /// [`from_json_bytes`](Self::from_json_bytes).
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let bytes = std::fs::read(path)
            .map_err(|e| HarnessError::io(&format!("reading run config {}", path.display()), &e))?;
        Self::from_json_bytes(&bytes)
    }

    /// The named strategy with overrides applied.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] for an unknown strategy name or an
    /// override the strategy does not take.
    pub fn strategy_config(&self) -> Result<StrategyConfig, HarnessError> {
        let mut config =
            StrategyConfig::from_name(&self.strategy).ok_or_else(|| HarnessError::Config {
                detail: format!(
                    "unknown strategy {:?}; expected one of {}",
                    self.strategy,
                    StrategyConfig::NAMES.join(", ")
                ),
            })?;
        self.policy.apply(&mut config)?;
        Ok(config)
    }

    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig {
            random_seed: self.seed,
            ..EngineConfig::default()
        };
        set(&mut config.total_budget_millis, self.budget_millis);
        set(&mut config.turns_per_goal, self.turns_per_goal);
        config
    }

    /// # Errors
    ///
    /// [`HarnessError::Config`] for an unknown fixture, otherwise whatever
    /// loading the world file returns.
    pub fn load_world(&self, base_dir: &Path) -> Result<WorldDefinitionV1, HarnessError> {
        match &self.world {
            WorldSourceV1::Fixture(name) => {
                fixtures::by_name(name).ok_or_else(|| HarnessError::Config {
                    detail: format!(
                        "unknown fixture {name:?}; expected one of {}",
                        fixtures::FIXTURE_NAMES.join(", ")
                    ),
                })
            }
            WorldSourceV1::File(path) => WorldDefinitionV1::load(&base_dir.join(path)),
        }
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcomeV1 {
    pub report: RunReportV1,
    pub world_digest: ContentHash,
    pub comparison: Option<GroundTruthComparisonV1>,
}

/// Run `strategy` on a fresh simulation of `def`.
///
/// # Errors
///
/// Pre-flight failures only: an invalid world, engine configuration or
/// policy. Everything that happens during the run is in the report.
pub fn run_world(
    def: &WorldDefinitionV1,
    strategy: &StrategyConfig,
    engine_config: EngineConfig,
    goal: Option<Arc<dyn GoalPredicate>>,
) -> Result<RunReportV1, HarnessError> {
    let world = SimulatedWorld::new(def)?;
    let clock = world.clock();
    let mut engine = Engine::new(world, engine_config, Box::new(clock))?;
    if let Some(goal) = goal {
        engine.set_goal(goal);
    }
    let mut strategy = strategy.build::<SimulatedWorld>()?;
    Ok(run_strategy(&mut engine, strategy.as_mut()))
}

/// Run a configuration. Relative paths resolve against `base_dir`.
///
/// # Errors
///
/// Any pre-flight failure: configuration, world, ground-truth file.
pub fn run_config(config: &RunConfigV1, base_dir: &Path) -> Result<RunOutcomeV1, HarnessError> {
    let def = config.load_world(base_dir)?;
    let world_digest = def.digest()?;
    let strategy = config.strategy_config()?;
    let truth = config
        .ground_truth
        .as_ref()
        .map(|p| GroundTruthV1::load(&base_dir.join(p)))
        .transpose()?;
    info!(
        strategy = %config.strategy,
        world = %world_digest.as_str(),
        seed = config.seed,
        "starting configured run"
    );

    let goal = config.goal.as_ref().map(GoalSpecV1::to_predicate);
    let report = run_world(&def, &strategy, config.engine_config(), goal)?;
    let comparison = truth.map(|t| t.compare(&report.links));
    if let Some(cmp) = &comparison {
        info!(
            true_links = cmp.true_links,
            inferred_correctly = cmp.inferred_correctly,
            false_positives = cmp.false_positives.len(),
            "compared with ground truth"
        );
    }
    Ok(RunOutcomeV1 {
        report,
        world_digest,
        comparison,
    })
}
