//! Shared helpers for linkscout benchmark suites.

use std::sync::Arc;

use linkscout_harness::runner::run_world;
use linkscout_harness::worlds::definition::WorldDefinitionV1;
use linkscout_harness::worlds::fixtures;
use linkscout_kernel::model::goal::{GateOpen, GoalPredicate};
use linkscout_kernel::model::ids::GateId;
use linkscout_search::policy::EngineConfig;
use linkscout_search::report::RunReportV1;
use linkscout_search::strategy::StrategyConfig;

/// A world, an optional goal and a simulated budget, run with a fixed seed.
pub struct Regime {
    pub name: &'static str,
    pub world: WorldDefinitionV1,
    pub goal: Option<GateId>,
    pub budget_millis: i64,
}

impl Regime {
    #[must_use]
    pub fn goal_predicate(&self) -> Option<Arc<dyn GoalPredicate>> {
        self.goal
            .clone()
            .map(|g| Arc::new(GateOpen(g)) as Arc<dyn GoalPredicate>)
    }
}

/// Goal one step away; single-search strategies stop almost immediately.
#[must_use]
pub fn regime_shallow_goal() -> Regime {
    Regime {
        name: "shallow_goal",
        world: fixtures::scenario(),
        goal: Some(GateId::from("d2")),
        budget_millis: 60_000,
    }
}

/// A long corridor whose last gate is the goal; rewards depth.
#[must_use]
pub fn regime_corridor() -> Regime {
    Regime {
        name: "corridor",
        world: fixtures::chain(5),
        goal: Some(GateId::from("d5")),
        budget_millis: 120_000,
    }
}

/// No goal: every strategy runs until its own stop condition or the budget.
#[must_use]
pub fn regime_open_ended() -> Regime {
    Regime {
        name: "open_ended",
        world: fixtures::star(8),
        goal: None,
        budget_millis: 60_000,
    }
}

/// Pressing the wrong trigger shuts the agent in.
#[must_use]
pub fn regime_trapped() -> Regime {
    Regime {
        name: "trapped",
        world: fixtures::trapped(),
        goal: Some(GateId::from("d2")),
        budget_millis: 60_000,
    }
}

#[must_use]
pub fn all_regimes() -> Vec<Regime> {
    vec![
        regime_shallow_goal(),
        regime_corridor(),
        regime_open_ended(),
        regime_trapped(),
    ]
}

/// Run one named strategy on a regime with its default policy.
///
/// # Panics
///
/// Panics if the strategy name is unknown or the run fails pre-flight.
/// Benchmark setup failures are fatal.
#[must_use]
pub fn run_regime(regime: &Regime, strategy: &str, seed: u64) -> RunReportV1 {
    let strategy = StrategyConfig::from_name(strategy).expect("known strategy name");
    let config = EngineConfig {
        total_budget_millis: regime.budget_millis,
        random_seed: seed,
        ..EngineConfig::default()
    };
    run_world(&regime.world, &strategy, config, regime.goal_predicate()).expect("regime runs")
}
