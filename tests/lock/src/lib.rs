//! Shared helpers for the lock tests.
//!
//! Every helper builds on the simulated world so the acceptance tests
//! exercise the same path a configured run takes.

use std::sync::Arc;

use linkscout_harness::worlds::definition::WorldDefinitionV1;
use linkscout_harness::worlds::simulator::SimulatedWorld;
use linkscout_kernel::model::goal::{GateOpen, GoalPredicate};
use linkscout_kernel::model::ids::GateId;
use linkscout_search::engine::Engine;
use linkscout_search::policy::EngineConfig;

/// Engine over a fresh simulation of `def`, with the given budget and seed.
///
/// # Panics
///
/// Panics if `def` is invalid or `budget_millis` is not positive.
#[must_use]
pub fn engine(def: &WorldDefinitionV1, budget_millis: i64, seed: u64) -> Engine<SimulatedWorld> {
    let world = SimulatedWorld::new(def).expect("fixture world is valid");
    engine_on(world, budget_millis, seed)
}

/// Engine over an already configured world.
///
/// # Panics
///
/// Panics if `budget_millis` is not positive.
#[must_use]
pub fn engine_on(world: SimulatedWorld, budget_millis: i64, seed: u64) -> Engine<SimulatedWorld> {
    let clock = world.clock();
    let config = EngineConfig {
        total_budget_millis: budget_millis,
        random_seed: seed,
        ..EngineConfig::default()
    };
    Engine::new(world, config, Box::new(clock)).expect("engine config is valid")
}

#[must_use]
pub fn gate_open(gate: &str) -> Arc<dyn GoalPredicate> {
    Arc::new(GateOpen(GateId::from(gate)))
}

/// One trigger `b2` wired to the only gate `d2`.
///
/// # Panics
///
/// Never; the literal is a valid world.
#[must_use]
pub fn single_trigger_world() -> WorldDefinitionV1 {
    let text = r#"{
        "start_room": "R0",
        "rooms": [{"id": "R0", "x": 0, "y": 0}, {"id": "R1", "x": 4, "y": 0}],
        "gates": [{"id": "d2", "between": ["R0", "R1"]}],
        "triggers": [{"id": "b2", "room": "R0", "gates": ["d2"]}]
    }"#;
    WorldDefinitionV1::from_json_bytes(text.as_bytes()).expect("literal world is valid")
}

/// Route `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing_subscriber::filter::LevelFilter::INFO)
        .try_init();
}
