//! Interruption lock tests: a cancelled actuation layer ends the run with a
//! complete report that keeps everything learned before the cut.

use linkscout_harness::worlds::fixtures;
use linkscout_harness::worlds::simulator::SimulatedWorld;
use linkscout_kernel::model::link::Link;
use linkscout_search::report::TerminationReasonV1;
use linkscout_search::search::run_strategy;
use linkscout_search::strategy::StrategyConfig;
use lock_tests::engine_on;

fn cut_after(ticks: u64) -> SimulatedWorld {
    SimulatedWorld::new(&fixtures::scenario())
        .unwrap()
        .with_tick_limit(ticks)
}

#[test]
fn worklist_keeps_links_found_before_the_cut() {
    // explore, toggle b1, observe d1, then cut.
    let mut engine = engine_on(cut_after(3), 60_000, 0);
    let mut strategy = StrategyConfig::from_name("worklist")
        .unwrap()
        .build::<SimulatedWorld>()
        .unwrap();
    let report = run_strategy(&mut engine, strategy.as_mut());

    assert!(
        matches!(report.termination, TerminationReasonV1::Interrupted { ref detail } if detail.contains("tick limit")),
        "{:?}",
        report.termination
    );
    assert!(report.links.contains(&Link::from(("b1", "d1"))));
    assert_eq!(report.counters.turns, 3);
}

#[test]
fn open_ended_strategies_report_on_interruption() {
    for name in ["evolutionary", "mcts", "q-learning", "random-pairs"] {
        let mut engine = engine_on(cut_after(25), 600_000, 4);
        let mut strategy = StrategyConfig::from_name(name)
            .unwrap()
            .build::<SimulatedWorld>()
            .unwrap();
        let report = run_strategy(&mut engine, strategy.as_mut());
        assert_eq!(report.strategy, name);
        assert_eq!(report.termination.as_str(), "interrupted", "{name}");
        assert!(report.to_canonical_json_bytes().is_ok());
        assert!(report.budget_remaining_millis > 0, "{name} ran out of budget instead");
    }
}

#[test]
fn interruption_before_the_first_session_still_reports() {
    let mut engine = engine_on(cut_after(0), 60_000, 0);
    let mut strategy = StrategyConfig::from_name("mcts")
        .unwrap()
        .build::<SimulatedWorld>()
        .unwrap();
    let report = run_strategy(&mut engine, strategy.as_mut());

    assert_eq!(report.termination.as_str(), "interrupted");
    assert!(report.links.is_empty());
    assert_eq!(report.counters.turns, 0);
    assert_eq!(report.counters.sessions, 0);
}
