//! Link monotonicity lock tests.
//!
//! - Once a pair is confirmed, no later non-link observation removes it.
//! - The links a run reports only ever grow across sessions.
//! - Every inferred link comes from a gate change observed right after its
//!   trigger toggled.

use std::collections::BTreeSet;

use linkscout_harness::worlds::fixtures;
use linkscout_kernel::model::belief::BeliefModelV1;
use linkscout_kernel::model::ids::{GateId, TriggerId};
use linkscout_kernel::model::link::{Link, LinkMapV1, LinkRecordOutcome, LinkStatus};
use linkscout_search::contract::ActuationLayerV1;
use linkscout_search::evolutionary::EvolutionaryStrategy;
use linkscout_search::policy::EvolutionaryPolicy;
use linkscout_search::search::run_strategy;
use lock_tests::engine;

fn t(s: &str) -> TriggerId {
    TriggerId::from(s)
}

fn g(s: &str) -> GateId {
    GateId::from(s)
}

#[test]
fn non_link_after_link_is_ignored_in_map() {
    let mut map = LinkMapV1::new();
    map.register_pairs(&[t("b1")], &[g("d1")]);
    assert_eq!(map.record_link(&t("b1"), &g("d1")), LinkRecordOutcome::Recorded);
    for _ in 0..3 {
        assert_eq!(
            map.record_non_link(&t("b1"), &g("d1")),
            LinkRecordOutcome::NonLinkIgnored
        );
    }
    assert_eq!(map.status(&t("b1"), &g("d1")), LinkStatus::Linked);
    assert_eq!(map.confirmed(), BTreeSet::from([Link::from(("b1", "d1"))]));
}

#[test]
fn failed_pair_check_keeps_confirmed_link() {
    // b3 is a dud; a link recorded for it by hand must survive a pair check
    // that sees the gate stay closed.
    let mut engine = engine(&fixtures::scenario(), 60_000, 0);
    engine.begin_run().unwrap();
    engine.explore().unwrap();
    engine.env_mut().belief_mut().record_link(&t("b3"), &g("d1"));

    engine.check_pair(&t("b3"), &g("d1")).unwrap();

    assert!(!engine.belief().is_open(&g("d1")));
    assert_eq!(engine.belief().link_status(&t("b3"), &g("d1")), LinkStatus::Linked);
    assert!(engine.discovered_links().contains(&Link::from(("b3", "d1"))));
}

#[test]
fn links_survive_session_restarts() {
    let mut engine = engine(&fixtures::scenario(), 60_000, 0);
    engine.begin_run().unwrap();
    engine.explore().unwrap();
    engine.interact(&t("b1")).unwrap();
    let after_first = engine.discovered_links();
    assert!(after_first.contains(&Link::from(("b1", "d1"))));

    for _ in 0..3 {
        engine.restart_session().unwrap();
        assert!(after_first.is_subset(&engine.discovered_links()));
        assert!(after_first.is_subset(&engine.belief().confirmed_links()));
    }
}

#[test]
fn evolutionary_links_are_a_superset_of_every_evaluation() {
    let mut engine = engine(&fixtures::star(3), 30_000, 4);
    let mut strategy = EvolutionaryStrategy::new(EvolutionaryPolicy::default()).unwrap();
    let report = run_strategy(&mut engine, &mut strategy);

    for chromosome in strategy.population().iter() {
        assert!(
            chromosome.snapshot.links.is_subset(&report.links),
            "chromosome {} saw links missing from the report",
            chromosome.trace
        );
    }
}

#[test]
fn inferred_links_match_the_wiring_in_a_fully_visible_world() {
    // Every gate of the star world is visible from the hub, where every
    // trigger sits, so each observed change is attributed correctly.
    let def = fixtures::star(4);
    let mut engine = engine(&def, 20_000, 9);
    engine.begin_run().unwrap();
    engine.explore().unwrap();
    for trigger in def.trigger_ids() {
        engine.interact(&trigger).unwrap();
    }
    assert_eq!(engine.discovered_links(), def.wiring());
}
