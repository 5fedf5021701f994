//! Ground-truth lock tests: inferred links are compared with the real
//! wiring, and worlds where every toggle is observed in place produce no
//! false positives under any strategy.

use linkscout_harness::ground_truth::GroundTruthV1;
use linkscout_harness::runner::{run_config, run_world, RunConfigV1};
use linkscout_harness::worlds::fixtures;
use linkscout_kernel::model::link::Link;
use linkscout_search::policy::EngineConfig;
use linkscout_search::strategy::StrategyConfig;
use lock_tests::init_tracing;

#[test]
fn star_world_has_no_false_positives() {
    init_tracing();
    let def = fixtures::star(3);
    let truth = GroundTruthV1::from_world(&def);
    for name in StrategyConfig::NAMES {
        let strategy = StrategyConfig::from_name(name).unwrap();
        let config = EngineConfig {
            total_budget_millis: 30_000,
            random_seed: 21,
            ..EngineConfig::default()
        };
        let report = run_world(&def, &strategy, config, None).unwrap();
        let cmp = truth.compare(&report.links);
        assert!(
            cmp.false_positives.is_empty(),
            "{name} inferred {:?}",
            cmp.false_positives
        );
        assert_eq!(cmp.true_links, 3);
        assert_eq!(cmp.inferred_correctly + cmp.missing.len(), 3);
    }
}

#[test]
fn configured_run_matches_wiring_file() {
    let dir = tempfile::tempdir().unwrap();
    let def = fixtures::trapped();
    std::fs::write(dir.path().join("world.json"), serde_json::to_vec(&def).unwrap()).unwrap();
    std::fs::write(
        dir.path().join("wiring.txt"),
        GroundTruthV1::from_world(&def).to_wiring_text(),
    )
    .unwrap();
    let config = RunConfigV1::from_json_bytes(
        br#"{
            "strategy": "worklist",
            "world": {"file": "world.json"},
            "ground_truth": "wiring.txt"
        }"#,
    )
    .unwrap();

    let outcome = run_config(&config, dir.path()).unwrap();
    let cmp = outcome.comparison.unwrap();
    assert!(cmp.is_exact(), "{cmp:?}");
    assert_eq!(cmp.inferred_correctly, 2);
    assert_eq!(outcome.world_digest, def.digest().unwrap());
}

#[test]
fn unreachable_wiring_shows_up_as_missing() {
    let dir = tempfile::tempdir().unwrap();
    // d3 does not exist in the scenario, so b3 -> d3 can never be inferred.
    std::fs::write(dir.path().join("wiring.txt"), "b1,d1\nb2,d2\nb3,d3\n").unwrap();
    let config = RunConfigV1::from_json_bytes(
        br#"{
            "strategy": "worklist",
            "world": {"fixture": "scenario"},
            "ground_truth": "wiring.txt"
        }"#,
    )
    .unwrap();

    let cmp = run_config(&config, dir.path()).unwrap().comparison.unwrap();
    assert_eq!(cmp.true_links, 3);
    assert_eq!(cmp.inferred_correctly, 2);
    assert_eq!(cmp.missing, vec![Link::from(("b3", "d3"))]);
    assert!(cmp.false_positives.is_empty());
}

#[test]
fn malformed_wiring_file_fails_before_the_run() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("wiring.txt"), "b1,d1\n,d2\n").unwrap();
    let config = RunConfigV1::from_json_bytes(
        br#"{"strategy": "worklist", "world": {"fixture": "scenario"}, "ground_truth": "wiring.txt"}"#,
    )
    .unwrap();
    let err = run_config(&config, dir.path()).unwrap_err();
    assert!(err.to_string().contains("line 2"), "{err}");
}
