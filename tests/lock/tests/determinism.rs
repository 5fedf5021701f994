//! Determinism lock tests.
//!
//! In-process: the same world, strategy and seed produce byte-identical
//! reports. Cross-process: the `run_fixture` binary prints identical output
//! under different working directories and environment variables, and the
//! report directory it writes verifies.

use std::path::Path;
use std::process::Command;

use linkscout_harness::report_dir::verify_report_dir;
use linkscout_harness::runner::run_world;
use linkscout_harness::worlds::fixtures;
use linkscout_search::policy::EngineConfig;
use linkscout_search::strategy::StrategyConfig;
use lock_tests::gate_open;

fn config(seed: u64) -> EngineConfig {
    EngineConfig {
        total_budget_millis: 30_000,
        random_seed: seed,
        ..EngineConfig::default()
    }
}

#[test]
fn same_seed_same_digest_for_every_strategy() {
    let def = fixtures::star(4);
    for name in StrategyConfig::NAMES {
        let strategy = StrategyConfig::from_name(name).unwrap();
        let a = run_world(&def, &strategy, config(17), Some(gate_open("d3"))).unwrap();
        let b = run_world(&def, &strategy, config(17), Some(gate_open("d3"))).unwrap();
        assert_eq!(
            a.to_canonical_json_bytes().unwrap(),
            b.to_canonical_json_bytes().unwrap(),
            "{name} is not deterministic"
        );
        assert_eq!(a.digest().unwrap(), b.digest().unwrap());
    }
}

#[test]
fn digest_binds_the_strategy_name() {
    let def = fixtures::scenario();
    let worklist = StrategyConfig::from_name("worklist").unwrap();
    let random = StrategyConfig::from_name("random-pairs").unwrap();
    let a = run_world(&def, &worklist, config(0), None).unwrap();
    let b = run_world(&def, &random, config(0), None).unwrap();
    assert_ne!(a.digest().unwrap(), b.digest().unwrap());
}

// ---------------------------------------------------------------------------
// Cross-process
// ---------------------------------------------------------------------------

fn write_config(dir: &Path) -> std::path::PathBuf {
    std::fs::write(dir.join("wiring.txt"), "# scenario wiring\nb1,d1\nb2,d2\nb3\n").unwrap();
    let config = serde_json::json!({
        "strategy": "evolutionary",
        "world": {"fixture": "scenario"},
        "goal": {"gate_open": "d2"},
        "budget_millis": 60_000,
        "seed": 42,
        "ground_truth": "wiring.txt",
        "policy": {"max_population_size": 8, "elites_to_keep": 4}
    });
    let path = dir.join("run.json");
    std::fs::write(&path, serde_json::to_vec_pretty(&config).unwrap()).unwrap();
    path
}

fn run_variant(config: &Path, work_dir: &Path, out: Option<&Path>, env_overrides: &[(&str, &str)]) -> String {
    let bin = env!("CARGO_BIN_EXE_run_fixture");
    let mut command = Command::new(bin);
    command.current_dir(work_dir).arg(config);
    if let Some(out) = out {
        command.arg(out);
    }
    command
        .env_remove("LC_ALL")
        .env_remove("LC_COLLATE")
        .env_remove("LANG")
        .env_remove("LANGUAGE")
        .env_remove("RUST_LOG");
    for &(key, val) in env_overrides {
        command.env(key, val);
    }

    let output = command
        .output()
        .unwrap_or_else(|e| panic!("failed to spawn {bin} (work_dir={}): {e}", work_dir.display()));
    assert!(
        output.status.success(),
        "run_fixture exited with {}: stderr={}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("stdout is valid UTF-8")
}

#[test]
fn crossproc_determinism_four_env_variants() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    let out = dir.path().join("report");

    let baseline = run_variant(&config, dir.path(), Some(&out), &[]);
    assert!(baseline.contains("report_digest=sha256:"), "{baseline}");
    assert!(baseline.contains("strategy=evolutionary"), "{baseline}");
    assert!(baseline.contains("goal_solved=true"), "{baseline}");
    assert!(baseline.contains("false_positives=0"), "{baseline}");

    let digest_line = baseline
        .lines()
        .find_map(|l| l.strip_prefix("report_digest="))
        .unwrap();
    assert_eq!(verify_report_dir(&out).unwrap().as_str(), digest_line);

    let alt_cwd = std::env::temp_dir();
    assert_eq!(baseline, run_variant(&config, &alt_cwd, None, &[]), "cwd changed the output");
    assert_eq!(
        baseline,
        run_variant(&config, dir.path(), None, &[("LC_ALL", "C"), ("LANG", "C")]),
        "locale changed the output"
    );
    assert_eq!(
        baseline,
        run_variant(
            &config,
            dir.path(),
            None,
            &[("LINKSCOUT_NOISE", "should_not_matter"), ("TZ", "America/New_York"), ("HOME", "/nonexistent")],
        ),
        "spurious env vars changed the output"
    );
}
