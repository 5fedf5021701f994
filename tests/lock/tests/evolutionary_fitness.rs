//! Evolutionary lock tests: fitness never exceeds the ceiling, reaches it
//! exactly when the goal held, dead chromosomes score the death value, and
//! a chromosome is only credited with links its own replay observed.

use linkscout_harness::worlds::fixtures;
use linkscout_kernel::model::ids::TriggerId;
use linkscout_kernel::model::trace::TraceV1;
use linkscout_search::evolutionary::{EvolutionaryStrategy, DEATH_FITNESS};
use linkscout_search::policy::EvolutionaryPolicy;
use linkscout_search::report::TerminationReasonV1;
use linkscout_search::search::run_strategy;
use lock_tests::{engine, gate_open};

fn check_population(strategy: &EvolutionaryStrategy, max_fitness: f32) {
    let members: Vec<_> = strategy.population().iter().collect();
    for pair in members.windows(2) {
        assert!(pair[0].fitness >= pair[1].fitness, "population out of order");
    }
    for c in members {
        assert!(c.fitness <= max_fitness, "{} scored {}", c.trace, c.fitness);
        assert_eq!(
            c.fitness >= max_fitness,
            c.snapshot.goal_holds,
            "{} scored {} with goal_holds={}",
            c.trace,
            c.fitness,
            c.snapshot.goal_holds
        );
        if !c.snapshot.goal_holds && !c.snapshot.agent_alive {
            assert!((c.fitness - DEATH_FITNESS).abs() < f32::EPSILON);
        }
    }
}

#[test]
fn goal_chromosome_scores_the_ceiling() {
    let policy = EvolutionaryPolicy::default();
    let max = policy.max_fitness;
    let mut engine = engine(&fixtures::hazard(), 180_000, 8);
    engine.set_goal(gate_open("d1"));
    let mut strategy = EvolutionaryStrategy::new(policy).unwrap();
    let report = run_strategy(&mut engine, &mut strategy);

    assert!(
        matches!(
            report.termination,
            TerminationReasonV1::GoalReached | TerminationReasonV1::MaxFitnessReached
        ),
        "{:?}",
        report.termination
    );
    assert!(report.goal_solved);
    let expected: TraceV1 = vec![TriggerId::from("b1")].into();
    assert_eq!(report.winning_trace, Some(expected));
    check_population(&strategy, max);
}

#[test]
fn fitness_without_goal_counts_links_and_open_gates() {
    let policy = EvolutionaryPolicy::default();
    let max = policy.max_fitness;
    let mut engine = engine(&fixtures::scenario(), 40_000, 2);
    let mut strategy = EvolutionaryStrategy::new(policy).unwrap();
    let report = run_strategy(&mut engine, &mut strategy);

    assert!(!report.goal_solved);
    assert!(report.winning_trace.is_none());
    assert!(!strategy.population().is_empty());
    check_population(&strategy, max);
    for c in strategy.population().iter() {
        #[allow(clippy::cast_precision_loss)]
        let raw = (c.snapshot.links.len() + c.snapshot.open_gates.len()) as f32;
        assert!((c.fitness - raw).abs() < f32::EPSILON, "{}: {} vs {raw}", c.trace, c.fitness);
        // Only the chromosome's own presses can have produced its links.
        assert!(!c.trace.is_empty(), "empty chromosome kept with fitness {}", c.fitness);
        for link in &c.snapshot.links {
            assert!(c.trace.contains(&link.trigger), "{} credited with {link:?}", c.trace);
        }
    }
}
