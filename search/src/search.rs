//! Run entry point and the caller-facing search facade.

use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{info, warn};

use linkscout_kernel::model::goal::GoalPredicate;
use linkscout_kernel::model::link::Link;

use crate::contract::ActuationLayerV1;
use crate::engine::Engine;
use crate::error::SearchError;
use crate::report::{RunReportV1, TerminationReasonV1};
use crate::strategy::Strategy;

/// Run `strategy` to completion on `engine`.
///
/// Always returns a complete report. An [`Interrupted`](crate::error::Interrupted)
/// error from the actuation layer, or a panic inside the strategy, ends the
/// run early; links and traces accumulated so far are still reported.
pub fn run_strategy<E, S>(engine: &mut Engine<E>, strategy: &mut S) -> RunReportV1
where
    E: ActuationLayerV1,
    S: Strategy<E> + ?Sized,
{
    engine.set_death_policy(strategy.death_policy());
    info!(strategy = strategy.name(), budget = engine.budget().total(), "run started");

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        engine.begin_run()?;
        strategy.run(engine)
    }));
    let termination = match outcome {
        Ok(Ok(reason)) => reason,
        Ok(Err(interrupted)) => {
            warn!(strategy = strategy.name(), detail = %interrupted.detail, "run interrupted");
            TerminationReasonV1::Interrupted {
                detail: interrupted.detail,
            }
        }
        Err(payload) => {
            let detail = panic_message(payload.as_ref());
            warn!(strategy = strategy.name(), detail = %detail, "strategy panicked");
            TerminationReasonV1::InternalPanic { detail }
        }
    };
    engine.checkpoint();

    let mut unresolved = strategy.unresolved_gates();
    unresolved.sort();
    let report = RunReportV1 {
        strategy: strategy.name().to_string(),
        goal: engine.goal_description(),
        links: strategy.discovered_links(engine),
        goal_solved: strategy.is_goal_solved(engine),
        winning_trace: strategy.winning_trace(),
        unresolved,
        counters: engine.counters(),
        budget_total_millis: engine.budget().total(),
        budget_remaining_millis: engine.budget().remaining(),
        termination,
    };
    info!(
        strategy = %report.strategy,
        termination = report.termination.as_str(),
        links = report.links.len(),
        goal_solved = report.goal_solved,
        "run finished"
    );
    report
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// An engine paired with one strategy: the surface callers configure and run.
pub struct LinkSearch<E: ActuationLayerV1 + 'static> {
    engine: Engine<E>,
    strategy: Box<dyn Strategy<E>>,
    last_report: Option<RunReportV1>,
}

impl<E: ActuationLayerV1 + 'static> LinkSearch<E> {
    #[must_use]
    pub fn new(engine: Engine<E>, strategy: Box<dyn Strategy<E>>) -> Self {
        Self {
            engine,
            strategy,
            last_report: None,
        }
    }

    /// # Errors
    ///
    /// Returns [`SearchError::InvalidConfig`] if `total_millis` is not positive.
    pub fn set_budget(&mut self, total_millis: i64) -> Result<(), SearchError> {
        self.engine.set_budget(total_millis)
    }

    pub fn set_goal(&mut self, goal: impl GoalPredicate + 'static) {
        self.engine.set_goal(Arc::new(goal));
    }

    pub fn set_random_seed(&mut self, seed: u64) {
        self.engine.set_random_seed(seed);
    }

    pub fn run(&mut self) -> &RunReportV1 {
        let report = run_strategy(&mut self.engine, self.strategy.as_mut());
        self.last_report.insert(report)
    }

    #[must_use]
    pub fn discovered_links(&self) -> BTreeSet<Link> {
        self.strategy.discovered_links(&self.engine)
    }

    #[must_use]
    pub fn is_goal_solved(&self) -> bool {
        self.strategy.is_goal_solved(&self.engine)
    }

    #[must_use]
    pub fn last_report(&self) -> Option<&RunReportV1> {
        self.last_report.as_ref()
    }

    #[must_use]
    pub fn engine(&self) -> &Engine<E> {
        &self.engine
    }
}
