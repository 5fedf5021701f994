//! `RunReportV1`: the result every run produces, interrupted or not.
//!
//! The report is the audit trail of a run. It serialises to canonical JSON
//! (sorted keys, integers only) and carries a content digest so two runs can
//! be compared byte-for-byte.

use std::collections::BTreeSet;

use linkscout_kernel::model::ids::GateId;
use linkscout_kernel::model::link::Link;
use linkscout_kernel::model::trace::TraceV1;
use linkscout_kernel::proof::canon::{canonical_json_bytes, CanonError};
use linkscout_kernel::proof::hash::{
    canonical_hash, ContentHash, DOMAIN_RUN_REPORT, DOMAIN_TRACE,
};

/// Why a run stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReasonV1 {
    /// Remaining budget reached zero.
    BudgetExhausted,
    /// The goal predicate held on the belief.
    GoalReached,
    /// The agent died and the strategy treats death as fatal.
    AgentDied,
    /// Worklist: every gate was processed.
    WorklistExhausted,
    /// Exploration found no trigger to work with.
    NoTriggersFound,
    /// Evolutionary: the best chromosome reached the fitness ceiling.
    MaxFitnessReached,
    /// Evolutionary: generations stopped producing new chromosomes.
    Stagnated,
    /// MCTS: the root became fully explored.
    TreeFullyExplored,
    /// Single-search mode recorded a winning trace.
    WinningTraceFound,
    /// Random pairs: the configured number of pairs was checked.
    PairLimitReached,
    /// The actuation layer was cancelled from outside.
    Interrupted { detail: String },
    /// A panic escaped the strategy and was caught at the run boundary.
    InternalPanic { detail: String },
}

impl TerminationReasonV1 {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BudgetExhausted => "budget_exhausted",
            Self::GoalReached => "goal_reached",
            Self::AgentDied => "agent_died",
            Self::WorklistExhausted => "worklist_exhausted",
            Self::NoTriggersFound => "no_triggers_found",
            Self::MaxFitnessReached => "max_fitness_reached",
            Self::Stagnated => "stagnated",
            Self::TreeFullyExplored => "tree_fully_explored",
            Self::WinningTraceFound => "winning_trace_found",
            Self::PairLimitReached => "pair_limit_reached",
            Self::Interrupted { .. } => "interrupted",
            Self::InternalPanic { .. } => "internal_panic",
        }
    }

    fn to_json_value(&self) -> serde_json::Value {
        match self {
            Self::Interrupted { detail } | Self::InternalPanic { detail } => {
                serde_json::json!({"detail": detail, "type": self.as_str()})
            }
            _ => serde_json::json!({"type": self.as_str()}),
        }
    }
}

/// Why a gate was left unopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UnresolvedReasonV1 {
    /// No trigger was linked or still unknown for the gate.
    NoCandidateTrigger,
    /// Every candidate was tried and the gate stayed closed.
    NotOpened,
}

impl UnresolvedReasonV1 {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoCandidateTrigger => "no_candidate_trigger",
            Self::NotOpened => "not_opened",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct UnresolvedGateV1 {
    pub gate: GateId,
    pub reason: UnresolvedReasonV1,
}

/// Work counters accumulated by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    /// Environment ticks polled.
    pub turns: u64,
    /// Sub-goals dispatched to the actuation layer.
    pub sub_goals: u64,
    /// Sessions started (restarts).
    pub sessions: u64,
    /// Strategy-level evaluations: chromosomes, rollouts, episodes or pairs.
    pub evaluations: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReportV1 {
    pub strategy: String,
    /// Description of the goal predicate, if one was set.
    pub goal: Option<String>,
    pub termination: TerminationReasonV1,
    pub links: BTreeSet<Link>,
    pub goal_solved: bool,
    pub winning_trace: Option<TraceV1>,
    pub unresolved: Vec<UnresolvedGateV1>,
    pub counters: RunCounters,
    pub budget_total_millis: i64,
    pub budget_remaining_millis: i64,
}

impl RunReportV1 {
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        let links: Vec<serde_json::Value> = self
            .links
            .iter()
            .map(|l| serde_json::json!({"gate": l.gate.as_str(), "trigger": l.trigger.as_str()}))
            .collect();
        let unresolved: Vec<serde_json::Value> = self
            .unresolved
            .iter()
            .map(|u| serde_json::json!({"gate": u.gate.as_str(), "reason": u.reason.as_str()}))
            .collect();
        let winning_trace = match &self.winning_trace {
            Some(trace) => serde_json::json!({
                "digest": trace_digest(trace).as_str(),
                "steps": trace.to_json_value(),
            }),
            None => serde_json::Value::Null,
        };
        serde_json::json!({
            "budget": {
                "remaining_millis": self.budget_remaining_millis,
                "total_millis": self.budget_total_millis,
            },
            "counters": {
                "evaluations": self.counters.evaluations,
                "sessions": self.counters.sessions,
                "sub_goals": self.counters.sub_goals,
                "turns": self.counters.turns,
            },
            "goal": self.goal,
            "goal_solved": self.goal_solved,
            "links": links,
            "schema_version": "run_report.v1",
            "strategy": self.strategy,
            "termination": self.termination.to_json_value(),
            "unresolved": unresolved,
            "winning_trace": winning_trace,
        })
    }

    /// # Errors
    ///
    /// Returns [`CanonError`] if the report contains a non-integer number,
    /// which the report schema never produces.
    pub fn to_canonical_json_bytes(&self) -> Result<Vec<u8>, CanonError> {
        canonical_json_bytes(&self.to_json_value())
    }

    /// Content hash of the canonical JSON bytes.
    ///
    /// # Errors
    ///
    /// Same as [`to_canonical_json_bytes`](Self::to_canonical_json_bytes).
    pub fn digest(&self) -> Result<ContentHash, CanonError> {
        let bytes = self.to_canonical_json_bytes()?;
        Ok(canonical_hash(DOMAIN_RUN_REPORT, &bytes))
    }
}

/// Content hash of a trace, independent of the report it appears in.
#[must_use]
pub fn trace_digest(trace: &TraceV1) -> ContentHash {
    let joined: Vec<&str> = trace.iter().map(|t| t.as_str()).collect();
    canonical_hash(DOMAIN_TRACE, joined.join("\n").as_bytes())
}
