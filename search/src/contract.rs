//! Actuation contract: the boundary between decision and execution.
//!
//! The engine never moves the agent itself. It hands an abstract
//! [`SubGoal`] to an [`ActuationLayerV1`] and polls it once per tick. The
//! actuation layer keeps its belief up to date as a side effect of ticking
//! and reports what changed, which is all the engine needs for edge
//! inference.
//!
//! # Contract
//!
//! - `tick()` must report a trigger's own state change before the gate
//!   changes it caused in the same tick.
//! - `restart()` tears the session down and rebuilds the initial world. The
//!   belief's link registry survives a restart; entity states do not.
//! - The only error either method may return is [`Interrupted`].

use linkscout_kernel::model::belief::BeliefModelV1;
use linkscout_kernel::model::ids::{GateId, TriggerId};

use crate::error::Interrupted;

/// One abstract unit of work delegated to the actuation layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubGoal {
    /// Visit every reachable area to discover triggers and gates.
    Explore,
    /// Walk to `trigger` and toggle it.
    Interact(TriggerId),
    /// Walk next to `gate` and look at it.
    Observe(GateId),
    /// Toggle `trigger`, then walk next to `gate` and look at it.
    InteractThenObserve { trigger: TriggerId, gate: GateId },
}

impl SubGoal {
    /// Short label used in logs.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Explore => "explore".to_string(),
            Self::Interact(t) => format!("interact {t}"),
            Self::Observe(g) => format!("observe {g}"),
            Self::InteractThenObserve { trigger, gate } => {
                format!("interact {trigger} then observe {gate}")
            }
        }
    }
}

/// Status of the current sub-goal after one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GoalStatus {
    Succeeded,
    Failed,
    /// Still running, or abandoned by the engine (turn cap, stuck, termination).
    InProgress,
}

impl GoalStatus {
    #[must_use]
    pub fn is_success(self) -> bool {
        self == Self::Succeeded
    }
}

/// An entity whose observed state differs from the previous tick.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObservedChange {
    Trigger(TriggerId),
    Gate(GateId),
}

/// Agent location, sampled for stuck detection.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    #[must_use]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn dist_sq(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// What one tick produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TickObservation {
    pub status: GoalStatus,
    /// State changes in the order they happened.
    pub changes: Vec<ObservedChange>,
    /// `None` when the agent's position is not observable.
    pub position: Option<Position>,
}

/// Time spent inside `restart()` that must not be charged to the budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionCost {
    pub free_millis: u64,
}

/// An interaction session with the environment.
pub trait ActuationLayerV1 {
    type Belief: BeliefModelV1;

    /// Tear down the current session and start a fresh one from the
    /// initial world state.
    ///
    /// # Errors
    ///
    /// Returns [`Interrupted`] if the environment was cancelled.
    fn restart(&mut self) -> Result<SessionCost, Interrupted>;

    fn belief(&self) -> &Self::Belief;

    fn belief_mut(&mut self) -> &mut Self::Belief;

    /// Replace the active sub-goal. Progress happens only in [`tick`](Self::tick).
    fn dispatch(&mut self, goal: &SubGoal);

    /// Advance the environment by one tick.
    ///
    /// # Errors
    ///
    /// Returns [`Interrupted`] if the environment was cancelled.
    fn tick(&mut self) -> Result<TickObservation, Interrupted>;
}
