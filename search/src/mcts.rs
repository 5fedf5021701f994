//! Monte-Carlo tree search over trigger actions.
//!
//! Nodes live in an arena indexed by `usize`; the root is index 0. Each edge
//! is one trigger interaction, so a node's trace is the chain of actions from
//! the root. Reaching a node means replaying that trace in a fresh session.
//!
//! Every iteration descends by UCB1 to a leaf and evaluates it:
//!
//! - at `max_depth`: mark terminal, replay, score;
//! - never played: roll out with uniformly random reachable triggers;
//! - played before: expand one child per reachable trigger and evaluate a
//!   random child.
//!
//! The reward of a state is the number of links observed since the session
//! started, or `max_reward` when the goal holds.

use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use tracing::{debug, info};

use linkscout_kernel::model::belief::BeliefModelV1;
use linkscout_kernel::model::ids::TriggerId;
use linkscout_kernel::model::trace::TraceV1;

use crate::contract::ActuationLayerV1;
use crate::engine::Engine;
use crate::error::{Interrupted, SearchError};
use crate::policy::MctsPolicy;
use crate::report::TerminationReasonV1;
use crate::strategy::Strategy;

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    /// Trigger leading to this node; `None` at the root.
    pub action: Option<TriggerId>,
    pub parent: Option<usize>,
    /// `None` until the node is expanded.
    pub children: Option<Vec<usize>>,
    pub depth: usize,
    pub plays: u32,
    pub total_reward: f32,
    pub average_reward: f32,
    pub terminal: bool,
    pub fully_explored: bool,
}

impl TreeNode {
    fn new(action: Option<TriggerId>, parent: Option<usize>, depth: usize) -> Self {
        Self {
            action,
            parent,
            children: None,
            depth,
            plays: 0,
            total_reward: 0.0,
            average_reward: 0.0,
            terminal: false,
            fully_explored: false,
        }
    }
}

pub struct MctsStrategy {
    policy: MctsPolicy,
    nodes: Vec<TreeNode>,
    winning: Option<TraceV1>,
    goal_seen: bool,
}

impl MctsStrategy {
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidPolicy`] if the policy fails validation.
    pub fn new(policy: MctsPolicy) -> Result<Self, SearchError> {
        policy.validate()?;
        Ok(Self {
            policy,
            nodes: vec![TreeNode::new(None, None, 0)],
            winning: None,
            goal_seen: false,
        })
    }

    #[must_use]
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    #[must_use]
    pub fn root(&self) -> &TreeNode {
        &self.nodes[0]
    }

    /// Actions from the root to `node`.
    #[must_use]
    pub fn trace_of(&self, node: usize) -> TraceV1 {
        let mut steps = Vec::with_capacity(self.nodes[node].depth);
        let mut current = Some(node);
        while let Some(i) = current {
            if let Some(action) = &self.nodes[i].action {
                steps.push(action.clone());
            }
            current = self.nodes[i].parent;
        }
        steps.reverse();
        steps.into()
    }

    /// A node is fully explored iff it is terminal, or it has children and
    /// all of them are fully explored.
    #[must_use]
    pub fn fully_explored_invariant_holds(&self) -> bool {
        self.nodes.iter().all(|n| {
            let expected = n.terminal
                || n.children.as_ref().is_some_and(|ch| {
                    !ch.is_empty() && ch.iter().all(|&c| self.nodes[c].fully_explored)
                });
            n.fully_explored == expected
        })
    }

    fn ucb(&self, child: usize) -> f32 {
        let node = &self.nodes[child];
        if node.plays == 0 {
            return f32::INFINITY;
        }
        let parent_plays = node.parent.map_or(1, |p| self.nodes[p].plays.max(1));
        #[allow(clippy::cast_precision_loss)]
        let explore = ((parent_plays as f32).ln() / node.plays as f32).sqrt();
        node.average_reward + self.policy.exploration_constant * explore
    }

    /// Descend from the root by best UCB, skipping fully explored children
    /// and breaking ties at random.
    fn choose_leaf<E: ActuationLayerV1>(&self, engine: &mut Engine<E>) -> usize {
        let mut current = 0;
        loop {
            let Some(children) = &self.nodes[current].children else {
                return current;
            };
            let open: Vec<usize> = children
                .iter()
                .copied()
                .filter(|&c| !self.nodes[c].fully_explored)
                .collect();
            let best = open
                .iter()
                .map(|&c| self.ucb(c))
                .fold(f32::NEG_INFINITY, f32::max);
            let ties: Vec<usize> = open.into_iter().filter(|&c| self.ucb(c) >= best).collect();
            match ties.choose(engine.rng()) {
                Some(&next) => current = next,
                None => return current,
            }
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn reward<E: ActuationLayerV1>(&self, engine: &Engine<E>) -> f32 {
        if engine.goal_holds() {
            return self.policy.max_reward;
        }
        engine.session_links().len() as f32
    }

    /// Add `reward` to every node from `node` up to the root, refreshing
    /// fully-explored status on the way.
    fn back_propagate(&mut self, node: usize, reward: f32) {
        let mut current = Some(node);
        while let Some(i) = current {
            let n = &mut self.nodes[i];
            n.plays += 1;
            n.total_reward += reward;
            #[allow(clippy::cast_precision_loss)]
            let plays = n.plays as f32;
            n.average_reward = n.total_reward / plays;
            current = n.parent;
            self.refresh_fully_explored(i);
        }
    }

    fn propagate_fully_explored(&mut self, node: usize) {
        let mut current = Some(node);
        while let Some(i) = current {
            self.refresh_fully_explored(i);
            current = self.nodes[i].parent;
        }
    }

    fn refresh_fully_explored(&mut self, i: usize) {
        let done = self.nodes[i].terminal
            || self.nodes[i].children.as_ref().is_some_and(|ch| {
                !ch.is_empty() && ch.iter().all(|&c| self.nodes[c].fully_explored)
            });
        self.nodes[i].fully_explored = done;
    }

    fn record_score(&mut self, trace: TraceV1, reward: f32) {
        if reward >= self.policy.max_reward {
            self.goal_seen = true;
            if self.policy.single_search_mode && self.winning.is_none() {
                info!(trace = %trace, "winning play found");
                self.winning = Some(trace);
            }
        }
    }

    /// Replay the node's trace, then keep taking random reachable triggers
    /// until `max_depth`, a failure, death or the goal.
    ///
    /// The returned trace holds every interaction issued, including a last
    /// one that failed or timed out.
    fn rollout<E: ActuationLayerV1>(
        &mut self,
        engine: &mut Engine<E>,
        node: usize,
    ) -> Result<(TraceV1, f32), Interrupted> {
        let mut played = self.trace_of(node);
        let outcome = engine.replay(&played, false)?;
        if outcome.completed {
            let mut depth = played.len();
            while depth < self.policy.max_depth && !engine.goal_holds() {
                engine.checkpoint();
                if engine.budget().is_exhausted() {
                    break;
                }
                let reachable: Vec<TriggerId> = engine.belief().reachable_triggers().into_iter().collect();
                let Some(chosen) = reachable.choose(engine.rng()).cloned() else {
                    break;
                };
                let status = engine.interact(&chosen)?;
                played.push(chosen);
                if !engine.belief().is_agent_alive() || !status.is_success() {
                    break;
                }
                engine.explore()?;
                depth += 1;
            }
        }
        Ok((played, self.reward(engine)))
    }

    /// Create one child per trigger reachable after replaying the node.
    fn expand<E: ActuationLayerV1>(
        &mut self,
        engine: &mut Engine<E>,
        node: usize,
    ) -> Result<Vec<usize>, Interrupted> {
        let trace = self.trace_of(node);
        let outcome = engine.replay(&trace, false)?;
        let actions: BTreeSet<TriggerId> = if outcome.completed {
            engine.belief().reachable_triggers()
        } else {
            BTreeSet::new()
        };
        let depth = self.nodes[node].depth + 1;
        let mut children = Vec::with_capacity(actions.len());
        for action in actions {
            children.push(self.nodes.len());
            self.nodes.push(TreeNode::new(Some(action), Some(node), depth));
        }
        debug!(node, children = children.len(), "node expanded");
        self.nodes[node].children = Some(children.clone());
        Ok(children)
    }

    fn evaluate_leaf<E: ActuationLayerV1>(
        &mut self,
        engine: &mut Engine<E>,
        leaf: usize,
    ) -> Result<(), Interrupted> {
        let mut leaf = leaf;
        loop {
            if self.nodes[leaf].depth >= self.policy.max_depth {
                engine.note_evaluation();
                self.nodes[leaf].terminal = true;
                let trace = self.trace_of(leaf);
                engine.replay(&trace, false)?;
                let reward = self.reward(engine);
                self.back_propagate(leaf, reward);
                self.record_score(trace, reward);
                return Ok(());
            }
            if self.nodes[leaf].plays == 0 {
                engine.note_evaluation();
                let (trace, reward) = self.rollout(engine, leaf)?;
                debug!(trace = %trace, reward, "rollout");
                self.back_propagate(leaf, reward);
                self.record_score(trace, reward);
                return Ok(());
            }
            let children = self.expand(engine, leaf)?;
            let Some(&next) = children.choose(engine.rng()) else {
                self.nodes[leaf].terminal = true;
                self.propagate_fully_explored(leaf);
                return Ok(());
            };
            leaf = next;
        }
    }

    /// One selection + evaluation round. Returns a termination reason once
    /// the search should stop.
    ///
    /// # Errors
    ///
    /// Propagates [`Interrupted`] from the actuation layer.
    pub fn step<E: ActuationLayerV1>(
        &mut self,
        engine: &mut Engine<E>,
    ) -> Result<Option<TerminationReasonV1>, Interrupted> {
        if let Some(reason) = self.stop_reason(engine) {
            return Ok(Some(reason));
        }
        let leaf = self.choose_leaf(engine);
        self.evaluate_leaf(engine, leaf)?;
        Ok(self.stop_reason(engine))
    }

    fn stop_reason<E: ActuationLayerV1>(&self, engine: &mut Engine<E>) -> Option<TerminationReasonV1> {
        if self.policy.single_search_mode && self.winning.is_some() {
            return Some(TerminationReasonV1::WinningTraceFound);
        }
        if self.root().fully_explored {
            return Some(TerminationReasonV1::TreeFullyExplored);
        }
        engine.checkpoint();
        if engine.budget().is_exhausted() {
            return Some(TerminationReasonV1::BudgetExhausted);
        }
        None
    }
}

impl<E: ActuationLayerV1> Strategy<E> for MctsStrategy {
    fn name(&self) -> &'static str {
        "mcts"
    }

    fn run(&mut self, engine: &mut Engine<E>) -> Result<TerminationReasonV1, Interrupted> {
        loop {
            if let Some(reason) = self.step(engine)? {
                info!(
                    nodes = self.nodes.len(),
                    root_plays = self.root().plays,
                    reason = reason.as_str(),
                    "mcts finished"
                );
                return Ok(reason);
            }
        }
    }

    fn is_goal_solved(&self, engine: &Engine<E>) -> bool {
        self.goal_seen || engine.goal_holds()
    }

    fn winning_trace(&self) -> Option<TraceV1> {
        self.winning.clone()
    }
}
