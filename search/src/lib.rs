//! Linkscout Search: trigger/gate link inference under a bounded budget.
//!
//! This crate provides the decision layer. It depends only on
//! `linkscout_kernel`; it does NOT depend on `linkscout_harness`.
//!
//! # Crate dependency graph
//!
//! ```text
//! linkscout_kernel  ←  linkscout_search  ←  linkscout_harness
//! (ids, links,         (engine, strategies)   (simulated world, runner)
//!  belief, canon)
//! ```
//!
//! # Key types
//!
//! - [`Engine`](engine::Engine) -- budget, sub-goal dispatch, edge inference, termination
//! - [`ActuationLayerV1`](contract::ActuationLayerV1) -- the environment session contract
//! - [`Strategy`](strategy::Strategy) -- the seam every search paradigm implements
//! - [`RunReportV1`](report::RunReportV1) -- the result of every run, interrupted or not
//!
//! # Strategies
//!
//! - [`worklist`] -- breadth-first sweep over discovered gates
//! - [`evolutionary`] -- population of trigger sequences
//! - [`mcts`] -- UCB1 tree over trigger actions with replay rollouts
//! - [`qlearning`] -- tabular Q-learning over active-trigger states
//! - [`random_pairs`] -- uniform random pair baseline

#![forbid(unsafe_code)]

pub mod budget;
pub mod clock;
pub mod contract;
pub mod engine;
pub mod error;
pub mod evolutionary;
pub mod mcts;
pub mod policy;
pub mod qlearning;
pub mod random_pairs;
pub mod report;
pub mod search;
pub mod strategy;
pub mod worklist;

#[cfg(test)]
pub(crate) mod test_world;
