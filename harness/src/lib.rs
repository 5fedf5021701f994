//! Linkscout Harness: a simulated environment and run orchestration.
//!
//! The harness supplies what the search layer deliberately leaves abstract:
//! an actuation layer and belief to run against ([`worlds`]), the real
//! wiring to score a run with ([`ground_truth`]), and a configuration-driven
//! runner that persists reports ([`runner`], [`report_dir`]).
//!
//! The harness does NOT implement search logic. Strategies, budget and edge
//! inference live in `linkscout_search`; the harness only feeds them.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ground_truth;
pub mod report_dir;
pub mod runner;
pub mod worlds;
