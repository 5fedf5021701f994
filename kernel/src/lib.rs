//! Linkscout Kernel: the vocabulary shared by every layer of Linkscout.
//!
//! # API Surface
//!
//! - [`model::ids`] -- trigger, gate and entity identifiers
//! - [`model::link`] -- the tri-state link map with monotonic recording rules
//! - [`model::trace`] -- replayable interaction sequences
//! - [`model::belief`] -- the belief contract every strategy reads from
//! - [`model::goal`] -- goal predicates evaluated against a belief
//! - [`proof::canon`] / [`proof::hash`] -- canonical JSON and content digests
//!
//! # Module Dependency Direction
//!
//! `model` ← `proof`
//!
//! `model` depends on nothing internal. `proof` is a leaf utility used by
//! the report layers in `linkscout_search` and `linkscout_harness`.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod model;
pub mod proof;
