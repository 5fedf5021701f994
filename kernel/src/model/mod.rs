//! Belief-side data model: identifiers, links, traces, goals.

pub mod belief;
pub mod goal;
pub mod ids;
pub mod link;
pub mod trace;
