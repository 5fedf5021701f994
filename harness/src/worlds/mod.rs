//! The simulated environment: world descriptions, the simulator that
//! executes sub-goals against them, and the belief it maintains.

pub mod belief;
pub mod definition;
pub mod fixtures;
pub mod simulator;
