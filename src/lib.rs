//! Atree Planner - ability tree build calculator
//!
//! Resolves which selected ability tree nodes are legal, merges their
//! effects and derives spells and stat deltas, all driven by an incremental
//! compute graph.

pub mod atree;
pub mod compose;
pub mod core;
pub mod graph;
pub mod planner;
