//! Incremental recomputation substrate
//!
//! Nodes declare named input slots and are wired to upstream nodes. A node's
//! published result stays valid until it is marked dirty, either directly or
//! because something upstream published a new result. Updating a node pulls
//! its upstreams up to date first, so each node computes at most once per
//! change.

pub mod engine;
pub mod node;

pub use engine::{ComputeGraph, GraphError};
pub use node::{Compute, ComputeError, FnNode, Inputs, NodeId, Outcome};
