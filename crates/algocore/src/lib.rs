//! Core node-graph model
//!
//! This crate provides the distributed node model every other component
//! depends on: typed slots, the propagation bus, the connection manager,
//! per-node events and slot persistence. Scheduling lives in `algoruntime`.
//!
//! There is no central graph object: every node stores its own adjacency,
//! and edges hold reciprocal shared handles. The completion flags stored on
//! each side of an edge are snapshots refreshed by propagation events, not
//! live queries; the two sides may transiently disagree with a neighbor's
//! real state until the next event.

mod connect;
mod error;
mod events;
mod node;
mod propagation;
mod rules;
mod slot;
mod snapshot;
mod value;

pub use connect::{check_connection, connect, disconnect, is_removable_connection};
pub use error::{FailureReason, GraphError, NodeError, PropagationError, SlotFailure};
pub use events::{NodeEvent, NodeEventKind};
pub use node::{NodeHandle, NodeId, NodeState, NodeType, RunContext};
pub use propagation::pull_inputs;
pub use rules::PropagationRules;
pub use slot::{
    builtin_slots, SlotDef, SlotKind, ValueType, KEEP_INPUT, PARALLEL_EXECUTION, PROPAGATION_RULES,
};
pub use snapshot::{load_slots, save_slots, snapshot, SlotSnapshot};
pub use value::{PropertyMap, Value};

/// Result type for graph operations
pub type Result<T> = std::result::Result<T, GraphError>;
