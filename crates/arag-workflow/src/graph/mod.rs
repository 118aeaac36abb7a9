//! Pipeline graph storage.
//!
//! [`GraphStore`] owns every node of the four pipeline stages in an arena
//! keyed by [`NodeId`](crate::node::NodeId). Parent and child relations are
//! stored as ids on both sides, so removing a subtree never leaves dangling
//! references. [`SharedGraph`] wraps a store for concurrent access and
//! publishes a revision counter on every mutation.

mod origin;
mod shared;
mod snapshot;
mod store;

pub use origin::Origin;
pub use shared::SharedGraph;
pub use snapshot::{PendingDeletion, WorkflowSnapshot};
pub use store::GraphStore;
pub(crate) use store::Persisted;

/// Tracing target for graph operations.
pub const TRACING_TARGET: &str = "arag_workflow::graph";
