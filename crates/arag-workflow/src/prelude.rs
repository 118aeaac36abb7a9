//! Convenient re-exports for common use.

pub use crate::codec::{AgentCodec, CodecContext};
pub use crate::error::{WorkflowError, WorkflowResult};
pub use crate::graph::{GraphStore, Origin, PendingDeletion, SharedGraph, WorkflowSnapshot};
pub use crate::node::{AgentRef, Config, NewNode, Node, NodeCategory, NodeId, NodePatch, NodeType, Slot};
pub use crate::reconcile::{
    AgentStore, Notification, Notifier, ReconcileReport, Reconciler, ReconcilerConfig, StoreError, StoreResult,
    WorkflowLoader,
};
pub use crate::registry::{NodeDescriptor, NodeRegistry};
pub use crate::schema::{NodeForm, SchemaDocument};
