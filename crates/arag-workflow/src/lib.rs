#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod codec;
mod error;
pub mod graph;
pub mod node;
pub mod reconcile;
pub mod registry;
pub mod schema;

#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod mock;

#[doc(hidden)]
pub mod prelude;

pub use error::{WorkflowError, WorkflowResult};
pub use graph::{GraphStore, SharedGraph};
pub use reconcile::{AgentStore, Reconciler, WorkflowLoader};
pub use registry::NodeRegistry;

/// Tracing target for workflow operations.
pub const TRACING_TARGET: &str = "arag_workflow";
