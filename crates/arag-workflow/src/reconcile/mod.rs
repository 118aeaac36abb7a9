//! Synchronization between the graph and a remote agent store.
//!
//! - [`AgentStore`]: the remote backend, one list of agents per category
//! - [`Reconciler`]: pushes local changes as add/update/delete calls
//! - [`WorkflowLoader`]: rebuilds the graph from the backend
//! - [`Notifier`]: receives user-facing failure notifications

mod config;
mod engine;
mod error;
mod loader;
mod notify;
mod plan;
mod report;
mod store;

pub use config::{ReconcilerConfig, ReconcilerConfigBuilder};
pub use engine::Reconciler;
pub use error::{BoxedError, StoreError, StoreErrorKind, StoreResult};
pub use loader::{LoadReport, WorkflowLoader};
pub use notify::{Notification, NotificationLevel, Notifier, TracingNotifier};
pub use report::ReconcileReport;
pub use store::AgentStore;

/// Tracing target for reconciliation.
pub const TRACING_TARGET: &str = "arag_workflow::reconcile";
