use std::sync::Arc;

use anyhow::{Context, bail};
use arag_reqwest::ReqwestAgentStore;
use arag_workflow::{NodeRegistry, SharedGraph, WorkflowLoader};

use super::print_json;
use crate::TRACING_TARGET_COMMAND;
use crate::config::PullArgs;

pub async fn execute(args: PullArgs) -> anyhow::Result<()> {
    let store = ReqwestAgentStore::new(args.store).context("failed to create agent API client")?;
    let graph = SharedGraph::default();
    let loader = WorkflowLoader::new(graph.clone(), Arc::new(store), Arc::new(NodeRegistry::standard()));

    let report = loader.load().await;
    if args.strict && !report.failed_categories.is_empty() {
        bail!("failed to fetch agents for {:?}", report.failed_categories);
    }
    if report.skipped > 0 {
        tracing::warn!(
            target: TRACING_TARGET_COMMAND,
            skipped = report.skipped,
            "Some agents could not be loaded"
        );
    }

    print_json(&graph.snapshot().await)
}
