//! Reqwest-based HTTP client for the agent API.

use std::sync::Arc;

use arag_workflow::node::{AgentRef, NodeCategory};
use reqwest::{Client, Method, RequestBuilder, Response};
use url::Url;

use crate::config::ReqwestConfig;
use crate::error::{Error, Result};

/// Tracing target for reqwest client operations.
pub const TRACING_TARGET: &str = "arag_reqwest::client";

/// Inner client that holds the HTTP client and configuration.
struct ReqwestAgentStoreInner {
    http: Client,
    config: ReqwestConfig,
}

/// Agent store backed by the HTTP agent API.
///
/// # Examples
///
/// ```rust,ignore
/// use arag_reqwest::{ReqwestAgentStore, ReqwestConfig};
/// use arag_workflow::reconcile::AgentStore;
///
/// let config = ReqwestConfig::new("https://host/api/v1/kb/kb-1/agent".parse()?);
/// let store = ReqwestAgentStore::new(config)?;
/// let agents = store.list_agents(NodeCategory::Context).await?;
/// ```
#[derive(Clone)]
pub struct ReqwestAgentStore {
    inner: Arc<ReqwestAgentStoreInner>,
}

impl std::fmt::Debug for ReqwestAgentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestAgentStore")
            .field("base_url", &self.inner.config.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ReqwestAgentStore {
    /// Creates a new store with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry path segments or the
    /// HTTP client cannot be created.
    pub fn new(config: ReqwestConfig) -> Result<Self> {
        if config.base_url.cannot_be_a_base() {
            return Err(Error::InvalidBaseUrl(config.base_url));
        }

        let timeout = config.effective_timeout();
        let user_agent = config.effective_user_agent();

        tracing::debug!(
            target: TRACING_TARGET,
            base_url = %config.base_url,
            timeout_ms = timeout.as_millis() as u64,
            "Creating agent store client"
        );

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(&user_agent)
            .build()?;

        Ok(Self {
            inner: Arc::new(ReqwestAgentStoreInner { http, config }),
        })
    }

    /// Gets the client configuration.
    pub fn config(&self) -> &ReqwestConfig {
        &self.inner.config
    }

    /// Returns the URL of a category's agent collection.
    pub fn category_url(&self, category: NodeCategory) -> Result<Url> {
        self.url(&[category.as_ref()])
    }

    /// Returns the URL of a single agent.
    pub fn agent_url(&self, category: NodeCategory, agent_ref: &AgentRef) -> Result<Url> {
        self.url(&[category.as_ref(), agent_ref.as_str()])
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let base = &self.inner.config.base_url;
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidBaseUrl(base.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Builds an authenticated request.
    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.inner.http.request(method, url);
        match &self.inner.config.api_key {
            Some(api_key) => request.bearer_auth(api_key),
            None => request,
        }
    }

    /// Sends a request and turns non-success statuses into errors.
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!(
            target: TRACING_TARGET,
            status = status.as_u16(),
            body = %body,
            "Agent API request failed"
        );
        Err(Error::Status { status, body })
    }
}
