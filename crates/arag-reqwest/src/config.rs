//! Configuration for the HTTP agent store.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use url::Url;

/// Default timeout for HTTP requests: 30 seconds.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for [`ReqwestAgentStore`](crate::ReqwestAgentStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct ReqwestConfig {
    /// Base URL of the agent API, e.g. `https://host/api/v1/kb/<kb>/agent`.
    #[cfg_attr(feature = "config", arg(long = "agent-api-url", env = "AGENT_API_URL"))]
    pub base_url: Url,

    /// API key sent as a bearer token.
    #[cfg_attr(feature = "config", arg(long = "agent-api-key", env = "AGENT_API_KEY"))]
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    #[cfg_attr(
        feature = "config",
        arg(long = "agent-api-timeout", env = "AGENT_API_TIMEOUT")
    )]
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// User-Agent header to send with requests.
    #[cfg_attr(
        feature = "config",
        arg(long = "agent-api-user-agent", env = "AGENT_API_USER_AGENT")
    )]
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl ReqwestConfig {
    /// Creates a configuration for the given base URL.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            api_key: None,
            timeout_secs: None,
            user_agent: None,
        }
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = Some(timeout.as_secs());
        self
    }

    /// Sets the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Returns the effective timeout, using the default if unset or zero.
    pub fn effective_timeout(&self) -> Duration {
        match self.timeout_secs {
            Some(secs) if secs > 0 => Duration::from_secs(secs),
            _ => DEFAULT_TIMEOUT,
        }
    }

    /// Returns the effective user agent, using the default if unset or empty.
    pub fn effective_user_agent(&self) -> String {
        match &self.user_agent {
            Some(user_agent) if !user_agent.is_empty() => user_agent.clone(),
            _ => Self::default_user_agent(),
        }
    }

    fn default_user_agent() -> String {
        format!("arag/{}", env!("CARGO_PKG_VERSION"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ReqwestConfig {
        ReqwestConfig::new(Url::parse("https://example.com/api/v1/kb/kb-1/agent").unwrap())
    }

    #[test]
    fn defaults() {
        let config = config();
        assert_eq!(config.effective_timeout(), DEFAULT_TIMEOUT);
        assert!(config.effective_user_agent().starts_with("arag/"));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn zero_timeout_and_empty_user_agent_fall_back() {
        let config = config().with_timeout(Duration::ZERO).with_user_agent("");
        assert_eq!(config.effective_timeout(), DEFAULT_TIMEOUT);
        assert!(config.effective_user_agent().starts_with("arag/"));

        let config = config.with_timeout(Duration::from_secs(5)).with_user_agent("ci");
        assert_eq!(config.effective_timeout(), Duration::from_secs(5));
        assert_eq!(config.effective_user_agent(), "ci");
    }

    #[test]
    fn api_key_is_not_serialized() {
        let json = serde_json::to_value(config().with_api_key("secret")).unwrap();
        assert!(json.get("api_key").is_none());
        assert_eq!(json["base_url"], "https://example.com/api/v1/kb/kb-1/agent");
    }
}
