//! Agent store error type.

use strum::{AsRefStr, IntoStaticStr};
use thiserror::Error;

/// Boxed error that can be sent across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for agent store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Categories of agent store failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum StoreErrorKind {
    /// Connection to the store failed.
    Network,
    /// The store did not answer in time.
    Timeout,
    /// Credentials were missing or refused.
    Unauthorized,
    /// The agent does not exist.
    NotFound,
    /// The store refused the payload.
    Rejected,
    /// The store is temporarily unavailable.
    Unavailable,
    /// The response could not be interpreted.
    InvalidResponse,
    /// Client configuration is invalid.
    Configuration,
    /// Anything else.
    Unknown,
}

/// Structured error returned by an [`AgentStore`](super::AgentStore).
#[derive(Debug, Error)]
#[error("{}{}", kind.as_ref(), message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
pub struct StoreError {
    /// What went wrong.
    pub kind: StoreErrorKind,
    /// Optional error message.
    pub message: Option<String>,
    /// Optional underlying error.
    #[source]
    pub source: Option<BoxedError>,
}

impl StoreError {
    /// Creates a new error of the given kind.
    pub fn new(kind: StoreErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds a source error to this error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Creates a new network error.
    pub fn network() -> Self {
        Self::new(StoreErrorKind::Network)
    }

    /// Creates a new timeout error.
    pub fn timeout() -> Self {
        Self::new(StoreErrorKind::Timeout)
    }

    /// Creates a new unauthorized error.
    pub fn unauthorized() -> Self {
        Self::new(StoreErrorKind::Unauthorized)
    }

    /// Creates a new not found error.
    pub fn not_found() -> Self {
        Self::new(StoreErrorKind::NotFound)
    }

    /// Creates a new rejected error.
    pub fn rejected() -> Self {
        Self::new(StoreErrorKind::Rejected)
    }

    /// Creates a new unavailable error.
    pub fn unavailable() -> Self {
        Self::new(StoreErrorKind::Unavailable)
    }

    /// Creates a new invalid response error.
    pub fn invalid_response() -> Self {
        Self::new(StoreErrorKind::InvalidResponse)
    }

    /// Creates a new configuration error.
    pub fn configuration() -> Self {
        Self::new(StoreErrorKind::Configuration)
    }

    /// Creates a new unknown error.
    pub fn unknown() -> Self {
        Self::new(StoreErrorKind::Unknown)
    }

    /// Returns the error kind.
    pub fn kind(&self) -> StoreErrorKind {
        self.kind
    }

    /// Returns the error kind as a string.
    pub fn kind_str(&self) -> &'static str {
        self.kind.into()
    }

    /// Returns `true` if the agent does not exist on the store.
    pub fn is_not_found(&self) -> bool {
        self.kind == StoreErrorKind::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let error = StoreError::rejected().with_message("bad payload");
        assert_eq!(error.to_string(), "rejected: bad payload");
        assert_eq!(StoreError::not_found().to_string(), "not_found");
        assert_eq!(error.kind_str(), "rejected");
    }
}
