//! User-facing notifications.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use super::TRACING_TARGET;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// Message surfaced to the user when a background operation fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Severity.
    pub level: NotificationLevel,
    /// Short title.
    pub title: String,
    /// Detailed message.
    pub message: String,
}

impl Notification {
    /// Creates an error notification.
    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            title: title.into(),
            message: message.into(),
        }
    }

    /// Creates a warning notification.
    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Warning,
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Sink for user-facing notifications.
pub trait Notifier: Send + Sync {
    /// Delivers a notification.
    fn notify(&self, notification: Notification);
}

/// Notifier writing every notification to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Info => tracing::info!(
                target: TRACING_TARGET,
                title = %notification.title,
                "{}",
                notification.message
            ),
            NotificationLevel::Warning => tracing::warn!(
                target: TRACING_TARGET,
                title = %notification.title,
                "{}",
                notification.message
            ),
            NotificationLevel::Error => tracing::error!(
                target: TRACING_TARGET,
                title = %notification.title,
                "{}",
                notification.message
            ),
        }
    }
}
