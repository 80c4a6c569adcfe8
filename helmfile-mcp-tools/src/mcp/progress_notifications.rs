//! Progress reporting for helmfile tool invocations
//!
//! The tool facade reports three phases per invocation through an optional
//! [`ProgressSink`]. Over MCP the sink is a [`ProgressSender`] feeding a channel
//! that the server drains into `notifications/progress` messages.
//!
//! ```ignore
//! let (tx, mut rx) = mpsc::unbounded_channel();
//! let sender = ProgressSender::new(tx, "request-7");
//!
//! tools.execute_command(&spec, Some(&sender)).await;
//! while let Some(notification) = rx.recv().await {
//!     println!("{}: {}", notification.progress_token, notification.message);
//! }
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

/// Pipeline boundaries at which progress is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressPhase {
    /// Command passed the guardrails
    Validated,
    /// First stage is about to spawn
    Started,
    /// Chain finished, failed or timed out
    Completed,
}

impl ProgressPhase {
    /// Phase name as reported to clients
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressPhase::Validated => "validated",
            ProgressPhase::Started => "started",
            ProgressPhase::Completed => "completed",
        }
    }

    /// Completion percentage associated with the phase
    pub fn percent(self) -> u32 {
        match self {
            ProgressPhase::Validated => 10,
            ProgressPhase::Started => 20,
            ProgressPhase::Completed => 100,
        }
    }
}

/// Collaborator receiving phase notifications
///
/// Implementations must not block; reporting never fails the invocation.
pub trait ProgressSink: Send + Sync {
    /// Record that `phase` was reached
    fn report(&self, phase: ProgressPhase, detail: Option<&str>);
}

/// Progress notification for one phase of a tool invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressNotification {
    /// Token of the invocation this update belongs to
    pub progress_token: String,

    /// Progress percentage (0-100), None for indeterminate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u32>,

    /// Human-readable progress message
    pub message: String,

    /// Phase that produced this notification
    pub phase: ProgressPhase,
}

/// Error type for notification sending failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum SendError {
    /// Channel was closed, receiver no longer exists
    #[error("Progress notification channel closed: {0}")]
    ChannelClosed(String),
}

/// Channel-backed progress sink bound to one invocation's token
///
/// Cloneable; clones share the channel.
#[derive(Clone)]
pub struct ProgressSender {
    sender: mpsc::UnboundedSender<ProgressNotification>,
    token: String,
}

impl ProgressSender {
    /// Create a sender tagging every notification with `token`
    pub fn new(sender: mpsc::UnboundedSender<ProgressNotification>, token: impl Into<String>) -> Self {
        Self {
            sender,
            token: token.into(),
        }
    }

    /// Send a progress notification through the channel
    pub fn send(&self, notification: ProgressNotification) -> Result<(), SendError> {
        self.sender
            .send(notification)
            .map_err(|e| SendError::ChannelClosed(e.to_string()))
    }

    /// Send a phase notification with an optional detail
    pub fn send_phase(&self, phase: ProgressPhase, detail: Option<&str>) -> Result<(), SendError> {
        let message = match detail {
            Some(detail) if !detail.is_empty() => format!("{}: {}", phase.as_str(), detail),
            _ => phase.as_str().to_string(),
        };

        self.send(ProgressNotification {
            progress_token: self.token.clone(),
            progress: Some(phase.percent()),
            message,
            phase,
        })
    }
}

impl ProgressSink for ProgressSender {
    fn report(&self, phase: ProgressPhase, detail: Option<&str>) {
        if let Err(e) = self.send_phase(phase, detail) {
            debug!("Dropping progress notification: {}", e);
        }
    }
}

/// Report to an optional sink
pub(crate) fn report(sink: Option<&dyn ProgressSink>, phase: ProgressPhase, detail: Option<&str>) {
    if let Some(sink) = sink {
        sink.report(phase, detail);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_percent_is_monotonic() {
        assert!(ProgressPhase::Validated.percent() < ProgressPhase::Started.percent());
        assert!(ProgressPhase::Started.percent() < ProgressPhase::Completed.percent());
        assert_eq!(ProgressPhase::Completed.percent(), 100);
    }

    #[test]
    fn test_sender_tags_token_and_detail() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sender = ProgressSender::new(tx, "tok-1");

        sender.report(ProgressPhase::Started, Some("helmfile list"));
        let notification = rx.try_recv().unwrap();

        assert_eq!(notification.progress_token, "tok-1");
        assert_eq!(notification.progress, Some(20));
        assert_eq!(notification.message, "started: helmfile list");
        assert_eq!(notification.phase, ProgressPhase::Started);
    }

    #[test]
    fn test_sender_without_detail() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sender = ProgressSender::new(tx, "tok-2");

        sender.report(ProgressPhase::Validated, None);
        assert_eq!(rx.try_recv().unwrap().message, "validated");
    }

    #[test]
    fn test_closed_channel_does_not_panic() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sender = ProgressSender::new(tx, "tok-3");

        assert!(sender.send_phase(ProgressPhase::Completed, None).is_err());
        sender.report(ProgressPhase::Completed, None);
    }

    #[test]
    fn test_notification_serialization() {
        let notification = ProgressNotification {
            progress_token: "t".to_string(),
            progress: None,
            message: "validated".to_string(),
            phase: ProgressPhase::Validated,
        };
        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["phase"], "validated");
        assert!(json.get("progress").is_none());
    }

    #[test]
    fn test_report_with_absent_sink_is_noop() {
        report(None, ProgressPhase::Validated, Some("ignored"));
    }
}
