//! Host boundary - where coordinator commands leave the process
//!
//! Every call may fail because the target tab is already gone. Failures are
//! folded into a `CommandOutcome`, logged, and dropped.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace, warn};

use super::types::{TabCommand, TabId};

/// Message delivered to a tab's observer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObserverMessage {
    AllowPlay,
    #[serde(rename = "HARD_PAUSE_LOOP", alias = "FORCE_PAUSE")]
    ForcePause,
}

/// Failure reported by a host call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("tab {0} no longer exists")]
    TabGone(TabId),
    #[error("host rejected call: {0}")]
    Rejected(String),
}

/// Result of dispatching one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Delivered,
    /// The target tab no longer exists
    StaleTarget,
    Failed(String),
}

impl From<Result<(), HostError>> for CommandOutcome {
    fn from(result: Result<(), HostError>) -> Self {
        match result {
            Ok(()) => Self::Delivered,
            Err(HostError::TabGone(_)) => Self::StaleTarget,
            Err(HostError::Rejected(reason)) => Self::Failed(reason),
        }
    }
}

/// Host platform and observer transport
#[async_trait]
pub trait TabHost: Send + Sync {
    /// Close the tab
    async fn close_tab(&self, tab_id: TabId) -> Result<(), HostError>;

    /// Raise the tab's window and make the tab active
    async fn focus_tab(&self, tab_id: TabId) -> Result<(), HostError>;

    /// Deliver a message to the tab's observer
    async fn send_to_tab(&self, tab_id: TabId, message: ObserverMessage) -> Result<(), HostError>;
}

/// Run one command against the host. Never fails; the outcome is logged.
pub async fn dispatch(host: &dyn TabHost, command: TabCommand) -> CommandOutcome {
    let tab_id = command.tab_id();
    let result = match command {
        TabCommand::AllowPlay { .. } => host.send_to_tab(tab_id, ObserverMessage::AllowPlay).await,
        TabCommand::ForcePause { .. } => {
            host.send_to_tab(tab_id, ObserverMessage::ForcePause).await
        }
        TabCommand::CloseTab { .. } => host.close_tab(tab_id).await,
        TabCommand::FocusTab { .. } => host.focus_tab(tab_id).await,
    };

    let outcome = CommandOutcome::from(result);
    match &outcome {
        CommandOutcome::Delivered => trace!(tab = %tab_id, command = command.name(), "delivered"),
        CommandOutcome::StaleTarget => {
            debug!(tab = %tab_id, command = command.name(), "target gone, command dropped")
        }
        CommandOutcome::Failed(reason) => {
            warn!(tab = %tab_id, command = command.name(), "host call failed: {}", reason)
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FlakyHost {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TabHost for FlakyHost {
        async fn close_tab(&self, tab_id: TabId) -> Result<(), HostError> {
            self.calls.lock().unwrap().push(format!("close {}", tab_id.0));
            Err(HostError::TabGone(tab_id))
        }

        async fn focus_tab(&self, tab_id: TabId) -> Result<(), HostError> {
            self.calls.lock().unwrap().push(format!("focus {}", tab_id.0));
            Err(HostError::Rejected("window is closing".into()))
        }

        async fn send_to_tab(
            &self,
            tab_id: TabId,
            message: ObserverMessage,
        ) -> Result<(), HostError> {
            self.calls.lock().unwrap().push(format!("send {} {:?}", tab_id.0, message));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_dispatch_folds_failures() {
        let host = FlakyHost { calls: Mutex::new(Vec::new()) };

        assert_eq!(
            dispatch(&host, TabCommand::CloseTab { tab_id: TabId(1) }).await,
            CommandOutcome::StaleTarget
        );
        assert_eq!(
            dispatch(&host, TabCommand::FocusTab { tab_id: TabId(2) }).await,
            CommandOutcome::Failed("window is closing".into())
        );
        assert_eq!(
            dispatch(&host, TabCommand::ForcePause { tab_id: TabId(3) }).await,
            CommandOutcome::Delivered
        );

        let calls = host.calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["close 1", "focus 2", "send 3 ForcePause"]);
    }

    #[test]
    fn test_observer_message_wire_names() {
        assert_eq!(
            serde_json::to_string(&ObserverMessage::AllowPlay).unwrap(),
            r#"{"type":"ALLOW_PLAY"}"#
        );
        assert_eq!(
            serde_json::to_string(&ObserverMessage::ForcePause).unwrap(),
            r#"{"type":"HARD_PAUSE_LOOP"}"#
        );
        let parsed: ObserverMessage = serde_json::from_str(r#"{"type":"FORCE_PAUSE"}"#).unwrap();
        assert_eq!(parsed, ObserverMessage::ForcePause);
    }
}
