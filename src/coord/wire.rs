//! JSON wire format shared with the browser extension
//!
//! Inbound lines are either runtime messages from a tab's observer
//! (`{"sender": {"tab": {"id": 7}}, "message": {...}}`) or host lifecycle
//! notices (`{"type": "TAB_REMOVED", "tabId": 7}`). Outbound lines are
//! `HostCall`s.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{Result, TabgateError};
use super::host::ObserverMessage;
use super::types::{EventKind, Inbound, LifecycleNotice, NavigationPhase, TabId, VideoEvent};

#[derive(Deserialize)]
struct RuntimeEnvelope {
    #[serde(default)]
    sender: Option<Sender>,
    message: Value,
}

#[derive(Deserialize)]
struct Sender {
    #[serde(default)]
    tab: Option<SenderTab>,
}

#[derive(Deserialize)]
struct SenderTab {
    id: Option<TabId>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
enum ObserverPayload {
    VideoEvent(VideoPayload),
    RequestState,
}

/// Observer report; `duration`, `currentTime` and `endedOnce` are ignored
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoPayload {
    event: EventKind,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    playing: Option<bool>,
    #[serde(default)]
    completed: Option<bool>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
enum HostNotice {
    #[serde(rename_all = "camelCase")]
    TabRemoved { tab_id: TabId },
    #[serde(rename_all = "camelCase")]
    TabUpdated {
        tab_id: TabId,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        status: Option<String>,
    },
}

/// Parse one inbound line.
///
/// `Ok(None)` means the line was well-formed but carries nothing the
/// coordinator acts on (e.g. a tab update without URL, or with a status
/// other than `loading`/`complete`).
pub fn parse_line(line: &str) -> Result<Option<Inbound>> {
    let value: Value = serde_json::from_str(line)?;
    if value.get("message").is_some() {
        parse_runtime(value).map(Some)
    } else if value.get("type").is_some() {
        parse_host_notice(value)
    } else {
        Err(TabgateError::malformed_field("no message or type discriminator", "type"))
    }
}

fn parse_runtime(value: Value) -> Result<Inbound> {
    let envelope: RuntimeEnvelope = serde_json::from_value(value)
        .map_err(|e| TabgateError::malformed(format!("runtime envelope: {}", e)))?;
    let tab_id = envelope
        .sender
        .and_then(|s| s.tab)
        .and_then(|t| t.id)
        .filter(|id| id.0 != 0)
        .ok_or_else(|| {
            TabgateError::malformed_field("message has no sender tab", "sender.tab.id")
        })?;

    let payload: ObserverPayload = serde_json::from_value(envelope.message)
        .map_err(|e| {
            TabgateError::malformed_field(format!("observer message: {}", e), "message.type")
        })?;

    Ok(match payload {
        ObserverPayload::VideoEvent(p) => Inbound::Video(VideoEvent {
            tab_id,
            kind: p.event,
            url: p.url,
            title: p.title,
            playing: p.playing,
            completed: p.completed,
        }),
        ObserverPayload::RequestState => Inbound::Handshake { tab_id },
    })
}

fn parse_host_notice(value: Value) -> Result<Option<Inbound>> {
    let notice: HostNotice = serde_json::from_value(value)
        .map_err(|e| TabgateError::malformed_field(format!("host notice: {}", e), "type"))?;

    Ok(match notice {
        HostNotice::TabRemoved { tab_id } => {
            Some(Inbound::Lifecycle(LifecycleNotice::TabClosed { tab_id }))
        }
        HostNotice::TabUpdated {
            tab_id,
            url: Some(new_url),
            status: Some(status),
        } => NavigationPhase::from_status(&status).map(|phase| {
            Inbound::Lifecycle(LifecycleNotice::TabNavigated {
                tab_id,
                new_url,
                phase,
            })
        }),
        HostNotice::TabUpdated { .. } => None,
    })
}

/// One outbound host call, as written by the bridge
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum HostCall {
    #[serde(rename_all = "camelCase")]
    SendMessage { tab_id: TabId, message: ObserverMessage },
    #[serde(rename_all = "camelCase")]
    CloseTab { tab_id: TabId },
    #[serde(rename_all = "camelCase")]
    FocusTab { tab_id: TabId },
}

impl HostCall {
    pub fn to_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
