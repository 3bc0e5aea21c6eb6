//! Core types exchanged with the coordinator
//!
//! Inbound events and lifecycle notices flow in, `TabCommand`s flow out.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Host-assigned tab identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab#{}", self.0)
    }
}

impl From<u32> for TabId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Semantic playback event reported by a tab's observer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    #[serde(alias = "playing")]
    StartedPlaying,
    Ended,
    Replay,
    #[serde(alias = "pause")]
    Paused,
    #[serde(alias = "timeupdate")]
    ProgressUpdate,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartedPlaying => "started-playing",
            Self::Ended => "ended",
            Self::Replay => "replay",
            Self::Paused => "paused",
            Self::ProgressUpdate => "progress-update",
        }
    }
}

/// A playback event from one tab. Absent fields keep their previous value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VideoEvent {
    pub tab_id: TabId,
    pub kind: EventKind,
    pub url: Option<String>,
    pub title: Option<String>,
    pub playing: Option<bool>,
    pub completed: Option<bool>,
}

impl VideoEvent {
    /// Create an event with no payload fields
    pub fn new(tab_id: impl Into<TabId>, kind: EventKind) -> Self {
        Self {
            tab_id: tab_id.into(),
            kind,
            url: None,
            title: None,
            playing: None,
            completed: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_playing(mut self, playing: bool) -> Self {
        self.playing = Some(playing);
        self
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }
}

/// Phase of a host navigation update
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationPhase {
    Loading,
    Complete,
}

impl NavigationPhase {
    /// Map a host tab status; statuses such as `unloaded` have no phase
    pub fn from_status(status: &str) -> Option<Self> {
        match status {
            "loading" => Some(Self::Loading),
            "complete" => Some(Self::Complete),
            _ => None,
        }
    }
}

/// Host-level tab lifecycle notifications
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LifecycleNotice {
    TabClosed {
        tab_id: TabId,
    },
    TabNavigated {
        tab_id: TabId,
        new_url: String,
        phase: NavigationPhase,
    },
}

/// Everything the coordinator consumes
#[derive(Clone, Debug, PartialEq)]
pub enum Inbound {
    Video(VideoEvent),
    Lifecycle(LifecycleNotice),
    /// Observer handshake after attaching to a media element
    Handshake { tab_id: TabId },
}

impl Inbound {
    pub fn tab_id(&self) -> TabId {
        match self {
            Self::Video(event) => event.tab_id,
            Self::Lifecycle(LifecycleNotice::TabClosed { tab_id })
            | Self::Lifecycle(LifecycleNotice::TabNavigated { tab_id, .. })
            | Self::Handshake { tab_id } => *tab_id,
        }
    }
}

impl From<VideoEvent> for Inbound {
    fn from(event: VideoEvent) -> Self {
        Self::Video(event)
    }
}

impl From<LifecycleNotice> for Inbound {
    fn from(notice: LifecycleNotice) -> Self {
        Self::Lifecycle(notice)
    }
}

/// Commands issued by the coordinator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum TabCommand {
    AllowPlay { tab_id: TabId },
    ForcePause { tab_id: TabId },
    CloseTab { tab_id: TabId },
    FocusTab { tab_id: TabId },
}

impl TabCommand {
    pub fn tab_id(&self) -> TabId {
        match *self {
            Self::AllowPlay { tab_id }
            | Self::ForcePause { tab_id }
            | Self::CloseTab { tab_id }
            | Self::FocusTab { tab_id } => tab_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::AllowPlay { .. } => "allow_play",
            Self::ForcePause { .. } => "force_pause",
            Self::CloseTab { .. } => "close_tab",
            Self::FocusTab { .. } => "focus_tab",
        }
    }
}
