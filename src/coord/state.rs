//! Tab state store, admission queue and the per-tab phase model
//!
//! These are plain data structures owned by the `Arbiter`. Nothing here
//! issues commands; the arbiter decides what a transition means.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::types::{EventKind, TabId, VideoEvent};

/// Where a tab sits in the arbitration lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TabPhase {
    /// No state is held for the tab
    Unseen,
    QueuedPlaying,
    QueuedPaused,
    /// Terminal: state dropped, close issued
    Evicted,
}

/// What the arbiter must do after a transition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Drop the tab, close it and advance the queue
    Evict,
    /// The tab wants the playback slot
    Contend,
    /// State merge only
    Track,
}

impl TabPhase {
    /// Transition table for one event, given the merged flags.
    ///
    /// The source phase does not change the outcome: an evicted tab that
    /// reports again is re-admitted as if unseen.
    pub fn after(kind: EventKind, completed: bool, playing: bool) -> (TabPhase, Transition) {
        use EventKind::*;

        match (kind, completed) {
            (Ended, _) | (_, true) => (TabPhase::Evicted, Transition::Evict),
            (Replay, false) => (TabPhase::Evicted, Transition::Evict),
            (StartedPlaying, false) => (TabPhase::QueuedPlaying, Transition::Contend),
            (Paused, false) => (TabPhase::QueuedPaused, Transition::Track),
            (ProgressUpdate, false) if playing => (TabPhase::QueuedPlaying, Transition::Track),
            (ProgressUpdate, false) => (TabPhase::QueuedPaused, Transition::Track),
        }
    }

    pub fn is_queued(&self) -> bool {
        matches!(self, Self::QueuedPlaying | Self::QueuedPaused)
    }
}

/// Last-known playback state of a tab
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TabState {
    pub url: Option<String>,
    pub title: Option<String>,
    pub completed: bool,
    pub playing: bool,
    pub last_update: DateTime<Utc>,
    pub phase: TabPhase,
}

impl TabState {
    fn empty(now: DateTime<Utc>) -> Self {
        Self {
            url: None,
            title: None,
            completed: false,
            playing: false,
            last_update: now,
            phase: TabPhase::Unseen,
        }
    }

    /// Merge the fields carried by `event`; absent or empty fields keep the old value
    fn merge(&mut self, event: &VideoEvent, now: DateTime<Utc>) {
        if let Some(url) = event.url.as_deref().filter(|u| !u.is_empty()) {
            self.url = Some(url.to_string());
        }
        if let Some(title) = event.title.as_deref().filter(|t| !t.is_empty()) {
            self.title = Some(title.to_string());
        }
        if let Some(completed) = event.completed {
            self.completed = completed;
        }
        if let Some(playing) = event.playing {
            self.playing = playing;
        }
        self.last_update = now;
    }
}

/// Mapping from tab id to last-known state
#[derive(Debug, Default)]
pub struct TabStore {
    tabs: HashMap<TabId, TabState>,
}

impl TabStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge an event into the tab's state, creating it if needed.
    /// Returns the phase the tab was in before the merge.
    pub fn merge(&mut self, event: &VideoEvent, now: DateTime<Utc>) -> (TabPhase, &mut TabState) {
        let state = self
            .tabs
            .entry(event.tab_id)
            .or_insert_with(|| TabState::empty(now));
        let before = state.phase;
        state.merge(event, now);
        (before, state)
    }

    pub fn get(&self, tab_id: TabId) -> Option<&TabState> {
        self.tabs.get(&tab_id)
    }

    pub fn remove(&mut self, tab_id: TabId) -> Option<TabState> {
        self.tabs.remove(&tab_id)
    }

    pub fn contains(&self, tab_id: TabId) -> bool {
        self.tabs.contains_key(&tab_id)
    }

    /// Tabs other than `except` whose last report said they were playing
    pub fn playing_except(&self, except: TabId) -> Vec<TabId> {
        let mut ids: Vec<TabId> = self
            .tabs
            .iter()
            .filter(|(id, st)| **id != except && st.playing)
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TabId, &TabState)> {
        self.tabs.iter()
    }
}

/// Insertion-ordered set of tab ids
#[derive(Debug, Default)]
pub struct AdmissionQueue {
    order: Vec<TabId>,
    members: HashSet<TabId>,
}

impl AdmissionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `tab_id` unless already queued. Returns true if it was inserted.
    pub fn admit(&mut self, tab_id: TabId) -> bool {
        if !self.members.insert(tab_id) {
            return false;
        }
        self.order.push(tab_id);
        true
    }

    pub fn remove(&mut self, tab_id: TabId) -> bool {
        if !self.members.remove(&tab_id) {
            return false;
        }
        self.order.retain(|id| *id != tab_id);
        true
    }

    pub fn contains(&self, tab_id: TabId) -> bool {
        self.members.contains(&tab_id)
    }

    /// First queued tab, other than `except`, that has state and is not completed
    pub fn next_unfinished(&self, store: &TabStore, except: Option<TabId>) -> Option<TabId> {
        self.order.iter().copied().find(|id| {
            Some(*id) != except && store.get(*id).map_or(false, |st| !st.completed)
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = TabId> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
