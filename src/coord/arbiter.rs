//! Arbiter - the tab arbitration state machine
//!
//! The arbiter owns the tab state store, the admission queue and the single
//! active slot. It is synchronous and performs no I/O: every input returns
//! the list of commands the caller must dispatch. This keeps the
//! advancement logic testable without the async plumbing around it.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::core::{CoordinatorConfig, Result};
use super::state::{AdmissionQueue, TabPhase, TabState, TabStore, Transition};
use super::types::{Inbound, LifecycleNotice, NavigationPhase, TabCommand, TabId, VideoEvent};

/// Point-in-time view of the arbitration state
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ArbiterSnapshot {
    pub active: Option<TabId>,
    pub queue: Vec<TabId>,
    pub tabs: Vec<(TabId, TabState)>,
}

/// Single-slot playback arbiter
#[derive(Debug)]
pub struct Arbiter {
    store: TabStore,
    queue: AdmissionQueue,
    active: Option<TabId>,
    site: Regex,
    focus_on_advance: bool,
    advance_on_navigate: bool,
    hold_slot_on_evict: bool,
}

impl Arbiter {
    /// Create an arbiter from a validated configuration
    pub fn new(config: &CoordinatorConfig) -> Result<Self> {
        Ok(Self {
            store: TabStore::new(),
            queue: AdmissionQueue::new(),
            active: None,
            site: config.compile_site_pattern()?,
            focus_on_advance: config.focus_on_advance,
            advance_on_navigate: config.advance_on_navigate,
            hold_slot_on_evict: config.hold_slot_on_evict,
        })
    }

    /// Route any inbound message to its handler
    pub fn apply(&mut self, inbound: &Inbound) -> Vec<TabCommand> {
        match inbound {
            Inbound::Video(event) => self.handle(event),
            Inbound::Lifecycle(LifecycleNotice::TabClosed { tab_id }) => {
                self.on_tab_closed(*tab_id)
            }
            Inbound::Lifecycle(LifecycleNotice::TabNavigated { tab_id, new_url, phase }) => {
                self.on_tab_navigated(*tab_id, new_url, *phase)
            }
            Inbound::Handshake { tab_id } => {
                debug!(tab = %tab_id, "observer handshake");
                Vec::new()
            }
        }
    }

    /// Process one playback event
    pub fn handle(&mut self, event: &VideoEvent) -> Vec<TabCommand> {
        self.handle_at(event, Utc::now())
    }

    /// Process one playback event with an explicit timestamp
    pub fn handle_at(&mut self, event: &VideoEvent, now: DateTime<Utc>) -> Vec<TabCommand> {
        let tab_id = event.tab_id;
        let (before, state) = self.store.merge(event, now);
        let (phase, transition) = TabPhase::after(event.kind, state.completed, state.playing);
        state.phase = phase;

        if self.queue.admit(tab_id) {
            debug!(tab = %tab_id, event = event.kind.as_str(), "admitted to queue");
        }
        if before != phase {
            debug!(tab = %tab_id, from = ?before, to = ?phase, "phase change");
        }

        match transition {
            Transition::Evict => {
                let mut commands = self.evict(tab_id);
                match self.active {
                    Some(active) if self.hold_slot_on_evict => {
                        debug!(tab = %active, "slot still held, not advancing");
                    }
                    _ => commands.extend(self.advance(Some(tab_id))),
                }
                commands
            }
            Transition::Contend => self.contend(tab_id),
            Transition::Track => Vec::new(),
        }
    }

    /// Host reported the tab closed
    pub fn on_tab_closed(&mut self, tab_id: TabId) -> Vec<TabCommand> {
        let was_tracked = self.forget(tab_id);
        if self.active != Some(tab_id) {
            if was_tracked {
                debug!(tab = %tab_id, "tracked tab closed");
            }
            return Vec::new();
        }

        info!(tab = %tab_id, "active tab closed");
        self.active = None;
        self.advance(Some(tab_id))
    }

    /// Host reported a navigation. Only the loading phase of a navigation
    /// off the site is acted upon.
    pub fn on_tab_navigated(
        &mut self,
        tab_id: TabId,
        new_url: &str,
        phase: NavigationPhase,
    ) -> Vec<TabCommand> {
        if phase != NavigationPhase::Loading || self.site.is_match(new_url) {
            return Vec::new();
        }

        let was_tracked = self.forget(tab_id);
        if self.active != Some(tab_id) {
            if was_tracked {
                debug!(tab = %tab_id, url = new_url, "tracked tab left the site");
            }
            return Vec::new();
        }

        info!(tab = %tab_id, url = new_url, "active tab left the site");
        self.active = None;
        if self.advance_on_navigate {
            self.advance(Some(tab_id))
        } else {
            Vec::new()
        }
    }

    /// Tab currently holding the playback slot
    pub fn active(&self) -> Option<TabId> {
        self.active
    }

    pub fn queue(&self) -> &AdmissionQueue {
        &self.queue
    }

    pub fn store(&self) -> &TabStore {
        &self.store
    }

    /// Phase of a tab; untracked tabs are `Unseen`
    pub fn phase(&self, tab_id: TabId) -> TabPhase {
        self.store.get(tab_id).map_or(TabPhase::Unseen, |st| st.phase)
    }

    pub fn snapshot(&self) -> ArbiterSnapshot {
        let mut tabs: Vec<(TabId, TabState)> = self
            .store
            .iter()
            .map(|(id, st)| (*id, st.clone()))
            .collect();
        tabs.sort_by_key(|(id, _)| *id);
        ArbiterSnapshot {
            active: self.active,
            queue: self.queue.iter().collect(),
            tabs,
        }
    }

    /// Store and queue hold the same ids, every tracked tab is in a queued
    /// phase, and the active tab is one of them
    pub fn is_consistent(&self) -> bool {
        self.store.len() == self.queue.len()
            && self.queue.iter().all(|id| self.phase(id).is_queued())
            && self.active.map_or(true, |id| self.queue.contains(id))
    }

    fn forget(&mut self, tab_id: TabId) -> bool {
        let had_state = self.store.remove(tab_id).is_some();
        let was_queued = self.queue.remove(tab_id);
        had_state || was_queued
    }

    fn evict(&mut self, tab_id: TabId) -> Vec<TabCommand> {
        self.forget(tab_id);
        if self.active == Some(tab_id) {
            self.active = None;
        }
        info!(tab = %tab_id, "evicting finished tab");
        vec![TabCommand::CloseTab { tab_id }]
    }

    /// Grant the slot to the next unfinished tab, replacing any holder.
    /// Nothing changes when no candidate is left.
    fn advance(&mut self, except: Option<TabId>) -> Vec<TabCommand> {
        let Some(next) = self.queue.next_unfinished(&self.store, except) else {
            debug!("queue drained, no tab to advance to");
            return Vec::new();
        };

        info!(tab = %next, "advancing to next unfinished tab");
        self.active = Some(next);
        let mut commands = Vec::with_capacity(2);
        if self.focus_on_advance {
            commands.push(TabCommand::FocusTab { tab_id: next });
        }
        commands.push(TabCommand::AllowPlay { tab_id: next });
        commands
    }

    fn contend(&mut self, tab_id: TabId) -> Vec<TabCommand> {
        match self.active {
            None => {
                info!(tab = %tab_id, "granting playback slot");
                self.active = Some(tab_id);
                let mut commands = vec![TabCommand::AllowPlay { tab_id }];
                commands.extend(
                    self.store
                        .playing_except(tab_id)
                        .into_iter()
                        .map(|id| TabCommand::ForcePause { tab_id: id }),
                );
                commands
            }
            Some(active) if active != tab_id => {
                info!(tab = %tab_id, active = %active, "denying playback, slot held");
                vec![
                    TabCommand::ForcePause { tab_id },
                    TabCommand::FocusTab { tab_id: active },
                ]
            }
            Some(_) => Vec::new(),
        }
    }
}
