//! Per-tab observer: media signals in, `VideoEvent`s out
//!
//! Translates raw media element signals into the semantic events the
//! coordinator understands, and applies the coordinator's
//! `AllowPlay`/`ForcePause` messages back onto the media element.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::coord::{EventKind, Inbound, ObserverMessage, TabId, VideoEvent};
use crate::core::ObserverConfig;
use super::enforcer::{GuardLoop, PageGuard, PauseEnforcer};
use super::media::MediaElement;

/// Raw signal from a media element
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaSignal {
    Play,
    Pause,
    Ended,
    TimeUpdate,
}

/// Detects playback restarting from the top after the media ended
#[derive(Clone, Debug)]
pub struct ReplayDetector {
    ended_once: bool,
    window: Duration,
}

impl ReplayDetector {
    pub fn new(window: Duration) -> Self {
        Self {
            ended_once: false,
            window,
        }
    }

    pub fn on_ended(&mut self) {
        self.ended_once = true;
    }

    /// A play at `current_time` seconds is a replay
    pub fn is_replay(&self, current_time: f64) -> bool {
        self.ended_once && current_time < self.window.as_secs_f64()
    }

    pub fn ended_once(&self) -> bool {
        self.ended_once
    }

    pub fn reset(&mut self) {
        self.ended_once = false;
    }
}

/// Observer for a single tab
pub struct TabObserver<M: MediaElement> {
    tab_id: TabId,
    threshold: f64,
    url: Option<String>,
    title: Option<String>,
    media: Option<Arc<M>>,
    replay: ReplayDetector,
    enforcer: PauseEnforcer,
    pause_requested: bool,
    guards: GuardLoop,
}

impl<M: MediaElement> TabObserver<M> {
    pub fn new(
        tab_id: impl Into<TabId>,
        config: &ObserverConfig,
        guards: Vec<Arc<dyn PageGuard>>,
    ) -> Self {
        Self {
            tab_id: tab_id.into(),
            threshold: config.completion_threshold,
            url: None,
            title: None,
            media: None,
            replay: ReplayDetector::new(config.replay_window),
            enforcer: PauseEnforcer::new(config.pause_interval),
            pause_requested: false,
            guards: GuardLoop::new(config.guard_interval, guards),
        }
    }

    pub fn tab_id(&self) -> TabId {
        self.tab_id
    }

    /// Attach to a media element. Returns the handshake to send to the coordinator.
    pub fn attach(&mut self, media: Arc<M>) -> Inbound {
        if self.media.is_some() {
            self.detach();
        }
        media.disable_loop();
        self.guards.start();
        if self.pause_requested {
            self.enforcer.start(media.clone());
        }
        self.media = Some(media);
        debug!(tab = %self.tab_id, "observer attached");
        Inbound::Handshake { tab_id: self.tab_id }
    }

    pub fn detach(&mut self) {
        if self.media.take().is_some() {
            self.guards.stop();
            self.enforcer.stop();
            debug!(tab = %self.tab_id, "observer detached");
        }
    }

    /// Page location or title changed. A new URL starts a fresh replay window.
    pub fn navigate(&mut self, url: impl Into<String>, title: Option<String>) {
        let url = url.into();
        if self.url.as_deref() != Some(url.as_str()) {
            self.replay.reset();
        }
        self.url = Some(url);
        if title.is_some() {
            self.title = title;
        }
    }

    /// Translate a media signal. `None` when no media element is attached.
    pub fn on_signal(&mut self, signal: MediaSignal) -> Option<VideoEvent> {
        let sample = self.media.as_ref()?.sample();
        let kind = match signal {
            MediaSignal::Play if self.replay.is_replay(sample.current_time) => EventKind::Replay,
            MediaSignal::Play => EventKind::StartedPlaying,
            MediaSignal::Pause => EventKind::Paused,
            MediaSignal::Ended => {
                self.replay.on_ended();
                EventKind::Ended
            }
            MediaSignal::TimeUpdate => EventKind::ProgressUpdate,
        };

        let mut event = VideoEvent::new(self.tab_id, kind)
            .with_playing(!sample.paused)
            .with_completed(sample.is_completed(self.threshold));
        event.url = self.url.clone();
        event.title = self.title.clone();
        Some(event)
    }

    /// Apply a coordinator message
    pub fn on_command(&mut self, message: ObserverMessage) {
        match message {
            ObserverMessage::ForcePause => {
                self.pause_requested = true;
                if let Some(media) = &self.media {
                    self.enforcer.start(media.clone());
                }
            }
            ObserverMessage::AllowPlay => {
                self.pause_requested = false;
                self.enforcer.stop();
                if let Some(media) = &self.media {
                    if media.sample().paused {
                        if let Err(e) = media.play() {
                            debug!(tab = %self.tab_id, "resume refused: {}", e);
                        }
                    }
                }
            }
        }
    }

    pub fn is_enforcing_pause(&self) -> bool {
        self.enforcer.is_enforcing()
    }

    pub fn guards_running(&self) -> bool {
        self.guards.is_running()
    }

    pub fn replay_detector(&self) -> &ReplayDetector {
        &self.replay
    }
}

impl<M: MediaElement> Drop for TabObserver<M> {
    fn drop(&mut self) {
        self.detach();
    }
}
