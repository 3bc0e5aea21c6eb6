use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use super::media::MediaElement;
use super::ticker::RepeatingTask;

/// Keeps a media element paused while the tab is denied the playback slot
#[derive(Debug)]
pub struct PauseEnforcer {
    task: RepeatingTask,
}

impl PauseEnforcer {
    pub fn new(interval: Duration) -> Self {
        Self {
            task: RepeatingTask::new(interval),
        }
    }

    /// Pause now and keep re-pausing every interval. No-op if already enforcing.
    pub fn start<M: MediaElement>(&mut self, media: Arc<M>) -> bool {
        if self.task.is_running() {
            return false;
        }
        if !media.sample().paused {
            media.pause();
        }
        debug!("pause enforcement started");
        self.task.start(move || {
            if !media.sample().paused {
                trace!("re-pausing media");
                media.pause();
            }
        })
    }

    pub fn stop(&mut self) -> bool {
        let stopped = self.task.stop();
        if stopped {
            debug!("pause enforcement stopped");
        }
        stopped
    }

    pub fn is_enforcing(&self) -> bool {
        self.task.is_running()
    }
}

/// Opaque periodic page fix-up, e.g. dismissing a "continue watching"
/// prompt or switching off an autoplay toggle
pub trait PageGuard: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn enforce(&self);
}

/// Runs every `PageGuard` once on start and then every interval
pub struct GuardLoop {
    guards: Arc<Vec<Arc<dyn PageGuard>>>,
    task: RepeatingTask,
}

impl GuardLoop {
    pub fn new(interval: Duration, guards: Vec<Arc<dyn PageGuard>>) -> Self {
        Self {
            guards: Arc::new(guards),
            task: RepeatingTask::new(interval),
        }
    }

    pub fn start(&mut self) -> bool {
        if self.guards.is_empty() || self.task.is_running() {
            return false;
        }
        run_guards(&self.guards);
        let guards = self.guards.clone();
        self.task.start(move || run_guards(&guards))
    }

    pub fn stop(&mut self) -> bool {
        self.task.stop()
    }

    pub fn is_running(&self) -> bool {
        self.task.is_running()
    }
}

fn run_guards(guards: &[Arc<dyn PageGuard>]) {
    for guard in guards {
        trace!(guard = guard.name(), "running page guard");
        guard.enforce();
    }
}
