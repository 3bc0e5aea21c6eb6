use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Fixed-period background task with explicit start/stop.
///
/// The first tick fires one period after `start`. Dropping the task stops it.
#[derive(Debug)]
pub struct RepeatingTask {
    period: Duration,
    handle: Option<JoinHandle<()>>,
}

impl RepeatingTask {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            handle: None,
        }
    }

    /// Start ticking. A task that is already running is left untouched and
    /// `false` is returned. Must be called inside a tokio runtime.
    pub fn start<F>(&mut self, mut tick: F) -> bool
    where
        F: FnMut() + Send + 'static,
    {
        if self.is_running() {
            return false;
        }
        let period = self.period;
        self.handle = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tick();
            }
        }));
        true
    }

    /// Stop ticking. Returns `false` if the task was not running.
    pub fn stop(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| !h.is_finished())
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        self.stop();
    }
}
