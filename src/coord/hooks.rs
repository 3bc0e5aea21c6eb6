//! Hooks observing the coordinator
//!
//! Hooks see every inbound message and every command the arbiter issues.
//! They cannot mutate coordination state.

use std::sync::Arc;

use super::types::{Inbound, TabCommand};

/// Observer of coordinator traffic
pub trait CoordinatorHook: Send + Sync {
    /// Called after an inbound message was applied, with the resulting commands
    fn on_inbound(&self, inbound: &Inbound, commands: &[TabCommand]);

    /// Optional: called when a message was dropped as malformed
    fn on_malformed(&self, _reason: &str) {}

    /// Optional: called once when the coordinator loop exits
    fn on_shutdown(&self) {}
}

/// Composite hook that chains multiple hooks
#[derive(Default)]
pub struct CompositeHook {
    hooks: Vec<Arc<dyn CoordinatorHook>>,
}

impl CompositeHook {
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    pub fn add_hook(&mut self, hook: Arc<dyn CoordinatorHook>) {
        self.hooks.push(hook);
    }
}

impl CoordinatorHook for CompositeHook {
    fn on_inbound(&self, inbound: &Inbound, commands: &[TabCommand]) {
        for hook in &self.hooks {
            hook.on_inbound(inbound, commands);
        }
    }

    fn on_malformed(&self, reason: &str) {
        for hook in &self.hooks {
            hook.on_malformed(reason);
        }
    }

    fn on_shutdown(&self) {
        for hook in &self.hooks {
            hook.on_shutdown();
        }
    }
}

/// Logging hook
pub struct LoggingHook;

impl CoordinatorHook for LoggingHook {
    fn on_inbound(&self, inbound: &Inbound, commands: &[TabCommand]) {
        match inbound {
            Inbound::Video(event) => {
                tracing::debug!(
                    "Event {} from {} -> {:?}",
                    event.kind.as_str(),
                    event.tab_id,
                    commands
                );
            }
            Inbound::Lifecycle(notice) => {
                tracing::debug!("Lifecycle {:?} -> {:?}", notice, commands);
            }
            Inbound::Handshake { tab_id } => {
                tracing::debug!("Handshake from {}", tab_id);
            }
        }
    }

    fn on_malformed(&self, reason: &str) {
        tracing::warn!("Dropped malformed message: {}", reason);
    }

    fn on_shutdown(&self) {
        tracing::info!("Coordinator stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::types::{EventKind, TabId, VideoEvent};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        inbound: AtomicUsize,
        commands: AtomicUsize,
        malformed: AtomicUsize,
    }

    impl CoordinatorHook for Counting {
        fn on_inbound(&self, _inbound: &Inbound, commands: &[TabCommand]) {
            self.inbound.fetch_add(1, Ordering::SeqCst);
            self.commands.fetch_add(commands.len(), Ordering::SeqCst);
        }

        fn on_malformed(&self, _reason: &str) {
            self.malformed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_composite_fans_out() {
        let a = Arc::new(Counting::default());
        let b = Arc::new(Counting::default());
        let mut composite = CompositeHook::new();
        composite.add_hook(a.clone());
        composite.add_hook(b.clone());
        composite.add_hook(Arc::new(LoggingHook));

        let inbound = Inbound::Video(VideoEvent::new(1, EventKind::StartedPlaying));
        composite.on_inbound(&inbound, &[TabCommand::AllowPlay { tab_id: TabId(1) }]);
        composite.on_malformed("missing type");

        for hook in [&a, &b] {
            assert_eq!(hook.inbound.load(Ordering::SeqCst), 1);
            assert_eq!(hook.commands.load(Ordering::SeqCst), 1);
            assert_eq!(hook.malformed.load(Ordering::SeqCst), 1);
        }
    }
}
