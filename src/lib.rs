//! tabgate - one video tab plays at a time
//!
//! Tabs report playback events; the coordinator keeps a single playback
//! slot, queues every tab that has started playing, closes tabs that finish
//! or try to replay, and hands the slot to the next unfinished tab in
//! arrival order.

// Core infrastructure modules
pub mod core;

pub mod coord;     // Arbitration state machine and event loop
pub mod observer;  // Reference per-tab observer

// Re-exports for convenience
pub use crate::core::errors::{Result, TabgateError};
pub use crate::core::config::{CoordinatorConfig, CoordinatorConfigBuilder, ObserverConfig};
pub use coord::{
    Arbiter, ArbiterSnapshot, CommandOutcome, Coordinator, CoordinatorHandle, CoordinatorHook,
    EventKind, HostCall, HostError, Inbound, LifecycleNotice, NavigationPhase, ObserverMessage,
    TabCommand, TabHost, TabId, TabPhase, VideoEvent,
};
