//! Reference implementation of the per-tab observer
//!
//! The coordinator treats the observer as a black box that reports
//! `VideoEvent`s and obeys `ObserverMessage`s. This module provides one
//! built on two small traits, `MediaElement` and `PageGuard`, so the
//! collaborator contract can be exercised without a browser.

pub mod media;
pub mod ticker;
pub mod enforcer;
pub mod tab_observer;

pub use media::{MediaElement, MediaError, PlaybackSample};
pub use ticker::RepeatingTask;
pub use enforcer::{GuardLoop, PageGuard, PauseEnforcer};
pub use tab_observer::{MediaSignal, ReplayDetector, TabObserver};
