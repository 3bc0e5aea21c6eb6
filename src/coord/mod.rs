//! Tab playback coordination
//!
//! The `Arbiter` holds the single playback slot and the admission queue;
//! the `Coordinator` runs it as an event loop and ships its commands to a
//! `TabHost`.

pub mod types;
pub mod state;
pub mod arbiter;
pub mod host;
pub mod hooks;
pub mod coordinator;
pub mod wire;

pub use types::*;
pub use state::*;
pub use arbiter::*;
pub use host::*;
pub use hooks::*;
pub use coordinator::*;
pub use wire::{parse_line, HostCall};
