//! Core domain types shared across modules.

pub mod device;
pub mod events;

pub use device::{LinkedDevice, Platform};
pub use events::{Event, EventHandler};
