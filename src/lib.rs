//! glossa - keyboard-driven video annotation for sign-language research.
//!
//! Re-exports all modules for use by the binary target.

// Core engine (annotation store, playback, keyboard machine, events)
pub mod core;

// App modules
pub mod app;
pub mod cli;
pub mod config;
pub mod help;
pub mod services;
pub mod widgets;

// Re-export commonly used types from core
pub use core::event_bus::{BoxedEvent, EventBus, downcast_event};
pub use core::hold_keys::HoldKeys;
pub use core::player::PlaybackController;
pub use core::registry::Registry;
pub use core::store::{AnnotationStore, Marker, Span};
