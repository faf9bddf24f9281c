//! Core engine modules - annotation data, playback, keyboard machine.
//!
//! Everything in here is UI-independent: the timeline widget and the app
//! loop read these through accessors and mutate them through methods or
//! dispatched events.

pub mod event_bus;
pub mod events;
pub mod hold_keys;
pub mod player;
pub mod registry;
pub mod store;

// Re-exports for convenience
pub use event_bus::{BoxedEvent, EventBus, downcast_event};
pub use hold_keys::HoldKeys;
pub use player::{FpsDetector, PlaybackController};
pub use registry::{MarkerCategory, MarkerType, Registry, Tier};
pub use store::{AnnotationStore, Marker, Span};
