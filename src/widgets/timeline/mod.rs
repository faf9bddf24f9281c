//! Annotation timeline widget - multi-tier marker/span canvas.
//!
//! `timeline.rs` holds state and the drag-session sum type,
//! `timeline_helpers.rs` the pure hit-test/geometry routines,
//! `timeline_ui.rs` the per-frame paint + gesture handling.

mod timeline;
pub mod timeline_helpers;
mod timeline_ui;

pub use timeline::{
    ClickTarget, Disambiguation, DragState, PendingClick, TimelineConfig, TimelineState,
};
pub use timeline_ui::{TimelineActions, render_canvas, render_tier_column};
