//! Timeline widget - state, configuration and the drag session type.
//!
//! Shared by the canvas renderer (`timeline_ui.rs`) and the pure helpers
//! (`timeline_helpers.rs`). UI interaction updates `TimelineState`
//! (zoom/scroll/drag/editor) and emits events; the app loop applies store
//! mutations and the canvas repaints from live store state while the
//! dirty flag is set.

use eframe::egui::Pos2;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

/// Fixed pixel sizes and interaction thresholds.
#[derive(Clone, Debug)]
pub struct TimelineConfig {
    pub tier_height: f32,
    pub ruler_height: f32,
    pub minimap_height: f32,
    pub name_column_width: f32,
    /// Hit radius around a marker's x position.
    pub marker_hit_px: f32,
    /// Edge tolerance for span-resize hits.
    pub edge_tolerance_px: f32,
    /// Merge-snap range for a dragged span edge.
    pub merge_snap_px: f32,
    /// Minimum drag extent for creating a span.
    pub min_span_drag_ms: i64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            tier_height: 48.0,
            ruler_height: 22.0,
            minimap_height: 18.0,
            name_column_width: 170.0,
            // Edge tolerance exceeds the marker radius so a span edge is
            // still grabbable just outside its anchor's hit circle.
            marker_hit_px: 8.0,
            edge_tolerance_px: 10.0,
            merge_snap_px: 8.0,
            min_span_drag_ms: 50,
        }
    }
}

/// Active drag session - one variant per gesture mode, each carrying only
/// the fields that mode needs. `None` in [`TimelineState::drag`] means idle.
#[derive(Clone, Debug)]
pub enum DragState {
    /// Ruler scrub: every pointer-move seeks the video.
    Scrub,
    /// Repositioning a single marker (bottom-half grab).
    MoveMarker {
        marker_id: Uuid,
        original_ms: i64,
        current_ms: i64,
        start_pos: Pos2,
    },
    /// Dragging a new second anchor out of an existing marker (top-half
    /// grab on a span-less marker).
    CreateSpan {
        source_marker_id: Uuid,
        tier_id: Uuid,
        source_ms: i64,
        current_ms: i64,
        start_pos: Pos2,
    },
    /// Drawing a fresh span on empty tier area.
    DrawSpan {
        tier_id: Uuid,
        anchor_ms: i64,
        current_ms: i64,
        start_pos: Pos2,
    },
    /// Dragging a whole span, preserving anchor separation.
    MoveSpan {
        span_id: Uuid,
        original_start_ms: i64,
        original_end_ms: i64,
        /// Pointer offset from the span start at grab time.
        grab_offset_ms: i64,
        current_start_ms: i64,
        start_pos: Pos2,
    },
    /// Dragging one span edge (its anchor marker).
    ResizeSpan {
        span_id: Uuid,
        marker_id: Uuid,
        original_ms: i64,
        current_ms: i64,
        /// Set while the edge is snapped onto this neighbor span's
        /// boundary - releasing commits a merge.
        merge_with: Option<Uuid>,
        start_pos: Pos2,
    },
}

/// A click waiting out the double-click grace period before committing
/// its single-click action.
#[derive(Clone, Debug)]
pub struct PendingClick {
    pub target: ClickTarget,
    pub at: Instant,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClickTarget {
    Marker(Uuid),
    Span(Uuid),
    Deselect,
}

/// Disambiguation popup state when several markers sit under the pointer.
#[derive(Clone, Debug)]
pub struct Disambiguation {
    pub candidates: Vec<Uuid>,
    pub at: Pos2,
}

/// Timeline view state (persistent between frames).
#[derive(Serialize, Deserialize)]
pub struct TimelineState {
    /// Zoom, in pixels per second.
    pub zoom_pps: f32,
    /// Current horizontal scroll in pixels (interpolated).
    pub scroll_px: f32,
    /// Scroll target the view eases toward each frame.
    pub scroll_target_px: f32,
    pub follow_playhead: bool,
    #[serde(skip)]
    pub drag: Option<DragState>,
    /// Span whose gloss is being edited inline.
    #[serde(skip)]
    pub editing_span: Option<Uuid>,
    #[serde(skip)]
    pub gloss_draft: String,
    #[serde(skip)]
    pub pending_click: Option<PendingClick>,
    #[serde(skip)]
    pub disambiguation: Option<Disambiguation>,
    /// Repaint requested: set by mutations/drags/scrubs, cleared after paint.
    #[serde(skip)]
    pub dirty: bool,
    /// Store revision seen at the last paint (mutation -> dirty).
    #[serde(skip)]
    pub seen_rev: u64,
    /// Recenter when the active video changes.
    #[serde(skip)]
    pub last_video: Option<Uuid>,
}

impl Default for TimelineState {
    fn default() -> Self {
        Self {
            zoom_pps: 80.0,
            scroll_px: 0.0,
            scroll_target_px: 0.0,
            follow_playhead: true,
            drag: None,
            editing_span: None,
            gloss_draft: String::new(),
            pending_click: None,
            disambiguation: None,
            dirty: true,
            seen_rev: 0,
            last_video: None,
        }
    }
}

impl TimelineState {
    /// Scroll-interpolation factor per frame.
    pub const SCROLL_LERP: f32 = 0.15;
    /// Convergence threshold in pixels.
    pub const SCROLL_EPSILON: f32 = 0.5;

    /// Ease the scroll position toward its target; keeps the dirty flag
    /// set until the interpolation converges.
    pub fn tick_scroll(&mut self) {
        let delta = self.scroll_target_px - self.scroll_px;
        if delta.abs() < Self::SCROLL_EPSILON {
            self.scroll_px = self.scroll_target_px;
            return;
        }
        self.scroll_px += delta * Self::SCROLL_LERP;
        self.dirty = true;
    }

    /// Request a repaint on the next frame.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Set the scroll target so `time_ms` lands in the middle of a
    /// `view_width`-wide viewport.
    pub fn center_on(&mut self, time_ms: i64, view_width: f32) {
        let x = time_ms as f32 / 1000.0 * self.zoom_pps;
        self.scroll_target_px = (x - view_width / 2.0).max(0.0);
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_lerp_converges_and_clears_motion() {
        let mut state = TimelineState::default();
        state.scroll_px = 0.0;
        state.scroll_target_px = 100.0;

        state.dirty = false;
        state.tick_scroll();
        assert!((state.scroll_px - 15.0).abs() < 1e-4);
        assert!(state.dirty);

        for _ in 0..200 {
            state.tick_scroll();
        }
        assert_eq!(state.scroll_px, 100.0);

        // Converged: ticking no longer sets dirty.
        state.dirty = false;
        state.tick_scroll();
        assert!(!state.dirty);
    }

    #[test]
    fn center_on_clamps_at_zero() {
        let mut state = TimelineState::default();
        state.zoom_pps = 100.0;
        state.center_on(500, 800.0);
        // 0.5s * 100pps = 50px, half the view is 400px -> clamped to 0.
        assert_eq!(state.scroll_target_px, 0.0);
        state.center_on(10_000, 800.0);
        assert_eq!(state.scroll_target_px, 600.0);
    }
}
