//! Application events dispatched by widgets and drained in the app loop.
//!
//! One struct per event, `Clone + Debug`, payload only - handlers live in
//! `app/events.rs`. Gesture commits carry everything the handler needs so
//! the widget never touches the stores directly.

use uuid::Uuid;

// === Transport ===

/// Seek the active video (milliseconds, clamped by the player).
#[derive(Clone, Debug)]
pub struct SeekEvent(pub i64);

#[derive(Clone, Debug)]
pub struct TogglePlayEvent;

/// Cycle the playback-rate ladder by +-1 step.
#[derive(Clone, Debug)]
pub struct CycleRateEvent(pub i32);

/// Step +-1 frame at the detected (or fallback) fps.
#[derive(Clone, Debug)]
pub struct FrameStepEvent(pub i32);

/// Set or clear the loop region, in milliseconds.
#[derive(Clone, Debug)]
pub struct SetLoopRegionEvent(pub Option<(i64, i64)>);

// === Selection ===

#[derive(Clone, Debug)]
pub struct SelectMarkerEvent(pub Uuid);

#[derive(Clone, Debug)]
pub struct SelectSpanEvent(pub Uuid);

#[derive(Clone, Debug)]
pub struct DeselectEvent;

// === Gesture commits ===

/// Move-marker drag released: commit the new time.
#[derive(Clone, Debug)]
pub struct MarkerMovedEvent {
    pub marker_id: Uuid,
    pub time_ms: i64,
}

/// Resize drag released: commit the edge's marker time, then merge if the
/// edge was snapped onto a neighbor at release.
#[derive(Clone, Debug)]
pub struct SpanResizedEvent {
    pub marker_id: Uuid,
    pub time_ms: i64,
    /// `(keep_span, remove_span)` when a merge-snap was active.
    pub merge: Option<(Uuid, Uuid)>,
}

/// Move-span drag released: commit both anchors' absolute positions.
#[derive(Clone, Debug)]
pub struct SpanMovedEvent {
    pub span_id: Uuid,
    pub start_ms: i64,
    pub end_ms: i64,
}

/// Create-span drag released: second anchor at the release point, span in
/// chronological order, gloss editor opened.
#[derive(Clone, Debug)]
pub struct SpanFromMarkerEvent {
    pub source_marker_id: Uuid,
    pub release_ms: i64,
}

/// Draw-span drag released on empty tier area: two fresh markers + a span.
#[derive(Clone, Debug)]
pub struct SpanDrawnEvent {
    pub tier_id: Uuid,
    pub start_ms: i64,
    pub end_ms: i64,
}

// === Annotation edits ===

#[derive(Clone, Debug)]
pub struct GlossChangedEvent {
    pub span_id: Uuid,
    pub gloss: String,
}

/// Remove a span together with both anchor markers (keyboard delete).
#[derive(Clone, Debug)]
pub struct DeleteSpanEvent(pub Uuid);

#[derive(Clone, Debug)]
pub struct DeleteMarkerEvent(pub Uuid);

// === Videos ===

/// Make a video the active one (timeline + playback target).
#[derive(Clone, Debug)]
pub struct ActivateVideoEvent(pub Uuid);

/// Drop every marker and span of one video.
#[derive(Clone, Debug)]
pub struct ClearVideoAnnotationsEvent(pub Uuid);

// === Notices ===

/// Transient status-bar message.
#[derive(Clone, Debug)]
pub struct NoticeEvent(pub String);
