//! Event-bus drain for GlossaApp.
//!
//! Polls the queue once per frame and applies each event as one atomic
//! store/player mutation. Validation failures become status-bar notices
//! here; the stores themselves stay silent.

use super::GlossaApp;
use crate::core::event_bus::downcast_event;
use crate::core::events::*;
use crate::core::store::Span;
use uuid::Uuid;

pub fn drain(app: &mut GlossaApp) {
    for event in app.event_bus.poll() {
        // === Transport ===
        if let Some(e) = downcast_event::<SeekEvent>(&event) {
            app.player.seek_ms(e.0);
            app.timeline_state.mark_dirty();
            continue;
        }
        if downcast_event::<TogglePlayEvent>(&event).is_some() {
            app.player.toggle_play();
            continue;
        }
        if let Some(e) = downcast_event::<CycleRateEvent>(&event) {
            app.player.cycle_rate(e.0);
            continue;
        }
        if let Some(e) = downcast_event::<FrameStepEvent>(&event) {
            app.player.frame_step(e.0);
            app.timeline_state.mark_dirty();
            continue;
        }
        if let Some(e) = downcast_event::<SetLoopRegionEvent>(&event) {
            match e.0 {
                Some((start, end)) => {
                    app.player.loop_start_s = Some(start as f64 / 1000.0);
                    app.player.loop_end_s = Some(end as f64 / 1000.0);
                    app.player.loop_enabled = true;
                }
                None => {
                    app.player.loop_start_s = None;
                    app.player.loop_end_s = None;
                    app.player.loop_enabled = false;
                }
            }
            continue;
        }

        // === Selection ===
        if let Some(e) = downcast_event::<SelectMarkerEvent>(&event) {
            app.store.selected_marker = Some(e.0);
            app.store.selected_span = None;
            app.timeline_state.mark_dirty();
            continue;
        }
        if let Some(e) = downcast_event::<SelectSpanEvent>(&event) {
            app.store.selected_span = Some(e.0);
            app.store.selected_marker = None;
            app.timeline_state.mark_dirty();
            continue;
        }
        if downcast_event::<DeselectEvent>(&event).is_some() {
            app.store.selected_marker = None;
            app.store.selected_span = None;
            app.timeline_state.mark_dirty();
            continue;
        }

        // === Gesture commits ===
        if let Some(e) = downcast_event::<MarkerMovedEvent>(&event) {
            app.store.update_marker_time(e.marker_id, e.time_ms);
            continue;
        }
        if let Some(e) = downcast_event::<SpanResizedEvent>(&event) {
            app.store.update_marker_time(e.marker_id, e.time_ms);
            if let Some((keep, remove)) = e.merge
                && !app.store.merge_spans(keep, remove)
            {
                app.status_bar.notify("Merge rejected - would overlap another span");
            }
            continue;
        }
        if let Some(e) = downcast_event::<SpanMovedEvent>(&event) {
            commit_span_move(app, e.span_id, e.start_ms, e.end_ms);
            continue;
        }
        if let Some(e) = downcast_event::<SpanFromMarkerEvent>(&event) {
            span_from_marker(app, e.source_marker_id, e.release_ms);
            continue;
        }
        if let Some(e) = downcast_event::<SpanDrawnEvent>(&event) {
            draw_span(app, e.tier_id, e.start_ms, e.end_ms);
            continue;
        }

        // === Annotation edits ===
        if let Some(e) = downcast_event::<GlossChangedEvent>(&event) {
            app.store.set_gloss(e.span_id, e.gloss.clone());
            continue;
        }
        if let Some(e) = downcast_event::<DeleteSpanEvent>(&event) {
            if app.store.remove_span_with_markers(e.0) {
                app.status_bar.notify("Span deleted - Ctrl+Z to undo");
            }
            continue;
        }
        if let Some(e) = downcast_event::<DeleteMarkerEvent>(&event) {
            if app.store.remove_marker(e.0) {
                app.status_bar.notify("Marker deleted - Ctrl+Z to undo");
            }
            continue;
        }

        // === Videos / notices ===
        if let Some(e) = downcast_event::<ActivateVideoEvent>(&event) {
            app.activate_video(e.0);
            continue;
        }
        if let Some(e) = downcast_event::<ClearVideoAnnotationsEvent>(&event) {
            app.store.clear_video_annotations(e.0);
            app.status_bar.notify("All annotations cleared - Ctrl+Z to undo");
            continue;
        }
        if let Some(e) = downcast_event::<NoticeEvent>(&event) {
            app.status_bar.notify(e.0.clone());
            continue;
        }
    }
}

/// Move both anchors to their new absolute positions, earlier anchor to
/// the new start.
fn commit_span_move(app: &mut GlossaApp, span_id: Uuid, start_ms: i64, end_ms: i64) {
    let Some(span) = app.store.span(span_id).cloned() else {
        return;
    };
    let (sa, sb) = (span.start_marker_id, span.end_marker_id);
    let (ta, tb) = (
        app.store.marker(sa).map(|m| m.time_ms).unwrap_or(0),
        app.store.marker(sb).map(|m| m.time_ms).unwrap_or(0),
    );
    let (early, late) = if ta <= tb { (sa, sb) } else { (sb, sa) };
    app.store.update_marker_time(early, start_ms);
    app.store.update_marker_time(late, end_ms);
}

/// Create-span drag released: second anchor at the release point, span in
/// chronological order, straight into gloss editing.
fn span_from_marker(app: &mut GlossaApp, source_id: Uuid, release_ms: i64) {
    let Some(source) = app.store.marker(source_id).cloned() else {
        return;
    };
    // The source may itself be the pending marker; stash the pending flag
    // so placing the second anchor cannot displace it.
    let stashed_pending = app.store.pending_marker.take();
    let second = app.store.place_marker(release_ms, source.tier_id, source.video_id);
    app.store.pending_marker = stashed_pending;
    if source.confirmed
        && let Some(type_id) = source.type_id
    {
        app.store.confirm_marker(second, type_id);
    }

    let (start, end) = if source.time_ms <= release_ms {
        (source_id, second)
    } else {
        (second, source_id)
    };
    let span = Span {
        id: Uuid::new_v4(),
        start_marker_id: start,
        end_marker_id: end,
        tier_id: source.tier_id,
        video_id: source.video_id,
        gloss: String::new(),
    };
    let span_id = span.id;
    if app.store.add_span(span) {
        app.store.selected_span = Some(span_id);
        app.store.selected_marker = None;
        app.timeline_state.editing_span = Some(span_id);
        app.timeline_state.gloss_draft = String::new();
    } else {
        app.store.remove_marker(second);
        app.status_bar.notify("Span rejected - would overlap another span");
    }
}

/// Draw-span released on empty tier area: two fresh unconfirmed anchors.
fn draw_span(app: &mut GlossaApp, tier_id: Uuid, start_ms: i64, end_ms: i64) {
    let Some(video_id) = app.player.video_id() else {
        return;
    };
    let stashed_pending = app.store.pending_marker.take();
    let a = app.store.place_marker(start_ms, tier_id, video_id);
    app.store.pending_marker = None;
    let b = app.store.place_marker(end_ms, tier_id, video_id);
    app.store.pending_marker = stashed_pending;

    let span = Span {
        id: Uuid::new_v4(),
        start_marker_id: a,
        end_marker_id: b,
        tier_id,
        video_id,
        gloss: String::new(),
    };
    let span_id = span.id;
    if app.store.add_span(span) {
        app.store.selected_span = Some(span_id);
        app.store.selected_marker = None;
    } else {
        app.store.remove_marker(a);
        app.store.remove_marker(b);
        app.status_bar.notify("Span rejected - would overlap another span");
    }
}
