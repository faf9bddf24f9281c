//! Keyboard routing for GlossaApp.
//!
//! Two layers: the reserved discrete shortcuts (transport, navigation,
//! delete, undo) are handled here directly; every other single-character
//! key goes to the hold-key state machine, which decides between tap and
//! hold semantics. Callers skip this entirely while a text field has
//! focus.

use super::GlossaApp;
use crate::core::events::{NoticeEvent, SetLoopRegionEvent};
use crate::core::store::Span;
use eframe::egui::{self, Key, Modifiers};
use uuid::Uuid;

/// Plain-arrow nudge for the pending marker.
const NUDGE_SMALL_MS: i64 = 10;
/// Shift-arrow nudge for the selected/pending marker.
const NUDGE_LARGE_MS: i64 = 100;

pub fn handle_keyboard(app: &mut GlossaApp, ctx: &egui::Context) {
    let events = ctx.input(|i| i.events.clone());
    for event in events {
        let egui::Event::Key { key, pressed, repeat, modifiers, .. } = event else {
            continue;
        };
        if repeat {
            continue;
        }
        if pressed {
            key_pressed(app, key, modifiers);
        } else if let Some(ch) = type_key_char(key) {
            app.hold_keys
                .key_up(ch, &mut app.store, &app.registry, &mut app.player);
        }
    }
}

fn key_pressed(app: &mut GlossaApp, key: Key, modifiers: Modifiers) {
    let now_ms = app.player.current_time_ms();
    let duration_ms = app.player.duration_ms();

    match key {
        // Space: pause + place a marker while playing, else resume.
        Key::Space => {
            if app.player.is_playing() {
                app.player.pause();
                app.hold_keys
                    .playback_stopped(&mut app.store, &app.registry, &mut app.player);
                place_pending(app, now_ms);
            } else {
                app.player.play();
            }
        }
        // Ctrl+Enter finishes the video; plain Enter places a pending
        // marker and pauses.
        Key::Enter => {
            if modifiers.command {
                app.finish_current_video();
            } else {
                app.player.pause();
                app.store.cancel_pending_marker();
                place_pending(app, now_ms);
            }
        }
        Key::ArrowLeft | Key::ArrowRight => {
            let dir: i64 = if key == Key::ArrowRight { 1 } else { -1 };
            let target = app.store.pending_marker.or(app.store.selected_marker);
            if modifiers.shift {
                if let Some(id) = target {
                    app.store.nudge_marker(id, dir * NUDGE_LARGE_MS, duration_ms);
                }
            } else if modifiers.alt {
                if let Some(id) = target {
                    app.store.nudge_marker(id, dir * NUDGE_SMALL_MS, duration_ms);
                }
            } else if let Some(id) = app.store.pending_marker {
                app.store.nudge_marker(id, dir * NUDGE_SMALL_MS, duration_ms);
            } else {
                app.player.frame_step(dir as i32);
            }
            app.timeline_state.mark_dirty();
        }
        Key::Delete | Key::Backspace => {
            if let Some(span_id) = app.store.selected_span {
                app.event_bus
                    .emit(crate::core::events::DeleteSpanEvent(span_id));
            } else if let Some(marker_id) = app.store.selected_marker {
                app.event_bus
                    .emit(crate::core::events::DeleteMarkerEvent(marker_id));
            }
        }
        Key::Backtick => cycle_tier(app),
        Key::OpenBracket => {
            app.player.cycle_rate(-1);
        }
        Key::CloseBracket => {
            app.player.cycle_rate(1);
        }
        Key::Z if modifiers.command => {
            // Cancel any live drag before time-traveling; the drag reads
            // marker state that is about to be replaced.
            app.timeline_state.drag = None;
            let ok = if modifiers.shift {
                app.store.redo()
            } else {
                app.store.undo()
            };
            if !ok {
                app.event_bus.emit(NoticeEvent("Nothing to undo".into()));
            }
        }
        Key::Y if modifiers.command => {
            app.timeline_state.drag = None;
            if !app.store.redo() {
                app.event_bus.emit(NoticeEvent("Nothing to redo".into()));
            }
        }
        // Loop playback over the selected span; press again to stop.
        Key::L if modifiers.command => {
            if app.player.loop_enabled {
                app.event_bus.emit(SetLoopRegionEvent(None));
                app.event_bus.emit(NoticeEvent("Loop off".into()));
            } else if let Some(span_id) = app.store.selected_span
                && let Some(span) = app.store.span(span_id)
                && let Some((start, end)) = app.store.span_interval(span)
            {
                app.event_bus.emit(SetLoopRegionEvent(Some((start, end))));
                app.player.seek_ms(start);
                app.player.play();
                app.event_bus.emit(NoticeEvent("Looping selected span".into()));
            }
        }
        Key::N => select_adjacent_marker(app, if modifiers.shift { -1 } else { 1 }),
        Key::G => span_to_next_marker(app),
        Key::F1 => app.show_help = !app.show_help,
        Key::Plus | Key::Equals => {
            app.timeline_state.zoom_pps = (app.timeline_state.zoom_pps * 1.25).min(2000.0);
            app.timeline_state.mark_dirty();
        }
        Key::Minus => {
            app.timeline_state.zoom_pps = (app.timeline_state.zoom_pps * 0.8).max(4.0);
            app.timeline_state.mark_dirty();
        }
        _ => {
            if modifiers.command || modifiers.alt {
                return;
            }
            if let Some(ch) = type_key_char(key) {
                app.hold_keys
                    .key_down(ch, &mut app.store, &app.registry, &mut app.player);
            }
        }
    }
}

/// Marker-type candidate keys: plain letters and digits. Reserved keys
/// (`n`, `g`, and modified combos) are intercepted before this point.
fn type_key_char(key: Key) -> Option<char> {
    let name = key.name();
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphanumeric() => Some(c.to_ascii_lowercase()),
        _ => None,
    }
}

fn place_pending(app: &mut GlossaApp, now_ms: i64) {
    let Some(video_id) = app.player.video_id() else {
        return;
    };
    let Some(tier) = app.registry.active_tier() else {
        return;
    };
    app.store.place_marker(now_ms, tier.id, video_id);
}

/// Backtick: cycle the active tier, dragging the pending marker along
/// when the new tier is eligible for it.
fn cycle_tier(app: &mut GlossaApp) {
    if let Some(new_tier) = app.registry.cycle_active_tier() {
        if let Some(pending) = app.store.pending_marker {
            app.store.update_marker_tier(pending, new_tier);
        }
        app.timeline_state.mark_dirty();
    }
}

/// `n` / `N`: select the next/previous confirmed marker in time order
/// relative to the playhead and seek to it.
fn select_adjacent_marker(app: &mut GlossaApp, dir: i64) {
    let Some(video_id) = app.player.video_id() else {
        return;
    };
    let now_ms = app.player.current_time_ms();
    let sorted = app.store.confirmed_sorted(video_id);
    let target = if dir > 0 {
        sorted.iter().find(|m| m.time_ms > now_ms)
    } else {
        sorted.iter().rev().find(|m| m.time_ms < now_ms)
    };
    if let Some(marker) = target {
        let (id, t) = (marker.id, marker.time_ms);
        app.store.selected_marker = Some(id);
        app.store.selected_span = None;
        app.player.seek_ms(t);
        app.timeline_state.mark_dirty();
    }
}

/// `g`: span from the selected marker to the next confirmed marker on its
/// tier - or open the existing span's gloss editor if that pair is
/// already spanned.
fn span_to_next_marker(app: &mut GlossaApp) {
    let Some(selected) = app.store.selected_marker else {
        return;
    };
    let Some(marker) = app.store.marker(selected).cloned() else {
        return;
    };
    let next: Option<Uuid> = app
        .store
        .tier_markers(marker.tier_id, marker.video_id)
        .filter(|m| m.confirmed && m.time_ms > marker.time_ms)
        .min_by_key(|m| m.time_ms)
        .map(|m| m.id);
    let Some(next) = next else {
        app.event_bus
            .emit(NoticeEvent("No later marker on this tier".into()));
        return;
    };

    if let Some(existing) = app.store.span_between(selected, next) {
        let id = existing.id;
        let gloss = existing.gloss.clone();
        app.store.selected_span = Some(id);
        app.timeline_state.editing_span = Some(id);
        app.timeline_state.gloss_draft = gloss;
        app.timeline_state.mark_dirty();
        return;
    }

    let span = Span {
        id: Uuid::new_v4(),
        start_marker_id: selected,
        end_marker_id: next,
        tier_id: marker.tier_id,
        video_id: marker.video_id,
        gloss: String::new(),
    };
    let span_id = span.id;
    if app.store.add_span(span) {
        app.store.selected_span = Some(span_id);
        app.store.selected_marker = None;
        app.timeline_state.editing_span = Some(span_id);
        app.timeline_state.gloss_draft = String::new();
        app.timeline_state.mark_dirty();
    } else {
        app.event_bus
            .emit(NoticeEvent("Span rejected - would overlap another span".into()));
    }
}
