//! Annotation timeline - canvas rendering and pointer gestures.
//!
//! One widget paints everything each frame from live store state: ruler,
//! tier rows, markers (shape-coded by category), spans with gloss labels,
//! drag previews, merge highlight, minimap and playhead.
//!
//! # Interactions
//!
//! - **Ruler drag**: scrub the video
//! - **Marker, top half**: resize its span / drag out a new span
//! - **Marker, bottom half**: move the marker
//! - **Span edge**: resize (with merge-snap onto a neighbor boundary)
//! - **Span body**: move the whole span
//! - **Empty tier**: draw a new span
//! - **Minimap**: click to recenter
//!
//! Data flow: egui input → `DragState` in `TimelineState` → commit events
//! through `dispatch(BoxedEvent)` on release → app loop mutates the store.
//! The widget itself never writes annotation data.

use super::timeline_helpers::{
    CanvasGeom, Hit, classify_hit, color_from_hex, draw_marker_glyph, format_clock, merge_snap,
    ordered_anchor_ids, px_to_ms, resize_bounds, ruler_step_ms, time_to_x, x_to_time,
};
use super::{ClickTarget, Disambiguation, DragState, PendingClick, TimelineConfig, TimelineState};
use crate::core::event_bus::BoxedEvent;
use crate::core::events::{
    DeselectEvent, GlossChangedEvent, MarkerMovedEvent, SeekEvent, SelectMarkerEvent,
    SelectSpanEvent, SpanDrawnEvent, SpanFromMarkerEvent, SpanMovedEvent, SpanResizedEvent,
};
use crate::core::player::PlaybackController;
use crate::core::registry::{MarkerCategory, Registry};
use crate::core::store::AnnotationStore;
use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Sense, Stroke, Ui, Vec2};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Grace period before a single click commits, leaving room for a
/// double-click to be recognized instead.
const CLICK_GRACE: Duration = Duration::from_millis(280);

const PLAYHEAD_COLOR: Color32 = Color32::from_rgb(255, 220, 100);
const MERGE_COLOR: Color32 = Color32::from_rgb(120, 220, 140);
const GHOST_COLOR: Color32 = Color32::from_rgba_premultiplied(90, 180, 230, 160);

/// Interaction result for input routing.
pub struct TimelineActions {
    pub hovered: bool,
}

/// Left column: tier names with visibility/lock toggles and the active
/// tier cursor. Mutates the registry directly - tier metadata is not
/// annotation data and stays out of undo history.
pub fn render_tier_column(
    ui: &mut Ui,
    reg: &mut Registry,
    config: &TimelineConfig,
    state: &mut TimelineState,
) {
    ui.add_space(config.ruler_height);
    let tier_ids: Vec<Uuid> = reg.tiers().filter(|t| t.visible).map(|t| t.id).collect();
    for tier_id in tier_ids {
        let (rect, response) = ui.allocate_exact_size(
            Vec2::new(config.name_column_width, config.tier_height),
            Sense::click(),
        );
        let Some(tier) = reg.tier(tier_id) else { continue };
        let is_active = reg.active_tier_id() == Some(tier_id);
        let accent = color_from_hex(&tier.color);

        let bg = if is_active {
            Color32::from_gray(48)
        } else {
            Color32::from_gray(34)
        };
        ui.painter().rect_filled(rect, 2.0, bg);
        ui.painter().rect_filled(
            Rect::from_min_max(rect.min, Pos2::new(rect.min.x + 4.0, rect.max.y)),
            0.0,
            accent,
        );
        let label = if tier.locked {
            format!("🔒 {}", tier.name)
        } else {
            tier.name.clone()
        };
        ui.painter().text(
            Pos2::new(rect.min.x + 10.0, rect.center().y),
            Align2::LEFT_CENTER,
            label,
            FontId::proportional(13.0),
            if is_active { Color32::WHITE } else { Color32::from_gray(190) },
        );

        if response.clicked() {
            reg.set_active_tier(tier_id);
            state.mark_dirty();
        }
        response.context_menu(|ui| {
            if let Some(tier) = reg.tier_mut(tier_id) {
                if ui.checkbox(&mut tier.locked, "Locked").changed() {
                    state.mark_dirty();
                }
                let mut visible = tier.visible;
                if ui.checkbox(&mut visible, "Visible").changed() {
                    tier.visible = visible;
                    state.mark_dirty();
                    ui.close();
                }
            }
        });
    }
}

/// Right side: the annotation canvas.
#[allow(clippy::too_many_arguments)]
pub fn render_canvas(
    ui: &mut Ui,
    store: &AnnotationStore,
    reg: &Registry,
    player: &PlaybackController,
    video_id: Uuid,
    config: &TimelineConfig,
    state: &mut TimelineState,
    mut dispatch: impl FnMut(BoxedEvent),
) -> TimelineActions {
    let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
    let canvas = response.rect;
    let visible_tiers: Vec<Uuid> = reg.tiers().filter(|t| t.visible).map(|t| t.id).collect();
    let geom = CanvasGeom::layout(canvas, &visible_tiers, config);
    let origin = geom.tiers_rect.min.x;
    let duration_ms = player.duration_ms();

    // Recenter when the active video changes.
    if state.last_video != Some(video_id) {
        state.last_video = Some(video_id);
        state.scroll_px = 0.0;
        state.scroll_target_px = 0.0;
        state.drag = None;
        state.editing_span = None;
        state.mark_dirty();
    }

    handle_wheel(ui, &response, canvas, state);

    // ========== Drag start: classify the press origin into a mode ==========
    // A click that never crosses egui's drag threshold stays a click and is
    // handled below - which also means a real drag never doubles as one.
    if response.drag_started() && state.drag.is_none() {
        let press = ui
            .input(|i| i.pointer.press_origin())
            .or_else(|| response.interact_pointer_pos());
        if let Some(pos) = press {
            begin_drag(pos, &geom, store, reg, video_id, config, state, player, &mut dispatch);
        }
    }

    // ========== Active drag: track, preview, commit on release ==========
    if state.drag.is_some() {
        process_drag(ui, &geom, store, player, video_id, config, state, &mut dispatch);
        state.mark_dirty();
    } else {
        handle_clicks(&response, &geom, store, reg, player, video_id, config, state, &mut dispatch);
    }

    // Expire the pending single click once the double-click window closed.
    if let Some(pending) = &state.pending_click
        && pending.at.elapsed() > CLICK_GRACE
    {
        match pending.target {
            ClickTarget::Marker(id) => dispatch(Box::new(SelectMarkerEvent(id))),
            ClickTarget::Span(id) => dispatch(Box::new(SelectSpanEvent(id))),
            ClickTarget::Deselect => dispatch(Box::new(DeselectEvent)),
        }
        state.pending_click = None;
        state.mark_dirty();
    }

    // ========== Auto-follow playhead during playback ==========
    if player.is_playing() && state.follow_playhead && state.drag.is_none() {
        let playhead_x = time_to_x(player.current_time_ms(), origin, state);
        let margin = canvas.width() * 0.15;
        if playhead_x > canvas.max.x - margin || playhead_x < canvas.min.x {
            state.center_on(player.current_time_ms(), canvas.width());
        }
    }
    state.tick_scroll();

    // ========== Paint ==========
    painter.rect_filled(canvas, 0.0, Color32::from_gray(24));
    draw_tier_rows(&painter, &geom, store, reg, video_id, config, state);
    draw_ruler(&painter, &geom, state, duration_ms);
    draw_drag_preview(&painter, &geom, store, state);
    draw_minimap(&painter, &geom, store, video_id, duration_ms, state, canvas.width());
    draw_playhead(&painter, &geom, player, state);

    gloss_editor(ui, &geom, store, state, &mut dispatch);
    disambiguation_popup(ui, store, reg, state, &mut dispatch);

    TimelineActions {
        hovered: response.hovered() || response.dragged(),
    }
}

// ========== Input ==========

fn handle_wheel(ui: &Ui, response: &egui::Response, canvas: Rect, state: &mut TimelineState) {
    if !response.hovered() {
        return;
    }
    let scroll = ui.input(|i| i.smooth_scroll_delta);
    let pointer = ui.input(|i| i.pointer.hover_pos());

    if scroll.y.abs() > 0.0
        && let Some(pos) = pointer
    {
        // Zoom about the cursor: keep the time under the pointer fixed.
        let old_zoom = state.zoom_pps;
        let new_zoom = (old_zoom * (1.0 + scroll.y * 0.002)).clamp(4.0, 2000.0);
        if (new_zoom - old_zoom).abs() > f32::EPSILON {
            let rel = pos.x - canvas.min.x + state.scroll_px;
            let t = rel / old_zoom;
            state.zoom_pps = new_zoom;
            state.scroll_px = (t * new_zoom - (pos.x - canvas.min.x)).max(0.0);
            state.scroll_target_px = state.scroll_px;
            state.mark_dirty();
        }
    }
    if scroll.x.abs() > 0.0 {
        state.scroll_target_px = (state.scroll_target_px - scroll.x).max(0.0);
        state.mark_dirty();
    }
}

#[allow(clippy::too_many_arguments)]
fn begin_drag(
    pos: Pos2,
    geom: &CanvasGeom,
    store: &AnnotationStore,
    reg: &Registry,
    video_id: Uuid,
    config: &TimelineConfig,
    state: &mut TimelineState,
    player: &PlaybackController,
    dispatch: &mut impl FnMut(BoxedEvent),
) {
    let origin = geom.tiers_rect.min.x;
    match classify_hit(pos, geom, store, reg, video_id, config, state) {
        Hit::Ruler => {
            state.drag = Some(DragState::Scrub);
            let t = x_to_time(pos.x, origin, state).min(player.duration_ms());
            dispatch(Box::new(SeekEvent(t)));
        }
        Hit::MarkerTop(ids) => {
            if ids.len() > 1 {
                state.disambiguation = Some(Disambiguation { candidates: ids, at: pos });
                return;
            }
            let marker_id = ids[0];
            let Some(marker) = store.marker(marker_id) else { return };
            // Anchors an existing span: resize that edge. Otherwise the
            // drag defines a new second anchor.
            if let Some(span) = store.spans_of_marker(marker_id).next() {
                state.drag = Some(DragState::ResizeSpan {
                    span_id: span.id,
                    marker_id,
                    original_ms: marker.time_ms,
                    current_ms: marker.time_ms,
                    merge_with: None,
                    start_pos: pos,
                });
            } else {
                state.drag = Some(DragState::CreateSpan {
                    source_marker_id: marker_id,
                    tier_id: marker.tier_id,
                    source_ms: marker.time_ms,
                    current_ms: marker.time_ms,
                    start_pos: pos,
                });
            }
        }
        Hit::MarkerBottom(ids) => {
            if ids.len() > 1 {
                state.disambiguation = Some(Disambiguation { candidates: ids, at: pos });
                return;
            }
            let Some(marker) = store.marker(ids[0]) else { return };
            state.drag = Some(DragState::MoveMarker {
                marker_id: ids[0],
                original_ms: marker.time_ms,
                current_ms: marker.time_ms,
                start_pos: pos,
            });
        }
        Hit::SpanEdge { span_id, marker_id } => {
            let Some(marker) = store.marker(marker_id) else { return };
            state.drag = Some(DragState::ResizeSpan {
                span_id,
                marker_id,
                original_ms: marker.time_ms,
                current_ms: marker.time_ms,
                merge_with: None,
                start_pos: pos,
            });
        }
        Hit::SpanBody { span_id } => {
            let Some(span) = store.span(span_id) else { return };
            let Some((start, end)) = store.span_interval(span) else { return };
            let grab = x_to_time(pos.x, origin, state);
            state.drag = Some(DragState::MoveSpan {
                span_id,
                original_start_ms: start,
                original_end_ms: end,
                grab_offset_ms: grab - start,
                current_start_ms: start,
                start_pos: pos,
            });
        }
        Hit::EmptyTier { tier_id } => {
            let t = x_to_time(pos.x, origin, state).min(player.duration_ms());
            state.drag = Some(DragState::DrawSpan {
                tier_id,
                anchor_ms: t,
                current_ms: t,
                start_pos: pos,
            });
        }
        Hit::Minimap => {
            // Click-to-recenter; no drag session.
            let frac = ((pos.x - geom.minimap_rect.min.x) / geom.minimap_rect.width())
                .clamp(0.0, 1.0);
            let t = (frac as f64 * player.duration_ms() as f64) as i64;
            state.center_on(t, geom.tiers_rect.width());
        }
        Hit::None => {}
    }
    if state.drag.is_some() {
        state.mark_dirty();
    }
}

#[allow(clippy::too_many_arguments)]
fn process_drag(
    ui: &Ui,
    geom: &CanvasGeom,
    store: &AnnotationStore,
    player: &PlaybackController,
    video_id: Uuid,
    config: &TimelineConfig,
    state: &mut TimelineState,
    dispatch: &mut impl FnMut(BoxedEvent),
) {
    let origin = geom.tiers_rect.min.x;
    let duration_ms = player.duration_ms();
    // latest_pos keeps tracking even when the pointer leaves the window.
    let Some(pos) = ui.input(|i| i.pointer.latest_pos()) else {
        return;
    };
    let released = ui.input(|i| i.pointer.any_released());
    let Some(drag) = state.drag.clone() else { return };

    match drag {
        DragState::Scrub => {
            let t = x_to_time(pos.x, origin, state).min(duration_ms);
            dispatch(Box::new(SeekEvent(t)));
            ui.ctx().set_cursor_icon(egui::CursorIcon::ResizeHorizontal);
            if released {
                state.drag = None;
            }
        }
        DragState::MoveMarker { marker_id, original_ms, start_pos, .. } => {
            let t = x_to_time(pos.x, origin, state).min(duration_ms);
            dispatch(Box::new(SeekEvent(t)));
            ui.ctx().set_cursor_icon(egui::CursorIcon::Grabbing);
            state.drag = Some(DragState::MoveMarker {
                marker_id,
                original_ms,
                current_ms: t,
                start_pos,
            });
            if released {
                if t != original_ms {
                    dispatch(Box::new(MarkerMovedEvent { marker_id, time_ms: t }));
                }
                state.drag = None;
            }
        }
        DragState::CreateSpan { source_marker_id, tier_id, source_ms, start_pos, .. } => {
            let t = x_to_time(pos.x, origin, state).min(duration_ms);
            dispatch(Box::new(SeekEvent(t)));
            state.drag = Some(DragState::CreateSpan {
                source_marker_id,
                tier_id,
                source_ms,
                current_ms: t,
                start_pos,
            });
            if released {
                if (t - source_ms).abs() >= config.min_span_drag_ms {
                    dispatch(Box::new(SpanFromMarkerEvent {
                        source_marker_id,
                        release_ms: t,
                    }));
                }
                state.drag = None;
            }
        }
        DragState::DrawSpan { tier_id, anchor_ms, start_pos, .. } => {
            let t = x_to_time(pos.x, origin, state).min(duration_ms);
            dispatch(Box::new(SeekEvent(t)));
            state.drag = Some(DragState::DrawSpan {
                tier_id,
                anchor_ms,
                current_ms: t,
                start_pos,
            });
            if released {
                if (t - anchor_ms).abs() >= config.min_span_drag_ms {
                    dispatch(Box::new(SpanDrawnEvent {
                        tier_id,
                        start_ms: anchor_ms.min(t),
                        end_ms: anchor_ms.max(t),
                    }));
                }
                state.drag = None;
            }
        }
        DragState::MoveSpan {
            span_id,
            original_start_ms,
            original_end_ms,
            grab_offset_ms,
            start_pos,
            ..
        } => {
            let len = original_end_ms - original_start_ms;
            let raw = x_to_time(pos.x, origin, state) - grab_offset_ms;
            let start = raw.clamp(0, (duration_ms - len).max(0));
            // Displayed time tracks the interval midpoint while moving.
            dispatch(Box::new(SeekEvent(start + len / 2)));
            ui.ctx().set_cursor_icon(egui::CursorIcon::Grabbing);
            state.drag = Some(DragState::MoveSpan {
                span_id,
                original_start_ms,
                original_end_ms,
                grab_offset_ms,
                current_start_ms: start,
                start_pos,
            });
            if released {
                if start != original_start_ms {
                    dispatch(Box::new(SpanMovedEvent {
                        span_id,
                        start_ms: start,
                        end_ms: start + len,
                    }));
                }
                state.drag = None;
            }
        }
        DragState::ResizeSpan { span_id, marker_id, original_ms, start_pos, .. } => {
            let proposed = x_to_time(pos.x, origin, state).min(duration_ms);
            let Some(span) = store.span(span_id) else {
                state.drag = None;
                return;
            };
            let tolerance_ms = px_to_ms(config.merge_snap_px, state);
            let snapped = merge_snap(store, span_id, span.tier_id, video_id, proposed, tolerance_ms);
            let (current, merge_with) = match snapped {
                Some((other, boundary)) => (boundary, Some(other)),
                None => {
                    let (lo, hi) = resize_bounds(store, span_id, marker_id, duration_ms);
                    (proposed.clamp(lo, hi), None)
                }
            };
            dispatch(Box::new(SeekEvent(current)));
            ui.ctx().set_cursor_icon(egui::CursorIcon::ResizeHorizontal);
            state.drag = Some(DragState::ResizeSpan {
                span_id,
                marker_id,
                original_ms,
                current_ms: current,
                merge_with,
                start_pos,
            });
            if released {
                if current != original_ms || merge_with.is_some() {
                    dispatch(Box::new(SpanResizedEvent {
                        marker_id,
                        time_ms: current,
                        merge: merge_with.map(|other| (span_id, other)),
                    }));
                }
                state.drag = None;
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_clicks(
    response: &egui::Response,
    geom: &CanvasGeom,
    store: &AnnotationStore,
    reg: &Registry,
    player: &PlaybackController,
    video_id: Uuid,
    config: &TimelineConfig,
    state: &mut TimelineState,
    dispatch: &mut impl FnMut(BoxedEvent),
) {
    let Some(pos) = response.interact_pointer_pos() else {
        return;
    };
    let origin = geom.tiers_rect.min.x;
    let double = response.double_clicked();
    if !response.clicked() && !double {
        return;
    }

    match classify_hit(pos, geom, store, reg, video_id, config, state) {
        Hit::MarkerTop(ids) | Hit::MarkerBottom(ids) => {
            if ids.len() > 1 {
                state.disambiguation = Some(Disambiguation { candidates: ids, at: pos });
            } else if double {
                state.pending_click = None;
                dispatch(Box::new(SelectMarkerEvent(ids[0])));
            } else {
                state.pending_click = Some(PendingClick {
                    target: ClickTarget::Marker(ids[0]),
                    at: Instant::now(),
                });
            }
        }
        Hit::SpanEdge { span_id, .. } | Hit::SpanBody { span_id } => {
            if double {
                // Open the gloss editor instead of selecting.
                state.pending_click = None;
                dispatch(Box::new(SelectSpanEvent(span_id)));
                state.editing_span = Some(span_id);
                state.gloss_draft = store
                    .span(span_id)
                    .map(|s| s.gloss.clone())
                    .unwrap_or_default();
            } else {
                state.pending_click = Some(PendingClick {
                    target: ClickTarget::Span(span_id),
                    at: Instant::now(),
                });
            }
        }
        Hit::EmptyTier { .. } | Hit::None => {
            if double {
                // Double-click on empty space seeks without deselecting.
                state.pending_click = None;
                dispatch(Box::new(SeekEvent(
                    x_to_time(pos.x, origin, state).min(player.duration_ms()),
                )));
            } else {
                state.pending_click = Some(PendingClick {
                    target: ClickTarget::Deselect,
                    at: Instant::now(),
                });
            }
        }
        Hit::Ruler => {
            dispatch(Box::new(SeekEvent(
                x_to_time(pos.x, origin, state).min(player.duration_ms()),
            )));
        }
        Hit::Minimap => {
            let frac = ((pos.x - geom.minimap_rect.min.x) / geom.minimap_rect.width())
                .clamp(0.0, 1.0);
            let t = (frac as f64 * player.duration_ms() as f64) as i64;
            state.center_on(t, geom.tiers_rect.width());
        }
    }
    state.mark_dirty();
}

// ========== Painting ==========

fn draw_tier_rows(
    painter: &egui::Painter,
    geom: &CanvasGeom,
    store: &AnnotationStore,
    reg: &Registry,
    video_id: Uuid,
    config: &TimelineConfig,
    state: &TimelineState,
) {
    let origin = geom.tiers_rect.min.x;
    for (idx, (tier_id, row)) in geom.tier_rows.iter().enumerate() {
        let bg = if idx % 2 == 0 {
            Color32::from_gray(30)
        } else {
            Color32::from_gray(35)
        };
        painter.rect_filled(*row, 0.0, bg);
        if reg.tier(*tier_id).map(|t| t.locked).unwrap_or(false) {
            painter.rect_filled(*row, 0.0, Color32::from_rgba_premultiplied(0, 0, 0, 60));
        }

        // Span lane (top half).
        let merge_partner = match &state.drag {
            Some(DragState::ResizeSpan { span_id, merge_with: Some(other), .. }) => {
                Some((*span_id, *other))
            }
            _ => None,
        };
        for span in store.tier_spans(*tier_id, video_id) {
            let Some((start, end)) = store.span_interval(span) else { continue };
            let x1 = time_to_x(start, origin, state);
            let x2 = time_to_x(end, origin, state);
            if x2 < row.min.x || x1 > row.max.x {
                continue;
            }
            let bar = Rect::from_min_max(
                Pos2::new(x1, row.min.y + 3.0),
                Pos2::new(x2, row.center().y - 1.0),
            );
            let selected = store.selected_span == Some(span.id);
            let in_merge = merge_partner
                .map(|(a, b)| span.id == a || span.id == b)
                .unwrap_or(false);
            let fill = if in_merge {
                MERGE_COLOR
            } else {
                let tier_color = reg
                    .tier(*tier_id)
                    .map(|t| color_from_hex(&t.color))
                    .unwrap_or(Color32::from_gray(90));
                tier_color.gamma_multiply(if selected { 1.0 } else { 0.7 })
            };
            painter.rect(
                bar,
                3.0,
                fill,
                Stroke::new(
                    if selected { 2.0 } else { 1.0 },
                    if selected { Color32::WHITE } else { Color32::from_gray(140) },
                ),
                egui::epaint::StrokeKind::Middle,
            );
            if !span.gloss.is_empty() && bar.width() > 24.0 {
                painter.text(
                    bar.center(),
                    Align2::CENTER_CENTER,
                    &span.gloss,
                    FontId::proportional(11.0),
                    Color32::WHITE,
                );
            }
        }

        // Marker lane (bottom half).
        let marker_y = row.center().y + config.tier_height * 0.22;
        for marker in store.tier_markers(*tier_id, video_id) {
            let x = time_to_x(marker.time_ms, origin, state);
            if x < row.min.x - 8.0 || x > row.max.x + 8.0 {
                continue;
            }
            painter.line_segment(
                [Pos2::new(x, row.min.y), Pos2::new(x, row.max.y)],
                Stroke::new(1.0, Color32::from_gray(60)),
            );
            let (category, color) = marker
                .type_id
                .and_then(|t| reg.marker_type(t))
                .map(|t| (t.category, color_from_hex(&t.color)))
                .unwrap_or((MarkerCategory::Custom, Color32::from_gray(170)));
            let selected = store.selected_marker == Some(marker.id);
            let pending = store.pending_marker == Some(marker.id);
            let fill = if pending { Color32::from_gray(220) } else { color };
            draw_marker_glyph(painter, Pos2::new(x, marker_y), category, fill, selected || pending);
        }
    }
}

fn draw_ruler(painter: &egui::Painter, geom: &CanvasGeom, state: &TimelineState, duration_ms: i64) {
    let rect = geom.ruler_rect;
    painter.rect_filled(rect, 0.0, Color32::from_gray(20));
    let origin = geom.tiers_rect.min.x;
    let step = ruler_step_ms(state.zoom_pps);

    let first_visible = x_to_time(rect.min.x, origin, state) / step * step;
    let last_visible = x_to_time(rect.max.x, origin, state).min(duration_ms.max(0));
    let mut t = first_visible;
    while t <= last_visible {
        let x = time_to_x(t, origin, state);
        if x >= rect.min.x && x <= rect.max.x {
            painter.line_segment(
                [Pos2::new(x, rect.max.y - 5.0), Pos2::new(x, rect.max.y)],
                Stroke::new(1.0, Color32::from_gray(100)),
            );
            painter.text(
                Pos2::new(x + 3.0, rect.min.y + 2.0),
                Align2::LEFT_TOP,
                format_clock(t, false),
                FontId::monospace(9.0),
                Color32::from_gray(150),
            );
        }
        t += step;
    }

    // Out-of-media region beyond the duration.
    let end_x = time_to_x(duration_ms, origin, state);
    if end_x < rect.max.x {
        painter.rect_filled(
            Rect::from_min_max(Pos2::new(end_x.max(rect.min.x), rect.min.y), rect.max),
            0.0,
            Color32::from_rgba_premultiplied(0, 0, 0, 80),
        );
    }
}

fn draw_drag_preview(
    painter: &egui::Painter,
    geom: &CanvasGeom,
    store: &AnnotationStore,
    state: &TimelineState,
) {
    let origin = geom.tiers_rect.min.x;
    let ghost_bar = |tier_id: Uuid, a: i64, b: i64| {
        let Some(row) = geom.row_of(tier_id) else { return };
        let rect = Rect::from_min_max(
            Pos2::new(time_to_x(a.min(b), origin, state), row.min.y + 3.0),
            Pos2::new(time_to_x(a.max(b), origin, state), row.center().y - 1.0),
        );
        painter.rect_stroke(rect, 3.0, Stroke::new(2.0, GHOST_COLOR), egui::epaint::StrokeKind::Middle);
    };

    match &state.drag {
        Some(DragState::CreateSpan { tier_id, source_ms, current_ms, .. }) => {
            ghost_bar(*tier_id, *source_ms, *current_ms);
        }
        Some(DragState::DrawSpan { tier_id, anchor_ms, current_ms, .. }) => {
            ghost_bar(*tier_id, *anchor_ms, *current_ms);
        }
        Some(DragState::MoveSpan { span_id, original_start_ms, original_end_ms, current_start_ms, .. }) => {
            if let Some(span) = store.span(*span_id) {
                let len = original_end_ms - original_start_ms;
                ghost_bar(span.tier_id, *current_start_ms, *current_start_ms + len);
            }
        }
        Some(DragState::ResizeSpan { span_id, marker_id, current_ms, .. }) => {
            if let Some(span) = store.span(*span_id) {
                let (early, late) = ordered_anchor_ids(store, *span_id);
                let fixed = if *marker_id == early { late } else { early };
                if let Some(fixed_ms) = store.marker(fixed).map(|m| m.time_ms) {
                    ghost_bar(span.tier_id, fixed_ms, *current_ms);
                }
            }
        }
        Some(DragState::MoveMarker { marker_id, current_ms, .. }) => {
            if let Some(marker) = store.marker(*marker_id)
                && let Some(row) = geom.row_of(marker.tier_id)
            {
                let x = time_to_x(*current_ms, origin, state);
                painter.line_segment(
                    [Pos2::new(x, row.min.y), Pos2::new(x, row.max.y)],
                    Stroke::new(2.0, GHOST_COLOR),
                );
            }
        }
        _ => {}
    }
}

fn draw_minimap(
    painter: &egui::Painter,
    geom: &CanvasGeom,
    store: &AnnotationStore,
    video_id: Uuid,
    duration_ms: i64,
    state: &TimelineState,
    view_width: f32,
) {
    let rect = geom.minimap_rect;
    painter.rect_filled(rect, 0.0, Color32::from_gray(18));
    if duration_ms <= 0 {
        return;
    }
    let scale = rect.width() / duration_ms as f32;

    for span in store.spans().iter().filter(|s| s.video_id == video_id) {
        let Some((a, b)) = store.span_interval(span) else { continue };
        let r = Rect::from_min_max(
            Pos2::new(rect.min.x + a as f32 * scale, rect.min.y + 4.0),
            Pos2::new(rect.min.x + (b as f32 * scale).max(a as f32 * scale + 1.0), rect.max.y - 4.0),
        );
        painter.rect_filled(r, 1.0, Color32::from_gray(110));
    }

    // Viewport window.
    let ms_per_px = 1000.0 / state.zoom_pps;
    let win_start = state.scroll_px * ms_per_px;
    let win_len = view_width * ms_per_px;
    let win = Rect::from_min_max(
        Pos2::new(rect.min.x + win_start * scale, rect.min.y),
        Pos2::new(
            (rect.min.x + (win_start + win_len) * scale).min(rect.max.x),
            rect.max.y,
        ),
    );
    painter.rect_stroke(win, 2.0, Stroke::new(1.0, Color32::from_gray(180)), egui::epaint::StrokeKind::Middle);
}

fn draw_playhead(
    painter: &egui::Painter,
    geom: &CanvasGeom,
    player: &PlaybackController,
    state: &TimelineState,
) {
    let origin = geom.tiers_rect.min.x;
    let x = time_to_x(player.current_time_ms(), origin, state);
    if x < geom.ruler_rect.min.x || x > geom.ruler_rect.max.x {
        return;
    }
    painter.line_segment(
        [
            Pos2::new(x, geom.ruler_rect.min.y),
            Pos2::new(x, geom.minimap_rect.min.y),
        ],
        Stroke::new(2.0, PLAYHEAD_COLOR),
    );
    let top_y = geom.ruler_rect.min.y;
    let s = 6.0;
    painter.add(egui::Shape::convex_polygon(
        vec![
            Pos2::new(x - s, top_y),
            Pos2::new(x + s, top_y),
            Pos2::new(x, top_y + s + 2.0),
        ],
        PLAYHEAD_COLOR,
        Stroke::NONE,
    ));
}

// ========== Overlays ==========

fn gloss_editor(
    ui: &Ui,
    geom: &CanvasGeom,
    store: &AnnotationStore,
    state: &mut TimelineState,
    dispatch: &mut impl FnMut(BoxedEvent),
) {
    let Some(span_id) = state.editing_span else { return };
    let Some(span) = store.span(span_id) else {
        state.editing_span = None;
        return;
    };
    let Some((start, end)) = store.span_interval(span) else {
        state.editing_span = None;
        return;
    };
    let origin = geom.tiers_rect.min.x;
    let row = geom.row_of(span.tier_id).unwrap_or(geom.tiers_rect);
    let x = time_to_x((start + end) / 2, origin, state);
    let pos = Pos2::new(x - 70.0, row.min.y + 2.0);

    let mut commit = false;
    let mut cancel = false;
    egui::Area::new(egui::Id::new("gloss_editor"))
        .fixed_pos(pos)
        .order(egui::Order::Foreground)
        .show(ui.ctx(), |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                let edit = ui.add(
                    egui::TextEdit::singleline(&mut state.gloss_draft)
                        .hint_text("gloss")
                        .desired_width(140.0),
                );
                edit.request_focus();
                if ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    commit = true;
                }
                if ui.input(|i| i.key_pressed(egui::Key::Escape)) {
                    cancel = true;
                }
            });
        });
    if commit {
        dispatch(Box::new(GlossChangedEvent {
            span_id,
            gloss: state.gloss_draft.trim().to_string(),
        }));
        state.editing_span = None;
        state.mark_dirty();
    } else if cancel {
        state.editing_span = None;
        state.mark_dirty();
    }
}

fn disambiguation_popup(
    ui: &Ui,
    store: &AnnotationStore,
    reg: &Registry,
    state: &mut TimelineState,
    dispatch: &mut impl FnMut(BoxedEvent),
) {
    let Some(disambig) = state.disambiguation.clone() else { return };
    let mut close = false;
    egui::Area::new(egui::Id::new("marker_disambiguation"))
        .fixed_pos(disambig.at)
        .order(egui::Order::Foreground)
        .show(ui.ctx(), |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                ui.label("Several markers here:");
                for id in &disambig.candidates {
                    let Some(marker) = store.marker(*id) else { continue };
                    let type_name = marker
                        .type_id
                        .and_then(|t| reg.marker_type(t))
                        .map(|t| t.name.clone())
                        .unwrap_or_else(|| "unconfirmed".into());
                    let label = format!(
                        "{} @ {}",
                        type_name,
                        format_clock(marker.time_ms, true)
                    );
                    if ui.button(label).clicked() {
                        dispatch(Box::new(SelectMarkerEvent(*id)));
                        close = true;
                    }
                }
                if ui.button("Cancel").clicked() {
                    close = true;
                }
            });
        });
    if close {
        state.disambiguation = None;
        state.mark_dirty();
    }
}
