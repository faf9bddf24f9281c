//! Timeline UI helpers: hit classification, math and drawing utilities.
//!
//! Everything here is pure with respect to the UI - functions take
//! positions, rects and read-only store state, and return classifications
//! or coordinates. The canvas renderer calls these; the tests exercise the
//! gesture rules without an egui context.

use crate::core::registry::{MarkerCategory, Registry};
use crate::core::store::AnnotationStore;
use eframe::egui::{self, Color32, Pos2, Rect, Stroke};
use uuid::Uuid;

use super::{TimelineConfig, TimelineState};

/// Per-frame canvas layout: the bands and one row rect per visible tier.
#[derive(Clone, Debug)]
pub struct CanvasGeom {
    pub ruler_rect: Rect,
    pub tiers_rect: Rect,
    pub minimap_rect: Rect,
    /// Visible tiers in display order.
    pub tier_rows: Vec<(Uuid, Rect)>,
}

impl CanvasGeom {
    /// Slice the widget rect into ruler / tier rows / minimap bands.
    pub fn layout(
        canvas: Rect,
        visible_tiers: &[Uuid],
        config: &TimelineConfig,
    ) -> Self {
        let ruler_rect = Rect::from_min_max(
            canvas.min,
            Pos2::new(canvas.max.x, canvas.min.y + config.ruler_height),
        );
        let minimap_rect = Rect::from_min_max(
            Pos2::new(canvas.min.x, canvas.max.y - config.minimap_height),
            canvas.max,
        );
        let tiers_rect = Rect::from_min_max(
            Pos2::new(canvas.min.x, ruler_rect.max.y),
            Pos2::new(canvas.max.x, minimap_rect.min.y),
        );
        let tier_rows = visible_tiers
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let y = tiers_rect.min.y + i as f32 * config.tier_height;
                (
                    *id,
                    Rect::from_min_max(
                        Pos2::new(tiers_rect.min.x, y),
                        Pos2::new(tiers_rect.max.x, y + config.tier_height),
                    ),
                )
            })
            .collect();
        Self {
            ruler_rect,
            tiers_rect,
            minimap_rect,
            tier_rows,
        }
    }

    pub fn row_of(&self, tier_id: Uuid) -> Option<Rect> {
        self.tier_rows
            .iter()
            .find(|(id, _)| *id == tier_id)
            .map(|(_, r)| *r)
    }
}

// ========== Coordinate mapping ==========

pub fn time_to_x(time_ms: i64, origin_x: f32, state: &TimelineState) -> f32 {
    origin_x + time_ms as f32 / 1000.0 * state.zoom_pps - state.scroll_px
}

pub fn x_to_time(x: f32, origin_x: f32, state: &TimelineState) -> i64 {
    (((x - origin_x + state.scroll_px) / state.zoom_pps) * 1000.0).round().max(0.0) as i64
}

/// Pixel distance expressed in milliseconds at the current zoom.
pub fn px_to_ms(px: f32, state: &TimelineState) -> i64 {
    (px / state.zoom_pps * 1000.0).round() as i64
}

// ========== Pointer-down classification ==========

/// What a pointer-down landed on, in hit-test priority order.
#[derive(Clone, Debug, PartialEq)]
pub enum Hit {
    Ruler,
    /// Top half of a marker's row: boundary-adjust gesture
    /// (resize if the marker anchors a span, create-span otherwise).
    MarkerTop(Vec<Uuid>),
    /// Bottom half: move the marker alone.
    MarkerBottom(Vec<Uuid>),
    /// Within edge tolerance of a span boundary; `marker_id` is the anchor
    /// at that edge.
    SpanEdge { span_id: Uuid, marker_id: Uuid },
    SpanBody { span_id: Uuid },
    /// Empty area of an unlocked tier row.
    EmptyTier { tier_id: Uuid },
    Minimap,
    None,
}

/// Classify a pointer-down position. Priority: ruler, marker, span edge,
/// span body, empty tier, minimap.
pub fn classify_hit(
    pos: Pos2,
    geom: &CanvasGeom,
    store: &AnnotationStore,
    reg: &Registry,
    video_id: Uuid,
    config: &TimelineConfig,
    state: &TimelineState,
) -> Hit {
    if geom.ruler_rect.contains(pos) {
        return Hit::Ruler;
    }

    if let Some((tier_id, row)) = geom
        .tier_rows
        .iter()
        .find(|(_, r)| r.contains(pos))
        .copied()
    {
        let origin = geom.tiers_rect.min.x;

        // Markers first: nearest-x candidates within the hit radius.
        let mut candidates: Vec<(f32, Uuid)> = store
            .tier_markers(tier_id, video_id)
            .filter_map(|m| {
                let dx = (time_to_x(m.time_ms, origin, state) - pos.x).abs();
                (dx <= config.marker_hit_px).then_some((dx, m.id))
            })
            .collect();
        if !candidates.is_empty() {
            candidates.sort_by(|a, b| a.0.total_cmp(&b.0));
            let ids: Vec<Uuid> = candidates.into_iter().map(|(_, id)| id).collect();
            return if pos.y < row.center().y {
                Hit::MarkerTop(ids)
            } else {
                Hit::MarkerBottom(ids)
            };
        }

        // Then spans: edges within tolerance, else the body.
        for span in store.tier_spans(tier_id, video_id) {
            let Some((start, end)) = store.span_interval(span) else {
                continue;
            };
            let x1 = time_to_x(start, origin, state);
            let x2 = time_to_x(end, origin, state);
            if pos.x < x1 - config.edge_tolerance_px || pos.x > x2 + config.edge_tolerance_px {
                continue;
            }
            let (early, late) = ordered_anchor_ids(store, span.id);
            if (pos.x - x1).abs() <= config.edge_tolerance_px {
                return Hit::SpanEdge {
                    span_id: span.id,
                    marker_id: early,
                };
            }
            if (pos.x - x2).abs() <= config.edge_tolerance_px {
                return Hit::SpanEdge {
                    span_id: span.id,
                    marker_id: late,
                };
            }
            return Hit::SpanBody { span_id: span.id };
        }

        let locked = reg.tier(tier_id).map(|t| t.locked).unwrap_or(true);
        if !locked {
            return Hit::EmptyTier { tier_id };
        }
        return Hit::None;
    }

    if geom.minimap_rect.contains(pos) {
        return Hit::Minimap;
    }
    Hit::None
}

/// (earlier, later) anchor ids of a span by current marker times.
pub fn ordered_anchor_ids(store: &AnnotationStore, span_id: Uuid) -> (Uuid, Uuid) {
    let Some(span) = store.span(span_id) else {
        return (Uuid::nil(), Uuid::nil());
    };
    let (sa, sb) = (span.start_marker_id, span.end_marker_id);
    let ta = store.marker(sa).map(|m| m.time_ms).unwrap_or(i64::MAX);
    let tb = store.marker(sb).map(|m| m.time_ms).unwrap_or(i64::MAX);
    if ta <= tb { (sa, sb) } else { (sb, sa) }
}

// ========== Resize constraints ==========

/// Tightest legal range for a span edge being dragged: the edge cannot
/// cross the span's own opposite boundary nor invert through any other
/// span on the tier.
pub fn resize_bounds(
    store: &AnnotationStore,
    span_id: Uuid,
    moving_marker_id: Uuid,
    max_ms: i64,
) -> (i64, i64) {
    let Some(span) = store.span(span_id) else {
        return (0, max_ms);
    };
    let other_id = if span.start_marker_id == moving_marker_id {
        span.end_marker_id
    } else {
        span.start_marker_id
    };
    let Some(other_ms) = store.marker(other_id).map(|m| m.time_ms) else {
        return (0, max_ms);
    };
    let Some(moving_ms) = store.marker(moving_marker_id).map(|m| m.time_ms) else {
        return (0, max_ms);
    };

    let neighbors: Vec<(i64, i64)> = store
        .tier_spans(span.tier_id, span.video_id)
        .filter(|s| s.id != span_id)
        .filter_map(|s| store.span_interval(s))
        .collect();

    if moving_ms >= other_ms {
        // Later edge: bounded below by the opposite anchor, above by the
        // nearest span start to the right.
        let upper = neighbors
            .iter()
            .map(|(s, _)| *s)
            .filter(|s| *s >= other_ms)
            .min()
            .unwrap_or(max_ms)
            .min(max_ms);
        (other_ms, upper)
    } else {
        // Earlier edge: bounded above by the opposite anchor, below by the
        // nearest span end to the left.
        let lower = neighbors
            .iter()
            .map(|(_, e)| *e)
            .filter(|e| *e <= other_ms)
            .max()
            .unwrap_or(0);
        (lower, other_ms)
    }
}

/// Merge-snap detection: if `proposed_ms` lies within `tolerance_ms` of a
/// neighbor span's boundary, return that span and the exact boundary time.
pub fn merge_snap(
    store: &AnnotationStore,
    span_id: Uuid,
    tier_id: Uuid,
    video_id: Uuid,
    proposed_ms: i64,
    tolerance_ms: i64,
) -> Option<(Uuid, i64)> {
    store
        .tier_spans(tier_id, video_id)
        .filter(|s| s.id != span_id)
        .filter_map(|s| store.span_interval(s).map(|(a, b)| (s.id, a, b)))
        .flat_map(|(id, a, b)| [(id, a), (id, b)])
        .map(|(id, t)| (id, t, (t - proposed_ms).abs()))
        .filter(|(_, _, d)| *d <= tolerance_ms)
        .min_by_key(|(_, _, d)| *d)
        .map(|(id, t, _)| (id, t))
}

// ========== Drawing ==========

pub fn color_from_hex(hex: &str) -> Color32 {
    let s = hex.trim_start_matches('#');
    if s.len() != 6 {
        return Color32::from_gray(150);
    }
    let parse = |r: &str| u8::from_str_radix(r, 16).unwrap_or(128);
    Color32::from_rgb(parse(&s[0..2]), parse(&s[2..4]), parse(&s[4..6]))
}

/// Shape-coded marker glyph: boundary = triangle, phase = diamond,
/// feature = circle, custom = square.
pub fn draw_marker_glyph(
    painter: &egui::Painter,
    center: Pos2,
    category: MarkerCategory,
    fill: Color32,
    outlined: bool,
) {
    let r = 5.0;
    let stroke = if outlined {
        Stroke::new(1.5, Color32::WHITE)
    } else {
        Stroke::new(1.0, Color32::from_gray(30))
    };
    match category {
        MarkerCategory::Boundary => {
            let points = vec![
                Pos2::new(center.x, center.y - r),
                Pos2::new(center.x + r, center.y + r),
                Pos2::new(center.x - r, center.y + r),
            ];
            painter.add(egui::Shape::convex_polygon(points, fill, stroke));
        }
        MarkerCategory::Phase => {
            let points = vec![
                Pos2::new(center.x, center.y - r),
                Pos2::new(center.x + r, center.y),
                Pos2::new(center.x, center.y + r),
                Pos2::new(center.x - r, center.y),
            ];
            painter.add(egui::Shape::convex_polygon(points, fill, stroke));
        }
        MarkerCategory::Feature => {
            painter.circle(center, r - 0.5, fill, stroke);
        }
        MarkerCategory::Custom => {
            let rect = Rect::from_center_size(center, egui::vec2(2.0 * r - 1.0, 2.0 * r - 1.0));
            painter.rect(rect, 1.0, fill, stroke, egui::epaint::StrokeKind::Middle);
        }
    }
}

/// Adaptive ruler tick spacing in milliseconds for the current zoom.
pub fn ruler_step_ms(zoom_pps: f32) -> i64 {
    const LADDER: &[i64] = &[100, 250, 500, 1000, 2000, 5000, 10_000, 30_000, 60_000];
    const MIN_TICK_PX: f32 = 70.0;
    LADDER
        .iter()
        .copied()
        .find(|step| *step as f32 / 1000.0 * zoom_pps >= MIN_TICK_PX)
        .unwrap_or(60_000)
}

/// `m:ss` / `m:ss.mmm` clock formatting.
pub fn format_clock(ms: i64, with_millis: bool) -> String {
    let total_s = ms / 1000;
    let (m, s) = (total_s / 60, total_s % 60);
    if with_millis {
        format!("{}:{:02}.{:03}", m, s, ms % 1000)
    } else {
        format!("{}:{:02}", m, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::Span;

    fn state() -> TimelineState {
        TimelineState {
            zoom_pps: 100.0,
            scroll_px: 0.0,
            scroll_target_px: 0.0,
            ..Default::default()
        }
    }

    fn add_confirmed(store: &mut AnnotationStore, t: i64, tier: Uuid, video: Uuid) -> Uuid {
        let id = store.place_marker(t, tier, video);
        store.confirm_marker(id, Uuid::new_v4());
        id
    }

    fn add_span(store: &mut AnnotationStore, a: Uuid, b: Uuid, tier: Uuid, video: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        assert!(store.add_span(Span {
            id,
            start_marker_id: a,
            end_marker_id: b,
            tier_id: tier,
            video_id: video,
            gloss: String::new(),
        }));
        id
    }

    #[test]
    fn coordinate_roundtrip() {
        let st = state();
        let x = time_to_x(2500, 10.0, &st);
        assert_eq!(x, 10.0 + 250.0);
        assert_eq!(x_to_time(x, 10.0, &st), 2500);
        // Negative x clamps to zero time.
        assert_eq!(x_to_time(-500.0, 10.0, &st), 0);
    }

    #[test]
    fn classify_priority_marker_beats_span() {
        let mut store = AnnotationStore::new();
        let mut reg = Registry::new();
        let t = reg.add_type("sign-start", "Sign start", 's', "#3FB950", MarkerCategory::Boundary);
        let tier = reg.add_tier("Tier", vec![t], "#2D5A88");
        let video = Uuid::new_v4();
        let config = TimelineConfig::default();
        let st = state();

        let a = add_confirmed(&mut store, 1000, tier, video);
        let b = add_confirmed(&mut store, 2000, tier, video);
        add_span(&mut store, a, b, tier, video);

        let geom = CanvasGeom::layout(
            Rect::from_min_max(Pos2::new(0.0, 0.0), Pos2::new(800.0, 300.0)),
            &[tier],
            &config,
        );
        let row = geom.row_of(tier).unwrap();

        // On the marker at x=100 (1000ms * 100pps), bottom half.
        let hit = classify_hit(
            Pos2::new(100.0, row.max.y - 5.0),
            &geom,
            &store,
            &reg,
            video,
            &config,
            &st,
        );
        assert_eq!(hit, Hit::MarkerBottom(vec![a]));

        // Top half of the same point is the boundary-adjust gesture.
        let hit = classify_hit(
            Pos2::new(100.0, row.min.y + 5.0),
            &geom,
            &store,
            &reg,
            video,
            &config,
            &st,
        );
        assert_eq!(hit, Hit::MarkerTop(vec![a]));

        // Mid-span, away from markers and edges: the span body.
        let hit = classify_hit(
            Pos2::new(150.0, row.center().y),
            &geom,
            &store,
            &reg,
            video,
            &config,
            &st,
        );
        assert!(matches!(hit, Hit::SpanBody { .. }));

        // Far from everything on the tier: empty area.
        let hit = classify_hit(
            Pos2::new(500.0, row.center().y),
            &geom,
            &store,
            &reg,
            video,
            &config,
            &st,
        );
        assert_eq!(hit, Hit::EmptyTier { tier_id: tier });
    }

    #[test]
    fn classify_locked_tier_yields_none() {
        let store = AnnotationStore::new();
        let mut reg = Registry::new();
        let t = reg.add_type("sign-start", "Sign start", 's', "#3FB950", MarkerCategory::Boundary);
        let tier = reg.add_tier("Tier", vec![t], "#2D5A88");
        reg.tier_mut(tier).unwrap().locked = true;
        let video = Uuid::new_v4();
        let config = TimelineConfig::default();
        let st = state();
        let geom = CanvasGeom::layout(
            Rect::from_min_max(Pos2::new(0.0, 0.0), Pos2::new(800.0, 300.0)),
            &[tier],
            &config,
        );
        let row = geom.row_of(tier).unwrap();
        // Empty area of a locked tier never starts a draw gesture.
        let hit = classify_hit(
            Pos2::new(400.0, row.center().y),
            &geom,
            &store,
            &reg,
            video,
            &config,
            &st,
        );
        assert_eq!(hit, Hit::None);
    }

    #[test]
    fn classify_edge_returns_anchor_at_that_edge() {
        let mut store = AnnotationStore::new();
        let mut reg = Registry::new();
        let t = reg.add_type("x", "X", 'x', "#888888", MarkerCategory::Custom);
        let tier = reg.add_tier("Tier", vec![t], "#2D5A88");
        let video = Uuid::new_v4();
        let config = TimelineConfig::default();
        let st = state();
        // Anchors placed "backwards": end marker earlier than start marker.
        let a = add_confirmed(&mut store, 3000, tier, video);
        let b = add_confirmed(&mut store, 2000, tier, video);
        let span = add_span(&mut store, a, b, tier, video);

        let geom = CanvasGeom::layout(
            Rect::from_min_max(Pos2::new(0.0, 0.0), Pos2::new(800.0, 300.0)),
            &[tier],
            &config,
        );
        let row = geom.row_of(tier).unwrap();

        // Just outside the anchor's hit radius (8px) but inside the edge
        // tolerance (10px): resolves to the chronologically earlier anchor.
        let hit = classify_hit(
            Pos2::new(209.0, row.center().y),
            &geom,
            &store,
            &reg,
            video,
            &config,
            &st,
        );
        assert_eq!(
            hit,
            Hit::SpanEdge {
                span_id: span,
                marker_id: b
            }
        );
    }

    #[test]
    fn resize_bounds_respect_neighbors_and_own_anchor() {
        let mut store = AnnotationStore::new();
        let tier = Uuid::new_v4();
        let video = Uuid::new_v4();
        let a = add_confirmed(&mut store, 0, tier, video);
        let b = add_confirmed(&mut store, 1000, tier, video);
        let c = add_confirmed(&mut store, 2000, tier, video);
        let d = add_confirmed(&mut store, 3000, tier, video);
        let left = add_span(&mut store, a, b, tier, video);
        add_span(&mut store, c, d, tier, video);

        // Dragging the left span's right edge (anchor b): bounded by its
        // own start (0) below and the neighbor's start (2000) above.
        assert_eq!(resize_bounds(&store, left, b, 60_000), (0, 2000));
        // Dragging its left edge (anchor a): [0, 1000].
        assert_eq!(resize_bounds(&store, left, a, 60_000), (0, 1000));
    }

    #[test]
    fn merge_snap_finds_nearest_boundary_within_tolerance() {
        let mut store = AnnotationStore::new();
        let tier = Uuid::new_v4();
        let video = Uuid::new_v4();
        let a = add_confirmed(&mut store, 0, tier, video);
        let b = add_confirmed(&mut store, 1000, tier, video);
        let c = add_confirmed(&mut store, 1005, tier, video);
        let d = add_confirmed(&mut store, 2000, tier, video);
        let left = add_span(&mut store, a, b, tier, video);
        let right = add_span(&mut store, c, d, tier, video);

        // The left span's right edge dragged to 990: within 80ms of the
        // right span's start boundary (1005).
        assert_eq!(
            merge_snap(&store, left, tier, video, 990, 80),
            Some((right, 1005))
        );
        // Out of tolerance: no snap.
        assert_eq!(merge_snap(&store, left, tier, video, 900, 80), None);
    }

    #[test]
    fn ruler_steps_scale_with_zoom() {
        // 100 px/s: 1000ms ticks are 100px apart - first step >= 70px.
        assert_eq!(ruler_step_ms(100.0), 1000);
        // Zoomed far out, ticks go to a minute.
        assert_eq!(ruler_step_ms(1.0), 60_000);
        // Zoomed far in, sub-second ticks.
        assert_eq!(ruler_step_ms(1000.0), 100);
    }

    #[test]
    fn clock_formatting() {
        assert_eq!(format_clock(83_456, true), "1:23.456");
        assert_eq!(format_clock(83_456, false), "1:23");
        assert_eq!(format_clock(0, true), "0:00.000");
    }
}
