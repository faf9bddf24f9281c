//! CSV and JSON export - pure functions of the annotation state.
//!
//! CSV: UTF-8 BOM, one marker-row block, a blank line, then the span-row
//! block. JSON: confirmed markers and valid spans only, with human-readable
//! tier/type names resolved, sorted by time. Neither touches the stores -
//! callers pass slices and write the returned string wherever they want.

use crate::core::registry::Registry;
use crate::core::store::{Marker, Span};
use serde::Serialize;
use uuid::Uuid;

/// UTF-8 byte-order mark so spreadsheet tools pick the right encoding.
const BOM: &str = "\u{FEFF}";

fn csv_field(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn tier_name(reg: &Registry, id: Uuid) -> String {
    reg.tier(id).map(|t| t.name.clone()).unwrap_or_else(|| id.to_string())
}

fn type_name(reg: &Registry, id: Option<Uuid>) -> String {
    id.and_then(|t| reg.marker_type(t))
        .map(|t| t.name.clone())
        .unwrap_or_default()
}

/// Render one video's annotations as CSV.
pub fn to_csv(markers: &[Marker], spans: &[Span], reg: &Registry) -> String {
    let mut confirmed: Vec<&Marker> = markers.iter().filter(|m| m.confirmed).collect();
    confirmed.sort_by_key(|m| m.time_ms);

    let mut out = String::from(BOM);
    out.push_str("Time (ms),Tier,Type,Note\n");
    for m in &confirmed {
        out.push_str(&format!(
            "{},{},{},{}\n",
            m.time_ms,
            csv_field(&tier_name(reg, m.tier_id)),
            csv_field(&type_name(reg, m.type_id)),
            csv_field(m.value.as_deref().unwrap_or("")),
        ));
    }

    out.push('\n');
    out.push_str("Start (ms),End (ms),Tier,Gloss\n");
    let mut rows: Vec<(i64, i64, &Span)> = spans
        .iter()
        .filter_map(|s| interval_of(s, markers).map(|(a, b)| (a, b, s)))
        .collect();
    rows.sort_by_key(|(a, _, _)| *a);
    for (a, b, s) in rows {
        out.push_str(&format!(
            "{},{},{},{}\n",
            a,
            b,
            csv_field(&tier_name(reg, s.tier_id)),
            csv_field(&s.gloss),
        ));
    }
    out
}

#[derive(Debug, Serialize)]
struct JsonMarker {
    time_ms: i64,
    tier: String,
    marker_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

#[derive(Debug, Serialize)]
struct JsonSpan {
    start_ms: i64,
    end_ms: i64,
    tier: String,
    gloss: String,
}

#[derive(Debug, Serialize)]
struct JsonExport {
    markers: Vec<JsonMarker>,
    spans: Vec<JsonSpan>,
}

/// Render one video's annotations as pretty-printed JSON.
pub fn to_json(markers: &[Marker], spans: &[Span], reg: &Registry) -> String {
    let mut confirmed: Vec<&Marker> = markers.iter().filter(|m| m.confirmed).collect();
    confirmed.sort_by_key(|m| m.time_ms);
    let json_markers = confirmed
        .iter()
        .map(|m| JsonMarker {
            time_ms: m.time_ms,
            tier: tier_name(reg, m.tier_id),
            marker_type: type_name(reg, m.type_id),
            note: m.value.clone(),
        })
        .collect();

    let mut rows: Vec<(i64, i64, &Span)> = spans
        .iter()
        .filter_map(|s| interval_of(s, markers).map(|(a, b)| (a, b, s)))
        .collect();
    rows.sort_by_key(|(a, _, _)| *a);
    let json_spans = rows
        .into_iter()
        .map(|(a, b, s)| JsonSpan {
            start_ms: a,
            end_ms: b,
            tier: tier_name(reg, s.tier_id),
            gloss: s.gloss.clone(),
        })
        .collect();

    serde_json::to_string_pretty(&JsonExport {
        markers: json_markers,
        spans: json_spans,
    })
    .unwrap_or_else(|_| "{}".to_string())
}

/// Effective interval of a span against a marker slice; `None` drops spans
/// with missing anchors from the export.
fn interval_of(span: &Span, markers: &[Marker]) -> Option<(i64, i64)> {
    let t = |id: Uuid| markers.iter().find(|m| m.id == id).map(|m| m.time_ms);
    let a = t(span.start_marker_id)?;
    let b = t(span.end_marker_id)?;
    Some((a.min(b), a.max(b)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::MarkerCategory;

    fn fixture() -> (Vec<Marker>, Vec<Span>, Registry) {
        let mut reg = Registry::new();
        let t_start =
            reg.add_type("sign-start", "Sign start", 's', "#3FB950", MarkerCategory::Boundary);
        let t_end = reg.add_type("sign-end", "Sign end", 'e', "#F85149", MarkerCategory::Boundary);
        let tier = reg.add_tier("Right hand", vec![t_start, t_end], "#2D5A88");
        let video = Uuid::new_v4();

        let mk = |time, ty: Uuid, confirmed| Marker {
            id: Uuid::new_v4(),
            time_ms: time,
            type_id: Some(ty),
            tier_id: tier,
            video_id: video,
            confirmed,
            value: None,
        };
        let a = mk(500, t_start, true);
        let b = mk(1500, t_end, true);
        let unconfirmed = mk(9000, t_start, false);
        let span = Span {
            id: Uuid::new_v4(),
            start_marker_id: a.id,
            end_marker_id: b.id,
            tier_id: tier,
            video_id: video,
            gloss: "SIGN1".into(),
        };
        (vec![a, b, unconfirmed], vec![span], reg)
    }

    #[test]
    fn csv_has_bom_and_two_blocks() {
        let (markers, spans, reg) = fixture();
        let csv = to_csv(&markers, &spans, &reg);
        assert!(csv.starts_with(BOM));
        let body = csv.trim_start_matches(BOM);
        let blocks: Vec<&str> = body.split("\n\n").collect();
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].contains("500,Right hand,Sign start"));
        // Unconfirmed markers are excluded.
        assert!(!blocks[0].contains("9000"));
        assert!(blocks[1].contains("500,1500,Right hand,SIGN1"));
    }

    #[test]
    fn csv_quotes_fields_with_commas() {
        let (markers, mut spans, reg) = fixture();
        spans[0].gloss = "HELLO, WORLD".into();
        let csv = to_csv(&markers, &spans, &reg);
        assert!(csv.contains("\"HELLO, WORLD\""));
    }

    #[test]
    fn json_resolves_names_and_sorts() {
        let (mut markers, spans, reg) = fixture();
        // Shuffle: later marker first.
        markers.swap(0, 1);
        let json = to_json(&markers, &spans, &reg);
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        let ms = v["markers"].as_array().unwrap();
        assert_eq!(ms.len(), 2);
        assert_eq!(ms[0]["time_ms"], 500);
        assert_eq!(ms[0]["tier"], "Right hand");
        assert_eq!(ms[0]["marker_type"], "Sign start");
        assert_eq!(v["spans"][0]["gloss"], "SIGN1");
        assert_eq!(v["spans"][0]["start_ms"], 500);
    }

    #[test]
    fn spans_with_missing_anchors_are_dropped() {
        let (markers, mut spans, reg) = fixture();
        spans.push(Span {
            id: Uuid::new_v4(),
            start_marker_id: Uuid::new_v4(),
            end_marker_id: Uuid::new_v4(),
            tier_id: spans[0].tier_id,
            video_id: spans[0].video_id,
            gloss: "ORPHAN".into(),
        });
        let json = to_json(&markers, &spans, &reg);
        assert!(!json.contains("ORPHAN"));
    }
}
