//! ELAN (.eaf) interchange.
//!
//! EAF documents carry a `TIME_ORDER` of millisecond time slots plus one
//! `TIER` of alignable annotations per track. Our tiers are written with a
//! `dcal-` prefix on the `TIER_ID`; that prefix marks ownership:
//! [`merge_eaf`] removes and regenerates only `dcal-` tiers, preserves all
//! foreign tiers and their time slots untouched, and garbage-collects
//! slots nothing references anymore.
//!
//! Point markers have no interval of their own, so they are encoded as
//! 1 ms pseudo-spans (a slot pair `t`/`t+1`) whose annotation value is the
//! marker-type slug; [`import_dcal_annotations`] decodes them back into
//! point markers.
//!
//! Malformed XML is rejected wholesale - parsing returns `Err` and the
//! caller keeps its current state.

use crate::core::registry::{Registry, Tier};
use crate::core::store::{Marker, Span};
use anyhow::{Context, bail};
use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use uuid::Uuid;

/// TIER_ID prefix marking tiers this tool owns in an EAF file.
pub const DCAL_TIER_PREFIX: &str = "dcal-";

const DEFAULT_LINGUISTIC_TYPE: &str = "default-lt";

/// Parsed EAF content - only what interchange needs.
#[derive(Debug, Default)]
pub struct EafDoc {
    /// Slot id → millisecond value (None for unaligned slots).
    pub time_slots: IndexMap<String, Option<i64>>,
    pub tiers: Vec<EafTier>,
}

#[derive(Debug, Clone)]
pub struct EafTier {
    pub id: String,
    pub linguistic_type: String,
    pub annotations: Vec<EafAnnotation>,
}

#[derive(Debug, Clone)]
pub struct EafAnnotation {
    pub id: String,
    pub ts1: String,
    pub ts2: String,
    pub value: String,
}

// ========== Parsing ==========

/// Parse an EAF document. Any XML error rejects the whole file.
pub fn parse_eaf(xml: &str) -> anyhow::Result<EafDoc> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut doc = EafDoc::default();
    let mut current_tier: Option<EafTier> = None;
    let mut current_ann: Option<EafAnnotation> = None;
    let mut in_value = false;

    loop {
        let event = reader.read_event().context("malformed EAF XML")?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let self_closing = matches!(event, Event::Empty(_));
                let name = e.name();
                match name.as_ref() {
                    b"TIME_SLOT" => {
                        let mut id = String::new();
                        let mut value = None;
                        for attr in e.attributes() {
                            let attr = attr.context("malformed TIME_SLOT attribute")?;
                            match attr.key.as_ref() {
                                b"TIME_SLOT_ID" => {
                                    id = String::from_utf8_lossy(&attr.value).into_owned()
                                }
                                b"TIME_VALUE" => {
                                    value = String::from_utf8_lossy(&attr.value).parse().ok()
                                }
                                _ => {}
                            }
                        }
                        if id.is_empty() {
                            bail!("TIME_SLOT without TIME_SLOT_ID");
                        }
                        doc.time_slots.insert(id, value);
                    }
                    b"TIER" => {
                        let mut tier = EafTier {
                            id: String::new(),
                            linguistic_type: DEFAULT_LINGUISTIC_TYPE.to_string(),
                            annotations: Vec::new(),
                        };
                        for attr in e.attributes() {
                            let attr = attr.context("malformed TIER attribute")?;
                            match attr.key.as_ref() {
                                b"TIER_ID" => {
                                    tier.id = String::from_utf8_lossy(&attr.value).into_owned()
                                }
                                b"LINGUISTIC_TYPE_REF" => {
                                    tier.linguistic_type =
                                        String::from_utf8_lossy(&attr.value).into_owned()
                                }
                                _ => {}
                            }
                        }
                        if self_closing {
                            doc.tiers.push(tier);
                        } else {
                            current_tier = Some(tier);
                        }
                    }
                    b"ALIGNABLE_ANNOTATION" => {
                        let mut ann = EafAnnotation {
                            id: String::new(),
                            ts1: String::new(),
                            ts2: String::new(),
                            value: String::new(),
                        };
                        for attr in e.attributes() {
                            let attr = attr.context("malformed annotation attribute")?;
                            match attr.key.as_ref() {
                                b"ANNOTATION_ID" => {
                                    ann.id = String::from_utf8_lossy(&attr.value).into_owned()
                                }
                                b"TIME_SLOT_REF1" => {
                                    ann.ts1 = String::from_utf8_lossy(&attr.value).into_owned()
                                }
                                b"TIME_SLOT_REF2" => {
                                    ann.ts2 = String::from_utf8_lossy(&attr.value).into_owned()
                                }
                                _ => {}
                            }
                        }
                        if self_closing {
                            if let Some(tier) = current_tier.as_mut() {
                                tier.annotations.push(ann);
                            }
                        } else {
                            current_ann = Some(ann);
                        }
                    }
                    b"ANNOTATION_VALUE" => in_value = !self_closing,
                    _ => {}
                }
            }
            Event::Text(t) => {
                if in_value && let Some(ann) = current_ann.as_mut() {
                    ann.value = t.unescape().context("bad annotation text")?.into_owned();
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"ANNOTATION_VALUE" => in_value = false,
                b"ALIGNABLE_ANNOTATION" => {
                    if let (Some(tier), Some(ann)) = (current_tier.as_mut(), current_ann.take()) {
                        tier.annotations.push(ann);
                    }
                }
                b"TIER" => {
                    if let Some(tier) = current_tier.take() {
                        doc.tiers.push(tier);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(doc)
}

// ========== Generation ==========

struct EafInterval {
    start_ms: i64,
    end_ms: i64,
    value: String,
}

/// Collect one tier's export rows: spans first, then span-less point
/// markers as 1 ms pseudo-spans.
fn tier_intervals(
    tier_id: Uuid,
    markers: &[Marker],
    spans: &[Span],
) -> Vec<EafInterval> {
    let time_of = |id: Uuid| markers.iter().find(|m| m.id == id).map(|m| m.time_ms);
    let mut rows: Vec<EafInterval> = Vec::new();

    let mut anchored: std::collections::HashSet<Uuid> = std::collections::HashSet::new();
    for span in spans.iter().filter(|s| s.tier_id == tier_id) {
        let (Some(a), Some(b)) = (time_of(span.start_marker_id), time_of(span.end_marker_id))
        else {
            continue;
        };
        anchored.insert(span.start_marker_id);
        anchored.insert(span.end_marker_id);
        rows.push(EafInterval {
            start_ms: a.min(b),
            end_ms: a.max(b),
            value: span.gloss.clone(),
        });
    }
    rows
        .extend(
            markers
                .iter()
                .filter(|m| m.tier_id == tier_id && m.confirmed && !anchored.contains(&m.id))
                .map(|m| EafInterval {
                    start_ms: m.time_ms,
                    end_ms: m.time_ms + 1,
                    value: String::new(),
                }),
        );
    rows.sort_by_key(|r| r.start_ms);
    rows
}

/// Fill the pseudo-span values with the marker-type slug so the import can
/// restore the type.
fn tier_intervals_with_slugs(
    tier_id: Uuid,
    markers: &[Marker],
    spans: &[Span],
    reg: &Registry,
) -> Vec<EafInterval> {
    let mut rows = tier_intervals(tier_id, markers, spans);
    for row in rows.iter_mut() {
        if row.end_ms - row.start_ms == 1 && row.value.is_empty() {
            if let Some(m) = markers
                .iter()
                .find(|m| m.tier_id == tier_id && m.time_ms == row.start_ms && m.confirmed)
            {
                row.value = m
                    .type_id
                    .and_then(|t| reg.marker_type(t))
                    .map(|t| t.slug.clone())
                    .unwrap_or_default();
            }
        }
    }
    rows
}

/// Generate a fresh EAF document for one video.
pub fn generate_eaf(
    markers: &[Marker],
    spans: &[Span],
    reg: &Registry,
    media_name: &str,
) -> String {
    let mut doc = EafDoc::default();
    let mut slot_seq = 0usize;
    let mut ann_seq = 0usize;

    for tier in reg.tiers() {
        let rows = tier_intervals_with_slugs(tier.id, markers, spans, reg);
        let mut eaf_tier = EafTier {
            id: format!("{DCAL_TIER_PREFIX}{}", tier.name),
            linguistic_type: DEFAULT_LINGUISTIC_TYPE.to_string(),
            annotations: Vec::new(),
        };
        for row in rows {
            slot_seq += 1;
            let ts1 = format!("ts{slot_seq}");
            doc.time_slots.insert(ts1.clone(), Some(row.start_ms));
            slot_seq += 1;
            let ts2 = format!("ts{slot_seq}");
            doc.time_slots.insert(ts2.clone(), Some(row.end_ms));
            ann_seq += 1;
            eaf_tier.annotations.push(EafAnnotation {
                id: format!("a{ann_seq}"),
                ts1,
                ts2,
                value: row.value,
            });
        }
        doc.tiers.push(eaf_tier);
    }
    write_eaf(&doc, media_name)
}

/// Merge annotations into an existing EAF: replace only `dcal-` tiers,
/// keep foreign tiers and their slots untouched, GC orphaned slots.
pub fn merge_eaf(
    existing_xml: &str,
    markers: &[Marker],
    spans: &[Span],
    reg: &Registry,
    media_name: &str,
) -> anyhow::Result<String> {
    let existing = parse_eaf(existing_xml)?;

    let mut doc = EafDoc::default();
    let foreign: Vec<&EafTier> = existing
        .tiers
        .iter()
        .filter(|t| !t.id.starts_with(DCAL_TIER_PREFIX))
        .collect();

    // Keep exactly the slots foreign annotations still reference,
    // with their original ids and values.
    for tier in &foreign {
        for ann in &tier.annotations {
            for slot in [&ann.ts1, &ann.ts2] {
                if let Some(value) = existing.time_slots.get(slot) {
                    doc.time_slots.insert(slot.clone(), *value);
                }
            }
        }
    }
    for tier in &foreign {
        doc.tiers.push((*tier).clone());
    }

    // Continue id sequences past everything still present.
    let mut slot_seq = existing
        .time_slots
        .keys()
        .filter_map(|id| id.strip_prefix("ts").and_then(|n| n.parse::<usize>().ok()))
        .max()
        .unwrap_or(0);
    let mut ann_seq = existing
        .tiers
        .iter()
        .flat_map(|t| &t.annotations)
        .filter_map(|a| a.id.strip_prefix('a').and_then(|n| n.parse::<usize>().ok()))
        .max()
        .unwrap_or(0);

    for tier in reg.tiers() {
        let rows = tier_intervals_with_slugs(tier.id, markers, spans, reg);
        let mut eaf_tier = EafTier {
            id: format!("{DCAL_TIER_PREFIX}{}", tier.name),
            linguistic_type: DEFAULT_LINGUISTIC_TYPE.to_string(),
            annotations: Vec::new(),
        };
        for row in rows {
            slot_seq += 1;
            let ts1 = format!("ts{slot_seq}");
            doc.time_slots.insert(ts1.clone(), Some(row.start_ms));
            slot_seq += 1;
            let ts2 = format!("ts{slot_seq}");
            doc.time_slots.insert(ts2.clone(), Some(row.end_ms));
            ann_seq += 1;
            eaf_tier.annotations.push(EafAnnotation {
                id: format!("a{ann_seq}"),
                ts1,
                ts2,
                value: row.value,
            });
        }
        doc.tiers.push(eaf_tier);
    }

    Ok(write_eaf(&doc, media_name))
}

fn write_eaf(doc: &EafDoc, media_name: &str) -> String {
    let mut writer = quick_xml::Writer::new_with_indent(Vec::new(), b' ', 2);
    let _ = writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)));

    let mut root = BytesStart::new("ANNOTATION_DOCUMENT");
    root.push_attribute(("AUTHOR", ""));
    root.push_attribute(("FORMAT", "3.0"));
    root.push_attribute(("VERSION", "3.0"));
    let _ = writer.write_event(Event::Start(root));

    let mut header = BytesStart::new("HEADER");
    header.push_attribute(("MEDIA_FILE", media_name));
    header.push_attribute(("TIME_UNITS", "milliseconds"));
    let _ = writer.write_event(Event::Empty(header));

    let _ = writer.write_event(Event::Start(BytesStart::new("TIME_ORDER")));
    for (id, value) in &doc.time_slots {
        let mut slot = BytesStart::new("TIME_SLOT");
        slot.push_attribute(("TIME_SLOT_ID", id.as_str()));
        if let Some(v) = value {
            slot.push_attribute(("TIME_VALUE", v.to_string().as_str()));
        }
        let _ = writer.write_event(Event::Empty(slot));
    }
    let _ = writer.write_event(Event::End(BytesEnd::new("TIME_ORDER")));

    for tier in &doc.tiers {
        let mut t = BytesStart::new("TIER");
        t.push_attribute(("TIER_ID", tier.id.as_str()));
        t.push_attribute(("LINGUISTIC_TYPE_REF", tier.linguistic_type.as_str()));
        let _ = writer.write_event(Event::Start(t));
        for ann in &tier.annotations {
            let _ = writer.write_event(Event::Start(BytesStart::new("ANNOTATION")));
            let mut a = BytesStart::new("ALIGNABLE_ANNOTATION");
            a.push_attribute(("ANNOTATION_ID", ann.id.as_str()));
            a.push_attribute(("TIME_SLOT_REF1", ann.ts1.as_str()));
            a.push_attribute(("TIME_SLOT_REF2", ann.ts2.as_str()));
            let _ = writer.write_event(Event::Start(a));
            let _ = writer.write_event(Event::Start(BytesStart::new("ANNOTATION_VALUE")));
            let _ = writer.write_event(Event::Text(BytesText::new(&ann.value)));
            let _ = writer.write_event(Event::End(BytesEnd::new("ANNOTATION_VALUE")));
            let _ = writer.write_event(Event::End(BytesEnd::new("ALIGNABLE_ANNOTATION")));
            let _ = writer.write_event(Event::End(BytesEnd::new("ANNOTATION")));
        }
        let _ = writer.write_event(Event::End(BytesEnd::new("TIER")));
    }

    let mut lt = BytesStart::new("LINGUISTIC_TYPE");
    lt.push_attribute(("LINGUISTIC_TYPE_ID", DEFAULT_LINGUISTIC_TYPE));
    lt.push_attribute(("TIME_ALIGNABLE", "true"));
    let _ = writer.write_event(Event::Empty(lt));

    let _ = writer.write_event(Event::End(BytesEnd::new("ANNOTATION_DOCUMENT")));
    String::from_utf8(writer.into_inner()).unwrap_or_default()
}

// ========== Import ==========

/// Read-only view of foreign (non-`dcal-`) tiers for display.
#[derive(Debug, Clone)]
pub struct ExternalTier {
    pub name: String,
    /// (start_ms, end_ms, value)
    pub intervals: Vec<(i64, i64, String)>,
}

pub fn import_eaf_tiers(xml: &str) -> anyhow::Result<Vec<ExternalTier>> {
    let doc = parse_eaf(xml)?;
    Ok(doc
        .tiers
        .iter()
        .filter(|t| !t.id.starts_with(DCAL_TIER_PREFIX))
        .map(|t| ExternalTier {
            name: t.id.clone(),
            intervals: resolved_intervals(&doc, t),
        })
        .collect())
}

fn resolved_intervals(doc: &EafDoc, tier: &EafTier) -> Vec<(i64, i64, String)> {
    tier.annotations
        .iter()
        .filter_map(|a| {
            let start = (*doc.time_slots.get(&a.ts1)?)?;
            let end = (*doc.time_slots.get(&a.ts2)?)?;
            Some((start, end, a.value.clone()))
        })
        .collect()
}

/// Result of importing our own (`dcal-`) tiers back from an EAF.
#[derive(Debug, Default)]
pub struct DcalImport {
    pub markers: Vec<Marker>,
    pub spans: Vec<Span>,
    /// Tiers present in the EAF but unknown to the registry.
    pub new_tiers: Vec<Tier>,
}

/// Decode `dcal-` tiers into markers and spans for `video_id`. Intervals of
/// 1 ms or less become point markers; longer intervals become spans with a
/// confirmed anchor pair. Caller only invokes this when the video has no
/// markers yet.
pub fn import_dcal_annotations(
    xml: &str,
    reg: &Registry,
    video_id: Uuid,
) -> anyhow::Result<DcalImport> {
    let doc = parse_eaf(xml)?;
    let mut out = DcalImport::default();

    for eaf_tier in doc.tiers.iter().filter(|t| t.id.starts_with(DCAL_TIER_PREFIX)) {
        let name = eaf_tier.id.trim_start_matches(DCAL_TIER_PREFIX);
        let tier_id = match reg.tiers().find(|t| t.name == name) {
            Some(t) => t.id,
            None => {
                let tier = Tier {
                    id: Uuid::new_v4(),
                    name: name.to_string(),
                    marker_types: Vec::new(),
                    visible: true,
                    locked: false,
                    color: "#6E7681".to_string(),
                };
                let id = tier.id;
                out.new_tiers.push(tier);
                id
            }
        };

        // Anchor types: the tier convention's start/end pair when available.
        let start_type = reg.type_by_slug("sign-start").map(|t| t.id);
        let end_type = reg.type_by_slug("sign-end").map(|t| t.id);

        for (start, end, value) in resolved_intervals(&doc, eaf_tier) {
            if end - start <= 1 {
                // 1 ms pseudo-span: a point marker typed by its slug value.
                out.markers.push(Marker {
                    id: Uuid::new_v4(),
                    time_ms: start,
                    type_id: reg.type_by_slug(&value).map(|t| t.id),
                    tier_id,
                    video_id,
                    confirmed: true,
                    value: None,
                });
            } else {
                let a = Marker {
                    id: Uuid::new_v4(),
                    time_ms: start,
                    type_id: start_type,
                    tier_id,
                    video_id,
                    confirmed: true,
                    value: None,
                };
                let b = Marker {
                    id: Uuid::new_v4(),
                    time_ms: end,
                    type_id: end_type,
                    tier_id,
                    video_id,
                    confirmed: true,
                    value: None,
                };
                out.spans.push(Span {
                    id: Uuid::new_v4(),
                    start_marker_id: a.id,
                    end_marker_id: b.id,
                    tier_id,
                    video_id,
                    gloss: value,
                });
                out.markers.push(a);
                out.markers.push(b);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::MarkerCategory;

    fn fixture() -> (Registry, Uuid, Vec<Marker>, Vec<Span>) {
        let mut reg = Registry::new();
        let t_start =
            reg.add_type("sign-start", "Sign start", 's', "#3FB950", MarkerCategory::Boundary);
        let t_end = reg.add_type("sign-end", "Sign end", 'e', "#F85149", MarkerCategory::Boundary);
        let blink = reg.add_type("blink", "Eye blink", 'b', "#58A6FF", MarkerCategory::Feature);
        let tier = reg.add_tier("Right hand", vec![t_start, t_end, blink], "#2D5A88");
        let video = Uuid::new_v4();

        let a = Marker {
            id: Uuid::new_v4(),
            time_ms: 500,
            type_id: Some(t_start),
            tier_id: tier,
            video_id: video,
            confirmed: true,
            value: None,
        };
        let b = Marker {
            id: Uuid::new_v4(),
            time_ms: 1500,
            type_id: Some(t_end),
            tier_id: tier,
            video_id: video,
            confirmed: true,
            value: None,
        };
        let point = Marker {
            id: Uuid::new_v4(),
            time_ms: 3000,
            type_id: Some(blink),
            tier_id: tier,
            video_id: video,
            confirmed: true,
            value: None,
        };
        let span = Span {
            id: Uuid::new_v4(),
            start_marker_id: a.id,
            end_marker_id: b.id,
            tier_id: tier,
            video_id: video,
            gloss: "SIGN1".into(),
        };
        (reg, video, vec![a, b, point], vec![span])
    }

    #[test]
    fn roundtrip_span_and_point_marker() {
        let (reg, video, markers, spans) = fixture();
        let xml = generate_eaf(&markers, &spans, &reg, "clip.mp4");
        assert!(xml.contains("dcal-Right hand"));

        let imported = import_dcal_annotations(&xml, &reg, video).unwrap();
        assert_eq!(imported.spans.len(), 1);
        assert_eq!(imported.spans[0].gloss, "SIGN1");
        let t = |id: Uuid| {
            imported
                .markers
                .iter()
                .find(|m| m.id == id)
                .unwrap()
                .time_ms
        };
        assert_eq!(t(imported.spans[0].start_marker_id), 500);
        assert_eq!(t(imported.spans[0].end_marker_id), 1500);

        // The blink marker survived the 1 ms pseudo-span encoding.
        let blink = reg.type_by_slug("blink").unwrap().id;
        let points: Vec<&Marker> = imported
            .markers
            .iter()
            .filter(|m| m.type_id == Some(blink))
            .collect();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].time_ms, 3000);
        // Known tier name: no new tier created.
        assert!(imported.new_tiers.is_empty());
    }

    #[test]
    fn merge_preserves_foreign_tiers_and_gcs_orphans() {
        let (reg, _video, markers, spans) = fixture();
        let existing = r#"<?xml version="1.0" encoding="UTF-8"?>
<ANNOTATION_DOCUMENT AUTHOR="" FORMAT="3.0" VERSION="3.0">
  <HEADER MEDIA_FILE="clip.mp4" TIME_UNITS="milliseconds"/>
  <TIME_ORDER>
    <TIME_SLOT TIME_SLOT_ID="ts1" TIME_VALUE="100"/>
    <TIME_SLOT TIME_SLOT_ID="ts2" TIME_VALUE="200"/>
    <TIME_SLOT TIME_SLOT_ID="ts3" TIME_VALUE="900"/>
    <TIME_SLOT TIME_SLOT_ID="ts4" TIME_VALUE="950"/>
  </TIME_ORDER>
  <TIER TIER_ID="translation" LINGUISTIC_TYPE_REF="default-lt">
    <ANNOTATION>
      <ALIGNABLE_ANNOTATION ANNOTATION_ID="a1" TIME_SLOT_REF1="ts1" TIME_SLOT_REF2="ts2">
        <ANNOTATION_VALUE>hello</ANNOTATION_VALUE>
      </ALIGNABLE_ANNOTATION>
    </ANNOTATION>
  </TIER>
  <TIER TIER_ID="dcal-Right hand" LINGUISTIC_TYPE_REF="default-lt">
    <ANNOTATION>
      <ALIGNABLE_ANNOTATION ANNOTATION_ID="a2" TIME_SLOT_REF1="ts3" TIME_SLOT_REF2="ts4">
        <ANNOTATION_VALUE>stale</ANNOTATION_VALUE>
      </ALIGNABLE_ANNOTATION>
    </ANNOTATION>
  </TIER>
  <LINGUISTIC_TYPE LINGUISTIC_TYPE_ID="default-lt" TIME_ALIGNABLE="true"/>
</ANNOTATION_DOCUMENT>"#;

        let merged = merge_eaf(existing, &markers, &spans, &reg, "clip.mp4").unwrap();
        let doc = parse_eaf(&merged).unwrap();

        // The foreign tier and its slots survive with ids and values intact.
        let foreign = doc.tiers.iter().find(|t| t.id == "translation").unwrap();
        assert_eq!(foreign.annotations[0].value, "hello");
        assert_eq!(doc.time_slots.get("ts1"), Some(&Some(100)));
        assert_eq!(doc.time_slots.get("ts2"), Some(&Some(200)));

        // The stale dcal content and its now-orphaned slots are gone.
        assert!(!merged.contains("stale"));
        assert!(!doc.time_slots.contains_key("ts3"));
        assert!(!doc.time_slots.contains_key("ts4"));

        // Regenerated dcal tier carries the current span.
        let dcal = doc
            .tiers
            .iter()
            .find(|t| t.id == "dcal-Right hand")
            .unwrap();
        assert_eq!(dcal.annotations[0].value, "SIGN1");
    }

    #[test]
    fn malformed_xml_is_rejected_wholesale() {
        assert!(parse_eaf("<ANNOTATION_DOCUMENT><TIER").is_err());
        assert!(import_eaf_tiers("not xml at all <<<").is_err());
    }

    #[test]
    fn unknown_dcal_tier_becomes_new_tier() {
        let (reg, video, _, _) = fixture();
        let xml = r#"<?xml version="1.0"?>
<ANNOTATION_DOCUMENT>
  <TIME_ORDER>
    <TIME_SLOT TIME_SLOT_ID="ts1" TIME_VALUE="10"/>
    <TIME_SLOT TIME_SLOT_ID="ts2" TIME_VALUE="400"/>
  </TIME_ORDER>
  <TIER TIER_ID="dcal-Mouthing" LINGUISTIC_TYPE_REF="default-lt">
    <ANNOTATION>
      <ALIGNABLE_ANNOTATION ANNOTATION_ID="a1" TIME_SLOT_REF1="ts1" TIME_SLOT_REF2="ts2">
        <ANNOTATION_VALUE>ba</ANNOTATION_VALUE>
      </ALIGNABLE_ANNOTATION>
    </ANNOTATION>
  </TIER>
</ANNOTATION_DOCUMENT>"#;
        let imported = import_dcal_annotations(xml, &reg, video).unwrap();
        assert_eq!(imported.new_tiers.len(), 1);
        assert_eq!(imported.new_tiers[0].name, "Mouthing");
        assert_eq!(imported.spans.len(), 1);
        assert_eq!(imported.spans[0].tier_id, imported.new_tiers[0].id);
    }

    #[test]
    fn external_tier_view_skips_owned_tiers() {
        let (reg, _video, markers, spans) = fixture();
        let xml = generate_eaf(&markers, &spans, &reg, "clip.mp4");
        // A document with only dcal tiers shows no external tiers.
        assert!(import_eaf_tiers(&xml).unwrap().is_empty());
    }
}
