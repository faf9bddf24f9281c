//! Annotation store - canonical markers and spans for all videos.
//!
//! Owns the only mutable copy of annotation data. All mutations go through
//! methods on [`AnnotationStore`] which enforce the structural invariants:
//!
//! - at most one pending (unconfirmed) marker exists at any time
//! - spans on the same (tier, video) never overlap
//! - a span never outlives either of its anchor markers (cascade delete)
//!
//! Every mutation snapshots `(markers, spans)` into a bounded undo history.
//! Selection and pending flags are *not* part of history, so undo/redo does
//! not fight the user's current focus; dangling references are cleared after
//! time travel instead.
//!
//! Validation failures are silent no-ops with a `bool`/`Option` failure
//! indicator - nothing in here panics or returns `Err` in normal operation.

use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum undo history depth.
const HISTORY_CAP: usize = 100;

/// A point-in-time annotation.
///
/// Created unconfirmed (`type_id == None`) by a placement action; becomes
/// confirmed when a type key is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: Uuid,
    /// Milliseconds from video start, >= 0.
    pub time_ms: i64,
    /// `None` while unconfirmed.
    pub type_id: Option<Uuid>,
    pub tier_id: Uuid,
    pub video_id: Uuid,
    pub confirmed: bool,
    /// Optional free-text note.
    #[serde(default)]
    pub value: Option<String>,
}

/// A gloss-labeled interval anchored to two markers.
///
/// The effective interval is `[min(start, end), max(start, end)]` - the
/// direction of creation carries no meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub id: Uuid,
    pub start_marker_id: Uuid,
    pub end_marker_id: Uuid,
    pub tier_id: Uuid,
    pub video_id: Uuid,
    #[serde(default)]
    pub gloss: String,
}

/// One undo history entry: the full annotation state, selection excluded.
#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    markers: Vec<Marker>,
    spans: Vec<Span>,
}

/// Canonical annotation state with invariant-enforcing mutations and
/// bounded undo/redo.
#[derive(Debug, Default)]
pub struct AnnotationStore {
    markers: Vec<Marker>,
    spans: Vec<Span>,
    /// The single unconfirmed marker awaiting a type key, if any.
    pub pending_marker: Option<Uuid>,
    pub selected_marker: Option<Uuid>,
    pub selected_span: Option<Uuid>,
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
    /// Bumped on every committed mutation; consumers use it as a cheap
    /// "something changed" signal (repaint gating, autosave debounce).
    rev: u64,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Queries ==========

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn rev(&self) -> u64 {
        self.rev
    }

    pub fn marker(&self, id: Uuid) -> Option<&Marker> {
        self.markers.iter().find(|m| m.id == id)
    }

    pub fn span(&self, id: Uuid) -> Option<&Span> {
        self.spans.iter().find(|s| s.id == id)
    }

    /// Effective `[start, end]` interval of a span, or None if an anchor is missing.
    pub fn span_interval(&self, span: &Span) -> Option<(i64, i64)> {
        let a = self.marker(span.start_marker_id)?.time_ms;
        let b = self.marker(span.end_marker_id)?.time_ms;
        Some((a.min(b), a.max(b)))
    }

    /// All spans on one (tier, video).
    pub fn tier_spans(&self, tier_id: Uuid, video_id: Uuid) -> impl Iterator<Item = &Span> {
        self.spans
            .iter()
            .filter(move |s| s.tier_id == tier_id && s.video_id == video_id)
    }

    /// All markers on one (tier, video).
    pub fn tier_markers(&self, tier_id: Uuid, video_id: Uuid) -> impl Iterator<Item = &Marker> {
        self.markers
            .iter()
            .filter(move |m| m.tier_id == tier_id && m.video_id == video_id)
    }

    /// Spans anchored by the given marker (as start or end).
    pub fn spans_of_marker(&self, marker_id: Uuid) -> impl Iterator<Item = &Span> {
        self.spans
            .iter()
            .filter(move |s| s.start_marker_id == marker_id || s.end_marker_id == marker_id)
    }

    /// True if any span uses this marker as an anchor.
    pub fn marker_in_span(&self, marker_id: Uuid) -> bool {
        self.spans_of_marker(marker_id).next().is_some()
    }

    /// The span on this tier whose effective end time is the latest.
    pub fn latest_ending_span(&self, tier_id: Uuid, video_id: Uuid) -> Option<&Span> {
        self.tier_spans(tier_id, video_id)
            .filter_map(|s| self.span_interval(s).map(|(_, end)| (s, end)))
            .max_by_key(|(_, end)| *end)
            .map(|(s, _)| s)
    }

    /// Most recent confirmed start-category marker before `time_ms` on this
    /// tier that no span uses yet. `is_start` decides type membership.
    pub fn unmatched_start_before(
        &self,
        tier_id: Uuid,
        video_id: Uuid,
        time_ms: i64,
        mut is_start: impl FnMut(Uuid) -> bool,
    ) -> Option<&Marker> {
        self.tier_markers(tier_id, video_id)
            .filter(|m| m.confirmed && m.time_ms < time_ms)
            .filter(|m| m.type_id.map(&mut is_start).unwrap_or(false))
            .filter(|m| !self.marker_in_span(m.id))
            .max_by_key(|m| m.time_ms)
    }

    /// Confirmed markers of the current video sorted by time - navigation order.
    pub fn confirmed_sorted(&self, video_id: Uuid) -> Vec<&Marker> {
        let mut out: Vec<&Marker> = self
            .markers
            .iter()
            .filter(|m| m.video_id == video_id && m.confirmed)
            .collect();
        out.sort_by_key(|m| m.time_ms);
        out
    }

    /// Existing span between exactly this marker pair (either direction).
    pub fn span_between(&self, a: Uuid, b: Uuid) -> Option<&Span> {
        self.spans.iter().find(|s| {
            (s.start_marker_id == a && s.end_marker_id == b)
                || (s.start_marker_id == b && s.end_marker_id == a)
        })
    }

    fn overlaps(
        &self,
        tier_id: Uuid,
        video_id: Uuid,
        start: i64,
        end: i64,
        exclude: &[Uuid],
    ) -> bool {
        self.tier_spans(tier_id, video_id)
            .filter(|s| !exclude.contains(&s.id))
            .filter_map(|s| self.span_interval(s))
            .any(|(a, b)| a < end && start < b)
    }

    // ========== Marker mutations ==========

    /// Insert an unconfirmed marker, make it pending and selected.
    /// Replaces any existing pending marker (single-pending invariant).
    pub fn place_marker(&mut self, time_ms: i64, tier_id: Uuid, video_id: Uuid) -> Uuid {
        self.checkpoint();
        self.drop_pending();
        let id = Uuid::new_v4();
        self.markers.push(Marker {
            id,
            time_ms: time_ms.max(0),
            type_id: None,
            tier_id,
            video_id,
            confirmed: false,
            value: None,
        });
        self.pending_marker = Some(id);
        self.selected_marker = Some(id);
        self.selected_span = None;
        self.touch();
        debug!("placed pending marker {} at {}ms", id, time_ms);
        id
    }

    /// Confirm a marker as `type_id`. If its time falls strictly inside an
    /// existing span on the same tier+video, that span's end anchor snaps to
    /// the new marker's time ("insert a boundary, trim the covering span").
    pub fn confirm_marker(&mut self, id: Uuid, type_id: Uuid) -> bool {
        let Some(m) = self.marker(id).cloned() else {
            return false;
        };
        self.checkpoint();

        // Snap the covering span's end before flipping the flag, so the
        // marker itself is never seen as a span anchor here.
        let covering = self
            .tier_spans(m.tier_id, m.video_id)
            .filter(|s| s.start_marker_id != id && s.end_marker_id != id)
            .filter_map(|s| self.span_interval(s).map(|iv| (s.id, iv)))
            .find(|(_, (a, b))| *a < m.time_ms && m.time_ms < *b);
        if let Some((span_id, (a, b))) = covering {
            let span = self.span(span_id).cloned();
            if let Some(span) = span {
                // Later anchor of the effective interval is the one to move.
                let (sa, sb) = (span.start_marker_id, span.end_marker_id);
                let later = if self.marker(sa).map(|x| x.time_ms) == Some(b.max(a)) {
                    sa
                } else {
                    sb
                };
                if let Some(anchor) = self.markers.iter_mut().find(|x| x.id == later) {
                    anchor.time_ms = m.time_ms;
                }
                debug!("confirm snapped span {} end to {}ms", span_id, m.time_ms);
            }
        }

        if let Some(marker) = self.markers.iter_mut().find(|x| x.id == id) {
            marker.type_id = Some(type_id);
            marker.confirmed = true;
        }
        if self.pending_marker == Some(id) {
            self.pending_marker = None;
        }
        self.touch();
        true
    }

    /// Delete the pending marker entirely. No-op if none pending.
    pub fn cancel_pending_marker(&mut self) {
        if self.pending_marker.is_none() {
            return;
        }
        self.checkpoint();
        self.drop_pending();
        self.touch();
    }

    fn drop_pending(&mut self) {
        if let Some(id) = self.pending_marker.take() {
            self.markers.retain(|m| m.id != id);
            self.spans
                .retain(|s| s.start_marker_id != id && s.end_marker_id != id);
            if self.selected_marker == Some(id) {
                self.selected_marker = None;
            }
        }
    }

    /// Delete a marker, cascading to any span it anchors.
    pub fn remove_marker(&mut self, id: Uuid) -> bool {
        if self.marker(id).is_none() {
            return false;
        }
        self.checkpoint();
        self.markers.retain(|m| m.id != id);
        let before = self.spans.len();
        self.spans
            .retain(|s| s.start_marker_id != id && s.end_marker_id != id);
        if before != self.spans.len() {
            debug!("marker {} cascade removed {} span(s)", id, before - self.spans.len());
        }
        self.clear_dangling_refs();
        self.touch();
        true
    }

    /// Move a marker by `delta_ms`, clamped to `[0, max_ms]`.
    pub fn nudge_marker(&mut self, id: Uuid, delta_ms: i64, max_ms: i64) -> bool {
        let Some(old) = self.marker(id).map(|m| m.time_ms) else {
            return false;
        };
        let new = (old + delta_ms).clamp(0, max_ms);
        if new == old {
            return false;
        }
        self.checkpoint();
        if let Some(m) = self.markers.iter_mut().find(|m| m.id == id) {
            m.time_ms = new;
        }
        self.touch();
        true
    }

    /// Direct time mutation, no clamping - callers pre-validate.
    pub fn update_marker_time(&mut self, id: Uuid, time_ms: i64) -> bool {
        if self.marker(id).map(|m| m.time_ms) == Some(time_ms) {
            return false;
        }
        if self.marker(id).is_none() {
            return false;
        }
        self.checkpoint();
        if let Some(m) = self.markers.iter_mut().find(|m| m.id == id) {
            m.time_ms = time_ms;
        }
        self.touch();
        true
    }

    /// Move a marker to another tier (the span it anchors, if any, follows).
    pub fn update_marker_tier(&mut self, id: Uuid, tier_id: Uuid) -> bool {
        if self.marker(id).is_none() {
            return false;
        }
        self.checkpoint();
        if let Some(m) = self.markers.iter_mut().find(|m| m.id == id) {
            m.tier_id = tier_id;
        }
        for s in self.spans.iter_mut() {
            if s.start_marker_id == id || s.end_marker_id == id {
                s.tier_id = tier_id;
            }
        }
        self.touch();
        true
    }

    /// Change the type of an already-confirmed marker.
    pub fn reclassify_marker(&mut self, id: Uuid, type_id: Uuid) -> bool {
        match self.marker(id) {
            Some(m) if m.confirmed => {}
            _ => return false,
        }
        self.checkpoint();
        if let Some(m) = self.markers.iter_mut().find(|m| m.id == id) {
            m.type_id = Some(type_id);
        }
        self.touch();
        true
    }

    // ========== Span mutations ==========

    /// Add a span between two existing markers. Rejects (no-op, `false`) if
    /// either anchor is missing or the effective interval overlaps another
    /// span on the same tier+video - first writer wins.
    pub fn add_span(&mut self, span: Span) -> bool {
        let Some((start, end)) = self.span_interval(&span) else {
            return false;
        };
        if self.overlaps(span.tier_id, span.video_id, start, end, &[]) {
            debug!("add_span rejected: [{start},{end}] overlaps on tier {}", span.tier_id);
            return false;
        }
        self.checkpoint();
        debug!("added span {} [{start},{end}]", span.id);
        self.spans.push(span);
        self.touch();
        true
    }

    /// Delete a span together with both anchor markers, as one undo step
    /// (the keyboard-delete path; pointer deletion keeps the anchors).
    pub fn remove_span_with_markers(&mut self, id: Uuid) -> bool {
        let Some(span) = self.span(id).cloned() else {
            return false;
        };
        self.checkpoint();
        self.spans.retain(|s| s.id != id);
        self.markers
            .retain(|m| m.id != span.start_marker_id && m.id != span.end_marker_id);
        // A shared anchor may have tied this span to another one.
        let marker_ids: std::collections::HashSet<Uuid> =
            self.markers.iter().map(|m| m.id).collect();
        self.spans.retain(|s| {
            marker_ids.contains(&s.start_marker_id) && marker_ids.contains(&s.end_marker_id)
        });
        self.clear_dangling_refs();
        self.touch();
        true
    }

    /// Delete a span only; anchor markers survive.
    pub fn remove_span(&mut self, id: Uuid) -> bool {
        if self.span(id).is_none() {
            return false;
        }
        self.checkpoint();
        self.spans.retain(|s| s.id != id);
        if self.selected_span == Some(id) {
            self.selected_span = None;
        }
        self.touch();
        true
    }

    pub fn set_gloss(&mut self, id: Uuid, gloss: String) -> bool {
        match self.span(id) {
            Some(s) if s.gloss != gloss => {}
            _ => return false,
        }
        self.checkpoint();
        if let Some(s) = self.spans.iter_mut().find(|s| s.id == id) {
            s.gloss = gloss;
        }
        self.touch();
        true
    }

    /// Merge two spans on the same tier+video into `keep_id`.
    ///
    /// The merged interval is `[min(starts), max(ends)]`; the two inner
    /// boundary markers are deleted and the kept span's anchors become the
    /// outermost pair. Glosses join as `"A + B"` (chronological, skipping
    /// empty parts). Returns false without mutating if the merge would
    /// overlap a third span or the inputs are invalid.
    pub fn merge_spans(&mut self, keep_id: Uuid, remove_id: Uuid) -> bool {
        if keep_id == remove_id {
            return false;
        }
        let (Some(keep), Some(remove)) = (self.span(keep_id).cloned(), self.span(remove_id).cloned())
        else {
            return false;
        };
        if keep.tier_id != remove.tier_id || keep.video_id != remove.video_id {
            return false;
        }
        let (Some(ka), Some(ra)) = (self.span_interval(&keep), self.span_interval(&remove)) else {
            return false;
        };

        // Chronological order of the two spans.
        let (first, first_iv, second, second_iv) = if ka.0 <= ra.0 {
            (&keep, ka, &remove, ra)
        } else {
            (&remove, ra, &keep, ka)
        };
        let merged = (first_iv.0.min(second_iv.0), first_iv.1.max(second_iv.1));
        if self.overlaps(keep.tier_id, keep.video_id, merged.0, merged.1, &[keep_id, remove_id]) {
            debug!("merge rejected: [{},{}] would overlap a third span", merged.0, merged.1);
            return false;
        }

        // Outer anchors: first span's earlier marker, second span's later one.
        let anchor_at = |span: &Span, t: i64| -> Option<Uuid> {
            [span.start_marker_id, span.end_marker_id]
                .into_iter()
                .find(|id| self.marker(*id).map(|m| m.time_ms) == Some(t))
        };
        let (Some(outer_start), Some(outer_end)) =
            (anchor_at(first, first_iv.0), anchor_at(second, second_iv.1))
        else {
            return false;
        };

        self.checkpoint();

        let mut inner: Vec<Uuid> = [
            first.start_marker_id,
            first.end_marker_id,
            second.start_marker_id,
            second.end_marker_id,
        ]
        .into_iter()
        .filter(|id| *id != outer_start && *id != outer_end)
        .collect();
        inner.sort();
        inner.dedup();

        let gloss = {
            let (ga, gb) = (first.gloss.trim(), second.gloss.trim());
            match (ga.is_empty(), gb.is_empty()) {
                (true, true) => String::new(),
                (false, true) => ga.to_string(),
                (true, false) => gb.to_string(),
                (false, false) => format!("{ga} + {gb}"),
            }
        };

        self.spans.retain(|s| s.id != remove_id);
        self.markers.retain(|m| !inner.contains(&m.id));
        if let Some(s) = self.spans.iter_mut().find(|s| s.id == keep_id) {
            s.start_marker_id = outer_start;
            s.end_marker_id = outer_end;
            s.gloss = gloss;
        }
        self.clear_dangling_refs();
        self.selected_span = Some(keep_id);
        self.touch();
        debug!("merged span {} into {} -> [{},{}]", remove_id, keep_id, merged.0, merged.1);
        true
    }

    /// Make room for a new `[start_ms, end_ms]` interval on tier+video:
    /// fully covered spans are deleted (with their markers), spans covering
    /// the new range get their later boundary pulled back to `start_ms`, and
    /// partial overlaps are trimmed at the overlapping edge. Guarantees a
    /// subsequent [`Self::add_span`] for this interval cannot be rejected.
    pub fn clear_overlapping_spans(
        &mut self,
        start_ms: i64,
        end_ms: i64,
        tier_id: Uuid,
        video_id: Uuid,
    ) {
        let victims: Vec<(Uuid, (i64, i64))> = self
            .tier_spans(tier_id, video_id)
            .filter_map(|s| self.span_interval(s).map(|iv| (s.id, iv)))
            .filter(|(_, (a, b))| *a < end_ms && start_ms < *b)
            .collect();
        if victims.is_empty() {
            return;
        }
        self.checkpoint();

        for (span_id, (a, b)) in victims {
            let Some(span) = self.span(span_id).cloned() else {
                continue;
            };
            let (sa, sb) = (span.start_marker_id, span.end_marker_id);
            let (ta, tb) = match (self.marker(sa), self.marker(sb)) {
                (Some(x), Some(y)) => (x.time_ms, y.time_ms),
                _ => continue,
            };
            let (earlier, later) = if ta <= tb { (sa, sb) } else { (sb, sa) };

            if start_ms <= a && b <= end_ms {
                // Fully contained in the new range: delete span + markers.
                self.spans.retain(|s| s.id != span_id);
                self.markers.retain(|m| m.id != sa && m.id != sb);
                debug!("cleared span {} [{},{}] inside [{},{}]", span_id, a, b, start_ms, end_ms);
            } else if a < start_ms {
                // Covers the new range, or overlaps from the left:
                // pull its later boundary back to the new start.
                if let Some(m) = self.markers.iter_mut().find(|m| m.id == later) {
                    m.time_ms = start_ms;
                }
            } else {
                // Overlaps from the right: trim its start to the new end.
                if let Some(m) = self.markers.iter_mut().find(|m| m.id == earlier) {
                    m.time_ms = end_ms;
                }
            }
        }
        self.clear_dangling_refs();
        self.touch();
    }

    // ========== Bulk operations ==========

    /// Replace all markers (restore/import path).
    pub fn set_markers(&mut self, markers: Vec<Marker>) {
        self.checkpoint();
        self.markers = markers;
        self.clear_dangling_refs();
        self.touch();
    }

    /// Replace all spans (restore/import path).
    pub fn set_spans(&mut self, spans: Vec<Span>) {
        self.checkpoint();
        self.spans = spans;
        self.clear_dangling_refs();
        self.touch();
    }

    /// Drop every marker and span belonging to one video.
    pub fn clear_video_annotations(&mut self, video_id: Uuid) {
        self.checkpoint();
        self.markers.retain(|m| m.video_id != video_id);
        self.spans.retain(|s| s.video_id != video_id);
        self.clear_dangling_refs();
        self.touch();
    }

    // ========== Undo/redo ==========

    fn checkpoint(&mut self) {
        self.undo_stack.push(Snapshot {
            markers: self.markers.clone(),
            spans: self.spans.clone(),
        });
        if self.undo_stack.len() > HISTORY_CAP {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo(&mut self) -> bool {
        let Some(snap) = self.undo_stack.pop() else {
            return false;
        };
        self.redo_stack.push(Snapshot {
            markers: std::mem::replace(&mut self.markers, snap.markers),
            spans: std::mem::replace(&mut self.spans, snap.spans),
        });
        self.clear_dangling_refs();
        self.touch();
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(snap) = self.redo_stack.pop() else {
            return false;
        };
        self.undo_stack.push(Snapshot {
            markers: std::mem::replace(&mut self.markers, snap.markers),
            spans: std::mem::replace(&mut self.spans, snap.spans),
        });
        self.clear_dangling_refs();
        self.touch();
        true
    }

    /// Drop pending/selection references that no longer resolve.
    fn clear_dangling_refs(&mut self) {
        if let Some(id) = self.pending_marker
            && self.marker(id).is_none()
        {
            self.pending_marker = None;
        }
        if let Some(id) = self.selected_marker
            && self.marker(id).is_none()
        {
            self.selected_marker = None;
        }
        if let Some(id) = self.selected_span
            && self.span(id).is_none()
        {
            self.selected_span = None;
        }
    }

    fn touch(&mut self) {
        self.rev = self.rev.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (Uuid, Uuid, Uuid) {
        (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4())
    }

    fn confirmed_marker(store: &mut AnnotationStore, t: i64, tier: Uuid, video: Uuid) -> Uuid {
        let id = store.place_marker(t, tier, video);
        store.confirm_marker(id, Uuid::new_v4());
        id
    }

    fn span_between(
        store: &mut AnnotationStore,
        a: Uuid,
        b: Uuid,
        tier: Uuid,
        video: Uuid,
        gloss: &str,
    ) -> Uuid {
        let id = Uuid::new_v4();
        assert!(store.add_span(Span {
            id,
            start_marker_id: a,
            end_marker_id: b,
            tier_id: tier,
            video_id: video,
            gloss: gloss.to_string(),
        }));
        id
    }

    #[test]
    fn single_pending_invariant() {
        let (tier, video, _) = ids();
        let mut store = AnnotationStore::new();
        store.place_marker(100, tier, video);
        store.place_marker(200, tier, video);
        store.place_marker(300, tier, video);
        let unconfirmed = store.markers().iter().filter(|m| !m.confirmed).count();
        assert_eq!(unconfirmed, 1);
        assert_eq!(store.markers().len(), 1);

        store.cancel_pending_marker();
        assert!(store.markers().is_empty());
        assert!(store.pending_marker.is_none());
        // Cancel with nothing pending is a no-op.
        store.cancel_pending_marker();
        assert!(store.markers().is_empty());
    }

    #[test]
    fn no_overlap_invariant() {
        let (tier, video, _) = ids();
        let mut store = AnnotationStore::new();
        let a = confirmed_marker(&mut store, 0, tier, video);
        let b = confirmed_marker(&mut store, 1000, tier, video);
        let c = confirmed_marker(&mut store, 500, tier, video);
        let d = confirmed_marker(&mut store, 1500, tier, video);
        span_between(&mut store, a, b, tier, video, "FIRST");

        // Overlapping [500,1500] is rejected.
        assert!(!store.add_span(Span {
            id: Uuid::new_v4(),
            start_marker_id: c,
            end_marker_id: d,
            tier_id: tier,
            video_id: video,
            gloss: String::new(),
        }));
        assert_eq!(store.spans().len(), 1);

        // Adjacent [1000,1500] (shared boundary time) is fine.
        let e = confirmed_marker(&mut store, 1000, tier, video);
        span_between(&mut store, e, d, tier, video, "SECOND");
        assert_eq!(store.spans().len(), 2);
    }

    #[test]
    fn cascade_delete() {
        let (tier, video, _) = ids();
        let mut store = AnnotationStore::new();
        let a = confirmed_marker(&mut store, 0, tier, video);
        let b = confirmed_marker(&mut store, 1000, tier, video);
        span_between(&mut store, a, b, tier, video, "X");

        assert!(store.remove_marker(a));
        assert!(store.spans().is_empty());
        // The other anchor survives.
        assert!(store.marker(b).is_some());
        // No span references a nonexistent marker.
        for s in store.spans() {
            assert!(store.marker(s.start_marker_id).is_some());
            assert!(store.marker(s.end_marker_id).is_some());
        }
    }

    #[test]
    fn merge_adjacent_spans() {
        let (tier, video, _) = ids();
        let mut store = AnnotationStore::new();
        let a = confirmed_marker(&mut store, 0, tier, video);
        let b = confirmed_marker(&mut store, 1000, tier, video);
        let c = confirmed_marker(&mut store, 1000, tier, video);
        let d = confirmed_marker(&mut store, 2000, tier, video);
        let hello = span_between(&mut store, a, b, tier, video, "HELLO");
        let world = span_between(&mut store, c, d, tier, video, "WORLD");

        assert!(store.merge_spans(hello, world));
        assert_eq!(store.spans().len(), 1);
        let merged = store.span(hello).unwrap();
        assert_eq!(merged.gloss, "HELLO + WORLD");
        assert_eq!(store.span_interval(merged), Some((0, 2000)));
        // Inner boundary markers are gone, outer pair remains.
        assert_eq!(merged.start_marker_id, a);
        assert_eq!(merged.end_marker_id, d);
        assert!(store.marker(b).is_none());
        assert!(store.marker(c).is_none());
    }

    #[test]
    fn merge_rejected_when_third_span_in_the_way() {
        let (tier, video, _) = ids();
        let mut store = AnnotationStore::new();
        let a = confirmed_marker(&mut store, 0, tier, video);
        let b = confirmed_marker(&mut store, 1000, tier, video);
        let c = confirmed_marker(&mut store, 1200, tier, video);
        let d = confirmed_marker(&mut store, 1800, tier, video);
        let e = confirmed_marker(&mut store, 1050, tier, video);
        let f = confirmed_marker(&mut store, 1150, tier, video);
        let keep = span_between(&mut store, a, b, tier, video, "A");
        let target = span_between(&mut store, c, d, tier, video, "B");
        // A third span occupies the gap the merge would have to bridge.
        span_between(&mut store, e, f, tier, video, "THIRD");

        let before_markers = store.markers().to_vec();
        let before_spans = store.spans().to_vec();
        assert!(!store.merge_spans(keep, target));
        assert_eq!(store.markers(), &before_markers[..]);
        assert_eq!(store.spans(), &before_spans[..]);
    }

    #[test]
    fn confirm_inside_span_snaps_covering_end() {
        let (tier, video, _) = ids();
        let mut store = AnnotationStore::new();
        let a = confirmed_marker(&mut store, 0, tier, video);
        let b = confirmed_marker(&mut store, 2000, tier, video);
        let span = span_between(&mut store, a, b, tier, video, "SIGN");

        let inside = store.place_marker(1200, tier, video);
        store.confirm_marker(inside, Uuid::new_v4());

        let s = store.span(span).unwrap();
        assert_eq!(store.span_interval(s), Some((0, 1200)));
        assert_eq!(store.marker(b).unwrap().time_ms, 1200);
    }

    #[test]
    fn clear_overlapping_makes_room() {
        let (tier, video, _) = ids();
        let mut store = AnnotationStore::new();
        // inside [1100,1400], covering [0,3000], left [500,1200], right [1900,2600]
        let a = confirmed_marker(&mut store, 1100, tier, video);
        let b = confirmed_marker(&mut store, 1400, tier, video);
        span_between(&mut store, a, b, tier, video, "inside");
        let c = confirmed_marker(&mut store, 500, tier, video);
        let d = confirmed_marker(&mut store, 1000, tier, video);
        span_between(&mut store, c, d, tier, video, "left");

        store.clear_overlapping_spans(900, 1800, tier, video);

        // Inside span deleted with its markers; left span trimmed to end at 900.
        assert!(store.marker(a).is_none());
        assert!(store.marker(b).is_none());
        assert_eq!(store.marker(d).unwrap().time_ms, 900);

        // The new interval can now be added unconditionally.
        let x = confirmed_marker(&mut store, 900, tier, video);
        let y = confirmed_marker(&mut store, 1800, tier, video);
        span_between(&mut store, x, y, tier, video, "new");
    }

    #[test]
    fn resize_onto_neighbor_then_merge() {
        // Two adjacent spans [0,1000] and [1005,2000]: snapping the left
        // span's right edge onto 1005 and merging yields one [0,2000] span.
        let (tier, video, _) = ids();
        let mut store = AnnotationStore::new();
        let a = confirmed_marker(&mut store, 0, tier, video);
        let b = confirmed_marker(&mut store, 1000, tier, video);
        let c = confirmed_marker(&mut store, 1005, tier, video);
        let d = confirmed_marker(&mut store, 2000, tier, video);
        let left = span_between(&mut store, a, b, tier, video, "LEFT");
        let right = span_between(&mut store, c, d, tier, video, "RIGHT");

        assert!(store.update_marker_time(b, 1005));
        assert!(store.merge_spans(left, right));
        assert_eq!(store.spans().len(), 1);
        let merged = store.span(left).unwrap();
        assert_eq!(store.span_interval(merged), Some((0, 2000)));
        assert_eq!(merged.gloss, "LEFT + RIGHT");
    }

    #[test]
    fn remove_span_keeps_anchor_markers() {
        let (tier, video, _) = ids();
        let mut store = AnnotationStore::new();
        let a = confirmed_marker(&mut store, 0, tier, video);
        let b = confirmed_marker(&mut store, 1000, tier, video);
        let span = span_between(&mut store, a, b, tier, video, "S");

        assert!(store.remove_span(span));
        assert!(store.spans().is_empty());
        assert!(store.marker(a).is_some());
        assert!(store.marker(b).is_some());

        // The keyboard variant removes the anchors too.
        let span2 = span_between(&mut store, a, b, tier, video, "S2");
        assert!(store.remove_span_with_markers(span2));
        assert!(store.marker(a).is_none());
        assert!(store.marker(b).is_none());
    }

    #[test]
    fn nudge_clamps_to_range() {
        let (tier, video, _) = ids();
        let mut store = AnnotationStore::new();
        let id = confirmed_marker(&mut store, 5, tier, video);
        assert!(store.nudge_marker(id, -10, 10_000));
        assert_eq!(store.marker(id).unwrap().time_ms, 0);
        assert!(store.nudge_marker(id, 20_000, 10_000));
        assert_eq!(store.marker(id).unwrap().time_ms, 10_000);
    }

    #[test]
    fn undo_redo_roundtrip() {
        let (tier, video, _) = ids();
        let mut store = AnnotationStore::new();
        let a = confirmed_marker(&mut store, 0, tier, video);
        let b = confirmed_marker(&mut store, 1000, tier, video);
        let before = (store.markers().to_vec(), store.spans().to_vec());

        span_between(&mut store, a, b, tier, video, "S");
        let after = (store.markers().to_vec(), store.spans().to_vec());

        assert!(store.undo());
        assert_eq!((store.markers().to_vec(), store.spans().to_vec()), before);
        assert!(store.redo());
        assert_eq!((store.markers().to_vec(), store.spans().to_vec()), after);
    }

    #[test]
    fn undo_clears_dangling_selection() {
        let (tier, video, _) = ids();
        let mut store = AnnotationStore::new();
        confirmed_marker(&mut store, 0, tier, video);
        let late = store.place_marker(500, tier, video);
        assert_eq!(store.selected_marker, Some(late));
        // Undo the placement: the selected marker no longer exists.
        store.undo();
        assert!(store.marker(late).is_none());
        assert!(store.selected_marker.is_none());
        assert!(store.pending_marker.is_none());
    }

    #[test]
    fn reclassify_only_confirmed() {
        let (tier, video, _) = ids();
        let mut store = AnnotationStore::new();
        let pending = store.place_marker(0, tier, video);
        assert!(!store.reclassify_marker(pending, Uuid::new_v4()));
        let t2 = Uuid::new_v4();
        store.confirm_marker(pending, Uuid::new_v4());
        assert!(store.reclassify_marker(pending, t2));
        assert_eq!(store.marker(pending).unwrap().type_id, Some(t2));
    }

    #[test]
    fn failed_add_span_does_not_pollute_history() {
        let (tier, video, _) = ids();
        let mut store = AnnotationStore::new();
        let a = confirmed_marker(&mut store, 0, tier, video);
        let b = confirmed_marker(&mut store, 1000, tier, video);
        span_between(&mut store, a, b, tier, video, "S");
        let rev = store.rev();
        assert!(!store.add_span(Span {
            id: Uuid::new_v4(),
            start_marker_id: a,
            end_marker_id: b,
            tier_id: tier,
            video_id: video,
            gloss: String::new(),
        }));
        assert_eq!(store.rev(), rev);
    }
}
