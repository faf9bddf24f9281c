//! Hold-key state machine - keyboard-driven annotation.
//!
//! A marker-type key can be *tapped* (press+release within the tap
//! threshold) or *held* (press, playback advances, release), and what
//! happens depends on pending/selected state and whether the video is
//! playing. The decision tree lives here as an explicit FSM with named
//! states and a single transition function per input, so every branch is
//! testable without a UI.
//!
//! States:
//! - `Idle` - no key tracked.
//! - `Holding` - a type key is down, anchored to a marker placed/confirmed
//!   at press time; release decides tap (auto-pair) vs hold (span).
//! - `ExtendingSpan` - a key is down extending an existing span's end
//!   anchor toward the release point.
//!
//! Inputs: `key_down`, `key_up`, `playback_stopped` (force-finalize),
//! `video_switched` (discard - the hold's context no longer exists).

use crate::core::player::PlaybackController;
use crate::core::registry::Registry;
use crate::core::store::{AnnotationStore, Span};
use log::debug;
use std::time::Instant;
use uuid::Uuid;

/// Press+release faster than this is a tap, not a hold.
pub const TAP_THRESHOLD_MS: u128 = 20;

/// An extension must move the boundary at least this far to commit.
pub const MIN_EXTEND_MS: i64 = 50;

#[derive(Debug)]
enum HoldState {
    Idle,
    Holding {
        key: char,
        anchor_id: Uuid,
        tier_id: Uuid,
        type_id: Uuid,
        pressed_at: Instant,
    },
    ExtendingSpan {
        key: char,
        span_id: Uuid,
        tier_id: Uuid,
        pressed_at: Instant,
    },
}

/// Keyboard press/hold/release interpreter for marker-type keys.
#[derive(Debug)]
pub struct HoldKeys {
    state: HoldState,
}

impl Default for HoldKeys {
    fn default() -> Self {
        Self { state: HoldState::Idle }
    }
}

impl HoldKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, HoldState::Idle)
    }

    /// Feed a type-key press. Returns true if the key was consumed.
    pub fn key_down(
        &mut self,
        ch: char,
        store: &mut AnnotationStore,
        reg: &Registry,
        player: &mut PlaybackController,
    ) -> bool {
        // One tracked key at a time; auto-repeat and chords are ignored.
        if self.is_active() {
            return true;
        }
        let Some(video_id) = player.video_id() else {
            return false;
        };
        let now_ms = player.current_time_ms();

        // 1. Pending marker + matching key on its tier: confirm it.
        if let Some(pending_id) = store.pending_marker {
            let Some(pending) = store.marker(pending_id).cloned() else {
                return false;
            };
            let Some(mt) = reg.type_for_key(pending.tier_id, ch) else {
                return false;
            };
            let type_id = mt.id;
            if player.is_playing() && now_ms > pending.time_ms {
                store.update_marker_time(pending_id, now_ms);
            }
            store.confirm_marker(pending_id, type_id);
            player.play();
            debug!("confirmed pending marker {} as key '{}'", pending_id, ch);
            self.state = HoldState::Holding {
                key: ch,
                anchor_id: pending_id,
                tier_id: pending.tier_id,
                type_id,
                pressed_at: Instant::now(),
            };
            return true;
        }

        // 2. Selected span with an unconfirmed anchor: confirm the pair.
        if let Some(span_id) = store.selected_span
            && let Some(span) = store.span(span_id).cloned()
            && let Some(mt) = reg.type_for_key(span.tier_id, ch)
        {
            let anchors = [span.start_marker_id, span.end_marker_id];
            let unconfirmed = anchors
                .iter()
                .any(|id| store.marker(*id).is_some_and(|m| !m.confirmed));
            if unconfirmed {
                let type_id = mt.id;
                if let Some((start_ms, _)) = store.span_interval(&span) {
                    let (early, late) = order_anchors(store, &span);
                    store.confirm_marker(early, type_id);
                    store.confirm_marker(late, reg.end_type_for(type_id));
                    player.seek_ms(start_ms);
                    player.play();
                    self.state = HoldState::ExtendingSpan {
                        key: ch,
                        span_id,
                        tier_id: span.tier_id,
                        pressed_at: Instant::now(),
                    };
                    return true;
                }
            }
        }

        // 3. Paused with a confirmed marker selected: reclassify instead of
        //    starting a hold.
        if !player.is_playing()
            && let Some(sel) = store.selected_marker
            && let Some(marker) = store.marker(sel).cloned()
            && marker.confirmed
            && let Some(mt) = reg.type_for_key(marker.tier_id, ch)
        {
            store.reclassify_marker(sel, mt.id);
            debug!("reclassified marker {} as '{}'", sel, mt.slug);
            return true;
        }

        let Some(tier_id) = reg.active_tier_id() else {
            return false;
        };
        let Some(mt) = reg.type_for_key(tier_id, ch) else {
            return false;
        };
        let type_id = mt.id;

        if !player.is_playing() {
            // Paused, nothing pending or selected: plain tap, no hold.
            return false;
        }

        // 4. End-category key with no unmatched start to pair against:
        //    extend the tier's most recent span (synthesizing one if the
        //    tier is empty).
        if reg.is_end_type(type_id) {
            let has_unmatched = store
                .unmatched_start_before(tier_id, video_id, now_ms, |t| reg.is_start_type(t))
                .is_some();
            if !has_unmatched {
                let span_id = match store.latest_ending_span(tier_id, video_id).map(|s| s.id) {
                    Some(id) => id,
                    None => {
                        let start_type =
                            reg.paired_type(type_id).map(|t| t.id).unwrap_or(type_id);
                        match synthesize_span(store, tier_id, video_id, 0, now_ms, start_type, type_id)
                        {
                            Some(id) => id,
                            None => return false,
                        }
                    }
                };
                self.state = HoldState::ExtendingSpan {
                    key: ch,
                    span_id,
                    tier_id,
                    pressed_at: Instant::now(),
                };
                return true;
            }
        }

        // 5. Playing, no pending: place a confirmed marker at "now" and
        //    track the hold from it.
        let anchor_id = store.place_marker(now_ms, tier_id, video_id);
        store.confirm_marker(anchor_id, type_id);
        self.state = HoldState::Holding {
            key: ch,
            anchor_id,
            tier_id,
            type_id,
            pressed_at: Instant::now(),
        };
        true
    }

    /// Feed a type-key release. Returns true if the key was consumed.
    pub fn key_up(
        &mut self,
        ch: char,
        store: &mut AnnotationStore,
        reg: &Registry,
        player: &mut PlaybackController,
    ) -> bool {
        match &self.state {
            HoldState::Holding { key, .. } | HoldState::ExtendingSpan { key, .. }
                if *key == ch => {}
            _ => return false,
        }
        self.finalize(store, reg, player);
        true
    }

    /// The video stopped while a key was held: finalize as if released.
    pub fn playback_stopped(
        &mut self,
        store: &mut AnnotationStore,
        reg: &Registry,
        player: &mut PlaybackController,
    ) {
        if self.is_active() {
            debug!("playback stopped mid-hold, force-finalizing");
            self.finalize(store, reg, player);
        }
    }

    /// The active video switched mid-hold: the hold's context is gone,
    /// discard without finalizing.
    pub fn video_switched(&mut self) {
        if self.is_active() {
            debug!("video switched mid-hold, discarding hold state");
            self.state = HoldState::Idle;
        }
    }

    fn finalize(
        &mut self,
        store: &mut AnnotationStore,
        reg: &Registry,
        player: &mut PlaybackController,
    ) {
        let state = std::mem::replace(&mut self.state, HoldState::Idle);
        let now_ms = player.current_time_ms();
        match state {
            HoldState::Idle => {}
            HoldState::Holding { anchor_id, tier_id, type_id, pressed_at, .. } => {
                let tapped = pressed_at.elapsed().as_millis() < TAP_THRESHOLD_MS;
                if tapped && reg.is_end_type(type_id) {
                    self.pair_tapped_end(store, reg, anchor_id, tier_id);
                } else if !tapped {
                    self.commit_hold_span(store, reg, anchor_id, tier_id, type_id, now_ms);
                }
                // A tapped non-end key leaves just the confirmed point marker.
            }
            HoldState::ExtendingSpan { span_id, tier_id, .. } => {
                let Some(span) = store.span(span_id).cloned() else {
                    return;
                };
                let Some((_, prior_end)) = store.span_interval(&span) else {
                    return;
                };
                // Only commit if the release moved meaningfully past the
                // old boundary.
                if now_ms > prior_end + MIN_EXTEND_MS {
                    let video_id = span.video_id;
                    store.clear_overlapping_spans(prior_end, now_ms, tier_id, video_id);
                    let (_, late) = order_anchors(store, &span);
                    store.update_marker_time(late, now_ms);
                    debug!("extended span {} end to {}ms", span_id, now_ms);
                }
                store.selected_span = Some(span_id);
            }
        }
    }

    /// Quick tap of an end key: pair with an unmatched start marker, else
    /// extend the previous span, else synthesize a start at time zero.
    fn pair_tapped_end(
        &self,
        store: &mut AnnotationStore,
        reg: &Registry,
        end_marker_id: Uuid,
        tier_id: Uuid,
    ) {
        let Some(end_marker) = store.marker(end_marker_id).cloned() else {
            return;
        };
        let video_id = end_marker.video_id;
        let end_time = end_marker.time_ms;

        if let Some(start) = store
            .unmatched_start_before(tier_id, video_id, end_time, |t| reg.is_start_type(t))
            .map(|m| m.id)
        {
            let span_id = Uuid::new_v4();
            if store.add_span(Span {
                id: span_id,
                start_marker_id: start,
                end_marker_id,
                tier_id,
                video_id,
                gloss: String::new(),
            }) {
                store.selected_span = Some(span_id);
                debug!("auto-paired span {} from tapped end key", span_id);
            }
            return;
        }

        if let Some(prev) = store.latest_ending_span(tier_id, video_id).cloned()
            && store
                .span_interval(&prev)
                .is_some_and(|(_, prev_end)| prev_end < end_time)
        {
            // Extend the previous span to here, discarding the tapped marker.
            let (_, late) = order_anchors(store, &prev);
            store.clear_overlapping_spans(
                store.span_interval(&prev).map(|(_, e)| e).unwrap_or(end_time),
                end_time,
                tier_id,
                video_id,
            );
            store.update_marker_time(late, end_time);
            store.remove_marker(end_marker_id);
            store.selected_span = Some(prev.id);
            debug!("tapped end key extended span {} to {}ms", prev.id, end_time);
            return;
        }

        // Otherwise the tier has nothing to attach to: span from time zero.
        let start_type = store
            .marker(end_marker_id)
            .and_then(|m| m.type_id)
            .and_then(|t| reg.paired_type(t))
            .map(|t| t.id);
        let start_type = match start_type {
            Some(t) => t,
            None => match store.marker(end_marker_id).and_then(|m| m.type_id) {
                Some(t) => t,
                None => return,
            },
        };
        let start = store.place_marker(0, tier_id, video_id);
        store.confirm_marker(start, start_type);
        let span_id = Uuid::new_v4();
        if store.add_span(Span {
            id: span_id,
            start_marker_id: start,
            end_marker_id,
            tier_id,
            video_id,
            gloss: String::new(),
        }) {
            store.selected_span = Some(span_id);
        }
    }

    /// Genuine hold: end marker at "now", clear the way, create the span.
    fn commit_hold_span(
        &self,
        store: &mut AnnotationStore,
        reg: &Registry,
        anchor_id: Uuid,
        tier_id: Uuid,
        held_type: Uuid,
        now_ms: i64,
    ) {
        let Some(anchor) = store.marker(anchor_id).cloned() else {
            return;
        };
        let video_id = anchor.video_id;
        if now_ms <= anchor.time_ms {
            // Playback never advanced; nothing to span.
            return;
        }
        let end_type = reg.end_type_for(held_type);
        let end_id = store.place_marker(now_ms, tier_id, video_id);
        store.confirm_marker(end_id, end_type);

        store.clear_overlapping_spans(anchor.time_ms, now_ms, tier_id, video_id);
        let span_id = Uuid::new_v4();
        if store.add_span(Span {
            id: span_id,
            start_marker_id: anchor_id,
            end_marker_id: end_id,
            tier_id,
            video_id,
            gloss: String::new(),
        }) {
            store.selected_span = Some(span_id);
            debug!(
                "hold committed span {} [{},{}]",
                span_id, anchor.time_ms, now_ms
            );
        }
    }
}

/// (earlier, later) anchor ids of a span by current marker times.
fn order_anchors(store: &AnnotationStore, span: &Span) -> (Uuid, Uuid) {
    let (sa, sb) = (span.start_marker_id, span.end_marker_id);
    let ta = store.marker(sa).map(|m| m.time_ms).unwrap_or(i64::MAX);
    let tb = store.marker(sb).map(|m| m.time_ms).unwrap_or(i64::MAX);
    if ta <= tb { (sa, sb) } else { (sb, sa) }
}

/// Create a confirmed start+end marker pair and a span between them.
fn synthesize_span(
    store: &mut AnnotationStore,
    tier_id: Uuid,
    video_id: Uuid,
    start_ms: i64,
    end_ms: i64,
    start_type: Uuid,
    end_type: Uuid,
) -> Option<Uuid> {
    let start = store.place_marker(start_ms, tier_id, video_id);
    store.confirm_marker(start, start_type);
    let end = store.place_marker(end_ms, tier_id, video_id);
    store.confirm_marker(end, end_type);
    store.clear_overlapping_spans(start_ms, end_ms, tier_id, video_id);
    let span_id = Uuid::new_v4();
    if store.add_span(Span {
        id: span_id,
        start_marker_id: start,
        end_marker_id: end,
        tier_id,
        video_id,
        gloss: String::new(),
    }) {
        Some(span_id)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    struct Rig {
        store: AnnotationStore,
        reg: Registry,
        player: PlaybackController,
        keys: HoldKeys,
        video: Uuid,
        tier: Uuid,
    }

    fn rig() -> Rig {
        let reg = Registry::with_defaults();
        let tier = reg.active_tier_id().unwrap();
        let video = Uuid::new_v4();
        let mut player = PlaybackController::new();
        player.set_video(Some(video), 60.0);
        Rig {
            store: AnnotationStore::new(),
            reg,
            player,
            keys: HoldKeys::new(),
            video,
            tier,
        }
    }

    fn hold_gap() {
        sleep(Duration::from_millis(TAP_THRESHOLD_MS as u64 + 10));
    }

    #[test]
    fn hold_and_release_creates_span() {
        let mut r = rig();
        r.player.seek(0.5);
        r.player.play();

        assert!(r.keys.key_down('s', &mut r.store, &r.reg, &mut r.player));
        hold_gap();
        r.player.seek(1.8);
        assert!(r.keys.key_up('s', &mut r.store, &r.reg, &mut r.player));

        assert_eq!(r.store.spans().len(), 1);
        let span = &r.store.spans()[0];
        assert_eq!(r.store.span_interval(span), Some((500, 1800)));
        assert_eq!(r.store.selected_span, Some(span.id));

        let start = r.store.marker(span.start_marker_id).unwrap();
        let end = r.store.marker(span.end_marker_id).unwrap();
        assert!(start.confirmed && end.confirmed);
        assert_eq!(
            start.type_id.map(|t| r.reg.marker_type(t).unwrap().slug.clone()),
            Some("sign-start".into())
        );
        assert_eq!(
            end.type_id.map(|t| r.reg.marker_type(t).unwrap().slug.clone()),
            Some("sign-end".into())
        );
    }

    #[test]
    fn tap_to_pair_with_unmatched_start() {
        let mut r = rig();
        let start_type = r.reg.type_by_slug("sign-start").unwrap().id;
        let start = r.store.place_marker(1000, r.tier, r.video);
        r.store.confirm_marker(start, start_type);

        r.player.seek(2.0);
        r.player.play();
        assert!(r.keys.key_down('e', &mut r.store, &r.reg, &mut r.player));
        assert!(r.keys.key_up('e', &mut r.store, &r.reg, &mut r.player));

        assert_eq!(r.store.spans().len(), 1);
        let span = &r.store.spans()[0];
        assert_eq!(r.store.span_interval(span), Some((1000, 2000)));
        assert_eq!(span.start_marker_id, start);
        // The tapped end marker was consumed as the span's end anchor:
        // exactly two markers, both anchoring the span.
        assert_eq!(r.store.markers().len(), 2);
        assert!(r.store.marker_in_span(span.end_marker_id));
    }

    #[test]
    fn end_key_with_empty_tier_synthesizes_from_zero() {
        let mut r = rig();
        r.player.seek(3.0);
        r.player.play();
        assert!(r.keys.key_down('e', &mut r.store, &r.reg, &mut r.player));
        assert!(r.keys.key_up('e', &mut r.store, &r.reg, &mut r.player));

        assert_eq!(r.store.spans().len(), 1);
        let span = &r.store.spans()[0];
        assert_eq!(r.store.span_interval(span), Some((0, 3000)));
    }

    #[test]
    fn end_key_hold_extends_latest_span() {
        let mut r = rig();
        let start_type = r.reg.type_by_slug("sign-start").unwrap().id;
        let end_type = r.reg.type_by_slug("sign-end").unwrap().id;
        let span_id =
            synthesize_span(&mut r.store, r.tier, r.video, 1000, 2000, start_type, end_type)
                .unwrap();

        r.player.seek(4.0);
        r.player.play();
        assert!(r.keys.key_down('e', &mut r.store, &r.reg, &mut r.player));
        hold_gap();
        r.player.seek(5.0);
        assert!(r.keys.key_up('e', &mut r.store, &r.reg, &mut r.player));

        let span = r.store.span(span_id).unwrap();
        assert_eq!(r.store.span_interval(span), Some((1000, 5000)));
        assert_eq!(r.store.selected_span, Some(span_id));
    }

    #[test]
    fn confirming_pending_snaps_to_now_when_playback_advanced() {
        let mut r = rig();
        r.player.seek(1.0);
        let pending = r.store.place_marker(1000, r.tier, r.video);
        r.player.play();
        r.player.seek(2.5);

        assert!(r.keys.key_down('s', &mut r.store, &r.reg, &mut r.player));
        let m = r.store.marker(pending).unwrap();
        assert!(m.confirmed);
        assert_eq!(m.time_ms, 2500);
        assert!(r.store.pending_marker.is_none());
        assert!(r.player.is_playing());
        // Releasing immediately: tap of a start key leaves the point marker.
        assert!(r.keys.key_up('s', &mut r.store, &r.reg, &mut r.player));
        assert!(r.store.spans().is_empty());
    }

    #[test]
    fn video_switch_discards_hold_without_side_effects() {
        let mut r = rig();
        r.player.seek(0.5);
        r.player.play();
        r.keys.key_down('s', &mut r.store, &r.reg, &mut r.player);
        let markers_before = r.store.markers().len();

        r.keys.video_switched();
        assert!(!r.keys.is_active());
        // Late release is a no-op.
        assert!(!r.keys.key_up('s', &mut r.store, &r.reg, &mut r.player));
        assert_eq!(r.store.markers().len(), markers_before);
        assert!(r.store.spans().is_empty());
    }

    #[test]
    fn playback_stop_force_finalizes_hold() {
        let mut r = rig();
        r.player.seek(0.5);
        r.player.play();
        r.keys.key_down('s', &mut r.store, &r.reg, &mut r.player);
        hold_gap();
        r.player.seek(2.0);
        r.player.pause();
        r.keys.playback_stopped(&mut r.store, &r.reg, &mut r.player);

        assert!(!r.keys.is_active());
        assert_eq!(r.store.spans().len(), 1);
        assert_eq!(
            r.store.span_interval(&r.store.spans()[0]),
            Some((500, 2000))
        );
    }

    #[test]
    fn paused_type_key_reclassifies_selected_marker() {
        let mut r = rig();
        let start_type = r.reg.type_by_slug("sign-start").unwrap().id;
        let hold_type = r.reg.type_by_slug("hold").unwrap().id;
        let m = r.store.place_marker(1000, r.tier, r.video);
        r.store.confirm_marker(m, start_type);
        r.store.selected_marker = Some(m);

        assert!(r.keys.key_down('h', &mut r.store, &r.reg, &mut r.player));
        assert!(!r.keys.is_active());
        assert_eq!(r.store.marker(m).unwrap().type_id, Some(hold_type));
    }

    #[test]
    fn selected_span_with_unconfirmed_anchors_gets_confirmed_pair() {
        let mut r = rig();
        // Build a drawn span whose anchors are unconfirmed.
        let a = r.store.place_marker(1000, r.tier, r.video);
        r.store.pending_marker = None;
        let b = r.store.place_marker(2000, r.tier, r.video);
        r.store.pending_marker = None;
        let span_id = Uuid::new_v4();
        assert!(r.store.add_span(Span {
            id: span_id,
            start_marker_id: a,
            end_marker_id: b,
            tier_id: r.tier,
            video_id: r.video,
            gloss: String::new(),
        }));
        r.store.selected_span = Some(span_id);

        assert!(r.keys.key_down('s', &mut r.store, &r.reg, &mut r.player));
        let start = r.store.marker(a).unwrap();
        let end = r.store.marker(b).unwrap();
        assert!(start.confirmed && end.confirmed);
        assert_eq!(
            end.type_id.map(|t| r.reg.marker_type(t).unwrap().slug.clone()),
            Some("sign-end".into())
        );
        // Playback rewound to the span start and resumed.
        assert_eq!(r.player.current_time_ms(), 1000);
        assert!(r.player.is_playing());
        assert!(r.keys.is_active());
        r.keys.key_up('s', &mut r.store, &r.reg, &mut r.player);
    }
}
