//! Session persistence - snapshot save/load and autosave scheduling.
//!
//! The snapshot carries everything needed to restore a working session:
//! scanned videos, confirmed markers, spans, tiers, marker types and the
//! active video. Only confirmed markers are persisted - a pending marker is
//! transient interaction state.
//!
//! Restore has to survive the video list being rescanned with different
//! ids: [`remap_snapshot`] rewrites annotation `video_id`s onto the fresh
//! list, matching by stable path first and unique filename second, and
//! drops whatever failed to remap. Malformed session files are rejected
//! wholesale - the caller falls back to a clean state.

use crate::core::registry::{MarkerType, Tier};
use crate::core::store::{Marker, Span};
use crate::services::library::VideoEntry;
use anyhow::Context;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Everything needed to restore a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub videos: Vec<VideoEntry>,
    /// Confirmed markers only.
    pub markers: Vec<Marker>,
    pub spans: Vec<Span>,
    pub tiers: Vec<Tier>,
    pub marker_types: Vec<MarkerType>,
    pub current_video_id: Option<Uuid>,
    pub saved_at: DateTime<Utc>,
}

/// Write the snapshot as JSON. Goes through a temp file so a crash
/// mid-write never corrupts the previous save.
pub fn save(path: &Path, snapshot: &SessionSnapshot) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(snapshot)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("renaming to {}", path.display()))?;
    debug!("session saved to {}", path.display());
    Ok(())
}

/// Read a snapshot back. `Ok(None)` when no session file exists;
/// `Err` when the file exists but cannot be parsed.
pub fn load(path: &Path) -> anyhow::Result<Option<SessionSnapshot>> {
    if !path.exists() {
        return Ok(None);
    }
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let snapshot: SessionSnapshot =
        serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))?;
    info!(
        "session restored from {} (saved {})",
        path.display(),
        snapshot.saved_at
    );
    Ok(Some(snapshot))
}

/// Rewrite the snapshot's video references onto a freshly scanned list.
///
/// Matching: exact path first, then filename - but only when the filename
/// is unique in the fresh list (ambiguous duplicates are skipped). Markers
/// of unmatched videos are dropped, and so is every span whose video or
/// anchor markers failed to remap.
pub fn remap_snapshot(snapshot: &mut SessionSnapshot, fresh: &[VideoEntry]) {
    let mut filename_counts: HashMap<&str, usize> = HashMap::new();
    for v in fresh {
        *filename_counts.entry(v.name.as_str()).or_default() += 1;
    }

    let mut video_map: HashMap<Uuid, Uuid> = HashMap::new();
    for old in &snapshot.videos {
        let target = fresh
            .iter()
            .find(|v| v.path == old.path)
            .or_else(|| {
                // Fall back to filename only when it is unambiguous.
                (filename_counts.get(old.name.as_str()) == Some(&1))
                    .then(|| fresh.iter().find(|v| v.name == old.name))
                    .flatten()
            });
        match target {
            Some(v) => {
                video_map.insert(old.id, v.id);
            }
            None => warn!("video '{}' not found after rescan, dropping its annotations", old.name),
        }
    }

    let before = snapshot.markers.len();
    snapshot.markers.retain_mut(|m| match video_map.get(&m.video_id) {
        Some(new_id) => {
            m.video_id = *new_id;
            true
        }
        None => false,
    });
    if before != snapshot.markers.len() {
        info!("remap dropped {} marker(s)", before - snapshot.markers.len());
    }

    let marker_ids: std::collections::HashSet<Uuid> =
        snapshot.markers.iter().map(|m| m.id).collect();
    snapshot.spans.retain_mut(|s| match video_map.get(&s.video_id) {
        Some(new_id)
            if marker_ids.contains(&s.start_marker_id)
                && marker_ids.contains(&s.end_marker_id) =>
        {
            s.video_id = *new_id;
            true
        }
        _ => false,
    });

    snapshot.current_video_id = snapshot
        .current_video_id
        .and_then(|id| video_map.get(&id).copied());
}

/// Autosave scheduler: debounced save shortly after the last mutation plus
/// a periodic save while mutations keep coming.
#[derive(Debug)]
pub struct Autosaver {
    debounce: Duration,
    interval: Duration,
    pending_since: Option<Instant>,
    last_save: Instant,
}

impl Default for Autosaver {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), Duration::from_secs(60))
    }
}

impl Autosaver {
    pub fn new(debounce: Duration, interval: Duration) -> Self {
        Self {
            debounce,
            interval,
            pending_since: None,
            last_save: Instant::now(),
        }
    }

    /// Note a mutation; (re)starts the debounce window.
    pub fn note_change(&mut self) {
        self.pending_since = Some(Instant::now());
    }

    pub fn is_pending(&self) -> bool {
        self.pending_since.is_some()
    }

    /// True when a save should happen now. Clears the pending state.
    pub fn tick(&mut self) -> bool {
        let Some(since) = self.pending_since else {
            return false;
        };
        let due = since.elapsed() >= self.debounce || self.last_save.elapsed() >= self.interval;
        if due {
            self.pending_since = None;
            self.last_save = Instant::now();
        }
        due
    }

    /// Unconditional save point (exit path). Clears the pending state.
    pub fn force(&mut self) -> bool {
        let had_pending = self.pending_since.take().is_some();
        self.last_save = Instant::now();
        had_pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn entry(name: &str, path: &str) -> VideoEntry {
        let mut v = VideoEntry::new(PathBuf::from(path));
        v.name = name.to_string();
        v
    }

    fn snapshot_with(videos: Vec<VideoEntry>) -> SessionSnapshot {
        SessionSnapshot {
            videos,
            markers: vec![],
            spans: vec![],
            tiers: vec![],
            marker_types: vec![],
            current_video_id: None,
            saved_at: Utc::now(),
        }
    }

    fn marker(video: Uuid) -> Marker {
        Marker {
            id: Uuid::new_v4(),
            time_ms: 100,
            type_id: Some(Uuid::new_v4()),
            tier_id: Uuid::new_v4(),
            video_id: video,
            confirmed: true,
            value: None,
        }
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let old_video = entry("a.mp4", "/data/a.mp4");
        let mut snap = snapshot_with(vec![old_video.clone()]);
        snap.markers.push(marker(old_video.id));
        snap.current_video_id = Some(old_video.id);

        save(&path, &snap).unwrap();
        let loaded = load(&path).unwrap().unwrap();
        assert_eq!(loaded.videos.len(), 1);
        assert_eq!(loaded.markers.len(), 1);
        assert_eq!(loaded.current_video_id, Some(old_video.id));
    }

    #[test]
    fn load_missing_is_none_and_malformed_is_err() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        assert!(load(&path).unwrap().is_none());
        std::fs::write(&path, b"{not json").unwrap();
        assert!(load(&path).is_err());
    }

    #[test]
    fn remap_by_path_then_unique_filename() {
        let old_a = entry("a.mp4", "/old/a.mp4");
        let old_b = entry("b.mp4", "/old/b.mp4");
        let mut snap = snapshot_with(vec![old_a.clone(), old_b.clone()]);
        let m_a = marker(old_a.id);
        let m_b = marker(old_b.id);
        snap.markers = vec![m_a.clone(), m_b.clone()];
        snap.current_video_id = Some(old_b.id);

        // a keeps its path; b moved but the filename is unique.
        let new_a = entry("a.mp4", "/old/a.mp4");
        let new_b = entry("b.mp4", "/new/b.mp4");
        remap_snapshot(&mut snap, &[new_a.clone(), new_b.clone()]);

        assert_eq!(snap.markers[0].video_id, new_a.id);
        assert_eq!(snap.markers[1].video_id, new_b.id);
        assert_eq!(snap.current_video_id, Some(new_b.id));
    }

    #[test]
    fn remap_skips_ambiguous_duplicate_filenames() {
        let old = entry("clip.mp4", "/old/clip.mp4");
        let mut snap = snapshot_with(vec![old.clone()]);
        snap.markers.push(marker(old.id));

        let dup1 = entry("clip.mp4", "/new/x/clip.mp4");
        let dup2 = entry("clip.mp4", "/new/y/clip.mp4");
        remap_snapshot(&mut snap, &[dup1, dup2]);
        // Two candidates with the same name: no remap, annotations dropped.
        assert!(snap.markers.is_empty());
    }

    #[test]
    fn remap_discards_spans_with_lost_anchors() {
        let old_a = entry("a.mp4", "/old/a.mp4");
        let old_b = entry("b.mp4", "/old/b.mp4");
        let mut snap = snapshot_with(vec![old_a.clone(), old_b.clone()]);
        let kept = marker(old_a.id);
        let lost = marker(old_b.id);
        snap.markers = vec![kept.clone(), lost.clone()];
        snap.spans.push(Span {
            id: Uuid::new_v4(),
            start_marker_id: kept.id,
            end_marker_id: lost.id,
            tier_id: Uuid::new_v4(),
            video_id: old_a.id,
            gloss: String::new(),
        });

        // Only a.mp4 survives the rescan.
        let new_a = entry("a.mp4", "/old/a.mp4");
        remap_snapshot(&mut snap, &[new_a]);
        assert_eq!(snap.markers.len(), 1);
        // The span lost its end anchor with b.mp4 and is discarded.
        assert!(snap.spans.is_empty());
    }

    #[test]
    fn autosaver_debounces_and_forces() {
        let mut auto = Autosaver::new(Duration::from_millis(30), Duration::from_secs(60));
        assert!(!auto.tick());
        auto.note_change();
        assert!(!auto.tick());
        std::thread::sleep(Duration::from_millis(40));
        assert!(auto.tick());
        // Cleared after firing.
        assert!(!auto.tick());

        auto.note_change();
        assert!(auto.force());
        assert!(!auto.tick());
    }
}
