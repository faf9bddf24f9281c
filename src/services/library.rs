//! Video library - folder scanning and output-file naming.
//!
//! Scanning produces [`VideoEntry`] records with stable ids; durations are
//! unknown until a media adapter reports them (0 until then). Output naming
//! follows a never-overwrite policy: `name`, then `name_<suffix>`, then
//! `name_<suffix>_N`.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// File extensions recognized as videos.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "mkv", "avi", "m4v"];

/// Annotation progress of one video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    #[default]
    Fresh,
    InProgress,
    Done,
}

/// One scanned video file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoEntry {
    pub id: Uuid,
    pub name: String,
    pub path: PathBuf,
    /// Milliseconds; 0 until a media adapter reports the real duration.
    #[serde(default)]
    pub duration_ms: i64,
    #[serde(default)]
    pub status: VideoStatus,
}

impl VideoEntry {
    pub fn new(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unnamed")
            .to_string();
        Self {
            id: Uuid::new_v4(),
            name,
            path,
            duration_ms: 0,
            status: VideoStatus::Fresh,
        }
    }
}

/// The ordered set of videos in the current session.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct VideoLibrary {
    pub videos: Vec<VideoEntry>,
}

impl VideoLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: Uuid) -> Option<&VideoEntry> {
        self.videos.iter().find(|v| v.id == id)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut VideoEntry> {
        self.videos.iter_mut().find(|v| v.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    /// The next video after `current` that is not done, wrapping around.
    pub fn next_not_done(&self, current: Uuid) -> Option<Uuid> {
        let idx = self.videos.iter().position(|v| v.id == current)?;
        let n = self.videos.len();
        (1..n)
            .map(|step| &self.videos[(idx + step) % n])
            .find(|v| v.status != VideoStatus::Done)
            .map(|v| v.id)
    }

    /// Scan a folder (non-recursive) for video files, sorted by name.
    pub fn scan_folder(&mut self, dir: &Path) -> anyhow::Result<usize> {
        let mut found: Vec<PathBuf> = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && is_video_file(&path) {
                found.push(path);
            }
        }
        found.sort();
        let count = found.len();
        self.merge_paths(found);
        info!("scanned {}: {} video(s)", dir.display(), count);
        Ok(count)
    }

    /// Add an explicit file list (drag-and-drop, CLI args).
    pub fn scan_file_list(&mut self, paths: Vec<PathBuf>) -> usize {
        let videos: Vec<PathBuf> = paths.into_iter().filter(|p| is_video_file(p)).collect();
        let count = videos.len();
        self.merge_paths(videos);
        count
    }

    /// Keep existing entries (and their ids) for paths already known.
    fn merge_paths(&mut self, paths: Vec<PathBuf>) {
        for path in paths {
            if self.videos.iter().any(|v| v.path == path) {
                continue;
            }
            self.videos.push(VideoEntry::new(path));
        }
    }
}

pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| VIDEO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Never-overwrite output naming: `stem.ext` → `stem_suffix.ext` →
/// `stem_suffix_2.ext`, ... against files that already exist in `dir`.
pub fn unique_output_path(dir: &Path, stem: &str, suffix: &str, ext: &str) -> PathBuf {
    let plain = dir.join(format!("{stem}.{ext}"));
    if !plain.exists() {
        return plain;
    }
    let suffixed = dir.join(format!("{stem}_{suffix}.{ext}"));
    if !suffixed.exists() {
        return suffixed;
    }
    for n in 2.. {
        let candidate = dir.join(format!("{stem}_{suffix}_{n}.{ext}"));
        if !candidate.exists() {
            return candidate;
        }
        if n > 10_000 {
            warn!("unique_output_path: giving up disambiguation for {stem}");
            break;
        }
    }
    suffixed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_filter() {
        assert!(is_video_file(Path::new("a/b/clip.MP4")));
        assert!(is_video_file(Path::new("clip.webm")));
        assert!(!is_video_file(Path::new("notes.txt")));
        assert!(!is_video_file(Path::new("noext")));
    }

    #[test]
    fn scan_folder_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.mp4", "a.mp4", "readme.md"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let mut lib = VideoLibrary::new();
        assert_eq!(lib.scan_folder(dir.path()).unwrap(), 2);
        assert_eq!(lib.videos[0].name, "a.mp4");
        assert_eq!(lib.videos[1].name, "b.mp4");

        // Re-scan keeps existing ids.
        let id = lib.videos[0].id;
        lib.scan_folder(dir.path()).unwrap();
        assert_eq!(lib.videos.len(), 2);
        assert_eq!(lib.videos[0].id, id);
    }

    #[test]
    fn next_not_done_wraps_and_skips() {
        let mut lib = VideoLibrary::new();
        for name in ["a.mp4", "b.mp4", "c.mp4"] {
            lib.videos.push(VideoEntry::new(PathBuf::from(name)));
        }
        let (a, b, c) = (lib.videos[0].id, lib.videos[1].id, lib.videos[2].id);
        lib.get_mut(b).unwrap().status = VideoStatus::Done;
        assert_eq!(lib.next_not_done(a), Some(c));
        // Wraps past the end, skipping done entries.
        assert_eq!(lib.next_not_done(c), Some(a));
    }

    #[test]
    fn output_naming_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let first = unique_output_path(dir.path(), "session", "annotations", "csv");
        assert_eq!(first, dir.path().join("session.csv"));
        std::fs::write(&first, b"x").unwrap();

        let second = unique_output_path(dir.path(), "session", "annotations", "csv");
        assert_eq!(second, dir.path().join("session_annotations.csv"));
        std::fs::write(&second, b"x").unwrap();

        let third = unique_output_path(dir.path(), "session", "annotations", "csv");
        assert_eq!(third, dir.path().join("session_annotations_2.csv"));
    }
}
