//! Playback controller - the single source of truth for "now".
//!
//! Wraps one time-bearing media source per active video. Time advances in
//! `update()` once per UI frame from wall-clock deltas scaled by the playback
//! rate (no timers to orphan: switching videos just resets the clock state).
//!
//! # Rate ladder
//!
//! Playback speed moves along a fixed preset ladder, cycled one step at a
//! time - same scheme as shuttle-speed presets in frame players.
//!
//! # Frame stepping
//!
//! Steps are `1/fps` seconds where fps comes from [`FpsDetector`] when a
//! media adapter has fed enough frame-timing samples, else the 30 fps
//! fallback.

use log::debug;
use std::time::Instant;
use uuid::Uuid;

/// Discrete playback speed presets, cycled by +-1 step.
pub const RATE_LADDER: &[f32] = &[0.25, 0.5, 0.75, 1.0, 1.25, 1.5, 2.0, 3.0, 4.0];

/// Fallback frame rate when detection has not converged.
pub const DEFAULT_FPS: f64 = 30.0;

/// Estimates a video's frame rate from presentation-time samples.
///
/// Needs at least 12 inter-frame deltas; the estimate is the median of the
/// last 8, accepted only when the implied fps lies in [10, 120].
#[derive(Debug, Default)]
pub struct FpsDetector {
    last_sample: Option<f64>,
    deltas: Vec<f64>,
    detected: Option<f64>,
}

impl FpsDetector {
    const MIN_SAMPLES: usize = 12;
    const MEDIAN_WINDOW: usize = 8;

    /// Feed one frame presentation timestamp (seconds).
    pub fn feed(&mut self, t_seconds: f64) {
        if let Some(last) = self.last_sample {
            let delta = t_seconds - last;
            if delta > 0.0 {
                self.deltas.push(delta);
            }
        }
        self.last_sample = Some(t_seconds);

        if self.detected.is_none() && self.deltas.len() >= Self::MIN_SAMPLES {
            let mut window: Vec<f64> =
                self.deltas[self.deltas.len() - Self::MEDIAN_WINDOW..].to_vec();
            window.sort_by(|a, b| a.total_cmp(b));
            let median = (window[3] + window[4]) / 2.0;
            let fps = 1.0 / median;
            if (10.0..=120.0).contains(&fps) {
                debug!("detected media fps: {:.2}", fps);
                self.detected = Some(fps);
            }
        }
    }

    pub fn detected_fps(&self) -> Option<f64> {
        self.detected
    }

    /// Detected rate or the 30 fps fallback.
    pub fn fps(&self) -> f64 {
        self.detected.unwrap_or(DEFAULT_FPS)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Playback state for the active video.
#[derive(Debug)]
pub struct PlaybackController {
    video_id: Option<Uuid>,
    time_s: f64,
    duration_s: f64,
    rate_idx: usize,
    volume: f32,
    playing: bool,
    pub loop_start_s: Option<f64>,
    pub loop_end_s: Option<f64>,
    pub loop_enabled: bool,
    last_tick: Option<Instant>,
    pub fps_detector: FpsDetector,
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self {
            video_id: None,
            time_s: 0.0,
            duration_s: 0.0,
            rate_idx: RATE_LADDER.iter().position(|r| *r == 1.0).unwrap_or(0),
            volume: 1.0,
            playing: false,
            loop_start_s: None,
            loop_end_s: None,
            loop_enabled: false,
            last_tick: None,
            fps_detector: FpsDetector::default(),
        }
    }
}

impl PlaybackController {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Accessors ==========

    pub fn video_id(&self) -> Option<Uuid> {
        self.video_id
    }

    /// Current time in seconds, continuously updated during playback.
    pub fn current_time(&self) -> f64 {
        self.time_s
    }

    pub fn current_time_ms(&self) -> i64 {
        (self.time_s * 1000.0).round() as i64
    }

    pub fn duration(&self) -> f64 {
        self.duration_s
    }

    pub fn duration_ms(&self) -> i64 {
        (self.duration_s * 1000.0).round() as i64
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn playback_rate(&self) -> f32 {
        RATE_LADDER[self.rate_idx]
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_volume(&mut self, v: f32) {
        self.volume = v.clamp(0.0, 1.0);
    }

    // ========== Media source ==========

    /// Switch the underlying media source. Cancels the running clock and
    /// fps sampling so nothing from the old video leaks into the new one.
    pub fn set_video(&mut self, video_id: Option<Uuid>, duration_s: f64) {
        self.video_id = video_id;
        self.duration_s = duration_s.max(0.0);
        self.time_s = 0.0;
        self.playing = false;
        self.last_tick = None;
        self.loop_start_s = None;
        self.loop_end_s = None;
        self.loop_enabled = false;
        self.fps_detector.reset();
        debug!("media source switched: {:?} ({:.3}s)", video_id, duration_s);
    }

    // ========== Transport ==========

    pub fn play(&mut self) {
        if self.video_id.is_none() || self.duration_s <= 0.0 {
            return;
        }
        if self.time_s >= self.duration_s {
            self.time_s = 0.0;
        }
        self.playing = true;
        self.last_tick = None;
    }

    pub fn pause(&mut self) {
        self.playing = false;
        self.last_tick = None;
    }

    pub fn toggle_play(&mut self) {
        if self.playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Seek, clamped to `[0, duration]`.
    pub fn seek(&mut self, time_s: f64) {
        self.time_s = time_s.clamp(0.0, self.duration_s);
    }

    pub fn seek_ms(&mut self, time_ms: i64) {
        self.seek(time_ms as f64 / 1000.0);
    }

    /// Pause if running, then advance by `dir` frames of `1/fps` seconds.
    pub fn frame_step(&mut self, dir: i32) {
        if self.playing {
            self.pause();
        }
        let step = 1.0 / self.fps_detector.fps();
        self.seek(self.time_s + dir as f64 * step);
    }

    /// Move one step up/down the speed ladder.
    pub fn cycle_rate(&mut self, dir: i32) -> f32 {
        let idx = self.rate_idx as i32 + dir.signum();
        self.rate_idx = idx.clamp(0, RATE_LADDER.len() as i32 - 1) as usize;
        debug!("playback rate: {}x", self.playback_rate());
        self.playback_rate()
    }

    // ========== Per-frame tick ==========

    /// Advance the clock; call once per UI frame. Returns true while time
    /// is moving (display needs repainting).
    pub fn update(&mut self) -> bool {
        if !self.playing {
            self.last_tick = None;
            return false;
        }
        let now = Instant::now();
        let dt = match self.last_tick {
            Some(last) => now.duration_since(last).as_secs_f64(),
            None => 0.0,
        };
        self.last_tick = Some(now);
        self.advance(dt);
        true
    }

    /// Clock math, separated from wall-clock sampling for testability.
    fn advance(&mut self, dt: f64) {
        if !self.playing || dt <= 0.0 {
            return;
        }
        self.time_s += dt * self.playback_rate() as f64;

        if self.loop_enabled
            && let (Some(start), Some(end)) = (self.loop_start_s, self.loop_end_s)
            && end > start
            && self.time_s >= end
        {
            self.time_s = start;
            return;
        }

        if self.time_s >= self.duration_s {
            self.time_s = self.duration_s;
            self.playing = false;
            self.last_tick = None;
            debug!("reached end of media, stopping");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_player() -> PlaybackController {
        let mut p = PlaybackController::new();
        p.set_video(Some(Uuid::new_v4()), 10.0);
        p
    }

    #[test]
    fn seek_clamps() {
        let mut p = ready_player();
        p.seek(-3.0);
        assert_eq!(p.current_time(), 0.0);
        p.seek(99.0);
        assert_eq!(p.current_time(), 10.0);
        p.seek_ms(2500);
        assert_eq!(p.current_time_ms(), 2500);
    }

    #[test]
    fn rate_ladder_clamps_at_ends() {
        let mut p = ready_player();
        for _ in 0..20 {
            p.cycle_rate(1);
        }
        assert_eq!(p.playback_rate(), *RATE_LADDER.last().unwrap());
        for _ in 0..20 {
            p.cycle_rate(-1);
        }
        assert_eq!(p.playback_rate(), RATE_LADDER[0]);
    }

    #[test]
    fn advance_respects_rate_and_stops_at_end() {
        let mut p = ready_player();
        p.play();
        p.cycle_rate(1); // 1.25x
        p.advance(1.0);
        assert!((p.current_time() - 1.25).abs() < 1e-9);

        p.advance(100.0);
        assert_eq!(p.current_time(), 10.0);
        assert!(!p.is_playing());
    }

    #[test]
    fn loop_region_wraps() {
        let mut p = ready_player();
        p.loop_start_s = Some(2.0);
        p.loop_end_s = Some(4.0);
        p.loop_enabled = true;
        p.seek(3.5);
        p.play();
        p.advance(1.0);
        assert!((p.current_time() - 2.0).abs() < 1e-9);
        assert!(p.is_playing());
    }

    #[test]
    fn frame_step_pauses_and_steps_by_default_fps() {
        let mut p = ready_player();
        p.seek(1.0);
        p.play();
        p.frame_step(1);
        assert!(!p.is_playing());
        assert!((p.current_time() - (1.0 + 1.0 / 30.0)).abs() < 1e-9);
        p.frame_step(-1);
        assert!((p.current_time() - 1.0).abs() < 1e-9);
        // Clamped at zero.
        p.seek(0.0);
        p.frame_step(-1);
        assert_eq!(p.current_time(), 0.0);
    }

    #[test]
    fn fps_detection_needs_enough_samples_and_sane_rate() {
        let mut d = FpsDetector::default();
        // 12 timestamps -> 11 deltas at 25 fps: not enough yet.
        for i in 0..12 {
            d.feed(i as f64 * 0.04);
        }
        assert_eq!(d.detected_fps(), None);
        assert_eq!(d.fps(), DEFAULT_FPS);
        d.feed(12.0 * 0.04);
        assert!((d.detected_fps().unwrap() - 25.0).abs() < 0.01);
        assert!((d.fps() - 25.0).abs() < 0.01);
    }

    #[test]
    fn fps_detection_rejects_out_of_range() {
        let mut d = FpsDetector::default();
        // 2 fps implied - outside [10,120], never accepted.
        for i in 0..40 {
            d.feed(i as f64 * 0.5);
        }
        assert_eq!(d.detected_fps(), None);
        assert_eq!(d.fps(), DEFAULT_FPS);
    }

    #[test]
    fn switching_video_resets_clock_state() {
        let mut p = ready_player();
        p.seek(5.0);
        p.play();
        p.loop_enabled = true;
        p.set_video(Some(Uuid::new_v4()), 20.0);
        assert_eq!(p.current_time(), 0.0);
        assert!(!p.is_playing());
        assert!(!p.loop_enabled);
        assert_eq!(p.duration(), 20.0);
    }
}
