//! Bottom status bar: playback readout, annotation counts and transient
//! notices (save confirmations, validation rejections, undo affordances).

use crate::core::player::PlaybackController;
use crate::core::registry::Registry;
use crate::core::store::AnnotationStore;
use crate::services::library::VideoLibrary;
use crate::widgets::timeline::timeline_helpers::format_clock;
use eframe::egui;
use std::time::{Duration, Instant};

/// How long a notice stays visible.
const NOTICE_TTL: Duration = Duration::from_secs(4);

pub struct StatusBar {
    notice: Option<(String, Instant)>,
}

impl Default for StatusBar {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBar {
    pub fn new() -> Self {
        Self { notice: None }
    }

    /// Show a transient message (replaces the previous one).
    pub fn notify(&mut self, message: impl Into<String>) {
        self.notice = Some((message.into(), Instant::now()));
    }

    pub fn render(
        &mut self,
        ctx: &egui::Context,
        player: &PlaybackController,
        store: &AnnotationStore,
        reg: &Registry,
        library: &VideoLibrary,
    ) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let video_name = player
                    .video_id()
                    .and_then(|id| library.get(id))
                    .map(|v| v.name.clone())
                    .unwrap_or_else(|| "no video".into());
                ui.monospace(video_name);

                ui.separator();
                ui.monospace(format!(
                    "{} / {}",
                    format_clock(player.current_time_ms(), true),
                    format_clock(player.duration_ms(), true)
                ));

                ui.separator();
                ui.monospace(format!("{}x", player.playback_rate()));

                ui.separator();
                let tier_name = reg
                    .active_tier()
                    .map(|t| t.name.clone())
                    .unwrap_or_else(|| "-".into());
                ui.monospace(format!("tier: {tier_name}"));

                ui.separator();
                let video_id = player.video_id();
                let markers = store
                    .markers()
                    .iter()
                    .filter(|m| Some(m.video_id) == video_id)
                    .count();
                let spans = store
                    .spans()
                    .iter()
                    .filter(|s| Some(s.video_id) == video_id)
                    .count();
                ui.monospace(format!("{markers} markers · {spans} spans"));

                // Expired notices drop out on their own.
                if let Some((_, at)) = &self.notice
                    && at.elapsed() > NOTICE_TTL
                {
                    self.notice = None;
                }
                if let Some((msg, _)) = &self.notice {
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.colored_label(egui::Color32::from_rgb(220, 200, 120), msg);
                    });
                }
            });
        });
    }
}
