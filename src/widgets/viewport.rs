//! Playback viewport - transport readout and controls.
//!
//! Video decoding is out of scope; the panel shows the playback clock for
//! the active video and hosts the transport buttons. Annotations stay
//! intact even when the media itself cannot be displayed.

use crate::core::event_bus::BoxedEvent;
use crate::core::events::{CycleRateEvent, FrameStepEvent, SeekEvent, TogglePlayEvent};
use crate::core::player::PlaybackController;
use crate::widgets::timeline::timeline_helpers::format_clock;
use eframe::egui::{self, Align2, Color32, FontId, Sense, Ui, Vec2};

pub fn render(ui: &mut Ui, player: &PlaybackController, mut dispatch: impl FnMut(BoxedEvent)) {
    let available = ui.available_size() - Vec2::new(0.0, 30.0);
    let (rect, _) = ui.allocate_exact_size(available.max(Vec2::new(100.0, 60.0)), Sense::hover());
    let painter = ui.painter();
    painter.rect_filled(rect, 4.0, Color32::from_gray(12));

    if player.video_id().is_some() {
        painter.text(
            rect.center(),
            Align2::CENTER_CENTER,
            format_clock(player.current_time_ms(), true),
            FontId::monospace(30.0),
            Color32::from_gray(220),
        );
        let state = if player.is_playing() { "▶" } else { "⏸" };
        painter.text(
            rect.center() + Vec2::new(0.0, 34.0),
            Align2::CENTER_CENTER,
            format!("{state}  {}x", player.playback_rate()),
            FontId::proportional(14.0),
            Color32::from_gray(140),
        );
    } else {
        painter.text(
            rect.center(),
            Align2::CENTER_CENTER,
            "no video selected",
            FontId::proportional(16.0),
            Color32::from_gray(110),
        );
    }

    ui.horizontal(|ui| {
        if ui.button("⏮").on_hover_text("To start").clicked() {
            dispatch(Box::new(SeekEvent(0)));
        }
        if ui.button("◀").on_hover_text("Frame back").clicked() {
            dispatch(Box::new(FrameStepEvent(-1)));
        }
        let play_label = if player.is_playing() { "⏸" } else { "▶" };
        if ui.button(play_label).on_hover_text("Play/Pause (Space)").clicked() {
            dispatch(Box::new(TogglePlayEvent));
        }
        if ui.button("▶|").on_hover_text("Frame forward").clicked() {
            dispatch(Box::new(FrameStepEvent(1)));
        }
        ui.separator();
        if ui.button("slower").clicked() {
            dispatch(Box::new(CycleRateEvent(-1)));
        }
        if ui.button("faster").clicked() {
            dispatch(Box::new(CycleRateEvent(1)));
        }
    });
}
