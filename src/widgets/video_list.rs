//! Video list panel - pick the active video, see annotation progress.

use crate::core::event_bus::BoxedEvent;
use crate::core::events::{ActivateVideoEvent, ClearVideoAnnotationsEvent};
use crate::core::player::PlaybackController;
use crate::services::library::{VideoLibrary, VideoStatus};
use eframe::egui::{self, Color32, RichText, Ui};

pub fn render(
    ui: &mut Ui,
    library: &VideoLibrary,
    player: &PlaybackController,
    mut dispatch: impl FnMut(BoxedEvent),
) {
    ui.heading("Videos");
    ui.separator();
    if library.is_empty() {
        ui.label("Open a folder or drop video files here.");
        return;
    }

    egui::ScrollArea::vertical()
        .id_salt("video_list_scroll")
        .show(ui, |ui| {
            for video in &library.videos {
                let active = player.video_id() == Some(video.id);
                let status_mark = match video.status {
                    VideoStatus::Done => "✔ ",
                    VideoStatus::InProgress => "… ",
                    VideoStatus::Fresh => "",
                };
                let mut text = RichText::new(format!("{status_mark}{}", video.name));
                if active {
                    text = text.strong();
                }
                if video.status == VideoStatus::Done {
                    text = text.color(Color32::from_rgb(110, 190, 120));
                }
                let response = ui
                    .selectable_label(active, text)
                    .on_hover_text(video.path.display().to_string());
                if response.clicked() && !active {
                    dispatch(Box::new(ActivateVideoEvent(video.id)));
                }
                response.context_menu(|ui| {
                    if ui.button("Clear annotations").clicked() {
                        dispatch(Box::new(ClearVideoAnnotationsEvent(video.id)));
                        ui.close();
                    }
                });
            }
        });
}
