//! Application module - GlossaApp and the main update loop.
//!
//! Submodules:
//! - `events` - event-bus drain (store/player mutations)
//! - `keys` - keyboard routing (hold-key machine + discrete shortcuts)
//! - `menu` - menu bar (file dialogs, exports, interchange)

mod events;
mod keys;
mod menu;

use crate::config::PathConfig;
use crate::core::event_bus::EventBus;
use crate::core::hold_keys::HoldKeys;
use crate::core::player::PlaybackController;
use crate::core::registry::Registry;
use crate::core::store::AnnotationStore;
use crate::help;
use crate::services::library::{VideoLibrary, VideoStatus};
use crate::services::persistence::{self, Autosaver, SessionSnapshot};
use crate::services::server::ApiCommand;
use crate::widgets::status::StatusBar;
use crate::widgets::timeline::{self, TimelineConfig, TimelineState};
use crate::widgets::{video_list, viewport};
use chrono::Utc;
use eframe::egui;
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::mpsc;
use uuid::Uuid;

/// Main application state.
pub struct GlossaApp {
    pub store: AnnotationStore,
    pub registry: Registry,
    pub player: PlaybackController,
    pub library: VideoLibrary,
    pub hold_keys: HoldKeys,
    pub event_bus: EventBus,
    pub timeline_config: TimelineConfig,
    pub timeline_state: TimelineState,
    pub status_bar: StatusBar,
    pub autosaver: Autosaver,
    pub session_path: PathBuf,
    pub show_help: bool,
    /// Dev API command channel, when `--remote` is active.
    pub api_commands: Option<mpsc::Receiver<ApiCommand>>,
    /// Playback state seen last frame, to force-finalize holds on stop.
    was_playing: bool,
    /// Store revision already noted for autosave.
    saved_rev: u64,
}

impl GlossaApp {
    pub fn new(paths: &PathConfig, restore: bool) -> Self {
        let mut app = Self {
            store: AnnotationStore::new(),
            registry: Registry::with_defaults(),
            player: PlaybackController::new(),
            library: VideoLibrary::new(),
            hold_keys: HoldKeys::new(),
            event_bus: EventBus::new(),
            timeline_config: TimelineConfig::default(),
            timeline_state: TimelineState::default(),
            status_bar: StatusBar::new(),
            autosaver: Autosaver::default(),
            session_path: paths.session_file(),
            show_help: false,
            api_commands: None,
            was_playing: false,
            saved_rev: 0,
        };
        if restore {
            app.restore_session();
        }
        app.saved_rev = app.store.rev();
        app
    }

    /// Load the previous session and remap its annotations onto the
    /// current video list. A malformed file is rejected wholesale.
    fn restore_session(&mut self) {
        match persistence::load(&self.session_path) {
            Ok(Some(mut snapshot)) => {
                // Rescan known folders so moved files can be re-matched.
                let mut fresh = snapshot.videos.clone();
                for v in fresh.iter_mut() {
                    if !v.path.exists() {
                        warn!("missing video file: {}", v.path.display());
                    }
                }
                persistence::remap_snapshot(&mut snapshot, &fresh);

                self.library.videos = fresh;
                self.registry
                    .replace(snapshot.tiers, snapshot.marker_types);
                self.store.set_markers(snapshot.markers);
                self.store.set_spans(snapshot.spans);
                if let Some(id) = snapshot.current_video_id {
                    self.activate_video(id);
                }
                self.status_bar.notify(format!(
                    "Session restored (saved {})",
                    snapshot.saved_at.format("%Y-%m-%d %H:%M")
                ));
            }
            Ok(None) => info!("no previous session"),
            Err(e) => {
                error!("session restore failed: {e:#}");
                self.status_bar
                    .notify("Previous session could not be read - starting clean");
            }
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            videos: self.library.videos.clone(),
            // Pending markers are transient interaction state.
            markers: self
                .store
                .markers()
                .iter()
                .filter(|m| m.confirmed)
                .cloned()
                .collect(),
            spans: self.store.spans().to_vec(),
            tiers: self.registry.tiers().cloned().collect(),
            marker_types: self.registry.types().cloned().collect(),
            current_video_id: self.player.video_id(),
            saved_at: Utc::now(),
        }
    }

    pub fn save_session(&mut self) {
        if let Err(e) = persistence::save(&self.session_path, &self.snapshot()) {
            error!("autosave failed: {e:#}");
            self.status_bar.notify("Autosave failed - check disk space");
        }
    }

    /// Switch the active video: cancels the drag session and discards any
    /// hold-key tracking, whose context no longer exists.
    pub fn activate_video(&mut self, id: Uuid) {
        if self.player.video_id() == Some(id) {
            return;
        }
        self.hold_keys.video_switched();
        self.timeline_state.drag = None;
        self.timeline_state.editing_span = None;
        self.store.cancel_pending_marker();
        self.store.selected_marker = None;
        self.store.selected_span = None;

        let Some(entry) = self.library.get_mut(id) else {
            return;
        };
        if entry.status == VideoStatus::Fresh {
            entry.status = VideoStatus::InProgress;
        }
        // Unknown duration (no media adapter yet): assume an hour so
        // annotation is never blocked; seeks clamp once the real duration
        // is reported.
        let duration_s = if entry.duration_ms > 0 {
            entry.duration_ms as f64 / 1000.0
        } else {
            3600.0
        };
        let name = entry.name.clone();
        self.player.set_video(Some(id), duration_s);
        self.timeline_state.mark_dirty();
        info!("active video: {name}");
    }

    /// Mark the current video done and move to the next not-done one.
    pub fn finish_current_video(&mut self) {
        let Some(current) = self.player.video_id() else {
            return;
        };
        if let Some(entry) = self.library.get_mut(current) {
            entry.status = VideoStatus::Done;
        }
        match self.library.next_not_done(current) {
            Some(next) => {
                self.activate_video(next);
                self.status_bar.notify("Video done - moved to the next one");
            }
            None => self.status_bar.notify("Video done - nothing left to annotate"),
        }
    }

    fn drain_api_commands(&mut self) {
        let Some(rx) = &self.api_commands else { return };
        let commands: Vec<ApiCommand> = rx.try_iter().collect();
        for cmd in commands {
            match cmd {
                ApiCommand::ScanPath(dir) => {
                    match self.library.scan_folder(std::path::Path::new(&dir)) {
                        Ok(n) => self.status_bar.notify(format!("Scanned {n} video(s) from {dir}")),
                        Err(e) => self.status_bar.notify(format!("Scan failed: {e}")),
                    }
                    self.timeline_state.mark_dirty();
                }
            }
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect()
        });
        if dropped.is_empty() {
            return;
        }
        let before = self.library.videos.len();
        let mut files = Vec::new();
        for path in dropped {
            if path.is_dir() {
                if let Err(e) = self.library.scan_folder(&path) {
                    warn!("failed scanning {}: {e}", path.display());
                }
            } else {
                files.push(path);
            }
        }
        self.library.scan_file_list(files);
        let added = self.library.videos.len() - before;
        self.status_bar.notify(format!("Added {added} video(s)"));
        if self.player.video_id().is_none()
            && let Some(first) = self.library.videos.first().map(|v| v.id)
        {
            self.activate_video(first);
        }
        self.timeline_state.mark_dirty();
    }
}

impl eframe::App for GlossaApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_api_commands();
        self.handle_dropped_files(ctx);

        // Advance the playback clock; a stop mid-hold force-finalizes.
        self.player.update();
        if self.was_playing && !self.player.is_playing() {
            self.hold_keys
                .playback_stopped(&mut self.store, &self.registry, &mut self.player);
        }
        self.was_playing = self.player.is_playing();

        // Apply everything the widgets dispatched last frame.
        events::drain(self);

        // Keyboard is ignored while a text field has focus or a popup is up.
        if !ctx.wants_keyboard_input() {
            keys::handle_keyboard(self, ctx);
        }

        // Store mutations feed the dirty flag and the autosave debounce.
        if self.store.rev() != self.timeline_state.seen_rev {
            self.timeline_state.seen_rev = self.store.rev();
            self.timeline_state.mark_dirty();
        }
        if self.store.rev() != self.saved_rev {
            self.saved_rev = self.store.rev();
            self.autosaver.note_change();
        }
        if self.autosaver.tick() {
            self.save_session();
        }

        // ========== Layout ==========
        let video_id = self.player.video_id();

        menu::render_menu(self, ctx);

        egui::SidePanel::left("video_panel")
            .default_width(220.0)
            .show(ctx, |ui| {
                let bus = self.event_bus.clone();
                video_list::render(ui, &self.library, &self.player, |e| bus.emit_boxed(e));
            });

        self.status_bar.render(
            ctx,
            &self.player,
            &self.store,
            &self.registry,
            &self.library,
        );

        let tier_rows = self.registry.tiers().filter(|t| t.visible).count().max(1);
        let timeline_height = self.timeline_config.ruler_height
            + self.timeline_config.minimap_height
            + tier_rows as f32 * self.timeline_config.tier_height
            + 16.0;
        egui::TopBottomPanel::bottom("timeline_panel")
            .exact_height(timeline_height.min(ctx.screen_rect().height() * 0.6))
            .show(ctx, |ui| {
                let Some(video_id) = video_id else {
                    ui.centered_and_justified(|ui| {
                        ui.label("Select a video to start annotating");
                    });
                    return;
                };
                ui.horizontal_top(|ui| {
                    ui.vertical(|ui| {
                        ui.set_width(self.timeline_config.name_column_width);
                        timeline::render_tier_column(
                            ui,
                            &mut self.registry,
                            &self.timeline_config,
                            &mut self.timeline_state,
                        );
                    });
                    let bus = self.event_bus.clone();
                    timeline::render_canvas(
                        ui,
                        &self.store,
                        &self.registry,
                        &self.player,
                        video_id,
                        &self.timeline_config,
                        &mut self.timeline_state,
                        |e| bus.emit_boxed(e),
                    );
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            let bus = self.event_bus.clone();
            viewport::render(ui, &self.player, |e| bus.emit_boxed(e));
        });

        if self.show_help {
            help::render_help_window(ctx, &mut self.show_help);
        }

        // Dirty-gated repaint: paint continuously only while something is
        // actually moving (playback, drag, scroll interpolation, edits).
        let busy = self.player.is_playing()
            || self.timeline_state.drag.is_some()
            || self.event_bus.queue_len() > 0
            || self.timeline_state.pending_click.is_some()
            || self.autosaver.is_pending();
        if self.timeline_state.dirty || busy {
            self.timeline_state.dirty = false;
            ctx.request_repaint();
        }
    }

    fn save(&mut self, _storage: &mut dyn eframe::Storage) {
        // Synchronous best-effort save path (page-unload equivalent).
        self.autosaver.force();
        self.save_session();
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.autosaver.force();
        self.save_session();
        info!("session saved on exit");
    }
}
