//! Top menu bar - file dialogs and interchange actions.
//!
//! Everything here is I/O-adjacent and fails open: errors become status
//! notices, annotation state is never touched on failure.

use super::GlossaApp;
use crate::services::{elan, export, library};
use eframe::egui;
use log::error;
use std::path::Path;

pub fn render_menu(app: &mut GlossaApp, ctx: &egui::Context) {
    egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
        egui::MenuBar::new().ui(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("Open folder…").clicked() {
                    ui.close();
                    open_folder(app);
                }
                if ui.button("Add video files…").clicked() {
                    ui.close();
                    add_files(app);
                }
                ui.separator();
                if ui.button("Export CSV…").clicked() {
                    ui.close();
                    export_text(app, "csv");
                }
                if ui.button("Export JSON…").clicked() {
                    ui.close();
                    export_text(app, "json");
                }
                ui.separator();
                if ui.button("Export ELAN (.eaf)…").clicked() {
                    ui.close();
                    export_eaf(app);
                }
                if ui.button("Import ELAN (.eaf)…").clicked() {
                    ui.close();
                    import_eaf(app);
                }
                if ui.button("Inspect EAF tiers…").clicked() {
                    ui.close();
                    inspect_eaf(app);
                }
            });
            ui.menu_button("Edit", |ui| {
                if ui
                    .add_enabled(app.store.can_undo(), egui::Button::new("Undo"))
                    .clicked()
                {
                    ui.close();
                    app.timeline_state.drag = None;
                    app.store.undo();
                }
                if ui
                    .add_enabled(app.store.can_redo(), egui::Button::new("Redo"))
                    .clicked()
                {
                    ui.close();
                    app.timeline_state.drag = None;
                    app.store.redo();
                }
            });
            ui.menu_button("Help", |ui| {
                if ui.button("Keyboard reference (F1)").clicked() {
                    ui.close();
                    app.show_help = true;
                }
            });
        });
    });
}

fn open_folder(app: &mut GlossaApp) {
    let Some(dir) = rfd::FileDialog::new().pick_folder() else {
        return;
    };
    match app.library.scan_folder(&dir) {
        Ok(n) => app.status_bar.notify(format!("Found {n} video(s)")),
        Err(e) => app.status_bar.notify(format!("Scan failed: {e}")),
    }
    if app.player.video_id().is_none()
        && let Some(first) = app.library.videos.first().map(|v| v.id)
    {
        app.activate_video(first);
    }
    app.timeline_state.mark_dirty();
}

fn add_files(app: &mut GlossaApp) {
    let Some(files) = rfd::FileDialog::new()
        .add_filter("Videos", library::VIDEO_EXTENSIONS)
        .pick_files()
    else {
        return;
    };
    let n = app.library.scan_file_list(files);
    app.status_bar.notify(format!("Added {n} video(s)"));
    app.timeline_state.mark_dirty();
}

/// Per-video annotation slices for the exporters.
fn active_annotations(app: &GlossaApp) -> Option<(uuid::Uuid, String)> {
    let video_id = app.player.video_id()?;
    let name = app.library.get(video_id)?.name.clone();
    Some((video_id, name))
}

fn default_export_path(app: &GlossaApp, video_name: &str, suffix: &str, ext: &str) -> Option<std::path::PathBuf> {
    let video_id = app.player.video_id()?;
    let dir = app
        .library
        .get(video_id)
        .and_then(|v| v.path.parent().map(Path::to_path_buf))?;
    let stem = Path::new(video_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("annotations");
    Some(library::unique_output_path(&dir, stem, suffix, ext))
}

fn export_text(app: &mut GlossaApp, ext: &str) {
    let Some((video_id, video_name)) = active_annotations(app) else {
        app.status_bar.notify("No active video to export");
        return;
    };
    let markers: Vec<_> = app
        .store
        .markers()
        .iter()
        .filter(|m| m.video_id == video_id)
        .cloned()
        .collect();
    let spans: Vec<_> = app
        .store
        .spans()
        .iter()
        .filter(|s| s.video_id == video_id)
        .cloned()
        .collect();
    let content = match ext {
        "csv" => export::to_csv(&markers, &spans, &app.registry),
        _ => export::to_json(&markers, &spans, &app.registry),
    };

    let default = default_export_path(app, &video_name, "annotations", ext);
    let mut dialog = rfd::FileDialog::new().add_filter(ext.to_uppercase(), &[ext]);
    if let Some(path) = &default {
        if let Some(dir) = path.parent() {
            dialog = dialog.set_directory(dir);
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            dialog = dialog.set_file_name(name);
        }
    }
    let Some(target) = dialog.save_file() else {
        return;
    };
    match std::fs::write(&target, content) {
        Ok(_) => app.status_bar.notify(format!("Exported {}", target.display())),
        Err(e) => {
            error!("export failed: {e}");
            app.status_bar.notify(format!("Export failed: {e}"));
        }
    }
}

/// Writes a fresh EAF, or merges into an existing one - foreign tiers and
/// their time slots survive, only our `dcal-` tiers are regenerated.
fn export_eaf(app: &mut GlossaApp) {
    let Some((video_id, video_name)) = active_annotations(app) else {
        app.status_bar.notify("No active video to export");
        return;
    };
    let markers: Vec<_> = app
        .store
        .markers()
        .iter()
        .filter(|m| m.video_id == video_id)
        .cloned()
        .collect();
    let spans: Vec<_> = app
        .store
        .spans()
        .iter()
        .filter(|s| s.video_id == video_id)
        .cloned()
        .collect();

    let Some(target) = rfd::FileDialog::new()
        .add_filter("ELAN", &["eaf"])
        .set_file_name(format!(
            "{}.eaf",
            Path::new(&video_name).file_stem().and_then(|s| s.to_str()).unwrap_or("annotations")
        ))
        .save_file()
    else {
        return;
    };

    let result = if target.exists() {
        std::fs::read_to_string(&target)
            .map_err(anyhow::Error::from)
            .and_then(|existing| {
                elan::merge_eaf(&existing, &markers, &spans, &app.registry, &video_name)
            })
    } else {
        Ok(elan::generate_eaf(&markers, &spans, &app.registry, &video_name))
    };
    match result.and_then(|xml| std::fs::write(&target, xml).map_err(anyhow::Error::from)) {
        Ok(_) => app.status_bar.notify(format!("Wrote {}", target.display())),
        Err(e) => {
            error!("EAF export failed: {e:#}");
            app.status_bar.notify("EAF export failed - existing file left untouched");
        }
    }
}

/// Read-only look at the foreign (non-`dcal-`) tiers of an EAF file.
fn inspect_eaf(app: &mut GlossaApp) {
    let Some(path) = rfd::FileDialog::new().add_filter("ELAN", &["eaf"]).pick_file() else {
        return;
    };
    let summary = std::fs::read_to_string(&path)
        .map_err(anyhow::Error::from)
        .and_then(|xml| elan::import_eaf_tiers(&xml));
    match summary {
        Ok(tiers) if tiers.is_empty() => {
            app.status_bar.notify("No external tiers in this file");
        }
        Ok(tiers) => {
            let names: Vec<String> = tiers
                .iter()
                .map(|t| format!("{} ({})", t.name, t.intervals.len()))
                .collect();
            app.status_bar
                .notify(format!("External tiers: {}", names.join(", ")));
        }
        Err(e) => {
            error!("EAF inspection failed: {e:#}");
            app.status_bar.notify("Could not read that EAF file");
        }
    }
}

/// Imports our `dcal-` tiers from an EAF. Only runs against a video with
/// no markers yet; a malformed file is rejected wholesale.
fn import_eaf(app: &mut GlossaApp) {
    let Some(video_id) = app.player.video_id() else {
        app.status_bar.notify("No active video to import into");
        return;
    };
    if app.store.markers().iter().any(|m| m.video_id == video_id) {
        app.status_bar
            .notify("Import skipped - this video already has annotations");
        return;
    }
    let Some(path) = rfd::FileDialog::new().add_filter("ELAN", &["eaf"]).pick_file() else {
        return;
    };
    let xml = match std::fs::read_to_string(&path) {
        Ok(xml) => xml,
        Err(e) => {
            app.status_bar.notify(format!("Cannot read file: {e}"));
            return;
        }
    };
    match elan::import_dcal_annotations(&xml, &app.registry, video_id) {
        Ok(imported) => {
            let mut tiers: Vec<_> = app.registry.tiers().cloned().collect();
            tiers.extend(imported.new_tiers);
            let types: Vec<_> = app.registry.types().cloned().collect();
            app.registry.replace(tiers, types);

            let mut markers = app.store.markers().to_vec();
            markers.extend(imported.markers);
            let mut spans = app.store.spans().to_vec();
            spans.extend(imported.spans);
            let (n_markers, n_spans) = (markers.len(), spans.len());
            app.store.set_markers(markers);
            app.store.set_spans(spans);
            app.status_bar
                .notify(format!("Imported {n_markers} marker(s), {n_spans} span(s)"));
            app.timeline_state.mark_dirty();
        }
        Err(e) => {
            error!("EAF import failed: {e:#}");
            app.status_bar.notify("EAF import failed - file rejected, nothing changed");
        }
    }
}
