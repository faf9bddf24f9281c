//! Keyboard help overlay.
//!
//! Marker-type keys come from the tier setup and are shown in the tier
//! column; this window lists the fixed bindings.

use eframe::egui;

/// Single help entry (key binding + description)
#[derive(Clone, Debug)]
pub struct HelpEntry {
    pub key: &'static str,
    pub desc: &'static str,
}

impl HelpEntry {
    pub const fn new(key: &'static str, desc: &'static str) -> Self {
        Self { key, desc }
    }
}

pub const PLAYBACK_HELP: &[HelpEntry] = &[
    HelpEntry::new("Space", "Pause + place marker / resume"),
    HelpEntry::new("Left/Right", "Step 1 frame (or nudge pending marker)"),
    HelpEntry::new("Shift+Arrows", "Nudge selected marker (coarse)"),
    HelpEntry::new("Alt+Arrows", "Nudge selected marker (fine)"),
    HelpEntry::new("[ / ]", "Playback speed down / up"),
    HelpEntry::new("Ctrl+L", "Loop the selected span"),
    HelpEntry::new("+ / -", "Timeline zoom in / out"),
];

pub const ANNOTATION_HELP: &[HelpEntry] = &[
    HelpEntry::new("type key (tap)", "Confirm pending / place marker / auto-pair"),
    HelpEntry::new("type key (hold)", "Mark a duration span while playing"),
    HelpEntry::new("Enter", "Place unconfirmed marker, pause"),
    HelpEntry::new("Ctrl+Enter", "Mark video done, go to next"),
    HelpEntry::new("g", "Span from selected marker to next marker"),
    HelpEntry::new("n / Shift+N", "Jump to next / previous marker"),
    HelpEntry::new("`", "Cycle active tier"),
    HelpEntry::new("Delete", "Delete selected span or marker"),
    HelpEntry::new("Ctrl+Z / Ctrl+Y", "Undo / redo"),
];

pub const POINTER_HELP: &[HelpEntry] = &[
    HelpEntry::new("Ruler drag", "Scrub"),
    HelpEntry::new("Marker (top half)", "Resize span / drag out a new span"),
    HelpEntry::new("Marker (bottom half)", "Move marker"),
    HelpEntry::new("Span edge", "Resize (snap to neighbor = merge)"),
    HelpEntry::new("Span body", "Move span"),
    HelpEntry::new("Empty tier", "Draw span"),
    HelpEntry::new("Double-click span", "Edit gloss"),
    HelpEntry::new("Wheel", "Zoom at cursor"),
];

pub fn render_help_window(ctx: &egui::Context, open: &mut bool) {
    egui::Window::new("Keyboard & mouse")
        .open(open)
        .collapsible(false)
        .resizable(false)
        .show(ctx, |ui| {
            for (title, entries) in [
                ("Playback", PLAYBACK_HELP),
                ("Annotation", ANNOTATION_HELP),
                ("Pointer", POINTER_HELP),
            ] {
                ui.heading(title);
                egui::Grid::new(title).num_columns(2).striped(true).show(ui, |ui| {
                    for entry in entries {
                        ui.monospace(entry.key);
                        ui.label(entry.desc);
                        ui.end_row();
                    }
                });
                ui.add_space(8.0);
            }
        });
}
