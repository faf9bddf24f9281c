use glossa::app::GlossaApp;
use glossa::cli::Args;
use glossa::config;
use glossa::services::server::ApiServer;

use clap::Parser;
use eframe::egui;
use log::{info, warn};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments first (needed for log setup)
    let args = Args::parse();

    // Create path configuration from CLI args and environment
    let path_config = config::PathConfig::from_env_and_cli(args.config_dir.clone());
    if let Err(e) = config::ensure_dirs(&path_config) {
        eprintln!("Warning: failed to create application directories: {e}");
    }

    // Determine log level based on verbosity flags
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    if let Some(log_path_opt) = &args.log_file {
        let log_path = log_path_opt
            .as_ref()
            .cloned()
            .unwrap_or_else(|| path_config.data_file("glossa.log"));
        let file = std::fs::File::create(&log_path)?;
        env_logger::Builder::new()
            .filter_level(log_level)
            .filter_module("egui", log::LevelFilter::Info) // Suppress egui DEBUG spam
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();
        info!("logging to file: {} ({:?})", log_path.display(), log_level);
    } else {
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .filter_module("egui", log::LevelFilter::Info)
            .format_timestamp_millis()
            .init();
    }

    info!("glossa annotation tool starting...");

    // Crash path: annotations are autosaved continuously, so point the
    // user at the session file instead of losing the report in a backtrace.
    let session_path = path_config.session_file();
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        eprintln!(
            "glossa crashed. Your annotations were last autosaved to {}",
            session_path.display()
        );
        default_hook(info);
    }));

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(format!(
                "glossa v{} • F1 for help",
                env!("CARGO_PKG_VERSION")
            ))
            .with_inner_size(egui::vec2(1440.0, 860.0))
            .with_resizable(true)
            .with_drag_and_drop(true)
            .with_fullscreen(args.fullscreen),
        persist_window: true,
        persistence_path: Some(path_config.config_file("glossa.ron")),
        ..Default::default()
    };

    eframe::run_native(
        "glossa",
        native_options,
        Box::new(move |_cc| {
            let mut app = GlossaApp::new(&path_config, !args.no_restore);

            // Dev remote API (opt-in)
            if let Some(port) = args.remote {
                app.api_commands = Some(ApiServer::start(port));
                info!("remote API enabled on port {port}");
            }

            // CLI inputs take priority over the restored video list.
            if let Some(folder) = &args.folder {
                if let Err(e) = app.library.scan_folder(folder) {
                    warn!("failed to scan {}: {e}", folder.display());
                }
            }
            if !args.files.is_empty() {
                app.library.scan_file_list(args.files.clone());
            }
            if app.player.video_id().is_none()
                && let Some(first) = app.library.videos.first().map(|v| v.id)
            {
                app.activate_video(first);
            }

            Ok(Box::new(app))
        }),
    )?;

    info!("application exiting");
    Ok(())
}
