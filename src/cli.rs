use clap::Parser;
use std::path::PathBuf;

/// Sign-language video annotation tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Folder of videos to open - optional, can also drag-and-drop
    #[arg(value_name = "FOLDER")]
    pub folder: Option<PathBuf>,

    /// Additional video files to load (can be specified multiple times)
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Start in fullscreen mode
    #[arg(short = 'F', long = "fullscreen")]
    pub fullscreen: bool,

    /// Skip restoring the previous session
    #[arg(long = "no-restore")]
    pub no_restore: bool,

    /// Start the dev remote API server on this port
    #[arg(long = "remote", value_name = "PORT")]
    pub remote: Option<u16>,

    /// Enable debug logging to file (default: glossa.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}
