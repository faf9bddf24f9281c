//! Application paths - config and data directories.
//!
//! Resolution order: explicit CLI override, `GLOSSA_CONFIG_DIR`
//! environment variable, then the platform defaults from `dirs-next`.

use std::path::PathBuf;

const APP_DIR: &str = "glossa";

#[derive(Debug, Clone)]
pub struct PathConfig {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl PathConfig {
    pub fn from_env_and_cli(cli_override: Option<PathBuf>) -> Self {
        if let Some(dir) = cli_override.or_else(|| std::env::var_os("GLOSSA_CONFIG_DIR").map(PathBuf::from)) {
            return Self {
                config_dir: dir.clone(),
                data_dir: dir,
            };
        }
        let config_dir = dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);
        let data_dir = dirs_next::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);
        Self { config_dir, data_dir }
    }

    /// The session snapshot file.
    pub fn session_file(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }

    pub fn config_file(&self, name: &str) -> PathBuf {
        self.config_dir.join(name)
    }

    pub fn data_file(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }
}

/// Create the application directories if missing.
pub fn ensure_dirs(paths: &PathConfig) -> std::io::Result<()> {
    std::fs::create_dir_all(&paths.config_dir)?;
    std::fs::create_dir_all(&paths.data_dir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_override_wins() {
        let paths = PathConfig::from_env_and_cli(Some(PathBuf::from("/tmp/custom")));
        assert_eq!(paths.config_dir, PathBuf::from("/tmp/custom"));
        assert_eq!(paths.session_file(), PathBuf::from("/tmp/custom/session.json"));
    }
}
