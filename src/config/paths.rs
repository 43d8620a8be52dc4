//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\pipeplay\
//!   macOS:   ~/Library/Application Support/pipeplay/
//!   Linux:   ~/.config/pipeplay/
//!
//! Data dir (phrase cache):
//!   Windows: %LOCALAPPDATA%\pipeplay\
//!   macOS:   ~/Library/Application Support/pipeplay/
//!   Linux:   ~/.local/share/pipeplay/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory for cached data.
    pub data_dir: PathBuf,
    /// Default directory for cached phrase recordings.
    pub phrase_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "pipeplay";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self {
            settings_file: config_dir.join("settings.toml"),
            phrase_dir: data_dir.join("phrase"),
            config_dir,
            data_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_non_empty() {
        let paths = AppPaths::new();
        assert!(paths.config_dir.to_str().is_some_and(|s| !s.is_empty()));
        assert!(paths
            .settings_file
            .file_name()
            .is_some_and(|n| n == "settings.toml"));
        assert!(paths.phrase_dir.ends_with("pipeplay/phrase"));
    }
}
