//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout (models only — nothing else is persisted):
//!
//!   Windows: %LOCALAPPDATA%\voxask\models\
//!   macOS:   ~/Library/Application Support/voxask/models/
//!   Linux:   ~/.local/share/voxask/models/

use std::path::PathBuf;

/// Holds the resolved application directories.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for downloaded GGML model files.
    pub models_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "voxask";

    /// Resolves paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path (should be extremely rare in practice).
    pub fn new() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self {
            models_dir: data_dir.join("models"),
        }
    }

    /// Full path of a GGML model file given its stem (e.g. `"base.en"`).
    pub fn model_file(&self, stem: &str) -> PathBuf {
        self.models_dir.join(format!("{stem}.bin"))
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
