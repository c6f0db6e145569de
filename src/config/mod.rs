//! Configuration module for voxask.
//!
//! Provides `AppConfig` (top-level settings read from the environment),
//! sub-configs for each subsystem, and `AppPaths` for the cross-platform
//! model directory. Nothing is persisted: configuration is read once at
//! startup and session state lives in memory only.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, CompletionConfig, GateConfig, SearchConfig, SttBackend, SttConfig,
};
