//! Configuration module for pipeplay.
//!
//! Provides `AppConfig` (top-level settings), one sub-config per demo,
//! `AppPaths` for cross-platform directories, and TOML persistence via
//! `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, EspeakConfig, PhraseConfig, ProbeConfig, RadioConfig, SpeechConfig, SpeechMode,
    TranscodeConfig,
};
