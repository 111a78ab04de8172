//! Configuration module for Veo Studio.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for the service
//! connection, video defaults, speech voice and output location, `AppPaths`
//! for cross-platform directories, and TOML persistence via
//! `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{ApiConfig, AppConfig, OutputConfig, SpeechConfig, VideoConfig};
