//! Generation service collaborators.
//!
//! This module provides:
//! * [`GenerationService`]: async trait for the video and speech calls.
//! * [`GeminiClient`]: HTTP implementation against the Gemini API.
//! * [`CredentialGate`]: "is a key selected / let the user pick one".
//! * [`ApiKeyStore`] / [`KeyStoreGate`]: shared key slot + terminal prompt.
//! * [`ServiceError`]: error variants for collaborator calls.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use veo_studio::config::AppConfig;
//! use veo_studio::generation::{AspectRatio, Resolution, VeoModel};
//! use veo_studio::service::{ApiKeyStore, GeminiClient, GenerationService, VideoCall};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let keys = ApiKeyStore::from_config(&config.api);
//!     let client = GeminiClient::from_config(&config, keys);
//!
//!     let call = VideoCall::new(VeoModel::Fast, "a paper boat in the rain")
//!         .shape(AspectRatio::Landscape, Resolution::P720);
//!     let video = client.generate_video(&call).await.unwrap();
//!     println!("{} bytes from {}", video.payload.len(), video.resource.as_str());
//! }
//! ```

pub mod credentials;
pub mod gemini;

use async_trait::async_trait;
use thiserror::Error;

use crate::generation::{
    AspectRatio, MediaAttachment, Resolution, VeoModel, VideoHandle, VideoResource,
};

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use credentials::{ApiKeyStore, CredentialGate, KeyStoreGate};
pub use gemini::GeminiClient;

// ---------------------------------------------------------------------------
// ServiceError
// ---------------------------------------------------------------------------

/// Errors returned by collaborator calls.
///
/// `Display` output is what the failure classifier inspects, so API errors
/// keep the upstream status and message verbatim.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No API key is available.
    #[error("API key not configured")]
    MissingApiKey,

    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The service answered with an error body.
    #[error("{status}: {message}")]
    Api { status: String, message: String },

    /// The response could not be parsed as expected JSON.
    #[error("failed to parse service response: {0}")]
    Parse(String),

    /// The response parsed but lacked the expected content.
    #[error("service response has no {0}")]
    MissingContent(&'static str),
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        ServiceError::Request(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// VideoCall / VideoArtifact
// ---------------------------------------------------------------------------

/// Everything the video call needs, already resolved from the request.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoCall {
    pub model: VeoModel,
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
    pub start_frame: Option<MediaAttachment>,
    pub end_frame: Option<MediaAttachment>,
    /// Subject/asset references.
    pub reference_images: Vec<MediaAttachment>,
    /// Style reference.
    pub style_image: Option<MediaAttachment>,
    /// Video to continue (extend mode).
    pub prior_video: Option<VideoHandle>,
}

impl VideoCall {
    pub fn new(model: VeoModel, prompt: impl Into<String>) -> Self {
        Self {
            model,
            prompt: prompt.into(),
            aspect_ratio: AspectRatio::default(),
            resolution: Resolution::default(),
            start_frame: None,
            end_frame: None,
            reference_images: Vec::new(),
            style_image: None,
            prior_video: None,
        }
    }

    pub fn shape(mut self, aspect_ratio: AspectRatio, resolution: Resolution) -> Self {
        self.aspect_ratio = aspect_ratio;
        self.resolution = resolution;
        self
    }
}

/// Output of a successful video call.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoArtifact {
    pub handle: VideoHandle,
    pub resource: VideoResource,
    pub payload: Vec<u8>,
}

// ---------------------------------------------------------------------------
// GenerationService trait
// ---------------------------------------------------------------------------

/// The remote generation service.
///
/// Implementors must be `Send + Sync` so they can be shared behind an `Arc`.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Generate one video and return it with its chaining handle.
    async fn generate_video(&self, call: &VideoCall) -> Result<VideoArtifact, ServiceError>;

    /// Synthesize `dialogue` in `tone`; returns base64 s16le PCM.
    async fn generate_speech(&self, dialogue: &str, tone: &str) -> Result<String, ServiceError>;
}

#[async_trait]
impl<T: GenerationService + ?Sized> GenerationService for std::sync::Arc<T> {
    async fn generate_video(&self, call: &VideoCall) -> Result<VideoArtifact, ServiceError> {
        (**self).generate_video(call).await
    }

    async fn generate_speech(&self, dialogue: &str, tone: &str) -> Result<String, ServiceError> {
        (**self).generate_speech(dialogue, tone).await
    }
}
