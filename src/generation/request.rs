//! Generation request / result data model.
//!
//! [`GenerationRequest`] is what the form submits; [`GenerationResult`] is what
//! a successful attempt hands back to the session.  The request mode is a
//! tagged enum ([`GenerationMode`]) so every orchestration step can match on it
//! exhaustively; the `ExtendVideo` variant carries the prior video it continues
//! from, which makes "extend without a prior video" unrepresentable.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::audio::AudioBuffer;

// ---------------------------------------------------------------------------
// AspectRatio
// ---------------------------------------------------------------------------

/// Output frame shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 16:9
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    /// 9:16
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    /// Wire value understood by the generation service.
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "16:9" | "landscape" => Ok(AspectRatio::Landscape),
            "9:16" | "portrait" | "vertical" => Ok(AspectRatio::Portrait),
            other => Err(format!("unknown aspect ratio `{other}` (expected 16:9 or 9:16)")),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Target output resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
}

impl Resolution {
    /// The only tier the service accepts as the source of an extension.
    pub const EXTEND_TIER: Resolution = Resolution::P720;

    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::P720 => "720p",
            Resolution::P1080 => "1080p",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "720p" | "720" => Ok(Resolution::P720),
            "1080p" | "1080" => Ok(Resolution::P1080),
            other => Err(format!("unknown resolution `{other}` (expected 720p or 1080p)")),
        }
    }
}

// ---------------------------------------------------------------------------
// VeoModel
// ---------------------------------------------------------------------------

/// Video model selection.
///
/// | Variant   | Model id                         |
/// |-----------|----------------------------------|
/// | `Fast`    | `veo-3.1-fast-generate-preview`  |
/// | `Quality` | `veo-3.1-generate-preview`       |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VeoModel {
    #[default]
    Fast,
    Quality,
}

impl VeoModel {
    pub fn model_id(&self) -> &'static str {
        match self {
            VeoModel::Fast => "veo-3.1-fast-generate-preview",
            VeoModel::Quality => "veo-3.1-generate-preview",
        }
    }
}

impl FromStr for VeoModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" | "veo-3.1-fast-generate-preview" => Ok(VeoModel::Fast),
            "quality" | "veo-3.1-generate-preview" => Ok(VeoModel::Quality),
            other => Err(format!("unknown model `{other}` (expected fast or quality)")),
        }
    }
}

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

/// Inline media (image frame, reference image, or a wrapped video).
#[derive(Clone, PartialEq)]
pub struct MediaAttachment {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl MediaAttachment {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }
}

// Payloads can be megabytes; print the size only.
impl fmt::Debug for MediaAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaAttachment")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Opaque service-side reference to a generated video, used to chain extends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoHandle(pub String);

impl VideoHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Where the generated video can be played or fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoResource(pub String);

impl VideoResource {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// GenerationMode
// ---------------------------------------------------------------------------

/// What kind of attempt a request describes.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationMode {
    /// Plain prompt → video.
    TextToVideo,
    /// Prompt holds an embedded story script; produces video + speech.
    StoryToVideo,
    /// Continue a previously generated video.
    ExtendVideo {
        /// Handle of the video being continued.
        prior_video: VideoHandle,
        /// The prior video's bytes, wrapped as an input attachment.
        input_video: MediaAttachment,
    },
}

impl GenerationMode {
    pub fn label(&self) -> &'static str {
        match self {
            GenerationMode::TextToVideo => "Text to Video",
            GenerationMode::StoryToVideo => "Story to Video",
            GenerationMode::ExtendVideo { .. } => "Extend Video",
        }
    }
}

// ---------------------------------------------------------------------------
// GenerationRequest
// ---------------------------------------------------------------------------

/// Everything the user submitted for one attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub mode: GenerationMode,
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
    pub model: VeoModel,
    pub start_frame: Option<MediaAttachment>,
    pub end_frame: Option<MediaAttachment>,
    pub reference_images: Vec<MediaAttachment>,
    pub style_image: Option<MediaAttachment>,
    /// Reuse the start frame as the end frame when no end frame is given.
    pub is_looping: bool,
}

impl GenerationRequest {
    /// A `TextToVideo` request with default shape and model.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self::with_mode(GenerationMode::TextToVideo, prompt)
    }

    /// A `StoryToVideo` request; `prompt` must embed a story script.
    pub fn story(prompt: impl Into<String>) -> Self {
        Self::with_mode(GenerationMode::StoryToVideo, prompt)
    }

    fn with_mode(mode: GenerationMode, prompt: impl Into<String>) -> Self {
        Self {
            mode,
            prompt: prompt.into(),
            aspect_ratio: AspectRatio::default(),
            resolution: Resolution::default(),
            model: VeoModel::default(),
            start_frame: None,
            end_frame: None,
            reference_images: Vec::new(),
            style_image: None,
            is_looping: false,
        }
    }

    pub fn aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn model(mut self, model: VeoModel) -> Self {
        self.model = model;
        self
    }

    /// Resolution actually sent to the service.
    ///
    /// Extensions are always produced at [`Resolution::EXTEND_TIER`].
    ///
    /// ```
    /// use veo_studio::generation::{GenerationRequest, Resolution};
    ///
    /// let req = GenerationRequest::text("a fox").resolution(Resolution::P1080);
    /// assert_eq!(req.effective_resolution(), Resolution::P1080);
    /// ```
    pub fn effective_resolution(&self) -> Resolution {
        match self.mode {
            GenerationMode::ExtendVideo { .. } => Resolution::EXTEND_TIER,
            GenerationMode::TextToVideo | GenerationMode::StoryToVideo => self.resolution,
        }
    }

    /// Gate for offering "extend" on this request's result.
    pub fn can_extend(&self) -> bool {
        self.resolution == Resolution::EXTEND_TIER
    }

    /// Prior video handle, present only for `ExtendVideo`.
    pub fn prior_video(&self) -> Option<&VideoHandle> {
        match &self.mode {
            GenerationMode::ExtendVideo { prior_video, .. } => Some(prior_video),
            GenerationMode::TextToVideo | GenerationMode::StoryToVideo => None,
        }
    }
}

// ---------------------------------------------------------------------------
// GenerationResult
// ---------------------------------------------------------------------------

/// Output of one successful attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult {
    pub video_handle: VideoHandle,
    pub video_resource: VideoResource,
    /// Raw video bytes, re-wrapped as the input of an extend request.
    pub video_payload: Vec<u8>,
    /// Decoded speech track; only story attempts produce one.
    pub audio: Option<AudioBuffer>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
