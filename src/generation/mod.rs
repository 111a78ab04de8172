//! Generation module: request model, story parsing, failure classification,
//! extend chaining and the attempt orchestrator.
//!
//! # Architecture
//!
//! ```text
//! GenerationRequest ──▶ Orchestrator::generate()
//!                          │
//!                          ├─ TextToVideo  → video call
//!                          ├─ StoryToVideo → StoryScript + infer_aspect_ratio
//!                          │                 → try_join!(video, speech)
//!                          │                 → decode_base64_pcm16
//!                          └─ ExtendVideo  → video call (prior handle, 720p)
//!                          │
//!                          ├─ Ok  → GenerationResult
//!                          └─ Err → classify() → ClassifiedFailure
//!
//! (GenerationRequest, GenerationResult) ──▶ build_extend_request() ──▶ next pre-fill
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use veo_studio::config::AppConfig;
//! use veo_studio::generation::{build_extend_request, GenerationRequest, Orchestrator};
//! use veo_studio::service::{ApiKeyStore, GeminiClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let client = GeminiClient::from_config(&config, ApiKeyStore::from_config(&config.api));
//!     let orchestrator = Orchestrator::new(client);
//!
//!     let first = GenerationRequest::text("a paper boat drifting down a gutter");
//!     let result = orchestrator.generate(&first).await.unwrap();
//!
//!     let mut next = build_extend_request(&first, &result);
//!     next.prompt = "the boat reaches a river".into();
//!     let extended = orchestrator.generate(&next).await.unwrap();
//!     println!("{}", extended.video_resource.as_str());
//! }
//! ```

pub mod error;
pub mod extend;
pub mod orchestrator;
pub mod request;
pub mod story;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use error::{
    classify, classify_message, CallKind, Classification, ClassifiedFailure, FailureKind,
    GenerationError,
};
pub use extend::{build_extend_request, EXTEND_INPUT_MIME};
pub use orchestrator::{
    plan_attempt, AttemptPlan, Orchestrator, SpeechCall, SPEECH_CHANNELS, SPEECH_SAMPLE_RATE,
};
pub use request::{
    AspectRatio, GenerationMode, GenerationRequest, GenerationResult, MediaAttachment,
    Resolution, VeoModel, VideoHandle, VideoResource,
};
pub use story::{infer_aspect_ratio, StoryError, StoryScript, DEFAULT_TONE};
