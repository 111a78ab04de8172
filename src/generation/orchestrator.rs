//! Generation orchestrator: runs one attempt from request to result.
//!
//! # Attempt flow
//!
//! ```text
//! GenerationRequest
//!   └─▶ plan_attempt                       (pure: mode-specific input → calls)
//!         ├─ TextToVideo  → VideoCall
//!         ├─ StoryToVideo → StoryScript::extract
//!         │                 infer_aspect_ratio(image_prompt)
//!         │                 → VideoCall(image_prompt) + SpeechCall(dialogue, tone)
//!         └─ ExtendVideo  → VideoCall(prior video, extend tier)
//!   └─▶ video  ─┐
//!       speech ─┴─ try_join!               (all-or-nothing; first failure wins)
//!   └─▶ decode_base64_pcm16 @ 24 kHz mono  (story only)
//!   └─▶ GenerationResult
//! any failure ──▶ classify ──▶ ClassifiedFailure
//! ```
//!
//! The orchestrator holds no per-attempt state; the session stores results.

use std::fmt;

use crate::audio::decode_base64_pcm16;
use crate::service::{GenerationService, ServiceError, VideoArtifact, VideoCall};

use super::error::{classify, CallKind, ClassifiedFailure, GenerationError};
use super::request::{GenerationMode, GenerationRequest, GenerationResult};
use super::story::{infer_aspect_ratio, StoryScript};

/// Sample rate of synthesized speech.
pub const SPEECH_SAMPLE_RATE: u32 = 24_000;
/// Channel count of synthesized speech.
pub const SPEECH_CHANNELS: u16 = 1;

// ---------------------------------------------------------------------------
// AttemptPlan
// ---------------------------------------------------------------------------

/// Speech half of a story attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechCall {
    pub dialogue: String,
    pub tone: String,
}

/// The collaborator calls one request turns into.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptPlan {
    pub video: VideoCall,
    pub speech: Option<SpeechCall>,
}

/// Resolve `request` into the calls to issue.
///
/// Fails only on malformed input (story script, empty extend payload); no
/// collaborator is contacted.
pub fn plan_attempt(request: &GenerationRequest) -> Result<AttemptPlan, GenerationError> {
    let mut video = VideoCall::new(request.model, request.prompt.clone())
        .shape(request.aspect_ratio, request.effective_resolution());

    let speech = match &request.mode {
        GenerationMode::TextToVideo => {
            attach_media(&mut video, request);
            None
        }
        GenerationMode::StoryToVideo => {
            let script = StoryScript::extract(&request.prompt)?;
            video.aspect_ratio = infer_aspect_ratio(&script.image_prompt, request.aspect_ratio);
            video.prompt = script.image_prompt;
            attach_media(&mut video, request);
            Some(SpeechCall {
                dialogue: script.dialogue,
                tone: script.tone,
            })
        }
        GenerationMode::ExtendVideo {
            prior_video,
            input_video,
        } => {
            if input_video.bytes.is_empty() {
                return Err(GenerationError::InvalidRequest(
                    "extend request carries an empty prior video".into(),
                ));
            }
            video.prior_video = Some(prior_video.clone());
            None
        }
    };

    Ok(AttemptPlan { video, speech })
}

impl fmt::Display for AttemptPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "video call ({}, {}, {})",
            self.video.model.model_id(),
            self.video.aspect_ratio,
            self.video.resolution
        )?;
        if self.video.prior_video.is_some() {
            f.write_str(" extending prior video")?;
        }
        if self.speech.is_some() {
            f.write_str(" + speech call")?;
        }
        Ok(())
    }
}

fn attach_media(video: &mut VideoCall, request: &GenerationRequest) {
    video.start_frame = request.start_frame.clone();
    video.end_frame = match (&request.end_frame, request.is_looping) {
        (Some(end), _) => Some(end.clone()),
        (None, true) => request.start_frame.clone(),
        (None, false) => None,
    };
    video.reference_images = request.reference_images.clone();
    video.style_image = request.style_image.clone();
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Drives generation attempts against a [`GenerationService`].
///
/// ```rust,no_run
/// use veo_studio::config::AppConfig;
/// use veo_studio::generation::{GenerationRequest, Orchestrator};
/// use veo_studio::service::{ApiKeyStore, GeminiClient};
///
/// # async fn example() {
/// let config = AppConfig::default();
/// let client = GeminiClient::from_config(&config, ApiKeyStore::from_config(&config.api));
/// let orchestrator = Orchestrator::new(client);
///
/// match orchestrator.generate(&GenerationRequest::text("a paper boat")).await {
///     Ok(result) => println!("video at {}", result.video_resource.as_str()),
///     Err(failure) => eprintln!("{failure}"),
/// }
/// # }
/// ```
pub struct Orchestrator<S> {
    service: S,
}

impl<S: GenerationService> Orchestrator<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Run one attempt.  Every failure comes back classified.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, ClassifiedFailure> {
        log::info!("orchestrator: starting {} attempt", request.mode.label());

        match self.attempt(request).await {
            Ok(result) => {
                log::info!(
                    "orchestrator: attempt finished ({} video bytes, audio: {})",
                    result.video_payload.len(),
                    result.audio.is_some()
                );
                Ok(result)
            }
            Err(error) => {
                let failure = classify(error);
                log::error!(
                    "orchestrator: attempt failed ({:?}): {}",
                    failure.kind,
                    failure.error
                );
                Err(failure)
            }
        }
    }

    async fn attempt(&self, request: &GenerationRequest) -> Result<GenerationResult, GenerationError> {
        let plan = plan_attempt(request)?;
        log::info!("orchestrator: issuing {plan}");
        let AttemptPlan { video, speech } = plan;

        let (artifact, audio) = match speech {
            None => (self.call_video(&video).await?, None),
            Some(speech) => {
                let (artifact, encoded) =
                    tokio::try_join!(self.call_video(&video), self.call_speech(&speech))?;
                let audio = decode_base64_pcm16(&encoded, SPEECH_SAMPLE_RATE, SPEECH_CHANNELS)?;
                (artifact, Some(audio))
            }
        };

        Ok(GenerationResult {
            video_handle: artifact.handle,
            video_resource: artifact.resource,
            video_payload: artifact.payload,
            audio,
        })
    }

    async fn call_video(&self, call: &VideoCall) -> Result<VideoArtifact, GenerationError> {
        self.service
            .generate_video(call)
            .await
            .map_err(upstream(CallKind::Video))
    }

    async fn call_speech(&self, call: &SpeechCall) -> Result<String, GenerationError> {
        self.service
            .generate_speech(&call.dialogue, &call.tone)
            .await
            .map_err(upstream(CallKind::Speech))
    }
}

fn upstream(call: CallKind) -> impl Fn(ServiceError) -> GenerationError {
    move |e| GenerationError::Upstream {
        call,
        message: e.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use base64::{engine::general_purpose, Engine};

    use crate::generation::{
        AspectRatio, FailureKind, MediaAttachment, Resolution, StoryError, VeoModel,
        VideoHandle, VideoResource,
    };

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Base64 of four mono s16le samples: 16384, -16384, 0, 32767.
    pub(crate) fn speech_payload() -> String {
        let bytes: Vec<u8> = [16_384i16, -16_384, 0, 32_767]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        general_purpose::STANDARD.encode(bytes)
    }

    /// Scriptable service that records every call.
    pub(crate) struct MockService {
        pub video_error: Mutex<Option<(&'static str, &'static str)>>,
        pub speech_error: Option<(&'static str, &'static str)>,
        pub speech_payload: String,
        /// The video call never completes.
        pub video_hangs: bool,
        pub video_calls: Mutex<Vec<VideoCall>>,
        pub speech_calls: Mutex<Vec<(String, String)>>,
    }

    impl Default for MockService {
        fn default() -> Self {
            Self {
                video_error: Mutex::new(None),
                speech_error: None,
                speech_payload: speech_payload(),
                video_hangs: false,
                video_calls: Mutex::new(Vec::new()),
                speech_calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl MockService {
        pub(crate) fn failing_video(status: &'static str, message: &'static str) -> Self {
            Self {
                video_error: Mutex::new(Some((status, message))),
                ..Self::default()
            }
        }

        /// Make subsequent video calls fail with `status: message`.
        pub(crate) fn fail_video(&self, status: &'static str, message: &'static str) {
            *self.video_error.lock().unwrap() = Some((status, message));
        }

        /// Make subsequent video calls succeed.
        pub(crate) fn heal(&self) {
            *self.video_error.lock().unwrap() = None;
        }

        pub(crate) fn video_call_count(&self) -> usize {
            self.video_calls.lock().unwrap().len()
        }

        pub(crate) fn speech_call_count(&self) -> usize {
            self.speech_calls.lock().unwrap().len()
        }

        pub(crate) fn last_video_call(&self) -> Option<VideoCall> {
            self.video_calls.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl GenerationService for MockService {
        async fn generate_video(&self, call: &VideoCall) -> Result<VideoArtifact, ServiceError> {
            let n = {
                let mut calls = self.video_calls.lock().unwrap();
                calls.push(call.clone());
                calls.len()
            };
            if self.video_hangs {
                std::future::pending::<()>().await;
            }
            if let Some((status, message)) = *self.video_error.lock().unwrap() {
                return Err(ServiceError::Api {
                    status: status.into(),
                    message: message.into(),
                });
            }
            Ok(VideoArtifact {
                handle: VideoHandle(format!("files/video-{n}")),
                resource: VideoResource(format!("https://host/files/video-{n}:download")),
                payload: vec![0x42; 16],
            })
        }

        async fn generate_speech(&self, dialogue: &str, tone: &str) -> Result<String, ServiceError> {
            self.speech_calls
                .lock()
                .unwrap()
                .push((dialogue.to_string(), tone.to_string()));
            if let Some((status, message)) = self.speech_error {
                return Err(ServiceError::Api {
                    status: status.into(),
                    message: message.into(),
                });
            }
            Ok(self.speech_payload.clone())
        }
    }

    pub(crate) fn story_prompt(image_prompt: &str) -> String {
        format!(
            r#"{{"dialogue": "We made it.", "tone": "relieved", "image_prompt": "{image_prompt}"}}"#
        )
    }

    fn png() -> MediaAttachment {
        MediaAttachment::new(vec![1, 2, 3], "image/png")
    }

    // -----------------------------------------------------------------------
    // plan_attempt
    // -----------------------------------------------------------------------

    #[test]
    fn text_plan_uses_prompt_and_request_shape() {
        let req = GenerationRequest::text("a fox")
            .aspect_ratio(AspectRatio::Portrait)
            .resolution(Resolution::P1080)
            .model(VeoModel::Quality);
        let plan = plan_attempt(&req).unwrap();

        assert!(plan.speech.is_none());
        assert_eq!(plan.video.prompt, "a fox");
        assert_eq!(plan.video.aspect_ratio, AspectRatio::Portrait);
        assert_eq!(plan.video.resolution, Resolution::P1080);
        assert_eq!(plan.video.model, VeoModel::Quality);
    }

    #[test]
    fn looping_reuses_start_frame_as_end_frame() {
        let mut req = GenerationRequest::text("spin");
        req.start_frame = Some(png());
        req.is_looping = true;
        let plan = plan_attempt(&req).unwrap();
        assert_eq!(plan.video.end_frame, Some(png()));

        req.is_looping = false;
        assert!(plan_attempt(&req).unwrap().video.end_frame.is_none());
    }

    #[test]
    fn story_plan_extracts_script() {
        let req = GenerationRequest::story(story_prompt("a summit at dawn"));
        let plan = plan_attempt(&req).unwrap();

        assert_eq!(plan.video.prompt, "a summit at dawn");
        assert_eq!(
            plan.speech,
            Some(SpeechCall {
                dialogue: "We made it.".into(),
                tone: "relieved".into(),
            })
        );
    }

    #[test]
    fn plan_display_reports_shape_actually_sent() {
        let req = GenerationRequest::story(story_prompt("tall 9:16 portrait of a lighthouse"))
            .aspect_ratio(AspectRatio::Landscape);
        let plan = plan_attempt(&req).unwrap();

        assert_eq!(
            plan.to_string(),
            "video call (veo-3.1-fast-generate-preview, 9:16, 720p) + speech call"
        );
    }

    #[test]
    fn malformed_story_is_input_error() {
        let err = plan_attempt(&GenerationRequest::story("no script here")).unwrap_err();
        assert_eq!(err, GenerationError::InputParse(StoryError::NoScript));
    }

    #[test]
    fn extend_plan_attaches_prior_video_at_extend_tier() {
        let mut req = GenerationRequest::text("keep going").resolution(Resolution::P1080);
        req.start_frame = Some(png());
        req.mode = GenerationMode::ExtendVideo {
            prior_video: VideoHandle("files/v1".into()),
            input_video: MediaAttachment::new(vec![9; 4], "video/mp4"),
        };
        let plan = plan_attempt(&req).unwrap();

        assert_eq!(plan.video.prior_video, Some(VideoHandle("files/v1".into())));
        assert_eq!(plan.video.resolution, Resolution::EXTEND_TIER);
        assert!(plan.video.start_frame.is_none());
    }

    #[test]
    fn extend_with_empty_payload_is_invalid() {
        let mut req = GenerationRequest::text("");
        req.mode = GenerationMode::ExtendVideo {
            prior_video: VideoHandle("files/v1".into()),
            input_video: MediaAttachment::new(Vec::new(), "video/mp4"),
        };
        assert!(matches!(
            plan_attempt(&req),
            Err(GenerationError::InvalidRequest(_))
        ));
    }

    // -----------------------------------------------------------------------
    // generate
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn text_to_video_issues_one_video_call_and_no_audio() {
        let orc = Orchestrator::new(MockService::default());
        let req = GenerationRequest::text("a lighthouse").aspect_ratio(AspectRatio::Landscape);

        let result = orc.generate(&req).await.unwrap();

        assert_eq!(orc.service().video_call_count(), 1);
        assert_eq!(orc.service().speech_call_count(), 0);
        assert_eq!(
            orc.service().last_video_call().unwrap().aspect_ratio,
            AspectRatio::Landscape
        );
        assert!(result.audio.is_none());
        assert_eq!(result.video_handle, VideoHandle("files/video-1".into()));
        assert_eq!(result.video_payload.len(), 16);
    }

    #[tokio::test]
    async fn story_portrait_hint_overrides_landscape_and_yields_audio() {
        let orc = Orchestrator::new(MockService::default());
        let req = GenerationRequest::story(story_prompt("two hikers, 9:16 close-up"))
            .aspect_ratio(AspectRatio::Landscape);

        let result = orc.generate(&req).await.unwrap();

        let call = orc.service().last_video_call().unwrap();
        assert_eq!(call.aspect_ratio, AspectRatio::Portrait);
        assert_eq!(call.prompt, "two hikers, 9:16 close-up");
        assert_eq!(
            orc.service().speech_calls.lock().unwrap()[0],
            ("We made it.".to_string(), "relieved".to_string())
        );

        let audio = result.audio.expect("story result carries audio");
        assert_eq!(audio.sample_rate(), SPEECH_SAMPLE_RATE);
        assert_eq!(audio.channel_count(), 1);
        assert_eq!(audio.frames(), 4);
        assert_eq!(&audio.channel(0).unwrap()[..3], &[0.5, -0.5, 0.0]);
    }

    #[tokio::test]
    async fn story_without_marker_keeps_declared_aspect_ratio() {
        let orc = Orchestrator::new(MockService::default());
        let req = GenerationRequest::story(story_prompt("a quiet harbour"))
            .aspect_ratio(AspectRatio::Portrait);

        orc.generate(&req).await.unwrap();
        assert_eq!(
            orc.service().last_video_call().unwrap().aspect_ratio,
            AspectRatio::Portrait
        );
    }

    #[tokio::test]
    async fn speech_failure_fails_whole_attempt() {
        let service = MockService {
            speech_error: Some(("UNAVAILABLE", "tts overloaded")),
            ..MockService::default()
        };
        let orc = Orchestrator::new(service);

        let failure = orc
            .generate(&GenerationRequest::story(story_prompt("a harbour")))
            .await
            .unwrap_err();

        assert_eq!(
            failure.error,
            GenerationError::Upstream {
                call: CallKind::Speech,
                message: "UNAVAILABLE: tts overloaded".into(),
            }
        );
        assert_eq!(failure.kind, FailureKind::Generic);
    }

    #[tokio::test]
    async fn video_failure_fails_whole_attempt_without_decoding() {
        let service = MockService {
            // would be a decode error if decoding were attempted
            speech_payload: "%%%not base64%%%".into(),
            ..MockService::failing_video("NOT_FOUND", "Requested entity was not found.")
        };
        let orc = Orchestrator::new(service);

        let failure = orc
            .generate(&GenerationRequest::story(story_prompt("a harbour")))
            .await
            .unwrap_err();

        assert!(matches!(
            failure.error,
            GenerationError::Upstream { call: CallKind::Video, .. }
        ));
        assert_eq!(failure.kind, FailureKind::NotFound);
        assert!(failure.needs_credential_reselection);
    }

    #[tokio::test]
    async fn first_failure_resumes_without_waiting_for_other_call() {
        let service = MockService {
            video_hangs: true,
            speech_error: Some(("INTERNAL", "boom")),
            ..MockService::default()
        };
        let orc = Orchestrator::new(service);

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            orc.generate(&GenerationRequest::story(story_prompt("x"))),
        )
        .await
        .expect("join must not wait for the pending video call");

        assert!(outcome.is_err());
        assert_eq!(orc.service().video_call_count(), 1);
    }

    #[tokio::test]
    async fn malformed_speech_payload_is_decode_failure() {
        let service = MockService {
            speech_payload: "not*base64".into(),
            ..MockService::default()
        };
        let orc = Orchestrator::new(service);

        let failure = orc
            .generate(&GenerationRequest::story(story_prompt("x")))
            .await
            .unwrap_err();
        assert!(matches!(failure.error, GenerationError::Decode(_)));
        assert!(failure.user_message.starts_with("Video generation failed:"));
    }

    #[tokio::test]
    async fn malformed_story_never_reaches_service() {
        let orc = Orchestrator::new(MockService::default());
        let failure = orc
            .generate(&GenerationRequest::story("{ not json"))
            .await
            .unwrap_err();

        assert!(matches!(failure.error, GenerationError::InputParse(_)));
        assert_eq!(orc.service().video_call_count(), 0);
        assert_eq!(orc.service().speech_call_count(), 0);
    }
}
