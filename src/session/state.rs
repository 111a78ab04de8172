//! Session lifecycle state machine.
//!
//! [`SessionPhase`] is the visible phase; [`SessionState`] owns it together
//! with the last request, the last result, the failure shown in `Error` and
//! the pre-fill request offered to the form in `Idle`.
//!
//! Transitions are plain methods returning `true` when applied.  A rejected
//! transition leaves every field untouched.

use crate::generation::{
    build_extend_request, ClassifiedFailure, FailureKind, GenerationRequest, GenerationResult,
};

// ---------------------------------------------------------------------------
// SessionPhase
// ---------------------------------------------------------------------------

/// Phases of one studio session.
///
/// ```text
/// Idle ──submit──▶ Loading ──ok──▶ Success ──extend──▶ Idle (pre-filled)
///                     │  ▲
///                     │  └──retry── Error
///                     └──err──────▶ Error ──try again──▶ Idle (pre-filled)
/// any phase ──new──▶ Idle (cleared)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Waiting for the user to submit a request.
    #[default]
    Idle,
    /// An attempt is in flight.
    Loading,
    /// The last attempt produced a result.
    Success,
    /// The last attempt failed; a classified message is available.
    Error,
}

impl SessionPhase {
    /// Returns `true` while an attempt is in flight.
    ///
    /// ```
    /// use veo_studio::session::SessionPhase;
    ///
    /// assert!(SessionPhase::Loading.is_busy());
    /// assert!(!SessionPhase::Error.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(self, SessionPhase::Loading)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "Idle",
            SessionPhase::Loading => "Generating",
            SessionPhase::Success => "Done",
            SessionPhase::Error => "Error",
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Everything one session remembers between attempts.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    phase: SessionPhase,
    last_request: Option<GenerationRequest>,
    last_result: Option<GenerationResult>,
    error_message: Option<String>,
    failure_kind: Option<FailureKind>,
    prefill: Option<GenerationRequest>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn last_request(&self) -> Option<&GenerationRequest> {
        self.last_request.as_ref()
    }

    /// The displayed result; only present in `Success`.
    pub fn last_result(&self) -> Option<&GenerationResult> {
        self.last_result.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failure_kind
    }

    /// Request the form should start from in `Idle`.
    pub fn prefill(&self) -> Option<&GenerationRequest> {
        self.prefill.as_ref()
    }

    /// Whether [`extend`](Self::extend) would be applied.
    pub fn can_extend(&self) -> bool {
        self.phase == SessionPhase::Success
            && self.last_result.is_some()
            && self.last_request.as_ref().is_some_and(|r| r.can_extend())
    }

    /// Whether [`retry`](Self::retry) would be applied.
    pub fn can_retry(&self) -> bool {
        matches!(self.phase, SessionPhase::Error | SessionPhase::Loading)
            && self.last_request.is_some()
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// `Idle → Loading`: store `request` as the last request.
    pub fn submit(&mut self, request: GenerationRequest) -> bool {
        if self.phase != SessionPhase::Idle {
            return self.reject("submit");
        }
        log::debug!("session: Idle → Loading ({})", request.mode.label());
        self.phase = SessionPhase::Loading;
        self.last_request = Some(request);
        self.last_result = None;
        self.clear_failure();
        self.prefill = None;
        true
    }

    /// `Error/Loading → Loading`: re-run the stored last request unchanged.
    pub fn retry(&mut self) -> bool {
        if !self.can_retry() {
            return self.reject("retry");
        }
        log::debug!("session: {:?} → Loading (retry)", self.phase);
        self.phase = SessionPhase::Loading;
        self.last_result = None;
        self.clear_failure();
        true
    }

    /// `Loading → Success | Error` with the attempt's outcome.
    pub fn complete(&mut self, outcome: Result<GenerationResult, ClassifiedFailure>) -> bool {
        if self.phase != SessionPhase::Loading {
            return self.reject("complete");
        }
        match outcome {
            Ok(result) => {
                log::debug!("session: Loading → Success");
                self.phase = SessionPhase::Success;
                self.last_result = Some(result);
            }
            Err(failure) => {
                log::debug!("session: Loading → Error ({:?})", failure.kind);
                self.phase = SessionPhase::Error;
                self.error_message = Some(failure.user_message);
                self.failure_kind = Some(failure.kind);
            }
        }
        true
    }

    /// Any phase `→ Idle`, clearing everything.  Always applied.
    pub fn new_session(&mut self) -> bool {
        log::debug!("session: {:?} → Idle (new)", self.phase);
        *self = Self::default();
        true
    }

    /// `Error → Idle` with the last request as pre-fill.
    ///
    /// Without a last request this is a plain reset.
    pub fn try_again(&mut self) -> bool {
        if self.phase != SessionPhase::Error {
            return self.reject("try again");
        }
        match self.last_request.clone() {
            Some(request) => {
                log::debug!("session: Error → Idle (pre-filled)");
                self.phase = SessionPhase::Idle;
                self.last_result = None;
                self.clear_failure();
                self.prefill = Some(request);
            }
            None => {
                self.new_session();
            }
        }
        true
    }

    /// `Success → Idle` with an extend request derived from the last result.
    pub fn extend(&mut self) -> bool {
        if !self.can_extend() {
            return self.reject("extend");
        }
        let (Some(request), Some(result)) = (&self.last_request, self.last_result.take()) else {
            return self.reject("extend");
        };
        log::debug!("session: Success → Idle (extend)");
        self.prefill = Some(build_extend_request(request, &result));
        self.phase = SessionPhase::Idle;
        true
    }

    fn clear_failure(&mut self) {
        self.error_message = None;
        self.failure_kind = None;
    }

    fn reject(&self, action: &str) -> bool {
        log::debug!("session: {action} ignored in {:?}", self.phase);
        false
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{
        classify_message, GenerationError, GenerationMode, Resolution, VideoHandle,
        VideoResource,
    };

    fn result() -> GenerationResult {
        GenerationResult {
            video_handle: VideoHandle("files/v1".into()),
            video_resource: VideoResource("https://host/v1".into()),
            video_payload: vec![1, 2, 3],
            audio: None,
        }
    }

    fn failure(message: &str) -> ClassifiedFailure {
        let c = classify_message(message);
        ClassifiedFailure {
            kind: c.kind,
            user_message: c.user_message,
            needs_credential_reselection: c.needs_credential_reselection,
            error: GenerationError::InvalidRequest(message.into()),
        }
    }

    fn in_success(request: GenerationRequest) -> SessionState {
        let mut s = SessionState::new();
        assert!(s.submit(request));
        assert!(s.complete(Ok(result())));
        s
    }

    fn in_error() -> SessionState {
        let mut s = SessionState::new();
        assert!(s.submit(GenerationRequest::text("a heron")));
        assert!(s.complete(Err(failure("quota exceeded"))));
        s
    }

    // ---- SessionPhase ---

    #[test]
    fn default_phase_is_idle() {
        assert_eq!(SessionState::new().phase(), SessionPhase::Idle);
        assert_eq!(SessionPhase::default().label(), "Idle");
    }

    // ---- submit / complete ---

    #[test]
    fn submit_stores_request_and_enters_loading() {
        let mut s = SessionState::new();
        assert!(s.submit(GenerationRequest::text("a heron")));
        assert_eq!(s.phase(), SessionPhase::Loading);
        assert_eq!(s.last_request().unwrap().prompt, "a heron");
        assert!(s.last_result().is_none());
    }

    #[test]
    fn submit_outside_idle_is_rejected() {
        let mut s = in_success(GenerationRequest::text("a"));
        assert!(!s.submit(GenerationRequest::text("b")));
        assert_eq!(s.last_request().unwrap().prompt, "a");
        assert_eq!(s.phase(), SessionPhase::Success);
    }

    #[test]
    fn failure_stores_classified_message() {
        let s = in_error();
        assert_eq!(s.phase(), SessionPhase::Error);
        assert_eq!(
            s.error_message(),
            Some("Video generation failed: quota exceeded")
        );
        assert_eq!(s.failure_kind(), Some(FailureKind::Generic));
    }

    #[test]
    fn complete_outside_loading_is_rejected() {
        let mut s = SessionState::new();
        assert!(!s.complete(Ok(result())));
        assert_eq!(s.phase(), SessionPhase::Idle);
        assert!(s.last_result().is_none());
    }

    // ---- retry ---

    #[test]
    fn retry_resubmits_last_request_unchanged() {
        let mut s = in_error();
        assert!(s.retry());
        assert_eq!(s.phase(), SessionPhase::Loading);
        assert_eq!(s.last_request().unwrap().prompt, "a heron");
        assert!(s.error_message().is_none());
    }

    #[test]
    fn retry_from_loading_is_allowed() {
        let mut s = SessionState::new();
        s.submit(GenerationRequest::text("x"));
        assert!(s.retry());
        assert_eq!(s.phase(), SessionPhase::Loading);
    }

    #[test]
    fn retry_without_last_request_is_noop() {
        let mut s = SessionState::new();
        assert!(!s.retry());
        assert_eq!(s.phase(), SessionPhase::Idle);
    }

    // ---- try again ---

    #[test]
    fn try_again_prefills_last_request() {
        let mut s = in_error();
        assert!(s.try_again());
        assert_eq!(s.phase(), SessionPhase::Idle);
        assert_eq!(s.prefill().unwrap().prompt, "a heron");
        assert_eq!(s.last_request().unwrap().prompt, "a heron");
        assert!(s.error_message().is_none());
    }

    #[test]
    fn try_again_outside_error_is_noop() {
        let mut s = in_success(GenerationRequest::text("x"));
        assert!(!s.try_again());
        assert_eq!(s.phase(), SessionPhase::Success);
    }

    // ---- new ---

    #[test]
    fn new_clears_everything_from_every_phase() {
        let mut loading = SessionState::new();
        loading.submit(GenerationRequest::text("x"));
        let mut prefilled = in_error();
        prefilled.try_again();

        for mut s in [
            SessionState::new(),
            loading,
            in_success(GenerationRequest::text("x")),
            in_error(),
            prefilled,
        ] {
            assert!(s.new_session());
            assert_eq!(s.phase(), SessionPhase::Idle);
            assert!(s.last_request().is_none());
            assert!(s.last_result().is_none());
            assert!(s.error_message().is_none());
            assert!(s.failure_kind().is_none());
            assert!(s.prefill().is_none());
        }
    }

    // ---- extend ---

    #[test]
    fn extend_prefills_extend_request_and_clears_result() {
        let mut s = in_success(GenerationRequest::text("a kite"));
        assert!(s.can_extend());
        assert!(s.extend());

        assert_eq!(s.phase(), SessionPhase::Idle);
        assert!(s.last_result().is_none());
        let prefill = s.prefill().unwrap();
        assert!(matches!(
            &prefill.mode,
            GenerationMode::ExtendVideo { prior_video, .. } if prior_video.as_str() == "files/v1"
        ));
        assert_eq!(prefill.resolution, Resolution::EXTEND_TIER);
    }

    #[test]
    fn extend_requires_extend_tier() {
        let mut s = in_success(GenerationRequest::text("a").resolution(Resolution::P1080));
        assert!(!s.can_extend());
        assert!(!s.extend());
        assert_eq!(s.phase(), SessionPhase::Success);
        assert!(s.last_result().is_some());
    }

    #[test]
    fn extend_outside_success_is_noop() {
        let mut s = in_error();
        assert!(!s.extend());
        assert_eq!(s.phase(), SessionPhase::Error);
    }

    #[test]
    fn prefill_is_consumed_by_next_submit() {
        let mut s = in_success(GenerationRequest::text("a"));
        s.extend();
        let next = s.prefill().cloned().unwrap();
        assert!(s.submit(next));
        assert!(s.prefill().is_none());
        assert!(s.last_request().unwrap().prior_video().is_some());
    }
}
