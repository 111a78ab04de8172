//! Studio controller: one session, its orchestrator, the credential gate
//! and the audio playback slot.
//!
//! [`Studio`] can be driven by direct method calls or by a command channel
//! through [`Studio::run`], which answers every [`StudioCommand`] with one
//! or more [`StudioEvent`]s.
//!
//! Attempts run inside the caller's task; while one is in flight no other
//! command is processed.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendError;

use crate::audio::{AudioPlayback, PlaybackBackend, PlaybackError};
use crate::generation::{FailureKind, GenerationRequest, GenerationResult, Orchestrator};
use crate::service::{CredentialGate, GenerationService};

use super::state::{SessionPhase, SessionState};

// ---------------------------------------------------------------------------
// Commands / events
// ---------------------------------------------------------------------------

/// Actions a front end can ask the studio for.
#[derive(Debug, Clone)]
pub enum StudioCommand {
    Submit(GenerationRequest),
    Retry,
    TryAgain,
    New,
    Extend,
    ReselectCredentials,
    Play,
    StopPlayback,
}

/// What the studio reports back on its event channel.
#[derive(Debug, Clone)]
pub enum StudioEvent {
    /// The session changed.
    Updated(SessionSnapshot),
    /// The named action is not valid in the current phase.
    Rejected(&'static str),
    /// No usable API key is selected; the attempt was not started.
    CredentialSelectionRequired,
    /// The audio device could not play the speech track.
    PlaybackFailed(String),
}

/// Result of one studio action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Applied,
    Rejected,
    CredentialSelectionRequired,
}

/// Point-in-time view of the session for rendering.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub result: Option<GenerationResult>,
    pub error_message: Option<String>,
    pub failure_kind: Option<FailureKind>,
    pub prefill: Option<GenerationRequest>,
    pub can_extend: bool,
    pub can_retry: bool,
    pub reselection_pending: bool,
    pub playing: bool,
}

// ---------------------------------------------------------------------------
// Studio
// ---------------------------------------------------------------------------

/// Owns a [`SessionState`] and runs its attempts.
///
/// ```rust,no_run
/// use veo_studio::audio::SilentBackend;
/// use veo_studio::config::AppConfig;
/// use veo_studio::generation::GenerationRequest;
/// use veo_studio::service::{ApiKeyStore, GeminiClient, KeyStoreGate};
/// use veo_studio::session::{SessionPhase, Studio};
///
/// # async fn example() {
/// let config = AppConfig::default();
/// let keys = ApiKeyStore::from_config(&config.api);
/// let client = GeminiClient::from_config(&config, keys.clone());
/// let mut studio = Studio::new(client, KeyStoreGate::stdin(keys), SilentBackend);
///
/// studio.submit(GenerationRequest::text("a heron at dusk")).await;
/// if studio.session().phase() == SessionPhase::Success {
///     studio.play().unwrap();
/// }
/// # }
/// ```
pub struct Studio<S, C, B: PlaybackBackend> {
    session: SessionState,
    orchestrator: Orchestrator<S>,
    credentials: C,
    playback: AudioPlayback<B>,
    reselection_pending: bool,
}

impl<S, C, B> Studio<S, C, B>
where
    S: GenerationService,
    C: CredentialGate,
    B: PlaybackBackend,
{
    pub fn new(service: S, credentials: C, backend: B) -> Self {
        Self {
            session: SessionState::new(),
            orchestrator: Orchestrator::new(service),
            credentials,
            playback: AudioPlayback::new(backend),
            reselection_pending: false,
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn service(&self) -> &S {
        self.orchestrator.service()
    }

    pub fn credentials(&self) -> &C {
        &self.credentials
    }

    pub fn playback(&self) -> &AudioPlayback<B> {
        &self.playback
    }

    /// The last attempt asked for a new key; submit and retry are blocked
    /// until [`reselect_credentials`](Self::reselect_credentials) runs.
    pub fn reselection_pending(&self) -> bool {
        self.reselection_pending
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.session.phase(),
            result: self.session.last_result().cloned(),
            error_message: self.session.error_message().map(str::to_string),
            failure_kind: self.session.failure_kind(),
            prefill: self.session.prefill().cloned(),
            can_extend: self.session.can_extend(),
            can_retry: self.session.can_retry() && !self.reselection_pending,
            reselection_pending: self.reselection_pending,
            playing: self.playback.is_playing(),
        }
    }

    // -----------------------------------------------------------------------
    // Attempts
    // -----------------------------------------------------------------------

    /// Check credentials, then run `request` to completion.
    pub async fn submit(&mut self, request: GenerationRequest) -> ActionOutcome {
        let outcome = self.begin_submit(request).await;
        if outcome == ActionOutcome::Applied {
            self.run_attempt().await;
        }
        outcome
    }

    /// Check credentials, then re-run the last request.
    pub async fn retry(&mut self) -> ActionOutcome {
        let outcome = self.begin_retry().await;
        if outcome == ActionOutcome::Applied {
            self.run_attempt().await;
        }
        outcome
    }

    /// Open key selection; a failed session with a last request is retried.
    pub async fn reselect_credentials(&mut self) -> ActionOutcome {
        if self.reopen_credentials().await {
            self.retry().await
        } else {
            ActionOutcome::Applied
        }
    }

    async fn begin_submit(&mut self, request: GenerationRequest) -> ActionOutcome {
        if self.session.phase() != SessionPhase::Idle {
            log::debug!("studio: submit ignored in {:?}", self.session.phase());
            return ActionOutcome::Rejected;
        }
        if self.reselection_pending {
            log::warn!("studio: submit blocked until credentials are reselected");
            return ActionOutcome::CredentialSelectionRequired;
        }
        if !self.credentials.has_selected_api_key().await {
            log::warn!("studio: no API key selected, attempt not started");
            return ActionOutcome::CredentialSelectionRequired;
        }
        self.playback.release();
        applied(self.session.submit(request))
    }

    async fn begin_retry(&mut self) -> ActionOutcome {
        if !self.session.can_retry() {
            log::debug!("studio: retry ignored in {:?}", self.session.phase());
            return ActionOutcome::Rejected;
        }
        if self.reselection_pending {
            log::warn!("studio: retry blocked until credentials are reselected");
            return ActionOutcome::CredentialSelectionRequired;
        }
        if !self.credentials.has_selected_api_key().await {
            log::warn!("studio: no API key selected, retry not started");
            return ActionOutcome::CredentialSelectionRequired;
        }
        self.playback.release();
        applied(self.session.retry())
    }

    /// Returns whether a retry should follow.
    async fn reopen_credentials(&mut self) -> bool {
        self.credentials.open_select_key().await;
        self.reselection_pending = false;
        self.session.phase() == SessionPhase::Error && self.session.last_request().is_some()
    }

    async fn run_attempt(&mut self) {
        let Some(request) = self.session.last_request().cloned() else {
            return;
        };

        let outcome = self.orchestrator.generate(&request).await;
        self.reselection_pending = matches!(&outcome, Err(f) if f.needs_credential_reselection);
        if let (true, Err(failure)) = (self.reselection_pending, &outcome) {
            log::warn!("studio: {:?} failure, credentials must be reselected", failure.kind);
        }
        self.session.complete(outcome);
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    /// Back to an empty `Idle` from any phase.
    pub fn new_session(&mut self) -> ActionOutcome {
        self.playback.release();
        applied(self.session.new_session())
    }

    pub fn try_again(&mut self) -> ActionOutcome {
        let outcome = applied(self.session.try_again());
        if outcome == ActionOutcome::Applied {
            self.playback.release();
        }
        outcome
    }

    pub fn extend(&mut self) -> ActionOutcome {
        let outcome = applied(self.session.extend());
        if outcome == ActionOutcome::Applied {
            self.playback.release();
        }
        outcome
    }

    // -----------------------------------------------------------------------
    // Playback
    // -----------------------------------------------------------------------

    /// Play the displayed result's speech track.
    ///
    /// Returns `Ok(false)` when there is nothing to play.
    pub fn play(&mut self) -> Result<bool, PlaybackError> {
        let Some(audio) = self.session.last_result().and_then(|r| r.audio.as_ref()) else {
            return Ok(false);
        };
        self.playback.play(audio)?;
        Ok(true)
    }

    pub fn stop_playback(&mut self) {
        self.playback.stop();
    }

    // -----------------------------------------------------------------------
    // Command loop
    // -----------------------------------------------------------------------

    /// Process commands until the command channel closes or the event
    /// receiver is dropped.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<StudioCommand>,
        events: mpsc::Sender<StudioEvent>,
    ) {
        while let Some(command) = commands.recv().await {
            if self.dispatch(command, &events).await.is_err() {
                log::info!("studio: event receiver dropped, shutting down");
                return;
            }
        }

        log::info!("studio: command channel closed, shutting down");
    }

    async fn dispatch(
        &mut self,
        command: StudioCommand,
        events: &mpsc::Sender<StudioEvent>,
    ) -> Result<(), SendError<StudioEvent>> {
        match command {
            StudioCommand::Submit(request) => {
                let outcome = self.begin_submit(request).await;
                self.finish_attempt(outcome, "submit", events).await?;
            }
            StudioCommand::Retry => {
                let outcome = self.begin_retry().await;
                self.finish_attempt(outcome, "retry", events).await?;
            }
            StudioCommand::ReselectCredentials => {
                if self.reopen_credentials().await {
                    let outcome = self.begin_retry().await;
                    self.finish_attempt(outcome, "retry", events).await?;
                } else {
                    events.send(StudioEvent::Updated(self.snapshot())).await?;
                }
            }
            StudioCommand::TryAgain => {
                let outcome = self.try_again();
                self.report(outcome, "try again", events).await?;
            }
            StudioCommand::New => {
                let outcome = self.new_session();
                self.report(outcome, "new", events).await?;
            }
            StudioCommand::Extend => {
                let outcome = self.extend();
                self.report(outcome, "extend", events).await?;
            }
            StudioCommand::Play => {
                let event = match self.play() {
                    Ok(true) => StudioEvent::Updated(self.snapshot()),
                    Ok(false) => StudioEvent::Rejected("play"),
                    Err(e) => {
                        log::warn!("studio: playback failed: {e}");
                        StudioEvent::PlaybackFailed(e.to_string())
                    }
                };
                events.send(event).await?;
            }
            StudioCommand::StopPlayback => {
                self.stop_playback();
                events.send(StudioEvent::Updated(self.snapshot())).await?;
            }
        }
        Ok(())
    }

    /// Report the start of an attempt, run it, then report its end.
    async fn finish_attempt(
        &mut self,
        outcome: ActionOutcome,
        action: &'static str,
        events: &mpsc::Sender<StudioEvent>,
    ) -> Result<(), SendError<StudioEvent>> {
        self.report(outcome, action, events).await?;
        if outcome == ActionOutcome::Applied {
            self.run_attempt().await;
            events.send(StudioEvent::Updated(self.snapshot())).await?;
        }
        Ok(())
    }

    async fn report(
        &self,
        outcome: ActionOutcome,
        action: &'static str,
        events: &mpsc::Sender<StudioEvent>,
    ) -> Result<(), SendError<StudioEvent>> {
        let event = match outcome {
            ActionOutcome::Applied => StudioEvent::Updated(self.snapshot()),
            ActionOutcome::Rejected => StudioEvent::Rejected(action),
            ActionOutcome::CredentialSelectionRequired => StudioEvent::CredentialSelectionRequired,
        };
        events.send(event).await
    }
}

fn applied(ok: bool) -> ActionOutcome {
    if ok {
        ActionOutcome::Applied
    } else {
        ActionOutcome::Rejected
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
