//! Generation failures and their classification.
//!
//! Everything that can go wrong inside one attempt is a [`GenerationError`].
//! At the orchestrator boundary it is run through [`classify`], which decides
//! what the user is told and whether the credential-selection flow must run
//! before the attempt may be retried.

use std::fmt;

use thiserror::Error;

use crate::audio::DecodeError;

use super::story::StoryError;

// ---------------------------------------------------------------------------
// GenerationError
// ---------------------------------------------------------------------------

/// Which collaborator call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Video,
    Speech,
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallKind::Video => f.write_str("video"),
            CallKind::Speech => f.write_str("speech"),
        }
    }
}

/// Raw failure of one generation attempt.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    /// The story prompt could not be parsed.
    #[error("invalid story script: {0}")]
    InputParse(#[from] StoryError),

    /// The request cannot be sent as-is.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A collaborator call rejected.  `message` is the upstream text verbatim.
    #[error("{message}")]
    Upstream { call: CallKind, message: String },

    /// The speech payload was not decodable PCM.
    #[error("could not decode speech audio: {0}")]
    Decode(#[from] DecodeError),
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Actionable category of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The requested model/entity does not exist for this credential.
    NotFound,
    /// The credential is invalid or lacks permission.
    Auth,
    /// Anything else.
    Generic,
}

/// Result of [`classify_message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: FailureKind,
    pub user_message: String,
    pub needs_credential_reselection: bool,
}

/// A failed attempt as reported to the session.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedFailure {
    pub kind: FailureKind,
    pub user_message: String,
    pub needs_credential_reselection: bool,
    pub error: GenerationError,
}

impl fmt::Display for ClassifiedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_message)
    }
}

impl std::error::Error for ClassifiedFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

const NOT_FOUND_MARKER: &str = "Requested entity was not found";
const INVALID_KEY_MARKERS: &[&str] = &["API_KEY_INVALID", "API key not valid"];
const PERMISSION_DENIED_MARKER: &str = "permission denied";

const NOT_FOUND_MESSAGE: &str = "Model not found. This can be caused by an invalid API key \
     or permission issues. Please check your API key.";
const AUTH_MESSAGE: &str = "Your API key is invalid or lacks permissions. \
     Please select a valid, billing-enabled API key.";

/// Map raw failure text to a user-facing message.  First matching rule wins:
///
/// 1. "Requested entity was not found" → [`FailureKind::NotFound`]
/// 2. invalid key markers, or "permission denied" (any case) → [`FailureKind::Auth`]
/// 3. anything else → [`FailureKind::Generic`], raw text kept verbatim
///
/// ```
/// use veo_studio::generation::{classify_message, FailureKind};
///
/// let c = classify_message("PERMISSION_DENIED: Permission denied on resource");
/// assert_eq!(c.kind, FailureKind::Auth);
/// assert!(c.needs_credential_reselection);
///
/// let c = classify_message("quota exceeded");
/// assert_eq!(c.user_message, "Video generation failed: quota exceeded");
/// ```
pub fn classify_message(message: &str) -> Classification {
    if message.contains(NOT_FOUND_MARKER) {
        return Classification {
            kind: FailureKind::NotFound,
            user_message: NOT_FOUND_MESSAGE.to_string(),
            needs_credential_reselection: true,
        };
    }

    let invalid_key = INVALID_KEY_MARKERS.iter().any(|m| message.contains(m));
    if invalid_key || message.to_lowercase().contains(PERMISSION_DENIED_MARKER) {
        return Classification {
            kind: FailureKind::Auth,
            user_message: AUTH_MESSAGE.to_string(),
            needs_credential_reselection: true,
        };
    }

    Classification {
        kind: FailureKind::Generic,
        user_message: format!("Video generation failed: {message}"),
        needs_credential_reselection: false,
    }
}

/// Classify a [`GenerationError`] by its message text.
pub fn classify(error: GenerationError) -> ClassifiedFailure {
    let Classification {
        kind,
        user_message,
        needs_credential_reselection,
    } = classify_message(&error.to_string());

    ClassifiedFailure {
        kind,
        user_message,
        needs_credential_reselection,
        error,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream(message: &str) -> GenerationError {
        GenerationError::Upstream {
            call: CallKind::Video,
            message: message.into(),
        }
    }

    #[test]
    fn not_found_needs_reselection() {
        let failure = classify(upstream("NOT_FOUND: Requested entity was not found."));
        assert_eq!(failure.kind, FailureKind::NotFound);
        assert!(failure.needs_credential_reselection);
        assert!(failure.user_message.starts_with("Model not found."));
    }

    #[test]
    fn invalid_key_markers_are_auth() {
        for msg in [
            "INVALID_ARGUMENT: API key not valid. Please pass a valid API key.",
            "reason: API_KEY_INVALID",
        ] {
            let c = classify_message(msg);
            assert_eq!(c.kind, FailureKind::Auth, "{msg}");
            assert!(c.needs_credential_reselection);
        }
    }

    #[test]
    fn permission_denied_is_case_insensitive() {
        for msg in ["permission denied", "Permission Denied for project", "PERMISSION DENIED"] {
            assert_eq!(classify_message(msg).kind, FailureKind::Auth, "{msg}");
        }
    }

    #[test]
    fn not_found_wins_over_auth() {
        let c = classify_message("Requested entity was not found; permission denied");
        assert_eq!(c.kind, FailureKind::NotFound);
    }

    #[test]
    fn generic_wraps_raw_message_verbatim() {
        let c = classify_message("RESOURCE_EXHAUSTED: quota exceeded");
        assert_eq!(c.kind, FailureKind::Generic);
        assert!(!c.needs_credential_reselection);
        assert_eq!(
            c.user_message,
            "Video generation failed: RESOURCE_EXHAUSTED: quota exceeded"
        );
    }

    #[test]
    fn input_and_decode_errors_are_generic() {
        let failure = classify(GenerationError::InputParse(StoryError::NoScript));
        assert_eq!(failure.kind, FailureKind::Generic);
        assert!(failure.user_message.contains("story prompt contains no JSON object"));

        let failure = classify(GenerationError::Decode(DecodeError::OddByteLength(3)));
        assert_eq!(failure.kind, FailureKind::Generic);
        assert!(!failure.needs_credential_reselection);
    }

    #[test]
    fn classified_failure_keeps_source_error() {
        let err = upstream("boom");
        let failure = classify(err.clone());
        assert_eq!(failure.error, err);
        assert_eq!(failure.to_string(), "Video generation failed: boom");
    }
}
