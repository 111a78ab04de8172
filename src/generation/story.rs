//! Story scripts embedded in `StoryToVideo` prompts.
//!
//! A story prompt carries a JSON object somewhere in its text:
//!
//! ```text
//! Here is the scene:
//! {
//!   "dialogue": "We made it. Finally.",
//!   "tone": "relieved, quiet",
//!   "image_prompt": "two hikers on a summit at dawn, vertical framing"
//! }
//! ```
//!
//! [`StoryScript::extract`] pulls it out; [`infer_aspect_ratio`] reads the
//! framing hint from the image prompt.

use serde::Deserialize;
use thiserror::Error;

use super::request::AspectRatio;

/// Tone used when the script does not name one.
pub const DEFAULT_TONE: &str = "neutral";

// ---------------------------------------------------------------------------
// StoryError
// ---------------------------------------------------------------------------

/// Why a story prompt could not be turned into a [`StoryScript`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoryError {
    #[error("story prompt contains no JSON object")]
    NoScript,

    #[error("story script is not valid JSON: {0}")]
    Json(String),

    #[error("story script field `{0}` is empty")]
    EmptyField(&'static str),
}

// ---------------------------------------------------------------------------
// StoryScript
// ---------------------------------------------------------------------------

/// Dialogue + voice + picture description for one story attempt.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoryScript {
    /// Line(s) spoken by the speech track.
    pub dialogue: String,
    /// Free-text voice tone hint ("cheerful", "whispered", …).
    #[serde(default = "default_tone", alias = "voiceTone", alias = "voice_tone")]
    pub tone: String,
    /// Prompt for the video call.
    #[serde(alias = "imagePrompt")]
    pub image_prompt: String,
}

fn default_tone() -> String {
    DEFAULT_TONE.to_string()
}

impl StoryScript {
    /// Extract the script from `prompt`.
    ///
    /// The script is the span between the first `{` and the last `}`.
    ///
    /// ```
    /// use veo_studio::generation::StoryScript;
    ///
    /// let script = StoryScript::extract(
    ///     r#"scene: {"dialogue": "Hi!", "image_prompt": "a lighthouse"}"#,
    /// ).unwrap();
    /// assert_eq!(script.dialogue, "Hi!");
    /// assert_eq!(script.tone, "neutral");
    /// ```
    pub fn extract(prompt: &str) -> Result<Self, StoryError> {
        let start = prompt.find('{').ok_or(StoryError::NoScript)?;
        let end = prompt.rfind('}').ok_or(StoryError::NoScript)?;
        if end < start {
            return Err(StoryError::NoScript);
        }

        let mut script: StoryScript = serde_json::from_str(&prompt[start..=end])
            .map_err(|e| StoryError::Json(e.to_string()))?;

        if script.dialogue.trim().is_empty() {
            return Err(StoryError::EmptyField("dialogue"));
        }
        if script.image_prompt.trim().is_empty() {
            return Err(StoryError::EmptyField("image_prompt"));
        }
        if script.tone.trim().is_empty() {
            script.tone = default_tone();
        }

        Ok(script)
    }
}

// ---------------------------------------------------------------------------
// Aspect-ratio inference
// ---------------------------------------------------------------------------

/// Pick the frame shape hinted at by `image_prompt`.
///
/// Portrait markers (`9:16`, "vertical") are checked before landscape markers
/// (`16:9`, "landscape"); a prompt with neither keeps `fallback`.  Words are
/// matched case-insensitively.
///
/// ```
/// use veo_studio::generation::{infer_aspect_ratio, AspectRatio};
///
/// assert_eq!(infer_aspect_ratio("tall Vertical shot", AspectRatio::Landscape), AspectRatio::Portrait);
/// assert_eq!(infer_aspect_ratio("wide 16:9 pan", AspectRatio::Portrait), AspectRatio::Landscape);
/// assert_eq!(infer_aspect_ratio("a cat", AspectRatio::Portrait), AspectRatio::Portrait);
/// ```
pub fn infer_aspect_ratio(image_prompt: &str, fallback: AspectRatio) -> AspectRatio {
    let lower = image_prompt.to_lowercase();

    if lower.contains("9:16") || lower.contains("vertical") {
        AspectRatio::Portrait
    } else if lower.contains("16:9") || lower.contains("landscape") {
        AspectRatio::Landscape
    } else {
        fallback
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- extract ---

    #[test]
    fn extracts_script_surrounded_by_text() {
        let prompt = r#"Make this:
            {"dialogue": "We made it.", "tone": "relieved", "image_prompt": "summit at dawn"}
            thanks"#;
        let script = StoryScript::extract(prompt).unwrap();
        assert_eq!(script.dialogue, "We made it.");
        assert_eq!(script.tone, "relieved");
        assert_eq!(script.image_prompt, "summit at dawn");
    }

    #[test]
    fn accepts_camel_case_keys() {
        let prompt = r#"{"dialogue": "Hello", "voiceTone": "warm", "imagePrompt": "a bakery"}"#;
        let script = StoryScript::extract(prompt).unwrap();
        assert_eq!(script.tone, "warm");
        assert_eq!(script.image_prompt, "a bakery");
    }

    #[test]
    fn blank_tone_falls_back_to_default() {
        let prompt = r#"{"dialogue": "Hello", "tone": "  ", "image_prompt": "a bakery"}"#;
        assert_eq!(StoryScript::extract(prompt).unwrap().tone, DEFAULT_TONE);
    }

    #[test]
    fn plain_text_is_rejected() {
        assert_eq!(
            StoryScript::extract("just a cat video"),
            Err(StoryError::NoScript)
        );
    }

    #[test]
    fn reversed_braces_are_rejected() {
        assert_eq!(StoryScript::extract("} oops {"), Err(StoryError::NoScript));
    }

    #[test]
    fn invalid_json_is_rejected() {
        let err = StoryScript::extract(r#"{"dialogue": "Hi", image_prompt}"#).unwrap_err();
        assert!(matches!(err, StoryError::Json(_)));
    }

    #[test]
    fn missing_image_prompt_is_rejected() {
        let err = StoryScript::extract(r#"{"dialogue": "Hi"}"#).unwrap_err();
        assert!(matches!(err, StoryError::Json(_)));
    }

    #[test]
    fn empty_dialogue_is_rejected() {
        let err = StoryScript::extract(r#"{"dialogue": "", "image_prompt": "x"}"#).unwrap_err();
        assert_eq!(err, StoryError::EmptyField("dialogue"));
    }

    // ---- infer_aspect_ratio ---

    #[test]
    fn vertical_anywhere_is_portrait() {
        for prompt in ["vertical", "a VERTICAL poster", "city at night, vertical framing"] {
            assert_eq!(
                infer_aspect_ratio(prompt, AspectRatio::Landscape),
                AspectRatio::Portrait,
                "{prompt}"
            );
        }
    }

    #[test]
    fn only_16_9_is_landscape() {
        assert_eq!(
            infer_aspect_ratio("ocean waves, 16:9", AspectRatio::Portrait),
            AspectRatio::Landscape
        );
    }

    #[test]
    fn no_marker_keeps_request_value() {
        assert_eq!(
            infer_aspect_ratio("a red bicycle", AspectRatio::Portrait),
            AspectRatio::Portrait
        );
        assert_eq!(
            infer_aspect_ratio("a red bicycle", AspectRatio::Landscape),
            AspectRatio::Landscape
        );
    }

    #[test]
    fn portrait_wins_when_both_markers_present() {
        assert_eq!(
            infer_aspect_ratio("landscape scenery shot 9:16", AspectRatio::Landscape),
            AspectRatio::Portrait
        );
        assert_eq!(
            infer_aspect_ratio("16:9 or vertical?", AspectRatio::Landscape),
            AspectRatio::Portrait
        );
    }

    #[test]
    fn inference_is_deterministic() {
        let prompt = "misty forest, vertical";
        let first = infer_aspect_ratio(prompt, AspectRatio::Landscape);
        for _ in 0..10 {
            assert_eq!(infer_aspect_ratio(prompt, AspectRatio::Landscape), first);
        }
    }
}
