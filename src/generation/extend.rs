//! Derive the next request of an extend chain.

use super::request::{
    GenerationMode, GenerationRequest, GenerationResult, MediaAttachment, Resolution,
};

/// MIME type the prior video is wrapped with.
pub const EXTEND_INPUT_MIME: &str = "video/mp4";

/// Build the pre-fill request that continues `result`.
///
/// The prompt is cleared, aspect ratio and model are carried over, resolution
/// is pinned to [`Resolution::EXTEND_TIER`] and every other attachment plus
/// the loop flag is reset.  Callers gate on [`GenerationRequest::can_extend`].
pub fn build_extend_request(
    last_request: &GenerationRequest,
    result: &GenerationResult,
) -> GenerationRequest {
    GenerationRequest {
        mode: GenerationMode::ExtendVideo {
            prior_video: result.video_handle.clone(),
            input_video: MediaAttachment::new(result.video_payload.clone(), EXTEND_INPUT_MIME),
        },
        prompt: String::new(),
        aspect_ratio: last_request.aspect_ratio,
        resolution: Resolution::EXTEND_TIER,
        model: last_request.model,
        start_frame: None,
        end_frame: None,
        reference_images: Vec::new(),
        style_image: None,
        is_looping: false,
    }
}
