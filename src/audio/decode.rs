//! Raw PCM decoding for synthesized speech.
//!
//! The speech service returns headerless signed 16-bit little-endian PCM,
//! base64-encoded.  [`decode_pcm16`] turns the raw bytes into a planar
//! [`AudioBuffer`]; [`decode_base64_pcm16`] handles the text form.
//!
//! Both are pure functions of `(payload, sample_rate, channels)`.

use base64::{engine::general_purpose, Engine};
use thiserror::Error;

use super::buffer::AudioBuffer;

/// Full-scale divisor for 16-bit samples.
const I16_SCALE: f32 = 32_768.0;

// ---------------------------------------------------------------------------
// DecodeError
// ---------------------------------------------------------------------------

/// Reasons a payload is not decodable PCM.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("channel count must be at least 1")]
    NoChannels,

    #[error("sample rate must be non-zero")]
    ZeroSampleRate,

    #[error("payload of {0} bytes is not a whole number of 16-bit samples")]
    OddByteLength(usize),

    #[error("payload is not valid base64: {0}")]
    Base64(String),
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode interleaved s16le PCM into normalised per-channel samples.
///
/// Frame count is `samples / channels`; a trailing partial frame is dropped.
///
/// ```
/// use veo_studio::audio::decode_pcm16;
///
/// // two stereo frames: (16384, -16384), (0, 32767)
/// let bytes = [0x00, 0x40, 0x00, 0xC0, 0x00, 0x00, 0xFF, 0x7F];
/// let buf = decode_pcm16(&bytes, 24_000, 2).unwrap();
/// assert_eq!(buf.frames(), 2);
/// assert_eq!(buf.channel(0).unwrap(), &[0.5, 0.0]);
/// assert_eq!(buf.channel(1).unwrap()[0], -0.5);
/// ```
pub fn decode_pcm16(
    payload: &[u8],
    sample_rate: u32,
    channels: u16,
) -> Result<AudioBuffer, DecodeError> {
    if channels == 0 {
        return Err(DecodeError::NoChannels);
    }
    if sample_rate == 0 {
        return Err(DecodeError::ZeroSampleRate);
    }
    if payload.len() % 2 != 0 {
        return Err(DecodeError::OddByteLength(payload.len()));
    }

    let channel_count = channels as usize;
    let total_samples = payload.len() / 2;
    let frames = total_samples / channel_count;

    let sample_at = |index: usize| -> f32 {
        let offset = index * 2;
        i16::from_le_bytes([payload[offset], payload[offset + 1]]) as f32 / I16_SCALE
    };

    let planar = (0..channel_count)
        .map(|channel| {
            (0..frames)
                .map(|frame| sample_at(frame * channel_count + channel))
                .collect()
        })
        .collect();

    Ok(AudioBuffer::from_planar(sample_rate, planar))
}

/// Base64-decode `encoded`, then [`decode_pcm16`] the bytes.
pub fn decode_base64_pcm16(
    encoded: &str,
    sample_rate: u32,
    channels: u16,
) -> Result<AudioBuffer, DecodeError> {
    let bytes = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| DecodeError::Base64(e.to_string()))?;
    decode_pcm16(&bytes, sample_rate, channels)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
