//! Audio: speech payload decoding, playable buffers, scoped playback.
//!
//! # Pipeline
//!
//! ```text
//! base64 text → decode_base64_pcm16 → s16le bytes → decode_pcm16
//!            → AudioBuffer (planar f32, 24 kHz mono) → AudioPlayback / write_wav
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use veo_studio::audio::{decode_pcm16, AudioPlayback, SilentBackend};
//!
//! let buffer = decode_pcm16(&[0x00, 0x40, 0x00, 0xC0], 24_000, 1).unwrap();
//! let mut playback = AudioPlayback::new(SilentBackend);
//! playback.play(&buffer).unwrap(); // dropping `playback` releases the device
//! ```

pub mod buffer;
pub mod decode;
pub mod playback;

pub use buffer::AudioBuffer;
pub use decode::{decode_base64_pcm16, decode_pcm16, DecodeError};
#[cfg(feature = "playback")]
pub use playback::RodioBackend;
pub use playback::{AudioPlayback, PlaybackBackend, PlaybackError, SilentBackend};
