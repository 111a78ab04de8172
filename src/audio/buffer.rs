//! Playable, planar `f32` audio buffer.
//!
//! Samples are normalised to `[-1.0, 1.0]` and stored one `Vec` per channel,
//! all of equal length.  The buffer is independent of the encoding it was
//! decoded from and can be handed to a playback backend or written to WAV.
//!
//! # Example
//!
//! ```rust
//! use veo_studio::audio::AudioBuffer;
//!
//! let buf = AudioBuffer::from_planar(24_000, vec![vec![0.0; 12_000]]);
//! assert_eq!(buf.frames(), 12_000);
//! assert_eq!(buf.duration().as_millis(), 500);
//! ```

use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// AudioBuffer
// ---------------------------------------------------------------------------

/// Decoded audio ready for playback.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    /// One sample vector per channel; all the same length.
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Build a buffer from per-channel sample vectors.
    ///
    /// Channels longer than the shortest one are truncated so that every
    /// channel holds the same number of frames.
    pub fn from_planar(sample_rate: u32, mut channels: Vec<Vec<f32>>) -> Self {
        let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
        for channel in &mut channels {
            channel.truncate(frames);
        }
        Self {
            sample_rate,
            channels,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel.
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Samples of one channel, or `None` when `index` is out of range.
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Playback length.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Frame-interleaved copy (`L R L R …`), the layout playback devices want.
    pub fn interleaved(&self) -> Vec<f32> {
        let channels = self.channel_count();
        let mut out = Vec::with_capacity(self.frames() * channels);
        for frame in 0..self.frames() {
            for channel in &self.channels {
                out.push(channel[frame]);
            }
        }
        out
    }

    /// Write the buffer as 16-bit PCM WAV.
    pub fn write_wav(&self, path: impl AsRef<Path>) -> Result<(), hound::Error> {
        let spec = hound::WavSpec {
            channels: self.channel_count().max(1) as u16,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(path, spec)?;
        for sample in self.interleaved() {
            let value = (sample * 32_768.0).round().clamp(i16::MIN as f32, i16::MAX as f32);
            writer.write_sample(value as i16)?;
        }
        writer.finalize()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
