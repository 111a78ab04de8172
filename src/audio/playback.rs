//! Scoped speech-track playback.
//!
//! [`AudioPlayback`] owns at most one output context and at most one active
//! source:
//!
//! * the context is opened lazily on the first [`play`](AudioPlayback::play);
//! * starting a new source stops the previous one first;
//! * [`release`](AudioPlayback::release) stops the source and closes the
//!   context, and runs on `Drop` as well, so every exit path gives the device
//!   back.
//!
//! The device itself sits behind [`PlaybackBackend`].  [`RodioBackend`] (cargo
//! feature `playback`) drives the default output device; [`SilentBackend`]
//! accepts everything and plays nothing.

use thiserror::Error;

use super::buffer::AudioBuffer;

// ---------------------------------------------------------------------------
// PlaybackError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// The output device could not be opened.
    #[error("audio output unavailable: {0}")]
    Device(String),

    /// The buffer cannot be played (e.g. zero channels).
    #[error("unplayable audio buffer: {0}")]
    Unplayable(String),
}

// ---------------------------------------------------------------------------
// PlaybackBackend
// ---------------------------------------------------------------------------

/// An audio output device.
pub trait PlaybackBackend {
    /// Device-level resource (an open output stream).
    type Context;
    /// One playing buffer.
    type Source;

    fn open_context(&self) -> Result<Self::Context, PlaybackError>;

    fn start(
        &self,
        context: &Self::Context,
        buffer: &AudioBuffer,
    ) -> Result<Self::Source, PlaybackError>;

    fn stop(&self, source: Self::Source);

    fn close_context(&self, context: Self::Context);
}

// ---------------------------------------------------------------------------
// AudioPlayback
// ---------------------------------------------------------------------------

/// Playback slot bound to the currently displayed result.
pub struct AudioPlayback<B: PlaybackBackend> {
    backend: B,
    context: Option<B::Context>,
    source: Option<B::Source>,
}

impl<B: PlaybackBackend> AudioPlayback<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            context: None,
            source: None,
        }
    }

    /// Play `buffer` from the start, replacing whatever was playing.
    pub fn play(&mut self, buffer: &AudioBuffer) -> Result<(), PlaybackError> {
        if buffer.channel_count() == 0 {
            return Err(PlaybackError::Unplayable("no channels".into()));
        }

        if let Some(previous) = self.source.take() {
            self.backend.stop(previous);
        }

        let context = match self.context.take() {
            Some(context) => context,
            None => {
                log::debug!("playback: opening output context");
                self.backend.open_context()?
            }
        };

        let started = self.backend.start(&context, buffer);
        self.context = Some(context);
        self.source = Some(started?);

        log::debug!(
            "playback: started {:.2}s @ {} Hz",
            buffer.duration().as_secs_f32(),
            buffer.sample_rate()
        );
        Ok(())
    }

    /// Stop the active source, keeping the context for the next replay.
    pub fn stop(&mut self) {
        if let Some(source) = self.source.take() {
            self.backend.stop(source);
        }
    }

    /// Stop the source and close the context.
    pub fn release(&mut self) {
        self.stop();
        if let Some(context) = self.context.take() {
            log::debug!("playback: releasing output context");
            self.backend.close_context(context);
        }
    }

    pub fn is_playing(&self) -> bool {
        self.source.is_some()
    }

    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: PlaybackBackend> Drop for AudioPlayback<B> {
    fn drop(&mut self) {
        self.release();
    }
}

// ---------------------------------------------------------------------------
// SilentBackend
// ---------------------------------------------------------------------------

/// Backend with no device; every call succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentBackend;

impl PlaybackBackend for SilentBackend {
    type Context = ();
    type Source = ();

    fn open_context(&self) -> Result<(), PlaybackError> {
        Ok(())
    }

    fn start(&self, _context: &(), _buffer: &AudioBuffer) -> Result<(), PlaybackError> {
        Ok(())
    }

    fn stop(&self, _source: ()) {}

    fn close_context(&self, _context: ()) {}
}

// ---------------------------------------------------------------------------
// RodioBackend
// ---------------------------------------------------------------------------

/// Default output device via `rodio`.
#[cfg(feature = "playback")]
#[derive(Debug, Default, Clone, Copy)]
pub struct RodioBackend;

#[cfg(feature = "playback")]
impl PlaybackBackend for RodioBackend {
    type Context = rodio::OutputStream;
    type Source = rodio::Sink;

    fn open_context(&self) -> Result<Self::Context, PlaybackError> {
        rodio::OutputStreamBuilder::open_default_stream()
            .map_err(|e| PlaybackError::Device(e.to_string()))
    }

    fn start(
        &self,
        context: &Self::Context,
        buffer: &AudioBuffer,
    ) -> Result<Self::Source, PlaybackError> {
        let sink = rodio::Sink::connect_new(context.mixer());
        let source = rodio::buffer::SamplesBuffer::new(
            buffer.channel_count() as u16,
            buffer.sample_rate(),
            buffer.interleaved(),
        );
        sink.append(source);
        Ok(sink)
    }

    fn stop(&self, source: Self::Source) {
        source.stop();
    }

    fn close_context(&self, context: Self::Context) {
        drop(context);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
