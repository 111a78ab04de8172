//! Veo Studio: video + speech generation sessions.
//!
//! The crate drives a single generation session against a multi-modal
//! generation service: a request is submitted, one or two collaborator calls
//! run concurrently (video, and speech for story mode), the results are joined
//! into one playable [`GenerationResult`](generation::GenerationResult), and the
//! session can then be retried, reset, or extended from the finished video.
//!
//! # Modules
//!
//! * [`audio`]: raw PCM decoding, playable buffers, scoped playback.
//! * [`config`]: TOML settings and platform paths.
//! * [`generation`]: request model, story scripts, orchestrator, extend chain,
//!   failure classification.
//! * [`service`]: collaborator traits and the HTTP client.
//! * [`session`]: lifecycle state machine and the async [`Studio`](session::Studio)
//!   controller.

pub mod audio;
pub mod config;
pub mod generation;
pub mod service;
pub mod session;
