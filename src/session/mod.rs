//! Session module: lifecycle state machine and the studio controller.
//!
//! # Architecture
//!
//! ```text
//! StudioCommand (mpsc)
//!        │
//!        ▼
//! Studio::run()  ← async task (not spawned; playback handles may be !Send)
//!        │
//!        ├─ Submit / Retry ─▶ CredentialGate::has_selected_api_key
//!        │                     ├─ no  → CredentialSelectionRequired
//!        │                     └─ yes → SessionState (Loading)
//!        │                              → Orchestrator::generate
//!        │                              → SessionState (Success | Error)
//!        │
//!        ├─ ReselectCredentials ─▶ open_select_key → retry if Error
//!        ├─ TryAgain / New / Extend ─▶ SessionState transitions
//!        └─ Play / StopPlayback ─▶ AudioPlayback
//!
//! StudioEvent (mpsc) ◀── snapshot after every applied command
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use tokio::sync::mpsc;
//! use veo_studio::audio::SilentBackend;
//! use veo_studio::config::AppConfig;
//! use veo_studio::generation::GenerationRequest;
//! use veo_studio::service::{ApiKeyStore, GeminiClient, KeyStoreGate};
//! use veo_studio::session::{Studio, StudioCommand, StudioEvent};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let keys = ApiKeyStore::from_config(&config.api);
//!     let client = GeminiClient::from_config(&config, keys.clone());
//!     let studio = Studio::new(client, KeyStoreGate::stdin(keys), SilentBackend);
//!
//!     let (cmd_tx, cmd_rx) = mpsc::channel(8);
//!     let (ev_tx, mut ev_rx) = mpsc::channel(8);
//!
//!     let driver = async move {
//!         cmd_tx
//!             .send(StudioCommand::Submit(GenerationRequest::text("a heron")))
//!             .await
//!             .unwrap();
//!         drop(cmd_tx);
//!         while let Some(event) = ev_rx.recv().await {
//!             if let StudioEvent::Updated(snapshot) = event {
//!                 println!("{}", snapshot.phase.label());
//!             }
//!         }
//!     };
//!
//!     tokio::join!(studio.run(cmd_rx, ev_tx), driver);
//! }
//! ```

pub mod state;
pub mod studio;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use state::{SessionPhase, SessionState};
pub use studio::{ActionOutcome, SessionSnapshot, Studio, StudioCommand, StudioEvent};
