//! Application entry point: Veo Studio CLI.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Parse the command line and load [`AppConfig`] (defaults on first run).
//! 3. Build the first [`GenerationRequest`] from the prompt or story file.
//! 4. Build the key store, HTTP client, credential gate and playback backend.
//! 5. Create the studio channels (`command`, `event`).
//! 6. Run [`Studio::run`] and the CLI driver side by side in the main task
//!    until the last requested clip has been written.
//!
//! ```text
//! veo-studio "a heron lifting off a misty lake"
//! veo-studio --story scene.json --aspect 9:16 --play
//! veo-studio "a paper boat" --extend "it reaches a river" --extend "night falls"
//! ```

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use veo_studio::{
    audio::PlaybackBackend,
    config::AppConfig,
    generation::{
        AspectRatio, GenerationRequest, GenerationResult, MediaAttachment, Resolution, VeoModel,
    },
    service::{ApiKeyStore, GeminiClient, KeyStoreGate},
    session::{SessionPhase, Studio, StudioCommand, StudioEvent},
};

/// Key prompts allowed before giving up.
const MAX_KEY_PROMPTS: usize = 3;

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

/// Generate videos (and story speech tracks) with Veo.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Text prompt.  Ignored when `--story` is given.
    prompt: Option<String>,

    /// File containing a story script (JSON with `dialogue`, `tone`,
    /// `image_prompt`); produces a video plus a speech track.
    #[arg(long, value_name = "FILE")]
    story: Option<PathBuf>,

    /// Aspect ratio: 16:9 or 9:16.
    #[arg(long)]
    aspect: Option<AspectRatio>,

    /// Resolution: 720p or 1080p.  Only 720p videos can be extended.
    #[arg(long)]
    resolution: Option<Resolution>,

    /// Model: fast or quality.
    #[arg(long)]
    model: Option<VeoModel>,

    /// First frame image (png, jpeg, webp).
    #[arg(long, value_name = "IMAGE")]
    start_frame: Option<PathBuf>,

    /// Last frame image.
    #[arg(long, value_name = "IMAGE")]
    end_frame: Option<PathBuf>,

    /// Reuse the start frame as the last frame.
    #[arg(long = "loop")]
    looping: bool,

    /// Subject reference image; repeatable.
    #[arg(long = "reference", value_name = "IMAGE")]
    references: Vec<PathBuf>,

    /// Style reference image.
    #[arg(long, value_name = "IMAGE")]
    style: Option<PathBuf>,

    /// Continue the previous video with this prompt; repeat to chain.
    #[arg(long = "extend", value_name = "PROMPT")]
    extends: Vec<String>,

    /// Output directory (default: from settings, else the platform video dir).
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Play story speech tracks on the default output device.
    #[arg(long)]
    play: bool,

    /// Settings file to use instead of the platform default.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Request building
// ---------------------------------------------------------------------------

fn build_request(args: &Args, config: &AppConfig) -> Result<GenerationRequest> {
    let request = match (&args.story, &args.prompt) {
        (Some(path), _) => {
            let script = fs::read_to_string(path)
                .with_context(|| format!("reading story script {}", path.display()))?;
            GenerationRequest::story(script)
        }
        (None, Some(prompt)) => GenerationRequest::text(prompt.clone()),
        (None, None) => bail!("give a prompt or --story <FILE>"),
    };

    let mut request = request
        .aspect_ratio(args.aspect.unwrap_or(config.video.aspect_ratio))
        .resolution(args.resolution.unwrap_or(config.video.resolution))
        .model(args.model.unwrap_or(config.video.model));

    request.start_frame = args.start_frame.as_deref().map(load_image).transpose()?;
    request.end_frame = args.end_frame.as_deref().map(load_image).transpose()?;
    request.reference_images = args
        .references
        .iter()
        .map(|p| load_image(p))
        .collect::<Result<_>>()?;
    request.style_image = args.style.as_deref().map(load_image).transpose()?;
    request.is_looping = args.looping;

    if !args.extends.is_empty() && !request.can_extend() {
        bail!(
            "--extend needs a {} video, not {}",
            Resolution::EXTEND_TIER,
            request.resolution
        );
    }
    Ok(request)
}

fn load_image(path: &Path) -> Result<MediaAttachment> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let mime_type = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        other => bail!("unsupported image type `{other}` ({})", path.display()),
    };
    let bytes = fs::read(path).with_context(|| format!("reading image {}", path.display()))?;
    Ok(MediaAttachment::new(bytes, mime_type))
}

// ---------------------------------------------------------------------------
// Playback backend
// ---------------------------------------------------------------------------

#[cfg(feature = "playback")]
fn playback_backend(_play: bool) -> impl PlaybackBackend {
    veo_studio::audio::RodioBackend
}

#[cfg(not(feature = "playback"))]
fn playback_backend(play: bool) -> impl PlaybackBackend {
    if play {
        log::warn!("built without the `playback` feature; --play is ignored");
    }
    veo_studio::audio::SilentBackend
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// What the driver expects the next studio event to be about.
#[derive(Debug, Clone, Copy)]
enum Waiting {
    Attempt,
    Prefill,
    Credentials,
    Playback(Duration),
}

/// Feeds the studio one step at a time and writes every finished clip.
struct Driver {
    commands: mpsc::Sender<StudioCommand>,
    out_dir: PathBuf,
    request: GenerationRequest,
    extends: VecDeque<String>,
    next_prompt: String,
    play: bool,
    clips: usize,
    key_prompts: usize,
}

impl Driver {
    async fn drive(mut self, mut events: mpsc::Receiver<StudioEvent>) -> Result<()> {
        self.send(StudioCommand::Submit(self.request.clone())).await?;
        let mut waiting = Waiting::Attempt;

        while let Some(event) = events.recv().await {
            waiting = match (waiting, event) {
                (_, StudioEvent::Rejected(action)) => bail!("studio rejected `{action}`"),
                (_, StudioEvent::CredentialSelectionRequired) => {
                    self.reselect().await?;
                    Waiting::Credentials
                }
                (_, StudioEvent::PlaybackFailed(message)) => {
                    log::warn!("cli: playback failed: {message}");
                    match self.next_step().await? {
                        Some(next) => next,
                        None => return Ok(()),
                    }
                }
                (Waiting::Attempt, StudioEvent::Updated(snapshot)) => match snapshot.phase {
                    SessionPhase::Loading => {
                        eprintln!("Generating ({})...", self.request.mode.label());
                        Waiting::Attempt
                    }
                    SessionPhase::Success => {
                        let result = snapshot
                            .result
                            .ok_or_else(|| anyhow!("finished session has no result"))?;
                        self.save(&result)?;
                        match result.audio.as_ref().filter(|_| self.play) {
                            Some(audio) => {
                                self.send(StudioCommand::Play).await?;
                                Waiting::Playback(audio.duration())
                            }
                            None => match self.next_step().await? {
                                Some(next) => next,
                                None => return Ok(()),
                            },
                        }
                    }
                    SessionPhase::Error => {
                        let message = snapshot.error_message.unwrap_or_default();
                        if !snapshot.reselection_pending {
                            bail!(message);
                        }
                        eprintln!("{message}");
                        self.reselect().await?;
                        Waiting::Credentials
                    }
                    SessionPhase::Idle => Waiting::Attempt,
                },
                (Waiting::Credentials, StudioEvent::Updated(snapshot)) => match snapshot.phase {
                    SessionPhase::Loading => Waiting::Attempt,
                    SessionPhase::Idle => {
                        self.send(StudioCommand::Submit(self.request.clone())).await?;
                        Waiting::Attempt
                    }
                    SessionPhase::Success | SessionPhase::Error => Waiting::Credentials,
                },
                (Waiting::Prefill, StudioEvent::Updated(snapshot)) => {
                    let mut next = snapshot
                        .prefill
                        .ok_or_else(|| anyhow!("extend produced no request"))?;
                    next.prompt = std::mem::take(&mut self.next_prompt);
                    self.request = next.clone();
                    self.send(StudioCommand::Submit(next)).await?;
                    Waiting::Attempt
                }
                (Waiting::Playback(duration), StudioEvent::Updated(_)) => {
                    tokio::time::sleep(duration).await;
                    match self.next_step().await? {
                        Some(next) => next,
                        None => return Ok(()),
                    }
                }
            };
        }

        bail!("studio stopped unexpectedly")
    }

    /// Start the next extend, or `None` when the chain is done.
    async fn next_step(&mut self) -> Result<Option<Waiting>> {
        let Some(prompt) = self.extends.pop_front() else {
            return Ok(None);
        };
        self.next_prompt = prompt;
        self.send(StudioCommand::Extend).await?;
        Ok(Some(Waiting::Prefill))
    }

    async fn reselect(&mut self) -> Result<()> {
        self.key_prompts += 1;
        if self.key_prompts > MAX_KEY_PROMPTS {
            bail!("no usable API key; set it in settings.toml or the configured environment variable");
        }
        self.send(StudioCommand::ReselectCredentials).await
    }

    fn save(&mut self, result: &GenerationResult) -> Result<()> {
        self.clips += 1;

        let video = self.out_dir.join(format!("video-{:02}.mp4", self.clips));
        fs::write(&video, &result.video_payload)
            .with_context(|| format!("writing {}", video.display()))?;
        println!("{}", video.display());

        if let Some(audio) = &result.audio {
            let speech = self.out_dir.join(format!("speech-{:02}.wav", self.clips));
            audio
                .write_wav(&speech)
                .with_context(|| format!("writing {}", speech.display()))?;
            println!("{}", speech.display());
        }

        log::info!(
            "cli: clip {} saved (source {})",
            self.clips,
            result.video_resource.as_str()
        );
        Ok(())
    }

    async fn send(&self, command: StudioCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| anyhow!("studio stopped unexpectedly"))
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Command line + configuration
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => AppConfig::load().unwrap_or_else(|e| {
            log::warn!("Failed to load config ({e}); using defaults");
            AppConfig::default()
        }),
    };

    // 3. First request
    let request = build_request(&args, &config)?;
    let out_dir = args.out.clone().unwrap_or_else(|| config.output_dir());
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;
    log::info!("Veo Studio starting ({}, output {})", request.mode.label(), out_dir.display());

    // 4. Collaborators
    let keys = ApiKeyStore::from_config(&config.api);
    let client = GeminiClient::from_config(&config, keys.clone());
    let gate = KeyStoreGate::stdin(keys);
    let studio = Studio::new(client, gate, playback_backend(args.play));

    // 5. Channel setup
    let (command_tx, command_rx) = mpsc::channel::<StudioCommand>(8);
    let (event_tx, event_rx) = mpsc::channel::<StudioEvent>(16);

    // 6. Studio loop + driver
    let driver = Driver {
        commands: command_tx,
        out_dir,
        request,
        extends: args.extends.into_iter().collect(),
        next_prompt: String::new(),
        play: args.play,
        clips: 0,
        key_prompts: 0,
    };

    let ((), outcome) = tokio::join!(studio.run(command_rx, event_tx), driver.drive(event_rx));
    outcome
}
