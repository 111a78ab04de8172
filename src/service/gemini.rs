//! `GeminiClient`: [`GenerationService`] over the Gemini REST API.
//!
//! * Video: `POST models/{model}:predictLongRunning`, then poll the returned
//!   operation until `done`, then download the generated file.
//! * Speech: `POST models/{tts_model}:generateContent` with an `AUDIO`
//!   response modality; the PCM comes back base64-encoded inline.
//!
//! The key is read from the shared [`ApiKeyStore`] on every call so a
//! reselected key takes effect on the next attempt.  No request timeout is
//! set.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine};
use serde_json::{json, Value};

use crate::config::{AppConfig, SpeechConfig};
use crate::generation::{MediaAttachment, VideoHandle, VideoResource};

use super::credentials::ApiKeyStore;
use super::{GenerationService, ServiceError, VideoArtifact, VideoCall};

const API_KEY_HEADER: &str = "x-goog-api-key";

// ---------------------------------------------------------------------------
// GeminiClient
// ---------------------------------------------------------------------------

/// HTTP client for the Gemini video and speech endpoints.
///
/// All connection details (`base_url`, poll interval, TTS model and voice)
/// come from [`AppConfig`]; the key comes from an [`ApiKeyStore`].
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    keys: ApiKeyStore,
    speech: SpeechConfig,
    poll_interval: Duration,
}

impl GeminiClient {
    pub fn from_config(config: &AppConfig, keys: ApiKeyStore) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
            keys,
            speech: config.speech.clone(),
            poll_interval: Duration::from_secs(config.api.poll_interval_secs.max(1)),
        }
    }

    fn key(&self) -> Result<String, ServiceError> {
        self.keys.get().ok_or(ServiceError::MissingApiKey)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1beta/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send with the API key attached; non-2xx bodies become [`ServiceError::Api`].
    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, ServiceError> {
        let response = req.header(API_KEY_HEADER, self.key()?).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(api_error(status, &body))
    }

    async fn send_json(&self, req: reqwest::RequestBuilder) -> Result<Value, ServiceError> {
        self.send(req)
            .await?
            .json()
            .await
            .map_err(|e| ServiceError::Parse(e.to_string()))
    }

    /// Poll a long-running operation until it reports `done`.
    async fn wait_for_operation(&self, mut operation: Value) -> Result<Value, ServiceError> {
        let name = operation["name"]
            .as_str()
            .ok_or(ServiceError::MissingContent("operation name"))?
            .to_string();

        while !operation["done"].as_bool().unwrap_or(false) {
            log::debug!("gemini: operation {name} pending, polling again in {:?}", self.poll_interval);
            tokio::time::sleep(self.poll_interval).await;
            operation = self.send_json(self.client.get(self.url(&name))).await?;
        }

        if let Some(error) = operation.get("error") {
            return Err(operation_error(error));
        }
        Ok(operation)
    }
}

#[async_trait]
impl GenerationService for GeminiClient {
    async fn generate_video(&self, call: &VideoCall) -> Result<VideoArtifact, ServiceError> {
        let url = self.url(&format!("models/{}:predictLongRunning", call.model.model_id()));
        log::info!(
            "gemini: video request ({}, {}, {})",
            call.model.model_id(),
            call.aspect_ratio,
            call.resolution
        );

        let started = self
            .send_json(self.client.post(&url).json(&video_body(call)))
            .await?;
        let finished = self.wait_for_operation(started).await?;
        let uri = generated_video_uri(&finished)?;

        let payload = self
            .send(self.client.get(&uri))
            .await?
            .bytes()
            .await?
            .to_vec();
        log::info!("gemini: downloaded video ({} bytes)", payload.len());

        Ok(VideoArtifact {
            handle: VideoHandle(uri.clone()),
            resource: VideoResource(uri),
            payload,
        })
    }

    async fn generate_speech(&self, dialogue: &str, tone: &str) -> Result<String, ServiceError> {
        let url = self.url(&format!("models/{}:generateContent", self.speech.model));
        log::info!("gemini: speech request (voice {}, tone {tone:?})", self.speech.voice);

        let body = speech_body(&speech_prompt(dialogue, tone), &self.speech.voice);
        let response = self.send_json(self.client.post(&url).json(&body)).await?;
        inline_audio(&response)
    }
}

// ---------------------------------------------------------------------------
// Wire format helpers
// ---------------------------------------------------------------------------

fn inline_image(media: &MediaAttachment) -> Value {
    json!({
        "bytesBase64Encoded": general_purpose::STANDARD.encode(&media.bytes),
        "mimeType": media.mime_type,
    })
}

/// `predictLongRunning` request body.
pub(crate) fn video_body(call: &VideoCall) -> Value {
    let mut instance = json!({ "prompt": call.prompt });

    if let Some(frame) = &call.start_frame {
        instance["image"] = inline_image(frame);
    }
    if let Some(frame) = &call.end_frame {
        instance["lastFrame"] = inline_image(frame);
    }

    let mut references: Vec<Value> = call
        .reference_images
        .iter()
        .map(|img| json!({ "image": inline_image(img), "referenceType": "asset" }))
        .collect();
    if let Some(style) = &call.style_image {
        references.push(json!({ "image": inline_image(style), "referenceType": "style" }));
    }
    if !references.is_empty() {
        instance["referenceImages"] = Value::Array(references);
    }

    if let Some(prior) = &call.prior_video {
        instance["video"] = json!({ "uri": prior.as_str() });
    }

    json!({
        "instances": [instance],
        "parameters": {
            "aspectRatio": call.aspect_ratio.as_str(),
            "resolution": call.resolution.as_str(),
            "numberOfVideos": 1,
        },
    })
}

pub(crate) fn speech_prompt(dialogue: &str, tone: &str) -> String {
    format!("Say in a {} tone: {}", tone.trim(), dialogue.trim())
}

pub(crate) fn speech_body(prompt: &str, voice: &str) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "responseModalities": ["AUDIO"],
            "speechConfig": {
                "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": voice } }
            }
        }
    })
}

/// URI of the first generated sample of a finished operation.
pub(crate) fn generated_video_uri(operation: &Value) -> Result<String, ServiceError> {
    let response = &operation["response"]["generateVideoResponse"];

    if let Some(uri) = response["generatedSamples"][0]["video"]["uri"].as_str() {
        return Ok(uri.to_string());
    }

    // Safety filters drop the sample and say why.
    if let Some(reasons) = response["raiMediaFilteredReasons"].as_array() {
        let reasons: Vec<&str> = reasons.iter().filter_map(Value::as_str).collect();
        if !reasons.is_empty() {
            return Err(ServiceError::Api {
                status: "FILTERED".into(),
                message: reasons.join("; "),
            });
        }
    }

    Err(ServiceError::MissingContent("generated video"))
}

/// Base64 PCM from a `generateContent` response.
pub(crate) fn inline_audio(response: &Value) -> Result<String, ServiceError> {
    response["candidates"][0]["content"]["parts"]
        .as_array()
        .into_iter()
        .flatten()
        .find_map(|part| part["inlineData"]["data"].as_str())
        .map(str::to_string)
        .ok_or(ServiceError::MissingContent("audio data"))
}

/// `error` object of a JSON error body or a failed operation.
fn operation_error(error: &Value) -> ServiceError {
    let status = error["status"]
        .as_str()
        .map(str::to_string)
        .or_else(|| error["code"].as_i64().map(|c| c.to_string()))
        .unwrap_or_else(|| "UNKNOWN".into());

    let mut message = error["message"]
        .as_str()
        .unwrap_or("operation failed")
        .to_string();

    let reasons: Vec<&str> = error["details"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|d| d["reason"].as_str())
        .collect();
    if !reasons.is_empty() {
        message = format!("{message} [{}]", reasons.join(", "));
    }

    ServiceError::Api { status, message }
}

pub(crate) fn api_error(status: reqwest::StatusCode, body: &str) -> ServiceError {
    match serde_json::from_str::<Value>(body) {
        Ok(value) if value.get("error").is_some() => operation_error(&value["error"]),
        _ => ServiceError::Api {
            status: status.as_u16().to_string(),
            message: if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body.trim().to_string()
            },
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
