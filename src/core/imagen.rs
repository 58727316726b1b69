/// Ending artwork — turns an ending snapshot into a prompt, sends it to an
/// Imagen-style `:predict` endpoint and hands the decoded image back.
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::core::resolver::{NarrativeTemplateResolver, ResolvedEnding};
use crate::schema::record::EndingSnapshot;

pub const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/imagen-4.0-generate-001:predict";

pub const ENV_API_KEY: &str = "LEX_SPECULUM_IMAGEN_KEY";
pub const ENV_ENDPOINT: &str = "LEX_SPECULUM_IMAGEN_URL";
pub const ENV_TIMEOUT_SECS: &str = "LEX_SPECULUM_IMAGEN_TIMEOUT_SECS";

/// Header carrying the API key. The key never goes into the URL, which
/// reqwest echoes in its error messages.
pub const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("no API key configured (set LEX_SPECULUM_IMAGEN_KEY)")]
    MissingApiKey,
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),
    #[error("image service answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("response carried no predictions")]
    NoPredictions,
    #[error("image payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        RemoteError::Http(e.without_url())
    }
}

impl RemoteError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            #[cfg(feature = "http")]
            RemoteError::Http(e) => e.is_timeout() || e.is_connect(),
            RemoteError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ImagenConfig {
    pub endpoint: String,
    pub api_key: String,
    pub sample_count: u32,
    pub aspect_ratio: String,
    pub timeout: Duration,
    /// Total tries per request, including the first.
    pub max_attempts: u32,
}

impl Default for ImagenConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: String::new(),
            sample_count: 1,
            aspect_ratio: "16:9".to_string(),
            timeout: Duration::from_secs(60),
            max_attempts: 1,
        }
    }
}

impl fmt::Debug for ImagenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = if self.api_key.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("ImagenConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &key)
            .field("sample_count", &self.sample_count)
            .field("aspect_ratio", &self.aspect_ratio)
            .field("timeout", &self.timeout)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

impl ImagenConfig {
    /// Defaults overridden by `LEX_SPECULUM_IMAGEN_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(key) = lookup(ENV_API_KEY) {
            config.api_key = key.trim().to_string();
        }
        if let Some(url) = lookup(ENV_ENDPOINT) {
            config.endpoint = url.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => config.timeout = Duration::from_secs(secs),
                Err(_) => warn!(value = %raw, "ignoring invalid {}", ENV_TIMEOUT_SECS),
            }
        }
        config
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictRequest {
    pub instances: Vec<PromptInstance>,
    pub parameters: PredictParameters,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptInstance {
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictParameters {
    pub sample_count: u32,
    pub aspect_ratio: String,
}

impl PredictRequest {
    pub fn new(prompt: &str, config: &ImagenConfig) -> Self {
        Self {
            instances: vec![PromptInstance {
                prompt: prompt.to_string(),
            }],
            parameters: PredictParameters {
                sample_count: config.sample_count,
                aspect_ratio: config.aspect_ratio.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictResponse {
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(rename = "bytesBase64Encoded")]
    pub bytes_base64: String,
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Decode the first prediction's image bytes. Later predictions are ignored.
pub fn decode_first_prediction(response: &PredictResponse) -> Result<Vec<u8>, RemoteError> {
    let first = response
        .predictions
        .first()
        .ok_or(RemoteError::NoPredictions)?;
    Ok(general_purpose::STANDARD.decode(first.bytes_base64.trim())?)
}

/// Something that can turn a prompt into image bytes.
pub trait ImageBackend {
    fn generate(&self, prompt: &str) -> Result<Vec<u8>, RemoteError>;
}

#[cfg(feature = "http")]
pub struct HttpImageBackend {
    client: reqwest::blocking::Client,
    config: ImagenConfig,
}

#[cfg(feature = "http")]
impl HttpImageBackend {
    pub fn new(config: ImagenConfig) -> Result<Self, RemoteError> {
        if config.api_key.is_empty() {
            return Err(RemoteError::MissingApiKey);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ImagenConfig {
        &self.config
    }

    fn build_request(&self, prompt: &str) -> Result<reqwest::blocking::Request, RemoteError> {
        let request = PredictRequest::new(prompt, &self.config);
        Ok(self
            .client
            .post(&self.config.endpoint)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&request)
            .build()?)
    }
}

#[cfg(feature = "http")]
impl ImageBackend for HttpImageBackend {
    fn generate(&self, prompt: &str) -> Result<Vec<u8>, RemoteError> {
        let request = self.build_request(prompt)?;
        let response = self.client.execute(request)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let body: PredictResponse = response.json()?;
        decode_first_prediction(&body)
    }
}

/// A generated ending: the resolved texts and the image drawn from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndingArtwork {
    pub ending: ResolvedEnding,
    pub prompt: String,
    pub image: Vec<u8>,
}

impl EndingArtwork {
    pub fn narrative(&self) -> &[String; 3] {
        &self.ending.narrative
    }
}

pub struct EndingService<B> {
    backend: B,
    resolver: NarrativeTemplateResolver,
    max_attempts: u32,
}

#[cfg(feature = "http")]
impl EndingService<HttpImageBackend> {
    /// Service talking to the configured HTTP endpoint.
    pub fn from_config(
        config: ImagenConfig,
        resolver: NarrativeTemplateResolver,
    ) -> Result<Self, RemoteError> {
        let attempts = config.max_attempts;
        Ok(Self::new(HttpImageBackend::new(config)?, resolver).with_max_attempts(attempts))
    }
}

impl<B: ImageBackend> EndingService<B> {
    pub fn new(backend: B, resolver: NarrativeTemplateResolver) -> Self {
        Self {
            backend,
            resolver,
            max_attempts: 1,
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Resolve the ending for `snapshot` and request its image.
    pub fn request_ending(&self, snapshot: &EndingSnapshot) -> Result<EndingArtwork, RemoteError> {
        match snapshot.to_json() {
            Ok(json) => info!(snapshot = %json, "requesting ending"),
            Err(e) => warn!(error = %e, "could not serialize snapshot for logging"),
        }

        let ending = self.resolver.resolve(snapshot);
        let prompt = ending.visual_prompt();

        let mut attempt = 1;
        let image = loop {
            match self.backend.generate(&prompt) {
                Ok(image) => break image,
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!(attempt, error = %e, "image request failed, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };
        info!(bytes = image.len(), attempt, "ending image received");

        Ok(EndingArtwork {
            ending,
            prompt,
            image,
        })
    }

    /// Fire-and-forget variant: `on_complete` runs only on success, failures
    /// are logged.
    pub fn generate_ending<F>(&self, snapshot: &EndingSnapshot, on_complete: F)
    where
        F: FnOnce(EndingArtwork),
    {
        match self.request_ending(snapshot) {
            Ok(artwork) => on_complete(artwork),
            Err(e) => error!(error = %e, "ending generation failed"),
        }
    }
}
