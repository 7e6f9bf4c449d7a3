//! Content generation service client.
//!
//! The orchestrator never produces prose itself. It hands a
//! [`GenerationRequest`] to a [`ContentGenerator`] and writes whatever body
//! comes back. [`HttpGenerator`] POSTs the request as JSON to the configured
//! endpoint and expects `{"body": "...", "summary": "..."}` in return.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use scribe_core::config::GeneratorConfig;
use scribe_core::types::{ChangeLevel, GeneratorId, Language};

/// Cap on response size accepted from the service.
const MAX_RESPONSE_BYTES: u64 = 4 * 1024 * 1024;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub source_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    pub change_level: ChangeLevel,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface_skeleton: Option<String>,
    /// Body of the artifact being replaced, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_body: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeneratedArtifact {
    pub body: String,
    /// One-line description for the directory summary. When absent the
    /// first prose line of `body` is used.
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("no content generator configured; set generator.endpoint in .scribe/config.yaml")]
    Unconfigured,

    #[error("generator returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("generator unreachable: {0}")]
    Transport(String),

    #[error("invalid generator response: {0}")]
    InvalidResponse(String),

    #[error("environment variable {0} is not set")]
    MissingApiKey(String),
}

pub trait ContentGenerator: Send + Sync {
    /// Recorded as `generator_id` in every footer this generator produces.
    fn id(&self) -> GeneratorId;

    fn generate(&self, request: &GenerationRequest) -> Result<GeneratedArtifact, GenerateError>;
}

// ---------------------------------------------------------------------------
// Unconfigured
// ---------------------------------------------------------------------------

/// Stand-in used when no endpoint is configured. Every call fails, so files
/// needing generation are counted as failed and retried on the next run.
#[derive(Debug, Clone)]
pub struct UnconfiguredGenerator {
    id: GeneratorId,
}

impl UnconfiguredGenerator {
    pub fn new(id: impl Into<GeneratorId>) -> Self {
        Self { id: id.into() }
    }
}

impl ContentGenerator for UnconfiguredGenerator {
    fn id(&self) -> GeneratorId {
        self.id.clone()
    }

    fn generate(&self, _request: &GenerationRequest) -> Result<GeneratedArtifact, GenerateError> {
        Err(GenerateError::Unconfigured)
    }
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

pub struct HttpGenerator {
    agent: ureq::Agent,
    endpoint: String,
    id: GeneratorId,
    token: Option<String>,
}

impl HttpGenerator {
    pub fn new(endpoint: impl Into<String>, id: impl Into<GeneratorId>, timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout_connect(CONNECT_TIMEOUT)
                .timeout(timeout)
                .build(),
            endpoint: endpoint.into(),
            id: id.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Build from config. The bearer token is read from the environment
    /// variable named by `api_key_env` at construction time.
    pub fn from_config(config: &GeneratorConfig) -> Result<Self, GenerateError> {
        let endpoint = config.endpoint.clone().ok_or(GenerateError::Unconfigured)?;
        let mut generator = Self::new(
            endpoint,
            config.id.as_str(),
            Duration::from_secs(config.timeout_secs),
        );
        if let Some(var) = &config.api_key_env {
            let token =
                std::env::var(var).map_err(|_| GenerateError::MissingApiKey(var.clone()))?;
            generator = generator.with_token(token);
        }
        Ok(generator)
    }
}

impl ContentGenerator for HttpGenerator {
    fn id(&self) -> GeneratorId {
        self.id.clone()
    }

    fn generate(&self, request: &GenerationRequest) -> Result<GeneratedArtifact, GenerateError> {
        let mut req = self
            .agent
            .post(&self.endpoint)
            .set("Accept", "application/json");
        if let Some(token) = &self.token {
            req = req.set("Authorization", &format!("Bearer {}", token.trim()));
        }

        let response = match req.send_json(request) {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(GenerateError::Status {
                    code,
                    body: truncate(&body, 200),
                });
            }
            Err(ureq::Error::Transport(err)) => {
                return Err(GenerateError::Transport(err.to_string()));
            }
        };

        let mut raw = String::new();
        response
            .into_reader()
            .take(MAX_RESPONSE_BYTES)
            .read_to_string(&mut raw)
            .map_err(|e| GenerateError::InvalidResponse(e.to_string()))?;
        let artifact: GeneratedArtifact = serde_json::from_str(&raw)
            .map_err(|e| GenerateError::InvalidResponse(e.to_string()))?;
        if artifact.body.trim().is_empty() {
            return Err(GenerateError::InvalidResponse("empty body".to_string()));
        }
        Ok(artifact)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// The generator selected by `config`: HTTP when an endpoint is set,
/// otherwise [`UnconfiguredGenerator`].
pub fn from_config(config: &GeneratorConfig) -> Result<Arc<dyn ContentGenerator>, GenerateError> {
    match config.endpoint {
        Some(_) => Ok(Arc::new(HttpGenerator::from_config(config)?)),
        None => Ok(Arc::new(UnconfiguredGenerator::new(config.id.as_str()))),
    }
}
