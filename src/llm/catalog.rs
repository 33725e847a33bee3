//! Endpoint candidate catalog
//!
//! Declarative tables of what to try: URLs, auth header shapes and payload
//! shapes. The prober walks them in order (URL, then auth, then payload).

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use url::Url;

use crate::config::CompletionConfig;
use crate::constants::completion::DEFAULT_PATHS;
use crate::http::HttpRequest;
use crate::types::{RepoDocError, Result};

/// How the API key is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthScheme {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `x-api-key: <key>`
    XApiKey,
    /// `api-key: <key>`
    ApiKey,
    /// No credential header
    None,
}

impl AuthScheme {
    pub fn apply(&self, request: HttpRequest, key: Option<&SecretString>) -> HttpRequest {
        let Some(key) = key else {
            return request;
        };
        let key = key.expose_secret();
        match self {
            Self::Bearer => request.header("Authorization", format!("Bearer {}", key)),
            Self::XApiKey => request.header("x-api-key", key),
            Self::ApiKey => request.header("api-key", key),
            Self::None => request,
        }
    }
}

impl std::fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Bearer => "bearer",
            Self::XApiKey => "x-api-key",
            Self::ApiKey => "api-key",
            Self::None => "none",
        };
        write!(f, "{}", label)
    }
}

/// Inputs common to every payload shape
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub system: &'a str,
    pub prompt: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Request body layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PayloadShape {
    /// `messages: [{role, content}]`
    Chat,
    /// Single `prompt` string
    Prompt,
    /// `prompt` + `system` + `stream: false` with generation options
    OllamaGenerate,
    /// Top-level `system`, user-only `messages`, required `max_tokens`
    AnthropicMessages,
}

impl PayloadShape {
    pub const ALL: [PayloadShape; 4] = [
        Self::Chat,
        Self::Prompt,
        Self::OllamaGenerate,
        Self::AnthropicMessages,
    ];

    pub fn build(&self, request: &CompletionRequest<'_>) -> Value {
        match self {
            Self::Chat => json!({
                "model": request.model,
                "messages": [
                    {"role": "system", "content": request.system},
                    {"role": "user", "content": request.prompt}
                ],
                "temperature": request.temperature,
                "max_tokens": request.max_tokens,
            }),
            Self::Prompt => json!({
                "model": request.model,
                "prompt": format!("{}\n\n{}", request.system, request.prompt),
                "temperature": request.temperature,
                "max_tokens": request.max_tokens,
            }),
            Self::OllamaGenerate => json!({
                "model": request.model,
                "system": request.system,
                "prompt": request.prompt,
                "stream": false,
                "options": {
                    "temperature": request.temperature,
                    "num_predict": request.max_tokens,
                },
            }),
            Self::AnthropicMessages => json!({
                "model": request.model,
                "system": request.system,
                "messages": [{"role": "user", "content": request.prompt}],
                "max_tokens": request.max_tokens,
                "temperature": request.temperature,
            }),
        }
    }
}

impl std::fmt::Display for PayloadShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Chat => "chat",
            Self::Prompt => "prompt",
            Self::OllamaGenerate => "ollama-generate",
            Self::AnthropicMessages => "anthropic-messages",
        };
        write!(f, "{}", label)
    }
}

/// One hypothesis about how the service wants to be called
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointCandidate {
    pub url: String,
    pub auth: AuthScheme,
    pub payload: PayloadShape,
}

impl std::fmt::Display for EndpointCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [auth={}, payload={}]", self.url, self.auth, self.payload)
    }
}

/// Ordered candidate tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointCatalog {
    pub urls: Vec<String>,
    pub auth_schemes: Vec<AuthScheme>,
    pub payload_shapes: Vec<PayloadShape>,
}

impl EndpointCatalog {
    pub fn new(
        urls: Vec<String>,
        auth_schemes: Vec<AuthScheme>,
        payload_shapes: Vec<PayloadShape>,
    ) -> Self {
        Self {
            urls,
            auth_schemes: dedup(auth_schemes),
            payload_shapes: dedup(payload_shapes),
        }
    }

    /// Explicit endpoints win; otherwise known paths are appended to the base URL.
    /// Without an API key only the header-less scheme is tried.
    pub fn from_config(config: &CompletionConfig) -> Result<Self> {
        let urls = if !config.endpoints.is_empty() {
            config.endpoints.clone()
        } else if let Some(base) = &config.base_url {
            let base = base.trim_end_matches('/');
            DEFAULT_PATHS
                .iter()
                .map(|path| format!("{}{}", base, path))
                .collect()
        } else {
            Vec::new()
        };

        for url in &urls {
            Url::parse(url).map_err(|e| {
                RepoDocError::Config(format!("invalid completion endpoint '{}': {}", url, e))
            })?;
        }

        let auth_schemes = if config.api_key_secret().is_some() {
            config.auth_schemes.clone()
        } else {
            vec![AuthScheme::None]
        };

        Ok(Self::new(urls, auth_schemes, config.payload_shapes.clone()))
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty() || self.auth_schemes.is_empty() || self.payload_shapes.is_empty()
    }

    /// Total number of combinations
    pub fn len(&self) -> usize {
        self.urls.len() * self.auth_schemes.len() * self.payload_shapes.len()
    }
}

fn dedup<T: PartialEq + Copy>(items: Vec<T>) -> Vec<T> {
    let mut unique = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    unique
}
