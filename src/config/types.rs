//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Credentials are plain strings here so they can be loaded from files and the
//! environment; they are never serialized and are redacted in debug output.
//! Constructors convert them to `SecretString` before use.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{
    completion as completion_constants, generation as generation_constants,
    repository as repository_constants, transport as transport_constants,
};
use crate::llm::{AuthScheme, PayloadShape};
use crate::types::{RepoDocError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Repository API access
    pub repository: RepositoryConfig,

    /// Completion endpoint discovery and generation settings
    pub completion: CompletionConfig,

    /// File budget, chunking and output
    pub generation: GenerationConfig,

    /// Which repository files are documented
    pub filter: FilterConfig,

    /// Timeouts and retry policy shared by all outbound calls
    pub transport: TransportConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            repository: RepositoryConfig::default(),
            completion: CompletionConfig::default(),
            generation: GenerationConfig::default(),
            filter: FilterConfig::default(),
            transport: TransportConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `RepoDocError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| Err(RepoDocError::Config(msg.to_string()));

        if self.generation.max_files == 0 {
            return fail("generation.max_files must be greater than 0");
        }
        if self.generation.max_chunk_size == 0 {
            return fail("generation.max_chunk_size must be greater than 0");
        }
        if self.repository.page_size == 0 || self.repository.max_pages == 0 {
            return fail("repository.page_size and repository.max_pages must be greater than 0");
        }
        if self.repository.branches.iter().all(|b| b.trim().is_empty()) {
            return fail("repository.branches must name at least one branch");
        }
        if self.completion.payload_shapes.is_empty() {
            return fail("completion.payload_shapes must not be empty");
        }
        if self.completion.auth_schemes.is_empty() {
            return fail("completion.auth_schemes must not be empty");
        }
        if !(0.0..=2.0).contains(&self.completion.temperature) {
            return Err(RepoDocError::Config(format!(
                "completion.temperature must be between 0.0 and 2.0, got {}",
                self.completion.temperature
            )));
        }
        if self.transport.timeout_secs == 0 {
            return fail("transport.timeout_secs must be greater than 0");
        }
        if self.transport.max_attempts == 0 {
            return fail("transport.max_attempts must be greater than 0");
        }

        Ok(())
    }
}

// =============================================================================
// Repository Configuration
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Access token sent as `PRIVATE-TOKEN`
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    /// API path prefix on the repository host
    pub api_prefix: String,

    /// Branch names tried in order when fetching file contents
    pub branches: Vec<String>,

    /// Entries per tree page
    pub page_size: usize,

    /// Page ceiling for one listing
    pub max_pages: usize,

    /// Verify TLS certificates on the first attempt
    pub verify_tls: bool,
}

impl std::fmt::Debug for RepositoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("api_prefix", &self.api_prefix)
            .field("branches", &self.branches)
            .field("page_size", &self.page_size)
            .field("max_pages", &self.max_pages)
            .field("verify_tls", &self.verify_tls)
            .finish()
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_prefix: repository_constants::API_PREFIX.to_string(),
            branches: repository_constants::DEFAULT_BRANCHES
                .iter()
                .map(|b| b.to_string())
                .collect(),
            page_size: repository_constants::PAGE_SIZE,
            max_pages: repository_constants::MAX_PAGES,
            verify_tls: true,
        }
    }
}

impl RepositoryConfig {
    /// Token as a secret, or a config error naming the setting
    pub fn require_token(&self) -> Result<SecretString> {
        self.token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(|t| SecretString::from(t.to_string()))
            .ok_or_else(|| {
                RepoDocError::Config(
                    "repository token not set. Use --token, REPODOC_REPOSITORY__TOKEN or repository.token"
                        .to_string(),
                )
            })
    }
}

// =============================================================================
// Completion Configuration
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Use completion endpoints at all (false forces the static renderer)
    pub enabled: bool,

    /// API key for the completion service
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Base URL; candidate endpoints are derived from it
    pub base_url: Option<String>,

    /// Explicit endpoint URLs (take precedence over `base_url`)
    pub endpoints: Vec<String>,

    /// Payload shapes tried per endpoint, in order
    pub payload_shapes: Vec<PayloadShape>,

    /// Auth header shapes tried per endpoint, in order
    pub auth_schemes: Vec<AuthScheme>,

    /// Model name sent in payloads
    pub model: String,

    /// Temperature for generation (0.0 = deterministic)
    pub temperature: f32,

    /// Maximum tokens to generate per call
    pub max_tokens: u32,
}

impl std::fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("enabled", &self.enabled)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("endpoints", &self.endpoints)
            .field("payload_shapes", &self.payload_shapes)
            .field("auth_schemes", &self.auth_schemes)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: None,
            endpoints: Vec::new(),
            payload_shapes: PayloadShape::ALL.to_vec(),
            auth_schemes: vec![AuthScheme::Bearer, AuthScheme::XApiKey],
            model: completion_constants::DEFAULT_MODEL.to_string(),
            temperature: 0.2,
            max_tokens: completion_constants::DEFAULT_MAX_TOKENS,
        }
    }
}

impl CompletionConfig {
    pub fn api_key_secret(&self) -> Option<SecretString> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .map(|k| SecretString::from(k.to_string()))
    }

    /// Whether there is anything to probe
    pub fn has_candidates(&self) -> bool {
        !self.endpoints.is_empty() || self.base_url.is_some()
    }
}

// =============================================================================
// Generation Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Files fetched per run
    pub max_files: usize,

    /// Serialized chunk size bound (bytes)
    pub max_chunk_size: usize,

    /// Overall deadline for one run (seconds)
    pub deadline_secs: Option<u64>,

    /// Directory the document is written to
    pub output_dir: PathBuf,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_files: generation_constants::MAX_FILES,
            max_chunk_size: generation_constants::MAX_CHUNK_SIZE,
            deadline_secs: None,
            output_dir: PathBuf::from("."),
        }
    }
}

// =============================================================================
// Filter Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Extensions (without dot, case-insensitive) treated as text
    pub extensions: Vec<String>,

    /// Extension-less file names treated as text
    pub file_names: Vec<String>,

    /// Directory names whose contents are skipped
    pub skip_dirs: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            extensions: owned(&[
                "rs", "py", "js", "jsx", "ts", "tsx", "java", "kt", "go", "rb", "c", "h", "cpp",
                "hpp", "cc", "cs", "swift", "scala", "php", "lua", "sh", "bash", "sql", "html",
                "css", "scss", "vue", "md", "rst", "txt", "toml", "yaml", "yml", "json", "xml",
                "ini", "cfg", "gradle", "proto",
            ]),
            file_names: owned(&["Dockerfile", "Makefile", "Jenkinsfile", "README", "LICENSE"]),
            skip_dirs: owned(&[
                ".git",
                "node_modules",
                "target",
                "build",
                "dist",
                "__pycache__",
                "vendor",
                ".venv",
                "venv",
                ".idea",
                ".vscode",
                ".gradle",
                ".next",
                "coverage",
            ]),
        }
    }
}

// =============================================================================
// Transport Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Per-request timeout (seconds)
    pub timeout_secs: u64,

    /// Connection timeout (seconds)
    pub connect_timeout_secs: u64,

    /// Total attempts per request
    pub max_attempts: u32,

    /// First backoff delay (milliseconds)
    pub base_delay_ms: u64,

    /// Backoff ceiling (seconds)
    pub max_delay_secs: u64,

    /// Backoff multiplier
    pub backoff_factor: f32,

    /// Statuses retried automatically
    pub transient_statuses: Vec<u16>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: transport_constants::DEFAULT_TIMEOUT_SECS,
            connect_timeout_secs: transport_constants::CONNECTION_TIMEOUT_SECS,
            max_attempts: transport_constants::MAX_ATTEMPTS,
            base_delay_ms: transport_constants::BASE_DELAY_MS,
            max_delay_secs: transport_constants::MAX_DELAY_SECS,
            backoff_factor: transport_constants::BACKOFF_FACTOR,
            transient_statuses: transport_constants::TRANSIENT_STATUSES.to_vec(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.repository.branches, vec!["main", "master", "develop"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_budgets() {
        let mut config = Config::default();
        config.generation.max_chunk_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.generation.max_files = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.repository.branches = vec![" ".to_string()];
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.completion.temperature = 3.5;
        assert!(matches!(config.validate(), Err(RepoDocError::Config(_))));
    }

    #[test]
    fn test_credentials_are_redacted_and_not_serialized() {
        let mut config = Config::default();
        config.repository.token = Some("glpat-abc".to_string());
        config.completion.api_key = Some("sk-live-xyz".to_string());

        let debug = format!("{:?}", config);
        assert!(!debug.contains("glpat-abc"));
        assert!(!debug.contains("sk-live-xyz"));

        let rendered = toml::to_string(&config).unwrap();
        assert!(!rendered.contains("glpat-abc"));
        assert!(!rendered.contains("sk-live-xyz"));
    }

    #[test]
    fn test_require_token() {
        let mut repository = RepositoryConfig::default();
        assert!(repository.require_token().is_err());
        repository.token = Some("   ".to_string());
        assert!(repository.require_token().is_err());
        repository.token = Some("glpat-abc".to_string());
        assert!(repository.require_token().is_ok());
    }
}
