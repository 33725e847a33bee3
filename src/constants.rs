//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// HTTP transport constants
pub mod transport {
    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 30;

    /// Total attempts per request, including the first one
    pub const MAX_ATTEMPTS: u32 = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 500;

    /// Maximum delay between retries (seconds)
    pub const MAX_DELAY_SECS: u64 = 30;

    /// Backoff multiplier
    pub const BACKOFF_FACTOR: f32 = 2.0;

    /// Statuses worth retrying
    pub const TRANSIENT_STATUSES: &[u16] = &[429, 500, 502, 503, 504];
}

/// Repository API constants
pub mod repository {
    /// API path prefix appended to the repository host
    pub const API_PREFIX: &str = "api/v4";

    /// Entries requested per tree page
    pub const PAGE_SIZE: usize = 100;

    /// Upper bound on tree pages fetched for one project
    pub const MAX_PAGES: usize = 50;

    /// Branch names tried, in order, when fetching file contents
    pub const DEFAULT_BRANCHES: &[&str] = &["main", "master", "develop"];

    /// Header carrying the repository access token
    pub const TOKEN_HEADER: &str = "PRIVATE-TOKEN";
}

/// Generation constants
pub mod generation {
    /// Maximum files fetched per run
    pub const MAX_FILES: usize = 100;

    /// Maximum serialized chunk size (bytes)
    pub const MAX_CHUNK_SIZE: usize = 12_000;

    /// Characters of a failing response body kept in diagnostics
    pub const DIAGNOSTIC_SNIPPET_CHARS: usize = 200;
}

/// Completion endpoint constants
pub mod completion {
    /// Default model name sent in payloads
    pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

    /// Default generation length
    pub const DEFAULT_MAX_TOKENS: u32 = 2048;

    /// Paths appended to the base URL when no explicit endpoint list is configured
    pub const DEFAULT_PATHS: &[&str] = &[
        "/v1/chat/completions",
        "/chat/completions",
        "/v1/completions",
        "/api/generate",
        "/v1/messages",
        "/api/chat",
    ];

    /// Prompt sent while probing candidates
    pub const PROBE_PROMPT: &str = "Reply with the single word: ok";

    /// Generation length requested while probing
    pub const PROBE_MAX_TOKENS: u32 = 8;
}
