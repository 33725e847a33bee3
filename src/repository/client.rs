//! Repository API client
//!
//! Talks to a GitLab-style REST API:
//!
//! - `GET {prefix}/projects/{path}` resolves the project
//! - `GET {prefix}/projects/{id}/repository/tree?recursive=true` lists files page by page
//! - `GET {prefix}/projects/{id}/repository/files/{path}?ref={branch}` fetches one file
//!
//! Certificate failures during project lookup trigger exactly one retry with
//! verification disabled. A successful retry keeps verification off for the
//! rest of the session.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::{
    EntryKind, FetchFailure, FileContent, FileEntry, ProjectLocator, RepositoryReference,
    RepositorySource, decode_content,
};
use crate::config::{Config, RepositoryConfig};
use crate::constants::repository::TOKEN_HEADER;
use crate::http::{HttpRequest, HttpResponse, RetryingTransport, TransportError};
use crate::types::{ProjectMetadata, RepoDocError, Result};

#[derive(Debug, Deserialize)]
struct ProjectResponse {
    id: u64,
    name: String,
    #[serde(default)]
    path_with_namespace: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    web_url: Option<String>,
    #[serde(default)]
    default_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TreeItem {
    path: String,
    #[serde(rename = "type")]
    kind: EntryKind,
}

#[derive(Debug, Deserialize)]
struct FileResponse {
    content: String,
    #[serde(default)]
    encoding: String,
}

pub struct RepositoryClient {
    transport: RetryingTransport,
    token: SecretString,
    config: RepositoryConfig,
    request_timeout: Duration,
    /// Set once the unverified TLS retry succeeded
    insecure: AtomicBool,
}

impl std::fmt::Debug for RepositoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryClient")
            .field("config", &self.config)
            .field("insecure", &self.insecure.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl RepositoryClient {
    pub fn new(
        transport: RetryingTransport,
        token: SecretString,
        config: RepositoryConfig,
        request_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            token,
            config,
            request_timeout,
            insecure: AtomicBool::new(false),
        }
    }

    /// Build a client over a shared transport; fails without a token
    pub fn from_config(config: &Config, transport: RetryingTransport) -> Result<Self> {
        Ok(Self::new(
            transport,
            config.repository.require_token()?,
            config.repository.clone(),
            Duration::from_secs(config.transport.timeout_secs),
        ))
    }

    /// Whether requests currently verify certificates
    pub fn verifies_tls(&self) -> bool {
        self.config.verify_tls && !self.insecure.load(Ordering::Relaxed)
    }

    fn request(&self, url: &Url, verify: bool) -> HttpRequest {
        HttpRequest::get(url.as_str())
            .header(TOKEN_HEADER, self.token.expose_secret())
            .header("Accept", "application/json")
            .verify_tls(verify)
    }

    fn classify(&self, err: TransportError, context: &str) -> RepoDocError {
        RepoDocError::from_transport(err, context, self.request_timeout)
    }

    fn project_url(&self, reference: &RepositoryReference, tail: &[&str]) -> Result<Url> {
        let mut segments = vec!["projects", reference.project_id.as_str()];
        segments.extend_from_slice(tail);
        reference
            .locator
            .api_url(&self.config.api_prefix, &segments)
    }

    /// GET with the single unverified retry on certificate failure
    async fn get_with_tls_fallback(&self, url: &Url, context: &str) -> Result<HttpResponse> {
        let verify = self.verifies_tls();
        let response = match self.transport.send(&self.request(url, verify)).await {
            Err(TransportError::Tls(cause)) if verify => {
                warn!(
                    %cause,
                    "Certificate verification failed, retrying once without verification"
                );
                let retried = self.transport.send(&self.request(url, false)).await;
                if retried.is_ok() {
                    self.insecure.store(true, Ordering::Relaxed);
                }
                retried
            }
            other => other,
        };

        response
            .and_then(HttpResponse::error_for_status)
            .map_err(|e| self.classify(e, context))
    }

    async fn get(&self, url: &Url, context: &str) -> Result<HttpResponse> {
        self.transport
            .send(&self.request(url, self.verifies_tls()))
            .await
            .and_then(HttpResponse::error_for_status)
            .map_err(|e| self.classify(e, context))
    }

    fn candidate_branches(&self, default_branch: Option<&str>) -> Vec<String> {
        let mut branches: Vec<String> = self
            .config
            .branches
            .iter()
            .map(|b| b.trim())
            .filter(|b| !b.is_empty())
            .map(str::to_string)
            .collect();
        if let Some(default) = default_branch
            && !branches.iter().any(|b| b == default)
        {
            branches.push(default.to_string());
        }
        branches
    }

    async fn fetch_from_branch(
        &self,
        reference: &RepositoryReference,
        path: &str,
        branch: &str,
    ) -> std::result::Result<Option<FileContent>, FetchFailure> {
        let mut url = self
            .project_url(reference, &["repository", "files", path])
            .map_err(|e| FetchFailure::InvalidPath(e.to_string()))?;
        url.query_pairs_mut().append_pair("ref", branch);

        let response = self
            .transport
            .send(&self.request(&url, self.verifies_tls()))
            .await
            .map_err(|e| FetchFailure::Transport {
                branch: branch.to_string(),
                message: e.to_string(),
            })?;

        if response.status == 404 {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(FetchFailure::Status {
                branch: branch.to_string(),
                status: response.status,
            });
        }

        let file: FileResponse = response.json().map_err(|e| FetchFailure::Transport {
            branch: branch.to_string(),
            message: e.to_string(),
        })?;
        let (text, outcome) = decode_content(&file.content, &file.encoding);

        Ok(Some(FileContent {
            path: path.to_string(),
            text,
            outcome,
            branch: Some(branch.to_string()),
        }))
    }
}

#[async_trait]
impl RepositorySource for RepositoryClient {
    #[instrument(skip(self))]
    async fn resolve_project(&self, url: &str) -> Result<RepositoryReference> {
        let locator = ProjectLocator::parse(url)?;
        let api_url =
            locator.api_url(&self.config.api_prefix, &["projects", locator.path.as_str()])?;
        let context = format!("project lookup for {}", locator.path);

        let response = self.get_with_tls_fallback(&api_url, &context).await?;
        let project: ProjectResponse = response
            .json()
            .map_err(|e| self.classify(e, &context))?;

        let branches = self.candidate_branches(project.default_branch.as_deref());
        let mut metadata = ProjectMetadata::new(
            project.name,
            project
                .path_with_namespace
                .unwrap_or_else(|| locator.path.clone()),
        );
        metadata.description = project.description.filter(|d| !d.trim().is_empty());
        metadata.web_url = project.web_url.unwrap_or_else(|| locator.to_string());
        metadata.default_branch = project.default_branch;

        info!(
            project = %metadata.path,
            id = project.id,
            branches = ?branches,
            "Resolved project"
        );

        Ok(RepositoryReference {
            locator,
            project_id: project.id.to_string(),
            branches,
            metadata,
        })
    }

    #[instrument(skip(self, reference), fields(project = %reference.locator.path))]
    async fn list_files(&self, reference: &RepositoryReference) -> Result<Vec<FileEntry>> {
        let page_size = self.config.page_size;
        let mut entries = Vec::new();

        for page in 1..=self.config.max_pages {
            let mut url = self.project_url(reference, &["repository", "tree"])?;
            url.query_pairs_mut()
                .append_pair("recursive", "true")
                .append_pair("per_page", &page_size.to_string())
                .append_pair("page", &page.to_string());

            let context = format!("tree listing page {} of {}", page, reference.locator.path);
            let items = match self.get(&url, &context).await.and_then(|response| {
                response
                    .json::<Vec<TreeItem>>()
                    .map_err(|e| self.classify(e, &context))
            }) {
                Ok(items) => items,
                Err(err) if page > 1 => {
                    warn!(
                        page,
                        error = %err,
                        kept = entries.len(),
                        "Tree listing failed, keeping entries gathered so far"
                    );
                    return Ok(entries);
                }
                Err(err) => return Err(err),
            };

            let returned = items.len();
            entries.extend(
                items
                    .into_iter()
                    .filter(|item| item.kind == EntryKind::Blob)
                    .map(|item| FileEntry {
                        path: item.path,
                        kind: EntryKind::Blob,
                    }),
            );
            debug!(page, returned, total = entries.len(), "Tree page received");

            if returned < page_size {
                return Ok(entries);
            }
        }

        warn!(
            max_pages = self.config.max_pages,
            entries = entries.len(),
            "Page ceiling reached, listing may be incomplete"
        );
        Ok(entries)
    }

    async fn fetch_file(&self, reference: &RepositoryReference, path: &str) -> FileContent {
        for branch in &reference.branches {
            match self.fetch_from_branch(reference, path, branch).await {
                Ok(Some(content)) => {
                    debug!(
                        path,
                        branch = %branch,
                        outcome = content.outcome.label(),
                        "Fetched file"
                    );
                    return content;
                }
                Ok(None) => debug!(path, branch = %branch, "Not on branch, trying next"),
                Err(failure) => {
                    warn!(path, %failure, "File fetch failed");
                    return FileContent::failed(path, failure);
                }
            }
        }

        FileContent::failed(
            path,
            FetchFailure::NotFound {
                branches: reference.branches.clone(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RetryPolicy;
    use crate::http::testing::ScriptedClient;
    use crate::repository::DecodeOutcome;
    use crate::types::ErrorKind;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde_json::json;
    use std::sync::Arc;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            jitter: false,
            ..RetryPolicy::default()
        }
    }

    fn client_with(scripted: Arc<ScriptedClient>, config: RepositoryConfig) -> RepositoryClient {
        RepositoryClient::new(
            RetryingTransport::new(scripted, fast_policy()),
            SecretString::from("glpat-test".to_string()),
            config,
            Duration::from_secs(5),
        )
    }

    fn client(scripted: Arc<ScriptedClient>) -> RepositoryClient {
        client_with(scripted, RepositoryConfig::default())
    }

    fn project_body() -> HttpResponse {
        HttpResponse::ok_json(&json!({
            "id": 42,
            "name": "app",
            "path_with_namespace": "group/app",
            "description": "Payment service",
            "web_url": "https://gitlab.example.com/group/app",
            "default_branch": "trunk"
        }))
    }

    fn reference() -> RepositoryReference {
        RepositoryReference {
            locator: ProjectLocator::parse("https://gitlab.example.com/group/app").unwrap(),
            project_id: "42".to_string(),
            branches: vec!["main".into(), "master".into(), "develop".into()],
            metadata: ProjectMetadata::new("app", "group/app"),
        }
    }

    fn tree_page(count: usize, offset: usize) -> HttpResponse {
        let items: Vec<_> = (0..count)
            .map(|i| {
                json!({
                    "id": "x",
                    "name": "f",
                    "type": "blob",
                    "path": format!("src/f{}.rs", offset + i)
                })
            })
            .collect();
        HttpResponse::ok_json(&json!(items))
    }

    fn tree_page_is(page: usize) -> impl Fn(&HttpRequest) -> bool + Send + Sync + 'static {
        move |request: &HttpRequest| {
            request.url.contains("/repository/tree")
                && Url::parse(&request.url)
                    .ok()
                    .and_then(|url| {
                        url.query_pairs()
                            .find(|(key, _)| key == "page")
                            .map(|(_, value)| value.to_string())
                    })
                    .as_deref()
                    == Some(page.to_string().as_str())
        }
    }

    fn file_body(text: &str) -> HttpResponse {
        HttpResponse::ok_json(&json!({
            "file_path": "src/lib.rs",
            "encoding": "base64",
            "content": STANDARD.encode(text.as_bytes())
        }))
    }

    #[tokio::test]
    async fn test_resolve_project_builds_reference() {
        let scripted =
            Arc::new(ScriptedClient::new().on("/api/v4/projects/group%2Fapp", Ok(project_body())));
        let reference = client(scripted.clone())
            .resolve_project("https://gitlab.example.com/group/app.git")
            .await
            .unwrap();

        assert_eq!(reference.project_id, "42");
        assert_eq!(reference.branches, vec!["main", "master", "develop", "trunk"]);
        assert_eq!(reference.metadata.description.as_deref(), Some("Payment service"));
        assert_eq!(reference.display_url(), "https://gitlab.example.com/group/app");

        let requests = scripted.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].header_value("private-token"), Some("glpat-test"));
    }

    #[tokio::test]
    async fn test_resolve_project_classifies_failures() {
        for (status, kind) in [
            (401, ErrorKind::AuthenticationFailed),
            (404, ErrorKind::NotFound),
            (418, ErrorKind::HttpStatus),
        ] {
            let scripted = Arc::new(
                ScriptedClient::new().on("/projects/", Ok(HttpResponse::new(status, "nope"))),
            );
            let err = client(scripted)
                .resolve_project("https://gitlab.example.com/group/app")
                .await
                .unwrap_err();
            assert_eq!(err.kind(), kind, "status {}", status);
        }

        let scripted = Arc::new(ScriptedClient::new().on(
            "/projects/",
            Err(TransportError::ConnectionFailed("dns error".into())),
        ));
        let err = client(scripted)
            .resolve_project("https://gitlab.example.com/group/app")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionFailed);
        assert!(err.with_hint().contains("network/VPN"));
    }

    #[tokio::test]
    async fn test_tls_failure_retries_once_without_verification() {
        let scripted = Arc::new(
            ScriptedClient::new()
                .on_match(
                    |r| r.verify_tls,
                    Err(TransportError::Tls("self signed certificate".into())),
                )
                .on_match(|r| r.url.contains("/tree"), Ok(tree_page(3, 0)))
                .on_match(|r| !r.verify_tls, Ok(project_body())),
        );
        let client = client(scripted.clone());
        let reference = client
            .resolve_project("https://gitlab.example.com/group/app")
            .await
            .unwrap();

        let requests = scripted.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].verify_tls);
        assert!(!requests[1].verify_tls);
        assert!(!client.verifies_tls());

        // The session stays unverified afterwards
        let files = client.list_files(&reference).await.unwrap();
        assert_eq!(files.len(), 3);
        assert!(!scripted.requests()[2].verify_tls);
    }

    #[tokio::test]
    async fn test_tls_failure_twice_is_terminal() {
        let scripted = Arc::new(
            ScriptedClient::new().on("/projects/", Err(TransportError::Tls("bad cert".into()))),
        );
        let client = client(scripted.clone());
        let err = client
            .resolve_project("https://gitlab.example.com/group/app")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Tls);
        assert_eq!(scripted.request_count(), 2);
        assert!(client.verifies_tls());
    }

    #[tokio::test]
    async fn test_connection_failure_keeps_verification() {
        let scripted = Arc::new(ScriptedClient::new().on(
            "/projects/",
            Err(TransportError::ConnectionFailed("Connection refused".into())),
        ));
        let client = client(scripted.clone());
        let err = client
            .resolve_project("https://gitlab.example.com/group/ssl-proxy")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConnectionFailed);
        let requests = scripted.requests();
        assert_eq!(requests.len(), fast_policy().max_attempts as usize);
        assert!(requests.iter().all(|r| r.verify_tls));
        assert!(client.verifies_tls());
    }

    #[tokio::test]
    async fn test_pagination_stops_on_short_page() {
        let scripted = Arc::new(
            ScriptedClient::new()
                .on_match(tree_page_is(1), Ok(tree_page(100, 0)))
                .on_match(tree_page_is(2), Ok(tree_page(100, 100)))
                .on_match(tree_page_is(3), Ok(tree_page(37, 200))),
        );
        let files = client(scripted.clone())
            .list_files(&reference())
            .await
            .unwrap();

        assert_eq!(files.len(), 237);
        assert_eq!(scripted.request_count(), 3);
        assert_eq!(files[0].path, "src/f0.rs");
        assert_eq!(files[236].path, "src/f236.rs");
    }

    #[tokio::test]
    async fn test_pagination_respects_page_ceiling() {
        let scripted =
            Arc::new(ScriptedClient::new().on("/repository/tree", Ok(tree_page(100, 0))));
        let config = RepositoryConfig {
            max_pages: 5,
            ..RepositoryConfig::default()
        };
        let files = client_with(scripted.clone(), config)
            .list_files(&reference())
            .await
            .unwrap();

        assert_eq!(scripted.request_count(), 5);
        assert_eq!(files.len(), 500);
    }

    #[tokio::test]
    async fn test_listing_keeps_only_blobs() {
        let page = HttpResponse::ok_json(&json!([
            {"type": "tree", "path": "src"},
            {"type": "blob", "path": "src/main.rs"},
            {"type": "commit", "path": "vendor/sub"},
            {"type": "blob", "path": "README.md"}
        ]));
        let scripted = Arc::new(ScriptedClient::new().on("/repository/tree", Ok(page)));
        let files = client(scripted).list_files(&reference()).await.unwrap();

        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["src/main.rs", "README.md"]);
        assert!(files.iter().all(|f| f.kind == EntryKind::Blob));
    }

    #[tokio::test]
    async fn test_listing_failure_on_later_page_keeps_partial_result() {
        let scripted = Arc::new(
            ScriptedClient::new()
                .on_match(tree_page_is(1), Ok(tree_page(100, 0)))
                .on_match(tree_page_is(2), Ok(HttpResponse::new(403, "forbidden"))),
        );
        let files = client(scripted).list_files(&reference()).await.unwrap();
        assert_eq!(files.len(), 100);

        let scripted = Arc::new(
            ScriptedClient::new().on("/repository/tree", Ok(HttpResponse::new(403, "forbidden"))),
        );
        let err = client(scripted).list_files(&reference()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthenticationFailed);
    }

    #[tokio::test]
    async fn test_branch_fallback_reaches_develop() {
        let scripted = Arc::new(
            ScriptedClient::new()
                .on("files/src%2Flib.rs?ref=develop", Ok(file_body("pub fn x() {}"))),
        );
        let content = client(scripted.clone())
            .fetch_file(&reference(), "src/lib.rs")
            .await;

        assert_eq!(scripted.request_count(), 3);
        assert_eq!(content.text, "pub fn x() {}");
        assert_eq!(content.outcome, DecodeOutcome::Utf8);
        assert_eq!(content.branch.as_deref(), Some("develop"));

        let refs: Vec<_> = scripted
            .requests()
            .iter()
            .map(|r| r.url.rsplit("ref=").next().unwrap_or_default().to_string())
            .collect();
        assert_eq!(refs, vec!["main", "master", "develop"]);
    }

    #[tokio::test]
    async fn test_non_404_error_stops_branch_walk() {
        let scripted = Arc::new(
            ScriptedClient::new().on("ref=main", Ok(HttpResponse::new(403, "forbidden"))),
        );
        let content = client(scripted.clone())
            .fetch_file(&reference(), "src/lib.rs")
            .await;

        assert_eq!(scripted.request_count(), 1);
        assert!(!content.is_readable());
        assert_eq!(
            content.outcome,
            DecodeOutcome::FetchError(FetchFailure::Status {
                branch: "main".into(),
                status: 403
            })
        );
    }

    #[tokio::test]
    async fn test_missing_on_every_branch() {
        let scripted = Arc::new(ScriptedClient::new());
        let content = client(scripted.clone())
            .fetch_file(&reference(), "gone.rs")
            .await;

        assert_eq!(scripted.request_count(), 3);
        assert!(matches!(
            content.outcome,
            DecodeOutcome::FetchError(FetchFailure::NotFound { ref branches })
                if branches.len() == 3
        ));
    }
}
