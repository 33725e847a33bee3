//! Repository URL parsing
//!
//! Turns a user-supplied project URL into the API host and the namespaced
//! project path. Accepts browser URLs (`.../-/tree/main`), clone URLs (`.git`)
//! and bare `host/group/project` strings.

use url::Url;

use crate::types::{RepoDocError, Result};

/// Host plus namespaced project path, derived once per session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLocator {
    /// Scheme, host and port only
    pub host: Url,
    /// `group/sub/project`, without `.git`
    pub path: String,
}

impl ProjectLocator {
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let invalid = |reason: &str| RepoDocError::InvalidUrl {
            url: input.to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid("empty URL"));
        }

        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        };

        let url = Url::parse(&with_scheme).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("only http and https URLs are supported"));
        }
        let host_name = url.host_str().ok_or_else(|| invalid("missing host"))?;

        let mut path = url.path().trim_matches('/').to_string();
        // Browser URLs carry a `/-/` separator before tree/blob views
        if let Some(idx) = path.find("/-/") {
            path.truncate(idx);
        }
        if let Some(stripped) = path.strip_suffix(".git") {
            path = stripped.to_string();
        }
        let path = path.trim_matches('/').to_string();

        if path.is_empty() {
            return Err(invalid("missing project path"));
        }
        if !path.contains('/') {
            return Err(invalid("expected a namespaced path such as group/project"));
        }

        let mut host = Url::parse(&format!("{}://{}", url.scheme(), host_name))
            .map_err(|e| invalid(&e.to_string()))?;
        host.set_port(url.port()).map_err(|_| invalid("invalid port"))?;

        Ok(Self { host, path })
    }

    /// Last path segment, used as a display name before the lookup succeeds
    pub fn short_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Build an API URL below `prefix`; each segment is percent-encoded, including `/`
    pub fn api_url(&self, prefix: &str, segments: &[&str]) -> Result<Url> {
        let mut url = self.host.clone();
        url.path_segments_mut()
            .map_err(|_| RepoDocError::InvalidUrl {
                url: self.host.to_string(),
                reason: "host URL cannot carry a path".to_string(),
            })?
            .clear()
            .extend(prefix.split('/').filter(|s| !s.is_empty()))
            .extend(segments);
        Ok(url)
    }
}

impl std::fmt::Display for ProjectLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.host, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_git_suffix_and_slashes() {
        let locator = ProjectLocator::parse("https://gitlab.example.com/group/app.git/").unwrap();
        assert_eq!(locator.host.as_str(), "https://gitlab.example.com/");
        assert_eq!(locator.path, "group/app");
        assert_eq!(locator.short_name(), "app");
    }

    #[test]
    fn test_parse_browser_url_and_bare_host() {
        let locator =
            ProjectLocator::parse("https://gitlab.com/a/b/c/-/tree/main/src").unwrap();
        assert_eq!(locator.path, "a/b/c");

        let locator = ProjectLocator::parse("gitlab.internal:8443/team/tool").unwrap();
        assert_eq!(locator.host.as_str(), "https://gitlab.internal:8443/");
        assert_eq!(locator.path, "team/tool");
    }

    #[test]
    fn test_parse_rejects_unusable_urls() {
        for input in ["", "ftp://host/a/b", "https://host/", "https://host/solo"] {
            let err = ProjectLocator::parse(input).unwrap_err();
            assert!(
                matches!(err, RepoDocError::InvalidUrl { .. }),
                "{} should be rejected",
                input
            );
        }
    }

    #[test]
    fn test_api_url_percent_encodes_project_path() {
        let locator = ProjectLocator::parse("https://gitlab.example.com/group/sub/app").unwrap();
        let url = locator
            .api_url("api/v4", &["projects", &locator.path])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://gitlab.example.com/api/v4/projects/group%2Fsub%2Fapp"
        );

        let url = locator
            .api_url("api/v4", &["projects", "42", "repository", "files", "src/my file.rs"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://gitlab.example.com/api/v4/projects/42/repository/files/src%2Fmy%20file.rs"
        );
    }
}
