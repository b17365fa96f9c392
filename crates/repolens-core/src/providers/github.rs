//! GitHub source
//!
//! Lists directories and fetches file bodies through the repository
//! contents API. Public repositories work without a token; a token raises
//! the rate limit and grants access to private repositories.

use super::{EncodedContent, EntryKind, RemoteEntry, RemoteSource};
use crate::error::{RepoLensError, Result};
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "repolens/0.1";

/// Repository coordinates parsed from a GitHub URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubRepo {
    pub owner: String,
    pub repo: String,
    /// Branch, tag or commit; the default branch when absent
    pub reference: Option<String>,
}

impl GitHubRepo {
    /// Whether `url` looks like a GitHub repository URL
    pub fn is_github_url(url: &str) -> bool {
        let url = url.trim();
        url.starts_with("https://github.com/") || url.starts_with("http://github.com/")
    }

    /// Parse `https://github.com/owner/repo` or `https://github.com/owner/repo/tree/<ref>`
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();

        if Self::is_github_url(url) {
            let parts: Vec<&str> = url
                .trim_start_matches("https://github.com/")
                .trim_start_matches("http://github.com/")
                .trim_end_matches('/')
                .split('/')
                .collect();

            if parts.len() >= 2 && !parts[0].is_empty() && !parts[1].is_empty() {
                let owner = parts[0].to_string();
                let repo = parts[1].trim_end_matches(".git").to_string();

                if parts.len() == 2 {
                    return Ok(Self {
                        owner,
                        repo,
                        reference: None,
                    });
                }

                if parts.len() >= 4 && parts[2] == "tree" && !parts[3].is_empty() {
                    return Ok(Self {
                        owner,
                        repo,
                        reference: Some(parts[3..].join("/")),
                    });
                }
            }
        }

        Err(RepoLensError::InvalidInput(format!(
            "Invalid GitHub URL: {}. \
             Expected format: https://github.com/owner/repo or https://github.com/owner/repo/tree/ref",
            url
        )))
    }
}

/// GitHub contents-API source
pub struct GitHubSource {
    client: reqwest::Client,
    repo: GitHubRepo,
    token: Option<String>,
    api_base: String,
}

impl GitHubSource {
    pub fn new(repo: GitHubRepo, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            repo,
            token,
            api_base: DEFAULT_API_BASE.to_string(),
        })
    }

    /// Point at a different API host (GitHub Enterprise)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn repo(&self) -> &GitHubRepo {
        &self.repo
    }

    fn contents_url(&self, path: &str) -> Result<Url> {
        let base = format!(
            "{}/repos/{}/{}/contents",
            self.api_base, self.repo.owner, self.repo.repo
        );
        let mut url = Url::parse(&base)
            .map_err(|e| RepoLensError::InvalidInput(format!("Invalid API URL {}: {}", base, e)))?;

        url.path_segments_mut()
            .map_err(|_| RepoLensError::InvalidInput(format!("API URL cannot be a base: {}", base)))?
            .extend(path.split('/').filter(|s| !s.is_empty()));

        if let Some(ref reference) = self.repo.reference {
            url.query_pairs_mut().append_pair("ref", reference);
        }
        Ok(url)
    }

    /// Log a warning when the remaining quota runs low
    fn check_rate_limit(&self, response: &reqwest::Response) {
        let remaining = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok());

        if let Some(remaining) = remaining {
            if remaining < 10 {
                tracing::warn!(
                    "GitHub API rate limit low ({} requests remaining). \
                     Set GITHUB_TOKEN to increase limits.",
                    remaining
                );
            }
        }
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response> {
        let url = self.contents_url(path)?;
        let mut request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github.v3+json");

        if let Some(ref token) = self.token {
            request = request.header("Authorization", format!("token {}", token));
        }

        let response = request.send().await?;
        self.check_rate_limit(&response);

        let status = response.status();
        if !status.is_success() {
            match status.as_u16() {
                403 => tracing::warn!(
                    "GitHub returned 403 for '{}': rate limit exceeded or access forbidden",
                    path
                ),
                401 => tracing::warn!("GitHub returned 401: GITHUB_TOKEN may be invalid or expired"),
                _ => tracing::debug!("GitHub returned {} for '{}'", status, path),
            }
            return Err(RepoLensError::FetchFailed {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

#[async_trait::async_trait]
impl RemoteSource for GitHubSource {
    fn source_type(&self) -> &'static str {
        "github"
    }

    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        let response = self.get(path).await?;
        let entries: Vec<ContentsEntry> = response.json().await?;

        Ok(entries
            .into_iter()
            .map(|e| RemoteEntry {
                kind: EntryKind::from(e.entry_type.as_str()),
                name: e.name,
                path: e.path,
            })
            .collect())
    }

    async fn get_content(&self, path: &str) -> Result<EncodedContent> {
        let response = self.get(path).await?;
        let file: ContentsFile = response.json().await.map_err(|e| {
            RepoLensError::DecodeFailed {
                path: path.to_string(),
                reason: format!("Unexpected response format: {}", e),
            }
        })?;

        Ok(EncodedContent {
            path: file.path,
            encoding: file.encoding.unwrap_or_default(),
            content: file.content.unwrap_or_default(),
            size: file.size,
        })
    }
}

/// Directory entry from the contents API
#[derive(Debug, Deserialize)]
struct ContentsEntry {
    name: String,
    path: String,
    #[serde(rename = "type")]
    entry_type: String,
}

/// File object from the contents API
#[derive(Debug, Deserialize)]
struct ContentsFile {
    path: String,
    #[serde(default)]
    size: usize,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repo_url() {
        let repo = GitHubRepo::parse("https://github.com/rust-lang/rust").unwrap();
        assert_eq!(repo.owner, "rust-lang");
        assert_eq!(repo.repo, "rust");
        assert_eq!(repo.reference, None);
    }

    #[test]
    fn test_parse_tree_url() {
        let repo = GitHubRepo::parse("https://github.com/owner/repo/tree/release/1.x").unwrap();
        assert_eq!(repo.reference.as_deref(), Some("release/1.x"));
    }

    #[test]
    fn test_parse_github_url_variants() {
        let test_cases = vec![
            ("https://github.com/rust-lang/rust", true),
            ("http://github.com/rust-lang/rust", true),
            ("https://github.com/rust-lang/rust/", true),
            ("https://github.com/rust-lang/rust.git", true),
            ("https://github.com/user/repo/tree/main", true),
            ("https://github.com/user/repo/blob/main/README.md", false),
            ("https://gitlab.com/user/repo", false),
            ("github.com/user/repo", false),
            ("https://github.com/", false),
            ("https://github.com/user", false),
        ];

        for (url, should_succeed) in test_cases {
            let result = GitHubRepo::parse(url);
            assert_eq!(
                result.is_ok(),
                should_succeed,
                "URL: {} - Expected success: {}, Got: {:?}",
                url,
                should_succeed,
                result
            );
        }
    }

    #[test]
    fn test_strips_git_suffix() {
        let repo = GitHubRepo::parse("https://github.com/user/repo.git").unwrap();
        assert_eq!(repo.repo, "repo");
    }

    #[test]
    fn test_contents_url() {
        let repo = GitHubRepo {
            owner: "octo".to_string(),
            repo: "hello".to_string(),
            reference: Some("dev".to_string()),
        };
        let source = GitHubSource::new(repo, None).unwrap();

        assert_eq!(
            source.contents_url("").unwrap().as_str(),
            "https://api.github.com/repos/octo/hello/contents?ref=dev"
        );
        assert_eq!(
            source.contents_url("src/my file.rs").unwrap().as_str(),
            "https://api.github.com/repos/octo/hello/contents/src/my%20file.rs?ref=dev"
        );
    }

    #[test]
    fn test_api_base_override() {
        let repo = GitHubRepo::parse("https://github.com/a/b").unwrap();
        let source = GitHubSource::new(repo, None)
            .unwrap()
            .with_api_base("https://ghe.example.com/api/v3/");
        assert_eq!(
            source.contents_url("lib").unwrap().as_str(),
            "https://ghe.example.com/api/v3/repos/a/b/contents/lib"
        );
    }

    #[test]
    fn test_contents_entry_deserialize() {
        let json = r#"[{"name":"src","path":"src","type":"dir","sha":"abc"},
                       {"name":"vendor","path":"vendor","type":"submodule"}]"#;
        let entries: Vec<ContentsEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(EntryKind::from(entries[1].entry_type.as_str()), EntryKind::Other("submodule".into()));
    }

    #[test]
    fn test_source_type() {
        let repo = GitHubRepo::parse("https://github.com/a/b").unwrap();
        let source = GitHubSource::new(repo, None).unwrap();
        assert_eq!(source.source_type(), "github");
    }
}
