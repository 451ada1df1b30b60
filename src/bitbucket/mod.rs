//! Bitbucket Cloud pull request source.
//!
//! Fetches PR metadata and the unified diff via the Bitbucket 2.0 REST API
//! using reqwest, and maps them into [`PromptData`].

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use crate::constants::{APP_NAME, BITBUCKET_API_BASE, VERSION};
use crate::models::PromptData;

/// Errors from Bitbucket API calls.
#[derive(Error, Debug)]
pub enum BitbucketError {
    #[error("invalid pull request reference '{0}': expected WORKSPACE/REPO#ID or a pull request URL")]
    InvalidReference(String),

    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("unexpected API response: {0}")]
    Decode(String),
}

/// Identifies one pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub workspace: String,
    pub repo_slug: String,
    pub id: u64,
}

impl fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.workspace, self.repo_slug, self.id)
    }
}

impl FromStr for PullRequestRef {
    type Err = BitbucketError;

    /// Accepts `workspace/repo#42` or
    /// `https://bitbucket.org/workspace/repo/pull-requests/42`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || BitbucketError::InvalidReference(s.to_string());
        let trimmed = s.trim().trim_end_matches('/');

        let (workspace, repo_slug, id) = if let Some(rest) = trimmed
            .strip_prefix("https://bitbucket.org/")
            .or_else(|| trimmed.strip_prefix("http://bitbucket.org/"))
        {
            let parts: Vec<&str> = rest.split('/').collect();
            match parts.as_slice() {
                [workspace, repo, "pull-requests", id, ..] => (*workspace, *repo, *id),
                _ => return Err(invalid()),
            }
        } else {
            let (path, id) = trimmed.split_once('#').ok_or_else(invalid)?;
            let (workspace, repo) = path.split_once('/').ok_or_else(invalid)?;
            (workspace, repo, id)
        };

        if workspace.is_empty() || repo_slug.is_empty() || repo_slug.contains('/') {
            return Err(invalid());
        }
        let id = id.parse::<u64>().map_err(|_| invalid())?;

        Ok(Self {
            workspace: workspace.to_string(),
            repo_slug: repo_slug.to_string(),
            id,
        })
    }
}

#[derive(Debug, Deserialize)]
struct PullRequestResponse {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    author: Option<Account>,
    source: Endpoint,
    destination: Endpoint,
}

#[derive(Debug, Deserialize)]
struct Account {
    display_name: Option<String>,
    nickname: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Endpoint {
    branch: Option<Branch>,
    repository: Option<Repository>,
}

#[derive(Debug, Deserialize)]
struct Branch {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Repository {
    full_name: String,
}

/// Minimal Bitbucket Cloud client.
pub struct BitbucketClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BitbucketClient {
    /// Create a client. Without a token only public repositories are readable.
    pub fn new(token: Option<String>) -> Result<Self, BitbucketError> {
        let http = reqwest::Client::builder()
            .user_agent(format!("{APP_NAME}/{VERSION}"))
            .build()
            .map_err(|e| BitbucketError::ApiError(e.to_string()))?;
        Ok(Self {
            http,
            base_url: BITBUCKET_API_BASE.to_string(),
            token,
        })
    }

    /// Point the client at another API root (Bitbucket proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Fetch metadata and diff for `pr`.
    pub async fn fetch_prompt(&self, pr: &PullRequestRef) -> Result<PromptData, BitbucketError> {
        let url = format!(
            "{}/repositories/{}/{}/pullrequests/{}",
            self.base_url, pr.workspace, pr.repo_slug, pr.id
        );

        tracing::debug!(%pr, "fetching pull request");
        let body = self.get_text(&url).await?;
        let metadata: PullRequestResponse =
            serde_json::from_str(&body).map_err(|e| BitbucketError::Decode(e.to_string()))?;

        let diff = self.get_text(&format!("{url}/diff")).await?;
        tracing::debug!(%pr, bytes = diff.len(), "fetched pull request diff");

        Ok(into_prompt(pr, metadata, diff))
    }

    async fn get_text(&self, url: &str) -> Result<String, BitbucketError> {
        let mut request = self.http.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| BitbucketError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(BitbucketError::ApiError(format!(
                "GET {url} failed with HTTP {status}: {body}"
            )));
        }

        response
            .text()
            .await
            .map_err(|e| BitbucketError::ApiError(e.to_string()))
    }
}

fn into_prompt(pr: &PullRequestRef, metadata: PullRequestResponse, diff: String) -> PromptData {
    let branch = |endpoint: &Endpoint| {
        endpoint
            .branch
            .as_ref()
            .map(|b| b.name.clone())
            .unwrap_or_default()
    };
    let repository = metadata
        .destination
        .repository
        .as_ref()
        .map(|r| r.full_name.clone())
        .unwrap_or_else(|| format!("{}/{}", pr.workspace, pr.repo_slug));
    let author = metadata
        .author
        .and_then(|a| a.display_name.or(a.nickname))
        .unwrap_or_default();

    PromptData {
        source_branch: branch(&metadata.source),
        target_branch: branch(&metadata.destination),
        title: metadata.title,
        description: metadata.description,
        diff,
        author,
        repository,
        additional_context: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PR_JSON: &str = r#"{
        "id": 42,
        "title": "Add login page",
        "description": "Implements the login flow.",
        "author": {"display_name": "Sam Doe", "nickname": "sam"},
        "source": {
            "branch": {"name": "feature/login"},
            "repository": {"full_name": "sam/web-fork"}
        },
        "destination": {
            "branch": {"name": "main"},
            "repository": {"full_name": "acme/web"}
        }
    }"#;

    fn pr() -> PullRequestRef {
        "acme/web#42".parse().unwrap()
    }

    #[test]
    fn parse_short_reference() {
        assert_eq!(
            pr(),
            PullRequestRef {
                workspace: "acme".into(),
                repo_slug: "web".into(),
                id: 42,
            }
        );
        assert_eq!(pr().to_string(), "acme/web#42");
    }

    #[test]
    fn parse_url_reference() {
        let parsed: PullRequestRef = "https://bitbucket.org/acme/web/pull-requests/42/diff"
            .parse()
            .unwrap();
        assert_eq!(parsed, pr());
    }

    #[test]
    fn reject_malformed_references() {
        for bad in ["acme/web", "acme#1", "acme/web#x", "https://bitbucket.org/acme/web", "/web#1"] {
            assert!(bad.parse::<PullRequestRef>().is_err(), "accepted {bad}");
        }
    }

    #[test]
    fn maps_response_into_prompt() {
        let metadata: PullRequestResponse = serde_json::from_str(PR_JSON).unwrap();
        let prompt = into_prompt(&pr(), metadata, "diff --git a/x b/x\n".into());
        assert_eq!(prompt.title, "Add login page");
        assert_eq!(prompt.description, "Implements the login flow.");
        assert_eq!(prompt.author, "Sam Doe");
        assert_eq!(prompt.source_branch, "feature/login");
        assert_eq!(prompt.target_branch, "main");
        assert_eq!(prompt.repository, "acme/web");
        assert!(prompt.diff.starts_with("diff --git"));
        assert!(prompt.additional_context.is_none());
    }

    #[test]
    fn tolerates_missing_optional_fields() {
        let json = r#"{"title": "T", "source": {}, "destination": {}}"#;
        let metadata: PullRequestResponse = serde_json::from_str(json).unwrap();
        let prompt = into_prompt(&pr(), metadata, String::new());
        assert_eq!(prompt.description, "");
        assert_eq!(prompt.author, "");
        assert_eq!(prompt.source_branch, "");
        assert_eq!(prompt.repository, "acme/web");
    }

    #[test]
    fn base_url_is_normalized() {
        let client = BitbucketClient::new(None)
            .unwrap()
            .with_base_url("http://localhost:8080/2.0/");
        assert_eq!(client.base_url, "http://localhost:8080/2.0");
    }
}
