//! Bitbucket Cloud REST client
//!
//! Wraps `reqwest` with fixed credentials, a request timeout, and two
//! cross-cutting behaviors applied to every call:
//!
//! - **Adaptive pacing**: a shared delay is slept before each request. It
//!   decays toward a floor on success and grows on 429 responses (honoring a
//!   `Retry-After` hint when present, doubling otherwise), capped at a
//!   maximum. A rate-limited request is retried exactly once after waiting.
//! - **Backoff on server errors**: 5xx responses and transport failures are
//!   retried up to a fixed ceiling, waiting `2^attempt` seconds between
//!   attempts. Other failures are surfaced without retrying.
//!
//! The pacing delay is shared mutable state across all calls made through one
//! client instance; concurrent tool invocations influence each other's pacing.

use std::sync::{Arc, Mutex, PoisonError};

use reqwest::Method;
use serde::de::DeserializeOwned;
use tokio::time::{Duration, sleep};
use tracing::{debug, warn};

use crate::bitbucket::error::{ApiError, RetryClass, classify_status};
use crate::bitbucket::wire;
use crate::types::{
    BitbucketIssue, BitbucketPullRequest, BitbucketRepository, Commit, FileChangeStat,
    PullRequestRef, PullRequestState, RepositoryBranch, RepositoryLocation,
};

use anyhow::{Context, Result};

/// Production API root; tests point this at a local mock server
pub const DEFAULT_BASE_URL: &str = "https://api.bitbucket.org";

/// Pacing delay for a fresh client
pub const INITIAL_PACING_DELAY: Duration = Duration::from_millis(100);

/// Floor the pacing delay decays toward on successful responses
const MIN_PACING_DELAY: Duration = Duration::from_millis(100);

/// Cap for the pacing delay, however many 429s arrive
const MAX_PACING_DELAY: Duration = Duration::from_secs(10);

/// Retry ceiling for 5xx responses and transport failures
const MAX_SERVER_ERROR_RETRIES: u32 = 3;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default page size for list endpoints
const LIST_PAGE_LEN: u32 = 50;

/// How the client authenticates against the API
#[derive(Debug, Clone)]
pub enum Credentials {
    /// HTTP basic auth with a username and app password
    AppPassword {
        username: String,
        app_password: String,
    },
    /// Bearer token (repository or workspace access token)
    AccessToken(String),
}

#[derive(Clone)]
pub struct BitbucketClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    pacing_delay: Arc<Mutex<Duration>>,
}

impl BitbucketClient {
    pub fn new(
        credentials: Credentials,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .context("Failed to build Bitbucket HTTP client")?;

        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            http,
            base_url,
            credentials,
            pacing_delay: Arc::new(Mutex::new(INITIAL_PACING_DELAY)),
        })
    }

    /// Current pacing delay; exposed for tests and diagnostics
    pub fn pacing_delay(&self) -> Duration {
        *self
            .pacing_delay
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn note_success(&self) {
        let mut delay = self
            .pacing_delay
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let decayed = Duration::from_millis((delay.as_millis() as u64).saturating_mul(9) / 10);
        *delay = decayed.max(MIN_PACING_DELAY);
    }

    fn note_rate_limit(&self, retry_after: Option<Duration>) -> Duration {
        let mut delay = self
            .pacing_delay
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let raised = retry_after.unwrap_or_else(|| delay.saturating_mul(2));
        *delay = raised.clamp(MIN_PACING_DELAY, MAX_PACING_DELAY);
        *delay
    }

    /// Performs one API call with pacing and retry applied.
    ///
    /// Returns the successful response, or the final error after retries are
    /// exhausted; the error keeps the upstream status code and message.
    async fn send(
        &self,
        operation: &str,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut server_error_attempt = 0u32;
        let mut rate_limit_retried = false;

        loop {
            sleep(self.pacing_delay()).await;

            let mut request = self.http.request(method.clone(), &url);
            if !query.is_empty() {
                request = request.query(query);
            }
            request = match &self.credentials {
                Credentials::AppPassword {
                    username,
                    app_password,
                } => request.basic_auth(username, Some(app_password)),
                Credentials::AccessToken(token) => request.bearer_auth(token),
            };
            if let Some(body) = &body {
                request = request.json(body);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    // Transport failures are retried like 5xx responses
                    if server_error_attempt < MAX_SERVER_ERROR_RETRIES {
                        server_error_attempt += 1;
                        let backoff = Duration::from_secs(2u64.saturating_pow(server_error_attempt));
                        warn!(
                            "{}: transport error ({}), attempt {}/{}, backing off {:?}",
                            operation, e, server_error_attempt, MAX_SERVER_ERROR_RETRIES, backoff
                        );
                        sleep(backoff).await;
                        continue;
                    }
                    return Err(ApiError::Network(e.to_string()));
                }
            };

            let status = response.status();
            if status.is_success() {
                self.note_success();
                return Ok(response);
            }

            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            let message = response.text().await.unwrap_or_default();
            let message = if message.len() > 500 {
                let mut end = 500;
                while !message.is_char_boundary(end) {
                    end -= 1;
                }
                format!("{}…", &message[..end])
            } else {
                message
            };
            let error = ApiError::Status {
                status: status.as_u16(),
                message,
            };

            match classify_status(status.as_u16()) {
                RetryClass::RateLimited => {
                    let raised = self.note_rate_limit(retry_after);
                    if !rate_limit_retried {
                        rate_limit_retried = true;
                        warn!(
                            "{}: rate limited (429), pacing raised to {:?}, retrying once",
                            operation, raised
                        );
                        continue;
                    }
                    return Err(error);
                }
                RetryClass::Transient => {
                    if server_error_attempt < MAX_SERVER_ERROR_RETRIES {
                        server_error_attempt += 1;
                        let backoff = Duration::from_secs(2u64.saturating_pow(server_error_attempt));
                        warn!(
                            "{}: server error ({}), attempt {}/{}, backing off {:?}",
                            operation,
                            status,
                            server_error_attempt,
                            MAX_SERVER_ERROR_RETRIES,
                            backoff
                        );
                        sleep(backoff).await;
                        continue;
                    }
                    return Err(error);
                }
                RetryClass::Fatal => {
                    debug!("{}: non-retryable failure ({})", operation, status);
                    return Err(error);
                }
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T, ApiError> {
        let response = self.send(operation, Method::GET, path, query, None).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(format!("{}: {}", operation, e)))
    }

    async fn get_text(
        &self,
        operation: &str,
        path: &str,
        query: &[(String, String)],
    ) -> Result<String, ApiError> {
        let response = self.send(operation, Method::GET, path, query, None).await?;
        response
            .text()
            .await
            .map_err(|e| ApiError::Decode(format!("{}: {}", operation, e)))
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, ApiError> {
        let response = self
            .send(operation, Method::POST, path, &[], Some(body))
            .await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(format!("{}: {}", operation, e)))
    }

    fn repo_path(&self, location: &RepositoryLocation, suffix: &str) -> String {
        format!(
            "/2.0/repositories/{}/{}{}",
            urlencoding::encode(&location.workspace),
            urlencoding::encode(&location.repo_slug),
            suffix
        )
    }

    /// Validates the configured credentials against `GET /2.0/user` and
    /// returns the authenticated user's display name.
    pub async fn validate_credentials(&self) -> Result<String, ApiError> {
        let user: wire::UserBody = self.get_json("validate_credentials", "/2.0/user", &[]).await?;
        Ok(user.name())
    }

    pub async fn list_repositories(
        &self,
        workspace: &str,
    ) -> Result<Vec<BitbucketRepository>, ApiError> {
        let path = format!("/2.0/repositories/{}", urlencoding::encode(workspace));
        let page: wire::Page<wire::RepositoryBody> = self
            .get_json(
                "list_repositories",
                &path,
                &[("pagelen".to_string(), LIST_PAGE_LEN.to_string())],
            )
            .await?;
        Ok(page
            .values
            .into_iter()
            .map(|body| body.into_domain(workspace))
            .collect())
    }

    pub async fn get_repository(
        &self,
        location: &RepositoryLocation,
    ) -> Result<BitbucketRepository, ApiError> {
        let path = self.repo_path(location, "");
        let body: wire::RepositoryBody = self.get_json("get_repository", &path, &[]).await?;
        Ok(body.into_domain(&location.workspace))
    }

    pub async fn list_branches(
        &self,
        location: &RepositoryLocation,
    ) -> Result<Vec<RepositoryBranch>, ApiError> {
        let path = self.repo_path(location, "/refs/branches");
        let page: wire::Page<wire::BranchBody> = self
            .get_json(
                "list_branches",
                &path,
                &[("pagelen".to_string(), LIST_PAGE_LEN.to_string())],
            )
            .await?;
        Ok(page.values.into_iter().map(Into::into).collect())
    }

    pub async fn list_commits(
        &self,
        location: &RepositoryLocation,
        revision: Option<&str>,
    ) -> Result<Vec<Commit>, ApiError> {
        let suffix = match revision {
            Some(revision) => format!("/commits/{}", urlencoding::encode(revision)),
            None => "/commits".to_string(),
        };
        let path = self.repo_path(location, &suffix);
        let page: wire::Page<wire::CommitBody> = self
            .get_json(
                "list_commits",
                &path,
                &[("pagelen".to_string(), LIST_PAGE_LEN.to_string())],
            )
            .await?;
        Ok(page.values.into_iter().map(Into::into).collect())
    }

    pub async fn list_pull_requests(
        &self,
        location: &RepositoryLocation,
        state: Option<PullRequestState>,
    ) -> Result<Vec<BitbucketPullRequest>, ApiError> {
        let path = self.repo_path(location, "/pullrequests");
        let mut query = vec![("pagelen".to_string(), LIST_PAGE_LEN.to_string())];
        if let Some(state) = state {
            query.push(("state".to_string(), state.to_string()));
        }
        let page: wire::Page<wire::PullRequestBody> =
            self.get_json("list_pull_requests", &path, &query).await?;
        page.values
            .into_iter()
            .map(|body| body.into_domain(location.clone()))
            .collect()
    }

    pub async fn get_pull_request(
        &self,
        pr: &PullRequestRef,
    ) -> Result<BitbucketPullRequest, ApiError> {
        let path = self.repo_path(&pr.location, &format!("/pullrequests/{}", pr.id));
        let body: wire::PullRequestBody = self.get_json("get_pull_request", &path, &[]).await?;
        body.into_domain(pr.location.clone())
    }

    /// Direct diff endpoint; 404s for non-participants of private pull requests
    pub async fn get_pull_request_diff(&self, pr: &PullRequestRef) -> Result<String, ApiError> {
        let path = self.repo_path(&pr.location, &format!("/pullrequests/{}/diff", pr.id));
        self.get_text("get_pull_request_diff", &path, &[]).await
    }

    /// Structured per-file stats endpoint; may 404 like the diff endpoint
    pub async fn get_pull_request_diffstat(
        &self,
        pr: &PullRequestRef,
    ) -> Result<Vec<FileChangeStat>, ApiError> {
        let path = self.repo_path(&pr.location, &format!("/pullrequests/{}/diffstat", pr.id));
        let page: wire::Page<wire::DiffStatEntry> = self
            .get_json("get_pull_request_diffstat", &path, &[])
            .await?;
        Ok(page.values.into_iter().map(Into::into).collect())
    }

    pub async fn list_pull_request_commits(
        &self,
        pr: &PullRequestRef,
    ) -> Result<Vec<Commit>, ApiError> {
        let path = self.repo_path(&pr.location, &format!("/pullrequests/{}/commits", pr.id));
        let page: wire::Page<wire::CommitBody> = self
            .get_json("list_pull_request_commits", &path, &[])
            .await?;
        Ok(page.values.into_iter().map(Into::into).collect())
    }

    /// Diff of a single commit, optionally filtered server-side to one path
    pub async fn get_commit_diff(
        &self,
        location: &RepositoryLocation,
        commit_hash: &str,
        path_filter: Option<&str>,
    ) -> Result<String, ApiError> {
        let path = self.repo_path(location, &format!("/diff/{}", urlencoding::encode(commit_hash)));
        let query = match path_filter {
            Some(filter) => vec![("path".to_string(), filter.to_string())],
            None => Vec::new(),
        };
        self.get_text("get_commit_diff", &path, &query).await
    }

    /// Two-dot commit-range compare, optionally filtered to one path
    pub async fn compare_commits(
        &self,
        location: &RepositoryLocation,
        source_hash: &str,
        destination_hash: &str,
        path_filter: Option<&str>,
    ) -> Result<String, ApiError> {
        let spec = format!(
            "{}..{}",
            urlencoding::encode(source_hash),
            urlencoding::encode(destination_hash)
        );
        let path = self.repo_path(location, &format!("/diff/{}", spec));
        let query = match path_filter {
            Some(filter) => vec![("path".to_string(), filter.to_string())],
            None => Vec::new(),
        };
        self.get_text("compare_commits", &path, &query).await
    }

    /// Three-dot branch compare: changes on the source branch since it
    /// diverged from the destination branch
    pub async fn compare_branches(
        &self,
        location: &RepositoryLocation,
        destination_branch: &str,
        source_branch: &str,
    ) -> Result<String, ApiError> {
        let spec = format!(
            "{}...{}",
            urlencoding::encode(destination_branch),
            urlencoding::encode(source_branch)
        );
        let path = self.repo_path(location, &format!("/diff/{}", spec));
        self.get_text("compare_branches", &path, &[]).await
    }

    /// Raw file content at a revision
    pub async fn get_file_content(
        &self,
        location: &RepositoryLocation,
        revision: &str,
        file_path: &str,
    ) -> Result<String, ApiError> {
        let encoded_path = file_path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let path = self.repo_path(
            location,
            &format!("/src/{}/{}", urlencoding::encode(revision), encoded_path),
        );
        self.get_text("get_file_content", &path, &[]).await
    }

    pub async fn create_pull_request(
        &self,
        location: &RepositoryLocation,
        title: &str,
        source_branch: &str,
        destination_branch: &str,
        description: Option<&str>,
    ) -> Result<BitbucketPullRequest, ApiError> {
        let path = self.repo_path(location, "/pullrequests");
        let mut body = serde_json::json!({
            "title": title,
            "source": { "branch": { "name": source_branch } },
            "destination": { "branch": { "name": destination_branch } },
        });
        if let Some(description) = description {
            body["description"] = serde_json::Value::String(description.to_string());
        }
        let created: wire::PullRequestBody =
            self.post_json("create_pull_request", &path, body).await?;
        created.into_domain(location.clone())
    }

    pub async fn list_issues(
        &self,
        location: &RepositoryLocation,
    ) -> Result<Vec<BitbucketIssue>, ApiError> {
        let path = self.repo_path(location, "/issues");
        let page: wire::Page<wire::IssueBody> = self
            .get_json(
                "list_issues",
                &path,
                &[("pagelen".to_string(), LIST_PAGE_LEN.to_string())],
            )
            .await?;
        Ok(page
            .values
            .into_iter()
            .map(|body| body.into_domain(location.clone()))
            .collect())
    }

    pub async fn get_issue(
        &self,
        location: &RepositoryLocation,
        issue_id: u64,
    ) -> Result<BitbucketIssue, ApiError> {
        let path = self.repo_path(location, &format!("/issues/{}", issue_id));
        let body: wire::IssueBody = self.get_json("get_issue", &path, &[]).await?;
        Ok(body.into_domain(location.clone()))
    }

    pub async fn create_issue(
        &self,
        location: &RepositoryLocation,
        title: &str,
        content: Option<&str>,
        kind: Option<&str>,
        priority: Option<&str>,
    ) -> Result<BitbucketIssue, ApiError> {
        let path = self.repo_path(location, "/issues");
        let mut body = serde_json::json!({ "title": title });
        if let Some(content) = content {
            body["content"] = serde_json::json!({ "raw": content });
        }
        if let Some(kind) = kind {
            body["kind"] = serde_json::Value::String(kind.to_string());
        }
        if let Some(priority) = priority {
            body["priority"] = serde_json::Value::String(priority.to_string());
        }
        let created: wire::IssueBody = self.post_json("create_issue", &path, body).await?;
        Ok(created.into_domain(location.clone()))
    }
}
