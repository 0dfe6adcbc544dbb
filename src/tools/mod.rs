//! MCP (Model Context Protocol) tool implementations for BitbucketInsight
//!
//! This module provides the MCP server interface, exposing Bitbucket Cloud
//! functionality as tools that can be used by AI assistants and other MCP
//! clients.
//!
//! ## Features
//!
//! - Pull request diff retrieval with multi-strategy fallback for limited
//!   access situations
//! - Size-budgeted diff responses that degrade to per-file summaries
//! - Repository, branch, commit, and issue tracker access
//! - Shared TTL cache and adaptive request pacing across all tools

use std::sync::Arc;

use anyhow::Result;
use rmcp::{Error as McpError, ServerHandler, model::*, tool};

use crate::bitbucket::{BitbucketClient, Credentials};
use crate::cache::{CacheKey, SWEEP_INTERVAL, TtlCache, ttl};
use crate::diff::KeywordRelevance;
use crate::types::{PullRequestId, PullRequestRef, PullRequestState, RepositoryLocation};

/// Error types specific to tool operations
pub mod error;

/// Tool function implementations organized by functionality
pub mod functions;

use functions::pull_request::DiffRequestOptions;

/// Authentication and endpoint configuration for the server
#[derive(Debug, Clone, Default)]
pub struct BitbucketConfig {
    pub username: Option<String>,
    pub app_password: Option<String>,
    pub access_token: Option<String>,
    /// Override of the API base URL, used by tests
    pub base_url: Option<String>,
}

impl BitbucketConfig {
    /// Resolves the configured credentials, preferring an access token over
    /// the username/app-password pair
    pub fn credentials(&self) -> Result<Credentials> {
        if let Some(token) = &self.access_token {
            return Ok(Credentials::AccessToken(token.clone()));
        }
        match (&self.username, &self.app_password) {
            (Some(username), Some(app_password)) => Ok(Credentials::AppPassword {
                username: username.clone(),
                app_password: app_password.clone(),
            }),
            _ => Err(error::ToolError::AuthenticationError(
                "no credentials configured: provide an access token or a \
                 username and app password"
                    .to_string(),
            )
            .into()),
        }
    }
}

/// Shared per-server state: one HTTP client with its pacing state, one
/// cache, one relevance check. Built once and cloned by reference into
/// every tool invocation.
pub struct ServerContext {
    pub client: BitbucketClient,
    pub cache: Arc<TtlCache>,
    pub relevance: KeywordRelevance,
}

/// Wrapper for Bitbucket tools exposed through the MCP protocol.
///
/// Construction never fails: without usable credentials the server still
/// starts, and every tool invocation returns a configuration error instead.
#[derive(Clone)]
pub struct BitbucketTools {
    context: Option<Arc<ServerContext>>,
    auth_label: &'static str,
}

impl BitbucketTools {
    /// Creates a new BitbucketTools instance from configuration
    pub fn new(config: BitbucketConfig) -> Self {
        let (context, auth_label) = match config.credentials() {
            Ok(credentials) => {
                let auth_label = match &credentials {
                    Credentials::AccessToken(_) => "Authenticated with access token",
                    Credentials::AppPassword { .. } => "Authenticated with app password",
                };
                match BitbucketClient::new(credentials, config.base_url.clone(), None) {
                    Ok(client) => {
                        let context = Arc::new(ServerContext {
                            client,
                            cache: Arc::new(TtlCache::new()),
                            relevance: KeywordRelevance::default(),
                        });
                        (Some(context), auth_label)
                    }
                    Err(e) => {
                        tracing::warn!("Failed to build Bitbucket client: {}", e);
                        (None, "Not configured")
                    }
                }
            }
            Err(e) => {
                tracing::warn!("{}", e);
                (None, "Not configured (set credentials to enable tools)")
            }
        };
        Self {
            context,
            auth_label,
        }
    }

    /// Initializes the server: starts the cache sweeper and verifies that
    /// the configured credentials are accepted by the API
    pub async fn initialize(&self) -> Result<()> {
        tracing::info!("Initializing BitbucketTools...");

        let Some(context) = &self.context else {
            tracing::warn!(
                "No Bitbucket credentials configured; tools will return configuration errors"
            );
            return Ok(());
        };

        context.cache.start_sweeper(SWEEP_INTERVAL);

        if let Some(user) = context.cache.get_typed::<String>(&CacheKey::TokenCheck) {
            tracing::info!("Credentials already verified for user {}", user);
            return Ok(());
        }
        let user = context
            .client
            .validate_credentials()
            .await
            .map_err(|e| anyhow::anyhow!("Credential validation failed: {}", e))?;
        context
            .cache
            .set_typed(CacheKey::TokenCheck, &user, ttl::TOKEN_CHECK);
        tracing::info!("Authenticated as {}", user);

        tracing::info!("BitbucketTools initialization complete");
        Ok(())
    }

    fn require_context(&self) -> Result<&Arc<ServerContext>, McpError> {
        self.context.as_ref().ok_or_else(|| {
            let error = error::ToolError::AuthenticationError(
                "Bitbucket credentials are not configured. Provide an access token or a \
                 username and app password via flags or the BITBUCKET_* environment variables."
                    .to_string(),
            );
            McpError::invalid_request(error.to_string(), None)
        })
    }
}

fn parse_state(state: Option<String>) -> Result<Option<PullRequestState>, McpError> {
    state
        .map(|s| s.trim().to_uppercase().parse::<PullRequestState>())
        .transpose()
        .map_err(|_| {
            let error = error::ToolError::InvalidParameter(
                "pull request state must be OPEN, MERGED, DECLINED, or SUPERSEDED".to_string(),
            );
            McpError::invalid_params(error.to_string(), None)
        })
}

fn markdown_result(content: crate::formatter::MarkdownContent) -> CallToolResult {
    CallToolResult {
        content: vec![Content::text(content.0)],
        is_error: Some(false),
    }
}

#[tool(tool_box)]
impl BitbucketTools {
    #[tool(
        description = "List repositories in a Bitbucket workspace. Returns repository names and descriptions as markdown. Example: {\"workspace\": \"acme\"}"
    )]
    async fn list_repositories(
        &self,
        #[tool(param)]
        #[schemars(description = "Workspace id, e.g. 'acme'")]
        workspace: String,
    ) -> Result<CallToolResult, McpError> {
        let content = functions::repository::list_repositories(self.require_context()?, workspace)
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(markdown_result(content))
    }

    #[tool(
        description = "Get repository details including description, visibility, main branch, and language. Example: {\"workspace\": \"acme\", \"repo_slug\": \"widget-service\"}"
    )]
    async fn get_repository(
        &self,
        #[tool(param)]
        #[schemars(description = "Workspace id, e.g. 'acme'")]
        workspace: String,
        #[tool(param)]
        #[schemars(description = "Repository slug, e.g. 'widget-service'")]
        repo_slug: String,
    ) -> Result<CallToolResult, McpError> {
        let location = RepositoryLocation::new(workspace, repo_slug);
        let content = functions::repository::get_repository(self.require_context()?, location)
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(markdown_result(content))
    }

    #[tool(
        description = "List branches of a repository with their head commit hashes. Example: {\"workspace\": \"acme\", \"repo_slug\": \"widget-service\"}"
    )]
    async fn list_branches(
        &self,
        #[tool(param)]
        #[schemars(description = "Workspace id")]
        workspace: String,
        #[tool(param)]
        #[schemars(description = "Repository slug")]
        repo_slug: String,
    ) -> Result<CallToolResult, McpError> {
        let location = RepositoryLocation::new(workspace, repo_slug);
        let content = functions::repository::list_branches(self.require_context()?, location)
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(markdown_result(content))
    }

    #[tool(
        description = "List commits of a repository, optionally starting from a branch name or commit hash. Example: {\"workspace\": \"acme\", \"repo_slug\": \"widget-service\", \"revision\": \"main\"}"
    )]
    async fn list_commits(
        &self,
        #[tool(param)]
        #[schemars(description = "Workspace id")]
        workspace: String,
        #[tool(param)]
        #[schemars(description = "Repository slug")]
        repo_slug: String,
        #[tool(param)]
        #[schemars(
            description = "Optional branch name or commit hash to start from; defaults to the main branch"
        )]
        revision: Option<String>,
    ) -> Result<CallToolResult, McpError> {
        let location = RepositoryLocation::new(workspace, repo_slug);
        let content = functions::repository::list_commits(self.require_context()?, location, revision)
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(markdown_result(content))
    }

    #[tool(
        description = "List pull requests of a repository, optionally filtered by state. Example: {\"workspace\": \"acme\", \"repo_slug\": \"widget-service\", \"state\": \"OPEN\"}"
    )]
    async fn list_pull_requests(
        &self,
        #[tool(param)]
        #[schemars(description = "Workspace id")]
        workspace: String,
        #[tool(param)]
        #[schemars(description = "Repository slug")]
        repo_slug: String,
        #[tool(param)]
        #[schemars(description = "Optional state filter: OPEN, MERGED, DECLINED, or SUPERSEDED")]
        state: Option<String>,
    ) -> Result<CallToolResult, McpError> {
        let location = RepositoryLocation::new(workspace, repo_slug);
        let state = parse_state(state)?;
        let content = functions::pull_request::list_pull_requests(self.require_context()?, location, state)
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(markdown_result(content))
    }

    #[tool(
        description = "Get pull request details including title, state, author, branches, and description. Example: {\"workspace\": \"acme\", \"repo_slug\": \"widget-service\", \"pull_request_id\": 42}"
    )]
    async fn get_pull_request(
        &self,
        #[tool(param)]
        #[schemars(description = "Workspace id")]
        workspace: String,
        #[tool(param)]
        #[schemars(description = "Repository slug")]
        repo_slug: String,
        #[tool(param)]
        #[schemars(description = "Numeric pull request id")]
        pull_request_id: u64,
    ) -> Result<CallToolResult, McpError> {
        let pr = PullRequestRef::new(
            RepositoryLocation::new(workspace, repo_slug),
            PullRequestId::new(pull_request_id),
        );
        let content = functions::pull_request::get_pull_request(self.require_context()?, pr)
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(markdown_result(content))
    }

    #[tool(
        description = "Get the diff of a pull request. Uses multiple retrieval strategies so diffs are usually available even with limited repository access; when every strategy fails, returns an explanation with remediation steps instead of an error. Oversized diffs degrade to a per-file summary. Example: {\"workspace\": \"acme\", \"repo_slug\": \"widget-service\", \"pull_request_id\": 42, \"file_path\": \"src/main.rs\", \"max_size\": 15000}"
    )]
    async fn get_pull_request_diff(
        &self,
        #[tool(param)]
        #[schemars(description = "Workspace id")]
        workspace: String,
        #[tool(param)]
        #[schemars(description = "Repository slug")]
        repo_slug: String,
        #[tool(param)]
        #[schemars(description = "Numeric pull request id")]
        pull_request_id: u64,
        #[tool(param)]
        #[schemars(description = "Optional file path to restrict the diff to a single file")]
        file_path: Option<String>,
        #[tool(param)]
        #[schemars(
            description = "Optional maximum number of unchanged context lines kept after each change (0-10)"
        )]
        context_lines: Option<u32>,
        #[tool(param)]
        #[schemars(description = "Drop whitespace-only change lines (default: false)")]
        ignore_whitespace: Option<bool>,
        #[tool(param)]
        #[schemars(
            description = "Approximate token budget for the response, between 1000 and 20000 (default: 10000). Larger diffs are summarized instead."
        )]
        max_size: Option<u64>,
    ) -> Result<CallToolResult, McpError> {
        let pr = PullRequestRef::new(
            RepositoryLocation::new(workspace, repo_slug),
            PullRequestId::new(pull_request_id),
        );
        let options = DiffRequestOptions {
            file_path,
            context_lines,
            ignore_whitespace: ignore_whitespace.unwrap_or(false),
            max_size,
        };
        let content = functions::pull_request::get_pull_request_diff(self.require_context()?, pr, options)
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(markdown_result(content))
    }

    #[tool(
        description = "Get per-file change statistics of a pull request: changed files with addition and deletion counts. Falls back to reconstructing the statistics from diff text when the statistics endpoint is unavailable. Example: {\"workspace\": \"acme\", \"repo_slug\": \"widget-service\", \"pull_request_id\": 42}"
    )]
    async fn get_pull_request_files(
        &self,
        #[tool(param)]
        #[schemars(description = "Workspace id")]
        workspace: String,
        #[tool(param)]
        #[schemars(description = "Repository slug")]
        repo_slug: String,
        #[tool(param)]
        #[schemars(description = "Numeric pull request id")]
        pull_request_id: u64,
    ) -> Result<CallToolResult, McpError> {
        let pr = PullRequestRef::new(
            RepositoryLocation::new(workspace, repo_slug),
            PullRequestId::new(pull_request_id),
        );
        let content = functions::pull_request::get_pull_request_files(self.require_context()?, pr)
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(markdown_result(content))
    }

    #[tool(
        description = "Create a pull request. Example: {\"workspace\": \"acme\", \"repo_slug\": \"widget-service\", \"title\": \"Add rate limiting\", \"source_branch\": \"rate-limit\", \"destination_branch\": \"main\"}"
    )]
    async fn create_pull_request(
        &self,
        #[tool(param)]
        #[schemars(description = "Workspace id")]
        workspace: String,
        #[tool(param)]
        #[schemars(description = "Repository slug")]
        repo_slug: String,
        #[tool(param)]
        #[schemars(description = "Pull request title")]
        title: String,
        #[tool(param)]
        #[schemars(description = "Source branch name")]
        source_branch: String,
        #[tool(param)]
        #[schemars(description = "Destination branch name")]
        destination_branch: String,
        #[tool(param)]
        #[schemars(description = "Optional pull request description")]
        description: Option<String>,
    ) -> Result<CallToolResult, McpError> {
        let location = RepositoryLocation::new(workspace, repo_slug);
        let content = functions::pull_request::create_pull_request(
            self.require_context()?,
            location,
            title,
            source_branch,
            destination_branch,
            description,
        )
        .await
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(markdown_result(content))
    }

    #[tool(
        description = "Get the raw content of a file at a revision. Example: {\"workspace\": \"acme\", \"repo_slug\": \"widget-service\", \"revision\": \"main\", \"file_path\": \"src/main.rs\"}"
    )]
    async fn get_file_content(
        &self,
        #[tool(param)]
        #[schemars(description = "Workspace id")]
        workspace: String,
        #[tool(param)]
        #[schemars(description = "Repository slug")]
        repo_slug: String,
        #[tool(param)]
        #[schemars(
            description = "Optional branch name or commit hash; defaults to the main branch"
        )]
        revision: Option<String>,
        #[tool(param)]
        #[schemars(description = "Path of the file within the repository")]
        file_path: String,
    ) -> Result<CallToolResult, McpError> {
        let location = RepositoryLocation::new(workspace, repo_slug);
        let content =
            functions::repository::get_file_content(self.require_context()?, location, revision, file_path)
                .await
                .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(markdown_result(content))
    }

    #[tool(
        description = "List issues of a repository's issue tracker. Example: {\"workspace\": \"acme\", \"repo_slug\": \"widget-service\"}"
    )]
    async fn list_issues(
        &self,
        #[tool(param)]
        #[schemars(description = "Workspace id")]
        workspace: String,
        #[tool(param)]
        #[schemars(description = "Repository slug")]
        repo_slug: String,
    ) -> Result<CallToolResult, McpError> {
        let location = RepositoryLocation::new(workspace, repo_slug);
        let content = functions::issue::list_issues(self.require_context()?, location)
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(markdown_result(content))
    }

    #[tool(
        description = "Get issue details including state, kind, priority, and content. Example: {\"workspace\": \"acme\", \"repo_slug\": \"widget-service\", \"issue_id\": 17}"
    )]
    async fn get_issue(
        &self,
        #[tool(param)]
        #[schemars(description = "Workspace id")]
        workspace: String,
        #[tool(param)]
        #[schemars(description = "Repository slug")]
        repo_slug: String,
        #[tool(param)]
        #[schemars(description = "Numeric issue id")]
        issue_id: u64,
    ) -> Result<CallToolResult, McpError> {
        let location = RepositoryLocation::new(workspace, repo_slug);
        let content = functions::issue::get_issue(self.require_context()?, location, issue_id)
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(markdown_result(content))
    }

    #[tool(
        description = "Create an issue in a repository's issue tracker. Example: {\"workspace\": \"acme\", \"repo_slug\": \"widget-service\", \"title\": \"Timeout on large diff\", \"kind\": \"bug\"}"
    )]
    async fn create_issue(
        &self,
        #[tool(param)]
        #[schemars(description = "Workspace id")]
        workspace: String,
        #[tool(param)]
        #[schemars(description = "Repository slug")]
        repo_slug: String,
        #[tool(param)]
        #[schemars(description = "Issue title")]
        title: String,
        #[tool(param)]
        #[schemars(description = "Optional issue body")]
        content: Option<String>,
        #[tool(param)]
        #[schemars(description = "Optional issue kind, e.g. 'bug', 'enhancement', 'task'")]
        kind: Option<String>,
        #[tool(param)]
        #[schemars(description = "Optional priority, e.g. 'trivial', 'minor', 'major', 'critical'")]
        priority: Option<String>,
    ) -> Result<CallToolResult, McpError> {
        let location = RepositoryLocation::new(workspace, repo_slug);
        let markdown =
            functions::issue::create_issue(self.require_context()?, location, title, content, kind, priority)
                .await
                .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(markdown_result(markdown))
    }
}

#[tool(tool_box)]
impl ServerHandler for BitbucketTools {
    fn get_info(&self) -> ServerInfo {
        let instructions = format!(
            r#"BitbucketInsight MCP Server - {}

## Overview
BitbucketInsight exposes Bitbucket Cloud repositories, pull requests, and issues as MCP tools. Its centerpiece is resilient pull request diff retrieval: when the direct diff endpoint is unavailable (limited access, removed branches, oversized diffs), it falls back through per-commit diffs, branch comparison, and commit-range comparison before reporting limited access with remediation steps.

## Available Tools

### Repositories
- list_repositories: repositories of a workspace
- get_repository: details of one repository
- list_branches: branches with head commit hashes
- list_commits: commit history, optionally from a revision
- get_file_content: raw file content at a revision

### Pull Requests
- list_pull_requests: pull requests, optionally filtered by state (OPEN, MERGED, DECLINED, SUPERSEDED)
- get_pull_request: metadata of one pull request
- get_pull_request_diff: the diff, with optional file_path scoping, context_lines trimming, ignore_whitespace filtering, and a max_size token budget (1000-20000, default 10000). Oversized diffs return a per-file summary; request a single file or raise max_size to follow up.
- get_pull_request_files: per-file addition/deletion statistics
- create_pull_request: open a new pull request

### Issues
- list_issues, get_issue, create_issue: issue tracker access

## Common Workflows

1. **Review a pull request**:
   - get_pull_request for metadata, then get_pull_request_files for an overview
   - get_pull_request_diff for the full diff; on a too-large summary, re-request with file_path set to the files of interest

2. **Explore a repository**:
   - list_repositories, then get_repository and list_branches
   - list_commits and get_file_content to inspect history and sources
"#,
            self.auth_label
        );

        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(instructions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_prefer_access_token() {
        let config = BitbucketConfig {
            username: Some("u".to_string()),
            app_password: Some("p".to_string()),
            access_token: Some("t".to_string()),
            base_url: None,
        };
        assert!(matches!(
            config.credentials().unwrap(),
            Credentials::AccessToken(token) if token == "t"
        ));
    }

    #[test]
    fn test_credentials_missing() {
        let config = BitbucketConfig::default();
        assert!(config.credentials().is_err());
    }

    #[tokio::test]
    async fn test_tools_without_credentials_return_configuration_error() {
        let tools = BitbucketTools::new(BitbucketConfig::default());
        let error = tools
            .list_repositories("acme".to_string())
            .await
            .unwrap_err();
        assert!(error.message.contains("credentials are not configured"));
    }

    #[test]
    fn test_parse_state_accepts_lowercase() {
        assert_eq!(
            parse_state(Some("open".to_string())).unwrap(),
            Some(PullRequestState::Open)
        );
        assert_eq!(parse_state(None).unwrap(), None);
        assert!(parse_state(Some("bogus".to_string())).is_err());
    }
}
