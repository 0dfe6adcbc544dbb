//! Issue tracker tool operations.
//!
//! Issue data is not cached: the tracker is low-traffic compared to the
//! diff paths and issue states change out of band.

use anyhow::Result;

use crate::bitbucket::error::describe_api_error;
use crate::formatter::{MarkdownContent, issue_body_markdown, issue_list_markdown};
use crate::tools::ServerContext;
use crate::types::RepositoryLocation;

pub async fn list_issues(
    context: &ServerContext,
    location: RepositoryLocation,
) -> Result<MarkdownContent> {
    let issues = context.client.list_issues(&location).await.map_err(|e| {
        anyhow::anyhow!(describe_api_error("list_issues", &location.full_name(), &e))
    })?;
    Ok(issue_list_markdown(&location, &issues))
}

pub async fn get_issue(
    context: &ServerContext,
    location: RepositoryLocation,
    issue_id: u64,
) -> Result<MarkdownContent> {
    let issue = context
        .client
        .get_issue(&location, issue_id)
        .await
        .map_err(|e| {
            anyhow::anyhow!(describe_api_error(
                "get_issue",
                &format!("{}#{}", location.full_name(), issue_id),
                &e
            ))
        })?;
    Ok(issue_body_markdown(&issue))
}

pub async fn create_issue(
    context: &ServerContext,
    location: RepositoryLocation,
    title: String,
    content: Option<String>,
    kind: Option<String>,
    priority: Option<String>,
) -> Result<MarkdownContent> {
    let issue = context
        .client
        .create_issue(
            &location,
            &title,
            content.as_deref(),
            kind.as_deref(),
            priority.as_deref(),
        )
        .await
        .map_err(|e| {
            anyhow::anyhow!(describe_api_error(
                "create_issue",
                &location.full_name(),
                &e
            ))
        })?;
    Ok(issue_body_markdown(&issue))
}
