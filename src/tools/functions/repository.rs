//! Repository tool operations: cached reads of repository metadata,
//! branches, commits, and file contents

use anyhow::Result;

use crate::bitbucket::error::describe_api_error;
use crate::cache::{CacheKey, ttl};
use crate::formatter::{
    MarkdownContent, branch_list_markdown, commit_list_markdown, repository_body_markdown,
    repository_list_markdown,
};
use crate::tools::ServerContext;
use crate::types::{BitbucketRepository, Commit, RepositoryBranch, RepositoryLocation};

pub async fn list_repositories(
    context: &ServerContext,
    workspace: String,
) -> Result<MarkdownContent> {
    let key = CacheKey::repository_list(&workspace);
    if let Some(cached) = context.cache.get_typed::<Vec<BitbucketRepository>>(&key) {
        return Ok(repository_list_markdown(&workspace, &cached));
    }
    let repositories = context
        .client
        .list_repositories(&workspace)
        .await
        .map_err(|e| anyhow::anyhow!(describe_api_error("list_repositories", &workspace, &e)))?;
    context
        .cache
        .set_typed(key, &repositories, ttl::REPOSITORY_LIST);
    Ok(repository_list_markdown(&workspace, &repositories))
}

pub async fn get_repository(
    context: &ServerContext,
    location: RepositoryLocation,
) -> Result<MarkdownContent> {
    let repository = cached_repository(context, &location).await?;
    Ok(repository_body_markdown(&repository))
}

async fn cached_repository(
    context: &ServerContext,
    location: &RepositoryLocation,
) -> Result<BitbucketRepository> {
    let key = CacheKey::repository(location);
    if let Some(cached) = context.cache.get_typed::<BitbucketRepository>(&key) {
        return Ok(cached);
    }
    let repository = context.client.get_repository(location).await.map_err(|e| {
        anyhow::anyhow!(describe_api_error("get_repository", &location.full_name(), &e))
    })?;
    context.cache.set_typed(key, &repository, ttl::REPOSITORY);
    Ok(repository)
}

pub async fn list_branches(
    context: &ServerContext,
    location: RepositoryLocation,
) -> Result<MarkdownContent> {
    let key = CacheKey::branch_list(&location);
    if let Some(cached) = context.cache.get_typed::<Vec<RepositoryBranch>>(&key) {
        return Ok(branch_list_markdown(&location, &cached));
    }
    let branches = context.client.list_branches(&location).await.map_err(|e| {
        anyhow::anyhow!(describe_api_error("list_branches", &location.full_name(), &e))
    })?;
    context.cache.set_typed(key, &branches, ttl::BRANCH_LIST);
    Ok(branch_list_markdown(&location, &branches))
}

pub async fn list_commits(
    context: &ServerContext,
    location: RepositoryLocation,
    revision: Option<String>,
) -> Result<MarkdownContent> {
    let key = CacheKey::commit_list(&location, revision.as_deref());
    if let Some(cached) = context.cache.get_typed::<Vec<Commit>>(&key) {
        return Ok(commit_list_markdown(&location, &cached));
    }
    let commits = context
        .client
        .list_commits(&location, revision.as_deref())
        .await
        .map_err(|e| {
            anyhow::anyhow!(describe_api_error("list_commits", &location.full_name(), &e))
        })?;
    context.cache.set_typed(key, &commits, ttl::COMMIT_LIST);
    Ok(commit_list_markdown(&location, &commits))
}

/// Raw file content at a revision, fenced for display. Never cached; file
/// contents can be large and revisions are already precise. Without a
/// revision the repository's main branch is used.
pub async fn get_file_content(
    context: &ServerContext,
    location: RepositoryLocation,
    revision: Option<String>,
    file_path: String,
) -> Result<MarkdownContent> {
    let revision = match revision {
        Some(revision) => revision,
        None => {
            let repository = cached_repository(context, &location).await?;
            repository
                .main_branch
                .map(|branch| branch.0)
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "{} has no main branch; pass an explicit revision",
                        location.full_name()
                    )
                })?
        }
    };
    let content = context
        .client
        .get_file_content(&location, &revision, &file_path)
        .await
        .map_err(|e| {
            anyhow::anyhow!(describe_api_error(
                "get_file_content",
                &format!("{}:{}@{}", location.full_name(), file_path, revision),
                &e
            ))
        })?;

    let mut body = format!(
        "## File: {} @ {}\n\n```\n",
        file_path, revision
    );
    body.push_str(&content);
    if !content.ends_with('\n') {
        body.push('\n');
    }
    body.push_str("```\n");
    Ok(MarkdownContent(body))
}
