use crate::types::{BitbucketRepository, Commit, RepositoryBranch, RepositoryLocation};

use super::{MarkdownContent, format_datetime};

/// Format repository metadata into markdown
pub fn repository_body_markdown(repository: &BitbucketRepository) -> MarkdownContent {
    let mut content = String::new();

    content.push_str(&format!("## Repository: {}\n\n", repository.location.full_name()));
    content.push_str(&format!("**URL**: {}\n", repository.location.url()));
    content.push_str(&format!(
        "**Visibility**: {}\n",
        if repository.is_private { "private" } else { "public" }
    ));
    if let Some(main_branch) = &repository.main_branch {
        content.push_str(&format!("**Main branch**: {}\n", main_branch));
    }
    if let Some(language) = &repository.language {
        content.push_str(&format!("**Language**: {}\n", language));
    }
    content.push_str(&format!(
        "**Updated**: {}\n",
        format_datetime(repository.updated_on)
    ));

    if let Some(description) = &repository.description {
        if !description.trim().is_empty() {
            content.push_str("\n### Description\n\n");
            content.push_str(description);
            if !description.ends_with('\n') {
                content.push('\n');
            }
        }
    }

    MarkdownContent(content)
}

/// Format a workspace repository listing into markdown
pub fn repository_list_markdown(
    workspace: &str,
    repositories: &[BitbucketRepository],
) -> MarkdownContent {
    let mut content = String::new();

    content.push_str(&format!("## Repositories in workspace `{}`\n\n", workspace));

    if repositories.is_empty() {
        content.push_str("No repositories found.\n");
        return MarkdownContent(content);
    }

    for repository in repositories {
        let description = repository
            .description
            .as_deref()
            .map(|d| d.lines().next().unwrap_or(""))
            .filter(|d| !d.trim().is_empty());
        match description {
            Some(description) => content.push_str(&format!(
                "- **{}**: {}\n",
                repository.location.full_name(),
                description
            )),
            None => content.push_str(&format!("- **{}**\n", repository.location.full_name())),
        }
    }

    MarkdownContent(content)
}

/// Format a branch listing into markdown
pub fn branch_list_markdown(
    location: &RepositoryLocation,
    branches: &[RepositoryBranch],
) -> MarkdownContent {
    let mut content = String::new();

    content.push_str(&format!("## Branches: {}\n\n", location.full_name()));

    if branches.is_empty() {
        content.push_str("No branches found.\n");
        return MarkdownContent(content);
    }

    for branch in branches {
        match &branch.target_hash {
            Some(hash) => {
                let end = hash.len().min(12);
                content.push_str(&format!("- `{}` ({})\n", branch.name, &hash[..end]));
            }
            None => content.push_str(&format!("- `{}`\n", branch.name)),
        }
    }

    MarkdownContent(content)
}

/// Format a commit listing into markdown, newest first as returned by the API
pub fn commit_list_markdown(location: &RepositoryLocation, commits: &[Commit]) -> MarkdownContent {
    let mut content = String::new();

    content.push_str(&format!("## Commits: {}\n\n", location.full_name()));

    if commits.is_empty() {
        content.push_str("No commits found.\n");
        return MarkdownContent(content);
    }

    for commit in commits {
        let author = commit.author.as_deref().unwrap_or("(unknown)");
        content.push_str(&format!(
            "- `{}` {} ({}, {})\n",
            commit.short_hash(),
            commit.summary(),
            author,
            format_datetime(commit.date)
        ));
    }

    MarkdownContent(content)
}
