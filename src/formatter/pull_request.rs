use crate::types::{BitbucketPullRequest, RepositoryLocation};

use super::{MarkdownContent, format_datetime};

/// Format full pull request metadata into markdown
pub fn pull_request_body_markdown(pull_request: &BitbucketPullRequest) -> MarkdownContent {
    let mut content = String::new();

    content.push_str(&format!(
        "## Pull Request #{}: {}\n\n",
        pull_request.pull_request_ref.id, pull_request.title
    ));
    content.push_str(&format!("**URL**: {}\n", pull_request.pull_request_ref.url()));
    content.push_str(&format!("**State**: {}\n", pull_request.state));
    if let Some(author) = &pull_request.author {
        content.push_str(&format!("**Author**: {}\n", author));
    }
    content.push_str(&format!(
        "**Source**: `{}` → **Destination**: `{}`\n",
        pull_request.source.branch, pull_request.destination.branch
    ));
    content.push_str(&format!(
        "**Created**: {}\n",
        format_datetime(pull_request.created_on)
    ));
    content.push_str(&format!(
        "**Updated**: {}\n",
        format_datetime(pull_request.updated_on)
    ));
    if let Some(comment_count) = pull_request.comment_count {
        content.push_str(&format!("**Comments**: {}\n", comment_count));
    }

    if let Some(description) = &pull_request.description {
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

/// Format a pull request listing into markdown, one line per pull request
pub fn pull_request_list_markdown(
    location: &RepositoryLocation,
    pull_requests: &[BitbucketPullRequest],
) -> MarkdownContent {
    let mut content = String::new();

    content.push_str(&format!("## Pull Requests: {}\n\n", location.full_name()));

    if pull_requests.is_empty() {
        content.push_str("No pull requests found.\n");
        return MarkdownContent(content);
    }

    for pull_request in pull_requests {
        let author = pull_request.author.as_deref().unwrap_or("(unknown)");
        content.push_str(&format!(
            "- #{} [{}] {} (by {}, `{}` → `{}`)\n",
            pull_request.pull_request_ref.id,
            pull_request.state,
            pull_request.title,
            author,
            pull_request.source.branch,
            pull_request.destination.branch
        ));
    }

    MarkdownContent(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BranchHead, PullRequestId, PullRequestRef, PullRequestState};

    fn pull_request(id: u64, title: &str) -> BitbucketPullRequest {
        BitbucketPullRequest {
            pull_request_ref: PullRequestRef::new(
                RepositoryLocation::new("acme", "widget-service"),
                PullRequestId::new(id),
            ),
            title: title.to_string(),
            description: Some("Adds a limiter.".to_string()),
            state: PullRequestState::Open,
            author: Some("Dana Developer".to_string()),
            source: BranchHead::new("rate-limit", Some("aaa".to_string())),
            destination: BranchHead::new("main", Some("bbb".to_string())),
            created_on: None,
            updated_on: None,
            comment_count: Some(4),
        }
    }

    #[test]
    fn test_pull_request_body_markdown() {
        let result = pull_request_body_markdown(&pull_request(12, "Add rate limiting"));

        assert!(result.0.contains("## Pull Request #12: Add rate limiting"));
        assert!(result.0.contains("**State**: OPEN"));
        assert!(result.0.contains("**Author**: Dana Developer"));
        assert!(result.0.contains("`rate-limit` → **Destination**: `main`"));
        assert!(result.0.contains("**Comments**: 4"));
        assert!(result.0.contains("### Description\n\nAdds a limiter."));
    }

    #[test]
    fn test_pull_request_list_markdown() {
        let location = RepositoryLocation::new("acme", "widget-service");
        let list = vec![pull_request(1, "First"), pull_request(2, "Second")];

        let result = pull_request_list_markdown(&location, &list);

        assert!(result.0.contains("## Pull Requests: acme/widget-service"));
        assert!(result.0.contains("- #1 [OPEN] First"));
        assert!(result.0.contains("- #2 [OPEN] Second"));
    }

    #[test]
    fn test_pull_request_list_markdown_empty() {
        let location = RepositoryLocation::new("acme", "widget-service");
        let result = pull_request_list_markdown(&location, &[]);
        assert!(result.0.contains("No pull requests found."));
    }
}
