use crate::types::{BitbucketIssue, RepositoryLocation};

use super::{MarkdownContent, format_datetime};

/// Format full issue metadata into markdown
pub fn issue_body_markdown(issue: &BitbucketIssue) -> MarkdownContent {
    let mut content = String::new();

    content.push_str(&format!("## Issue #{}: {}\n\n", issue.id, issue.title));
    content.push_str(&format!(
        "**URL**: {}/issues/{}\n",
        issue.location.url(),
        issue.id
    ));
    content.push_str(&format!("**State**: {}\n", issue.state));
    if let Some(kind) = &issue.kind {
        content.push_str(&format!("**Kind**: {}\n", kind));
    }
    if let Some(priority) = &issue.priority {
        content.push_str(&format!("**Priority**: {}\n", priority));
    }
    if let Some(reporter) = &issue.reporter {
        content.push_str(&format!("**Reporter**: {}\n", reporter));
    }
    if let Some(assignee) = &issue.assignee {
        content.push_str(&format!("**Assignee**: {}\n", assignee));
    }
    content.push_str(&format!("**Created**: {}\n", format_datetime(issue.created_on)));
    content.push_str(&format!("**Updated**: {}\n", format_datetime(issue.updated_on)));

    if let Some(body) = &issue.content {
        if !body.trim().is_empty() {
            content.push_str("\n### Content\n\n");
            content.push_str(body);
            if !body.ends_with('\n') {
                content.push('\n');
            }
        }
    }

    MarkdownContent(content)
}

/// Format an issue listing into markdown, one line per issue
pub fn issue_list_markdown(
    location: &RepositoryLocation,
    issues: &[BitbucketIssue],
) -> MarkdownContent {
    let mut content = String::new();

    content.push_str(&format!("## Issues: {}\n\n", location.full_name()));

    if issues.is_empty() {
        content.push_str("No issues found.\n");
        return MarkdownContent(content);
    }

    for issue in issues {
        let kind = issue.kind.as_deref().unwrap_or("issue");
        content.push_str(&format!(
            "- #{} [{}] {} ({})\n",
            issue.id, issue.state, issue.title, kind
        ));
    }

    MarkdownContent(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IssueId;

    fn issue(id: u64, title: &str) -> BitbucketIssue {
        BitbucketIssue {
            location: RepositoryLocation::new("acme", "widget-service"),
            id: IssueId::new(id),
            title: title.to_string(),
            content: Some("Steps to reproduce.".to_string()),
            state: "open".to_string(),
            kind: Some("bug".to_string()),
            priority: Some("major".to_string()),
            reporter: Some("Dana".to_string()),
            assignee: None,
            created_on: None,
            updated_on: None,
        }
    }

    #[test]
    fn test_issue_body_markdown() {
        let result = issue_body_markdown(&issue(5, "Timeout on large diff"));

        assert!(result.0.contains("## Issue #5: Timeout on large diff"));
        assert!(result.0.contains("**State**: open"));
        assert!(result.0.contains("**Kind**: bug"));
        assert!(result.0.contains("**Priority**: major"));
        assert!(
            result
                .0
                .contains("**URL**: https://bitbucket.org/acme/widget-service/issues/5")
        );
        assert!(result.0.contains("### Content\n\nSteps to reproduce."));
    }

    #[test]
    fn test_issue_list_markdown() {
        let location = RepositoryLocation::new("acme", "widget-service");
        let result = issue_list_markdown(&location, &[issue(1, "First"), issue(2, "Second")]);

        assert!(result.0.contains("## Issues: acme/widget-service"));
        assert!(result.0.contains("- #1 [open] First (bug)"));
        assert!(result.0.contains("- #2 [open] Second (bug)"));
    }

    #[test]
    fn test_issue_list_markdown_empty() {
        let location = RepositoryLocation::new("acme", "widget-service");
        let result = issue_list_markdown(&location, &[]);
        assert!(result.0.contains("No issues found."));
    }
}
