use crate::types::PullRequestRef;

use super::MarkdownContent;

/// Format a pull request diff into markdown.
///
/// The diff is rendered inside a ```diff code block under a header naming
/// the repository and pull request.
pub fn pull_request_diff_markdown(pr: &PullRequestRef, diff: &str) -> MarkdownContent {
    let mut content = String::new();

    content.push_str(&format!("## Pull Request Diff: {}\n\n", pr));

    content.push_str("```diff\n");
    content.push_str(diff);
    if !diff.ends_with('\n') {
        content.push('\n');
    }
    content.push_str("```\n");

    MarkdownContent(content)
}

/// Format a file-scoped pull request diff into markdown
pub fn pull_request_file_diff_markdown(
    pr: &PullRequestRef,
    file_path: &str,
    diff: &str,
) -> MarkdownContent {
    let mut content = String::new();

    content.push_str(&format!("## Pull Request Diff: {} ({})\n\n", pr, file_path));

    content.push_str("```diff\n");
    content.push_str(diff);
    if !diff.ends_with('\n') {
        content.push('\n');
    }
    content.push_str("```\n");

    MarkdownContent(content)
}

/// Message returned when the diff contains no section for the requested file
pub fn file_diff_no_changes_markdown(pr: &PullRequestRef, file_path: &str) -> MarkdownContent {
    MarkdownContent(format!(
        "## Pull Request Diff: {}\n\nNo changes found for file `{}` in this pull request.\n",
        pr, file_path
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PullRequestId, RepositoryLocation};

    fn pr_ref() -> PullRequestRef {
        PullRequestRef::new(
            RepositoryLocation::new("acme", "widget-service"),
            PullRequestId::new(123),
        )
    }

    #[test]
    fn test_pull_request_diff_markdown() {
        let diff = "diff --git a/file.txt b/file.txt\n--- a/file.txt\n+++ b/file.txt\n@@ -1 +1 @@\n-old\n+new";

        let result = pull_request_diff_markdown(&pr_ref(), diff);

        assert!(result.0.contains("## Pull Request Diff: acme/widget-service#123"));
        assert!(result.0.contains("```diff\n"));
        assert!(result.0.contains(diff));
        assert!(result.0.ends_with("```\n"));
    }

    #[test]
    fn test_pull_request_diff_markdown_with_trailing_newline() {
        let diff = "diff --git a/test.rs b/test.rs\n";

        let result = pull_request_diff_markdown(&pr_ref(), diff);

        // Should not have double newlines before closing code block
        assert!(!result.0.ends_with("\n\n```\n"));
        assert!(result.0.ends_with("\n```\n"));
    }

    #[test]
    fn test_file_diff_markdown_names_the_file() {
        let result = pull_request_file_diff_markdown(&pr_ref(), "src/main.rs", "+x\n");
        assert!(
            result
                .0
                .contains("## Pull Request Diff: acme/widget-service#123 (src/main.rs)")
        );
    }

    #[test]
    fn test_no_changes_message() {
        let result = file_diff_no_changes_markdown(&pr_ref(), "src/absent.rs");
        assert!(result.0.contains("No changes found for file `src/absent.rs`"));
    }
}
