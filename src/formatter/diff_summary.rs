use crate::types::{FileChangeStat, PullRequestRef};

use super::MarkdownContent;

// Files called out individually at the top of the summary
const HIGHLIGHT_COUNT: usize = 5;
// Rows shown in the per-file table before the remainder is collapsed
const LISTED_FILE_COUNT: usize = 10;

/// Summary returned instead of diff content when the diff exceeds the
/// caller's size budget.
///
/// Lists the most-changed files so the caller can follow up with a
/// file-scoped request, plus the estimated and allowed token counts.
pub fn diff_too_large_markdown(
    pr: &PullRequestRef,
    stats: &[FileChangeStat],
    estimated_tokens: u64,
    max_tokens: u64,
) -> MarkdownContent {
    let mut content = String::new();

    content.push_str(&format!("## Pull Request Diff: {}\n\n", pr));
    content.push_str(&format!(
        "The diff is too large to return in full: approximately {} tokens \
         against a limit of {}.\n\n",
        estimated_tokens, max_tokens
    ));

    let mut sorted: Vec<&FileChangeStat> = stats.iter().collect();
    sorted.sort_by(|a, b| b.total_changed_lines().cmp(&a.total_changed_lines()));

    if !sorted.is_empty() {
        content.push_str(&format!("**{} file(s) changed.** ", sorted.len()));
        content.push_str("Largest changes:\n\n");

        for file in sorted.iter().take(HIGHLIGHT_COUNT) {
            content.push_str(&format!(
                "- **{}** (+{} / -{})\n",
                file.display_path(),
                file.added_lines,
                file.removed_lines
            ));
        }
        content.push('\n');

        if sorted.len() > HIGHLIGHT_COUNT {
            content.push_str("| File | Change | Additions | Deletions |\n");
            content.push_str("|------|--------|-----------|----------|\n");
            for file in sorted.iter().take(LISTED_FILE_COUNT) {
                content.push_str(&format!(
                    "| {} | {} | +{} | -{} |\n",
                    file.display_path(),
                    file.kind,
                    file.added_lines,
                    file.removed_lines
                ));
            }
            if sorted.len() > LISTED_FILE_COUNT {
                content.push_str(&format!(
                    "\n*{} more file(s) not listed*\n",
                    sorted.len() - LISTED_FILE_COUNT
                ));
            }
            content.push('\n');
        }
    }

    content.push_str(
        "What you can do:\n\
         - Request a single file with the `file_path` parameter\n\
         - Reduce the diff with `ignore_whitespace` or a smaller `context_lines`\n\
         - Raise the `max_size` parameter if your context window allows it\n",
    );

    MarkdownContent(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChangeKind, PullRequestId, RepositoryLocation};

    fn pr_ref() -> PullRequestRef {
        PullRequestRef::new(
            RepositoryLocation::new("acme", "widget-service"),
            PullRequestId::new(7),
        )
    }

    fn stat(path: &str, added: u32, removed: u32) -> FileChangeStat {
        FileChangeStat {
            old_path: Some(path.to_string()),
            new_path: Some(path.to_string()),
            kind: ChangeKind::Modified,
            added_lines: added,
            removed_lines: removed,
        }
    }

    #[test]
    fn test_summary_sorted_by_change_size() {
        let stats = vec![
            stat("small.rs", 1, 1),
            stat("huge.rs", 500, 300),
            stat("medium.rs", 40, 10),
        ];

        let result = diff_too_large_markdown(&pr_ref(), &stats, 50_000, 10_000);

        assert!(result.0.contains("approximately 50000 tokens"));
        assert!(result.0.contains("limit of 10000"));
        let huge = result.0.find("huge.rs").unwrap();
        let medium = result.0.find("medium.rs").unwrap();
        assert!(huge < medium);
        assert!(result.0.contains("3 file(s) changed"));
    }

    #[test]
    fn test_summary_collapses_long_file_lists() {
        let stats: Vec<FileChangeStat> = (0..14)
            .map(|i| stat(&format!("src/file_{i}.rs"), 14 - i, 0))
            .collect();

        let result = diff_too_large_markdown(&pr_ref(), &stats, 90_000, 20_000);

        assert!(result.0.contains("14 file(s) changed"));
        assert!(result.0.contains("| src/file_9.rs |"));
        assert!(!result.0.contains("| src/file_10.rs |"));
        assert!(result.0.contains("*4 more file(s) not listed*"));
    }

    #[test]
    fn test_summary_suggests_file_scoped_follow_up() {
        let result = diff_too_large_markdown(&pr_ref(), &[stat("a.rs", 9, 9)], 30_000, 10_000);
        assert!(result.0.contains("`file_path`"));
        assert!(result.0.contains("`max_size`"));
        assert!(result.0.contains("`ignore_whitespace`"));
    }

    #[test]
    fn test_summary_without_stats_still_has_guidance() {
        let result = diff_too_large_markdown(&pr_ref(), &[], 30_000, 10_000);
        assert!(result.0.contains("too large"));
        assert!(result.0.contains("`file_path`"));
    }
}
