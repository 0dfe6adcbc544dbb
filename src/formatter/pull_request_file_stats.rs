use crate::types::{FileChangeStat, PullRequestRef};

use super::MarkdownContent;

/// Format per-file change statistics of a pull request into markdown.
///
/// Renders a summary line followed by a table with one row per changed file.
/// Renamed files show both paths.
pub fn pull_request_file_stats_markdown(
    pr: &PullRequestRef,
    files: &[FileChangeStat],
) -> MarkdownContent {
    let mut content = String::new();

    content.push_str(&format!("## Pull Request Files: {}\n\n", pr));

    if files.is_empty() {
        content.push_str("No files changed.\n");
        return MarkdownContent(content);
    }

    let total_additions: u32 = files.iter().map(|f| f.added_lines).sum();
    let total_removals: u32 = files.iter().map(|f| f.removed_lines).sum();

    content.push_str(&format!(
        "**Summary:** {} file(s) changed, +{} additions, -{} deletions\n\n",
        files.len(),
        total_additions,
        total_removals
    ));

    content.push_str("| File | Change | Additions | Deletions |\n");
    content.push_str("|------|--------|-----------|----------|\n");

    for file in files {
        let path = match (&file.old_path, &file.new_path) {
            (Some(old), Some(new)) if old != new => format!("{} → {}", old, new),
            _ => file.display_path().to_string(),
        };
        content.push_str(&format!(
            "| {} | {} | +{} | -{} |\n",
            path, file.kind, file.added_lines, file.removed_lines
        ));
    }

    content.push('\n');

    MarkdownContent(content)
}
