//! Per-file change statistics from raw unified-diff text
//!
//! Used when the structured diffstat endpoint is unavailable and the stats
//! must be reconstructed from whatever diff text the fallback chain produced.
//! Only file-pair header lines, file-mode marker lines, and the leading
//! character of content lines matter; hunk boundaries and line offsets are
//! not modeled.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{ChangeKind, FileChangeStat};

/// `diff --git a/<old> b/<new>` file-pair header
pub(crate) static FILE_HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^diff --git a/(.*) b/(.*)$").expect("Failed to compile diff header regex")
});

/// Derives one `FileChangeStat` per file-pair header, in appearance order.
///
/// A `+` line (not `+++`) increments the added count, a `-` line (not `---`)
/// the removed count. `new file mode` reclassifies the current record as
/// added and clears its old path; `deleted file mode` reclassifies as removed
/// and clears its new path. Unparseable input degrades to an empty result.
pub fn parse_change_stats(diff: &str) -> Vec<FileChangeStat> {
    let mut stats = Vec::new();
    let mut current: Option<FileChangeStat> = None;

    for line in diff.lines() {
        if let Some(captures) = FILE_HEADER_RE.captures(line) {
            if let Some(finished) = current.take() {
                stats.push(finished);
            }
            let old_path = captures[1].to_string();
            let new_path = captures[2].to_string();
            let kind = if old_path == new_path {
                ChangeKind::Modified
            } else {
                ChangeKind::Renamed
            };
            current = Some(FileChangeStat {
                old_path: Some(old_path),
                new_path: Some(new_path),
                kind,
                added_lines: 0,
                removed_lines: 0,
            });
            continue;
        }

        let Some(record) = current.as_mut() else {
            continue;
        };

        if line.starts_with("new file mode") {
            record.kind = ChangeKind::Added;
            record.old_path = None;
        } else if line.starts_with("deleted file mode") {
            record.kind = ChangeKind::Removed;
            record.new_path = None;
        } else if line.starts_with('+') && !line.starts_with("+++") {
            record.added_lines += 1;
        } else if line.starts_with('-') && !line.starts_with("---") {
            record.removed_lines += 1;
        }
    }

    if let Some(finished) = current.take() {
        stats.push(finished);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODIFIED_DIFF: &str = "\
diff --git a/src/main.rs b/src/main.rs
index 1111111..2222222 100644
--- a/src/main.rs
+++ b/src/main.rs
@@ -1,4 +1,5 @@
 fn main() {
-    println!(\"old\");
+    println!(\"new\");
+    println!(\"extra\");
 }
";

    #[test]
    fn test_modified_file_counts() {
        let stats = parse_change_stats(MODIFIED_DIFF);
        assert_eq!(stats.len(), 1);
        let stat = &stats[0];
        assert_eq!(stat.kind, ChangeKind::Modified);
        assert_eq!(stat.old_path.as_deref(), Some("src/main.rs"));
        assert_eq!(stat.new_path.as_deref(), Some("src/main.rs"));
        assert_eq!(stat.added_lines, 2);
        assert_eq!(stat.removed_lines, 1);
    }

    #[test]
    fn test_new_file_clears_old_path() {
        let diff = "\
diff --git a/docs/notes.txt b/docs/notes.txt
new file mode 100644
index 0000000..3333333
--- /dev/null
+++ b/docs/notes.txt
@@ -0,0 +1,2 @@
+first
+second
";
        let stats = parse_change_stats(diff);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].kind, ChangeKind::Added);
        assert_eq!(stats[0].old_path, None);
        assert_eq!(stats[0].new_path.as_deref(), Some("docs/notes.txt"));
        assert_eq!(stats[0].added_lines, 2);
        assert_eq!(stats[0].removed_lines, 0);
    }

    #[test]
    fn test_deleted_file_clears_new_path() {
        let diff = "\
diff --git a/old.cfg b/old.cfg
deleted file mode 100644
index 4444444..0000000
--- a/old.cfg
+++ /dev/null
@@ -1,2 +0,0 @@
-one
-two
";
        let stats = parse_change_stats(diff);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].kind, ChangeKind::Removed);
        assert_eq!(stats[0].new_path, None);
        assert_eq!(stats[0].old_path.as_deref(), Some("old.cfg"));
        assert_eq!(stats[0].removed_lines, 2);
    }

    #[test]
    fn test_rename_inferred_from_differing_paths() {
        let diff = "\
diff --git a/src/old_name.rs b/src/new_name.rs
similarity index 95%
rename from src/old_name.rs
rename to src/new_name.rs
";
        let stats = parse_change_stats(diff);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].kind, ChangeKind::Renamed);
        assert_eq!(stats[0].old_path.as_deref(), Some("src/old_name.rs"));
        assert_eq!(stats[0].new_path.as_deref(), Some("src/new_name.rs"));
    }

    #[test]
    fn test_one_record_per_header_in_order() {
        let diff = format!(
            "{}diff --git a/b.txt b/b.txt\nindex 5..6 100644\n--- a/b.txt\n+++ b/b.txt\n@@ -1 +1 @@\n-x\n+y\n",
            MODIFIED_DIFF
        );
        let stats = parse_change_stats(&diff);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].new_path.as_deref(), Some("src/main.rs"));
        assert_eq!(stats[1].new_path.as_deref(), Some("b.txt"));
    }

    #[test]
    fn test_header_marker_lines_do_not_count() {
        let stats = parse_change_stats(MODIFIED_DIFF);
        // The --- / +++ lines above must not have been counted
        assert_eq!(stats[0].added_lines + stats[0].removed_lines, 3);
    }

    #[test]
    fn test_empty_and_garbage_input() {
        assert!(parse_change_stats("").is_empty());
        assert!(parse_change_stats("not a diff at all\n+++ stray\n").is_empty());
    }
}
