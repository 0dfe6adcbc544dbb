//! Line-level post-filters for diff text
//!
//! Two independent, opt-in transforms applied after diff text is obtained
//! and before it is returned. When both are requested, whitespace
//! suppression runs first and context trimming operates on its output.

/// Drops `+`/`-` content lines whose payload is empty or whitespace-only.
///
/// File-pair headers, `+++`/`---` marker lines, and hunk headers always pass
/// through; the transform is idempotent.
pub fn strip_whitespace_only_changes(diff: &str) -> String {
    let kept: Vec<&str> = diff
        .lines()
        .filter(|line| {
            let is_change_line = (line.starts_with('+') && !line.starts_with("+++"))
                || (line.starts_with('-') && !line.starts_with("---"));
            if !is_change_line {
                return true;
            }
            !line[1..].trim().is_empty()
        })
        .collect();
    rejoin(diff, kept)
}

/// Keeps at most `max_context` unchanged lines after each change within a
/// hunk. Change lines always survive and reset the counter; lines outside
/// any hunk and header lines pass through untouched.
pub fn trim_context_lines(diff: &str, max_context: u32) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut in_hunk = false;
    let mut trailing_context = 0u32;

    for line in diff.lines() {
        if line.starts_with("@@") {
            in_hunk = true;
            trailing_context = 0;
            kept.push(line);
            continue;
        }
        if line.starts_with("diff --git") {
            in_hunk = false;
            kept.push(line);
            continue;
        }
        if !in_hunk {
            kept.push(line);
            continue;
        }
        let is_change_line = (line.starts_with('+') && !line.starts_with("+++"))
            || (line.starts_with('-') && !line.starts_with("---"));
        if is_change_line {
            trailing_context = 0;
            kept.push(line);
        } else if trailing_context < max_context {
            trailing_context += 1;
            kept.push(line);
        }
    }
    rejoin(diff, kept)
}

/// Applies the requested post-filters in their fixed composition order
pub fn apply_post_filters(diff: &str, ignore_whitespace: bool, context_lines: Option<u32>) -> String {
    let mut result = if ignore_whitespace {
        strip_whitespace_only_changes(diff)
    } else {
        diff.to_string()
    };
    if let Some(max_context) = context_lines {
        result = trim_context_lines(&result, max_context);
    }
    result
}

fn rejoin(original: &str, lines: Vec<&str>) -> String {
    let mut joined = lines.join("\n");
    if original.ends_with('\n') && !joined.is_empty() {
        joined.push('\n');
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIFF: &str = "\
diff --git a/src/lib.rs b/src/lib.rs
index 1..2 100644
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1,8 +1,8 @@
 use std::fmt;

-fn old() {}
+fn new() {}
+
 line after one
 line after two
 line after three
 line after four
";

    #[test]
    fn test_whitespace_suppression_drops_blank_changes() {
        let filtered = strip_whitespace_only_changes(DIFF);
        assert!(filtered.contains("+fn new() {}"));
        assert!(filtered.contains("-fn old() {}"));
        // The bare "+" line is gone
        assert!(!filtered.lines().any(|l| l == "+"));
        // Unchanged context (including the empty context line) survives
        assert!(filtered.lines().any(|l| l.trim().is_empty()));
    }

    #[test]
    fn test_whitespace_suppression_keeps_headers() {
        let filtered = strip_whitespace_only_changes(DIFF);
        assert!(filtered.contains("diff --git a/src/lib.rs b/src/lib.rs"));
        assert!(filtered.contains("--- a/src/lib.rs"));
        assert!(filtered.contains("+++ b/src/lib.rs"));
        assert!(filtered.contains("@@ -1,8 +1,8 @@"));
    }

    #[test]
    fn test_whitespace_suppression_idempotent() {
        let once = strip_whitespace_only_changes(DIFF);
        let twice = strip_whitespace_only_changes(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_context_trimming_zero_keeps_no_trailing_context() {
        let trimmed = trim_context_lines(DIFF, 0);
        assert!(trimmed.contains("+fn new() {}"));
        assert!(!trimmed.contains("line after one"));
        // Leading context before the first change is also dropped at N=0
        assert!(!trimmed.contains("use std::fmt;"));
    }

    #[test]
    fn test_context_trimming_keeps_first_n_after_change() {
        let trimmed = trim_context_lines(DIFF, 2);
        assert!(trimmed.contains("line after one"));
        assert!(trimmed.contains("line after two"));
        assert!(!trimmed.contains("line after three"));
    }

    #[test]
    fn test_context_trimming_large_n_keeps_everything() {
        let trimmed = trim_context_lines(DIFF, 10);
        for line in DIFF.lines() {
            assert!(trimmed.contains(line));
        }
    }

    #[test]
    fn test_headers_pass_through_trimming() {
        let trimmed = trim_context_lines(DIFF, 0);
        assert!(trimmed.contains("diff --git"));
        assert!(trimmed.contains("@@ -1,8 +1,8 @@"));
        assert!(trimmed.contains("index 1..2 100644"));
    }

    #[test]
    fn test_filters_compose_whitespace_first() {
        let composed = apply_post_filters(DIFF, true, Some(0));
        // The "+"-only line was removed by the whitespace pass, so it cannot
        // reset the context counter for the trimming pass
        assert!(composed.contains("+fn new() {}"));
        assert!(!composed.lines().any(|l| l == "+"));
        assert!(!composed.contains("line after one"));
    }

    #[test]
    fn test_no_filters_is_identity() {
        assert_eq!(apply_post_filters(DIFF, false, None), DIFF);
    }
}
