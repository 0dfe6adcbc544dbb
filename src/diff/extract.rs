//! File-scoped extraction from multi-file diff text
//!
//! Isolates the section(s) of one file out of a full diff. Path matching is
//! deliberately lenient (slash-normalized equality, suffix, containment in
//! either direction) because callers and the upstream rarely agree on path
//! prefixes. When the full-path heuristics find nothing, a second pass
//! matches only the file's base name against each header line.

use super::parser::FILE_HEADER_RE;

/// Returns the block(s) of `diff` belonging to `file_path`, or `None` when
/// no header matches under either pass. Multiple matching blocks are
/// concatenated in encounter order, separated by a blank line.
pub fn extract_file_diff(diff: &str, file_path: &str) -> Option<String> {
    let by_path = collect_blocks(diff, |old, new, _header| {
        path_matches(old, file_path) || path_matches(new, file_path)
    });
    if by_path.is_some() {
        return by_path;
    }

    // Second, more permissive pass: base name against the raw header line
    let base_name = file_path.rsplit('/').next().unwrap_or(file_path);
    if base_name.is_empty() {
        return None;
    }
    collect_blocks(diff, |_old, _new, header| header.contains(base_name))
}

fn collect_blocks<F>(diff: &str, mut is_target: F) -> Option<String>
where
    F: FnMut(&str, &str, &str) -> bool,
{
    let mut blocks: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut in_target = false;

    for line in diff.lines() {
        if let Some(captures) = FILE_HEADER_RE.captures(line) {
            if in_target {
                push_block(&mut blocks, &mut current);
            }
            current = vec![line];
            let old = captures.get(1).map_or("", |m| m.as_str());
            let new = captures.get(2).map_or("", |m| m.as_str());
            in_target = is_target(old, new, line);
        } else {
            current.push(line);
        }
    }
    if in_target {
        push_block(&mut blocks, &mut current);
    }

    if blocks.is_empty() {
        None
    } else {
        Some(blocks.join("\n\n"))
    }
}

/// Pushes the accumulated block, dropping trailing blank lines first.
/// Blank lines between blocks belong to the join separator, not the block,
/// so re-extracting from extracted output reproduces it exactly.
fn push_block(blocks: &mut Vec<String>, current: &mut Vec<&str>) {
    while current.last().is_some_and(|line| line.is_empty()) {
        current.pop();
    }
    if !current.is_empty() {
        blocks.push(current.join("\n"));
    }
}

/// Lenient path comparison: exact equality after trimming slashes, suffix
/// relation, or substring containment in either direction
fn path_matches(candidate: &str, target: &str) -> bool {
    let candidate = candidate.trim_matches('/');
    let target = target.trim_matches('/');
    if candidate.is_empty() || target.is_empty() {
        return false;
    }
    candidate == target
        || candidate.ends_with(&format!("/{}", target))
        || target.ends_with(&format!("/{}", candidate))
        || candidate.contains(target)
        || target.contains(candidate)
}
