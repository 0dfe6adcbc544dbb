//! Diff domain types
//!
//! Unified-diff text is the canonical intermediate representation threaded
//! between the fetch, extraction, parsing, and filtering stages. It is kept
//! as opaque text; structure is recomputed from it where needed instead of
//! being cached as a parsed tree.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Classification of one file's change within a diff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ChangeKind {
    /// File newly added
    Added,
    /// File deleted
    Removed,
    /// File content changed, path unchanged
    Modified,
    /// Old and new paths differ; inferred from the header only, there is no
    /// rename-similarity detection
    Renamed,
}

/// One file's change summary derived from unified-diff text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChangeStat {
    /// Absent if the file was newly added
    pub old_path: Option<String>,
    /// Absent if the file was removed
    pub new_path: Option<String>,
    pub kind: ChangeKind,
    pub added_lines: u32,
    pub removed_lines: u32,
}

impl FileChangeStat {
    /// Path to show for this entry, preferring the post-change path
    pub fn display_path(&self) -> &str {
        self.new_path
            .as_deref()
            .or(self.old_path.as_deref())
            .unwrap_or("(unknown)")
    }

    /// Total changed lines, used for sorting the too-large summary
    pub fn total_changed_lines(&self) -> u32 {
        self.added_lines + self.removed_lines
    }
}

/// Outcome of pull request diff retrieval.
///
/// Limited access is a common, expected result for reviewers without full
/// permissions, so it is modeled as a successful outcome carrying guidance
/// text rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOutcome {
    /// Unified diff text obtained from one of the retrieval strategies
    Content(String),
    /// Every strategy failed; human-readable explanation with remediation steps
    LimitedAccess(String),
}

impl DiffOutcome {
    pub fn content(&self) -> Option<&str> {
        match self {
            DiffOutcome::Content(text) => Some(text),
            DiffOutcome::LimitedAccess(_) => None,
        }
    }
}
