//! Repository domain types
//!
//! A Bitbucket repository is addressed by a workspace id plus a repository
//! slug. Both are supplied by the caller on every tool invocation; no session
//! object persists them.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Branch name wrapper for type safety
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Branch(pub String);

impl Branch {
    pub fn new<T: Into<String>>(branch: T) -> Self {
        Self(branch.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Branch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies one repository within a workspace.
///
/// Immutable once constructed; ordering is derived so locations can key a
/// `BTreeMap` when grouping results per repository.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub struct RepositoryLocation {
    pub workspace: String,
    pub repo_slug: String,
}

impl RepositoryLocation {
    pub fn new<W: Into<String>, S: Into<String>>(workspace: W, repo_slug: S) -> Self {
        Self {
            workspace: workspace.into(),
            repo_slug: repo_slug.into(),
        }
    }

    /// Returns `workspace/repo_slug`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.workspace, self.repo_slug)
    }

    /// Returns the web UI URL of the repository
    pub fn url(&self) -> String {
        format!("https://bitbucket.org/{}/{}", self.workspace, self.repo_slug)
    }
}

impl std::fmt::Display for RepositoryLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

/// One branch of a repository with its head commit hash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryBranch {
    pub name: Branch,
    pub target_hash: Option<String>,
}

/// Repository metadata as returned by the repository endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitbucketRepository {
    pub location: RepositoryLocation,
    pub name: String,
    pub description: Option<String>,
    pub is_private: bool,
    pub main_branch: Option<Branch>,
    pub language: Option<String>,
    pub updated_on: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_location_full_name() {
        let location = RepositoryLocation::new("acme", "widget-service");
        assert_eq!(location.full_name(), "acme/widget-service");
        assert_eq!(location.url(), "https://bitbucket.org/acme/widget-service");
    }
}
