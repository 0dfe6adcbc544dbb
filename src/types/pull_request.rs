//! Pull request domain types
//!
//! `PullRequestRef` identifies a pull request; `PullRequestSnapshot` carries
//! the metadata subset the diff fetcher needs to run its fallback chain.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use chrono::{DateTime, Utc};

use super::repository::RepositoryLocation;

/// Wrapper type for pull request ids providing type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct PullRequestId(pub u64);

impl PullRequestId {
    /// Create a new pull request id
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PullRequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Represents the state of a Bitbucket pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "UPPERCASE")] // Matches the REST API state strings
pub enum PullRequestState {
    /// Pull request is open
    #[strum(serialize = "OPEN")]
    Open,
    /// Pull request is merged
    #[strum(serialize = "MERGED")]
    Merged,
    /// Pull request is declined without merging
    #[strum(serialize = "DECLINED")]
    Declined,
    /// Pull request was superseded by another pull request
    #[strum(serialize = "SUPERSEDED")]
    Superseded,
}

/// Identifies a pull request: workspace, repository slug, numeric id.
///
/// Immutable once constructed and supplied by the caller on every operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PullRequestRef {
    pub location: RepositoryLocation,
    pub id: PullRequestId,
}

impl PullRequestRef {
    /// Create new pull request reference
    pub fn new(location: RepositoryLocation, id: PullRequestId) -> Self {
        Self { location, id }
    }

    /// Returns the pull request web URL
    pub fn url(&self) -> String {
        format!("{}/pull-requests/{}", self.location.url(), self.id)
    }
}

impl std::fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.location.full_name(), self.id)
    }
}

/// One side of a pull request: branch name plus optional head commit hash.
///
/// The commit hash is optional because the REST API omits it for pull
/// requests whose source repository has been deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchHead {
    pub branch: String,
    pub commit_hash: Option<String>,
}

impl BranchHead {
    pub fn new<B: Into<String>>(branch: B, commit_hash: Option<String>) -> Self {
        Self {
            branch: branch.into(),
            commit_hash,
        }
    }
}

/// The subset of pull request metadata needed for diff resolution.
///
/// Fetched fresh (through the cache) each time a diff operation needs commit
/// hashes; never mutated, only re-fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestSnapshot {
    pub title: String,
    pub state: PullRequestState,
    pub author: Option<String>,
    pub source: BranchHead,
    pub destination: BranchHead,
}

/// Full pull request metadata as returned by the pull request endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitbucketPullRequest {
    pub pull_request_ref: PullRequestRef,
    pub title: String,
    pub description: Option<String>,
    pub state: PullRequestState,
    pub author: Option<String>,
    pub source: BranchHead,
    pub destination: BranchHead,
    pub created_on: Option<DateTime<Utc>>,
    pub updated_on: Option<DateTime<Utc>>,
    pub comment_count: Option<u32>,
}

impl BitbucketPullRequest {
    /// Projects the metadata subset the diff fetcher operates on
    pub fn snapshot(&self) -> PullRequestSnapshot {
        PullRequestSnapshot {
            title: self.title.clone(),
            state: self.state,
            author: self.author.clone(),
            source: self.source.clone(),
            destination: self.destination.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_request_state_round_trip() {
        assert_eq!("OPEN".parse::<PullRequestState>().unwrap(), PullRequestState::Open);
        assert_eq!(PullRequestState::Declined.to_string(), "DECLINED");
        assert_eq!(
            "SUPERSEDED".parse::<PullRequestState>().unwrap(),
            PullRequestState::Superseded
        );
    }

    #[test]
    fn test_pull_request_ref_display() {
        let pr = PullRequestRef::new(
            RepositoryLocation::new("acme", "widget-service"),
            PullRequestId::new(42),
        );
        assert_eq!(pr.to_string(), "acme/widget-service#42");
        assert_eq!(
            pr.url(),
            "https://bitbucket.org/acme/widget-service/pull-requests/42"
        );
    }
}
