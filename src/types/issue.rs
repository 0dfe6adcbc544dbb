//! Issue tracker domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::repository::RepositoryLocation;

/// Wrapper type for issue ids providing type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueId(pub u64);

impl IssueId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for IssueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One issue as returned by the issue tracker endpoints.
///
/// State, kind, and priority are kept as the API's plain strings; the issue
/// tracker is configurable per repository so a closed enum would reject
/// legitimate custom values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitbucketIssue {
    pub location: RepositoryLocation,
    pub id: IssueId,
    pub title: String,
    pub content: Option<String>,
    pub state: String,
    pub kind: Option<String>,
    pub priority: Option<String>,
    pub reporter: Option<String>,
    pub assignee: Option<String>,
    pub created_on: Option<DateTime<Utc>>,
    pub updated_on: Option<DateTime<Utc>>,
}
