//! Serde types matching the Bitbucket Cloud 2.0 REST wire format
//!
//! These structs mirror the JSON shapes the API returns and are converted
//! into the domain types in `crate::types` immediately after decoding. Only
//! the fields this crate consumes are declared; serde ignores the rest.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::bitbucket::error::ApiError;
use crate::types::{
    BitbucketIssue, BitbucketPullRequest, BitbucketRepository, Branch, BranchHead, ChangeKind,
    Commit, FileChangeStat, IssueId, PullRequestId, PullRequestRef, RepositoryBranch,
    RepositoryLocation,
};

/// Paginated envelope used by every list endpoint
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActorRef {
    pub display_name: Option<String>,
    pub nickname: Option<String>,
}

impl ActorRef {
    pub fn name(&self) -> Option<String> {
        self.display_name
            .clone()
            .or_else(|| self.nickname.clone())
    }
}

#[derive(Debug, Deserialize)]
pub struct BranchRef {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CommitRef {
    pub hash: String,
}

#[derive(Debug, Deserialize)]
pub struct PathRef {
    pub path: String,
}

/// Source or destination of a pull request
#[derive(Debug, Deserialize)]
pub struct PullRequestEndpoint {
    pub branch: Option<BranchRef>,
    pub commit: Option<CommitRef>,
}

impl PullRequestEndpoint {
    fn into_branch_head(self) -> Result<BranchHead, ApiError> {
        let branch = self
            .branch
            .ok_or_else(|| ApiError::Decode("pull request endpoint is missing a branch".into()))?;
        Ok(BranchHead::new(branch.name, self.commit.map(|c| c.hash)))
    }
}

#[derive(Debug, Deserialize)]
pub struct PullRequestBody {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    pub state: String,
    pub author: Option<ActorRef>,
    pub source: PullRequestEndpoint,
    pub destination: PullRequestEndpoint,
    pub created_on: Option<DateTime<Utc>>,
    pub updated_on: Option<DateTime<Utc>>,
    pub comment_count: Option<u32>,
}

impl PullRequestBody {
    pub fn into_domain(
        self,
        location: RepositoryLocation,
    ) -> Result<BitbucketPullRequest, ApiError> {
        let state = self.state.parse().map_err(|_| {
            ApiError::Decode(format!("unknown pull request state: {}", self.state))
        })?;
        Ok(BitbucketPullRequest {
            pull_request_ref: PullRequestRef::new(location, PullRequestId::new(self.id)),
            title: self.title,
            description: self.description,
            state,
            author: self.author.and_then(|a| a.name()),
            source: self.source.into_branch_head()?,
            destination: self.destination.into_branch_head()?,
            created_on: self.created_on,
            updated_on: self.updated_on,
            comment_count: self.comment_count,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CommitAuthor {
    pub user: Option<ActorRef>,
    pub raw: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommitBody {
    pub hash: String,
    #[serde(default)]
    pub message: String,
    pub author: Option<CommitAuthor>,
    pub date: Option<DateTime<Utc>>,
}

impl From<CommitBody> for Commit {
    fn from(body: CommitBody) -> Self {
        let author = body
            .author
            .and_then(|a| a.user.and_then(|u| u.name()).or(a.raw));
        Commit {
            hash: body.hash,
            message: body.message,
            author,
            date: body.date,
        }
    }
}

/// One entry of the structured diffstat endpoint
#[derive(Debug, Deserialize)]
pub struct DiffStatEntry {
    pub status: String,
    pub lines_added: Option<u32>,
    pub lines_removed: Option<u32>,
    pub old: Option<PathRef>,
    pub new: Option<PathRef>,
}

impl From<DiffStatEntry> for FileChangeStat {
    fn from(entry: DiffStatEntry) -> Self {
        let kind = entry.status.parse().unwrap_or(ChangeKind::Modified);
        FileChangeStat {
            old_path: entry.old.map(|p| p.path),
            new_path: entry.new.map(|p| p.path),
            kind,
            added_lines: entry.lines_added.unwrap_or(0),
            removed_lines: entry.lines_removed.unwrap_or(0),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RepositoryBody {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    pub language: Option<String>,
    pub mainbranch: Option<BranchRef>,
    pub updated_on: Option<DateTime<Utc>>,
}

impl RepositoryBody {
    pub fn into_domain(self, workspace: &str) -> BitbucketRepository {
        BitbucketRepository {
            location: RepositoryLocation::new(workspace, self.slug),
            name: self.name,
            description: self.description,
            is_private: self.is_private,
            main_branch: self.mainbranch.map(|b| Branch::new(b.name)),
            language: self.language,
            updated_on: self.updated_on,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BranchBody {
    pub name: String,
    pub target: Option<CommitRef>,
}

impl From<BranchBody> for RepositoryBranch {
    fn from(body: BranchBody) -> Self {
        RepositoryBranch {
            name: Branch::new(body.name),
            target_hash: body.target.map(|c| c.hash),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IssueContent {
    pub raw: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IssueBody {
    pub id: u64,
    pub title: String,
    pub content: Option<IssueContent>,
    pub state: String,
    pub kind: Option<String>,
    pub priority: Option<String>,
    pub reporter: Option<ActorRef>,
    pub assignee: Option<ActorRef>,
    pub created_on: Option<DateTime<Utc>>,
    pub updated_on: Option<DateTime<Utc>>,
}

impl IssueBody {
    pub fn into_domain(self, location: RepositoryLocation) -> BitbucketIssue {
        BitbucketIssue {
            location,
            id: IssueId::new(self.id),
            title: self.title,
            content: self.content.and_then(|c| c.raw),
            state: self.state,
            kind: self.kind,
            priority: self.priority,
            reporter: self.reporter.and_then(|a| a.name()),
            assignee: self.assignee.and_then(|a| a.name()),
            created_on: self.created_on,
            updated_on: self.updated_on,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UserBody {
    pub username: Option<String>,
    pub display_name: Option<String>,
}

impl UserBody {
    pub fn name(&self) -> String {
        self.display_name
            .clone()
            .or_else(|| self.username.clone())
            .unwrap_or_else(|| "(unknown user)".to_string())
    }
}
