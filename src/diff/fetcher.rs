//! Multi-strategy pull request diff retrieval
//!
//! The direct diff endpoint 404s for non-participants, for pull requests in
//! removed states, and for oversized payloads. Retrieval therefore walks an
//! explicit ordered list of strategies until one yields non-empty, plausible
//! diff text:
//!
//! `Direct → CommitFallback → BranchCompare → CommitRange`
//!
//! A non-404 failure of the direct call aborts the chain immediately, since
//! it is not a permission or availability signal. When every strategy fails,
//! the result is a structured limited-access explanation returned as a
//! successful outcome; reviewers without full diff access are an expected
//! audience of this tool, not an error case.

use tracing::{debug, info};

use crate::bitbucket::error::{ApiError, describe_api_error};
use crate::bitbucket::BitbucketClient;
use crate::cache::{CacheKey, TtlCache, ttl};
use crate::diff::extract::extract_file_diff;
use crate::diff::relevance::RelevanceCheck;
use crate::types::{BitbucketPullRequest, DiffOutcome, PullRequestRef, PullRequestSnapshot};

use anyhow::Result;

/// How many of the pull request's commits the commit fallback inspects
pub const COMMIT_FALLBACK_LIMIT: usize = 3;

/// Retrieval strategies in the order they are attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffStrategy {
    /// The dedicated pull request diff endpoint
    Direct,
    /// Per-commit diffs of the pull request's first few commits
    CommitFallback,
    /// Three-dot source-vs-destination branch comparison
    BranchCompare,
    /// Two-dot comparison of the known head commit hashes
    CommitRange,
}

pub const FALLBACK_CHAIN: [DiffStrategy; 4] = [
    DiffStrategy::Direct,
    DiffStrategy::CommitFallback,
    DiffStrategy::BranchCompare,
    DiffStrategy::CommitRange,
];

/// Why one strategy produced no usable diff
#[derive(Debug)]
enum StrategyFailure {
    /// Endpoint unavailable or otherwise allowed to fall through
    Unavailable(String),
    /// Call succeeded but the diff text was empty
    Empty,
    /// Diff content contradicted the pull request's apparent domain
    ContentMismatch,
    /// The chain must abort and surface this error
    Fatal(ApiError),
}

/// Outcome of a single-file diff request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileDiffOutcome {
    /// Diff text scoped to the requested file
    Content(String),
    /// Diff text was obtained but contains no section for the file
    NoChanges,
    /// Every strategy failed; guidance text for the caller
    LimitedAccess(String),
}

/// Fetches the pull request metadata through the cache.
///
/// Metadata is cacheable; diff text never is. The diff paths purge the
/// pull request's cache entries before calling this, so diff operations
/// always see fresh commit hashes.
pub async fn cached_pull_request(
    client: &BitbucketClient,
    cache: &TtlCache,
    pr: &PullRequestRef,
) -> Result<BitbucketPullRequest, ApiError> {
    let key = CacheKey::pull_request(pr);
    if let Some(cached) = cache.get_typed::<BitbucketPullRequest>(&key) {
        return Ok(cached);
    }
    let fetched = client.get_pull_request(pr).await?;
    cache.set_typed(key, &fetched, ttl::PULL_REQUEST);
    Ok(fetched)
}

pub struct DiffFetcher<'a> {
    client: &'a BitbucketClient,
    cache: &'a TtlCache,
    relevance: &'a dyn RelevanceCheck,
}

impl<'a> DiffFetcher<'a> {
    pub fn new(
        client: &'a BitbucketClient,
        cache: &'a TtlCache,
        relevance: &'a dyn RelevanceCheck,
    ) -> Self {
        Self {
            client,
            cache,
            relevance,
        }
    }

    /// Retrieves the full diff of a pull request through the fallback chain
    pub async fn fetch_diff(&self, pr: &PullRequestRef) -> Result<DiffOutcome> {
        // Stale metadata has steered diff fetches to wrong commit ranges
        // before; purge before reading anything for this pull request.
        self.cache.invalidate_pull_request(pr);
        let snapshot = self.snapshot(pr).await?;

        for strategy in FALLBACK_CHAIN {
            match self.try_strategy(strategy, pr, &snapshot).await {
                Ok(diff) => {
                    info!("Diff for {} obtained via {:?}", pr, strategy);
                    return Ok(DiffOutcome::Content(diff));
                }
                Err(StrategyFailure::Fatal(e)) => {
                    return Err(anyhow::anyhow!(describe_api_error(
                        "get_pull_request_diff",
                        &pr.to_string(),
                        &e
                    )));
                }
                Err(failure) => {
                    debug!("Strategy {:?} for {} did not apply: {:?}", strategy, pr, failure);
                }
            }
        }

        Ok(DiffOutcome::LimitedAccess(limited_access_report(
            pr, &snapshot,
        )))
    }

    /// Retrieves the diff of one file of a pull request.
    ///
    /// Runs a parallel, simpler chain: server-side path-filtered compare,
    /// unfiltered compare with local extraction, latest-commit diff filtered
    /// to the path, and finally the full fallback chain plus local
    /// extraction. Empty content counts as failure at every step.
    pub async fn fetch_file_diff(
        &self,
        pr: &PullRequestRef,
        file_path: &str,
    ) -> Result<FileDiffOutcome> {
        self.cache.invalidate_pull_request(pr);
        let snapshot = self.snapshot(pr).await?;
        let hashes = commit_hashes(&snapshot);

        if let Some((source, destination)) = &hashes {
            match self
                .client
                .compare_commits(&pr.location, source, destination, Some(file_path))
                .await
            {
                Ok(diff) if !diff.trim().is_empty() => {
                    return Ok(FileDiffOutcome::Content(diff));
                }
                Ok(_) => debug!("Path-filtered compare for {} returned empty", pr),
                Err(e) => debug!("Path-filtered compare for {} failed: {}", pr, e),
            }

            match self
                .client
                .compare_commits(&pr.location, source, destination, None)
                .await
            {
                Ok(diff) if !diff.trim().is_empty() => {
                    if let Some(extracted) = extract_file_diff(&diff, file_path) {
                        return Ok(FileDiffOutcome::Content(extracted));
                    }
                    debug!("Unfiltered compare for {} has no section for {}", pr, file_path);
                }
                Ok(_) => debug!("Unfiltered compare for {} returned empty", pr),
                Err(e) => debug!("Unfiltered compare for {} failed: {}", pr, e),
            }
        }

        match self.client.list_pull_request_commits(pr).await {
            Ok(commits) => {
                if let Some(latest) = commits.first() {
                    match self
                        .client
                        .get_commit_diff(&pr.location, &latest.hash, Some(file_path))
                        .await
                    {
                        Ok(diff) if !diff.trim().is_empty() => {
                            return Ok(FileDiffOutcome::Content(diff));
                        }
                        Ok(_) => debug!("Latest-commit diff for {} returned empty", pr),
                        Err(e) => debug!("Latest-commit diff for {} failed: {}", pr, e),
                    }
                }
            }
            Err(e) => debug!("Commit listing for {} failed: {}", pr, e),
        }

        match self.fetch_diff(pr).await? {
            DiffOutcome::Content(diff) => match extract_file_diff(&diff, file_path) {
                Some(extracted) if !extracted.trim().is_empty() => {
                    Ok(FileDiffOutcome::Content(extracted))
                }
                _ => Ok(FileDiffOutcome::NoChanges),
            },
            DiffOutcome::LimitedAccess(report) => Ok(FileDiffOutcome::LimitedAccess(report)),
        }
    }

    async fn snapshot(&self, pr: &PullRequestRef) -> Result<PullRequestSnapshot> {
        cached_pull_request(self.client, self.cache, pr)
            .await
            .map(|full| full.snapshot())
            .map_err(|e| {
                anyhow::anyhow!(describe_api_error("get_pull_request", &pr.to_string(), &e))
            })
    }

    async fn try_strategy(
        &self,
        strategy: DiffStrategy,
        pr: &PullRequestRef,
        snapshot: &PullRequestSnapshot,
    ) -> std::result::Result<String, StrategyFailure> {
        match strategy {
            DiffStrategy::Direct => self.try_direct(pr, snapshot).await,
            DiffStrategy::CommitFallback => self.try_commit_fallback(pr, snapshot).await,
            DiffStrategy::BranchCompare => self.try_branch_compare(pr, snapshot).await,
            DiffStrategy::CommitRange => self.try_commit_range(pr, snapshot).await,
        }
    }

    async fn try_direct(
        &self,
        pr: &PullRequestRef,
        snapshot: &PullRequestSnapshot,
    ) -> std::result::Result<String, StrategyFailure> {
        let diff = match self.client.get_pull_request_diff(pr).await {
            Ok(diff) => diff,
            Err(e) if e.is_not_found() => {
                return Err(StrategyFailure::Unavailable(e.to_string()));
            }
            // Non-404 errors are not permission/availability signals
            Err(e) => return Err(StrategyFailure::Fatal(e)),
        };
        if diff.trim().is_empty() {
            return Err(StrategyFailure::Empty);
        }
        // The upstream has returned diffs for the wrong commit range before;
        // discard a diff that contradicts the pull request's own domain.
        if !self.relevance.matches_pull_request(snapshot, &diff) {
            return Err(StrategyFailure::ContentMismatch);
        }
        Ok(diff)
    }

    async fn try_commit_fallback(
        &self,
        pr: &PullRequestRef,
        snapshot: &PullRequestSnapshot,
    ) -> std::result::Result<String, StrategyFailure> {
        let commits = self
            .client
            .list_pull_request_commits(pr)
            .await
            .map_err(|e| StrategyFailure::Unavailable(e.to_string()))?;
        let pr_text = format!("{} {}", snapshot.title, snapshot.source.branch);
        let pr_domain = self.relevance.detect_domain(&pr_text);

        for commit in commits.iter().take(COMMIT_FALLBACK_LIMIT) {
            let diff = match self
                .client
                .get_commit_diff(&pr.location, &commit.hash, None)
                .await
            {
                Ok(diff) => diff,
                Err(e) => {
                    debug!("Commit {} diff failed: {}", commit.short_hash(), e);
                    continue;
                }
            };
            if diff.trim().is_empty() {
                continue;
            }
            if let Some(domain) = &pr_domain {
                if self.relevance.contradicts(domain, &diff) {
                    debug!(
                        "Commit {} diff contradicts domain {:?}, skipping",
                        commit.short_hash(),
                        domain
                    );
                    continue;
                }
            }
            return Ok(diff);
        }
        Err(StrategyFailure::Unavailable(
            "no commit yielded usable diff text".to_string(),
        ))
    }

    async fn try_branch_compare(
        &self,
        pr: &PullRequestRef,
        snapshot: &PullRequestSnapshot,
    ) -> std::result::Result<String, StrategyFailure> {
        let diff = self
            .client
            .compare_branches(
                &pr.location,
                &snapshot.destination.branch,
                &snapshot.source.branch,
            )
            .await
            .map_err(|e| StrategyFailure::Unavailable(e.to_string()))?;
        if diff.trim().is_empty() {
            return Err(StrategyFailure::Empty);
        }
        Ok(diff)
    }

    async fn try_commit_range(
        &self,
        pr: &PullRequestRef,
        snapshot: &PullRequestSnapshot,
    ) -> std::result::Result<String, StrategyFailure> {
        let Some((source, destination)) = commit_hashes(snapshot) else {
            return Err(StrategyFailure::Unavailable(
                "source or destination commit hash unknown".to_string(),
            ));
        };
        let diff = self
            .client
            .compare_commits(&pr.location, &source, &destination, None)
            .await
            .map_err(|e| StrategyFailure::Unavailable(e.to_string()))?;
        if diff.trim().is_empty() {
            return Err(StrategyFailure::Empty);
        }
        Ok(diff)
    }
}

fn commit_hashes(snapshot: &PullRequestSnapshot) -> Option<(String, String)> {
    match (
        &snapshot.source.commit_hash,
        &snapshot.destination.commit_hash,
    ) {
        (Some(source), Some(destination)) => Some((source.clone(), destination.clone())),
        _ => None,
    }
}

/// Human-readable explanation returned when every strategy fails.
///
/// Contains the pull request context and concrete remediation steps instead
/// of an error, since limited diff access is a routine situation for
/// reviewers who are not repository members.
fn limited_access_report(pr: &PullRequestRef, snapshot: &PullRequestSnapshot) -> String {
    let author = snapshot.author.as_deref().unwrap_or("(unknown)");
    format!(
        "## Pull Request #{}: {}\n\n\
         - **Author**: {}\n\
         - **State**: {}\n\
         - **Source**: `{}` → **Destination**: `{}`\n\n\
         The diff content could not be retrieved: limited access to PR diff content.\n\
         Every retrieval strategy (direct diff, per-commit diffs, branch compare,\n\
         commit-range compare) was exhausted without usable diff text.\n\n\
         What you can do:\n\
         - Ask the repository owner for reviewer access to this pull request\n\
         - Fetch the branches locally and compare: `git fetch origin {} {}` then `git diff {}...{}`\n\
         - View the diff in the web UI: {}/diff\n",
        pr.id,
        snapshot.title,
        author,
        snapshot.state,
        snapshot.source.branch,
        snapshot.destination.branch,
        snapshot.source.branch,
        snapshot.destination.branch,
        snapshot.destination.branch,
        snapshot.source.branch,
        pr.url(),
    )
}
