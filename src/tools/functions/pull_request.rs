//! Pull request tool operations
//!
//! Diff retrieval composes the fallback chain, the post-filters, and the
//! size-budget degrade path; the other operations are thin cached reads.

use anyhow::Result;

use crate::bitbucket::error::describe_api_error;
use crate::cache::{CacheKey, ttl};
use crate::diff::fetcher::{DiffFetcher, FileDiffOutcome, cached_pull_request};
use crate::diff::filters::apply_post_filters;
use crate::diff::parser::parse_change_stats;
use crate::formatter::{
    MarkdownContent, diff_too_large_markdown, file_diff_no_changes_markdown,
    pull_request_body_markdown, pull_request_diff_markdown, pull_request_file_diff_markdown,
    pull_request_file_stats_markdown, pull_request_list_markdown,
};
use crate::tools::ServerContext;
use crate::types::{
    BitbucketPullRequest, DiffOutcome, FileChangeStat, PullRequestRef, PullRequestState,
    RepositoryLocation,
};

// Rough conversion between response characters and model tokens
pub const APPROX_CHARS_PER_TOKEN: u64 = 4;

/// Bounds for the caller-supplied `max_size` token budget
pub const MIN_DIFF_SIZE_TOKENS: u64 = 1_000;
pub const MAX_DIFF_SIZE_TOKENS: u64 = 20_000;
pub const DEFAULT_DIFF_SIZE_TOKENS: u64 = 10_000;

/// Upper bound of the `context_lines` option
pub const MAX_CONTEXT_LINES: u32 = 10;

/// Caller-tunable options of the diff tool
#[derive(Debug, Clone, Default)]
pub struct DiffRequestOptions {
    /// Restrict the diff to one file
    pub file_path: Option<String>,
    /// Keep at most this many unchanged lines after each change, capped at
    /// `MAX_CONTEXT_LINES`
    pub context_lines: Option<u32>,
    /// Drop whitespace-only change lines
    pub ignore_whitespace: bool,
    /// Token budget for the response; clamped to the supported range
    pub max_size: Option<u64>,
}

/// Clamps the requested token budget into the supported range
pub fn clamp_size_budget(requested: Option<u64>) -> u64 {
    requested
        .unwrap_or(DEFAULT_DIFF_SIZE_TOKENS)
        .clamp(MIN_DIFF_SIZE_TOKENS, MAX_DIFF_SIZE_TOKENS)
}

/// Estimated token count of a response body, rounding up
pub fn estimate_token_count(text: &str) -> u64 {
    (text.len() as u64).div_ceil(APPROX_CHARS_PER_TOKEN)
}

pub async fn get_pull_request(
    context: &ServerContext,
    pr: PullRequestRef,
) -> Result<MarkdownContent> {
    let pull_request = cached_pull_request(&context.client, &context.cache, &pr)
        .await
        .map_err(|e| {
            anyhow::anyhow!(describe_api_error("get_pull_request", &pr.to_string(), &e))
        })?;
    Ok(pull_request_body_markdown(&pull_request))
}

pub async fn list_pull_requests(
    context: &ServerContext,
    location: RepositoryLocation,
    state: Option<PullRequestState>,
) -> Result<MarkdownContent> {
    // Only the unfiltered listing is cached; filtered listings are cheap
    // subsets the API serves directly.
    let key = CacheKey::pull_request_list(&location);
    if state.is_none() {
        if let Some(cached) = context.cache.get_typed::<Vec<BitbucketPullRequest>>(&key) {
            return Ok(pull_request_list_markdown(&location, &cached));
        }
    }
    let pull_requests = context
        .client
        .list_pull_requests(&location, state)
        .await
        .map_err(|e| {
            anyhow::anyhow!(describe_api_error(
                "list_pull_requests",
                &location.full_name(),
                &e
            ))
        })?;
    if state.is_none() {
        context
            .cache
            .set_typed(key, &pull_requests, ttl::PULL_REQUEST_LIST);
    }
    Ok(pull_request_list_markdown(&location, &pull_requests))
}

/// Retrieves the pull request diff, applying post-filters and the size
/// budget. An oversized diff degrades to a per-file summary instead of
/// failing.
pub async fn get_pull_request_diff(
    context: &ServerContext,
    pr: PullRequestRef,
    options: DiffRequestOptions,
) -> Result<MarkdownContent> {
    let fetcher = DiffFetcher::new(&context.client, &context.cache, &context.relevance);
    let max_tokens = clamp_size_budget(options.max_size);
    let context_lines = options.context_lines.map(|n| n.min(MAX_CONTEXT_LINES));

    if let Some(file_path) = &options.file_path {
        return match fetcher.fetch_file_diff(&pr, file_path).await? {
            FileDiffOutcome::Content(diff) => {
                let filtered =
                    apply_post_filters(&diff, options.ignore_whitespace, context_lines);
                render_within_budget(&pr, &filtered, max_tokens, Some(file_path))
            }
            FileDiffOutcome::NoChanges => Ok(file_diff_no_changes_markdown(&pr, file_path)),
            FileDiffOutcome::LimitedAccess(report) => Ok(MarkdownContent(report)),
        };
    }

    match fetcher.fetch_diff(&pr).await? {
        DiffOutcome::Content(diff) => {
            let filtered = apply_post_filters(&diff, options.ignore_whitespace, context_lines);
            render_within_budget(&pr, &filtered, max_tokens, None)
        }
        DiffOutcome::LimitedAccess(report) => Ok(MarkdownContent(report)),
    }
}

fn render_within_budget(
    pr: &PullRequestRef,
    diff: &str,
    max_tokens: u64,
    file_path: Option<&str>,
) -> Result<MarkdownContent> {
    let estimated_tokens = estimate_token_count(diff);
    if estimated_tokens > max_tokens {
        let stats = parse_change_stats(diff);
        return Ok(diff_too_large_markdown(pr, &stats, estimated_tokens, max_tokens));
    }
    Ok(match file_path {
        Some(file_path) => pull_request_file_diff_markdown(pr, file_path, diff),
        None => pull_request_diff_markdown(pr, diff),
    })
}

/// Retrieves per-file change statistics.
///
/// The structured diffstat endpoint is preferred; when it 404s like the
/// diff endpoint, the stats are reconstructed from whatever diff text the
/// fallback chain can produce.
pub async fn get_pull_request_files(
    context: &ServerContext,
    pr: PullRequestRef,
) -> Result<MarkdownContent> {
    match context.client.get_pull_request_diffstat(&pr).await {
        Ok(stats) => Ok(pull_request_file_stats_markdown(&pr, &stats)),
        Err(e) if e.is_not_found() => {
            let fetcher = DiffFetcher::new(&context.client, &context.cache, &context.relevance);
            match fetcher.fetch_diff(&pr).await? {
                DiffOutcome::Content(diff) => {
                    let stats: Vec<FileChangeStat> = parse_change_stats(&diff);
                    Ok(pull_request_file_stats_markdown(&pr, &stats))
                }
                DiffOutcome::LimitedAccess(report) => Ok(MarkdownContent(report)),
            }
        }
        Err(e) => Err(anyhow::anyhow!(describe_api_error(
            "get_pull_request_files",
            &pr.to_string(),
            &e
        ))),
    }
}

pub async fn create_pull_request(
    context: &ServerContext,
    location: RepositoryLocation,
    title: String,
    source_branch: String,
    destination_branch: String,
    description: Option<String>,
) -> Result<MarkdownContent> {
    let created = context
        .client
        .create_pull_request(
            &location,
            &title,
            &source_branch,
            &destination_branch,
            description.as_deref(),
        )
        .await
        .map_err(|e| {
            anyhow::anyhow!(describe_api_error(
                "create_pull_request",
                &location.full_name(),
                &e
            ))
        })?;
    context.cache.invalidate_pull_request_list(&location);
    Ok(pull_request_body_markdown(&created))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_size_budget() {
        assert_eq!(clamp_size_budget(None), DEFAULT_DIFF_SIZE_TOKENS);
        assert_eq!(clamp_size_budget(Some(5)), MIN_DIFF_SIZE_TOKENS);
        assert_eq!(clamp_size_budget(Some(1_000_000)), MAX_DIFF_SIZE_TOKENS);
        assert_eq!(clamp_size_budget(Some(5_000)), 5_000);
    }

    #[test]
    fn test_estimate_token_count_rounds_up() {
        assert_eq!(estimate_token_count(""), 0);
        assert_eq!(estimate_token_count("abc"), 1);
        assert_eq!(estimate_token_count("abcd"), 1);
        assert_eq!(estimate_token_count("abcde"), 2);
    }
}
