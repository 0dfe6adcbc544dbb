//! Pull request diff retrieval and reconstruction
//!
//! The direct diff endpoint is frequently unavailable (permissions, large
//! payloads, declined pull requests), so retrieval runs through an ordered
//! chain of fallback strategies. Once diff text is obtained it flows through
//! the file-scoped extractor and the post-filters; "files changed" requests
//! route the same text through the parser instead.

pub mod extract;
pub mod fetcher;
pub mod filters;
pub mod parser;
pub mod relevance;

pub use fetcher::{DiffFetcher, DiffStrategy, FileDiffOutcome};
pub use relevance::{KeywordRelevance, RelevanceCheck};
