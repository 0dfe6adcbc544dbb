pub mod diff_summary;
pub mod issue;
pub mod pull_request;
pub mod pull_request_diff;
pub mod pull_request_file_stats;
pub mod repository;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use diff_summary::*;
pub use issue::*;
pub use pull_request::*;
pub use pull_request_diff::*;
pub use pull_request_file_stats::*;
pub use repository::*;

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct MarkdownContent(pub String);

/// Format an optional UTC datetime for display. Bitbucket omits timestamps
/// on some historic records, so absence renders as a placeholder.
pub fn format_datetime(dt: Option<DateTime<Utc>>) -> String {
    match dt {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "(unknown)".to_string(),
    }
}
