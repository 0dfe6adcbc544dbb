//! Commit domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One commit as listed by the commit endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    pub hash: String,
    pub message: String,
    pub author: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

impl Commit {
    /// Abbreviated hash for display (12 characters, full hash if shorter)
    pub fn short_hash(&self) -> &str {
        let end = self.hash.len().min(12);
        &self.hash[..end]
    }

    /// First line of the commit message
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_hash_and_summary() {
        let commit = Commit {
            hash: "0123456789abcdef0123456789abcdef01234567".to_string(),
            message: "Fix pacing reset\n\nLonger body".to_string(),
            author: None,
            date: None,
        };
        assert_eq!(commit.short_hash(), "0123456789ab");
        assert_eq!(commit.summary(), "Fix pacing reset");
    }
}
