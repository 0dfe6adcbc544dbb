//! Content-sanity relevance check
//!
//! The upstream API has been observed to occasionally return a diff for the
//! wrong commit range. As a guard, the fetcher compares the apparent domain
//! of the pull request (title and source branch) against the domain of the
//! diff body, and discards a diff that strongly matches an unrelated domain
//! while showing no trace of the pull request's own.
//!
//! This is a heuristic, not a guarantee. The keyword groups are deliberately
//! coarse and the check is pluggable so deployments can substitute their own.

use crate::types::PullRequestSnapshot;

/// Pluggable relevance check between pull request metadata and diff content
pub trait RelevanceCheck: Send + Sync {
    /// Best-effort domain classification of free text; `None` when no domain
    /// keyword matches
    fn detect_domain(&self, text: &str) -> Option<String>;

    /// True when diff content strongly matches a different domain and shows
    /// no keyword of the expected one
    fn contradicts(&self, expected_domain: &str, diff: &str) -> bool;

    /// Whether a diff is plausible for a pull request. Pull requests without
    /// a detectable domain accept any diff.
    fn matches_pull_request(&self, snapshot: &PullRequestSnapshot, diff: &str) -> bool {
        let pr_text = format!("{} {}", snapshot.title, snapshot.source.branch);
        match self.detect_domain(&pr_text) {
            Some(domain) => !self.contradicts(&domain, diff),
            None => true,
        }
    }
}

/// One named keyword group
#[derive(Debug, Clone)]
pub struct DomainKeywords {
    pub name: String,
    pub keywords: Vec<String>,
}

impl DomainKeywords {
    pub fn new<N: Into<String>>(name: N, keywords: &[&str]) -> Self {
        Self {
            name: name.into(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    fn hit_count(&self, lower_text: &str) -> usize {
        self.keywords
            .iter()
            .filter(|keyword| lower_text.contains(keyword.as_str()))
            .count()
    }
}

/// Keyword-based relevance check with coarse built-in domains
#[derive(Debug, Clone)]
pub struct KeywordRelevance {
    domains: Vec<DomainKeywords>,
}

impl KeywordRelevance {
    pub fn new(domains: Vec<DomainKeywords>) -> Self {
        Self { domains }
    }

    fn domain(&self, name: &str) -> Option<&DomainKeywords> {
        self.domains.iter().find(|d| d.name == name)
    }
}

impl Default for KeywordRelevance {
    fn default() -> Self {
        Self::new(vec![
            DomainKeywords::new(
                "mobile",
                &[".swift", ".kt", "android", " ios ", "gradle", "xcodeproj"],
            ),
            DomainKeywords::new(
                "frontend",
                &[".tsx", ".jsx", ".vue", ".css", "stylesheet", "webpack"],
            ),
            DomainKeywords::new(
                "database",
                &["migration", "schema", ".sql", "alter table", "create table"],
            ),
            DomainKeywords::new("docs", &["readme", ".md", "changelog", "documentation"]),
            DomainKeywords::new(
                "infra",
                &["dockerfile", "terraform", "kubernetes", "helm", "ansible"],
            ),
        ])
    }
}

impl RelevanceCheck for KeywordRelevance {
    fn detect_domain(&self, text: &str) -> Option<String> {
        let lower = text.to_lowercase();
        self.domains
            .iter()
            .map(|domain| (domain.hit_count(&lower), domain))
            .filter(|(hits, _)| *hits > 0)
            .max_by_key(|(hits, _)| *hits)
            .map(|(_, domain)| domain.name.clone())
    }

    fn contradicts(&self, expected_domain: &str, diff: &str) -> bool {
        let lower = diff.to_lowercase();
        let expected_present = self
            .domain(expected_domain)
            .map(|domain| domain.hit_count(&lower) > 0)
            .unwrap_or(true);
        if expected_present {
            return false;
        }
        matches!(self.detect_domain(diff), Some(found) if found != expected_domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BranchHead, PullRequestState};

    fn snapshot(title: &str, branch: &str) -> PullRequestSnapshot {
        PullRequestSnapshot {
            title: title.to_string(),
            state: PullRequestState::Open,
            author: None,
            source: BranchHead::new(branch, Some("aaa111".to_string())),
            destination: BranchHead::new("main", Some("bbb222".to_string())),
        }
    }

    #[test]
    fn test_detect_domain_picks_strongest_group() {
        let relevance = KeywordRelevance::default();
        let domain = relevance.detect_domain("Add user table migration with schema change");
        assert_eq!(domain.as_deref(), Some("database"));
    }

    #[test]
    fn test_no_domain_for_neutral_text() {
        let relevance = KeywordRelevance::default();
        assert_eq!(relevance.detect_domain("Fix typo in parser"), None);
    }

    #[test]
    fn test_contradiction_when_diff_is_foreign() {
        let relevance = KeywordRelevance::default();
        let diff = "diff --git a/styles/app.css b/styles/app.css\n+.button { color: red; }\n";
        assert!(relevance.contradicts("database", diff));
    }

    #[test]
    fn test_no_contradiction_when_expected_keywords_present() {
        let relevance = KeywordRelevance::default();
        let diff = "diff --git a/db/migration_001.sql b/db/migration_001.sql\n+alter table users;\n";
        assert!(!relevance.contradicts("database", diff));
    }

    #[test]
    fn test_domainless_pull_request_accepts_any_diff() {
        let relevance = KeywordRelevance::default();
        let diff = "diff --git a/styles/app.css b/styles/app.css\n+.button {}\n";
        assert!(relevance.matches_pull_request(&snapshot("Fix typo", "fix-typo"), diff));
    }

    #[test]
    fn test_mismatched_diff_rejected_for_domain_pull_request() {
        let relevance = KeywordRelevance::default();
        let diff = "diff --git a/styles/app.css b/styles/app.css\n+.button {}\n";
        let snap = snapshot("Add schema migration for orders", "orders-migration");
        assert!(!relevance.matches_pull_request(&snap, diff));
    }
}
