//! API error types and retry classification
//!
//! Errors from the REST layer keep the upstream status code so that callers
//! can branch on it (404 drives the diff fallback chain) and so that the
//! surfaced message can carry status-specific remediation suggestions.

/// Error produced by the Bitbucket REST layer
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Upstream returned a non-success HTTP status, after retries were exhausted
    Status { status: u16, message: String },
    /// Transport-level failure before a response status was obtained
    Network(String),
    /// Response body could not be decoded into the expected shape
    Decode(String),
}

impl ApiError {
    /// Upstream HTTP status, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for a 404 response, the signal that drives diff fallbacks
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status { status, message } => {
                write!(f, "Bitbucket API error (HTTP {}): {}", status, message)
            }
            Self::Network(details) => write!(f, "Network error: {}", details),
            Self::Decode(details) => write!(f, "Response decode error: {}", details),
        }
    }
}

impl std::error::Error for ApiError {}

/// How the transport layer should react to a failed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// 429; raise the pacing delay and retry the request exactly once
    RateLimited,
    /// 5xx or transport failure; retry with exponential backoff
    Transient,
    /// Everything else; surface to the caller without retrying
    Fatal,
}

/// Classifies a status code the way the retry loop expects
pub fn classify_status(status: u16) -> RetryClass {
    match status {
        429 => RetryClass::RateLimited,
        500..=599 => RetryClass::Transient,
        _ => RetryClass::Fatal,
    }
}

/// Human-readable remediation suggestions keyed off the HTTP status
pub fn remediation_suggestions(status: Option<u16>) -> Vec<&'static str> {
    match status {
        Some(401) => vec![
            "Verify the configured username and app password (or access token)",
            "App passwords are created under Personal settings > App passwords",
        ],
        Some(403) => vec![
            "The credentials lack permission for this resource",
            "Ask a workspace admin to grant repository read access",
        ],
        Some(404) => vec![
            "Check the workspace, repository slug, and id for typos",
            "Private resources appear as 404 without sufficient permissions",
        ],
        Some(429) => vec![
            "The API rate limit was hit; wait a minute and retry",
            "Reduce the number of concurrent tool invocations",
        ],
        Some(s) if (500..=599).contains(&s) => vec![
            "Bitbucket reported a server-side problem; retry shortly",
            "Check https://bitbucket.status.atlassian.com/ for incidents",
        ],
        _ => vec!["Retry the operation; if it persists, check network connectivity"],
    }
}

/// Formats an API error for the caller, enriched with the operation name,
/// resource context, and remediation suggestions. Callers receive this text
/// instead of a raw error chain.
pub fn describe_api_error(operation: &str, context: &str, error: &ApiError) -> String {
    let mut text = format!("Operation `{}` failed for {}: {}", operation, context, error);
    let suggestions = remediation_suggestions(error.status());
    if !suggestions.is_empty() {
        text.push_str("\n\nSuggestions:");
        for suggestion in suggestions {
            text.push_str("\n- ");
            text.push_str(suggestion);
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(429), RetryClass::RateLimited);
        assert_eq!(classify_status(500), RetryClass::Transient);
        assert_eq!(classify_status(503), RetryClass::Transient);
        assert_eq!(classify_status(404), RetryClass::Fatal);
        assert_eq!(classify_status(401), RetryClass::Fatal);
    }

    #[test]
    fn test_describe_api_error_includes_suggestions() {
        let error = ApiError::Status {
            status: 404,
            message: "Resource not found".to_string(),
        };
        let text = describe_api_error("get_pull_request", "acme/widget#7", &error);
        assert!(text.contains("get_pull_request"));
        assert!(text.contains("acme/widget#7"));
        assert!(text.contains("HTTP 404"));
        assert!(text.contains("Suggestions:"));
    }

    #[test]
    fn test_is_not_found() {
        let error = ApiError::Status {
            status: 404,
            message: String::new(),
        };
        assert!(error.is_not_found());
        assert!(!ApiError::Network("timeout".into()).is_not_found());
    }
}
