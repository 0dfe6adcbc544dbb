//! Shared helpers for integration tests
//!
//! Every test spins up its own mockito server and points a client at it, so
//! no test depends on network access or real credentials.

#![allow(dead_code)]

use std::sync::Arc;

use bitbucket_insight::bitbucket::{BitbucketClient, Credentials};
use bitbucket_insight::cache::TtlCache;
use bitbucket_insight::diff::KeywordRelevance;
use bitbucket_insight::tools::ServerContext;
use bitbucket_insight::types::{PullRequestId, PullRequestRef, RepositoryLocation};

pub fn test_client(base_url: &str) -> BitbucketClient {
    BitbucketClient::new(
        Credentials::AppPassword {
            username: "tester".to_string(),
            app_password: "secret".to_string(),
        },
        Some(base_url.to_string()),
        None,
    )
    .expect("failed to build test client")
}

pub fn test_context(base_url: &str) -> ServerContext {
    ServerContext {
        client: test_client(base_url),
        cache: Arc::new(TtlCache::new()),
        relevance: KeywordRelevance::default(),
    }
}

pub fn test_location() -> RepositoryLocation {
    RepositoryLocation::new("acme", "widget-service")
}

pub fn test_pr(id: u64) -> PullRequestRef {
    PullRequestRef::new(test_location(), PullRequestId::new(id))
}

/// Pull request JSON in the 2.0 REST wire shape
pub fn pull_request_json(id: u64, title: &str, source_branch: &str) -> String {
    format!(
        r#"{{
            "id": {id},
            "title": "{title}",
            "description": "body",
            "state": "OPEN",
            "author": {{"display_name": "Dana Developer"}},
            "source": {{
                "branch": {{"name": "{source_branch}"}},
                "commit": {{"hash": "aaa111aaa111"}}
            }},
            "destination": {{
                "branch": {{"name": "main"}},
                "commit": {{"hash": "bbb222bbb222"}}
            }},
            "comment_count": 2
        }}"#
    )
}

/// A small, domain-neutral unified diff
pub fn neutral_diff() -> &'static str {
    "diff --git a/src/pacing.rs b/src/pacing.rs\n\
     index 1111111..2222222 100644\n\
     --- a/src/pacing.rs\n\
     +++ b/src/pacing.rs\n\
     @@ -1,3 +1,3 @@\n \
     fn delay() {\n\
     -    let d = 100;\n\
     +    let d = 200;\n \
     }\n"
}

/// A diff that clearly belongs to the database domain
pub fn database_diff() -> &'static str {
    "diff --git a/db/migration_007.sql b/db/migration_007.sql\n\
     new file mode 100644\n\
     --- /dev/null\n\
     +++ b/db/migration_007.sql\n\
     @@ -0,0 +1,2 @@\n\
     +alter table orders add column schema_version int;\n\
     +create table order_audit (id int);\n"
}

/// A diff that clearly belongs to the frontend domain
pub fn frontend_diff() -> &'static str {
    "diff --git a/styles/app.css b/styles/app.css\n\
     index 3333333..4444444 100644\n\
     --- a/styles/app.css\n\
     +++ b/styles/app.css\n\
     @@ -1 +1 @@\n\
     -.button { color: red; }\n\
     +.button { color: blue; }\n"
}
