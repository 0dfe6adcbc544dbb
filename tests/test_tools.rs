//! Integration tests for the tool operations: caching behavior, the
//! size-budget degrade path, and diffstat reconstruction

use serial_test::serial;

use bitbucket_insight::tools::functions;
use bitbucket_insight::tools::functions::pull_request::DiffRequestOptions;

mod test_util;
use test_util::{neutral_diff, pull_request_json, test_context, test_location, test_pr};

const PR_PATH: &str = "/2.0/repositories/acme/widget-service/pullrequests/7";

/// A diff big enough to overflow any permitted token budget
fn oversized_diff(file_count: usize) -> String {
    let mut diff = String::new();
    for i in 0..file_count {
        diff.push_str(&format!(
            "diff --git a/src/gen_{i}.rs b/src/gen_{i}.rs\n\
             index 1111111..2222222 100644\n\
             --- a/src/gen_{i}.rs\n\
             +++ b/src/gen_{i}.rs\n\
             @@ -1,1 +1,300 @@\n"
        ));
        for line in 0..300 {
            diff.push_str(&format!("+    let generated_value_{line} = {line} * {i};\n"));
        }
    }
    diff
}

#[tokio::test]
#[serial]
async fn test_repository_list_served_from_cache_on_second_call() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/2.0/repositories/acme")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(
            r#"{"values": [{"slug": "widget-service", "name": "widget-service", "is_private": true}], "next": null}"#,
        )
        .expect(1)
        .create_async()
        .await;

    let context = test_context(&server.url());

    let first = functions::repository::list_repositories(&context, "acme".to_string())
        .await
        .unwrap();
    let second = functions::repository::list_repositories(&context, "acme".to_string())
        .await
        .unwrap();

    assert!(first.0.contains("acme/widget-service"));
    assert_eq!(first.0, second.0);
    mock.assert_async().await;
}

#[tokio::test]
#[serial]
async fn test_oversized_diff_degrades_to_summary() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", PR_PATH)
        .with_status(200)
        .with_body(pull_request_json(7, "Regenerate bindings", "regen"))
        .create_async()
        .await;
    server
        .mock("GET", "/2.0/repositories/acme/widget-service/pullrequests/7/diff")
        .with_status(200)
        .with_body(oversized_diff(14))
        .create_async()
        .await;

    let context = test_context(&server.url());
    let options = DiffRequestOptions {
        max_size: Some(20_000),
        ..Default::default()
    };

    let content = functions::pull_request::get_pull_request_diff(&context, test_pr(7), options)
        .await
        .unwrap();

    assert!(content.0.contains("too large"));
    assert!(content.0.contains("limit of 20000"));
    assert!(content.0.contains("14 file(s) changed"));
    // At most ten files are listed individually
    assert!(content.0.contains("*4 more file(s) not listed*"));
    assert!(content.0.contains("`file_path`"));
    // No raw diff content leaks into the summary
    assert!(!content.0.contains("```diff"));
}

#[tokio::test]
#[serial]
async fn test_small_diff_returned_in_full() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", PR_PATH)
        .with_status(200)
        .with_body(pull_request_json(7, "Fix pacing reset", "pacing-fix"))
        .create_async()
        .await;
    server
        .mock("GET", "/2.0/repositories/acme/widget-service/pullrequests/7/diff")
        .with_status(200)
        .with_body(neutral_diff())
        .create_async()
        .await;

    let context = test_context(&server.url());

    let content = functions::pull_request::get_pull_request_diff(
        &context,
        test_pr(7),
        DiffRequestOptions::default(),
    )
    .await
    .unwrap();

    assert!(content.0.contains("```diff"));
    assert!(content.0.contains("src/pacing.rs"));
}

#[tokio::test]
#[serial]
async fn test_files_reconstructed_when_diffstat_unavailable() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", PR_PATH)
        .with_status(200)
        .with_body(pull_request_json(7, "Fix pacing reset", "pacing-fix"))
        .create_async()
        .await;
    server
        .mock(
            "GET",
            "/2.0/repositories/acme/widget-service/pullrequests/7/diffstat",
        )
        .with_status(404)
        .create_async()
        .await;
    server
        .mock("GET", "/2.0/repositories/acme/widget-service/pullrequests/7/diff")
        .with_status(200)
        .with_body(neutral_diff())
        .create_async()
        .await;

    let context = test_context(&server.url());

    let content = functions::pull_request::get_pull_request_files(&context, test_pr(7))
        .await
        .unwrap();

    assert!(content.0.contains("1 file(s) changed"));
    assert!(content.0.contains("| src/pacing.rs | modified | +1 | -1 |"));
}

#[tokio::test]
#[serial]
async fn test_structured_diffstat_preferred() {
    let mut server = mockito::Server::new_async().await;
    let diffstat_mock = server
        .mock(
            "GET",
            "/2.0/repositories/acme/widget-service/pullrequests/7/diffstat",
        )
        .with_status(200)
        .with_body(
            r#"{"values": [{"status": "modified", "lines_added": 10, "lines_removed": 2, "old": {"path": "src/lib.rs"}, "new": {"path": "src/lib.rs"}}], "next": null}"#,
        )
        .create_async()
        .await;
    // The diff chain must not run when the structured endpoint answers
    let diff_mock = server
        .mock("GET", "/2.0/repositories/acme/widget-service/pullrequests/7/diff")
        .expect(0)
        .create_async()
        .await;

    let context = test_context(&server.url());

    let content = functions::pull_request::get_pull_request_files(&context, test_pr(7))
        .await
        .unwrap();

    assert!(content.0.contains("| src/lib.rs | modified | +10 | -2 |"));
    diffstat_mock.assert_async().await;
    diff_mock.assert_async().await;
}

#[tokio::test]
#[serial]
async fn test_create_pull_request_invalidates_cached_listing() {
    let mut server = mockito::Server::new_async().await;
    let list_mock = server
        .mock("GET", "/2.0/repositories/acme/widget-service/pullrequests")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(r#"{"values": [], "next": null}"#)
        .expect(2)
        .create_async()
        .await;
    server
        .mock("POST", "/2.0/repositories/acme/widget-service/pullrequests")
        .with_status(201)
        .with_body(pull_request_json(8, "Add rate limiting", "rate-limit"))
        .create_async()
        .await;

    let context = test_context(&server.url());
    let location = test_location();

    functions::pull_request::list_pull_requests(&context, location.clone(), None)
        .await
        .unwrap();
    let created = functions::pull_request::create_pull_request(
        &context,
        location.clone(),
        "Add rate limiting".to_string(),
        "rate-limit".to_string(),
        "main".to_string(),
        None,
    )
    .await
    .unwrap();
    // The cached listing was purged, so this hits the API again
    functions::pull_request::list_pull_requests(&context, location, None)
        .await
        .unwrap();

    assert!(created.0.contains("## Pull Request #8: Add rate limiting"));
    list_mock.assert_async().await;
}
