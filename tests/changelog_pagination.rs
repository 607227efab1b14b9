//! Changelog pagination tests.
//!
//! Uses wiremock to serve changelog pages and checks how many requests the
//! fetcher issues and what it yields.

use sonarapi::{
    get_changelog_page, get_history_of_changes_on_quality_profile, ChangelogAction,
    ChangelogQuery, ProfileSelector, SonarClient, SonarError,
};
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CHANGELOG_PATH: &str = "/api/qualityprofiles/changelog";

fn query() -> ChangelogQuery {
    ChangelogQuery::new(ProfileSelector::new("java", "Sonar way", "acme"))
}

fn event(rule: &str) -> serde_json::Value {
    serde_json::json!({
        "date": "2024-02-01T10:00:00+0000",
        "authorLogin": "jdoe",
        "action": "ACTIVATED",
        "ruleKey": rule,
        "params": {"severity": "MAJOR"}
    })
}

fn page(p: u64, ps: u64, total: u64, events: Vec<serde_json::Value>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "p": p,
        "ps": ps,
        "total": total,
        "events": events
    }))
}

#[tokio::test]
async fn test_empty_changelog_issues_one_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CHANGELOG_PATH))
        .respond_with(page(1, 50, 0, vec![]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = SonarClient::new("test-token", &mock_server.uri()).unwrap();
    let mut events = get_history_of_changes_on_quality_profile(&client, &query()).unwrap();

    assert!(events.next().await.unwrap().is_none());
    assert_eq!(events.pages_fetched(), 1);
    assert!(events.is_exhausted());
}

#[tokio::test]
async fn test_walks_every_page() {
    let mock_server = MockServer::start().await;

    for (p, rule) in [(1, "java:S1"), (2, "java:S2"), (3, "java:S3")] {
        Mock::given(method("GET"))
            .and(path(CHANGELOG_PATH))
            .and(query_param("p", p.to_string()))
            .respond_with(page(p, 1, 3, vec![event(rule)]))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let client = SonarClient::new("test-token", &mock_server.uri()).unwrap();
    let events = get_history_of_changes_on_quality_profile(&client, &query())
        .unwrap()
        .collect_all()
        .await
        .unwrap();

    let rules: Vec<_> = events.iter().filter_map(|e| e.rule_key.as_deref()).collect();
    assert_eq!(rules, vec!["java:S1", "java:S2", "java:S3"]);
    assert_eq!(events[0].action, ChangelogAction::Activated);
    assert_eq!(events[0].params["severity"], "MAJOR");
}

#[tokio::test]
async fn test_items_yielded_before_next_page_requested() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CHANGELOG_PATH))
        .and(query_param("p", "1"))
        .respond_with(page(1, 2, 4, vec![event("java:S1"), event("java:S2")]))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(CHANGELOG_PATH))
        .and(query_param("p", "2"))
        .respond_with(page(2, 2, 4, vec![event("java:S3"), event("java:S4")]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = SonarClient::new("test-token", &mock_server.uri()).unwrap();
    let mut events = get_history_of_changes_on_quality_profile(&client, &query()).unwrap();

    events.next().await.unwrap().unwrap();
    events.next().await.unwrap().unwrap();
    assert_eq!(events.pages_fetched(), 1);

    events.next().await.unwrap().unwrap();
    assert_eq!(events.pages_fetched(), 2);
    assert_eq!(events.cursor().total, 4);
}

#[tokio::test]
async fn test_missing_events_is_data_contract_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CHANGELOG_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "p": 1,
            "ps": 50,
            "total": 3
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = SonarClient::new("test-token", &mock_server.uri()).unwrap();
    let mut events = get_history_of_changes_on_quality_profile(&client, &query()).unwrap();

    let err = events.next().await.unwrap_err();
    assert!(matches!(err, SonarError::DataContract { ref field } if field == "events"));

    // Terminal after the error: no further requests
    assert!(events.next().await.unwrap().is_none());
    assert!(events.is_exhausted());
}

#[tokio::test]
async fn test_missing_total_is_data_contract_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CHANGELOG_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "p": 1,
            "ps": 50,
            "events": []
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = SonarClient::new("test-token", &mock_server.uri()).unwrap();
    let mut events = get_history_of_changes_on_quality_profile(&client, &query()).unwrap();

    let err = events.next().await.unwrap_err();
    assert!(matches!(err, SonarError::DataContract { ref field } if field == "total"));

    // Terminal after the error: no further requests
    assert!(events.next().await.unwrap().is_none());
    assert!(events.is_exhausted());
}

#[tokio::test]
async fn test_failure_after_first_page_ends_fetch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CHANGELOG_PATH))
        .and(query_param("p", "1"))
        .respond_with(page(1, 1, 3, vec![event("java:S1")]))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(CHANGELOG_PATH))
        .and(query_param("p", "2"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "errors": [{"msg": "An error has occurred"}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = SonarClient::new("test-token", &mock_server.uri()).unwrap();
    let mut events = get_history_of_changes_on_quality_profile(&client, &query()).unwrap();

    let first = events.next().await.unwrap().unwrap();
    assert_eq!(first.rule_key.as_deref(), Some("java:S1"));

    match events.next().await {
        Err(SonarError::ApiError {
            message,
            status_code,
        }) => {
            assert_eq!(status_code, Some(500));
            assert_eq!(message, "An error has occurred");
        }
        other => panic!("Expected ApiError, got {other:?}"),
    }

    // The fetch is over; no third request is made
    assert!(events.next().await.unwrap().is_none());
    assert!(events.is_exhausted());
}

#[tokio::test]
async fn test_fetchers_are_independent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CHANGELOG_PATH))
        .and(query_param("p", "1"))
        .respond_with(page(1, 1, 2, vec![event("java:S1")]))
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(CHANGELOG_PATH))
        .and(query_param("p", "2"))
        .respond_with(page(2, 1, 2, vec![event("java:S2")]))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = SonarClient::new("test-token", &mock_server.uri()).unwrap();
    let mut first = get_history_of_changes_on_quality_profile(&client, &query()).unwrap();
    let second = get_history_of_changes_on_quality_profile(&client, &query()).unwrap();

    // Partially drain the first fetcher before running the second
    first.next().await.unwrap().unwrap();
    let all = second.collect_all().await.unwrap();
    assert_eq!(all.len(), 2);

    let rest = first.next().await.unwrap().unwrap();
    assert_eq!(rest.rule_key.as_deref(), Some("java:S2"));
    assert!(first.next().await.unwrap().is_none());
}

#[tokio::test]
async fn test_base_params_sent_with_every_page() {
    let mock_server = MockServer::start().await;

    for p in 1..=2u64 {
        Mock::given(method("GET"))
            .and(path(CHANGELOG_PATH))
            .and(query_param("language", "java"))
            .and(query_param("qualityProfile", "Sonar way"))
            .and(query_param("organization", "acme"))
            .and(query_param("since", "2024-01-01"))
            .and(query_param("p", p.to_string()))
            .and(query_param_is_missing("ps"))
            .respond_with(page(p, 1, 2, vec![event("java:S1")]))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let client = SonarClient::new("test-token", &mock_server.uri()).unwrap();
    let mut query = query();
    query.since = Some("2024-01-01".to_string());

    let events = get_history_of_changes_on_quality_profile(&client, &query)
        .unwrap()
        .collect_all()
        .await
        .unwrap();
    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn test_page_size_sent_when_configured() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CHANGELOG_PATH))
        .and(query_param("p", "1"))
        .and(query_param("ps", "500"))
        .respond_with(page(1, 500, 1, vec![event("java:S1")]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = SonarClient::new("test-token", &mock_server.uri()).unwrap();
    let events = get_history_of_changes_on_quality_profile(&client, &query())
        .unwrap()
        .with_page_size(500)
        .collect_all()
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn test_stops_when_server_never_advances() {
    let mock_server = MockServer::start().await;

    // The server keeps echoing page 1 with more items remaining
    Mock::given(method("GET"))
        .and(path(CHANGELOG_PATH))
        .respond_with(page(1, 1, 5, vec![event("java:S1")]))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = SonarClient::new("test-token", &mock_server.uri()).unwrap();
    let mut events = get_history_of_changes_on_quality_profile(&client, &query())
        .unwrap()
        .with_max_pages(3);

    for _ in 0..3 {
        events.next().await.unwrap().unwrap();
    }
    let err = events.next().await.unwrap_err();
    assert!(matches!(err, SonarError::PaginationDidNotConverge { pages: 3 }));
    assert!(events.next().await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_single_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CHANGELOG_PATH))
        .and(query_param("p", "2"))
        .and(query_param("ps", "10"))
        .respond_with(page(2, 10, 11, vec![event("java:S11")]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = SonarClient::new("test-token", &mock_server.uri()).unwrap();
    let page = get_changelog_page(&client, &query(), 2, 10).await.unwrap();

    assert_eq!(page.len(), 1);
    assert_eq!(page.total, 11);
    assert!(!page.has_more());

    let mut rules = Vec::new();
    for event in &page {
        rules.push(event.rule_key.as_deref());
    }
    assert_eq!(rules, vec![Some("java:S11")]);
}

#[tokio::test]
async fn test_unauthorized_changelog() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CHANGELOG_PATH))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let client = SonarClient::new("bad-token", &mock_server.uri()).unwrap();
    let mut events = get_history_of_changes_on_quality_profile(&client, &query()).unwrap();

    let err = events.next().await.unwrap_err();
    assert!(matches!(err, SonarError::Unauthorized(_)));
}
