//! HttpGateway against a local mock NetBox.
//!
//! The gateway is blocking, so every call runs on tokio's blocking pool
//! while the mock server keeps serving on the test runtime.

use restkit::{
    AuthScheme, Collection, ErrorCategory, Filter, Gateway, GatewayConfig, HttpGateway,
    RetryConfig,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Test Helpers
// =============================================================================

fn config(uri: &str) -> GatewayConfig {
    let mut config = GatewayConfig::new(uri, "secret");
    config.timeout = Some(Duration::from_secs(5));
    config
}

fn config_with_retry(uri: &str) -> GatewayConfig {
    let mut config = config(uri);
    config.retry = RetryConfig::new(3, Duration::from_millis(10), 2.0);
    config
}

/// Run a blocking gateway call off the test runtime
async fn run<T, F>(config: GatewayConfig, call: F) -> T
where
    T: Send + 'static,
    F: FnOnce(&HttpGateway) -> T + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let gateway = HttpGateway::new(&config).unwrap();
        call(&gateway)
    })
    .await
    .unwrap()
}

async fn received(server: &MockServer, verb: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == verb)
        .count()
}

// =============================================================================
// Requests
// =============================================================================

#[tokio::test]
async fn test_ping_sends_token_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/"))
        .and(header("Authorization", "Token secret"))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ipam": "..."})))
        .expect(1)
        .mount(&server)
        .await;

    let result = run(config(&server.uri()), |g| g.ping()).await;
    assert!(result.is_ok(), "ping failed: {:?}", result.err());
}

#[tokio::test]
async fn test_bearer_scheme() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/"))
        .and(header("Authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config(&server.uri());
    config.auth_scheme = AuthScheme::Bearer;
    assert!(run(config, |g| g.ping()).await.is_ok());
}

#[tokio::test]
async fn test_query_follows_next_pages() {
    let server = MockServer::start().await;
    let next = format!("{}/api/ipam/vrfs/?limit=1&offset=1", server.uri());

    Mock::given(method("GET"))
        .and(path("/api/ipam/vrfs/"))
        .and(query_param("name", "nhc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 2,
            "next": next,
            "previous": null,
            "results": [{"id": 1, "name": "nhc"}],
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/ipam/vrfs/"))
        .and(query_param("offset", "1"))
        .and(header("Authorization", "Token secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 2,
            "next": null,
            "previous": null,
            "results": [{"id": 2, "name": "nhc"}],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let records = run(config(&server.uri()), |g| {
        g.query(Collection::Vrfs, &Filter::new().eq("name", "nhc"))
    })
    .await
    .unwrap();

    let ids: Vec<_> = records.iter().filter_map(|r| r.id()).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn test_create_posts_to_collection() {
    let server = MockServer::start().await;
    let body = json!({"name": "datacenter", "slug": "datacenter", "description": ""});

    Mock::given(method("POST"))
        .and(path("/api/ipam/roles/"))
        .and(header("Authorization", "Token secret"))
        .and(body_json(body.clone()))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 7,
            "name": "datacenter",
            "slug": "datacenter",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let record = run(config(&server.uri()), move |g| g.create(Collection::Roles, &body))
        .await
        .unwrap();
    assert_eq!(record.id(), Some(7));
}

#[tokio::test]
async fn test_update_patches_record_url() {
    let server = MockServer::start().await;
    let body = json!({"name": "DCN", "slug": "dcn", "description": "Datacenter", "parent": null});

    Mock::given(method("PATCH"))
        .and(path("/api/tenancy/tenant-groups/12/"))
        .and(body_json(body.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 12,
            "name": "DCN",
            "description": "Datacenter",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let record = run(config(&server.uri()), move |g| {
        g.update(Collection::TenantGroups, 12, &body)
    })
    .await
    .unwrap();
    assert_eq!(record.id(), Some(12));
    assert_eq!(record.str_field("description"), Some("Datacenter"));
}

// =============================================================================
// Error Classification
// =============================================================================

#[tokio::test]
async fn test_4xx_is_client_error_with_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/extras/custom-field-choice-sets/"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"name": ["choice set with this name already exists."]})),
        )
        .mount(&server)
        .await;

    let err = run(config(&server.uri()), |g| {
        g.create(Collection::ChoiceSets, &json!({"name": "k8s_zone_choices"}))
    })
    .await
    .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Client);
    assert_eq!(err.status_code(), Some(400));
    assert!(err.body().unwrap().contains("already exists"));
}

#[tokio::test]
async fn test_5xx_is_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/api/ipam/vrfs/4/"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;

    let err = run(config(&server.uri()), |g| {
        g.update(Collection::Vrfs, 4, &json!({"name": "nhc"}))
    })
    .await
    .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Server);
    assert_eq!(err.status_code(), Some(503));
    assert_eq!(err.body(), Some("Service Unavailable"));
}

#[tokio::test]
async fn test_unparseable_success_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/ipam/prefixes/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let err = run(config(&server.uri()), |g| {
        g.query(Collection::Prefixes, &Filter::new())
    })
    .await
    .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Decode);
    assert_eq!(err.status_code(), Some(200));
    assert_eq!(err.body(), Some("<html>login</html>"));
}

// =============================================================================
// Retry
// =============================================================================

#[tokio::test]
async fn test_create_is_sent_once_on_server_error() {
    let server = MockServer::start().await;

    // A 502 from a proxy after NetBox already committed the record
    Mock::given(method("POST"))
        .and(path("/api/ipam/prefixes/"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/ipam/prefixes/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 9})))
        .expect(0)
        .mount(&server)
        .await;

    let err = run(config_with_retry(&server.uri()), |g| {
        g.create(Collection::Prefixes, &json!({"prefix": "10.0.0.0/8"}))
    })
    .await
    .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Server);
    assert_eq!(received(&server, "POST").await, 1);
}

#[tokio::test]
async fn test_update_is_retried_on_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/api/ipam/prefixes/9/"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/api/ipam/prefixes/9/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 9})))
        .mount(&server)
        .await;

    let record = run(config_with_retry(&server.uri()), |g| {
        g.update(Collection::Prefixes, 9, &json!({"prefix": "10.0.0.0/8"}))
    })
    .await
    .unwrap();

    assert_eq!(record.id(), Some(9));
    assert_eq!(received(&server, "PATCH").await, 2);
}

#[tokio::test]
async fn test_query_is_retried_but_not_on_client_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/ipam/roles/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/ipam/roles/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"next": null, "results": []})),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/ipam/vrfs/"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"detail": "Invalid token"})))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let (roles, vrfs) = run(config_with_retry(&uri), |g| {
        (
            g.query(Collection::Roles, &Filter::new()),
            g.query(Collection::Vrfs, &Filter::new()),
        )
    })
    .await;

    assert!(roles.unwrap().is_empty());
    assert_eq!(vrfs.unwrap_err().category(), ErrorCategory::Client);
}
