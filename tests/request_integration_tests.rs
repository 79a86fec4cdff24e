//! End-to-end request tests against a mock HTTP server.

mod common;

use common::{init_local_service, temp_db};
use rest_cli::config::location::Location;
use rest_cli::config::settings::Settings;
use rest_cli::engine::{execute, HttpTransport};
use rest_cli::hooks::ShellHookEngine;
use rest_cli::invocation::{HttpMethod, RequestCall};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, Respond, ResponseTemplate};

fn call(method: HttpMethod, path: &str, data: &str) -> RequestCall {
    RequestCall {
        service: None,
        method,
        path: path.to_string(),
        data: data.to_string(),
        alias: None,
        cli: Settings::new(),
        no_headers: false,
        no_queries: false,
    }
}

fn pairs(items: &[(&str, &str)]) -> BTreeMap<String, String> {
    items
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

/// A responder that fails N times with a given status code, then succeeds
struct FailThenSucceed {
    fail_count: usize,
    fail_status: u16,
    call_count: Arc<AtomicUsize>,
}

impl Respond for FailThenSucceed {
    fn respond(&self, _request: &wiremock::Request) -> ResponseTemplate {
        let count = self.call_count.fetch_add(1, Ordering::SeqCst);
        if count < self.fail_count {
            ResponseTemplate::new(self.fail_status)
        } else {
            ResponseTemplate::new(200).set_body_json(json!({ "id": "123" }))
        }
    }
}

#[tokio::test]
async fn test_path_parameters_and_headers_are_substituted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/users/42"))
        .and(header("x-user", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_string("found"))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, db) = temp_db();
    let stored = Settings {
        base_path: Some("/v1".into()),
        headers: pairs(&[("X-User", "{{id}}"), ("X-Trace", ":trace")]),
        parameters: pairs(&[("id", "42")]),
        ..Settings::new()
    };
    let manager = init_local_service(&db, server.address().port(), &stored);

    let outcome = execute(
        manager.store(),
        &HttpTransport::new().unwrap(),
        &ShellHookEngine,
        &call(HttpMethod::Get, "/users/:id", ""),
    )
    .await
    .unwrap();
    assert_eq!(outcome.display, b"found");
    assert_eq!(outcome.exit_code, 0);

    let requests = server.received_requests().await.unwrap();
    assert!(
        requests[0].headers.get("x-trace").is_none(),
        "unresolved header must not be sent"
    );
}

#[tokio::test]
async fn test_basic_auth_and_query_merge() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(header("authorization", "Basic YW5uOnB3"))
        .and(query_param("page", "2"))
        .and(query_param("sort", "asc"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, db) = temp_db();
    let stored = Settings {
        username: Some("ann".into()),
        password: Some("pw".into()),
        queries: pairs(&[("page", "2")]),
        ..Settings::new()
    };
    let manager = init_local_service(&db, server.address().port(), &stored);

    let outcome = execute(
        manager.store(),
        &HttpTransport::new().unwrap(),
        &ShellHookEngine,
        &call(HttpMethod::Get, "/items?page=1&sort=asc", ""),
    )
    .await
    .unwrap();
    assert_eq!(outcome.status, 200);
}

#[tokio::test]
async fn test_empty_data_sends_no_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/full"))
        .and(body_string("{\"name\":\"Ann\"}"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, db) = temp_db();
    let manager = init_local_service(&db, server.address().port(), &Settings::new());
    let transport = HttpTransport::new().unwrap();

    execute(
        manager.store(),
        &transport,
        &ShellHookEngine,
        &call(HttpMethod::Post, "/empty", ""),
    )
    .await
    .unwrap();
    let outcome = execute(
        manager.store(),
        &transport,
        &ShellHookEngine,
        &call(HttpMethod::Post, "/full", "{\"name\":\"Ann\"}"),
    )
    .await
    .unwrap();
    assert_eq!(outcome.exit_code, 0);

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].body.is_empty());
    assert!(requests[0].headers.get("content-length").map_or(true, |v| v == "0"));
}

#[tokio::test]
async fn test_binary_body_is_returned_byte_for_byte() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/logo.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xff, 0xd8, 0x00, 0x41]))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, db) = temp_db();
    let manager = init_local_service(&db, server.address().port(), &Settings::new());

    let outcome = execute(
        manager.store(),
        &HttpTransport::new().unwrap(),
        &ShellHookEngine,
        &call(HttpMethod::Get, "/logo.jpg", ""),
    )
    .await
    .unwrap();
    assert_eq!(outcome.display, vec![0xff, 0xd8, 0x00, 0x41]);
}

#[tokio::test]
async fn test_pretty_output_keeps_large_integers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/big"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"id":12345678901234567890123}"#),
        )
        .mount(&server)
        .await;

    let (_dir, db) = temp_db();
    let stored = Settings {
        pretty: Some(true),
        ..Settings::new()
    };
    let manager = init_local_service(&db, server.address().port(), &stored);

    let outcome = execute(
        manager.store(),
        &HttpTransport::new().unwrap(),
        &ShellHookEngine,
        &call(HttpMethod::Get, "/big", ""),
    )
    .await
    .unwrap();
    assert_eq!(
        String::from_utf8(outcome.display).unwrap(),
        "{\n\t\"id\": 12345678901234567890123\n}"
    );
}

#[tokio::test]
async fn test_no_headers_flag_suppresses_stored_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/plain"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (_dir, db) = temp_db();
    let stored = Settings {
        headers: pairs(&[("X-Api-Key", "secret")]),
        ..Settings::new()
    };
    let manager = init_local_service(&db, server.address().port(), &stored);

    let mut request = call(HttpMethod::Get, "/plain", "");
    request.no_headers = true;
    execute(
        manager.store(),
        &HttpTransport::new().unwrap(),
        &ShellHookEngine,
        &request,
    )
    .await
    .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("x-api-key").is_none());
}

#[tokio::test]
async fn test_retry_succeeds_after_transient_503_errors() {
    let server = MockServer::start().await;
    let call_count = Arc::new(AtomicUsize::new(0));
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(FailThenSucceed {
            fail_count: 2,
            fail_status: 503,
            call_count: call_count.clone(),
        })
        .expect(3)
        .mount(&server)
        .await;

    let (_dir, db) = temp_db();
    let manager = init_local_service(&db, server.address().port(), &Settings::new());

    let outcome = execute(
        manager.store(),
        &HttpTransport::new().unwrap(),
        &ShellHookEngine,
        &call(HttpMethod::Get, "/flaky", ""),
    )
    .await
    .unwrap();
    assert_eq!(call_count.load(Ordering::SeqCst), 3);
    assert_eq!(outcome.exit_code, 0);
}

#[tokio::test]
async fn test_retry_exhausted_returns_last_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .expect(3)
        .mount(&server)
        .await;

    let (_dir, db) = temp_db();
    let stored = Settings {
        retries: Some(2),
        ..Settings::new()
    };
    let manager = init_local_service(&db, server.address().port(), &stored);

    let outcome = execute(
        manager.store(),
        &HttpTransport::new().unwrap(),
        &ShellHookEngine,
        &call(HttpMethod::Get, "/down", ""),
    )
    .await
    .unwrap();
    assert_eq!(outcome.status, 503);
    assert_eq!(outcome.exit_code, 5);
    assert_eq!(outcome.display, b"unavailable");
}

#[tokio::test]
async fn test_method_settings_apply_only_to_their_method() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .and(header("x-role", "admin"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (_dir, db) = temp_db();
    let manager = init_local_service(&db, server.address().port(), &Settings::new());
    let post = Location::from_parts("api", Some("/users"), Some("POST"), None).unwrap();
    manager
        .set(
            &post,
            &Settings {
                headers: pairs(&[("X-Role", "admin")]),
                ..Settings::new()
            },
        )
        .unwrap();

    let transport = HttpTransport::new().unwrap();
    execute(
        manager.store(),
        &transport,
        &ShellHookEngine,
        &call(HttpMethod::Post, "/users", ""),
    )
    .await
    .unwrap();
    execute(
        manager.store(),
        &transport,
        &ShellHookEngine,
        &call(HttpMethod::Get, "/users", ""),
    )
    .await
    .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].headers.get("x-role").is_none());
}

#[tokio::test]
async fn test_set_parameter_is_idempotent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "abc" })))
        .expect(2)
        .mount(&server)
        .await;

    let (_dir, db) = temp_db();
    let stored = Settings {
        set_parameters: pairs(&[("parameters.token", "token")]),
        ..Settings::new()
    };
    let manager = init_local_service(&db, server.address().port(), &stored);
    let transport = HttpTransport::new().unwrap();

    for _ in 0..2 {
        execute(
            manager.store(),
            &transport,
            &ShellHookEngine,
            &call(HttpMethod::Post, "/login", ""),
        )
        .await
        .unwrap();
        let lines = manager.config(Some("api"), Some("parameters")).unwrap();
        assert_eq!(lines, vec!["token: abc".to_string()]);
    }
}
