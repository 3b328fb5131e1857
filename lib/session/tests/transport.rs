//! Transport behaviour against a mock authentication API.

use headless_auth_core::Namespace;
use headless_auth_session::{
    RateLimit, RequestOptions, StoreRegistry, TransportClient, TransportError, TransportRegistry,
};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde_json::{Value, json};
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client(server: &MockServer) -> Arc<TransportClient> {
    TransportRegistry::new(StoreRegistry::in_memory())
        .client(&Namespace::default(), &server.uri())
        .await
        .expect("client")
}

#[tokio::test]
async fn token_header_attached_only_when_present() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/auth/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": 200, "data": {}})))
        .mount(&server)
        .await;

    let client = client(&server).await;
    let _: Value = client
        .request("/auth/config", RequestOptions::get())
        .await
        .expect("request without token");

    client
        .store()
        .set_session_token(Some("tok-1".to_string()))
        .await
        .expect("set token");
    let _: Value = client
        .request("/auth/config", RequestOptions::get())
        .await
        .expect("request with token");

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 2);
    assert!(requests[0].headers.get("x-session-token").is_none());
    assert_eq!(
        requests[1]
            .headers
            .get("x-session-token")
            .and_then(|v| v.to_str().ok()),
        Some("tok-1")
    );
}

#[tokio::test]
async fn json_content_type_by_default_and_caller_headers_win() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/echo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let client = client(&server).await;
    let _: Value = client
        .request("/echo", RequestOptions::post().json(&json!({"a": 1})).expect("encode"))
        .await
        .expect("default content type");
    let _: Value = client
        .request(
            "/echo",
            RequestOptions::post().header(CONTENT_TYPE, HeaderValue::from_static("text/plain")),
        )
        .await
        .expect("overridden content type");

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(
        requests[0].headers.get("content-type").and_then(|v| v.to_str().ok()),
        Some("application/json")
    );
    assert_eq!(requests[0].body, br#"{"a":1}"#);
    assert_eq!(
        requests[1].headers.get("content-type").and_then(|v| v.to_str().ok()),
        Some("text/plain")
    );
}

#[tokio::test]
async fn multipart_body_keeps_transport_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let form = reqwest::multipart::Form::new().text("field", "value");
    let _: Value = client(&server).await
        .request("/upload", RequestOptions::post().multipart(form))
        .await
        .expect("multipart request");

    let requests = server.received_requests().await.expect("recording enabled");
    let content_type = requests[0]
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .expect("content type");
    assert!(content_type.starts_with("multipart/form-data"));
}

#[tokio::test]
async fn rotated_token_is_captured_without_consuming_the_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/auth/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "data": {"user": {"is_onboarded": false}},
            "meta": {"is_authenticated": true, "session_token": "abc"}
        })))
        .mount(&server)
        .await;

    let client = client(&server).await;
    let body: Value = client
        .request("/auth/session", RequestOptions::get())
        .await
        .expect("request");

    assert_eq!(client.store().session_token().as_deref(), Some("abc"));
    assert_eq!(body["meta"]["session_token"], "abc");
    assert_eq!(body["data"]["user"]["is_onboarded"], false);
}

#[tokio::test]
async fn rotation_also_applies_to_error_responses() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "status": 401,
            "data": {"flows": [{"id": "mfa_authenticate", "is_pending": true}]},
            "meta": {"is_authenticated": false, "session_token": "pending-token"}
        })))
        .mount(&server)
        .await;

    let client = client(&server).await;
    let err = client
        .request::<Value>("/auth/login", RequestOptions::post())
        .await
        .unwrap_err();

    assert_eq!(client.store().session_token().as_deref(), Some("pending-token"));
    let api = err.current_context().api_error().expect("api error");
    assert!(api.is_unauthorized());
    assert!(api.data.is_some());
}

#[tokio::test]
async fn session_gone_clears_the_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/auth/session"))
        .respond_with(ResponseTemplate::new(410).set_body_json(json!({"status": 410})))
        .mount(&server)
        .await;

    let client = client(&server).await;
    client
        .store()
        .set_session_token(Some("stale".to_string()))
        .await
        .expect("set token");

    let err = client
        .request::<Value>("/auth/session", RequestOptions::get())
        .await
        .unwrap_err();

    assert_eq!(client.store().session_token(), None);
    assert!(
        err.current_context()
            .api_error()
            .is_some_and(|api| api.is_session_gone())
    );
}

#[tokio::test]
async fn error_body_is_the_failure_value() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/signup"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "status": 400,
            "errors": [{"code": "email_taken", "message": "A user is already registered with this email address.", "param": "email"}]
        })))
        .mount(&server)
        .await;

    let err = client(&server).await
        .request::<Value>("/auth/signup", RequestOptions::post())
        .await
        .unwrap_err();

    match err.current_context() {
        TransportError::Api(api) => {
            assert_eq!(api.status, 400);
            assert_eq!(api.error_for("email").map(|d| d.code.as_str()), Some("email_taken"));
        }
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn rate_limited_response_exposes_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/code/confirm"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "status": 429,
            "data": {"attempt": 4, "max_attempts": 5}
        })))
        .mount(&server)
        .await;

    let err = client(&server).await
        .request::<Value>("/auth/code/confirm", RequestOptions::post())
        .await
        .unwrap_err();

    let api = err.current_context().api_error().expect("api error");
    assert_eq!(
        api.rate_limit(),
        Some(RateLimit {
            attempt: 4,
            max_attempts: 5
        })
    );
}

#[tokio::test]
async fn unauthorized_is_a_result_only_when_allowed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/auth/session"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "status": 401,
            "data": {"flows": []},
            "meta": {"is_authenticated": false}
        })))
        .mount(&server)
        .await;

    let client = client(&server).await;
    let body: Value = client
        .request("/auth/session", RequestOptions::get().allow_unauthorized())
        .await
        .expect("401 accepted");
    assert_eq!(body["meta"]["is_authenticated"], false);

    let err = client
        .request::<Value>("/auth/session", RequestOptions::get())
        .await
        .unwrap_err();
    assert!(
        err.current_context()
            .api_error()
            .is_some_and(|api| api.is_unauthorized())
    );
}

#[tokio::test]
async fn non_json_error_body_still_fails_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/broken"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let err = client(&server).await
        .request::<Value>("/broken", RequestOptions::get())
        .await
        .unwrap_err();
    let api = err.current_context().api_error().expect("api error");
    assert_eq!(api.status, 502);
    assert!(api.errors.is_empty());
}

#[tokio::test]
async fn success_bodies_decode_or_report_shape_errors() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1/empty"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/text"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let client = client(&server).await;
    let empty: Option<Value> = client
        .request("/empty", RequestOptions::delete())
        .await
        .expect("empty body");
    assert!(empty.is_none());

    let err = client
        .request::<Value>("/text", RequestOptions::get())
        .await
        .unwrap_err();
    assert!(matches!(err.current_context(), TransportError::Decode { .. }));
}

#[tokio::test]
async fn query_and_json_body_reach_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/auth/password/reset"))
        .and(query_param("key", "reset-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": 200})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/code/request"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"email": "a@example.com"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": 200})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server).await;
    let _: Value = client
        .request(
            "/auth/password/reset",
            RequestOptions::get().query("key", "reset-key"),
        )
        .await
        .expect("query request");
    let _: Value = client
        .request(
            "/auth/code/request",
            RequestOptions::post()
                .json(&json!({"email": "a@example.com"}))
                .expect("encode"),
        )
        .await
        .expect("json request");
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let client = TransportRegistry::new(StoreRegistry::in_memory())
        .client(&Namespace::default(), &uri)
        .await
        .expect("client");
    let err = client
        .request::<Value>("/auth/session", RequestOptions::get())
        .await
        .unwrap_err();
    assert!(matches!(err.current_context(), TransportError::Network { .. }));
}

#[tokio::test]
async fn clients_for_one_namespace_share_rotated_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "data": {"user": {"is_onboarded": true}},
            "meta": {"is_authenticated": true, "session_token": "shared-token"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/auth/permissions"))
        .and(header("x-session-token", "shared-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"roles": []})))
        .expect(1)
        .mount(&server)
        .await;

    let registry = TransportRegistry::new(StoreRegistry::in_memory());
    let tenant = Namespace::new("tenant").expect("namespace");
    let client = registry.client(&tenant, &server.uri()).await.expect("client");
    let _: Value = client
        .request("/auth/login", RequestOptions::post())
        .await
        .expect("login");

    let other = registry.client(&Namespace::default(), &server.uri()).await.expect("client");
    assert_eq!(other.store().session_token(), None);

    let _: Value = client
        .request_root("/api/auth/permissions", RequestOptions::get())
        .await
        .expect("permissions");
}
