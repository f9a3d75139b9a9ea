use std::num::NonZeroUsize;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use roster::application::clients::ClientService;
use roster::infra::cache::LruTtlCache;
use roster::infra::events::InProcessEventBus;
use roster::infra::http::{ApiState, REQUEST_ID_HEADER, build_router};
use roster::infra::memory::InMemoryClientsRepo;

struct TestApp {
    router: Router,
    bus: Arc<InProcessEventBus>,
}

fn app() -> TestApp {
    let store = Arc::new(InMemoryClientsRepo::new());
    let cache = Arc::new(LruTtlCache::new(
        NonZeroUsize::new(64).expect("capacity"),
    ));
    let bus = Arc::new(InProcessEventBus::new(
        NonZeroUsize::new(64).expect("capacity"),
    ));
    let service = ClientService::new(store.clone(), store, cache, bus.clone());
    let router = build_router(ApiState::new(Arc::new(service)));
    TestApp { router, bus }
}

impl TestApp {
    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    async fn create(&self, name: &str, email: &str) -> Value {
        let (status, body) = self
            .send(
                Method::POST,
                "/clients",
                Some(json!({ "name": name, "email": email, "phone": "11223344556" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["client"].clone()
    }

    fn topics(&self) -> Vec<String> {
        self.bus
            .published()
            .into_iter()
            .map(|message| message.topic)
            .collect()
    }
}

#[tokio::test]
async fn create_returns_the_client_and_publishes_an_event() {
    let app = app();

    let client = app.create("John Doe", "j.doe@email.com").await;

    assert_eq!(client["name"], "John Doe");
    assert_eq!(client["email"], "j.doe@email.com");
    assert!(client["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert!(client["createdAt"].is_string());

    let published = app.bus.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].topic, "client.created");
    assert_eq!(
        published[0].payload,
        json!({ "id": client["id"], "name": "John Doe" })
    );
}

#[tokio::test]
async fn create_with_missing_fields_is_a_validation_error() {
    let app = app();

    let (status, body) = app
        .send(
            Method::POST,
            "/clients",
            Some(json!({ "name": "John Doe", "email": "" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
    assert!(app.bus.published().is_empty());
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let app = app();
    app.create("Ana", "ana@example.com").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/clients",
            Some(json!({ "name": "Other", "email": "ana@example.com", "phone": "1" })),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "conflict");
    assert_eq!(app.topics(), vec!["client.created"]);
}

#[tokio::test]
async fn unknown_client_is_not_found() {
    let app = app();

    let (status, body) = app.send(Method::GET, "/clients/ghost", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn blank_id_is_a_validation_error() {
    let app = app();

    let (status, _) = app.send(Method::DELETE, "/clients/%20", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.send(Method::GET, "/clients/%20", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reads_after_update_see_the_new_values() {
    let app = app();
    let client = app.create("Ana", "ana@example.com").await;
    let id = client["id"].as_str().expect("id").to_string();
    let uri = format!("/clients/{id}");

    // Warm both cache keys.
    let (status, _) = app.send(Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(Method::GET, "/clients", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(Method::PUT, &uri, Some(json!({ "name": "Bea" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["client"]["name"], "Bea");
    assert_eq!(body["client"]["email"], "ana@example.com");

    let (_, fetched) = app.send(Method::GET, &uri, None).await;
    assert_eq!(fetched["client"]["name"], "Bea");

    let (_, listed) = app.send(Method::GET, "/clients", None).await;
    assert_eq!(listed["clients"][0]["name"], "Bea");

    assert_eq!(app.topics(), vec!["client.created", "client.updated"]);
}

#[tokio::test]
async fn update_with_blank_field_is_rejected() {
    let app = app();
    let client = app.create("Ana", "ana@example.com").await;
    let uri = format!("/clients/{}", client["id"].as_str().expect("id"));

    let (status, body) = app
        .send(Method::PUT, &uri, Some(json!({ "phone": "  " })))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
}

#[tokio::test]
async fn update_of_unknown_client_is_not_found() {
    let app = app();

    let (status, _) = app
        .send(Method::PUT, "/clients/ghost", Some(json!({ "name": "Bea" })))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(app.bus.published().is_empty());
}

#[tokio::test]
async fn delete_removes_the_client_from_every_read() {
    let app = app();
    let client = app.create("Ana", "ana@example.com").await;
    app.create("Bea", "bea@example.com").await;
    let uri = format!("/clients/{}", client["id"].as_str().expect("id"));

    let (_, listed) = app.send(Method::GET, "/clients", None).await;
    assert_eq!(listed["clients"].as_array().map(Vec::len), Some(2));

    let (status, body) = app.send(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["client"]["id"], client["id"]);

    let (status, _) = app.send(Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = app.send(Method::GET, "/clients", None).await;
    assert_eq!(listed["clients"].as_array().map(Vec::len), Some(1));

    let last = app.bus.published().pop().expect("delete event");
    assert_eq!(last.topic, "client.deleted");
    assert_eq!(last.payload, json!({ "id": client["id"] }));
}

#[tokio::test]
async fn health_endpoints_respond_without_a_database() {
    let app = app();

    let (status, _) = app.send(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.send(Method::GET, "/health/db", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = app();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
}

#[tokio::test]
async fn malformed_json_bodies_use_the_error_envelope() {
    let app = app();

    for (uri, method) in [("/clients", Method::POST), ("/clients/abc", Method::PUT)] {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from("{\"name\": "))
            .expect("request");
        let response = app
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let body: Value = serde_json::from_slice(&bytes).expect("json envelope");
        assert_eq!(body["error"]["code"], "validation_error");
        assert!(body["error"]["hint"].is_string());
    }
    assert!(app.bus.published().is_empty());
}

#[tokio::test]
async fn missing_content_type_uses_the_error_envelope() {
    let app = app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/clients")
        .body(Body::from(r#"{"name":"Ana"}"#))
        .expect("request");
    let response = app
        .router
        .clone()
        .oneshot(request)
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let body: Value = serde_json::from_slice(&bytes).expect("json envelope");
    assert_eq!(body["error"]["code"], "validation_error");
}
