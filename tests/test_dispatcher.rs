use mango_dex::requests::manga::MangaFeedQuery;
use mango_dex::requests::query_utils::EntityType;
use mango_dex::requests::routes;
use mango_dex::requests::session::SessionState;
use mango_dex::{ApiRequest, ClientConfig, Error, MangoClient};

use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn group_response(id: &str) -> Value {
    json!({
        "result": "ok",
        "response": "entity",
        "data": {
            "id": id,
            "type": "scanlation_group",
            "attributes": {
                "name": "Band of Readers",
                "altNames": [],
                "website": null,
                "discord": null,
                "contactEmail": null,
                "description": null,
                "twitter": null,
                "focusedLanguages": ["en"],
                "locked": false,
                "official": false,
                "verified": true,
                "inactive": false,
                "version": 3,
                "createdAt": "2021-04-19T21:45:59+00:00",
                "updatedAt": "2022-01-01T00:00:00+00:00"
            },
            "relationships": []
        }
    })
}

fn token_response(session: &str, refresh: &str) -> Value {
    json!({
        "result": "ok",
        "token": { "session": session, "refresh": refresh }
    })
}

fn anonymous_client(server: &MockServer) -> MangoClient {
    MangoClient::with_config(ClientConfig::builder().base_url(server.uri()).build()).unwrap()
}

fn refreshing_client(server: &MockServer) -> MangoClient {
    let config = ClientConfig::builder()
        .base_url(server.uri())
        .refresh_token("r1")
        .build();

    MangoClient::with_config(config).unwrap()
}

#[tokio::test]
async fn ping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(routes::PING))
        .respond_with(ResponseTemplate::new(200).set_body_string("pong"))
        .expect(1)
        .mount(&server)
        .await;

    anonymous_client(&server).ping().await.unwrap();
}

#[tokio::test]
async fn rejected_token_is_refreshed_and_request_replayed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(routes::REFRESH))
        .and(body_json(json!({ "token": "r1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response("s1", "r2")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(routes::REFRESH))
        .and(body_json(json!({ "token": "r2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response("s2", "r3")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(routes::group("g1")))
        .and(header("authorization", "Bearer s1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(routes::group("g1")))
        .and(header("authorization", "Bearer s2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(group_response("g1")))
        .expect(1)
        .mount(&server)
        .await;

    let client = refreshing_client(&server);
    let group = client.get_scanlation_group("g1").await.unwrap();

    assert_eq!(group.name, "Band of Readers");
    assert_eq!(client.session().refresh_token().as_deref(), Some("r3"));
    assert_eq!(
        client.session_state().await,
        SessionState::Authenticated { expired: false }
    );
}

#[tokio::test]
async fn second_rejection_is_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(routes::REFRESH))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response("s1", "r1")))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(routes::group("g1")))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let err = refreshing_client(&server)
        .get_scanlation_group("g1")
        .await
        .unwrap_err();

    match err {
        Error::UnauthorizedError { method, path } => {
            assert_eq!(method, "GET");
            assert_eq!(path, "/group/g1");
        }
        other => panic!("expected an unauthorized error, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_entity_is_invalid_reference() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(routes::group("nope")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "result": "error",
            "errors": [{ "status": 404, "title": "Not found", "detail": "Group could not be found" }]
        })))
        .mount(&server)
        .await;

    let err = anonymous_client(&server)
        .get_scanlation_group("nope")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::InvalidReferenceError { ref id, entity: EntityType::ScanlationGroup } if id == "nope"
    ));
}

#[tokio::test]
async fn error_messages_are_composed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(routes::group("g1")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "result": "error",
            "errors": [
                { "title": "Bad request", "detail": "first" },
                { "title": "Bad request", "detail": "second" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(routes::group("g2")))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = anonymous_client(&server);

    let err = client.get_scanlation_group("g1").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "HTTP 400: Bad request: first\nBad request: second"
    );
    assert!(!err.is_transient());

    let err = client.get_scanlation_group("g2").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("HTTP 503: HTTP Error on GET for {}/group/g2.", server.uri())
    );
    assert!(err.is_transient());
}

#[tokio::test]
async fn too_many_requests_is_rate_limit_error() {
    let server = MockServer::start().await;
    let reset = chrono::Utc::now().timestamp();
    Mock::given(method("GET"))
        .and(path(routes::group("g1")))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("X-RateLimit-Remaining", "0")
                .insert_header("X-RateLimit-Retry-After", reset.to_string().as_str()),
        )
        .mount(&server)
        .await;

    let err = anonymous_client(&server)
        .get_scanlation_group("g1")
        .await
        .unwrap_err();

    match err {
        Error::RateLimitError {
            path, remaining, ..
        } => {
            assert_eq!(path, "/group/g1");
            assert_eq!(remaining, 0);
        }
        other => panic!("expected a rate limit error, got {other:?}"),
    }
}

#[tokio::test]
async fn anonymous_session_never_sends_authenticated_requests() {
    let server = MockServer::start().await;
    let client = anonymous_client(&server);

    let err = client
        .followed_manga_feed(&MangaFeedQuery::default())
        .unwrap_err();
    assert!(matches!(err, Error::UnauthorizedError { .. }));

    assert!(matches!(
        client.login().await,
        Err(Error::UnauthorizedError { .. })
    ));
    assert_eq!(client.session_state().await, SessionState::Anonymous);

    assert!(server.received_requests().await.unwrap().is_empty());
}

fn impatient_client(server: &MockServer, retries: usize) -> MangoClient {
    let config = ClientConfig::builder()
        .base_url(server.uri())
        .timeout_ms(200)
        .retries(retries)
        .build();

    MangoClient::with_config(config).unwrap()
}

#[tokio::test]
async fn timed_out_reads_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(routes::group("g1")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(group_response("g1"))
                .set_delay(Duration::from_secs(5)),
        )
        .expect(3)
        .mount(&server)
        .await;

    let err = impatient_client(&server, 2)
        .get_scanlation_group("g1")
        .await
        .unwrap_err();

    assert!(err.is_transient(), "unexpected error {err:?}");
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn timed_out_writes_are_sent_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/report"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .expect(1)
        .mount(&server)
        .await;

    let request = ApiRequest::post("/report", json!({ "category": "manga" }));
    let err = impatient_client(&server, 2)
        .request(&request)
        .await
        .unwrap_err();

    assert!(err.is_transient(), "unexpected error {err:?}");
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}
