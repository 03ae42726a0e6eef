use mango_dex::requests::routes;
use mango_dex::requests::scanlation_group::ScanlationGroup;
use mango_dex::{ClientConfig, MangoClient, Pager};

use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn group(n: usize) -> Value {
    json!({
        "id": format!("g{n}"),
        "type": "scanlation_group",
        "attributes": {
            "name": format!("Group {n}"),
            "altNames": [],
            "website": null,
            "discord": null,
            "contactEmail": null,
            "description": null,
            "twitter": null,
            "focusedLanguages": ["en"],
            "locked": false,
            "official": false,
            "verified": false,
            "inactive": false,
            "version": 1,
            "createdAt": "2021-04-19T21:45:59+00:00",
            "updatedAt": "2021-04-19T21:45:59+00:00"
        },
        "relationships": []
    })
}

fn page(offset: usize, count: usize, total: usize) -> Value {
    json!({
        "result": "ok",
        "response": "collection",
        "data": (offset..offset + count).map(group).collect::<Vec<_>>(),
        "limit": count,
        "offset": offset,
        "total": total
    })
}

async fn mount_page(server: &MockServer, offset: usize, count: usize, total: usize) {
    Mock::given(method("GET"))
        .and(path(routes::GROUP))
        .and(query_param("offset", offset.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(offset, count, total)))
        .expect(1)
        .mount(server)
        .await;
}

fn client(server: &MockServer) -> MangoClient {
    MangoClient::with_config(ClientConfig::builder().base_url(server.uri()).build()).unwrap()
}

#[tokio::test]
async fn remaining_pages_are_fetched_in_order() {
    let server = MockServer::start().await;
    mount_page(&server, 0, 100, 250).await;
    mount_page(&server, 100, 100, 250).await;
    mount_page(&server, 200, 50, 250).await;

    let client = client(&server);
    let groups = Pager::<ScanlationGroup>::builder()
        .client(client.clone())
        .path(routes::GROUP)
        .build()
        .as_list()
        .await
        .unwrap();

    let ids: Vec<String> = groups.into_iter().map(|group| group.id).collect();
    let expected: Vec<String> = (0..250).map(|n| format!("g{n}")).collect();
    assert_eq!(ids, expected);

    assert_eq!(server.received_requests().await.unwrap().len(), 3);
    assert_eq!(client.registry().len::<ScanlationGroup>(), 250);
}

#[tokio::test]
async fn limit_reaching_the_total_needs_one_request() {
    let server = MockServer::start().await;
    mount_page(&server, 100, 50, 150).await;

    let groups = Pager::<ScanlationGroup>::builder()
        .client(client(&server))
        .path(routes::GROUP)
        .offset(100)
        .limit(50)
        .build()
        .as_list()
        .await
        .unwrap();

    assert_eq!(groups.len(), 50);
    assert_eq!(groups[0].id, "g100");
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn limit_caps_the_items() {
    let server = MockServer::start().await;
    mount_page(&server, 0, 100, 1000).await;
    mount_page(&server, 100, 100, 1000).await;

    let groups = Pager::<ScanlationGroup>::builder()
        .client(client(&server))
        .path(routes::GROUP)
        .limit(150)
        .build()
        .as_list()
        .await
        .unwrap();

    assert_eq!(groups.len(), 150);
    assert_eq!(groups.last().unwrap().id, "g149");
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn no_content_ends_the_listing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(routes::GROUP))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut pager = Pager::<ScanlationGroup>::builder()
        .client(client(&server))
        .path(routes::GROUP)
        .build();

    assert!(pager.next().await.is_none());
    assert!(pager.is_exhausted());
}

#[tokio::test]
async fn errors_end_the_listing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(routes::GROUP))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "result": "error",
            "errors": [{ "title": "Bad request", "detail": "offset is too large" }]
        })))
        .mount(&server)
        .await;

    let mut pager = Pager::<ScanlationGroup>::builder()
        .client(client(&server))
        .path(routes::GROUP)
        .build();

    let err = pager.next().await.unwrap().unwrap_err();
    assert_eq!(err.to_string(), "HTTP 400: Bad request: offset is too large");
    assert!(pager.next().await.is_none());
}
