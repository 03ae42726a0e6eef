use mango_dex::requests::chapter::Chapter;
use mango_dex::requests::chapter_list::ChapterList;
use mango_dex::requests::routes;
use mango_dex::{ClientConfig, DownloadOptions, MangoClient};

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_chapter(server: &MockServer, chapter_id: &str) {
    Mock::given(method("GET"))
        .and(path(routes::at_home(chapter_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "ok",
            "baseUrl": server.uri(),
            "chapter": {
                "hash": "h1",
                "data": ["1-a.png", "2-b.png"],
                "dataSaver": ["1-a.jpg", "2-b.jpg"]
            }
        })))
        .mount(server)
        .await;

    for (file, bytes) in [("1-a.png", "first"), ("2-b.png", "second")] {
        Mock::given(method("GET"))
            .and(path(format!("/data/h1/{file}")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes.as_bytes()))
            .mount(server)
            .await;
    }
}

fn chapter(id: &str) -> Chapter {
    serde_json::from_value(json!({
        "id": id,
        "type": "chapter",
        "attributes": {
            "title": "Dog & Chainsaw?",
            "volume": "1",
            "chapter": "1",
            "pages": 2,
            "translatedLanguage": "en",
            "externalUrl": null,
            "version": 1,
            "createdAt": "2022-10-11T10:00:00+00:00",
            "updatedAt": null,
            "publishAt": "2022-10-11T10:00:00+00:00",
            "readableAt": "2022-10-11T10:00:00+00:00"
        },
        "relationships": []
    }))
    .unwrap()
}

fn client(server: &MockServer) -> MangoClient {
    MangoClient::with_config(ClientConfig::builder().base_url(server.uri()).build()).unwrap()
}

#[tokio::test]
async fn pages_come_back_in_order() {
    let server = MockServer::start().await;
    mount_chapter(&server, "c1").await;

    let pages = client(&server)
        .download_chapter("c1", &DownloadOptions::default())
        .await
        .unwrap();

    assert_eq!(pages, vec!["first".as_bytes(), "second".as_bytes()]);
}

#[tokio::test]
async fn ssl_only_is_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(routes::at_home("c1")))
        .and(query_param("forcePort443", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "ok",
            "baseUrl": "https://node.example",
            "chapter": { "hash": "h1", "data": [], "dataSaver": [] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let meta = client(&server)
        .get_chapter_download_meta("c1", true)
        .await
        .unwrap();

    assert_eq!(meta.base_url, "https://node.example");
}

#[tokio::test]
async fn chapter_is_saved_to_disk() {
    let server = MockServer::start().await;
    mount_chapter(&server, "c1").await;
    let dir = tempfile::tempdir().unwrap();

    let folder = client(&server)
        .save_chapter(&chapter("c1"), None, dir.path(), &DownloadOptions::default())
        .await
        .unwrap();

    // no manga relationship, the chapter id names the manga folder
    assert_eq!(folder, dir.path().join("c1").join("1 - Dog & Chainsaw_"));
    assert_eq!(std::fs::read(folder.join("1.png")).unwrap(), b"first");
    assert_eq!(std::fs::read(folder.join("2.png")).unwrap(), b"second");
}

#[tokio::test]
async fn folder_and_file_formats_shape_the_layout() {
    let server = MockServer::start().await;
    mount_chapter(&server, "c1").await;
    let dir = tempfile::tempdir().unwrap();

    let options = DownloadOptions::builder()
        .folder_format("{chapter_num}")
        .file_format("{num0}_{name}")
        .build();
    let folder = client(&server)
        .save_chapter(&chapter("c1"), None, dir.path(), &options)
        .await
        .unwrap();

    assert_eq!(folder, dir.path().join("1"));
    assert_eq!(std::fs::read(folder.join("0_1-a.png")).unwrap(), b"first");
    assert_eq!(std::fs::read(folder.join("1_2-b.png")).unwrap(), b"second");
}

#[tokio::test]
async fn failed_chapters_do_not_fail_the_batch() {
    let server = MockServer::start().await;
    mount_chapter(&server, "c1").await;
    Mock::given(method("GET"))
        .and(path(routes::at_home("c2")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let chapters = ChapterList::new(None, vec![chapter("c1"), chapter("c2")]);
    let results = chapters
        .download_all(&client(&server), &DownloadOptions::default())
        .await;

    assert_eq!(results.len(), 2);
    assert_eq!(results["c1"].as_ref().unwrap().len(), 2);
    assert!(results["c2"].is_err());
}
