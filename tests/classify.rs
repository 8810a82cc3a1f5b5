mod common;

use common::url;
use mediascrape::classifier::{Classifier, ClassifyError};
use mediascrape::models::MediaKind;
use mediascrape::registry::{NameRegistry, RegistryError};
use reqwest::{Client, Url};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn classifier(dir: &std::path::Path) -> Classifier {
    Classifier::new(Client::new(), Arc::new(NameRegistry::new(dir)))
}

async fn head(server: &MockServer, route: &str, template: ResponseTemplate) {
    Mock::given(method("HEAD"))
        .and(path(route))
        .respond_with(template)
        .mount(server)
        .await;
}

#[tokio::test]
async fn image_without_name_hint_gets_subtype_extension() {
    let server = MockServer::start().await;
    head(&server, "/150x150", ResponseTemplate::new(200).insert_header("content-type", "image/png")).await;

    let dir = tempfile::tempdir().unwrap();
    let job = classifier(dir.path())
        .classify(&url(&server, "/150x150"))
        .await
        .unwrap();

    assert_eq!(job.kind, MediaKind::Image);
    assert!(!job.segmented);
    assert_eq!(job.file_name, "150x150.png");
    assert_eq!(job.destination, dir.path().join("150x150.png"));
}

#[tokio::test]
async fn playlist_content_type_wins_over_path_extension() {
    let server = MockServer::start().await;
    head(
        &server,
        "/clip.mp4",
        ResponseTemplate::new(200).insert_header("content-type", "application/vnd.apple.mpegurl"),
    )
    .await;
    head(
        &server,
        "/live/index.m3u8",
        ResponseTemplate::new(200).insert_header("content-type", "application/x-mpegURL"),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let classifier = classifier(dir.path());

    let job = classifier.classify(&url(&server, "/clip.mp4")).await.unwrap();
    assert_eq!(job.kind, MediaKind::Video);
    assert!(job.segmented);

    let job = classifier.classify(&url(&server, "/live/index.m3u8")).await.unwrap();
    assert!(job.segmented);
    assert_eq!(job.file_name, "index.ts");
}

#[tokio::test]
async fn content_disposition_names_the_file() {
    let server = MockServer::start().await;
    head(
        &server,
        "/download",
        ResponseTemplate::new(200)
            .insert_header("content-type", "video/webm")
            .insert_header("content-disposition", "attachment; filename=\"holiday.webm\""),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let probe = classifier(dir.path())
        .probe(&Url::parse(&url(&server, "/download")).unwrap())
        .await
        .unwrap();
    assert_eq!(probe.file_name, "holiday.webm");
    assert_eq!(probe.kind, MediaKind::Video);
}

#[tokio::test]
async fn falls_back_to_get_when_head_is_refused() {
    let server = MockServer::start().await;
    head(&server, "/img", ResponseTemplate::new(405)).await;
    Mock::given(method("GET"))
        .and(path("/img"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"GIF89a".to_vec(), "image/gif"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let job = classifier(dir.path()).classify(&url(&server, "/img")).await.unwrap();
    assert_eq!(job.file_name, "img.gif");
}

#[tokio::test]
async fn error_status_is_a_network_failure() {
    let server = MockServer::start().await;
    head(&server, "/gone.png", ResponseTemplate::new(410)).await;

    let dir = tempfile::tempdir().unwrap();
    let err = classifier(dir.path())
        .classify(&url(&server, "/gone.png"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClassifyError::Status { status, .. } if status.as_u16() == 410));
}

#[tokio::test]
async fn missing_content_type_is_unsupported() {
    let server = MockServer::start().await;
    head(&server, "/blob", ResponseTemplate::new(200)).await;

    let dir = tempfile::tempdir().unwrap();
    let err = classifier(dir.path())
        .classify(&url(&server, "/blob"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClassifyError::UnsupportedType(_)));
}

#[tokio::test]
async fn reservation_failure_surfaces_as_name_error() {
    let server = MockServer::start().await;
    head(&server, "/a.png", ResponseTemplate::new(200).insert_header("content-type", "image/png")).await;

    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(NameRegistry::new(dir.path()));
    for _ in 0..mediascrape::registry::MAX_DUPLICATE_ATTEMPTS {
        registry.reserve("a.png").await.unwrap();
    }

    let err = Classifier::new(Client::new(), registry)
        .classify(&url(&server, "/a.png"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClassifyError::Name(RegistryError::ExhaustedAttempts(_))));
}
