//! Integration tests for `ClassifierClient` against a mock HTTP service

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use serde_json::json;
use std::time::Duration;
use wastetrack_classifier::{
    Classified, Classifier, ClassifierClient, ClassifierError, ImageUpload, WasteCategory,
};
use wiremock::matchers::{header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn upload() -> ImageUpload {
    ImageUpload::jpeg(vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10])
}

async fn client_for(server: &MockServer) -> ClassifierClient {
    ClassifierClient::with_timeout(
        format!("{}/classify-image", server.uri()),
        Duration::from_secs(2),
    )
    .unwrap()
}

#[tokio::test]
async fn detected_classification_is_returned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/classify-image"))
        .and(header_regex("content-type", "^multipart/form-data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "classification": {"plastic": 2, "glass": 0, "metal": 1}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client_for(&server).await.classify(upload()).await.unwrap();

    let Classified::Detected(classification) = result else {
        panic!("expected a classification, got {result:?}");
    };
    assert_eq!(classification.get(WasteCategory::Plastic), 2);
    assert_eq!(classification.get(WasteCategory::Metal), 1);
}

#[tokio::test]
async fn upload_is_sent_as_file_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/classify-image"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"classification": {}})))
        .mount(&server)
        .await;

    client_for(&server).await.classify(upload()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"file\""));
    assert!(body.contains("filename=\"waste.jpg\""));
    assert!(body.contains("image/jpeg"));
}

#[tokio::test]
async fn error_status_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&server)
        .await;

    let result = client_for(&server).await.classify(upload()).await.unwrap();
    assert_eq!(result, Classified::Unavailable);
}

#[tokio::test]
async fn missing_field_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"labels": ["plastic"]})))
        .mount(&server)
        .await;

    let result = client_for(&server).await.classify(upload()).await.unwrap();
    assert_eq!(result, Classified::Unavailable);
}

#[tokio::test]
async fn malformed_counts_are_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"classification": {"plastic": -3}})),
        )
        .mount(&server)
        .await;

    let result = client_for(&server).await.classify(upload()).await.unwrap();
    assert_eq!(result, Classified::Unavailable);
}

#[tokio::test]
async fn non_json_body_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = client_for(&server).await.classify(upload()).await.unwrap();
    assert_eq!(result, Classified::Unavailable);
}

#[tokio::test]
async fn unreachable_service_is_an_error() {
    let server = MockServer::start().await;
    let url = format!("{}/classify-image", server.uri());
    drop(server);

    let client = ClassifierClient::with_timeout(url, Duration::from_secs(2)).unwrap();
    let result = client.classify(upload()).await;
    assert!(matches!(result, Err(ClassifierError::RequestFailed(_))));
}
