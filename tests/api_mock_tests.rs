//! Integration tests for remote partitioning using a mock HTTP server.
//! These tests don't require an API key and run without external dependencies.
//!
//! Run with: cargo test --test api_mock_tests

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;
use unstructured_loader::{
    ApiPartitioner, DocumentLoader, Error, Mode, UnstructuredLoader,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Element payload in the shape the hosted partition endpoint returns.
fn fake_elements_response() -> serde_json::Value {
    json!([
        {
            "type": "Title",
            "element_id": "b7f58c2fd9c15949a55a62eb84e39575",
            "text": "LayoutParser: A Unified Toolkit for Deep Learning Based Document Image Analysis",
            "metadata": {
                "languages": ["eng"],
                "page_number": 1,
                "filename": "layout-parser-paper.pdf",
                "filetype": "application/pdf"
            }
        },
        {
            "type": "UncategorizedText",
            "element_id": "e1c4facddf1f2eb1d0db5be34ad0de18",
            "text": "1 2 0 2",
            "metadata": {
                "languages": ["eng"],
                "page_number": 1,
                "parent_id": "b7f58c2fd9c15949a55a62eb84e39575",
                "filename": "layout-parser-paper.pdf",
                "filetype": "application/pdf"
            }
        }
    ])
}

/// Loader for a throwaway file, partitioning against the mock server.
fn create_mock_loader(dir: &TempDir, server_uri: &str) -> UnstructuredLoader {
    let file_path = dir.path().join("layout-parser-paper.pdf");
    std::fs::write(&file_path, b"%PDF-1.4 fake body").unwrap();

    let engine = ApiPartitioner::new()
        .with_api_key("test-key")
        .with_server_url(format!("{server_uri}/general/v0/general"));

    UnstructuredLoader::from_path(&file_path).with_partitioner(Arc::new(engine))
}

#[tokio::test]
async fn test_loader_partitions_via_api() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/general/v0/general"))
        .and(header("unstructured-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fake_elements_response()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let docs = create_mock_loader(&dir, &mock_server.uri())
        .load()
        .await
        .unwrap();

    assert_eq!(docs.len(), 2);
    assert!(docs[0].page_content.starts_with("LayoutParser"));
    assert_eq!(
        docs[0].get_metadata("category").unwrap().as_str().unwrap(),
        "Title"
    );
    assert_eq!(
        docs[0].get_metadata("element_id").unwrap().as_str().unwrap(),
        "b7f58c2fd9c15949a55a62eb84e39575"
    );
    assert_eq!(
        docs[1].get_metadata("category").unwrap().as_str().unwrap(),
        "UncategorizedText"
    );
    assert_eq!(
        docs[1].get_metadata("parent_id").unwrap().as_str().unwrap(),
        "b7f58c2fd9c15949a55a62eb84e39575"
    );
    // file-derived metadata rides along with engine metadata
    assert_eq!(
        docs[0].get_metadata("filename").unwrap().as_str().unwrap(),
        "layout-parser-paper.pdf"
    );
    assert!(docs[0]
        .get_metadata("source")
        .unwrap()
        .as_str()
        .unwrap()
        .ends_with("layout-parser-paper.pdf"));
}

#[tokio::test]
async fn test_mode_is_ignored_under_api_partitioning() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/general/v0/general"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fake_elements_response()))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    // Single mode would normally collapse to one document; the API engine
    // always returns element granularity, so it stays at two.
    let docs = create_mock_loader(&dir, &mock_server.uri())
        .with_mode(Mode::Single)
        .load()
        .await
        .unwrap();

    assert_eq!(docs.len(), 2);
}

#[tokio::test]
async fn test_missing_api_key_fails_before_any_request() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fake_elements_response()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let file_path = dir.path().join("doc.pdf");
    std::fs::write(&file_path, b"%PDF-1.4").unwrap();

    let engine = ApiPartitioner::new()
        .with_api_key("")
        .with_server_url(format!("{}/general/v0/general", mock_server.uri()));
    let err = UnstructuredLoader::from_path(&file_path)
        .with_partitioner(Arc::new(engine))
        .load()
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Authentication(_)));
}

#[tokio::test]
async fn test_rejected_credentials_surface_as_authentication_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/general/v0/general"))
        .respond_with(ResponseTemplate::new(401).set_body_string("API key is invalid"))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let err = create_mock_loader(&dir, &mock_server.uri())
        .load()
        .await
        .unwrap_err();

    match err {
        Error::Authentication(message) => assert!(message.contains("401")),
        other => panic!("expected Authentication error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_engine_failure_propagates_opaquely() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/general/v0/general"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let err = create_mock_loader(&dir, &mock_server.uri())
        .load()
        .await
        .unwrap_err();

    match err {
        Error::Engine(message) => {
            assert!(message.contains("500"));
            assert!(message.contains("internal error"));
        }
        other => panic!("expected Engine error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_engine_payload_is_a_serialization_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/general/v0/general"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let err = create_mock_loader(&dir, &mock_server.uri())
        .load()
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Serialization(_)));
}

#[tokio::test]
async fn test_loader_partitions_multiple_files_via_api() {
    let mock_server = MockServer::start().await;

    // The same canned response per request; ordering comes from the loader.
    Mock::given(method("POST"))
        .and(path("/general/v0/general"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fake_elements_response()))
        .expect(2)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let first = dir.path().join("first.pdf");
    let second = dir.path().join("second.pdf");
    std::fs::write(&first, b"%PDF-1.4 first").unwrap();
    std::fs::write(&second, b"%PDF-1.4 second").unwrap();

    let engine = ApiPartitioner::new()
        .with_api_key("test-key")
        .with_server_url(format!("{}/general/v0/general", mock_server.uri()));
    let docs = UnstructuredLoader::from_paths([&first, &second])
        .with_partitioner(Arc::new(engine))
        .load()
        .await
        .unwrap();

    assert_eq!(docs.len(), 4);
    assert!(docs
        .first()
        .unwrap()
        .get_metadata("source")
        .unwrap()
        .as_str()
        .unwrap()
        .ends_with("first.pdf"));
    assert!(docs
        .last()
        .unwrap()
        .get_metadata("source")
        .unwrap()
        .as_str()
        .unwrap()
        .ends_with("second.pdf"));
}

#[tokio::test]
async fn test_url_source_partitions_via_api() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/general/v0/general"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "type": "Title",
                "element_id": "fdaa78d856f9d143aeeed85bf23f58f8",
                "text": "Example Domain",
                "metadata": {
                    "languages": ["eng"],
                    "filetype": "text/html",
                    "url": "https://www.example.com/"
                }
            }
        ])))
        .mount(&mock_server)
        .await;

    let engine = ApiPartitioner::new()
        .with_api_key("test-key")
        .with_server_url(format!("{}/general/v0/general", mock_server.uri()));
    let url = url::Url::parse("https://www.example.com/").unwrap();
    let docs = UnstructuredLoader::from_url(url)
        .with_partitioner(Arc::new(engine))
        .load()
        .await
        .unwrap();

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].page_content, "Example Domain");
    assert_eq!(
        docs[0].get_metadata("url").unwrap().as_str().unwrap(),
        "https://www.example.com/"
    );
    assert_eq!(
        docs[0].get_metadata("filetype").unwrap().as_str().unwrap(),
        "text/html"
    );
    assert_eq!(
        docs[0].get_metadata("category").unwrap().as_str().unwrap(),
        "Title"
    );
}
