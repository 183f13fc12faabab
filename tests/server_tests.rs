//! HTTP service tests, driven through the router without a socket

#![cfg(feature = "server")]

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::{read_part, PdfBuilder};
use pdf_to_pptx::server::{router_with_store, TempStore};
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "X-PDF2PPTX-BOUNDARY";

fn sample_pdf() -> Vec<u8> {
    let mut pdf = PdfBuilder::new();
    pdf.add_page(400, 300, "0 g BT /F1 24 Tf 50 200 Td (Hello) Tj ET", &[]);
    pdf.to_bytes()
}

fn multipart_request(field: &str, file_name: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/pdf\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/convert")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn app(dir: &std::path::Path) -> Router {
    router_with_store(TempStore::open(dir).unwrap(), 10 * 1024 * 1024)
}

fn files_in(dir: &std::path::Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect()
}

#[tokio::test]
async fn test_convert_then_download_once() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let response = app
        .clone()
        .oneshot(multipart_request("file", "quarterly report.pdf", &sample_pdf()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["message"], "Conversion successful");
    let url = body["download_url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/download-result/quarterly_report-"));
    assert!(url.ends_with(".pptx"));

    // the upload is gone, only the deck is waiting
    let waiting = files_in(dir.path());
    assert_eq!(waiting.len(), 1);
    assert!(waiting[0].ends_with(".pptx"));

    let response = app.clone().oneshot(get(&url)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/vnd.openxmlformats-officedocument.presentationml.presentation"
    );
    assert!(response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .starts_with("attachment;"));
    let deck = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(read_part(&deck, "ppt/slides/slide1.xml").contains("<a:t>Hello</a:t>"));

    // second request finds nothing
    let response = app.clone().oneshot(get(&url)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["error"], "File not found");
}

#[tokio::test]
async fn test_missing_file_field() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(dir.path())
        .oneshot(multipart_request("document", "a.pdf", &sample_pdf()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());
    assert!(files_in(dir.path()).is_empty());
}

#[tokio::test]
async fn test_conversion_failure_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(dir.path())
        .oneshot(multipart_request("file", "broken.pdf", b"not a pdf at all"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json_body(response).await["error"].is_string());
    assert!(files_in(dir.path()).is_empty());
}

#[tokio::test]
async fn test_download_rejects_traversal() {
    let dir = tempfile::tempdir().unwrap();
    let store_dir = dir.path().join("store");
    std::fs::write(dir.path().join("outside.pptx"), b"secret").unwrap();
    let app = app(&store_dir);

    for uri in [
        "/download-result/..%2Foutside.pptx",
        "/download-result/%2E%2E%2Foutside.pptx",
        "/download-result/never-made.pptx",
    ] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        assert_eq!(json_body(response).await["error"], "File not found");
    }
    assert!(dir.path().join("outside.pptx").exists());
}

#[tokio::test]
async fn test_health() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(dir.path()).oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn test_cors_is_open() {
    let dir = tempfile::tempdir().unwrap();
    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app(dir.path()).oneshot(request).await.unwrap();
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}
