//! Web API File Tests
//!
//! Integration tests for upload, download, preview and QR endpoints.

use axum::http::{header, StatusCode};
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use qrdrop::config::Config;
use chrono::{DateTime, Utc};
use qrdrop::file::{BlobStore, KeyAllocator, NamingPolicy, StorageKey};
use qrdrop::web::create_router;
use qrdrop::web::handlers::AppState;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;

const PUBLIC_URL: &str = "http://drop.test";
const VIEWER: &str = "https://viewer.example.com/embed?src=";
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const MIB: usize = 1024 * 1024;

/// Create a test configuration storing files under `dir`.
fn create_test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.server.public_url = Some(PUBLIC_URL.to_string());
    config.storage.path = dir.path().join("uploads").to_string_lossy().into_owned();
    config.storage.max_upload_size_mb = 1;
    config.preview.office_viewer_url = VIEWER.to_string();
    config
}

/// Create a test server over a fresh storage directory.
async fn create_test_server_with(config: Config) -> TestServer {
    create_test_server_with_state(config, |_| {}).await
}

/// Create a test server, adjusting the application state first.
async fn create_test_server_with_state(
    config: Config,
    customize: impl FnOnce(&mut AppState),
) -> TestServer {
    let store = BlobStore::open(&config.storage.path)
        .await
        .expect("Failed to open storage");
    let mut app_state = AppState::new(&config, store);
    customize(&mut app_state);
    let router = create_router(Arc::new(app_state), &config.server);

    TestServer::new(router).expect("Failed to create test server")
}

/// Allocator handing out the same key for every upload.
#[derive(Debug)]
struct FixedKey(&'static str);

impl KeyAllocator for FixedKey {
    fn allocate_at(&self, _original_name: &str, _now: DateTime<Utc>) -> StorageKey {
        StorageKey::from(self.0)
    }
}

async fn create_test_server() -> (TestServer, TempDir) {
    let dir = TempDir::new().unwrap();
    let server = create_test_server_with(create_test_config(&dir)).await;
    (server, dir)
}

/// Build a form with a single file field.
fn file_form(filename: &str, content: impl Into<Vec<u8>>) -> MultipartForm {
    let part = Part::bytes(content.into()).file_name(filename.to_string());
    MultipartForm::new().add_part("file", part)
}

/// Upload a file and return the JSON response body.
async fn upload(server: &TestServer, filename: &str, content: &[u8]) -> Value {
    let response = server
        .post("/upload")
        .multipart(file_form(filename, content.to_vec()))
        .await;

    response.assert_status_ok();
    response.json::<Value>()
}

/// Number of entries in the storage directory.
fn stored_count(dir: &TempDir) -> usize {
    std::fs::read_dir(dir.path().join("uploads")).unwrap().count()
}

// ============================================================================
// Upload Tests
// ============================================================================

#[tokio::test]
async fn test_upload_chinese_docx_end_to_end() {
    let (server, _dir) = create_test_server().await;

    let body = upload(&server, "报告.docx", b"hello").await;

    let key = body["key"].as_str().unwrap().to_string();
    let file_url = body["fileUrl"].as_str().unwrap().to_string();

    assert!(key.starts_with("baogao_"), "{key}");
    assert!(key.ends_with(".docx"));
    assert_eq!(body["filename"], "报告.docx");
    assert_eq!(body["fileType"], ".docx");
    assert_eq!(body["size"], 5);
    assert_eq!(file_url, format!("{PUBLIC_URL}/file/{key}"));
    assert_eq!(body["previewUrl"], format!("{PUBLIC_URL}/preview/{key}"));
    assert!(body["qrCode"]
        .as_str()
        .unwrap()
        .starts_with("data:image/png;base64,"));

    // Download returns the exact bytes with the Office MIME type
    let response = server.get(&format!("/download/{key}")).await;
    response.assert_status_ok();
    assert_eq!(&response.as_bytes()[..], b"hello");
    assert_eq!(response.header(header::CONTENT_TYPE), DOCX_MIME);
    let disposition = response.header(header::CONTENT_DISPOSITION);
    assert!(disposition.to_str().unwrap().starts_with("attachment;"));

    // Preview embeds the retrieval URL in the viewer reference
    let response = server.get(&format!("/preview/{key}")).await;
    response.assert_status_ok();
    let page = response.text();
    assert!(page.contains("<iframe"));
    assert!(page.contains(&format!("{VIEWER}{}", urlencoding::encode(&file_url))));
}

#[tokio::test]
async fn test_upload_same_name_twice_gives_distinct_keys() {
    let (server, dir) = create_test_server().await;

    let first = upload(&server, "notes.txt", b"one").await;
    let second = upload(&server, "notes.txt", b"two").await;

    assert_ne!(first["key"], second["key"]);
    assert_eq!(stored_count(&dir), 2);
}

#[tokio::test]
async fn test_upload_no_file_field() {
    let (server, dir) = create_test_server().await;

    let form = MultipartForm::new().add_text("description", "no file here");
    let response = server.post("/upload").multipart(form).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "NO_FILE_PROVIDED");
    assert!(body["error"].is_string());
    assert_eq!(stored_count(&dir), 0);
}

#[tokio::test]
async fn test_upload_no_file_selected() {
    let (server, _dir) = create_test_server().await;

    let response = server.post("/upload").multipart(file_form("", "")).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "NO_FILE_PROVIDED");
}

#[tokio::test]
async fn test_upload_not_multipart() {
    let (server, _dir) = create_test_server().await;

    let response = server.post("/upload").text("just text").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_upload_empty_file() {
    let (server, dir) = create_test_server().await;

    let response = server
        .post("/upload")
        .multipart(file_form("empty.txt", Vec::new()))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "EMPTY_UPLOAD");
    assert_eq!(stored_count(&dir), 0);
}

#[tokio::test]
async fn test_upload_exactly_at_limit() {
    let (server, _dir) = create_test_server().await;

    let body = upload(&server, "exact.bin", &vec![0x5A; MIB]).await;

    assert_eq!(body["size"], MIB);
}

#[tokio::test]
async fn test_upload_one_byte_over_limit() {
    let (server, dir) = create_test_server().await;

    let response = server
        .post("/upload")
        .multipart(file_form("big.bin", vec![0u8; MIB + 1]))
        .await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = response.json();
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
    assert_eq!(stored_count(&dir), 0);
}

#[tokio::test]
async fn test_upload_far_over_limit() {
    let (server, dir) = create_test_server().await;

    let response = server
        .post("/upload")
        .multipart(file_form("huge.bin", vec![0u8; 2 * MIB]))
        .await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(stored_count(&dir), 0);
}

#[tokio::test]
async fn test_upload_raw_policy_rejects_traversal_name() {
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir);
    config.storage.naming = NamingPolicy::TimestampPrefixed;
    let server = create_test_server_with(config).await;

    let response = server
        .post("/upload")
        .multipart(file_form("../../escape.txt", "x"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(stored_count(&dir), 0);
    assert!(!dir.path().join("escape.txt").exists());
}

#[tokio::test]
async fn test_upload_raw_policy_keeps_name() {
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir);
    config.storage.naming = NamingPolicy::TimestampPrefixed;
    let server = create_test_server_with(config).await;

    let body = upload(&server, "报告.docx", b"hello").await;
    let key = body["key"].as_str().unwrap();
    assert!(key.ends_with("-报告.docx"), "{key}");

    // The link carries the percent-encoded key
    let file_url = body["fileUrl"].as_str().unwrap();
    assert!(file_url.ends_with(&*urlencoding::encode(key)));

    let path = file_url.strip_prefix(PUBLIC_URL).unwrap();
    let response = server.get(path).await;
    response.assert_status_ok();
    assert_eq!(&response.as_bytes()[..], b"hello");
}

#[tokio::test]
async fn test_upload_conflict_on_taken_key() {
    let dir = TempDir::new().unwrap();
    let server = create_test_server_with_state(create_test_config(&dir), |state| {
        state.allocator = Arc::new(FixedKey("taken.txt"));
    })
    .await;

    upload(&server, "a.txt", b"first").await;
    let response = server
        .post("/upload")
        .multipart(file_form("b.txt", "second"))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["code"], "CONFLICT");

    // The first upload is untouched and nothing else was written
    let response = server.get("/file/taken.txt").await;
    assert_eq!(&response.as_bytes()[..], b"first");
    assert_eq!(stored_count(&dir), 1);
}

#[tokio::test]
async fn test_upload_link_too_long_for_qr_code() {
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir);
    config.server.public_url = Some(format!("http://drop.test/{}", "x".repeat(4000)));
    let server = create_test_server_with(config).await;

    let response = server
        .post("/upload")
        .multipart(file_form("note.txt", "hello"))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["code"], "UNPROCESSABLE_ENTITY");
    // The stored object is removed again
    assert_eq!(stored_count(&dir), 0);
}

// ============================================================================
// Retrieval Tests
// ============================================================================

#[tokio::test]
async fn test_file_route_serves_inline() {
    let (server, _dir) = create_test_server().await;
    let body = upload(&server, "movie.mp4", b"\x00\x00\x00\x18ftyp").await;
    let key = body["key"].as_str().unwrap();

    let response = server.get(&format!("/file/{key}")).await;

    response.assert_status_ok();
    assert_eq!(response.header(header::CONTENT_TYPE), "video/mp4");
    assert_eq!(response.header(header::CONTENT_LENGTH), "8");
    assert!(response.maybe_header(header::CONTENT_DISPOSITION).is_none());
    assert_eq!(&response.as_bytes()[..], b"\x00\x00\x00\x18ftyp");
}

#[tokio::test]
async fn test_unknown_extension_is_octet_stream() {
    let (server, _dir) = create_test_server().await;
    let body = upload(&server, "data.xyz", b"\x01\x02").await;
    let key = body["key"].as_str().unwrap();

    let response = server.get(&format!("/file/{key}")).await;
    assert_eq!(
        response.header(header::CONTENT_TYPE),
        "application/octet-stream"
    );
}

#[tokio::test]
async fn test_download_not_found() {
    let (server, _dir) = create_test_server().await;

    for path in [
        "/file/missing.txt",
        "/download/missing.txt",
        "/preview/missing.txt",
        "/qr/missing.txt",
    ] {
        let response = server.get(path).await;
        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["code"], "NOT_FOUND");
    }
}

#[tokio::test]
async fn test_download_rejects_traversal() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("secret.txt"), b"top secret").unwrap();
    let server = create_test_server_with(create_test_config(&dir)).await;

    for path in [
        "/file/..%2Fsecret.txt",
        "/download/..%2F..%2Fetc%2Fpasswd",
        "/preview/..%2Fsecret.txt",
        "/file/..",
    ] {
        let response = server.get(path).await;
        assert_ne!(response.status_code(), StatusCode::OK, "{path}");
        assert!(!response.text().contains("top secret"));
    }
}

// ============================================================================
// Preview Tests
// ============================================================================

#[tokio::test]
async fn test_preview_text() {
    let (server, _dir) = create_test_server().await;
    let body = upload(&server, "note.txt", "<b>bold</b> 你好".as_bytes()).await;
    let key = body["key"].as_str().unwrap();

    let response = server.get(&format!("/preview/{key}")).await;

    response.assert_status_ok();
    assert!(response
        .header(header::CONTENT_TYPE)
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    let page = response.text();
    assert!(page.contains("<pre"));
    assert!(page.contains("&lt;b&gt;bold&lt;/b&gt; 你好"));
}

#[tokio::test]
async fn test_preview_audio() {
    let (server, _dir) = create_test_server().await;
    let body = upload(&server, "song.mp3", b"ID3\x03").await;
    let key = body["key"].as_str().unwrap();
    let file_url = body["fileUrl"].as_str().unwrap();

    let page = server.get(&format!("/preview/{key}")).await.text();

    assert!(page.contains("<audio controls"));
    assert!(page.contains(&format!("src=\"{file_url}\"")));
    assert!(page.contains("type=\"audio/mpeg\""));
}

#[tokio::test]
async fn test_preview_other_is_raw() {
    let (server, _dir) = create_test_server().await;
    let body = upload(&server, "paper.pdf", b"%PDF-1.7").await;
    let key = body["key"].as_str().unwrap();

    let response = server.get(&format!("/preview/{key}")).await;

    response.assert_status_ok();
    assert_eq!(response.header(header::CONTENT_TYPE), "application/pdf");
    assert_eq!(&response.as_bytes()[..], b"%PDF-1.7");
}

#[cfg(unix)]
#[tokio::test]
async fn test_unreadable_object_is_internal_error() {
    let (server, dir) = create_test_server().await;
    // A self-referencing link cannot be resolved to content
    let link = dir.path().join("uploads").join("loop.txt");
    std::os::unix::fs::symlink(&link, &link).unwrap();

    for path in ["/preview/loop.txt", "/file/loop.txt"] {
        let response = server.get(path).await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = response.json();
        assert_eq!(body["code"], "INTERNAL_ERROR");
        assert!(!body["error"].as_str().unwrap().contains("loop"));
    }
}

// ============================================================================
// QR Code Tests
// ============================================================================

#[tokio::test]
async fn test_qr_endpoint_matches_upload_response() {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    let (server, _dir) = create_test_server().await;
    let body = upload(&server, "slides.pptx", b"PK\x03\x04").await;
    let key = body["key"].as_str().unwrap();

    let response = server.get(&format!("/qr/{key}")).await;

    response.assert_status_ok();
    assert_eq!(response.header(header::CONTENT_TYPE), "image/png");

    let embedded = body["qrCode"]
        .as_str()
        .unwrap()
        .strip_prefix("data:image/png;base64,")
        .unwrap();
    assert_eq!(
        STANDARD.decode(embedded).unwrap(),
        response.as_bytes().to_vec()
    );
}

#[tokio::test]
async fn test_qr_endpoint_link_too_long() {
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir);
    config.server.public_url = Some(format!("http://drop.test/{}", "x".repeat(4000)));
    let server = create_test_server_with(config).await;
    std::fs::write(dir.path().join("uploads").join("note.txt"), b"hello").unwrap();

    let response = server.get("/qr/note.txt").await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

// ============================================================================
// Misc
// ============================================================================

#[tokio::test]
async fn test_health() {
    let (server, _dir) = create_test_server().await;

    let response = server.get("/health").await;

    response.assert_status_ok();
    response.assert_text("OK");
}

#[tokio::test]
async fn test_security_headers_on_file_responses() {
    let (server, _dir) = create_test_server().await;
    let body = upload(&server, "note.txt", b"hi").await;
    let key = body["key"].as_str().unwrap();

    let response = server.get(&format!("/file/{key}")).await;

    assert_eq!(response.header("x-content-type-options"), "nosniff");
}
