//! File handlers for the web API.

use axum::{
    body::Body,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, Path, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use futures::TryStreamExt;
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::content::{Mode, RenderedResponse};
use crate::file::extension;
use crate::qr::LINK_CODE_MIME;
use crate::web::dto::UploadResponse;
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::ShareError;

/// Name of the multipart field carrying the file.
pub const FILE_FIELD: &str = "file";

/// Allowance for multipart boundaries and part headers on top of the file size.
pub const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Generate a safe Content-Disposition header value for file downloads.
///
/// Control characters are dropped, double quotes and backslashes replaced,
/// and non-ASCII names are sent with the RFC 5987 `filename*` parameter.
fn content_disposition_header(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            _ if !c.is_ascii() => '_',
            _ => c,
        })
        .collect();

    if sanitized == filename {
        return format!("attachment; filename=\"{}\"", filename);
    }

    let encoded = urlencoding::encode(filename);
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized, encoded
    )
}

fn request_host(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::HOST).and_then(|v| v.to_str().ok())
}

/// Map a multipart read failure, keeping body limit overruns distinct.
fn field_error(err: MultipartError, limit: u64) -> ShareError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ShareError::SizeExceeded { limit }
    } else {
        ShareError::Multipart(err.body_text())
    }
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// POST /upload - Store a file and return its link and QR code.
///
/// Request body: multipart/form-data with a "file" field.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    // Reject declared oversize bodies before reading anything
    if let Some(len) = content_length(&headers) {
        if len > state.max_upload_size + MULTIPART_OVERHEAD {
            tracing::warn!(content_length = len, "Rejected oversized upload");
            return Err(ShareError::SizeExceeded {
                limit: state.max_upload_size,
            }
            .into());
        }
    }

    let limit = state.max_upload_size;
    let mut multipart = multipart.map_err(|e| ShareError::Multipart(e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| field_error(e, limit))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        // Browsers send an empty filename when nothing was chosen
        let filename = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => break,
        };

        let key = state.allocator.allocate(&filename);
        let stored = state
            .store
            .save(&key, field.map_err(|e| field_error(e, limit)), limit)
            .await
            .map_err(|e| match e {
                ShareError::PathTraversalRejected(_) => {
                    tracing::warn!(filename = %filename, "Rejected unsafe filename");
                    ApiError::bad_request("Invalid filename")
                }
                other => {
                    tracing::warn!(filename = %filename, error = %other, "Upload failed");
                    other.into()
                }
            })?;

        let host = request_host(&headers);
        let file_url = state.file_url(host, stored.key.as_str());

        let qr_code = match state.link_codes.encode_data_url(&file_url) {
            Ok(qr_code) => qr_code,
            Err(e) => {
                if let Err(cleanup) = state.store.delete(stored.key.as_str()).await {
                    tracing::error!(key = %stored.key, error = %cleanup, "Failed to remove upload");
                }
                return Err(e.into());
            }
        };

        tracing::info!(
            key = %stored.key,
            size = stored.size_bytes,
            filename = %filename,
            "Stored upload"
        );

        return Ok(Json(UploadResponse {
            preview_url: state.preview_url(host, stored.key.as_str()),
            key: stored.key.to_string(),
            file_type: extension(&filename)
                .map(|ext| format!(".{ext}"))
                .unwrap_or_default(),
            filename,
            file_url,
            qr_code,
            size: stored.size_bytes,
        }));
    }

    tracing::warn!("Upload without a file field");
    Err(ShareError::NoFileProvided.into())
}

/// GET /file/:key - Serve the raw file inline.
pub async fn serve_file(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    render(&state, &key, Mode::Download, &headers, false).await
}

/// GET /download/:key - Serve the raw file as an attachment.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    render(&state, &key, Mode::Download, &headers, true).await
}

/// GET /preview/:key - Render the file for in-browser viewing.
pub async fn preview_file(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    render(&state, &key, Mode::Preview, &headers, false).await
}

/// GET /qr/:key - QR code of the file's link as a PNG image.
pub async fn link_code(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let object = state.store.stat(&key).await?;
    let file_url = state.file_url(request_host(&headers), object.key.as_str());
    let png = state.link_codes.encode(&file_url)?;

    Ok(([(header::CONTENT_TYPE, LINK_CODE_MIME)], png).into_response())
}

async fn render(
    state: &AppState,
    key: &str,
    mode: Mode,
    headers: &HeaderMap,
    attachment: bool,
) -> Result<Response, ApiError> {
    let file_url = state.file_url(request_host(headers), key);
    let rendered = state.responder.respond(key, mode, &file_url).await?;

    match rendered {
        RenderedResponse::Html(page) => Ok(Html(page).into_response()),
        RenderedResponse::Stream { object, mime, file } => {
            let mut builder = Response::builder()
                .header(header::CONTENT_TYPE, mime)
                .header(header::CONTENT_LENGTH, object.size_bytes);
            if attachment {
                builder = builder.header(
                    header::CONTENT_DISPOSITION,
                    content_disposition_header(object.key.as_str()),
                );
            }

            builder
                .body(Body::from_stream(ReaderStream::new(file)))
                .map_err(|e| {
                    tracing::error!("Failed to build response: {}", e);
                    ApiError::internal("Failed to build response")
                })
        }
    }
}
