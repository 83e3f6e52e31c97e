//! Response DTOs for the web API.

use serde::Serialize;

/// Successful upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Storage key.
    pub key: String,
    /// Filename as sent by the client.
    pub filename: String,
    /// Absolute URL of the raw file.
    pub file_url: String,
    /// Absolute URL of the preview page.
    pub preview_url: String,
    /// QR code of `file_url` as a PNG data URL.
    pub qr_code: String,
    /// Lower-cased original extension with the dot (".docx"), or empty.
    pub file_type: String,
    /// Size in bytes.
    pub size: u64,
}
