//! API handlers for the qrdrop web server.

pub mod file;

pub use file::*;

use std::sync::Arc;

use crate::config::Config;
use crate::content::{ContentResponder, MimeTable};
use crate::file::{BlobStore, KeyAllocator};
use crate::qr::LinkCodeGenerator;

/// Route prefix serving raw stored objects.
pub const FILE_ROUTE: &str = "/file";

/// Route prefix serving previews.
pub const PREVIEW_ROUTE: &str = "/preview";

/// Shared state for all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Upload storage.
    pub store: BlobStore,
    /// Storage key policy.
    pub allocator: Arc<dyn KeyAllocator>,
    /// QR code generator.
    pub link_codes: LinkCodeGenerator,
    /// Download and preview framing.
    pub responder: ContentResponder,
    /// Maximum upload size in bytes.
    pub max_upload_size: u64,
    /// Base URL overriding the request Host header.
    pub public_url: Option<String>,
}

impl AppState {
    /// Create application state from configuration and an opened store.
    pub fn new(config: &Config, store: BlobStore) -> Self {
        let store = store.with_strict(config.storage.strict);
        let responder = ContentResponder::new(
            store.clone(),
            MimeTable::with_overrides(&config.preview.mime_types),
            config.preview.office_viewer_url.clone(),
        )
        .with_max_text_bytes(config.preview.max_text_bytes());

        Self {
            allocator: config
                .storage
                .naming
                .allocator(config.storage.raw_prefix_len),
            link_codes: LinkCodeGenerator::default(),
            responder,
            max_upload_size: config.storage.max_upload_bytes(),
            public_url: config
                .server
                .public_url
                .as_ref()
                .map(|url| url.trim_end_matches('/').to_string()),
            store,
        }
    }

    /// Base URL for links, e.g. `http://192.168.1.10:3000`.
    pub fn base_url(&self, host: Option<&str>) -> String {
        match &self.public_url {
            Some(url) => url.clone(),
            None => format!("http://{}", host.unwrap_or("localhost")),
        }
    }

    /// Absolute URL serving the raw object under `key`.
    pub fn file_url(&self, host: Option<&str>, key: &str) -> String {
        format!(
            "{}{FILE_ROUTE}/{}",
            self.base_url(host),
            urlencoding::encode(key)
        )
    }

    /// Absolute URL serving the preview of `key`.
    pub fn preview_url(&self, host: Option<&str>, key: &str) -> String {
        format!(
            "{}{PREVIEW_ROUTE}/{}",
            self.base_url(host),
            urlencoding::encode(key)
        )
    }
}
