//! Response framing for stored objects.

use tokio::fs::File;

use super::mime::{MediaKind, MimeTable, RenderStrategy};
use crate::file::{BlobStore, StoredObject};
use crate::Result;

/// Default size above which text is served raw rather than previewed.
pub const DEFAULT_MAX_TEXT_BYTES: u64 = 1024 * 1024;

/// Requested rendering of a stored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Raw bytes with the resolved content type.
    Download,
    /// Browser-displayable rendering where one exists.
    Preview,
}

/// A framed response, independent of the HTTP layer.
#[derive(Debug)]
pub enum RenderedResponse {
    /// Raw object content.
    Stream {
        /// Object metadata.
        object: StoredObject,
        /// Content type.
        mime: String,
        /// Open content handle.
        file: File,
    },
    /// Generated HTML page.
    Html(String),
}

/// Chooses how stored objects are sent back.
#[derive(Debug, Clone)]
pub struct ContentResponder {
    store: BlobStore,
    mime: MimeTable,
    office_viewer_url: String,
    max_text_bytes: u64,
}

impl ContentResponder {
    /// Create a responder over `store`.
    ///
    /// `office_viewer_url` receives the percent-encoded file URL appended.
    pub fn new(store: BlobStore, mime: MimeTable, office_viewer_url: impl Into<String>) -> Self {
        Self {
            store,
            mime,
            office_viewer_url: office_viewer_url.into(),
            max_text_bytes: DEFAULT_MAX_TEXT_BYTES,
        }
    }

    /// Set the size above which text files are streamed raw.
    pub fn with_max_text_bytes(mut self, max_text_bytes: u64) -> Self {
        self.max_text_bytes = max_text_bytes;
        self
    }

    /// Render the object under `key`.
    ///
    /// `file_url` is the absolute URL serving the raw object; previews that
    /// embed the object refer to it.
    pub async fn respond(&self, key: &str, mode: Mode, file_url: &str) -> Result<RenderedResponse> {
        if mode == Mode::Download {
            return self.stream(key).await;
        }

        let object = self.store.stat(key).await?;
        let mime = self.mime.mime_for(object.extension.as_deref());

        match self.mime.strategy_for(mime) {
            RenderStrategy::Raw => self.stream(key).await,
            RenderStrategy::Text if object.size_bytes > self.max_text_bytes => {
                tracing::debug!(key, size = object.size_bytes, "Text too large to preview");
                self.stream(key).await
            }
            RenderStrategy::Text => {
                // The object may vanish between stat and read
                let content = self.store.read_all(key).await?;
                Ok(RenderedResponse::Html(text_page(
                    key,
                    &String::from_utf8_lossy(&content),
                )))
            }
            RenderStrategy::Office => Ok(RenderedResponse::Html(office_page(
                key,
                &self.office_viewer_url,
                file_url,
            ))),
            RenderStrategy::Media(kind) => Ok(RenderedResponse::Html(media_page(
                key, kind, file_url, mime,
            ))),
        }
    }

    async fn stream(&self, key: &str) -> Result<RenderedResponse> {
        let loaded = self.store.load(key).await?;
        let mime = self
            .mime
            .mime_for(loaded.object.extension.as_deref())
            .to_string();

        Ok(RenderedResponse::Stream {
            object: loaded.object,
            mime,
            file: loaded.file,
        })
    }
}

/// Escape text for use in HTML content and double-quoted attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n</head>\n<body style=\"margin:0\">\n{body}\n</body>\n</html>\n",
        escape_html(title)
    )
}

fn text_page(key: &str, text: &str) -> String {
    page(
        key,
        &format!(
            "<pre style=\"white-space:pre-wrap;word-wrap:break-word;padding:1em\">{}</pre>",
            escape_html(text)
        ),
    )
}

fn office_page(key: &str, viewer_url: &str, file_url: &str) -> String {
    let src = format!("{viewer_url}{}", urlencoding::encode(file_url));
    page(
        key,
        &format!(
            "<iframe src=\"{}\" style=\"border:0;width:100%;height:100vh\"></iframe>",
            escape_html(&src)
        ),
    )
}

fn media_page(key: &str, kind: MediaKind, file_url: &str, mime: &str) -> String {
    let tag = kind.tag();
    page(
        key,
        &format!(
            "<{tag} controls style=\"max-width:100%\">\
             <source src=\"{}\" type=\"{}\"></{tag}>",
            escape_html(file_url),
            escape_html(mime)
        ),
    )
}
