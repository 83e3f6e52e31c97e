//! Extension to MIME type mapping and MIME type to render strategy rules.

use std::collections::HashMap;

/// Fallback MIME type for unknown extensions.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Built-in extension table.
const BUILTIN_TYPES: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
    ("mov", "video/quicktime"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("m4a", "audio/mp4"),
    ("ogg", "audio/ogg"),
    ("doc", "application/msword"),
    ("xls", "application/vnd.ms-excel"),
    ("ppt", "application/vnd.ms-powerpoint"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
];

/// Built-in render rules. A pattern ending in `/` or `.` matches as a prefix,
/// anything else must match exactly. First match wins.
const BUILTIN_RULES: &[(&str, RenderStrategy)] = &[
    ("text/plain", RenderStrategy::Text),
    ("application/msword", RenderStrategy::Office),
    ("application/vnd.ms-excel", RenderStrategy::Office),
    ("application/vnd.ms-powerpoint", RenderStrategy::Office),
    (
        "application/vnd.openxmlformats-officedocument.",
        RenderStrategy::Office,
    ),
    ("video/", RenderStrategy::Media(MediaKind::Video)),
    ("audio/", RenderStrategy::Media(MediaKind::Audio)),
];

/// Kind of media player used for previews.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// `<video>` element.
    Video,
    /// `<audio>` element.
    Audio,
}

impl MediaKind {
    /// HTML element name.
    pub fn tag(self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

/// How a preview of a given MIME type is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStrategy {
    /// Decode as text and show preformatted.
    Text,
    /// Embed an online office document viewer.
    Office,
    /// Embed a media player.
    Media(MediaKind),
    /// Send the raw bytes.
    Raw,
}

/// Extension and render strategy lookup tables.
#[derive(Debug, Clone)]
pub struct MimeTable {
    types: HashMap<String, String>,
    rules: Vec<(String, RenderStrategy)>,
}

impl Default for MimeTable {
    fn default() -> Self {
        Self {
            types: BUILTIN_TYPES
                .iter()
                .map(|(ext, mime)| (ext.to_string(), mime.to_string()))
                .collect(),
            rules: BUILTIN_RULES
                .iter()
                .map(|(pattern, strategy)| (pattern.to_string(), *strategy))
                .collect(),
        }
    }
}

impl MimeTable {
    /// Built-in table extended with `extra` extension to MIME entries.
    ///
    /// Extra entries replace built-in ones with the same extension.
    pub fn with_overrides(extra: &HashMap<String, String>) -> Self {
        let mut table = Self::default();
        for (ext, mime) in extra {
            table.insert(ext, mime);
        }
        table
    }

    /// Map an extension (with or without a leading dot, any case) to a MIME type.
    pub fn insert(&mut self, ext: &str, mime: &str) {
        self.types.insert(normalize(ext), mime.to_string());
    }

    /// MIME type for an extension, or [`OCTET_STREAM`] if unknown.
    pub fn mime_for(&self, ext: Option<&str>) -> &str {
        ext.and_then(|e| self.types.get(&normalize(e)))
            .map(String::as_str)
            .unwrap_or(OCTET_STREAM)
    }

    /// Render strategy for a MIME type.
    pub fn strategy_for(&self, mime: &str) -> RenderStrategy {
        self.rules
            .iter()
            .find(|(pattern, _)| matches_pattern(pattern, mime))
            .map(|(_, strategy)| *strategy)
            .unwrap_or(RenderStrategy::Raw)
    }
}

fn normalize(ext: &str) -> String {
    ext.trim_start_matches('.').to_ascii_lowercase()
}

fn matches_pattern(pattern: &str, mime: &str) -> bool {
    if pattern.ends_with('/') || pattern.ends_with('.') {
        mime.starts_with(pattern)
    } else {
        mime == pattern
    }
}
