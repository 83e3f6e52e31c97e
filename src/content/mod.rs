//! Content negotiation for stored objects.
//!
//! Maps extensions to MIME types and decides whether a preview is shown as
//! text, through an office document viewer, in a media player, or as raw
//! bytes.

mod mime;
mod responder;

pub use mime::{MediaKind, MimeTable, RenderStrategy, OCTET_STREAM};
pub use responder::{
    escape_html, ContentResponder, Mode, RenderedResponse, DEFAULT_MAX_TEXT_BYTES,
};
