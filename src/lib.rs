//! qrdrop - browser file drop with shareable links and QR codes.
//!
//! Upload a file, get back a link and a QR code for it; anyone holding the
//! link can download or preview the file.

pub mod config;
pub mod content;
pub mod error;
pub mod file;
pub mod logging;
pub mod qr;
pub mod web;

pub use config::Config;
pub use content::{ContentResponder, MimeTable, Mode, RenderedResponse};
pub use error::{Result, ShareError};
pub use file::{BlobStore, KeyAllocator, NamingPolicy, StorageKey, StoredObject};
pub use qr::LinkCodeGenerator;
pub use web::WebServer;
