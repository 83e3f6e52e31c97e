//! Web server for qrdrop.
//!
//! Accepts browser uploads and serves stored files back as raw downloads,
//! previews and QR codes.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::create_router;
pub use server::WebServer;
