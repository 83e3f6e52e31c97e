//! Middleware for the web server.

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::security_headers;
