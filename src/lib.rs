//! Regex redirect middleware for an HTTP reverse proxy chain.
//!
//! Matches each request's absolute URL against a regular expression and, on
//! a match, redirects to a URL rendered from a replacement template.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod redirect;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use redirect::{RedirectError, RedirectRegex, RedirectRegexLayer};
