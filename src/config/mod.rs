//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, redirect compilation)
//!     → ProxyConfig (validated, immutable)
//!     → HttpServer builds the middleware chain from it
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::ProxyConfig;
pub use schema::ListenerConfig;
pub use schema::ObservabilityConfig;
pub use schema::RedirectRegexConfig;
pub use schema::RedirectRuleConfig;
pub use schema::UpstreamConfig;
