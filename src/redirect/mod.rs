//! Regex redirect middleware.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → context.rs (rebuild scheme://host path?query)
//!     → rule.rs (match, render template, validate target)
//!     → layer.rs
//!         ├─ no match / same URL → next handler
//!         ├─ redirect → 301/302/307/308 + Location
//!         └─ rewrite or target error → 502
//! ```
//!
//! # Design Decisions
//! - Pattern and template compiled at construction; a bad rule never enters the chain
//! - Compiled state is immutable and shared behind `Arc` between service clones
//! - Templates read the request through a fixed accessor set (`RequestContext`)
//! - Synchronous per request: no I/O, no locks

pub mod context;
pub mod error;
pub mod layer;
pub mod rule;
pub mod template;

pub use context::{RequestContext, SecureTransport};
pub use error::RedirectError;
pub use layer::{RedirectRegex, RedirectRegexLayer};
pub use rule::{redirect_status, ForwardReason, Outcome, RedirectRule};
pub use template::{Template, TemplateError};
