//! Redirect middleware error taxonomy.

use thiserror::Error;

use crate::redirect::template::TemplateError;

/// Errors raised while building or running a regex redirect.
///
/// `InvalidPattern` and `InvalidTemplate` only occur at construction and keep
/// the middleware out of the chain. `RewriteFailure` and `InvalidTarget` occur
/// per request and are answered with `502 Bad Gateway`.
#[derive(Debug, Error)]
pub enum RedirectError {
    /// The configured regex is empty or fails to compile.
    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// The configured replacement is not a valid template.
    #[error("invalid replacement template: {0}")]
    InvalidTemplate(#[from] TemplateError),

    /// The replacement could not be rendered against the current request.
    #[error("rewrite failed: {reason}")]
    RewriteFailure { reason: String },

    /// The rewritten string is not a well-formed absolute URL.
    #[error("invalid redirect target {target:?}: {reason}")]
    InvalidTarget { target: String, reason: String },
}

impl RedirectError {
    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            RedirectError::InvalidPattern { .. } => "invalid_pattern",
            RedirectError::InvalidTemplate(_) => "invalid_template",
            RedirectError::RewriteFailure { .. } => "rewrite_failure",
            RedirectError::InvalidTarget { .. } => "invalid_target",
        }
    }
}
