//! Compiled redirect rule and per-request decision.
//!
//! # Data Flow
//! ```text
//! Request
//!     → original_url (scheme://host path?query)
//!     → regex match ── no match ──▶ Forward(NoMatch)
//!     → template render ── error ──▶ Fail(RewriteFailure)
//!     → target validation ── error ──▶ Fail(InvalidTarget)
//!     → same as original ──▶ Forward(SameUrl)
//!     → Redirect { status, location }
//! ```
//!
//! # Design Decisions
//! - Pattern and template compiled once, read-only afterwards
//! - Replace-all semantics: every match in the URL is rewritten
//! - `Location` carries the rendered string verbatim once it validates

use axum::http::{HeaderValue, Method, StatusCode, Uri};
use regex::Regex;

use crate::config::RedirectRegexConfig;
use crate::redirect::context::{original_url, RequestContext};
use crate::redirect::error::RedirectError;
use crate::redirect::template::Template;

/// Why a request was handed to the next handler untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardReason {
    /// The pattern did not match the original URL.
    NoMatch,
    /// The rewritten URL equals the original URL.
    SameUrl,
}

impl ForwardReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForwardReason::NoMatch => "no_match",
            ForwardReason::SameUrl => "same_url",
        }
    }
}

/// Result of evaluating a rule against one request.
#[derive(Debug)]
pub enum Outcome {
    Forward(ForwardReason),
    Redirect {
        status: StatusCode,
        location: HeaderValue,
    },
    Fail(RedirectError),
}

/// A compiled regex redirect.
#[derive(Debug)]
pub struct RedirectRule {
    name: String,
    pattern: Regex,
    template: Template,
    permanent: bool,
}

impl RedirectRule {
    /// Compile the pattern and parse the replacement.
    pub fn compile(
        config: &RedirectRegexConfig,
        name: impl Into<String>,
    ) -> Result<Self, RedirectError> {
        if config.regex.is_empty() {
            return Err(RedirectError::InvalidPattern {
                pattern: String::new(),
                reason: "pattern is empty".to_string(),
            });
        }

        let pattern = Regex::new(&config.regex).map_err(|e| RedirectError::InvalidPattern {
            pattern: config.regex.clone(),
            reason: e.to_string(),
        })?;
        let template = Template::parse(&config.replacement)?;

        Ok(Self {
            name: name.into(),
            pattern,
            template,
            permanent: config.permanent,
        })
    }

    /// Rule name used in logs and metrics.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_permanent(&self) -> bool {
        self.permanent
    }

    /// Rewrite `subject`, or `None` if the pattern does not match.
    pub fn rewrite<C: RequestContext + ?Sized>(
        &self,
        subject: &str,
        ctx: &C,
    ) -> Result<Option<String>, RedirectError> {
        let mut rewritten = String::with_capacity(subject.len());
        let mut last = 0;
        let mut matched = false;

        for captures in self.pattern.captures_iter(subject) {
            let whole = captures.get_match();
            matched = true;
            rewritten.push_str(&subject[last..whole.start()]);
            self.template.render(&captures, ctx, &mut rewritten)?;
            last = whole.end();
        }

        if !matched {
            return Ok(None);
        }
        rewritten.push_str(&subject[last..]);
        Ok(Some(rewritten))
    }

    /// Decide what to do with a request.
    pub fn evaluate<C: RequestContext + ?Sized>(&self, ctx: &C) -> Outcome {
        let original = original_url(ctx);

        let rewritten = match self.rewrite(&original, ctx) {
            Ok(Some(rewritten)) => rewritten,
            Ok(None) => return Outcome::Forward(ForwardReason::NoMatch),
            Err(e) => return Outcome::Fail(e),
        };

        let location = match parse_target(&rewritten) {
            Ok(location) => location,
            Err(e) => return Outcome::Fail(e),
        };

        if rewritten == original {
            return Outcome::Forward(ForwardReason::SameUrl);
        }

        Outcome::Redirect {
            status: redirect_status(ctx.method(), self.permanent),
            location,
        }
    }
}

/// Pick the redirect status for a method.
///
/// GET and HEAD get 302/301. Every other method gets 307/308 so clients
/// replay the same method and body.
pub fn redirect_status(method: &Method, permanent: bool) -> StatusCode {
    let preserves_method = method != Method::GET && method != Method::HEAD;
    match (preserves_method, permanent) {
        (false, false) => StatusCode::FOUND,
        (false, true) => StatusCode::MOVED_PERMANENTLY,
        (true, false) => StatusCode::TEMPORARY_REDIRECT,
        (true, true) => StatusCode::PERMANENT_REDIRECT,
    }
}

/// Validate a rewritten URL and turn it into a `Location` value.
pub fn parse_target(target: &str) -> Result<HeaderValue, RedirectError> {
    let invalid = |reason: String| RedirectError::InvalidTarget {
        target: target.to_string(),
        reason,
    };

    let uri: Uri = target.parse().map_err(|e| invalid(format!("{}", e)))?;
    if uri.scheme().is_none() || uri.authority().is_none() {
        return Err(invalid("not an absolute URL".to_string()));
    }
    if uri.host().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    if let Some(authority) = uri.authority() {
        let (userinfo, host_port) = match authority.as_str().rsplit_once('@') {
            Some((userinfo, host_port)) => (Some(userinfo), host_port),
            None => (None, authority.as_str()),
        };
        if !valid_port(host_port) {
            return Err(invalid("invalid port".to_string()));
        }
        if userinfo.is_some_and(|u| !valid_escapes(u)) {
            return Err(invalid("invalid percent-encoding in userinfo".to_string()));
        }
    }
    if !valid_escapes(uri.path()) {
        return Err(invalid("invalid percent-encoding in path".to_string()));
    }

    HeaderValue::from_str(target).map_err(|e| invalid(e.to_string()))
}

/// Every `%` must start a `%XX` escape.
fn valid_escapes(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape = bytes.get(i + 1..i + 3);
            if !escape.is_some_and(|e| e.iter().all(u8::is_ascii_hexdigit)) {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}

/// The port after the host, if any, must be empty or a number that fits `u16`.
fn valid_port(host_port: &str) -> bool {
    let after_host = match host_port.strip_prefix('[') {
        Some(rest) => match rest.split_once(']') {
            Some((_, after)) => after,
            None => return false,
        },
        None => host_port,
    };
    match after_host.rsplit_once(':') {
        Some((_, port)) => port.is_empty() || port.parse::<u16>().is_ok(),
        None => after_host.is_empty() || host_port == after_host,
    }
}
