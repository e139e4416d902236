//! Tower middleware wrapping the next handler with a regex redirect.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    http::{header, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::future::{ready, Either, Ready};
use tower::{Layer, Service};

use crate::config::RedirectRegexConfig;
use crate::observability::metrics;
use crate::redirect::error::RedirectError;
use crate::redirect::rule::{Outcome, RedirectRule};

/// Regex redirect middleware in front of `S`, the rest of the pipeline.
///
/// Clones share the same compiled rule.
#[derive(Debug, Clone)]
pub struct RedirectRegex<S> {
    rule: Arc<RedirectRule>,
    inner: S,
}

impl<S> RedirectRegex<S> {
    /// Build the middleware. Fails if the pattern or the replacement is invalid.
    pub fn new(
        next: S,
        config: &RedirectRegexConfig,
        name: impl Into<String>,
    ) -> Result<Self, RedirectError> {
        let rule = RedirectRule::compile(config, name)?;
        tracing::debug!(
            rule = rule.name(),
            regex = %config.regex,
            replacement = %config.replacement,
            permanent = rule.is_permanent(),
            "Creating regex redirect"
        );
        Ok(Self::from_rule(next, Arc::new(rule)))
    }

    fn from_rule(inner: S, rule: Arc<RedirectRule>) -> Self {
        Self { rule, inner }
    }
}

impl<S, B> Service<Request<B>> for RedirectRegex<S>
where
    S: Service<Request<B>, Response = Response>,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Either<Ready<Result<Response, S::Error>>, S::Future>;

    /// Readiness is reserved on the inner service but not consumed when the
    /// request is answered with a redirect or a 502.
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let rule_name = self.rule.name();
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown");

        match self.rule.evaluate(&request) {
            Outcome::Forward(reason) => {
                tracing::trace!(
                    rule = rule_name,
                    request_id = %request_id,
                    reason = reason.as_str(),
                    "Forwarding request"
                );
                metrics::record_forward(rule_name, reason.as_str());
                Either::Right(self.inner.call(request))
            }
            Outcome::Redirect { status, location } => {
                tracing::debug!(
                    rule = rule_name,
                    request_id = %request_id,
                    method = %request.method(),
                    status = status.as_u16(),
                    location = ?location,
                    "Redirecting request"
                );
                metrics::record_redirect(rule_name, status);
                Either::Left(ready(Ok(redirect_response(status, location))))
            }
            Outcome::Fail(err) => {
                tracing::warn!(
                    rule = rule_name,
                    request_id = %request_id,
                    error = %err,
                    "Regex redirect failed"
                );
                metrics::record_failure(rule_name, err.kind());
                Either::Left(ready(Ok(
                    (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response()
                )))
            }
        }
    }
}

fn redirect_response(status: StatusCode, location: HeaderValue) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response.headers_mut().insert(header::LOCATION, location);
    response
}

/// Layer producing [`RedirectRegex`] services from one compiled rule.
#[derive(Debug, Clone)]
pub struct RedirectRegexLayer {
    rule: Arc<RedirectRule>,
}

impl RedirectRegexLayer {
    pub fn new(config: &RedirectRegexConfig, name: impl Into<String>) -> Result<Self, RedirectError> {
        let rule = RedirectRule::compile(config, name)?;
        Ok(Self {
            rule: Arc::new(rule),
        })
    }
}

impl<S> Layer<S> for RedirectRegexLayer {
    type Service = RedirectRegex<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RedirectRegex::from_rule(inner, Arc::clone(&self.rule))
    }
}
