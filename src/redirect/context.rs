//! Request view used for matching and template rendering.
//!
//! # Responsibilities
//! - Expose a fixed set of request accessors to the rewriter
//! - Rebuild the original absolute URL of a request
//!
//! # Design Decisions
//! - Scheme comes from the transport (`SecureTransport` marker), never from headers
//! - Host header wins over the URI authority (HTTP/1.1 origin-form)
//! - Query is kept raw, exactly as received

use axum::http::{header, HeaderName, HeaderValue, Method, Request};

/// Marker inserted into request extensions when the request arrived over TLS.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SecureTransport;

/// Read-only accessors the rewriter may use on a request.
pub trait RequestContext {
    /// Request method.
    fn method(&self) -> &Method;

    /// True if the request arrived over a secure transport.
    fn is_secure(&self) -> bool;

    /// Host (with optional port) the client addressed.
    fn host(&self) -> &str;

    /// Request path.
    fn path(&self) -> &str;

    /// Raw query string, without the leading `?`.
    fn query(&self) -> Option<&str>;

    /// First value of the named header.
    fn header(&self, name: &HeaderName) -> Option<&HeaderValue>;

    /// `https` or `http`, following [`RequestContext::is_secure`].
    fn scheme(&self) -> &'static str {
        if self.is_secure() {
            "https"
        } else {
            "http"
        }
    }
}

impl<B> RequestContext for Request<B> {
    fn method(&self) -> &Method {
        Request::method(self)
    }

    fn is_secure(&self) -> bool {
        self.extensions().get::<SecureTransport>().is_some()
    }

    fn host(&self) -> &str {
        self.headers()
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .or_else(|| self.uri().authority().map(|a| a.as_str()))
            .unwrap_or("")
    }

    fn path(&self) -> &str {
        self.uri().path()
    }

    fn query(&self) -> Option<&str> {
        self.uri().query()
    }

    fn header(&self, name: &HeaderName) -> Option<&HeaderValue> {
        self.headers().get(name)
    }
}

/// Rebuild the absolute URL the client requested: `scheme://host path[?query]`.
pub fn original_url<C: RequestContext + ?Sized>(ctx: &C) -> String {
    let scheme = ctx.scheme();
    let host = ctx.host();
    let path = ctx.path();
    let query = ctx.query();

    let mut url = String::with_capacity(
        scheme.len() + 3 + host.len() + path.len() + query.map_or(0, |q| q.len() + 1),
    );
    url.push_str(scheme);
    url.push_str("://");
    url.push_str(host);
    url.push_str(path);
    if let Some(query) = query {
        url.push('?');
        url.push_str(query);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_original_url_from_host_header() {
        let req = Request::builder()
            .uri("/api/v1?page=2")
            .header("Host", "example.com:8080")
            .body(Body::default())
            .unwrap();

        assert_eq!(original_url(&req), "http://example.com:8080/api/v1?page=2");
    }

    #[test]
    fn test_original_url_falls_back_to_authority() {
        let req = Request::builder()
            .uri("http://foo.com:80")
            .body(Body::default())
            .unwrap();

        assert_eq!(req.host(), "foo.com:80");
        assert_eq!(original_url(&req), "http://foo.com:80/");
    }

    #[test]
    fn test_secure_transport_sets_https() {
        let mut req = Request::builder()
            .uri("/")
            .header("Host", "foo")
            .body(Body::default())
            .unwrap();
        assert_eq!(req.scheme(), "http");

        req.extensions_mut().insert(SecureTransport);
        assert!(req.is_secure());
        assert_eq!(original_url(&req), "https://foo/");
    }

    #[test]
    fn test_forwarded_proto_is_ignored() {
        let req = Request::builder()
            .uri("/")
            .header("Host", "foo")
            .header("X-Forwarded-Proto", "https")
            .body(Body::default())
            .unwrap();

        assert_eq!(original_url(&req), "http://foo/");
    }

    #[test]
    fn test_header_returns_first_value() {
        let req = Request::builder()
            .uri("/")
            .header("X-Foo", "first")
            .header("X-Foo", "second")
            .body(Body::default())
            .unwrap();

        let name = HeaderName::from_static("x-foo");
        assert_eq!(RequestContext::header(&req, &name).unwrap(), "first");
    }
}
