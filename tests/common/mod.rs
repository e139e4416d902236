//! Shared utilities for integration testing.

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use tower::Service;

#[allow(dead_code)]
/// A next handler answering `200 next` and counting its calls.
pub fn counting_next(
    calls: Arc<AtomicUsize>,
) -> impl Service<Request<Body>, Response = Response, Error = Infallible> + Clone {
    tower::service_fn(move |_request: Request<Body>| {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Infallible>((StatusCode::OK, "next").into_response())
        }
    })
}

/// Build a request the way a client would address it.
#[allow(dead_code)]
pub fn request(method: &str, url: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(url)
        .header("X-Foo", "bar")
        .body(Body::empty())
        .unwrap()
}

#[allow(dead_code)]
pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
