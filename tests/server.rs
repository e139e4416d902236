//! Server wiring: redirect chain in front of the next handler.

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use regex_redirect::config::{ProxyConfig, RedirectRegexConfig, RedirectRuleConfig, UpstreamConfig};
use regex_redirect::http::{HttpServer, ServerError};
use regex_redirect::Shutdown;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tower::ServiceExt;

mod common;

fn rule(name: &str, regex: &str, replacement: &str, permanent: bool) -> RedirectRuleConfig {
    RedirectRuleConfig {
        name: name.to_string(),
        redirect: RedirectRegexConfig {
            regex: regex.to_string(),
            replacement: replacement.to_string(),
            permanent,
        },
    }
}

fn get(host: &str, path: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header("Host", host)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_chain_without_upstream() {
    let mut config = ProxyConfig::default();
    config.redirects.push(rule("www", r"^http://example\.com/(.*)$", "http://www.example.com/$1", true));
    let server = HttpServer::new(config).unwrap();

    let response = server.router().oneshot(get("example.com", "/a?b=1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.headers()[header::LOCATION], "http://www.example.com/a?b=1");
    assert!(response.headers().contains_key("x-request-id"));

    let response = server.router().oneshot(get("www.example.com", "/a")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().get(header::LOCATION).is_none());
}

#[tokio::test]
async fn test_first_rule_sees_request_first() {
    let mut config = ProxyConfig::default();
    config.redirects.push(rule("first", "^http://a/", "http://first/", false));
    config.redirects.push(rule("second", "^http://a/", "http://second/", false));
    let server = HttpServer::new(config).unwrap();

    let response = server.router().oneshot(get("a", "/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "http://first/");
}

#[tokio::test]
async fn test_client_request_id_is_kept() {
    let server = HttpServer::new(ProxyConfig::default()).unwrap();

    let request = Request::builder()
        .uri("/")
        .header("Host", "a")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();
    let response = server.router().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "abc-123");
}

#[test]
fn test_invalid_rule_rejects_server() {
    let mut config = ProxyConfig::default();
    config.redirects.push(rule("broken", "^(.*", "$1", false));

    match HttpServer::new(config) {
        Err(ServerError::Redirect { name, .. }) => assert_eq!(name, "broken"),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("server built with an invalid rule"),
    }
}

#[tokio::test]
async fn test_forwards_unmatched_requests_to_upstream() {
    let upstream = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let upstream_addr: SocketAddr = upstream.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = upstream.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 8\r\nConnection: close\r\n\r\nupstream")
                    .await;
                let _ = socket.shutdown().await;
            });
        }
    });

    let mut config = ProxyConfig::default();
    config.upstream = Some(UpstreamConfig {
        address: upstream_addr.to_string(),
    });
    config.redirects.push(rule("https", "^http://secure/(.*)$", "https://secure/$1", true));
    let server = HttpServer::new(config).unwrap();

    let response = server.router().oneshot(get("plain", "/x")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::body_string(response).await, "upstream");

    let response = server.router().oneshot(get("secure", "/x")).await.unwrap();
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.headers()[header::LOCATION], "https://secure/x");
}

#[tokio::test]
async fn test_run_stops_on_shutdown() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server = HttpServer::new(ProxyConfig::default()).unwrap();
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.trigger();

    let result = tokio::time::timeout(Duration::from_secs(5), handle).await;
    assert!(matches!(result, Ok(Ok(Ok(())))));
}
