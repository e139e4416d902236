//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the next handler as fallback
//! - Install one redirect layer per configured rule
//! - Wire up middleware (tracing, timeout, request ID)
//! - Forward unredirected requests to the upstream
//! - Bind server to listener with graceful shutdown

use std::str::FromStr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{
        uri::{Authority, InvalidUri, PathAndQuery, Scheme},
        Request, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ProxyConfig;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::redirect::{RedirectError, RedirectRegexLayer};

/// Errors building the server from a configuration.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("redirect {name:?}: {source}")]
    Redirect {
        name: String,
        #[source]
        source: RedirectError,
    },

    #[error("invalid upstream address {address:?}: {source}")]
    Upstream {
        address: String,
        #[source]
        source: InvalidUri,
    },
}

/// State of the next handler.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Option<Authority>,
    pub client: Client<HttpConnector, Body>,
}

/// HTTP server running the redirect chain.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Build the server. Fails if any redirect rule or the upstream is invalid.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let upstream = config
            .upstream
            .as_ref()
            .map(|u| {
                Authority::from_str(&u.address).map_err(|source| ServerError::Upstream {
                    address: u.address.clone(),
                    source,
                })
            })
            .transpose()?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let state = AppState { upstream, client };

        let router = Self::build_router(&config, state)?;
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layers wrap outward, so rules are applied in reverse to let the first
    /// configured rule see the request first.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Result<Router, ServerError> {
        let mut router = Router::new().fallback(next_handler).with_state(state);

        for rule in config.redirects.iter().rev() {
            let layer = RedirectRegexLayer::new(&rule.redirect, rule.name.as_str()).map_err(
                |source| ServerError::Redirect {
                    name: rule.name.clone(),
                    source,
                },
            )?;
            router = router.layer(layer);
        }

        tracing::info!(rules = config.redirects.len(), "Redirect chain built");

        Ok(router
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer()))
    }

    /// The router, for serving or for driving in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until a shutdown signal arrives.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Next handler: forward to the upstream, or 404 without one.
async fn next_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let Some(upstream) = state.upstream.clone() else {
        return (StatusCode::NOT_FOUND, "No upstream configured").into_response();
    };

    let (mut parts, body) = request.into_parts();
    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(upstream);
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to build upstream URI");
            return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
        }
    };

    let path = parts.uri.path().to_string();
    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(path = %path, error = %e, "Upstream error");
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
