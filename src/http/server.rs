//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the node registry with one HTTP forwarder per node
//! - Create the Axum router and middleware (tracing, request ID)
//! - Buffer each request and hand it to the dispatcher
//! - Spawn the health checker once when serving starts

use std::error::Error as _;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use http_body_util::LengthLimitError;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::BalancerConfig;
use crate::dispatch::{Forwarder, ProxyRequest, RequestDispatcher, RetryState};
use crate::error::StartupError;
use crate::health::{HealthChecker, TcpProber};
use crate::http::forwarder::HttpForwarder;
use crate::lifecycle::Shutdown;
use crate::load_balancer::registry::NodeRegistry;
use crate::load_balancer::scheduler::WeightedRoundRobin;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<RequestDispatcher>,
    pub max_body_bytes: usize,
}

/// HTTP front end of the load balancer.
pub struct HttpServer {
    router: Router,
    registry: Arc<NodeRegistry>,
    health_checker: Option<HealthChecker>,
}

impl HttpServer {
    /// Create a server forwarding over HTTP to the configured nodes.
    pub fn new(config: &BalancerConfig) -> Result<Self, StartupError> {
        let upstream = config.upstream.clone();
        let registry = NodeRegistry::from_nodes(&config.nodes, |addr| {
            Arc::new(HttpForwarder::new(addr.clone(), &upstream)) as Arc<dyn Forwarder>
        })?;
        Self::with_registry(config, Arc::new(registry))
    }

    /// Create a server over an already built registry.
    pub fn with_registry(
        config: &BalancerConfig,
        registry: Arc<NodeRegistry>,
    ) -> Result<Self, StartupError> {
        if registry.is_empty() {
            return Err(StartupError::NoNodes);
        }

        let health_checker = if config.health_check.enabled {
            Some(HealthChecker::from_config(
                registry.clone(),
                Arc::new(TcpProber),
                &config.health_check,
            )?)
        } else {
            None
        };

        let dispatcher = RequestDispatcher::new(
            registry.clone(),
            Arc::new(WeightedRoundRobin::new()),
            &config.retries,
        );
        let state = AppState {
            dispatcher: Arc::new(dispatcher),
            max_body_bytes: config.listener.max_body_bytes,
        };

        Ok(Self {
            router: Self::build_router(state),
            registry,
            health_checker,
        })
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            nodes = self.registry.len(),
            "HTTP server starting"
        );

        if let Some(checker) = self.health_checker {
            checker.spawn(shutdown.subscribe());
        }

        let mut stop = shutdown.subscribe();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Buffer the request and dispatch it.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let status = body_error_status(&e);
            tracing::warn!(path = %parts.uri.path(), status = %status, error = %e, "Failed to buffer request body");
            return match status {
                StatusCode::PAYLOAD_TOO_LARGE => (status, "Request body too large").into_response(),
                _ => (status, "Malformed request body").into_response(),
            };
        }
    };

    let request = ProxyRequest {
        method: parts.method,
        uri: parts.uri,
        version: parts.version,
        headers: parts.headers,
        body,
    };

    match state.dispatcher.handle(request, RetryState::default()).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

/// 413 when the body hit the size limit, 400 for any other read failure.
fn body_error_status(err: &axum::Error) -> StatusCode {
    let mut source = err.source();
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return StatusCode::PAYLOAD_TOO_LARGE;
        }
        source = e.source();
    }
    StatusCode::BAD_REQUEST
}
