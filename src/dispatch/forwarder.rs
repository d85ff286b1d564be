//! The per-node forwarding capability.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, Uri, Version};
use axum::response::Response;
use bytes::Bytes;

use crate::error::ForwardError;

/// A fully buffered inbound request.
///
/// The body is buffered once so every retry and failover can replay it.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ProxyRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Path and query of the original request, `/` when absent.
    pub fn path_and_query(&self) -> &str {
        self.uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
    }

    /// Rebuild an `http::Request` aimed at `uri`.
    pub fn to_request(&self, uri: Uri) -> Result<Request<Body>, ForwardError> {
        let mut builder = Request::builder()
            .method(self.method.clone())
            .uri(uri)
            .version(self.version);
        if let Some(headers) = builder.headers_mut() {
            headers.extend(self.headers.clone());
        }
        builder
            .body(Body::from(self.body.clone()))
            .map_err(|e| ForwardError::Request(e.to_string()))
    }
}

/// Relays a request to one backend.
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(&self, request: ProxyRequest) -> Result<Response, ForwardError>;
}
