//! HTTP forwarder bound to one node.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Uri;
use axum::response::Response;
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time;

use crate::config::UpstreamConfig;
use crate::dispatch::forwarder::{Forwarder, ProxyRequest};
use crate::error::ForwardError;
use crate::load_balancer::node::NodeAddress;

/// Relays requests to a single node over plain HTTP.
///
/// Backend responses, 5xx included, are passed through untouched. Only
/// transport failures count as forward errors.
pub struct HttpForwarder {
    address: NodeAddress,
    client: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl HttpForwarder {
    pub fn new(address: NodeAddress, config: &UpstreamConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_millis(config.connect_timeout_ms)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            address,
            client,
            timeout: Duration::from_millis(config.request_timeout_ms),
        }
    }

    fn upstream_uri(&self, request: &ProxyRequest) -> Result<Uri, ForwardError> {
        format!("http://{}{}", self.address, request.path_and_query())
            .parse()
            .map_err(|e: axum::http::uri::InvalidUri| ForwardError::Request(e.to_string()))
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    async fn forward(&self, request: ProxyRequest) -> Result<Response, ForwardError> {
        let uri = self.upstream_uri(&request)?;
        let upstream = request.to_request(uri)?;

        match time::timeout(self.timeout, self.client.request(upstream)).await {
            Ok(Ok(response)) => Ok(response.map(|body: Incoming| Body::new(body))),
            Ok(Err(e)) => Err(ForwardError::Connect(e.to_string())),
            Err(_) => Err(ForwardError::Timeout(self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;

    #[test]
    fn test_upstream_uri_rewrite() {
        let forwarder = HttpForwarder::new(
            NodeAddress::parse("10.0.0.5:9000").unwrap(),
            &UpstreamConfig::default(),
        );
        let request = ProxyRequest::new(Method::GET, "http://lb.local/a/b?c=d".parse().unwrap());

        let uri = forwarder.upstream_uri(&request).unwrap();
        assert_eq!(uri.to_string(), "http://10.0.0.5:9000/a/b?c=d");
    }

    #[tokio::test]
    async fn test_connection_refused_is_forward_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let forwarder = HttpForwarder::new(
            NodeAddress::parse(&format!("127.0.0.1:{port}")).unwrap(),
            &UpstreamConfig::default(),
        );
        let result = forwarder
            .forward(ProxyRequest::new(Method::GET, "/".parse().unwrap()))
            .await;
        assert!(matches!(result, Err(ForwardError::Connect(_))));
    }

    #[tokio::test]
    async fn test_backend_response_body_streams_through() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let app = axum::Router::new().route(
            "/ping",
            axum::routing::get(|| async { (axum::http::StatusCode::ACCEPTED, "pong") }),
        );
        let server = tokio::spawn(async move { axum::serve(listener, app).await });

        let forwarder = HttpForwarder::new(
            NodeAddress::parse(&format!("127.0.0.1:{port}")).unwrap(),
            &UpstreamConfig::default(),
        );
        let response = forwarder
            .forward(ProxyRequest::new(Method::GET, "/ping".parse().unwrap()))
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::ACCEPTED);

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"pong");
        server.abort();
    }
}
