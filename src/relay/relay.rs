// ────────────────────────────────
// src/relay/relay.rs
// Routes inbound HTTP requests to the receive and monitor endpoints
// ────────────────────────────────

use hyper::body::HttpBody;
use hyper::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use hyper::{Body, Method, Request, Response, StatusCode};
use std::sync::Arc;

use super::monitor::{create_monitor, HeartbeatMonitor, ProbeOutcome};
use super::receiver::HeartbeatReceiver;
use crate::config::{Config, MonitorMode, RoutesConfig};
use crate::heartbeat::HeartbeatBuffer;
use crate::metrics::MetricsCollector;

pub struct Relay {
    routes: RoutesConfig,
    receiver: HeartbeatReceiver,
    monitor: HeartbeatMonitor,
}

impl Relay {
    /// Wire both endpoints to the same buffer.
    pub fn new(
        config: &Config,
        buffer: Arc<HeartbeatBuffer>,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Self {
        let receiver = HeartbeatReceiver::new(buffer.clone(), metrics.clone());
        let monitor = HeartbeatMonitor::new(buffer, create_monitor(config.monitor.mode), metrics);

        Self {
            routes: config.routes.clone(),
            receiver,
            monitor,
        }
    }

    pub fn mode(&self) -> MonitorMode {
        self.monitor.mode()
    }

    pub async fn handle(&self, req: Request<Body>) -> Result<Response<Body>, RelayError> {
        let method = req.method().clone();
        let path = req.uri().path().to_owned();

        if path == self.routes.receive {
            match method {
                Method::GET | Method::POST => {
                    self.receiver.receive();
                    discard_body(req.into_body()).await;
                    Ok(Response::new(Body::empty()))
                }
                _ => Err(RelayError::MethodNotAllowed("GET, POST")),
            }
        } else if path == self.routes.monitor {
            match method {
                Method::GET | Method::HEAD => Ok(match self.monitor.probe().await {
                    ProbeOutcome::Alive => alive_response(),
                    ProbeOutcome::Absent => RelayError::NoHeartbeat.into(),
                }),
                _ => Err(RelayError::MethodNotAllowed("GET, HEAD")),
            }
        } else {
            Err(RelayError::UnknownRoute(path))
        }
    }
}

fn alive_response() -> Response<Body> {
    let body = serde_json::json!({ "status": "ok" }).to_string();
    let mut response = Response::new(Body::from(body));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Read and drop the request body so the connection stays reusable.
async fn discard_body(mut body: Body) {
    while let Some(chunk) = body.data().await {
        if chunk.is_err() {
            break;
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("No heartbeat pending")]
    NoHeartbeat,

    #[error("No route for {0}")]
    UnknownRoute(String),

    #[error("Method not allowed (allowed: {0})")]
    MethodNotAllowed(&'static str),
}

impl From<RelayError> for Response<Body> {
    fn from(err: RelayError) -> Self {
        let (status, body) = match err {
            RelayError::NoHeartbeat | RelayError::UnknownRoute(_) => {
                (StatusCode::NOT_FOUND, "404 page not found\n")
            }
            RelayError::MethodNotAllowed(_) => {
                (StatusCode::METHOD_NOT_ALLOWED, "405 method not allowed\n")
            }
        };

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        if let RelayError::MethodNotAllowed(allow) = err {
            response
                .headers_mut()
                .insert(ALLOW, HeaderValue::from_static(allow));
        }
        response
    }
}
