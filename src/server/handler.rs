// src/server/handler.rs
use hyper::{Body, Request, Response};
use std::convert::Infallible;
use std::sync::Arc;
use tower::Service;
use tracing::Instrument;
use uuid::Uuid;

use crate::relay::Relay;

#[derive(Clone)]
pub struct RequestHandler {
    relay: Arc<Relay>,
}

impl RequestHandler {
    pub fn new(relay: Arc<Relay>) -> Self {
        Self { relay }
    }
}

impl Service<Request<Body>> for RequestHandler {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let relay = self.relay.clone();
        let span = tracing::debug_span!(
            "request",
            id = %Uuid::new_v4(),
            method = %req.method(),
            path = %req.uri().path(),
        );

        Box::pin(
            async move {
                let response = relay.handle(req).await.unwrap_or_else(|e| {
                    tracing::debug!(%e, "request rejected");
                    Response::from(e)
                });
                tracing::debug!(status = %response.status(), "response ready");
                Ok(response)
            }
            .instrument(span),
        )
    }
}
