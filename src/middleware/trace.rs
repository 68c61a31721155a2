//! Per-request tracing span.

use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;

use super::Middleware;
use crate::handler::{BoxFuture, BoxedHandler, DynHandler};
use crate::request::Request;

/// Opens an `info` span per request carrying the method, path and matched
/// route template, and logs the status and latency when the chain returns.
#[derive(Clone, Copy, Debug, Default)]
pub struct Trace;

impl Trace {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for Trace {
    fn wrap(&self, inner: BoxedHandler) -> BoxedHandler {
        Arc::new(TraceHandler { inner })
    }
}

struct TraceHandler {
    inner: BoxedHandler,
}

impl DynHandler for TraceHandler {
    fn call(&self, req: Request) -> BoxFuture {
        let span = tracing::info_span!(
            "request",
            method = %req.method(),
            path = req.path(),
            route = req.route().map(|r| r.template()).unwrap_or_default(),
        );
        let inner = Arc::clone(&self.inner);
        Box::pin(
            async move {
                let started = Instant::now();
                let outcome = inner.call(req).await;
                let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
                match &outcome {
                    Ok(res) => tracing::info!(status = res.code().as_u16(), latency_ms, "request completed"),
                    Err(err) => tracing::warn!(error = %err, latency_ms, "request failed"),
                }
                outcome
            }
            .instrument(span),
        )
    }
}
