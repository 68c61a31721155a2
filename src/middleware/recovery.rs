//! Fault recovery.
//!
//! Without this layer a handler fault escapes [`Router::serve`] and the
//! server drops the connection. With it, the fault becomes an empty
//! `500 Internal Server Error` and a log line.
//!
//! Two kinds of fault are caught:
//! - an `Err` returned by the inner chain, and
//! - a panic raised while polling the inner chain's future.
//!
//! [`Error::BodyTooLarge`] is passed through so the router still answers `413`.
//!
//! [`Router::serve`]: crate::Router::serve

use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use http::StatusCode;

use super::Middleware;
use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler, DynHandler};
use crate::request::Request;
use crate::response::Response;

/// Destination for fault reports.
///
/// The default sends them to `tracing::error!`. Implement this to route them
/// elsewhere, e.g. into a test buffer or an alerting hook.
pub trait RecoveryLogger: Send + Sync + 'static {
    fn log(&self, message: &str);
}

struct TracingLogger;

impl RecoveryLogger for TracingLogger {
    fn log(&self, message: &str) {
        tracing::error!("{message}");
    }
}

/// Converts handler faults into `500` responses.
///
/// ```rust
/// use waymark::Router;
/// use waymark::middleware::Recovery;
///
/// let mut app = Router::new();
/// app.layer(Recovery::new().print_stack(true));
/// ```
#[derive(Clone)]
pub struct Recovery {
    logger: Arc<dyn RecoveryLogger>,
    print_stack: bool,
}

impl Recovery {
    pub fn new() -> Self {
        Self { logger: Arc::new(TracingLogger), print_stack: false }
    }

    pub fn logger(mut self, logger: impl RecoveryLogger) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    /// Also report a backtrace captured where the fault was caught.
    pub fn print_stack(mut self, enabled: bool) -> Self {
        self.print_stack = enabled;
        self
    }

    fn report(&self, message: &str) {
        self.logger.log(message);
        if self.print_stack {
            self.logger.log(&Backtrace::force_capture().to_string());
        }
    }
}

impl Default for Recovery {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for Recovery {
    fn wrap(&self, inner: BoxedHandler) -> BoxedHandler {
        Arc::new(RecoveryHandler { config: self.clone(), inner })
    }
}

struct RecoveryHandler {
    config: Recovery,
    inner: BoxedHandler,
}

impl DynHandler for RecoveryHandler {
    fn call(&self, req: Request) -> BoxFuture {
        let config = self.config.clone();
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            // Calling `inner` may itself panic before a future exists.
            let outcome = AssertUnwindSafe(async move { inner.call(req).await })
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(res)) => Ok(res),
                // Admission failures are answered by the router, not faults.
                Ok(Err(err @ Error::BodyTooLarge { .. })) => Err(err),
                Ok(Err(err)) => {
                    config.report(&err.to_string());
                    Ok(internal_error())
                }
                Err(panic) => {
                    config.report(&panic_message(panic.as_ref()));
                    Ok(internal_error())
                }
            }
        })
    }
}

fn internal_error() -> Response {
    Response::status(StatusCode::INTERNAL_SERVER_ERROR)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_owned()
    }
}
