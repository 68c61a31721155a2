//! Middleware layer.
//!
//! A middleware turns one handler into another: [`Middleware::wrap`] receives
//! the inner [`BoxedHandler`] and returns the handler that runs in its place.
//! Layers registered with [`Router::layer`](crate::Router::layer) are applied
//! per request, first-registered outermost:
//!
//! ```text
//! router.layer(A).layer(B)
//!
//!   A ──▶ B ──▶ handler
//!   A ◀── B ◀──┘
//! ```
//!
//! A layer may return without calling the inner handler at all, which is how
//! [`Cors`] answers preflight requests.
//!
//! Built-in layers:
//! - [`Cors`] — cross-origin headers and preflight short-circuit
//! - [`Gzip`] — response compression
//! - [`Recovery`] — turns faults into logged `500`s
//! - [`Trace`] — per-request span with method, path, status, latency

mod cors;
mod gzip;
mod recovery;
mod trace;

use std::future::Future;
use std::sync::Arc;

pub use cors::Cors;
pub use gzip::Gzip;
pub use recovery::{Recovery, RecoveryLogger};
pub use trace::Trace;

use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler, DynHandler, IntoResult};
use crate::request::Request;
use crate::response::Response;

/// A handler-wrapping capability.
///
/// Implemented for any `Fn(BoxedHandler) -> BoxedHandler`, so a closure is
/// enough for layers that only need [`DynHandler`] plumbing. For plain
/// before/after logic prefer [`from_fn`].
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, inner: BoxedHandler) -> BoxedHandler;
}

impl<F> Middleware for F
where
    F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
{
    fn wrap(&self, inner: BoxedHandler) -> BoxedHandler {
        self(inner)
    }
}

/// Wraps `handler` in `layers`, last-registered innermost.
pub(crate) fn chain(layers: &[Arc<dyn Middleware>], handler: &BoxedHandler) -> BoxedHandler {
    layers
        .iter()
        .rev()
        .fold(Arc::clone(handler), |inner, layer| layer.wrap(inner))
}

// ── from_fn ───────────────────────────────────────────────────────────────────

/// The rest of the chain, as seen from inside a [`from_fn`] middleware.
pub struct Next(BoxedHandler);

impl Next {
    pub async fn run(self, req: Request) -> Result<Response, Error> {
        self.0.call(req).await
    }
}

/// Builds a middleware from an async function.
///
/// ```rust
/// use waymark::middleware::{self, Next};
/// use waymark::{Request, Router};
///
/// let mut app = Router::new();
/// app.layer(middleware::from_fn(|req: Request, next: Next| async move {
///     let mut res = next.run(req).await?;
///     res.headers_mut().insert("x-served-by", "waymark".parse().unwrap());
///     Ok::<_, waymark::Error>(res)
/// }));
/// ```
pub fn from_fn<F, Fut, R>(f: F) -> FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResult + Send + 'static,
{
    FromFn(Arc::new(f))
}

/// Middleware returned by [`from_fn`].
pub struct FromFn<F>(Arc<F>);

impl<F, Fut, R> Middleware for FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResult + Send + 'static,
{
    fn wrap(&self, inner: BoxedHandler) -> BoxedHandler {
        Arc::new(FromFnHandler { f: Arc::clone(&self.0), inner })
    }
}

struct FromFnHandler<F> {
    f: Arc<F>,
    inner: BoxedHandler,
}

impl<F, Fut, R> DynHandler for FromFnHandler<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResult + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.f)(req, Next(Arc::clone(&self.inner)));
        Box::pin(async move { fut.await.into_result() })
    }
}
