//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! A route table holds handlers of *different* types in a single `Vec`, and
//! middleware must be able to wrap any of them. Both work through one trait
//! object, [`DynHandler`], shared behind an `Arc`:
//!
//! ```text
//! async fn hello(req: Request) -> Response { … }   ← user writes this
//!        ↓ router.get("/", hello)
//! hello.into_boxed_handler()                       ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(hello))                       ← stored as BoxedHandler
//!        ↓  middleware.wrap(handler) per request
//! handler.call(req)                                ← one vtable dispatch
//!        ↓
//! Box::pin(async { hello(req).await.into_result() })
//! ```
//!
//! Every layer resolves to `Result<Response, Error>`: a handler that fails
//! returns `Err`, and it is up to an outer layer (see
//! [`middleware::Recovery`](crate::middleware::Recovery)) to turn it into a
//! response.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::Error;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A heap-allocated, type-erased future resolving to a handler outcome.
///
/// `Send + 'static` lets tokio move the future across worker threads.
pub type BoxFuture = Pin<Box<dyn Future<Output = Result<Response, Error>> + Send + 'static>>;

/// Object-safe dispatch interface shared by handlers and middleware layers.
///
/// Implement this directly when writing a middleware that needs its own
/// state around the inner handler; plain route handlers never need to.
pub trait DynHandler: Send + Sync + 'static {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A type-erased handler shared across concurrent requests.
pub type BoxedHandler = Arc<dyn DynHandler>;

// ── Handler outcomes ──────────────────────────────────────────────────────────

/// Conversion of a handler's return value into its outcome.
///
/// Every [`IntoResponse`] type succeeds. `Result<T, E>` succeeds with `T`
/// or fails with `E` converted into [`Error`].
pub trait IntoResult {
    fn into_result(self) -> Result<Response, Error>;
}

impl<T: IntoResponse> IntoResult for T {
    fn into_result(self) -> Result<Response, Error> {
        Ok(self.into_response())
    }
}

impl<T, E> IntoResult for Result<T, E>
where
    T: IntoResponse,
    E: Into<Error>,
{
    fn into_result(self) -> Result<Response, Error> {
        self.map(IntoResponse::into_response).map_err(Into::into)
    }
}

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is satisfied by any `async fn` (or
/// closure returning a future) with the shape:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResult
/// ```
///
/// The trait is sealed: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResult + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResult + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Boxes a handler so it can be stored, shared, or wrapped by hand.
pub fn boxed(handler: impl Handler) -> BoxedHandler {
    handler.into_boxed_handler()
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Bridges a concrete handler `F` into the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut, R> DynHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResult + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_result() })
    }
}
