//! Ordered request router.
//!
//! Routes are kept in registration order and scanned linearly; the first
//! route whose method and path both match wins. A later, more specific route
//! never beats an earlier one that also matches.
//!
//! Before its own routes, a router offers the request to its subrouters, in
//! the order they were created. A subrouter keyed by a host claims requests
//! addressed to that host; one keyed by a path prefix claims requests whose
//! path starts with it, and sees the path with the prefix removed.
//!
//! Configure with `&mut Router`, then serve with `&Router`: registration and
//! dispatch cannot overlap.

use std::fmt;
use std::sync::Arc;

use http::{Method, StatusCode};
use tracing::debug;

use crate::error::Error;
use crate::handler::{BoxedHandler, Handler, boxed};
use crate::middleware::{self, Middleware};
use crate::request::Request;
use crate::response::Response;
use crate::route::Route;

/// The application router.
///
/// ```rust
/// # use waymark::{Request, Response, Router};
/// # async fn get_user(_: Request) -> Response { Response::text("") }
/// # async fn create_user(_: Request) -> Response { Response::text("") }
/// # async fn list_items(_: Request) -> Response { Response::text("") }
/// # fn main() -> Result<(), waymark::Error> {
/// let mut app = Router::new();
/// app.max_body_size(1 << 20)
///     .get("/users/:id", get_user)?
///     .post("/users", create_user)?;
///
/// app.subrouter("/api").get("/items", list_items)?;
/// # Ok(())
/// # }
/// ```
pub struct Router {
    routes: Vec<Arc<Route>>,
    middleware: Vec<Arc<dyn Middleware>>,
    subrouters: Vec<(String, Router)>,
    not_found: BoxedHandler,
    max_body_size: u64,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            middleware: Vec::new(),
            subrouters: Vec::new(),
            not_found: boxed(default_not_found),
            max_body_size: 0,
        }
    }

    // ── Configuration ────────────────────────────────────────────────────────

    /// Handler invoked when no route matches. Defaults to a `404` with body
    /// `404 page not found`. It runs without this router's middleware.
    pub fn not_found(&mut self, handler: impl Handler) -> &mut Self {
        self.not_found = boxed(handler);
        self
    }

    /// Body-size ceiling in bytes; `0` (the default) means unlimited.
    ///
    /// A request declaring a larger body is answered with `413` before any
    /// routing. Bodies of unknown or understated length are cut off while
    /// being read, surfacing as [`Error::BodyTooLarge`] from
    /// [`Request::bytes`], which [`Router::serve`] also answers with `413`.
    pub fn max_body_size(&mut self, bytes: u64) -> &mut Self {
        self.max_body_size = bytes;
        self
    }

    // ── Registration ─────────────────────────────────────────────────────────

    /// Register a handler for a method + path template.
    ///
    /// Templates use `:name` for one path segment and `*` for the rest of the
    /// path (captured as `path`). Fails if the template does not compile.
    pub fn on(
        &mut self,
        method: Method,
        template: &str,
        handler: impl Handler,
    ) -> Result<&mut Self, Error> {
        self.add(method, template, boxed(handler))?;
        Ok(self)
    }

    /// Register one handler under several methods. Nothing is registered if
    /// the template does not compile.
    pub fn on_many(
        &mut self,
        methods: impl IntoIterator<Item = Method>,
        template: &str,
        handler: impl Handler,
    ) -> Result<&mut Self, Error> {
        let handler = boxed(handler);
        let routes = methods
            .into_iter()
            .map(|method| Route::compile(method, template, Arc::clone(&handler)))
            .collect::<Result<Vec<_>, _>>()?;
        for route in routes {
            debug!(method = %route.method(), template, "route registered");
            self.routes.push(Arc::new(route));
        }
        Ok(self)
    }

    pub fn get(&mut self, template: &str, handler: impl Handler) -> Result<&mut Self, Error> {
        self.on(Method::GET, template, handler)
    }

    pub fn post(&mut self, template: &str, handler: impl Handler) -> Result<&mut Self, Error> {
        self.on(Method::POST, template, handler)
    }

    pub fn put(&mut self, template: &str, handler: impl Handler) -> Result<&mut Self, Error> {
        self.on(Method::PUT, template, handler)
    }

    pub fn patch(&mut self, template: &str, handler: impl Handler) -> Result<&mut Self, Error> {
        self.on(Method::PATCH, template, handler)
    }

    pub fn delete(&mut self, template: &str, handler: impl Handler) -> Result<&mut Self, Error> {
        self.on(Method::DELETE, template, handler)
    }

    fn add(&mut self, method: Method, template: &str, handler: BoxedHandler) -> Result<(), Error> {
        let route = Route::compile(method, template, handler)?;
        debug!(method = %route.method(), template, "route registered");
        self.routes.push(Arc::new(route));
        Ok(())
    }

    /// Append a middleware. The first one added runs outermost.
    ///
    /// Subrouters created *before* this call keep the list they were created
    /// with.
    pub fn layer(&mut self, middleware: impl Middleware) -> &mut Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Returns the child router for `key`, creating it on first use.
    ///
    /// `key` is either a host (`"www.example.com"`) or a path prefix
    /// (`"/api"`). A new child starts with a copy of this router's current
    /// middleware and not-found handler, and no routes.
    pub fn subrouter(&mut self, key: &str) -> &mut Router {
        let index = match self.subrouters.iter().position(|(k, _)| k == key) {
            Some(index) => index,
            None => {
                let child = Router {
                    routes: Vec::new(),
                    middleware: self.middleware.clone(),
                    subrouters: Vec::new(),
                    not_found: Arc::clone(&self.not_found),
                    max_body_size: 0,
                };
                self.subrouters.push((key.to_owned(), child));
                self.subrouters.len() - 1
            }
        };
        &mut self.subrouters[index].1
    }

    /// Registered routes in match order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter().map(|route| route.as_ref())
    }

    // ── Dispatch ─────────────────────────────────────────────────────────────

    /// Routes one request and produces its response.
    ///
    /// Routing misses are responses (`404`, `405`, `413`). `Err` means a
    /// handler or middleware fault that no
    /// [`Recovery`](crate::middleware::Recovery) layer absorbed.
    pub async fn serve(&self, req: Request) -> Result<Response, Error> {
        match self.dispatch(req).await {
            Err(Error::BodyTooLarge { limit }) => {
                debug!(limit, "request body too large");
                Ok(too_large())
            }
            outcome => outcome,
        }
    }

    async fn dispatch(&self, mut req: Request) -> Result<Response, Error> {
        let mut router = self;
        loop {
            router.admit(&mut req)?;
            match router.claim(&mut req) {
                Some(child) => router = child,
                None => break,
            }
        }
        router.route(req).await
    }

    /// Body-size admission: reject declared oversize bodies, cap the rest.
    fn admit(&self, req: &mut Request) -> Result<(), Error> {
        let limit = self.max_body_size;
        if limit == 0 || req.body.is_end_stream() {
            return Ok(());
        }
        if req.declared_len().is_some_and(|len| len > limit) {
            return Err(Error::BodyTooLarge { limit });
        }
        let body = req.take_body();
        req.body = body.limit(limit);
        Ok(())
    }

    /// First subrouter owning the request by host or path prefix.
    fn claim(&self, req: &mut Request) -> Option<&Router> {
        for (key, child) in &self.subrouters {
            if req.host() == Some(key.as_str()) {
                debug!(host = %key, "delegating to host subrouter");
                return Some(child);
            }
            if req.path.starts_with(key.as_str()) {
                debug!(prefix = %key, "delegating to prefix subrouter");
                req.path.replace_range(..key.len(), "");
                return Some(child);
            }
        }
        None
    }

    async fn route(&self, mut req: Request) -> Result<Response, Error> {
        let mut method_mismatch = false;
        for route in &self.routes {
            if route.method() != req.method() {
                method_mismatch = true;
                continue;
            }
            let Some(params) = route.matches(req.path()) else {
                continue;
            };

            debug!(template = route.template(), "route matched");
            let handler = middleware::chain(&self.middleware, &route.handler);
            req.params = params;
            req.route = Some(Arc::clone(route));
            return handler.call(req).await;
        }

        if method_mismatch {
            debug!(method = %req.method(), path = req.path(), "method not allowed");
            return Ok(method_not_allowed());
        }
        debug!(path = req.path(), "no route matched");
        self.not_found.call(req).await
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("middleware", &self.middleware.len())
            .field("subrouters", &self.subrouters)
            .field("max_body_size", &self.max_body_size)
            .finish_non_exhaustive()
    }
}

async fn default_not_found(_req: Request) -> Response {
    Response::builder().status(StatusCode::NOT_FOUND).text("404 page not found")
}

fn method_not_allowed() -> Response {
    Response::builder().status(StatusCode::METHOD_NOT_ALLOWED).text("Method not allowed")
}

fn too_large() -> Response {
    Response::builder().status(StatusCode::PAYLOAD_TOO_LARGE).text("Request body too large")
}
