//! # waymark
//!
//! An HTTP request dispatcher: ordered routes with named path parameters,
//! host- and prefix-keyed subrouters, and a middleware chain.
//!
//! ## Matching rules
//!
//! - Templates use `:name` for one path segment and `*` for the rest of the
//!   path (exposed as the `path` parameter).
//! - Routes are tried in registration order; the first one whose method and
//!   path match wins.
//! - If none matches but some route was registered for another method, the
//!   answer is `405 Method not allowed`; otherwise the not-found handler runs
//!   (`404 page not found` by default).
//! - Subrouters are consulted first, in creation order. A prefix subrouter
//!   sees the path with its prefix removed.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use waymark::middleware::{Recovery, Trace};
//! use waymark::{Error, Request, Response, Router, Server, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let mut app = Router::new();
//!     app.layer(Trace::new())
//!         .layer(Recovery::new())
//!         .max_body_size(1 << 20)
//!         .get("/users/:id", get_user)?
//!         .post("/users", create_user)?;
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#))
//! }
//!
//! async fn create_user(mut req: Request) -> Result<Response, Error> {
//!     let body = req.bytes().await?;
//!     if body.is_empty() {
//!         return Ok(Response::status(StatusCode::BAD_REQUEST));
//!     }
//!     Ok(Response::builder()
//!         .status(StatusCode::CREATED)
//!         .header("location", "/users/99")
//!         .json(body))
//! }
//! ```

mod body;
mod error;
mod handler;
mod request;
mod response;
mod route;
mod router;
mod server;

pub mod middleware;

pub use body::Body;
pub use error::{BoxError, Error};
pub use handler::{BoxFuture, BoxedHandler, DynHandler, Handler, IntoResult, boxed};
pub use http::{Method, StatusCode};
pub use request::{Params, Request};
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use route::Route;
pub use router::Router;
pub use server::Server;
