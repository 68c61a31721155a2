//! Minimal waymark demo: parameters, a wildcard, a prefix subrouter, and the
//! built-in middleware.
//!
//! Run with:
//!   RUST_LOG=waymark=debug,info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:8080/product/42
//!   curl http://localhost:8080/hello/ada/lovelace
//!   curl http://localhost:8080/static/css/site.css
//!   curl http://localhost:8080/api/users/7
//!   curl -X POST http://localhost:8080/product/42      # 405
//!   curl http://localhost:8080/panic                   # 500 via Recovery
//!   curl -H 'accept-encoding: gzip' http://localhost:8080/ --output -
//!   curl -X OPTIONS -H 'origin: http://localhost:3000' -i http://localhost:8080/

use tracing_subscriber::EnvFilter;
use waymark::middleware::{self, Cors, Gzip, Next, Recovery, Trace};
use waymark::{Error, Method, Request, Response, Router, Server};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut app = Router::new();
    app.layer(Trace::new())
        .layer(Recovery::new().print_stack(false))
        .layer(Cors::new().allowed_origins(["http://localhost:3000"]).allowed_methods(["GET", "POST"]))
        .layer(Gzip::new())
        .layer(middleware::from_fn(served_by))
        .max_body_size(64 * 1024);

    // OPTIONS on the index lets browsers preflight through the Cors layer.
    app.on_many([Method::GET, Method::OPTIONS], "/", index)?
        .get("/product/:id", product)?
        .get("/hello/:name/:last", hello)?
        .get("/static/*", asset)?
        .get("/panic", panic)?;

    app.subrouter("/api").get("/users/:id", user)?;

    Server::bind("0.0.0.0:8080")?.serve(app).await
}

async fn served_by(req: Request, next: Next) -> Result<Response, Error> {
    let mut res = next.run(req).await?;
    res.headers_mut()
        .insert("x-served-by", http::HeaderValue::from_static("waymark-demo"));
    Ok(res)
}

async fn index(_req: Request) -> &'static str {
    "index!"
}

async fn product(req: Request) -> String {
    format!("Product ID {}", req.param("id").unwrap_or_default())
}

async fn hello(req: Request) -> String {
    tracing::info!(params = ?req.params(), "hello");
    format!("Hello {}", req.param("name").unwrap_or_default())
}

async fn asset(req: Request) -> String {
    format!("asset {}", req.param("path").unwrap_or_default())
}

async fn panic(_req: Request) -> &'static str {
    panic!("danger danger danger!")
}

async fn user(req: Request) -> String {
    format!("users {}", req.param("id").unwrap_or_default())
}
