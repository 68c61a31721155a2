//! Cross-Origin Resource Sharing.

use std::sync::Arc;

use http::header::{self, HeaderName, HeaderValue};
use http::{HeaderMap, Method, StatusCode};

use super::Middleware;
use crate::handler::{BoxFuture, BoxedHandler, DynHandler};
use crate::request::Request;
use crate::response::Response;

/// Adds CORS headers to every response and answers `OPTIONS` preflight
/// requests itself with `200 OK`.
///
/// `Access-Control-Allow-Origin` echoes the request's `Origin` when it is in
/// the allowed list, and is `*` otherwise.
///
/// Like every layer, this one only runs once a route matched, so register
/// the paths that browsers preflight for `OPTIONS` as well:
///
/// ```rust
/// use waymark::{Method, Request, Router};
/// use waymark::middleware::Cors;
///
/// # async fn items(_: Request) -> &'static str { "[]" }
/// # fn main() -> Result<(), waymark::Error> {
/// let mut app = Router::new();
/// app.layer(
///     Cors::new()
///         .allowed_origins(["https://example.com"])
///         .allowed_methods(["GET", "POST"])
///         .allowed_headers(["Authorization", "Content-Type"])
///         .exposed_headers(["X-Request-Id"])
///         .max_age(86_400)
///         .allow_credentials(true),
/// );
/// app.on_many([Method::GET, Method::OPTIONS], "/items", items)?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct Cors(Arc<Settings>);

#[derive(Clone, Debug, Default)]
struct Settings {
    allowed_origins: Vec<String>,
    allowed_methods: Vec<String>,
    allowed_headers: Vec<String>,
    exposed_headers: Vec<String>,
    preflight_headers: Vec<(String, String)>,
    max_age: u64,
    allow_credentials: bool,
}

impl Cors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allowed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings().allowed_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    pub fn allowed_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings().allowed_methods = methods.into_iter().map(Into::into).collect();
        self
    }

    pub fn allowed_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings().allowed_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    pub fn exposed_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings().exposed_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// Extra header sent only on preflight responses.
    pub fn preflight_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings().preflight_headers.push((name.into(), value.into()));
        self
    }

    /// `Access-Control-Max-Age` in seconds; `0` omits the header.
    pub fn max_age(mut self, seconds: u64) -> Self {
        self.settings().max_age = seconds;
        self
    }

    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.settings().allow_credentials = allow;
        self
    }

    fn settings(&mut self) -> &mut Settings {
        Arc::make_mut(&mut self.0)
    }
}

impl Settings {
    /// Headers common to preflight and regular responses.
    fn headers_for(&self, req: &Request) -> Vec<(HeaderName, String)> {
        let origin = req
            .header(header::ORIGIN.as_str())
            .filter(|origin| self.allowed_origins.iter().any(|allowed| allowed == origin))
            .unwrap_or("*");

        let mut out = vec![(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.to_owned())];
        let lists = [
            (header::ACCESS_CONTROL_ALLOW_METHODS, &self.allowed_methods),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, &self.allowed_headers),
            (header::ACCESS_CONTROL_EXPOSE_HEADERS, &self.exposed_headers),
        ];
        for (name, values) in lists {
            if !values.is_empty() {
                out.push((name, values.join(", ")));
            }
        }
        if self.allow_credentials {
            out.push((header::ACCESS_CONTROL_ALLOW_CREDENTIALS, "true".to_owned()));
        }
        out
    }

    fn preflight(&self, req: &Request) -> Response {
        let mut res = Response::status(StatusCode::OK);
        let headers = res.headers_mut();
        for (name, value) in self.headers_for(req) {
            set(headers, name, &value, true);
        }
        if self.max_age > 0 {
            set(headers, header::ACCESS_CONTROL_MAX_AGE, &self.max_age.to_string(), true);
        }
        for (name, value) in &self.preflight_headers {
            match HeaderName::try_from(name.as_str()) {
                Ok(name) => set(headers, name, value, true),
                Err(_) => tracing::debug!(%name, "skipping invalid preflight header"),
            }
        }
        res
    }
}

fn set(headers: &mut HeaderMap, name: HeaderName, value: &str, overwrite: bool) {
    let Ok(value) = HeaderValue::try_from(value) else {
        tracing::debug!(%name, "skipping invalid CORS header value");
        return;
    };
    if overwrite || !headers.contains_key(&name) {
        headers.insert(name, value);
    }
}

impl Middleware for Cors {
    fn wrap(&self, inner: BoxedHandler) -> BoxedHandler {
        Arc::new(CorsHandler { settings: Arc::clone(&self.0), inner })
    }
}

struct CorsHandler {
    settings: Arc<Settings>,
    inner: BoxedHandler,
}

impl DynHandler for CorsHandler {
    fn call(&self, req: Request) -> BoxFuture {
        if req.method() == Method::OPTIONS {
            let res = self.settings.preflight(&req);
            return Box::pin(async move { Ok(res) });
        }

        let headers = self.settings.headers_for(&req);
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            let mut res = inner.call(req).await?;
            for (name, value) in headers {
                // Whatever the handler set itself takes precedence.
                set(res.headers_mut(), name, &value, false);
            }
            Ok(res)
        })
    }
}
