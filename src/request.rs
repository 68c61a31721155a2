//! Incoming HTTP request type.
//!
//! A [`Request`] is also the per-request carrier: once the router selects a
//! route it stores the captured [`Params`] and the matched [`Route`] on the
//! request before the middleware chain runs, so every layer can read them.

use std::collections::HashMap;
use std::collections::hash_map;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, HOST};
use http::{HeaderMap, Method, Uri};

use crate::body::Body;
use crate::error::Error;
use crate::route::Route;

/// Named path parameters captured by the matched route.
///
/// Values are the raw path segments; no decoding or type coercion happens.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Params(HashMap<String, String>);

impl Params {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn iter(&self) -> hash_map::Iter<'_, String, String> {
        self.0.iter()
    }

    pub fn into_map(self) -> HashMap<String, String> {
        self.0
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a String, &'a String);
    type IntoIter = hash_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// An incoming HTTP request.
///
/// Build one from any `http::Request` whose body converts into [`Body`]:
///
/// ```rust
/// use waymark::Request;
///
/// let req: Request = http::Request::get("/users/42").body(()).unwrap().into();
/// assert_eq!(req.path(), "/users/42");
/// assert!(req.params().is_empty());
/// ```
#[derive(Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) path: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Body,
    pub(crate) params: Params,
    pub(crate) route: Option<Arc<Route>>,
}

impl Request {
    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }

    /// The path the current router sees.
    ///
    /// Subrouters keyed by a path prefix strip that prefix before delegating,
    /// so a handler under `subrouter("/api")` sees `/users/1`, not
    /// `/api/users/1`. The untouched target stays available via [`uri`](Self::uri).
    pub fn path(&self) -> &str { &self.path }

    /// Host the request was addressed to: the URI authority for absolute-form
    /// targets, the `Host` header otherwise.
    pub fn host(&self) -> Option<&str> {
        match self.uri.authority() {
            Some(authority) => Some(authority.as_str()),
            None => self.header(HOST.as_str()),
        }
    }

    /// Case-insensitive header lookup; `None` for non-UTF-8 values.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/:id`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// All captured parameters; empty when no route matched or nothing was captured.
    pub fn params(&self) -> &Params { &self.params }

    /// The route selected for this request, if any.
    pub fn route(&self) -> Option<&Route> {
        self.route.as_deref()
    }

    pub fn body_mut(&mut self) -> &mut Body { &mut self.body }

    /// Takes the body stream out of the request, leaving an empty one.
    pub fn take_body(&mut self) -> Body {
        std::mem::take(&mut self.body)
    }

    /// Reads the whole body.
    ///
    /// Fails with [`Error::BodyTooLarge`] once a router's size ceiling is
    /// crossed, whatever the declared length said.
    pub async fn bytes(&mut self) -> Result<Bytes, Error> {
        self.take_body().collect().await
    }

    /// Reads the whole body as UTF-8 text.
    pub async fn text(&mut self) -> Result<String, Error> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::Body(e.into()))
    }

    /// Length announced by the client, or known exactly by the body producer.
    pub(crate) fn declared_len(&self) -> Option<u64> {
        self.header(CONTENT_LENGTH.as_str())
            .and_then(|v| v.trim().parse().ok())
            .or_else(|| self.body.exact_len())
    }
}

impl<B: Into<Body>> From<http::Request<B>> for Request {
    fn from(req: http::Request<B>) -> Self {
        let (parts, body) = req.into_parts();
        Self {
            method: parts.method,
            path: parts.uri.path().to_owned(),
            uri: parts.uri,
            headers: parts.headers,
            body: body.into(),
            params: Params::default(),
            route: None,
        }
    }
}
