//! Response compression.

use std::io::Write;
use std::sync::Arc;

use flate2::Compression;
use flate2::write::GzEncoder;
use http::StatusCode;
use http::header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH, HeaderValue, VARY};

use super::Middleware;
use crate::handler::{BoxFuture, BoxedHandler, DynHandler};
use crate::request::Request;

/// Gzip-encodes the response body when the client's `Accept-Encoding`
/// mentions `gzip`.
///
/// Responses that already carry a `Content-Encoding`, have an empty body, or
/// have a status that forbids a body pass through untouched.
/// Compressed responses get `Content-Encoding: gzip` and
/// `Vary: Accept-Encoding`.
#[derive(Clone, Copy, Debug)]
pub struct Gzip {
    level: Compression,
}

impl Gzip {
    pub fn new() -> Self {
        Self { level: Compression::default() }
    }

    /// Compression level, `0` (none) to `9` (best).
    pub fn level(mut self, level: u32) -> Self {
        self.level = Compression::new(level.min(9));
        self
    }
}

impl Default for Gzip {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for Gzip {
    fn wrap(&self, inner: BoxedHandler) -> BoxedHandler {
        Arc::new(GzipHandler { level: self.level, inner })
    }
}

struct GzipHandler {
    level: Compression,
    inner: BoxedHandler,
}

impl DynHandler for GzipHandler {
    fn call(&self, req: Request) -> BoxFuture {
        let accepts_gzip = req
            .header(ACCEPT_ENCODING.as_str())
            .is_some_and(|v| v.contains("gzip"));
        let inner = Arc::clone(&self.inner);
        if !accepts_gzip {
            return inner.call(req);
        }

        let level = self.level;
        Box::pin(async move {
            let mut res = inner.call(req).await?;
            if res.headers().contains_key(CONTENT_ENCODING)
                || res.body().is_empty()
                || forbids_body(res.code())
            {
                return Ok(res);
            }

            let mut encoder = GzEncoder::new(Vec::with_capacity(res.body().len() / 2), level);
            encoder.write_all(res.body())?;
            res.set_body(encoder.finish()?);

            let headers = res.headers_mut();
            headers.remove(CONTENT_LENGTH);
            headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
            headers.append(VARY, HeaderValue::from_static("Accept-Encoding"));
            Ok(res)
        })
    }
}

fn forbids_body(status: StatusCode) -> bool {
    status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED
}
