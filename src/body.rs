//! Request body stream.
//!
//! Handlers see one concrete body type regardless of where the request came
//! from: hyper's `Incoming` on a live server, or a buffered value in tests.
//! The router's admission guard may replace the stream with a length-limited
//! one, see [`Router::max_body_size`](crate::Router::max_body_size).

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full, Limited};
use hyper::body::Body as HttpBody;

use crate::error::{BoxError, Error};

/// A type-erased, streaming request body.
pub struct Body {
    inner: BoxBody<Bytes, BoxError>,
    limit: Option<u64>,
}

impl Body {
    /// Wraps any `http_body::Body` yielding [`Bytes`].
    pub fn new<B>(body: B) -> Self
    where
        B: HttpBody<Data = Bytes> + Send + Sync + 'static,
        B::Error: Into<BoxError>,
    {
        Self { inner: body.map_err(Into::into).boxed(), limit: None }
    }

    pub fn empty() -> Self {
        Self::new(Empty::<Bytes>::new())
    }

    /// `true` when the stream is known to carry no further data.
    pub fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    /// Exact length of the stream, when the producer knows it up front.
    pub fn exact_len(&self) -> Option<u64> {
        self.inner.size_hint().exact()
    }

    /// Caps the stream so reading more than `limit` bytes fails.
    ///
    /// Limits nest: the tightest one is reported in [`Error::BodyTooLarge`].
    pub(crate) fn limit(self, limit: u64) -> Self {
        let effective = self.limit.map_or(limit, |current| current.min(limit));
        // usize::MAX on 32-bit targets still covers any body we can buffer.
        let cap = usize::try_from(limit).unwrap_or(usize::MAX);
        Self {
            inner: Limited::new(self.inner, cap).boxed(),
            limit: Some(effective),
        }
    }

    /// Reads the whole stream into memory.
    pub async fn collect(self) -> Result<Bytes, Error> {
        let limit = self.limit;
        self.inner
            .collect()
            .await
            .map(|collected| collected.to_bytes())
            .map_err(|e| Error::from_body(e, limit))
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Body").field("limit", &self.limit).finish_non_exhaustive()
    }
}

impl From<hyper::body::Incoming> for Body {
    fn from(body: hyper::body::Incoming) -> Self {
        Self::new(body)
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        if bytes.is_empty() {
            return Self::empty();
        }
        Self::new(Full::new(bytes))
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Bytes::from(bytes).into()
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Bytes::from(text).into()
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Bytes::from_static(text.as_bytes()).into()
    }
}

impl From<()> for Body {
    fn from(_: ()) -> Self {
        Self::empty()
    }
}
