//! Unified error type.

/// Boxed error used for body streams and application failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by waymark's fallible operations.
///
/// Routing outcomes (404, 405) are expressed as [`Response`](crate::Response)
/// values, not as `Error`s. This type surfaces registration mistakes, body
/// admission failures, handler faults and hosting failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A path template did not compile into a matcher.
    #[error("invalid path template `{template}`: {source}")]
    InvalidTemplate {
        template: String,
        #[source]
        source: regex::Error,
    },

    /// The request body is larger than the router's configured ceiling.
    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: u64 },

    #[error("failed to read request body: {0}")]
    Body(#[source] BoxError),

    /// A handler or middleware gave up on the request.
    #[error("handler failed: {0}")]
    Handler(#[source] BoxError),

    #[error("invalid socket address: {0}")]
    AddrParse(#[from] std::net::AddrParseError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wraps an application error so it can be returned from a handler.
    ///
    /// ```rust
    /// # use waymark::{Error, Request};
    /// async fn load(req: Request) -> Result<String, Error> {
    ///     let id: u64 = req.param("id").unwrap_or("").parse().map_err(Error::handler)?;
    ///     Ok(format!("user {id}"))
    /// }
    /// ```
    pub fn handler(err: impl Into<BoxError>) -> Self {
        Self::Handler(err.into())
    }

    /// Classifies a failure raised while polling a (possibly limited) body.
    pub(crate) fn from_body(err: BoxError, limit: Option<u64>) -> Self {
        match (err.downcast_ref::<http_body_util::LengthLimitError>(), limit) {
            (Some(_), Some(limit)) => Self::BodyTooLarge { limit },
            _ => Self::Body(err),
        }
    }
}
