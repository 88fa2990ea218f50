//! Error types for the courier client.
//!
//! # Design
//! Every failure a call can hit lands in one `ApiError`, whichever stage
//! produced it: building the request, the interceptor, the transport, status
//! classification or decoding. Callers match on the variant to tell them
//! apart. `InvalidHost` is the only variant returned synchronously (from
//! client construction); every other variant is delivered through the
//! call's `Pending` result.

use thiserror::Error;

use crate::http::RawResponse;

/// Type-erased error used at the interceptor and transport boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by the request builder, the dispatch and decoding
/// pipelines, and client construction.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The configured base host is not an absolute http(s) URL.
    #[error("invalid host: {0}")]
    InvalidHost(String),

    /// A GET request was given a payload.
    #[error("GET requests cannot have a body")]
    GetRequestCannotHaveBody,

    /// The base host, or the URL composed from it, failed to parse.
    #[error("failed to create URL from `{0}`")]
    FailedToCreateUrl(String),

    /// The payload could not be serialized.
    #[error("failed to encode `{payload}` payload")]
    EncodingFailed {
        payload: &'static str,
        #[source]
        source: CodecError,
    },

    /// The interceptor refused the request; nothing was sent.
    #[error("request rejected before dispatch: {0}")]
    InterceptionRejected(#[source] BoxError),

    /// The transport reported a failure.
    #[error("transport error: {0}")]
    TransportError(#[source] BoxError),

    /// The transport produced no usable HTTP response, or a decode was
    /// requested against a response without a body.
    #[error("unexpected response (status: {status:?}, body present: {present})",
        status = .response.as_ref().and_then(RawResponse::status),
        present = .body.is_some())]
    UnexpectedResponse {
        body: Option<Vec<u8>>,
        response: Option<RawResponse>,
    },

    /// HTTP status 400-499.
    #[error("bad request: HTTP {0}")]
    BadRequest(u16),

    /// HTTP status 500-599.
    #[error("server error: HTTP {0}")]
    ServerError(u16),

    /// The response body could not be decoded into the requested type.
    /// The raw bytes are kept for diagnostics.
    #[error("failed to decode `{target}` from a {len} byte body", len = .body.len())]
    DecodingFailed {
        target: &'static str,
        body: Vec<u8>,
        #[source]
        source: CodecError,
    },
}

impl ApiError {
    /// The HTTP status for `BadRequest` and `ServerError`.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::BadRequest(code) | ApiError::ServerError(code) => Some(*code),
            _ => None,
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, ApiError::InterceptionRejected(_))
    }

    /// Downcast the error raised by an interceptor or transport.
    pub fn inner<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            ApiError::InterceptionRejected(source) | ApiError::TransportError(source) => {
                source.downcast_ref::<E>()
            }
            _ => None,
        }
    }
}

/// Failure inside a `Codec`.
#[derive(Debug, Error)]
#[error("codec error: {0}")]
pub struct CodecError(#[source] BoxError);

impl CodecError {
    pub fn new(source: impl Into<BoxError>) -> Self {
        CodecError(source.into())
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(e: serde_json::Error) -> Self {
        CodecError(Box::new(e))
    }
}

/// Placed in `ApiError::TransportError` when a transport drops its
/// `Completion` without replying.
#[derive(Debug, Error)]
#[error("transport dropped the completion without replying")]
pub struct CompletionDropped;
