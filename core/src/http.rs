//! HTTP value types passed between the pipelines and the transport.
//!
//! # Design
//! Requests and responses are plain data. `HttpRequest` is built fresh for
//! every call by the request builder, handed by value to the interceptor
//! and then to the transport, and never reused. The transport answers with
//! a `TransportReply` that mirrors what a platform networking callback
//! delivers (body, response metadata, error, any combination). The
//! dispatch pipeline turns it into a `ResponseOutcome` so the precedence
//! rules live in exactly one place.
//!
//! Header lists are `Vec<(String, String)>`: names compare
//! case-insensitively, insertion order is kept and duplicates are allowed.

use std::fmt;

use url::Url;

use crate::error::{ApiError, BoxError};

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outgoing HTTP request.
///
/// `identifier` is free-form correlation text for logs and tests. It
/// defaults to the composed URL string and is never used to deduplicate or
/// cache requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub identifier: String,
}

impl HttpRequest {
    /// First value of header `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Every value of header `name`, in insertion order.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Append a header. Existing headers with the same name are kept.
    pub fn append_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }
}

/// Response metadata as reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawResponse {
    Http {
        status: u16,
        headers: Vec<(String, String)>,
    },
    /// A response that is not a well-formed HTTP response.
    Other,
}

impl RawResponse {
    pub fn status(&self) -> Option<u16> {
        match self {
            RawResponse::Http { status, .. } => Some(*status),
            RawResponse::Other => None,
        }
    }
}

/// What a transport delivers to its completion: any combination of body,
/// response metadata and error.
#[derive(Debug, Default)]
pub struct TransportReply {
    pub body: Option<Vec<u8>>,
    pub response: Option<RawResponse>,
    pub error: Option<BoxError>,
}

impl TransportReply {
    /// A well-formed HTTP response.
    pub fn http(status: u16, headers: Vec<(String, String)>, body: Option<Vec<u8>>) -> Self {
        TransportReply {
            body,
            response: Some(RawResponse::Http { status, headers }),
            error: None,
        }
    }

    pub fn failed(error: impl Into<BoxError>) -> Self {
        TransportReply {
            error: Some(error.into()),
            ..TransportReply::default()
        }
    }
}

/// A response that passed status classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Classified result of one dispatch.
#[derive(Debug)]
pub enum ResponseOutcome {
    Success(HttpResponse),
    HttpError { status: u16, body: Option<Vec<u8>> },
    TransportError(BoxError),
}

impl ResponseOutcome {
    /// Classify a transport reply.
    ///
    /// A transport error wins over anything else in the reply. Without one,
    /// a missing or non-HTTP response is `UnexpectedResponse`; otherwise
    /// 400-599 is an HTTP error and every other status is a success.
    pub fn classify(reply: TransportReply) -> Result<ResponseOutcome, ApiError> {
        if let Some(error) = reply.error {
            return Ok(ResponseOutcome::TransportError(error));
        }
        match reply.response {
            Some(RawResponse::Http { status, headers }) => Ok(match status {
                400..=599 => ResponseOutcome::HttpError {
                    status,
                    body: reply.body,
                },
                _ => ResponseOutcome::Success(HttpResponse {
                    status,
                    headers,
                    body: reply.body,
                }),
            }),
            response => Err(ApiError::UnexpectedResponse {
                body: reply.body,
                response,
            }),
        }
    }

    /// Collapse into the single error channel. HTTP error bodies are dropped.
    pub fn into_result(self) -> Result<HttpResponse, ApiError> {
        match self {
            ResponseOutcome::Success(response) => Ok(response),
            ResponseOutcome::HttpError { status, .. } if status < 500 => {
                Err(ApiError::BadRequest(status))
            }
            ResponseOutcome::HttpError { status, .. } => Err(ApiError::ServerError(status)),
            ResponseOutcome::TransportError(error) => Err(ApiError::TransportError(error)),
        }
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
