//! Promise-style HTTP client core.
//!
//! # Overview
//! Application code describes a request (host, path, query, method, payload,
//! optional identifier) and gets back a `Pending` future that settles exactly
//! once with a typed value or an `ApiError`. The network itself is behind the
//! `Transport` trait; `UreqTransport` is the stock implementation.
//!
//! # Design
//! - `request` builds immutable `HttpRequest` values; it never does I/O.
//! - `dispatch::HttpClient` runs interceptor, transport, classification and
//!   decoding in that order, one `Pending` per call.
//! - `client::ApiClient` binds an `HttpClient` to a validated base host and
//!   adds default headers, routes and per-verb helpers.
//! - Every failure after construction arrives through the call's `Pending`.

pub mod client;
pub mod codec;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod pending;
pub mod request;
pub mod transport;

pub use client::{ApiClient, ClientConfig, DefaultHeaders, Route, UploadRoute};
pub use codec::{Codec, JsonCodec, KeyCasing};
pub use dispatch::{Chain, HttpClient, Interceptor, PassThrough};
pub use error::{ApiError, BoxError, CodecError, CompletionDropped};
pub use http::{HttpMethod, HttpRequest, HttpResponse, RawResponse, ResponseOutcome, TransportReply};
pub use pending::Pending;
pub use request::RequestBuilder;
pub use transport::{Completion, Transport};

#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
