//! Dispatch and decoding pipelines.
//!
//! # Design
//! `HttpClient` owns a transport, a codec and one interceptor. Every call
//! runs the same strictly ordered steps: the interceptor sees the request
//! first (it may edit it or reject it, and a rejection means the transport
//! is never invoked), the transport executes it, the reply is classified,
//! and for typed calls the body is decoded. Calls share nothing mutable, so
//! any number can be in flight and they settle in any order.
//!
//! Builder failures in the convenience methods are delivered through the
//! returned `Pending`, like every other per-call failure.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::codec::{Codec, JsonCodec, KeyCasing};
use crate::error::{ApiError, BoxError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RawResponse, ResponseOutcome};
use crate::pending::Pending;
use crate::transport::Transport;

/// Inspects, edits or rejects each request just before it is dispatched.
///
/// Runs synchronously on the calling thread and must not block on I/O.
/// Returning `Err` fails the call with `ApiError::InterceptionRejected`.
pub trait Interceptor: Send + Sync {
    fn will_send(&self, request: &mut HttpRequest) -> Result<(), BoxError>;

    /// Run `self`, then `next`. A rejection from `self` skips `next`.
    fn then<I>(self, next: I) -> Chain<Self, I>
    where
        Self: Sized,
        I: Interceptor,
    {
        Chain { first: self, next }
    }
}

impl<F> Interceptor for F
where
    F: Fn(&mut HttpRequest) -> Result<(), BoxError> + Send + Sync,
{
    fn will_send(&self, request: &mut HttpRequest) -> Result<(), BoxError> {
        self(request)
    }
}

/// Leaves every request untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl Interceptor for PassThrough {
    fn will_send(&self, _: &mut HttpRequest) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Two interceptors run in order. Built with `Interceptor::then`.
#[derive(Debug, Clone)]
pub struct Chain<A, B> {
    first: A,
    next: B,
}

impl<A: Interceptor, B: Interceptor> Interceptor for Chain<A, B> {
    fn will_send(&self, request: &mut HttpRequest) -> Result<(), BoxError> {
        self.first.will_send(request)?;
        self.next.will_send(request)
    }
}

/// Dispatches requests through a transport and classifies the replies.
pub struct HttpClient<T, C = JsonCodec> {
    transport: T,
    codec: Arc<C>,
    interceptor: Box<dyn Interceptor>,
}

impl<T: Transport> HttpClient<T> {
    pub fn new(transport: T) -> Self {
        Self::with_codec(transport, JsonCodec)
    }
}

impl<T: Transport, C: Codec> HttpClient<T, C> {
    pub fn with_codec(transport: T, codec: C) -> Self {
        HttpClient {
            transport,
            codec: Arc::new(codec),
            interceptor: Box::new(PassThrough),
        }
    }

    /// Replace the interceptor. There is only ever one.
    pub fn with_interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptor = Box::new(interceptor);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Dispatch `request` and settle with the classified response.
    pub fn send(&self, mut request: HttpRequest) -> Pending<HttpResponse> {
        let span = tracing::debug_span!(
            "dispatch",
            dispatch_id = %Uuid::new_v4(),
            method = %request.method,
            identifier = %request.identifier
        );
        let _guard = span.enter();

        if let Err(source) = self.interceptor.will_send(&mut request) {
            tracing::warn!(error = %source, "request rejected by interceptor");
            return Pending::failed(ApiError::InterceptionRejected(source));
        }

        let settle_span = span.clone();
        let (completion, pending) = Pending::channel(move |reply| {
            let _guard = settle_span.enter();
            let result = ResponseOutcome::classify(reply).and_then(ResponseOutcome::into_result);
            match &result {
                Ok(response) => tracing::debug!(status = response.status, "dispatch settled"),
                Err(ApiError::TransportError(error)) => tracing::warn!(%error, "transport failed"),
                Err(error) => tracing::debug!(%error, "dispatch failed"),
            }
            result
        });

        tracing::debug!(url = %request.url, "handing request to transport");
        self.transport.execute(request, completion);
        pending
    }

    /// Dispatch `request` and decode the body with declared key casing.
    pub fn send_decodable<D>(&self, request: HttpRequest) -> Pending<D>
    where
        D: DeserializeOwned + Send + 'static,
    {
        self.send_decodable_with(request, KeyCasing::default())
    }

    /// Dispatch `request` and decode the body with `casing`.
    ///
    /// A response without a body settles as `UnexpectedResponse` and no
    /// decode is attempted.
    pub fn send_decodable_with<D>(&self, request: HttpRequest, casing: KeyCasing) -> Pending<D>
    where
        D: DeserializeOwned + Send + 'static,
    {
        let codec = Arc::clone(&self.codec);
        self.send(request)
            .and_then(move |response| decode(codec.as_ref(), response, casing))
    }

    /// GET an absolute URL, returning the raw response.
    pub fn get(&self, url: &str, params: &[(&str, Option<&str>)]) -> Pending<HttpResponse> {
        match HttpRequest::for_url(url).params(params.iter().copied()).build() {
            Ok(request) => self.send(request),
            Err(e) => Pending::failed(e),
        }
    }

    pub fn get_decoded<D>(&self, url: &str) -> Pending<D>
    where
        D: DeserializeOwned + Send + 'static,
    {
        match HttpRequest::for_url(url).build() {
            Ok(request) => self.send_decodable(request),
            Err(e) => Pending::failed(e),
        }
    }

    pub fn put<P>(&self, url: &str, payload: &P) -> Pending<HttpResponse>
    where
        P: Serialize + ?Sized,
    {
        match self.upload(url, HttpMethod::Put, payload) {
            Ok(request) => self.send(request),
            Err(e) => Pending::failed(e),
        }
    }

    pub fn put_decoded<P, D>(&self, url: &str, payload: &P) -> Pending<D>
    where
        P: Serialize + ?Sized,
        D: DeserializeOwned + Send + 'static,
    {
        match self.upload(url, HttpMethod::Put, payload) {
            Ok(request) => self.send_decodable(request),
            Err(e) => Pending::failed(e),
        }
    }

    pub fn post<P>(&self, url: &str, payload: &P) -> Pending<HttpResponse>
    where
        P: Serialize + ?Sized,
    {
        match self.upload(url, HttpMethod::Post, payload) {
            Ok(request) => self.send(request),
            Err(e) => Pending::failed(e),
        }
    }

    pub fn post_decoded<P, D>(&self, url: &str, payload: &P) -> Pending<D>
    where
        P: Serialize + ?Sized,
        D: DeserializeOwned + Send + 'static,
    {
        match self.upload(url, HttpMethod::Post, payload) {
            Ok(request) => self.send_decodable(request),
            Err(e) => Pending::failed(e),
        }
    }

    pub fn delete(&self, url: &str) -> Pending<HttpResponse> {
        match HttpRequest::for_url(url).method(HttpMethod::Delete).build() {
            Ok(request) => self.send(request),
            Err(e) => Pending::failed(e),
        }
    }

    fn upload<P>(&self, url: &str, method: HttpMethod, payload: &P) -> Result<HttpRequest, ApiError>
    where
        P: Serialize + ?Sized,
    {
        HttpRequest::for_url(url)
            .method(method)
            .build_with_payload_using(self.codec.as_ref(), payload)
    }
}

fn decode<C, D>(codec: &C, response: HttpResponse, casing: KeyCasing) -> Result<D, ApiError>
where
    C: Codec,
    D: DeserializeOwned,
{
    match response.body {
        None => Err(ApiError::UnexpectedResponse {
            body: None,
            response: Some(RawResponse::Http {
                status: response.status,
                headers: response.headers,
            }),
        }),
        Some(body) => codec
            .decode(&body, casing)
            .map_err(|source| ApiError::DecodingFailed {
                target: std::any::type_name::<D>(),
                body,
                source,
            }),
    }
}
