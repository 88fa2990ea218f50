//! Application-facing client bound to one base host.
//!
//! # Design
//! `ApiClient` validates its `ClientConfig` once, at construction, and then
//! only ever reads it. Each call builds a fresh request against the base
//! host and hands it to the inner `HttpClient`, so every per-call failure,
//! including a bad path or an unencodable payload, arrives through the
//! returned `Pending`.
//!
//! The interceptor is the extension point for auth, logging or refusing
//! requests. By default it is `DefaultHeaders`, which appends the configured
//! headers. `ApiClient::with_interceptor` replaces it outright; a hook that
//! still wants the configured headers composes
//! `DefaultHeaders::from(&config).then(hook)`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::codec::{Codec, JsonCodec, KeyCasing};
use crate::dispatch::{HttpClient, Interceptor};
use crate::error::{ApiError, BoxError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::pending::Pending;
use crate::request::RequestBuilder;
use crate::transport::Transport;

/// Long-lived client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Absolute http(s) URL every route path is resolved against.
    pub base_host: String,
    /// Appended to every outgoing request by `DefaultHeaders`.
    #[serde(default)]
    pub default_headers: Vec<(String, String)>,
}

impl ClientConfig {
    pub fn new(base_host: impl Into<String>) -> Self {
        ClientConfig {
            base_host: base_host.into(),
            default_headers: Vec::new(),
        }
    }

    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// The host must parse as an absolute URL with an http(s) scheme.
    pub fn validate(&self) -> Result<(), ApiError> {
        match Url::parse(&self.base_host) {
            Ok(url) if url.scheme().starts_with("http") => Ok(()),
            _ => Err(ApiError::InvalidHost(self.base_host.clone())),
        }
    }
}

/// Appends the configured default headers to every request. Headers the
/// request already carries are left in place, even with the same name.
#[derive(Debug, Clone, Default)]
pub struct DefaultHeaders {
    headers: Vec<(String, String)>,
}

impl DefaultHeaders {
    pub fn new(headers: Vec<(String, String)>) -> Self {
        DefaultHeaders { headers }
    }

    pub fn inject(&self, request: &mut HttpRequest) {
        request.headers.extend(self.headers.iter().cloned());
    }
}

impl From<&ClientConfig> for DefaultHeaders {
    fn from(config: &ClientConfig) -> Self {
        DefaultHeaders::new(config.default_headers.clone())
    }
}

impl Interceptor for DefaultHeaders {
    fn will_send(&self, request: &mut HttpRequest) -> Result<(), BoxError> {
        self.inject(request);
        Ok(())
    }
}

/// One logical endpoint call, supplied by the application.
pub trait Route {
    fn path(&self) -> &str;

    fn method(&self) -> HttpMethod;

    fn params(&self) -> Vec<(String, Option<String>)> {
        Vec::new()
    }

    fn identifier(&self) -> Option<&str> {
        None
    }

    /// Key casing for decoding the response body.
    fn response_casing(&self) -> KeyCasing {
        KeyCasing::default()
    }
}

/// A route that uploads a payload.
pub trait UploadRoute: Route {
    type Payload: Serialize;

    fn payload(&self) -> &Self::Payload;

    /// Key casing for encoding the payload.
    fn payload_casing(&self) -> KeyCasing {
        KeyCasing::default()
    }
}

/// Client facade bound to a validated base host.
pub struct ApiClient<T, C = JsonCodec> {
    config: ClientConfig,
    http: HttpClient<T, C>,
}

impl<T: Transport> ApiClient<T> {
    /// Fails with `InvalidHost` if the configured host is unusable.
    pub fn new(config: ClientConfig, transport: T) -> Result<Self, ApiError> {
        Self::with_codec(config, transport, JsonCodec)
    }

    /// Like `new`, with `interceptor` in place of `DefaultHeaders`.
    pub fn with_interceptor(
        config: ClientConfig,
        transport: T,
        interceptor: impl Interceptor + 'static,
    ) -> Result<Self, ApiError> {
        Self::with_codec_and_interceptor(config, transport, JsonCodec, interceptor)
    }
}

impl<T: Transport, C: Codec> ApiClient<T, C> {
    pub fn with_codec(config: ClientConfig, transport: T, codec: C) -> Result<Self, ApiError> {
        config.validate()?;
        let http = HttpClient::with_codec(transport, codec)
            .with_interceptor(DefaultHeaders::from(&config));
        tracing::debug!(host = %config.base_host, "api client ready");
        Ok(ApiClient { config, http })
    }

    pub fn with_codec_and_interceptor(
        config: ClientConfig,
        transport: T,
        codec: C,
        interceptor: impl Interceptor + 'static,
    ) -> Result<Self, ApiError> {
        config.validate()?;
        let http = HttpClient::with_codec(transport, codec).with_interceptor(interceptor);
        tracing::debug!(host = %config.base_host, "api client ready");
        Ok(ApiClient { config, http })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn http_client(&self) -> &HttpClient<T, C> {
        &self.http
    }

    pub fn get<D>(&self, path: &str, params: &[(&str, Option<&str>)], identifier: Option<&str>) -> Pending<D>
    where
        D: DeserializeOwned + Send + 'static,
    {
        match self.request(path, params, identifier).build() {
            Ok(request) => self.http.send_decodable(request),
            Err(e) => Pending::failed(e),
        }
    }

    pub fn put<P, D>(
        &self,
        path: &str,
        payload: &P,
        params: &[(&str, Option<&str>)],
        identifier: Option<&str>,
    ) -> Pending<D>
    where
        P: Serialize + ?Sized,
        D: DeserializeOwned + Send + 'static,
    {
        self.upload(HttpMethod::Put, path, payload, params, identifier)
    }

    pub fn post<P, D>(
        &self,
        path: &str,
        payload: &P,
        params: &[(&str, Option<&str>)],
        identifier: Option<&str>,
    ) -> Pending<D>
    where
        P: Serialize + ?Sized,
        D: DeserializeOwned + Send + 'static,
    {
        self.upload(HttpMethod::Post, path, payload, params, identifier)
    }

    /// Deletes are not decoded; the raw response is returned.
    pub fn delete(
        &self,
        path: &str,
        params: &[(&str, Option<&str>)],
        identifier: Option<&str>,
    ) -> Pending<HttpResponse> {
        match self
            .request(path, params, identifier)
            .method(HttpMethod::Delete)
            .build()
        {
            Ok(request) => self.http.send(request),
            Err(e) => Pending::failed(e),
        }
    }

    pub fn send<R, D>(&self, route: &R) -> Pending<D>
    where
        R: Route + ?Sized,
        D: DeserializeOwned + Send + 'static,
    {
        let built = self
            .route_request(route)
            .method(route.method())
            .build();
        match built {
            Ok(request) => self.http.send_decodable_with(request, route.response_casing()),
            Err(e) => Pending::failed(e),
        }
    }

    pub fn send_upload<R, D>(&self, route: &R) -> Pending<D>
    where
        R: UploadRoute + ?Sized,
        D: DeserializeOwned + Send + 'static,
    {
        let built = self
            .route_request(route)
            .method(route.method())
            .key_casing(route.payload_casing())
            .build_with_payload_using(self.http.codec(), route.payload());
        match built {
            Ok(request) => self.http.send_decodable_with(request, route.response_casing()),
            Err(e) => Pending::failed(e),
        }
    }

    fn upload<P, D>(
        &self,
        method: HttpMethod,
        path: &str,
        payload: &P,
        params: &[(&str, Option<&str>)],
        identifier: Option<&str>,
    ) -> Pending<D>
    where
        P: Serialize + ?Sized,
        D: DeserializeOwned + Send + 'static,
    {
        let built = self
            .request(path, params, identifier)
            .method(method)
            .build_with_payload_using(self.http.codec(), payload);
        match built {
            Ok(request) => self.http.send_decodable(request),
            Err(e) => Pending::failed(e),
        }
    }

    fn request(&self, path: &str, params: &[(&str, Option<&str>)], identifier: Option<&str>) -> RequestBuilder {
        HttpRequest::builder(self.config.base_host.as_str())
            .path(path)
            .params(params.iter().copied())
            .maybe_identifier(identifier)
    }

    fn route_request<R: Route + ?Sized>(&self, route: &R) -> RequestBuilder {
        HttpRequest::builder(self.config.base_host.as_str())
            .path(route.path())
            .params(route.params())
            .maybe_identifier(route.identifier())
    }
}
