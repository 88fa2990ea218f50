//! Request builder: turns a host or URL plus route parameters into an
//! `HttpRequest`.
//!
//! # Design
//! Building is pure; nothing here touches the network. The order of checks
//! is fixed: a GET with a payload is refused before any URL work, the URL
//! is composed and re-parsed next, and the payload is encoded last.
//!
//! Two entry points match the two ways callers address a server:
//! `HttpRequest::builder(host)` replaces the host's path with the given path
//! (no path means none at all), while `HttpRequest::for_url(url)` keeps the
//! URL's own path unless one is given. In both forms the params replace any
//! query already present. A URL's own path is held to the same character
//! rules as an explicit path, and the default identifier is the normalized
//! URL, so it always matches `HttpRequest::url`.

use serde::Serialize;
use url::{form_urlencoded, Position, Url};

use crate::codec::{Codec, JsonCodec, KeyCasing};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Host,
    Url,
}

/// Collects the parts of one request. See the module docs for the rules.
#[derive(Debug, Clone)]
#[must_use]
pub struct RequestBuilder {
    base: String,
    target: Target,
    path: Option<String>,
    params: Vec<(String, Option<String>)>,
    method: Option<HttpMethod>,
    identifier: Option<String>,
    key_casing: KeyCasing,
}

impl HttpRequest {
    /// Start a request against `host`; the path set on the builder replaces
    /// the host's path.
    pub fn builder(host: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(host.into(), Target::Host)
    }

    /// Start a request against a full URL, keeping its path.
    pub fn for_url(url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(url.into(), Target::Url)
    }
}

impl RequestBuilder {
    fn new(base: String, target: Target) -> Self {
        RequestBuilder {
            base,
            target,
            path: None,
            params: Vec::new(),
            method: None,
            identifier: None,
            key_casing: KeyCasing::default(),
        }
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Append one query parameter. `None` values are left out of the URL.
    pub fn param(mut self, name: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        self.params.push((name.into(), value.map(Into::into)));
        self
    }

    /// Append query parameters in order. Repeated names are all kept.
    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.map(Into::into))));
        self
    }

    /// Defaults to GET for `build` and POST for `build_with_payload`.
    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    /// Correlation text. Defaults to the composed URL string.
    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub(crate) fn maybe_identifier(self, identifier: Option<&str>) -> Self {
        match identifier {
            Some(identifier) => self.identifier(identifier),
            None => self,
        }
    }

    /// Key casing used when encoding the payload.
    pub fn key_casing(mut self, casing: KeyCasing) -> Self {
        self.key_casing = casing;
        self
    }

    /// Build a request without a body.
    pub fn build(self) -> Result<HttpRequest, ApiError> {
        let method = self.method.unwrap_or(HttpMethod::Get);
        self.compose(method)
    }

    /// Build a request carrying `payload` encoded as JSON.
    pub fn build_with_payload<P>(self, payload: &P) -> Result<HttpRequest, ApiError>
    where
        P: Serialize + ?Sized,
    {
        self.build_with_payload_using(&JsonCodec, payload)
    }

    pub fn build_with_payload_using<C, P>(self, codec: &C, payload: &P) -> Result<HttpRequest, ApiError>
    where
        C: Codec,
        P: Serialize + ?Sized,
    {
        let method = self.method.unwrap_or(HttpMethod::Post);
        if method == HttpMethod::Get {
            return Err(ApiError::GetRequestCannotHaveBody);
        }
        let casing = self.key_casing;
        let mut request = self.compose(method)?;

        let body = codec
            .encode(payload, casing)
            .map_err(|source| ApiError::EncodingFailed {
                payload: std::any::type_name::<P>(),
                source,
            })?;
        request.append_header("content-type", codec.content_type());
        request.body = Some(body);
        Ok(request)
    }

    fn compose(self, method: HttpMethod) -> Result<HttpRequest, ApiError> {
        let base = match Url::parse(&self.base) {
            Ok(url) if !url.cannot_be_a_base() => url,
            _ => return Err(ApiError::FailedToCreateUrl(self.base)),
        };

        let path = match (&self.path, self.target) {
            (Some(path), _) => path.clone(),
            (None, Target::Host) => String::new(),
            (None, Target::Url) if raw_path(&self.base).is_empty() => String::new(),
            (None, Target::Url) => base[Position::BeforePath..Position::AfterPath].to_string(),
        };
        let mut composed = format!("{}{path}", &base[..Position::BeforePath]);

        let pairs: Vec<(&str, &str)> = self
            .params
            .iter()
            .filter_map(|(name, value)| value.as_deref().map(|value| (name.as_str(), value)))
            .collect();
        if !pairs.is_empty() {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs)
                .finish();
            composed.push('?');
            composed.push_str(&query);
        }

        let path_ok = match (&self.path, self.target) {
            (Some(p), _) => p.is_empty() || (p.starts_with('/') && is_legal_path(p)),
            (None, Target::Url) => is_legal_path(raw_path(&self.base)),
            (None, Target::Host) => true,
        };
        if !path_ok {
            return Err(ApiError::FailedToCreateUrl(composed));
        }
        let url = match Url::parse(&composed) {
            Ok(url) => url,
            Err(_) => return Err(ApiError::FailedToCreateUrl(composed)),
        };

        let identifier = match self.identifier {
            Some(identifier) => identifier,
            // `Url` always serializes a path; a bare host keeps none.
            None if path.is_empty() => composed,
            None => url.as_str().to_string(),
        };
        Ok(HttpRequest {
            method,
            url,
            headers: Vec::new(),
            body: None,
            identifier,
        })
    }
}

/// The path of `url` as written: after the authority, before any query or
/// fragment.
fn raw_path(url: &str) -> &str {
    let end = url.find(|c: char| c == '?' || c == '#').unwrap_or(url.len());
    let url = &url[..end];
    let rest = url.find("://").map_or(url, |i| &url[i + 3..]);
    rest.find('/').map_or("", |i| &rest[i..])
}

/// RFC 3986 path characters: unreserved, sub-delims, `:`, `@`, `/` and
/// well-formed percent escapes.
fn is_legal_path(path: &str) -> bool {
    let bytes = path.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'%' {
            let escaped = bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !escaped {
                return false;
            }
            i += 3;
            continue;
        }
        if !(b.is_ascii_alphanumeric() || b"-._~!$&'()*+,;=:@/".contains(&b)) {
            return false;
        }
        i += 1;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::Error as _;

    const HOST: &str = "http://example.com";

    #[derive(Serialize)]
    struct Person {
        name: String,
        age: u32,
    }

    fn person() -> Person {
        Person {
            name: "X".to_string(),
            age: 1,
        }
    }

    struct FailingEncoding;

    impl Serialize for FailingEncoding {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("known error"))
        }
    }

    #[test]
    fn get_with_query_uses_url_as_identifier() {
        let req = HttpRequest::builder(HOST)
            .path("/search")
            .param("q", Some("a"))
            .build()
            .unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.identifier, "http://example.com/search?q=a");
        assert_eq!(req.url.as_str(), "http://example.com/search?q=a");
        assert!(req.body.is_none());
        assert!(req.headers.is_empty());
    }

    #[test]
    fn bare_host_identifier_has_no_trailing_slash() {
        let req = HttpRequest::builder(HOST).build().unwrap();
        assert_eq!(req.identifier, HOST);
        let req = HttpRequest::builder(HOST).path("").build().unwrap();
        assert_eq!(req.identifier, HOST);
    }

    #[test]
    fn explicit_identifier_is_used_verbatim() {
        let req = HttpRequest::builder(HOST)
            .path("/")
            .identifier("Getting the test host")
            .build()
            .unwrap();
        assert_eq!(req.identifier, "Getting the test host");
        assert_eq!(req.url.as_str(), "http://example.com/");
    }

    #[test]
    fn duplicate_params_are_kept_and_none_values_dropped() {
        let req = HttpRequest::builder(HOST)
            .path("/search")
            .params([("tag", Some("a")), ("skip", None), ("tag", Some("b"))])
            .build()
            .unwrap();
        assert_eq!(req.identifier, "http://example.com/search?tag=a&tag=b");
    }

    #[test]
    fn only_none_params_produce_no_query() {
        let req = HttpRequest::builder(HOST)
            .path("/search")
            .param("q", None::<String>)
            .build()
            .unwrap();
        assert_eq!(req.identifier, "http://example.com/search");
    }

    #[test]
    fn query_values_are_form_encoded() {
        let req = HttpRequest::builder(HOST)
            .path("/search")
            .param("q", Some("a b&c"))
            .build()
            .unwrap();
        assert_eq!(req.identifier, "http://example.com/search?q=a+b%26c");
    }

    #[test]
    fn get_with_payload_is_refused_before_anything_else() {
        let err = HttpRequest::builder("////!@#$^#@$")
            .path("/search")
            .method(HttpMethod::Get)
            .build_with_payload(&FailingEncoding)
            .unwrap_err();
        assert!(matches!(err, ApiError::GetRequestCannotHaveBody));
    }

    #[test]
    fn payload_defaults_to_post_with_json_body() {
        let req = HttpRequest::builder(HOST)
            .path("/search")
            .build_with_payload(&person())
            .unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.header("Content-Type"), Some("application/json"));
        let body: serde_json::Value = serde_json::from_slice(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"name": "X", "age": 1}));
    }

    #[test]
    fn put_payload_keeps_method() {
        let req = HttpRequest::for_url(HOST)
            .method(HttpMethod::Put)
            .build_with_payload(&person())
            .unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.identifier, HOST);
    }

    #[test]
    fn encoding_failure_is_wrapped() {
        let err = HttpRequest::builder(HOST)
            .path("/people")
            .build_with_payload(&FailingEncoding)
            .unwrap_err();
        match err {
            ApiError::EncodingFailed { payload, .. } => assert!(payload.ends_with("FailingEncoding")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn bad_host_fails() {
        for host in ["////!@#$^#@$", "not a url", "mailto:someone@example.com"] {
            let err = HttpRequest::builder(host).path("").build().unwrap_err();
            assert!(matches!(err, ApiError::FailedToCreateUrl(ref s) if s == host), "{host}");
        }
    }

    #[test]
    fn illegal_path_fails_after_composition() {
        for path in ["/ÔÓØˆ¨˝", "/a b", "/bad%zz", "search"] {
            let err = HttpRequest::builder(HOST).path(path).build().unwrap_err();
            match err {
                ApiError::FailedToCreateUrl(composed) => assert!(composed.starts_with(HOST), "{path}"),
                other => panic!("{path}: unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn escaped_path_is_accepted() {
        let req = HttpRequest::builder(HOST).path("/a%20b/c:d@e").build().unwrap();
        assert_eq!(req.url.path(), "/a%20b/c:d@e");
    }

    #[test]
    fn host_path_and_query_are_replaced() {
        let req = HttpRequest::builder("http://example.com/api?stale=1")
            .path("/search")
            .build()
            .unwrap();
        assert_eq!(req.identifier, "http://example.com/search");
    }

    #[test]
    fn url_form_keeps_path_and_replaces_query() {
        let req = HttpRequest::for_url("https://example.com:8443/v1/items?stale=1")
            .param("page", Some("2"))
            .method(HttpMethod::Delete)
            .build()
            .unwrap();
        assert_eq!(req.identifier, "https://example.com:8443/v1/items?page=2");
        assert_eq!(req.method, HttpMethod::Delete);
    }

    #[test]
    fn url_form_identifier_matches_normalized_url() {
        let req = HttpRequest::for_url("HTTP://Example.com/a/../c#top").build().unwrap();
        assert_eq!(req.url.as_str(), "http://example.com/c");
        assert_eq!(req.identifier, req.url.as_str());

        let req = HttpRequest::for_url("HTTP://Example.com").param("q", Some("x")).build().unwrap();
        assert_eq!(req.identifier, "http://example.com?q=x");
    }

    #[test]
    fn url_form_rejects_illegal_path() {
        for url in ["HTTP://Example.com/a b/../c", "http://example.com/ÔÓØ", "http://example.com/bad%zz?q=1"] {
            let err = HttpRequest::for_url(url).build().unwrap_err();
            assert!(matches!(err, ApiError::FailedToCreateUrl(_)), "{url}");
        }
    }

    #[test]
    fn host_form_identifier_matches_normalized_url() {
        let req = HttpRequest::builder("HTTP://Example.COM").path("/a/./b/../c").build().unwrap();
        assert_eq!(req.url.as_str(), "http://example.com/a/c");
        assert_eq!(req.identifier, req.url.as_str());
    }

    #[test]
    fn raw_path_is_taken_as_written() {
        assert_eq!(raw_path("http://example.com"), "");
        assert_eq!(raw_path("http://example.com?q=/x"), "");
        assert_eq!(raw_path("http://user@example.com:80/a b?c#d"), "/a b");
        assert_eq!(raw_path("http://example.com/#frag"), "/");
    }

    #[test]
    fn legal_path_characters() {
        assert!(is_legal_path("/a-b_c.d~e/!$&'()*+,;=:@"));
        assert!(is_legal_path("/%41%4a"));
        assert!(!is_legal_path("/%4"));
        assert!(!is_legal_path("/a?b"));
        assert!(!is_legal_path("/a#b"));
    }
}
