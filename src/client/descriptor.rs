//! Request specifications and resolved connection descriptors.
//!
//! # Responsibilities
//! - Describe one outbound call (method, path, body, token, API version)
//! - Carry the resolved transport, URL and headers for that call
//! - Remember which failover slot a relative-path call was resolved against

use std::fmt;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::Value;
use url::Url;

use crate::config::ContentType;

/// Vendor API version, selected through the `Accept` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiVersion {
    #[default]
    Unversioned,
    V1,
    V2,
}

impl ApiVersion {
    /// The `Accept` header value for this version.
    pub fn accept(&self) -> &'static str {
        match self {
            ApiVersion::Unversioned => "application/json",
            ApiVersion::V1 => "application/json;version=1",
            ApiVersion::V2 => "application/json;version=2",
        }
    }

    /// Map a numeric version marker; anything but 1 or 2 is unversioned.
    pub fn from_number(version: Option<u8>) -> Self {
        match version {
            Some(1) => ApiVersion::V1,
            Some(2) => ApiVersion::V2,
            _ => ApiVersion::Unversioned,
        }
    }
}

/// Per-call overrides merged into the resolved descriptor.
#[derive(Clone, Default)]
pub struct RequestOptions {
    /// Sent as `Authorization: Basic base64(user:pass)`.
    pub basic_auth: Option<(String, String)>,
    /// Extra headers, applied last.
    pub headers: Vec<(String, String)>,
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("basic_auth", &self.basic_auth.as_ref().map(|(user, _)| user))
            .field("headers", &self.headers.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .finish()
    }
}

/// One outbound call. Created fresh per call.
#[derive(Clone)]
pub struct RequestSpec {
    pub method: Method,
    /// Relative ("/system/users") or absolute ("https://host/x").
    pub path: String,
    pub body: Option<Value>,
    /// Forwarded as-is as the `Authorization` header.
    pub token: Option<String>,
    pub api_version: ApiVersion,
    pub options: Option<RequestOptions>,
}

impl RequestSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            token: None,
            api_version: ApiVersion::Unversioned,
            options: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn token(mut self, token: Option<&str>) -> Self {
        self.token = token.map(str::to_string);
        self
    }

    pub fn api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = version;
        self
    }

    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// The absolute URL in `path`, if it names a host.
    pub fn absolute_url(&self) -> Option<Url> {
        absolute_url(&self.path)
    }
}

impl fmt::Debug for RequestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSpec")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("has_body", &self.body.is_some())
            .field("has_token", &self.token.is_some())
            .field("api_version", &self.api_version)
            .field("options", &self.options)
            .finish()
    }
}

/// Parse `path` as an absolute URL; relative paths yield `None`.
pub fn absolute_url(path: &str) -> Option<Url> {
    Url::parse(path).ok().filter(|url| url.host_str().is_some())
}

/// Which base URL a relative-path call was resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailoverSlot {
    /// Index into the tenant's base URLs.
    pub index: usize,
    /// Number of configured base URLs.
    pub len: usize,
}

/// Everything needed to perform one exchange.
#[derive(Clone)]
pub struct ConnectionDescriptor {
    pub(crate) client: reqwest::Client,
    pub(crate) url: Url,
    pub(crate) base_url: Option<Url>,
    pub(crate) headers: HeaderMap,
    pub(crate) content_type: ContentType,
    pub(crate) proxy_authorization: Option<HeaderValue>,
    pub(crate) failover: Option<FailoverSlot>,
}

impl ConnectionDescriptor {
    /// Full request URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Base URL the call was resolved against (relative mode only).
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }

    pub fn port(&self) -> Option<u16> {
        self.url.port_or_known_default()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    /// `Proxy-Authorization` value sent to the configured proxy.
    pub fn proxy_authorization(&self) -> Option<&HeaderValue> {
        self.proxy_authorization.as_ref()
    }

    /// Failover slot; `None` for absolute-path calls.
    pub fn failover(&self) -> Option<FailoverSlot> {
        self.failover
    }

    pub fn is_absolute(&self) -> bool {
        self.failover.is_none()
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(name, value)| {
                let shown = if value.is_sensitive() || *name == reqwest::header::AUTHORIZATION {
                    "<redacted>"
                } else {
                    value.to_str().unwrap_or("<binary>")
                };
                (name.as_str(), shown)
            })
            .collect();

        f.debug_struct("ConnectionDescriptor")
            .field("url", &self.url.as_str())
            .field("headers", &headers)
            .field("content_type", &self.content_type)
            .field("proxied", &self.proxy_authorization.is_some())
            .field("failover", &self.failover)
            .finish()
    }
}
