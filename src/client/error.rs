//! Error types for outbound request execution.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

use crate::client::response::ResponseBody;
use crate::identity::anchor::MalformedAnchor;

/// Where a request-scoped error happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub tenant: String,
    pub method: String,
    pub path: String,
}

impl RequestContext {
    pub fn new(tenant: &str, method: &reqwest::Method, path: &str) -> Self {
        Self {
            tenant: tenant.to_string(),
            method: method.to_string(),
            path: path.to_string(),
        }
    }
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} [tenant={}]", self.method, self.path, self.tenant)
    }
}

/// Error classes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad or missing configuration. Never retried.
    Configuration,
    /// Connectivity failure, after failover where applicable.
    Transport,
    /// Socket inactivity timeout.
    Timeout,
    /// Non-2xx response from the platform.
    Application,
    /// A lookup found nothing where something was required.
    NotFound,
    /// Malformed identity anchor.
    Anchor,
}

/// Errors produced by the registry, executor and resolver.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no configuration for tenant '{tenant}'")]
    UnknownTenant { tenant: String },

    #[error("tenant '{tenant}' has no base URLs configured")]
    MissingBaseUrls { tenant: String },

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("tenant '{tenant}' references environment variable '{name}', which is not set")]
    MissingSecret { tenant: String, name: String },

    #[error("cannot build HTTP client for tenant '{tenant}': {message}")]
    HttpClient { tenant: String, message: String },

    #[error("UnableToConnectService: {context} (after {attempts} attempt(s))")]
    UnableToConnectService { context: RequestContext, attempts: usize },

    #[error("UnableToConnectHost: {context} (after {attempts} attempt(s))")]
    UnableToConnectHost { context: RequestContext, attempts: usize },

    #[error("transport error: {context}: {message}")]
    Transport { context: RequestContext, message: String },

    #[error("request timed out: {context}")]
    Timeout { context: RequestContext },

    #[error("{context} failed with {status} {message}: {body}")]
    Application {
        context: RequestContext,
        status: u16,
        message: String,
        body: ResponseBody,
    },

    #[error("cannot serialize request body for {context}: {message}")]
    Serialization { context: RequestContext, message: String },

    #[error("empty response: {context}")]
    EmptyResponse { context: RequestContext },

    #[error("unexpected response body for {context}: {message}")]
    Decode { context: RequestContext, message: String },

    #[error("no {kind} found for '{key}' on tenant '{tenant}'")]
    IdentityNotFound {
        tenant: String,
        kind: &'static str,
        key: String,
    },

    #[error("{kind} '{key}' on tenant '{tenant}' has no {field}")]
    IncompleteIdentity {
        tenant: String,
        kind: &'static str,
        key: String,
        field: &'static str,
    },

    #[error(transparent)]
    MalformedAnchor(#[from] MalformedAnchor),
}

impl ClientError {
    /// The error class of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ClientError::UnknownTenant { .. }
            | ClientError::MissingBaseUrls { .. }
            | ClientError::InvalidUrl { .. }
            | ClientError::InvalidHeader { .. }
            | ClientError::MissingSecret { .. }
            | ClientError::HttpClient { .. }
            | ClientError::Serialization { .. } => ErrorCategory::Configuration,
            ClientError::UnableToConnectService { .. }
            | ClientError::UnableToConnectHost { .. }
            | ClientError::Transport { .. } => ErrorCategory::Transport,
            ClientError::Timeout { .. } => ErrorCategory::Timeout,
            ClientError::Application { .. }
            | ClientError::EmptyResponse { .. }
            | ClientError::Decode { .. }
            | ClientError::IncompleteIdentity { .. } => ErrorCategory::Application,
            ClientError::IdentityNotFound { .. } => ErrorCategory::NotFound,
            ClientError::MalformedAnchor(_) => ErrorCategory::Anchor,
        }
    }

    /// HTTP status of an application error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Application { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Classified failure of a single HTTP exchange.
#[derive(Debug)]
pub(crate) enum ExchangeFailure {
    /// The host refused the connection.
    ConnectionRefused,
    /// The host name did not resolve.
    HostNotFound,
    /// No activity before the idle timeout elapsed.
    Timeout,
    /// Anything else: TLS, protocol, reset, malformed request.
    Other(String),
}

impl ExchangeFailure {
    /// Classify a reqwest error by walking its source chain.
    pub(crate) fn classify(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return ExchangeFailure::Timeout;
        }

        let mut source: Option<&(dyn StdError + 'static)> = Some(err);
        while let Some(current) = source {
            if let Some(io) = current.downcast_ref::<std::io::Error>() {
                match io.kind() {
                    std::io::ErrorKind::ConnectionRefused => return ExchangeFailure::ConnectionRefused,
                    std::io::ErrorKind::TimedOut => return ExchangeFailure::Timeout,
                    _ => {}
                }
            }
            let text = current.to_string().to_ascii_lowercase();
            if text.contains("dns error")
                || text.contains("failed to lookup address")
                || text.contains("name or service not known")
                || text.contains("no such host")
            {
                return ExchangeFailure::HostNotFound;
            }
            source = current.source();
        }

        ExchangeFailure::Other(describe(err))
    }

    /// Whether this failure triggers base-URL failover.
    pub(crate) fn is_connect_failure(&self) -> bool {
        matches!(self, ExchangeFailure::ConnectionRefused | ExchangeFailure::HostNotFound)
    }

    /// Convert into the caller-facing error.
    pub(crate) fn into_client_error(self, context: RequestContext, attempts: usize) -> ClientError {
        match self {
            ExchangeFailure::ConnectionRefused => ClientError::UnableToConnectService { context, attempts },
            ExchangeFailure::HostNotFound => ClientError::UnableToConnectHost { context, attempts },
            ExchangeFailure::Timeout => ClientError::Timeout { context },
            ExchangeFailure::Other(message) => ClientError::Transport { context, message },
        }
    }
}

impl fmt::Display for ExchangeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeFailure::ConnectionRefused => write!(f, "connection refused"),
            ExchangeFailure::HostNotFound => write!(f, "host not found"),
            ExchangeFailure::Timeout => write!(f, "timed out"),
            ExchangeFailure::Other(message) => write!(f, "{}", message),
        }
    }
}

/// Render a reqwest error without the request URL (which may carry query
/// values) but with its innermost cause.
fn describe(err: &reqwest::Error) -> String {
    let kind = if err.is_builder() {
        "invalid request"
    } else if err.is_body() {
        "error streaming body"
    } else if err.is_decode() {
        "error decoding response"
    } else if err.is_redirect() {
        "redirect error"
    } else if err.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };

    let mut innermost: Option<&(dyn StdError + 'static)> = None;
    let mut source = err.source();
    while let Some(inner) = source {
        innermost = Some(inner);
        source = inner.source();
    }

    match innermost {
        Some(cause) => format!("{}: {}", kind, cause),
        None => kind.to_string(),
    }
}
