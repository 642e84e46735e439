//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the adapter.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Root configuration for the provisioning adapter.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AdapterConfig {
    /// Transport settings shared by every tenant.
    pub http: HttpConfig,

    /// Tenant (base entity) definitions keyed by tenant key.
    pub tenants: BTreeMap<String, TenantConfig>,
}

impl AdapterConfig {
    /// Look up the configuration of a single tenant.
    pub fn tenant(&self, key: &str) -> Option<&TenantConfig> {
        self.tenants.get(key)
    }
}

/// HTTP transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Socket inactivity timeout in seconds. A request that sees no
    /// activity for this long is aborted.
    pub idle_timeout_secs: u64,

    /// User-Agent sent with every request.
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 60,
            idle_timeout_secs: 60,
            user_agent: concat!("airwatch-provisioning/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Per-tenant connection configuration.
#[derive(Clone, Deserialize, Serialize)]
pub struct TenantConfig {
    /// Ordered base URLs; the first entry is the primary.
    #[serde(default)]
    pub base_urls: Vec<String>,

    /// Tenant code sent in the `aw-tenant-code` header.
    pub tenant_code: String,

    /// Request body encoding.
    #[serde(default)]
    pub content_type: ContentType,

    /// Optional forward proxy.
    #[serde(default)]
    pub proxy: Option<ProxySettings>,

    /// Optional static credentials used when no passthrough token is given.
    #[serde(default)]
    pub credentials: Option<Credentials>,
}

impl std::fmt::Debug for TenantConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantConfig")
            .field("base_urls", &self.base_urls)
            .field("tenant_code", &self.tenant_code)
            .field("content_type", &self.content_type)
            .field("proxy", &self.proxy)
            .field("credentials", &self.credentials.as_ref().map(Credentials::kind))
            .finish()
    }
}

/// Request body encoding for a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Json,
    Form,
}

impl ContentType {
    /// The `Content-Type` header value.
    pub fn mime(&self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::Form => "application/x-www-form-urlencoded",
        }
    }
}

/// Forward proxy settings.
#[derive(Clone, Deserialize, Serialize)]
pub struct ProxySettings {
    /// Proxy URL (e.g., "http://proxy.corp:3128").
    pub host: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Name of an environment variable holding the password.
    #[serde(default)]
    pub password_env: Option<String>,
}

impl ProxySettings {
    /// Resolve the proxy password, inline value first.
    pub fn password(&self) -> Result<Option<String>, UnsetSecret> {
        resolve_secret(self.password.as_deref(), self.password_env.as_deref())
    }

    /// Username and password, only when both are present.
    pub fn basic_credentials(&self) -> Result<Option<(String, String)>, UnsetSecret> {
        Ok(match (&self.username, self.password()?) {
            (Some(user), Some(pass)) => Some((user.clone(), pass)),
            _ => None,
        })
    }
}

impl std::fmt::Debug for ProxySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxySettings")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("password_env", &self.password_env)
            .finish()
    }
}

/// Static credentials for a tenant.
#[derive(Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Credentials {
    Basic {
        username: String,
        #[serde(default)]
        password: Option<String>,
        #[serde(default)]
        password_env: Option<String>,
    },
    Bearer {
        #[serde(default)]
        token: Option<String>,
        #[serde(default)]
        token_env: Option<String>,
    },
}

impl Credentials {
    pub fn kind(&self) -> &'static str {
        match self {
            Credentials::Basic { .. } => "basic",
            Credentials::Bearer { .. } => "bearer",
        }
    }
}

/// A secret referenced by environment variable name whose variable is unset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("environment variable '{name}' is not set")]
pub struct UnsetSecret {
    pub name: String,
}

/// Read a secret given inline or by environment variable name.
///
/// Inline wins. A named variable that is not set is an error, never an
/// empty secret.
pub fn resolve_secret(inline: Option<&str>, env: Option<&str>) -> Result<Option<String>, UnsetSecret> {
    if let Some(value) = inline {
        return Ok(Some(value.to_string()));
    }
    match env {
        Some(name) => std::env::var(name)
            .map(Some)
            .map_err(|_| UnsetSecret { name: name.to_string() }),
        None => Ok(None),
    }
}
