//! Per-tenant service client cache.
//!
//! # Responsibilities
//! - Build and cache one transport + header set per tenant
//! - Resolve relative paths against the tenant's current failover URL
//! - Build one-off, uncached descriptors for absolute URLs
//! - Advance the failover cursor and drop cache entries on request
//!
//! # Cache Contract
//! - Populated once per tenant on first use
//! - Every resolution re-reads the current failover index
//! - Invalidated on configuration reload or failover exhaustion, never per call

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use dashmap::DashMap;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use url::Url;

use crate::client::descriptor::{ConnectionDescriptor, FailoverSlot, RequestOptions, RequestSpec};
use crate::client::error::{ClientError, ClientResult};
use crate::client::failover::FailoverCursor;
use crate::config::schema::{resolve_secret, UnsetSecret};
use crate::config::{AdapterConfig, ContentType, Credentials, HttpConfig, ProxySettings, TenantConfig};

/// Header carrying the tenant code on every config-based request.
pub const TENANT_CODE_HEADER: &str = "aw-tenant-code";

/// Cached connection state for one tenant.
struct TenantClient {
    client: reqwest::Client,
    cursor: FailoverCursor,
    headers: HeaderMap,
    content_type: ContentType,
    proxy_authorization: Option<HeaderValue>,
}

/// Process-wide cache of tenant connection parameters.
pub struct ServiceClientRegistry {
    config: ArcSwap<AdapterConfig>,
    clients: DashMap<String, Arc<TenantClient>>,
}

impl ServiceClientRegistry {
    /// Create a registry over a validated configuration.
    pub fn new(config: AdapterConfig) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
            clients: DashMap::new(),
        }
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> Arc<AdapterConfig> {
        self.config.load_full()
    }

    /// Swap in a new configuration and drop every cached descriptor.
    pub fn reload(&self, config: AdapterConfig) {
        self.config.store(Arc::new(config));
        let dropped = self.clients.len();
        self.clients.clear();
        tracing::info!(dropped, "Configuration reloaded, service clients invalidated");
    }

    /// Drop the cached descriptor of one tenant. Returns whether one existed.
    pub fn invalidate(&self, tenant: &str) -> bool {
        let removed = self.clients.remove(tenant).is_some();
        if removed {
            tracing::debug!(tenant = %tenant, "Service client invalidated");
        }
        removed
    }

    /// Whether a descriptor is cached for `tenant`.
    pub fn is_cached(&self, tenant: &str) -> bool {
        self.clients.contains_key(tenant)
    }

    /// Current failover index of a cached tenant.
    pub fn failover_index(&self, tenant: &str) -> Option<usize> {
        self.clients.get(tenant).map(|entry| entry.cursor.index())
    }

    /// Move the tenant's cursor past the slot a failed attempt used and
    /// return the index the caller should try next.
    ///
    /// If the tenant was invalidated in the meantime, the caller still moves
    /// on from its own slot rather than restarting at the primary.
    pub(crate) fn advance(&self, tenant: &str, failed: FailoverSlot) -> usize {
        match self.clients.get(tenant).map(|entry| entry.value().clone()) {
            Some(entry) => entry.cursor.advance_from(failed.index),
            None => (failed.index + 1) % failed.len.max(1),
        }
    }

    /// Resolve connection parameters for one call.
    pub fn resolve(&self, tenant: &str, spec: &RequestSpec) -> ClientResult<ConnectionDescriptor> {
        self.resolve_at(tenant, spec, None)
    }

    /// Like [`resolve`](Self::resolve), but a relative path uses base URL
    /// `pinned` when the tenant has one at that index.
    pub(crate) fn resolve_at(
        &self,
        tenant: &str,
        spec: &RequestSpec,
        pinned: Option<usize>,
    ) -> ClientResult<ConnectionDescriptor> {
        match spec.absolute_url() {
            Some(url) => self.resolve_absolute(tenant, url, spec),
            None => self.resolve_relative(tenant, spec, pinned),
        }
    }

    fn resolve_relative(
        &self,
        tenant: &str,
        spec: &RequestSpec,
        pinned: Option<usize>,
    ) -> ClientResult<ConnectionDescriptor> {
        let entry = self.tenant_client(tenant)?;

        let (index, base_url) = pinned
            .and_then(|index| entry.cursor.url(index).map(|url| (index, url)))
            .or_else(|| entry.cursor.current())
            .ok_or_else(|| ClientError::MissingBaseUrls { tenant: tenant.to_string() })?;

        let url = join_path(base_url, &spec.path)?;

        let mut headers = entry.headers.clone();
        headers.insert(ACCEPT, HeaderValue::from_static(spec.api_version.accept()));
        apply_call_overrides(&mut headers, spec)?;

        Ok(ConnectionDescriptor {
            client: entry.client.clone(),
            url,
            base_url: Some(base_url.clone()),
            headers,
            content_type: entry.content_type,
            proxy_authorization: entry.proxy_authorization.clone(),
            failover: Some(FailoverSlot {
                index,
                len: entry.cursor.len(),
            }),
        })
    }

    fn resolve_absolute(
        &self,
        tenant: &str,
        url: Url,
        spec: &RequestSpec,
    ) -> ClientResult<ConnectionDescriptor> {
        tracing::debug!(tenant = %tenant, host = ?url.host_str(), "Using non-config based client");

        let config = self.config.load();
        let tenant_config = config
            .tenant(tenant)
            .ok_or_else(|| ClientError::UnknownTenant { tenant: tenant.to_string() })?;

        let (client, proxy_authorization) =
            build_http_client(tenant, &config.http, tenant_config.proxy.as_ref())?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(ContentType::Json.mime()));
        headers.insert(ACCEPT, HeaderValue::from_static(spec.api_version.accept()));
        apply_call_overrides(&mut headers, spec)?;

        Ok(ConnectionDescriptor {
            client,
            url,
            base_url: None,
            headers,
            content_type: ContentType::Json,
            proxy_authorization,
            failover: None,
        })
    }

    /// Cached tenant client, built on first use.
    fn tenant_client(&self, tenant: &str) -> ClientResult<Arc<TenantClient>> {
        if let Some(entry) = self.clients.get(tenant) {
            tracing::debug!(tenant = %tenant, "Using existing service client");
            return Ok(entry.value().clone());
        }

        tracing::debug!(tenant = %tenant, "Service client has to be created");
        let config = self.config.load();
        let tenant_config = config
            .tenant(tenant)
            .ok_or_else(|| ClientError::UnknownTenant { tenant: tenant.to_string() })?;

        let built = Arc::new(build_tenant_client(tenant, &config.http, tenant_config)?);

        // A concurrent builder may have won; keep whichever landed first.
        let entry = self
            .clients
            .entry(tenant.to_string())
            .or_insert(built)
            .value()
            .clone();
        Ok(entry)
    }
}

impl std::fmt::Debug for ServiceClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cached: Vec<String> = self.clients.iter().map(|e| e.key().clone()).collect();
        f.debug_struct("ServiceClientRegistry")
            .field("tenants", &self.config.load().tenants.keys().collect::<Vec<_>>())
            .field("cached", &cached)
            .finish()
    }
}

fn build_tenant_client(tenant: &str, http: &HttpConfig, config: &TenantConfig) -> ClientResult<TenantClient> {
    if config.base_urls.is_empty() {
        return Err(ClientError::MissingBaseUrls { tenant: tenant.to_string() });
    }

    let urls = config
        .base_urls
        .iter()
        .map(|raw| {
            Url::parse(raw).map_err(|e| ClientError::InvalidUrl {
                url: raw.clone(),
                reason: e.to_string(),
            })
        })
        .collect::<ClientResult<Vec<_>>>()?;

    let (client, proxy_authorization) = build_http_client(tenant, http, config.proxy.as_ref())?;

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(config.content_type.mime()));
    headers.insert(
        HeaderName::from_static(TENANT_CODE_HEADER),
        header_value(TENANT_CODE_HEADER, &config.tenant_code)?,
    );
    if let Some(authorization) = static_authorization(tenant, config.credentials.as_ref())? {
        headers.insert(AUTHORIZATION, authorization);
    }

    tracing::debug!(
        tenant = %tenant,
        base_urls = urls.len(),
        proxied = config.proxy.is_some(),
        "Service client created"
    );

    Ok(TenantClient {
        client,
        cursor: FailoverCursor::new(urls),
        headers,
        content_type: config.content_type,
        proxy_authorization,
    })
}

/// Build the reqwest transport, honoring the tenant's proxy.
fn build_http_client(
    tenant: &str,
    http: &HttpConfig,
    proxy: Option<&ProxySettings>,
) -> ClientResult<(reqwest::Client, Option<HeaderValue>)> {
    let mut builder = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(http.connect_timeout_secs))
        .read_timeout(Duration::from_secs(http.idle_timeout_secs))
        .user_agent(http.user_agent.as_str());

    let mut proxy_authorization = None;
    match proxy {
        Some(settings) => {
            let mut proxy = reqwest::Proxy::all(settings.host.as_str()).map_err(|e| ClientError::InvalidUrl {
                url: settings.host.clone(),
                reason: e.to_string(),
            })?;
            let credentials = settings
                .basic_credentials()
                .map_err(|unset| missing_secret(tenant, unset))?;
            if let Some((username, password)) = credentials {
                let value = basic_auth_value(&username, &password)?;
                proxy = proxy.custom_http_auth(value.clone());
                proxy_authorization = Some(value);
            }
            builder = builder.proxy(proxy);
        }
        None => {
            builder = builder.no_proxy();
        }
    }

    let client = builder.build().map_err(|e| ClientError::HttpClient {
        tenant: tenant.to_string(),
        message: e.to_string(),
    })?;
    Ok((client, proxy_authorization))
}

fn missing_secret(tenant: &str, unset: UnsetSecret) -> ClientError {
    ClientError::MissingSecret {
        tenant: tenant.to_string(),
        name: unset.name,
    }
}

fn static_authorization(tenant: &str, credentials: Option<&Credentials>) -> ClientResult<Option<HeaderValue>> {
    match credentials {
        Some(Credentials::Basic { username, password, password_env }) => {
            let password = resolve_secret(password.as_deref(), password_env.as_deref())
                .map_err(|unset| missing_secret(tenant, unset))?
                .unwrap_or_default();
            basic_auth_value(username, &password).map(Some)
        }
        Some(Credentials::Bearer { token, token_env }) => {
            match resolve_secret(token.as_deref(), token_env.as_deref())
                .map_err(|unset| missing_secret(tenant, unset))?
            {
                Some(token) => {
                    let mut value = header_value("authorization", &format!("Bearer {}", token))?;
                    value.set_sensitive(true);
                    Ok(Some(value))
                }
                None => Ok(None),
            }
        }
        None => Ok(None),
    }
}

/// Apply passthrough token and per-call options; these are never cached.
fn apply_call_overrides(headers: &mut HeaderMap, spec: &RequestSpec) -> ClientResult<()> {
    if let Some(token) = &spec.token {
        let mut value = header_value("authorization", token)?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    if let Some(RequestOptions { basic_auth, headers: extra }) = &spec.options {
        if let Some((username, password)) = basic_auth {
            headers.insert(AUTHORIZATION, basic_auth_value(username, password)?);
        }
        for (name, value) in extra {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| ClientError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            headers.insert(header_name, header_value(name, value)?);
        }
    }
    Ok(())
}

/// `Basic base64(user:pass)`, marked sensitive.
pub fn basic_auth_value(username: &str, password: &str) -> ClientResult<HeaderValue> {
    let encoded = STANDARD.encode(format!("{}:{}", username, password));
    let mut value = header_value("authorization", &format!("Basic {}", encoded))?;
    value.set_sensitive(true);
    Ok(value)
}

fn header_value(name: &str, value: &str) -> ClientResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| ClientError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

/// Textual join, so base URLs may carry a path prefix such as `/API`.
fn join_path(base: &Url, path: &str) -> ClientResult<Url> {
    let base = base.as_str().trim_end_matches('/');
    let joined = if path.is_empty() || path.starts_with('/') || path.starts_with('?') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    };
    Url::parse(&joined).map_err(|e| ClientError::InvalidUrl {
        url: joined.clone(),
        reason: e.to_string(),
    })
}
