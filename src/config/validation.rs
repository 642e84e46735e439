//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Every tenant has at least one usable base URL
//! - Validate value ranges (timeouts > 0)
//! - Proxy credentials are complete
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AdapterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use url::Url;

use crate::config::schema::{AdapterConfig, Credentials, TenantConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("tenant '{tenant}': base_urls must contain at least one entry")]
    NoBaseUrls { tenant: String },

    #[error("tenant '{tenant}': invalid base URL '{url}': {reason}")]
    InvalidBaseUrl {
        tenant: String,
        url: String,
        reason: String,
    },

    #[error("tenant '{tenant}': tenant_code must not be empty")]
    EmptyTenantCode { tenant: String },

    #[error("tenant '{tenant}': proxy host is invalid: {reason}")]
    InvalidProxy { tenant: String, reason: String },

    #[error("tenant '{tenant}': {reason}")]
    IncompleteCredentials { tenant: String, reason: String },

    #[error("http.{field} must be greater than zero")]
    ZeroTimeout { field: &'static str },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AdapterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.http.connect_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout { field: "connect_timeout_secs" });
    }
    if config.http.idle_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout { field: "idle_timeout_secs" });
    }

    for (key, tenant) in &config.tenants {
        validate_tenant(key, tenant, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_tenant(key: &str, tenant: &TenantConfig, errors: &mut Vec<ValidationError>) {
    if tenant.base_urls.is_empty() {
        errors.push(ValidationError::NoBaseUrls { tenant: key.to_string() });
    }

    for raw in &tenant.base_urls {
        match Url::parse(raw) {
            Ok(url) if !matches!(url.scheme(), "http" | "https") => {
                errors.push(ValidationError::InvalidBaseUrl {
                    tenant: key.to_string(),
                    url: raw.clone(),
                    reason: format!("unsupported scheme '{}'", url.scheme()),
                });
            }
            Ok(url) if url.host_str().is_none() => {
                errors.push(ValidationError::InvalidBaseUrl {
                    tenant: key.to_string(),
                    url: raw.clone(),
                    reason: "missing host".to_string(),
                });
            }
            Ok(_) => {}
            Err(e) => {
                errors.push(ValidationError::InvalidBaseUrl {
                    tenant: key.to_string(),
                    url: raw.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if tenant.tenant_code.trim().is_empty() {
        errors.push(ValidationError::EmptyTenantCode { tenant: key.to_string() });
    }

    if let Some(proxy) = &tenant.proxy {
        if let Err(e) = Url::parse(&proxy.host) {
            errors.push(ValidationError::InvalidProxy {
                tenant: key.to_string(),
                reason: format!("'{}': {}", proxy.host, e),
            });
        }
        let has_password = proxy.password.is_some() || proxy.password_env.is_some();
        if proxy.username.is_some() != has_password {
            errors.push(ValidationError::IncompleteCredentials {
                tenant: key.to_string(),
                reason: "proxy username and password must be given together".to_string(),
            });
        }
    }

    match &tenant.credentials {
        Some(Credentials::Basic { password: None, password_env: None, .. }) => {
            errors.push(ValidationError::IncompleteCredentials {
                tenant: key.to_string(),
                reason: "basic credentials need password or password_env".to_string(),
            });
        }
        Some(Credentials::Bearer { token: None, token_env: None }) => {
            errors.push(ValidationError::IncompleteCredentials {
                tenant: key.to_string(),
                reason: "bearer credentials need token or token_env".to_string(),
            });
        }
        _ => {}
    }
}
