//! Request execution with base-URL failover.
//!
//! # Responsibilities
//! - Resolve a descriptor, encode the body, perform one HTTP exchange
//! - Classify the outcome into a response envelope or a `ClientError`
//! - Fail over to the tenant's next base URL on connect failures
//!
//! # Failover Policy
//! - Only relative-path calls fail over, only on refused / host-not-found
//! - At most one attempt per configured base URL
//! - Exhaustion drops the tenant's cached descriptor
//! - Timeouts, non-2xx statuses and absolute-path calls are never retried

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::client::descriptor::{ConnectionDescriptor, RequestSpec};
use crate::client::error::{ClientError, ClientResult, ExchangeFailure, RequestContext};
use crate::client::registry::ServiceClientRegistry;
use crate::client::response::{ResponseBody, ResponseEnvelope};
use crate::config::ContentType;
use crate::observability::metrics;

/// Outcome of one attempt against one base URL.
enum Attempt {
    Done(ResponseEnvelope),
    Failed(ExchangeFailure),
}

/// Executes requests against a tenant's service.
#[derive(Clone)]
pub struct RequestExecutor {
    registry: Arc<ServiceClientRegistry>,
}

impl RequestExecutor {
    pub fn new(registry: Arc<ServiceClientRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ServiceClientRegistry> {
        &self.registry
    }

    /// Execute one call for `tenant`.
    ///
    /// Returns the envelope of a 2xx response. Non-2xx statuses become
    /// `ClientError::Application` with the parsed body attached.
    pub async fn execute(&self, tenant: &str, spec: RequestSpec) -> ClientResult<ResponseEnvelope> {
        let context = RequestContext::new(tenant, &spec.method, &spec.path);
        let mut attempts = 0usize;
        let mut pinned = None;

        loop {
            attempts += 1;
            let descriptor = self.registry.resolve_at(tenant, &spec, pinned)?;
            let body = match &spec.body {
                Some(value) => Some(encode_body(descriptor.content_type(), value).map_err(|message| {
                    ClientError::Serialization {
                        context: context.clone(),
                        message,
                    }
                })?),
                None => None,
            };

            let failure = match exchange(&descriptor, &spec, body).await {
                Attempt::Done(envelope) if envelope.is_success() => return Ok(envelope),
                Attempt::Done(envelope) => {
                    return Err(ClientError::Application {
                        context,
                        status: envelope.status,
                        message: envelope.status_message,
                        body: envelope.body,
                    });
                }
                Attempt::Failed(failure) => failure,
            };

            let slot = match descriptor.failover() {
                Some(slot) if failure.is_connect_failure() => slot,
                _ => {
                    tracing::debug!(
                        tenant = %tenant,
                        method = %spec.method,
                        url = %descriptor.url(),
                        error = %failure,
                        "Request failed"
                    );
                    return Err(failure.into_client_error(context, attempts));
                }
            };

            if attempts >= slot.len {
                tracing::error!(
                    tenant = %tenant,
                    method = %spec.method,
                    path = %spec.path,
                    attempts,
                    error = %failure,
                    "All base URLs failed"
                );
                metrics::record_failover_exhausted(tenant);
                self.registry.invalidate(tenant);
                return Err(failure.into_client_error(context, attempts));
            }

            let next = self.registry.advance(tenant, slot);
            pinned = Some(next);
            tracing::warn!(
                tenant = %tenant,
                base_url = ?descriptor.base_url().map(|u| u.as_str()),
                attempt = attempts,
                next_index = next,
                error = %failure,
                "Base URL unreachable, failing over"
            );
            metrics::record_failover(tenant);
        }
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("registry", &self.registry)
            .finish()
    }
}

async fn exchange(descriptor: &ConnectionDescriptor, spec: &RequestSpec, body: Option<String>) -> Attempt {
    let start_time = Instant::now();
    let method = spec.method.as_str();

    let mut request = descriptor
        .client
        .request(spec.method.clone(), descriptor.url().clone())
        .headers(descriptor.headers().clone());
    if let Some(body) = body {
        tracing::trace!(url = %descriptor.url(), body = %body, "Request body");
        request = request.body(body);
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            metrics::record_request(method, 0, start_time);
            return Attempt::Failed(ExchangeFailure::classify(&e));
        }
    };

    let status = response.status();
    let raw = match response.text().await {
        Ok(raw) => raw,
        Err(e) => {
            metrics::record_request(method, 0, start_time);
            return Attempt::Failed(ExchangeFailure::classify(&e));
        }
    };
    metrics::record_request(method, status.as_u16(), start_time);

    tracing::debug!(
        method = %method,
        url = %descriptor.url(),
        status = status.as_u16(),
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "Request completed"
    );
    tracing::trace!(url = %descriptor.url(), body = %raw, "Response body");

    Attempt::Done(ResponseEnvelope::new(
        status.as_u16(),
        status.canonical_reason().unwrap_or_default(),
        ResponseBody::parse(raw),
    ))
}

/// Serialize a request body for the descriptor's content type.
pub fn encode_body(content_type: ContentType, body: &Value) -> Result<String, String> {
    match content_type {
        ContentType::Json => serde_json::to_string(body).map_err(|e| e.to_string()),
        ContentType::Form => match body {
            Value::String(raw) => Ok(raw.clone()),
            Value::Object(map) => {
                let mut form = url::form_urlencoded::Serializer::new(String::new());
                for (key, value) in map {
                    match value {
                        Value::Null => {}
                        Value::String(s) => {
                            form.append_pair(key, s);
                        }
                        other => {
                            form.append_pair(key, &other.to_string());
                        }
                    }
                }
                Ok(form.finish())
            }
            other => Err(format!("form body must be an object or string, got {}", other)),
        },
    }
}
