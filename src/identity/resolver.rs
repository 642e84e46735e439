//! Identity resolution by search and exact match.
//!
//! # Responsibilities
//! - Translate an external key into the platform's internal identifiers
//! - Issue the search call for the resource kind and scan the candidates
//! - Apply the caller's intent to non-2xx and empty search responses
//!
//! # Design Decisions
//! - Matching is exact and case-sensitive; the first usable match wins
//! - No match is `Ok(None)`, never an error
//! - A failed search is `Ok(None)` for reads and an error for mutations

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::descriptor::{ApiVersion, RequestSpec};
use crate::client::error::{ClientError, ClientResult, RequestContext};
use crate::client::executor::RequestExecutor;
use crate::client::response::ResponseBody;
use crate::observability::metrics;

/// What is being looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    UserByExternalId,
    UserByUsername,
    Group,
}

impl ResourceKind {
    /// Search endpoint for `key`, query value URL-encoded.
    pub fn search_path(&self, key: &str) -> String {
        let key: String = url::form_urlencoded::byte_serialize(key.as_bytes()).collect();
        match self {
            ResourceKind::UserByExternalId => format!("/system/users/search?externalId={}", key),
            ResourceKind::UserByUsername => format!("/system/users/search?username={}", key),
            ResourceKind::Group => format!("/system/usergroups/custom/search?groupname={}", key),
        }
    }

    /// Short label used in logs, metrics and errors.
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::UserByExternalId => "user-external-id",
            ResourceKind::UserByUsername => "user-name",
            ResourceKind::Group => "group",
        }
    }
}

/// Why the caller is resolving, which decides how failed searches surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupIntent {
    /// A failed search means "not found".
    Read,
    /// A failed search is an error.
    Mutate,
}

/// Descriptive attributes carried by a match.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DisplayAttributes {
    /// User name or group name.
    pub name: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Platform-side copy of the directory object id (`CustomAttribute1`).
    pub immutable_id: Option<String>,
    /// Raw platform status; the platform is not consistent about its type.
    pub status: Option<Value>,
}

/// A successfully matched platform object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedIdentity {
    /// `Uuid` for users, `UserGroupId` for groups.
    pub internal_id: String,
    /// `Id.Value` for users.
    pub numeric_id: Option<i64>,
    /// `ExternalId` for users, the group name for groups.
    pub external_id: Option<String>,
    pub display: DisplayAttributes,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UserSearch {
    #[serde(default)]
    users: Vec<UserCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UserCandidate {
    external_id: Option<String>,
    user_name: Option<String>,
    uuid: Option<String>,
    id: Option<NumericId>,
    custom_attribute1: Option<String>,
    status: Option<Value>,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NumericId {
    value: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GroupSearch {
    #[serde(default)]
    user_group: Vec<GroupCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GroupCandidate {
    user_group_name: Option<String>,
    user_group_id: Option<Value>,
}

impl UserCandidate {
    fn matches(&self, key: &str) -> bool {
        self.external_id.as_deref() == Some(key) || self.user_name.as_deref() == Some(key)
    }

    fn into_identity(self) -> Option<ResolvedIdentity> {
        Some(ResolvedIdentity {
            internal_id: self.uuid?,
            numeric_id: self.id.and_then(|id| id.value),
            external_id: self.external_id,
            display: DisplayAttributes {
                name: self.user_name,
                email: self.email,
                first_name: self.first_name,
                last_name: self.last_name,
                immutable_id: self.custom_attribute1,
                status: self.status,
            },
        })
    }
}

impl GroupCandidate {
    fn into_identity(self) -> Option<ResolvedIdentity> {
        let internal_id = match self.user_group_id? {
            Value::String(id) => id,
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        Some(ResolvedIdentity {
            numeric_id: internal_id.parse().ok(),
            internal_id,
            external_id: self.user_group_name.clone(),
            display: DisplayAttributes {
                name: self.user_group_name,
                ..DisplayAttributes::default()
            },
        })
    }
}

/// Resolves external keys through the platform's search endpoints.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    executor: RequestExecutor,
}

impl IdentityResolver {
    pub fn new(executor: RequestExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// Search for `key` and return the first exact match.
    pub async fn resolve_anchor(
        &self,
        tenant: &str,
        kind: ResourceKind,
        key: &str,
        token: Option<&str>,
        intent: LookupIntent,
    ) -> ClientResult<Option<ResolvedIdentity>> {
        let spec = RequestSpec::get(kind.search_path(key))
            .token(token)
            .api_version(ApiVersion::V1);

        let result = self.search(tenant, kind, key, spec, intent).await;

        let outcome = match &result {
            Ok(Some(_)) => "found",
            Ok(None) => "missing",
            Err(_) => "error",
        };
        metrics::record_lookup(kind.label(), outcome);
        tracing::debug!(
            tenant = %tenant,
            kind = kind.label(),
            key = %key,
            outcome,
            "Identity lookup"
        );
        result
    }

    /// Like [`resolve_anchor`](Self::resolve_anchor) with mutate intent, but
    /// a missing match is `ClientError::IdentityNotFound`.
    pub async fn require(
        &self,
        tenant: &str,
        kind: ResourceKind,
        key: &str,
        token: Option<&str>,
    ) -> ClientResult<ResolvedIdentity> {
        self.resolve_anchor(tenant, kind, key, token, LookupIntent::Mutate)
            .await?
            .ok_or_else(|| ClientError::IdentityNotFound {
                tenant: tenant.to_string(),
                kind: kind.label(),
                key: key.to_string(),
            })
    }

    async fn search(
        &self,
        tenant: &str,
        kind: ResourceKind,
        key: &str,
        spec: RequestSpec,
        intent: LookupIntent,
    ) -> ClientResult<Option<ResolvedIdentity>> {
        let context = RequestContext::new(tenant, &spec.method, &spec.path);

        let envelope = match self.executor.execute(tenant, spec).await {
            Ok(envelope) => envelope,
            Err(ClientError::Application { status, .. }) if intent == LookupIntent::Read => {
                tracing::debug!(tenant = %tenant, kind = kind.label(), status, "Search rejected, treating as not found");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let value = match envelope.body {
            ResponseBody::Json(value) => value,
            ResponseBody::Empty => {
                return match intent {
                    LookupIntent::Read => Ok(None),
                    LookupIntent::Mutate => Err(ClientError::EmptyResponse { context }),
                };
            }
            ResponseBody::Text(_) => {
                return Err(ClientError::Decode {
                    context,
                    message: "search response is not JSON".to_string(),
                });
            }
        };

        match kind {
            ResourceKind::UserByExternalId | ResourceKind::UserByUsername => {
                let search: UserSearch = decode(value, &context)?;
                Ok(first_user_match(search.users, key))
            }
            ResourceKind::Group => {
                let search: GroupSearch = decode(value, &context)?;
                Ok(first_group_match(search.user_group, key))
            }
        }
    }
}

/// First candidate that matches `key` and carries an internal id.
fn first_user_match(users: Vec<UserCandidate>, key: &str) -> Option<ResolvedIdentity> {
    users
        .into_iter()
        .filter(|candidate| candidate.matches(key))
        .find_map(UserCandidate::into_identity)
}

fn first_group_match(groups: Vec<GroupCandidate>, key: &str) -> Option<ResolvedIdentity> {
    groups
        .into_iter()
        .filter(|candidate| candidate.user_group_name.as_deref() == Some(key))
        .find_map(GroupCandidate::into_identity)
}

fn decode<T: serde::de::DeserializeOwned + Default>(value: Value, context: &RequestContext) -> ClientResult<T> {
    // The platform answers an empty search with `null` or `{}` on some versions.
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value).map_err(|e| ClientError::Decode {
        context: context.clone(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_paths() {
        assert_eq!(
            ResourceKind::UserByExternalId.search_path("124304d9-ec7a"),
            "/system/users/search?externalId=124304d9-ec7a"
        );
        assert_eq!(
            ResourceKind::UserByUsername.search_path("ann@corp.example"),
            "/system/users/search?username=ann%40corp.example"
        );
        assert_eq!(
            ResourceKind::Group.search_path("Sales Team"),
            "/system/usergroups/custom/search?groupname=Sales+Team"
        );
    }

    #[test]
    fn test_user_candidate_mapping() {
        let search: UserSearch = serde_json::from_value(json!({
            "Users": [
                {"UserName": "bob", "ExternalId": "other", "Uuid": "u-1"},
                {
                    "UserName": "ann",
                    "ExternalId": "ext-ann",
                    "Uuid": "u-2",
                    "Id": {"Value": 42},
                    "CustomAttribute1": "124304d9-ec7a-443b-b460-cf80a09d00c8",
                    "Status": true,
                    "Email": "ann@corp.example",
                    "FirstName": "Ann",
                    "LastName": "Lee"
                }
            ]
        }))
        .unwrap();

        let found = first_user_match(search.users, "ext-ann").unwrap();
        assert_eq!(found.internal_id, "u-2");
        assert_eq!(found.numeric_id, Some(42));
        assert_eq!(found.display.name.as_deref(), Some("ann"));
        assert_eq!(found.display.status, Some(json!(true)));
    }

    #[test]
    fn test_match_without_id_is_skipped() {
        let search: UserSearch = serde_json::from_value(json!({
            "Users": [
                {"UserName": "ann", "ExternalId": "ext-ann"},
                {"UserName": "ann", "ExternalId": "ext-ann", "Uuid": "u-2"}
            ]
        }))
        .unwrap();
        let found = first_user_match(search.users, "ext-ann").unwrap();
        assert_eq!(found.internal_id, "u-2");

        let search: GroupSearch = serde_json::from_value(json!({
            "UserGroup": [
                {"UserGroupName": "Sales"},
                {"UserGroupName": "Sales", "UserGroupId": 7}
            ]
        }))
        .unwrap();
        assert_eq!(first_group_match(search.user_group, "Sales").unwrap().internal_id, "7");

        let search: UserSearch =
            serde_json::from_value(json!({"Users": [{"UserName": "ann"}]})).unwrap();
        assert!(first_user_match(search.users, "ann").is_none());
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let candidate: UserCandidate =
            serde_json::from_value(json!({"UserName": "Ann", "Uuid": "u-1"})).unwrap();
        assert!(candidate.matches("Ann"));
        assert!(!candidate.matches("ann"));
    }

    #[test]
    fn test_group_candidate_numeric_id() {
        let candidate: GroupCandidate =
            serde_json::from_value(json!({"UserGroupName": "Sales", "UserGroupId": 17})).unwrap();
        let identity = candidate.into_identity().unwrap();
        assert_eq!(identity.internal_id, "17");
        assert_eq!(identity.numeric_id, Some(17));
        assert_eq!(identity.external_id.as_deref(), Some("Sales"));
    }

    #[test]
    fn test_null_search_is_empty() {
        let context = RequestContext::new("main", &reqwest::Method::GET, "/x");
        let search: GroupSearch = decode(Value::Null, &context).unwrap();
        assert!(search.user_group.is_empty());
        let search: UserSearch = decode(json!({}), &context).unwrap();
        assert!(search.users.is_empty());
    }
}
