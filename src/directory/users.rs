//! User operations.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::descriptor::{ApiVersion, RequestSpec};
use crate::client::error::{ClientError, ClientResult, RequestContext};
use crate::client::response::ResponseBody;
use crate::directory::status::{normalize_status, plan_user_update, UserUpdatePlan};
use crate::directory::DeviceDirectory;
use crate::identity::anchor;
use crate::identity::resolver::{LookupIntent, ResolvedIdentity, ResourceKind};

/// Which user field a lookup key is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserLookup {
    #[default]
    ExternalId,
    UserName,
}

impl UserLookup {
    fn kind(&self) -> ResourceKind {
        match self {
            UserLookup::ExternalId => ResourceKind::UserByExternalId,
            UserLookup::UserName => ResourceKind::UserByUsername,
        }
    }
}

/// Writable user attributes, in the platform's field names.
///
/// `None` leaves a field untouched; `Some("")` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_attribute2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_attribute3: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_attribute4: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_attribute5: Option<String>,
}

impl UserAttributes {
    pub fn is_empty(&self) -> bool {
        *self == UserAttributes::default()
    }
}

/// A user to create.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub user_name: String,
    pub external_id: Option<String>,
    /// Defaults to active.
    pub active: Option<bool>,
    /// Directory object id as a base64 anchor.
    pub immutable_id: Option<String>,
    pub attributes: UserAttributes,
}

/// Changes to apply to an existing user.
#[derive(Debug, Clone, Default)]
pub struct UserChange {
    /// Desired status: bool, `"true"`/`"false"` or `1`/`0`.
    pub active: Option<Value>,
    pub attributes: UserAttributes,
}

/// A user as stored on the platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorUser {
    pub uuid: String,
    pub numeric_id: Option<i64>,
    pub user_name: Option<String>,
    pub external_id: Option<String>,
    pub active: Option<bool>,
    /// `customAttribute1` re-encoded as a base64 anchor.
    pub immutable_id: Option<String>,
    pub attributes: UserAttributes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
    user_name: Option<String>,
    external_id: Option<String>,
    status: Option<Value>,
    custom_attribute1: Option<String>,
    #[serde(flatten)]
    attributes: UserAttributes,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateUserBody<'a> {
    user_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    external_id: Option<&'a str>,
    status: bool,
    #[serde(flatten)]
    attributes: &'a UserAttributes,
    #[serde(skip_serializing_if = "Option::is_none")]
    email_username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    aad_mapping_attribute: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_attribute1: Option<&'a str>,
    security_type: &'static str,
}

/// Attribute patch body; the login name follows the email address.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PatchUserBody<'a> {
    #[serde(flatten)]
    attributes: &'a UserAttributes,
    #[serde(skip_serializing_if = "Option::is_none")]
    email_username: Option<&'a str>,
}

impl DeviceDirectory {
    /// Look up a user and fetch the full platform record.
    pub async fn get_user(
        &self,
        tenant: &str,
        key: &str,
        lookup: UserLookup,
        token: Option<&str>,
    ) -> ClientResult<Option<VendorUser>> {
        let identity = match self
            .resolver
            .resolve_anchor(tenant, lookup.kind(), key, token, LookupIntent::Read)
            .await?
        {
            Some(identity) => identity,
            None => return Ok(None),
        };

        let path = format!("/system/users/{}", identity.internal_id);
        let spec = RequestSpec::get(path.clone()).token(token).api_version(ApiVersion::V2);
        let envelope = self.executor().execute(tenant, spec).await?;

        let record: UserRecord = match envelope.body {
            ResponseBody::Json(value) => serde_json::from_value(value).map_err(|e| ClientError::Decode {
                context: RequestContext::new(tenant, &Method::GET, &path),
                message: e.to_string(),
            })?,
            ResponseBody::Empty => return Ok(None),
            ResponseBody::Text(_) => {
                return Err(ClientError::Decode {
                    context: RequestContext::new(tenant, &Method::GET, &path),
                    message: "user record is not JSON".to_string(),
                })
            }
        };

        let immutable_id = record.custom_attribute1.as_deref().and_then(|stored| match anchor::encode(stored) {
            Ok(encoded) => Some(encoded),
            Err(e) => {
                tracing::warn!(tenant = %tenant, uuid = %identity.internal_id, error = %e, "Stored immutable id is not a UUID");
                None
            }
        });

        Ok(Some(VendorUser {
            uuid: identity.internal_id,
            numeric_id: identity.numeric_id,
            user_name: record.user_name.or(identity.display.name),
            external_id: record.external_id.or(identity.external_id),
            active: record.status.as_ref().and_then(normalize_status),
            immutable_id,
            attributes: record.attributes,
        }))
    }

    /// Create a directory-backed user. Returns the platform's response body.
    pub async fn create_user(&self, tenant: &str, user: &NewUser, token: Option<&str>) -> ClientResult<ResponseBody> {
        let decoded = user.immutable_id.as_deref().map(anchor::decode).transpose()?;

        let body = CreateUserBody {
            user_name: &user.user_name,
            external_id: user.external_id.as_deref(),
            status: user.active.unwrap_or(true),
            attributes: &user.attributes,
            email_username: user.attributes.email_address.as_deref(),
            aad_mapping_attribute: decoded.as_deref(),
            custom_attribute1: decoded.as_deref(),
            security_type: "directory",
        };
        let body = to_value(tenant, &Method::POST, "/system/Users", &body)?;

        let spec = RequestSpec::post("/system/Users")
            .body(body)
            .token(token)
            .api_version(ApiVersion::V2);
        let envelope = self.executor().execute(tenant, spec).await?;

        tracing::info!(tenant = %tenant, user_name = %user.user_name, "User created");
        Ok(envelope.body)
    }

    /// Delete the user with `external_id`.
    pub async fn delete_user(&self, tenant: &str, external_id: &str, token: Option<&str>) -> ClientResult<()> {
        let identity = self
            .resolver
            .require(tenant, ResourceKind::UserByExternalId, external_id, token)
            .await?;

        let spec = RequestSpec::delete(format!("/system/users/{}", identity.internal_id))
            .token(token)
            .api_version(ApiVersion::V2);
        self.executor().execute(tenant, spec).await?;

        tracing::info!(tenant = %tenant, external_id = %external_id, "User deleted");
        Ok(())
    }

    /// Apply `change` to the user with `external_id`. Returns the plan that
    /// was carried out.
    pub async fn modify_user(
        &self,
        tenant: &str,
        external_id: &str,
        change: &UserChange,
        token: Option<&str>,
    ) -> ClientResult<UserUpdatePlan> {
        let identity = self
            .resolver
            .require(tenant, ResourceKind::UserByExternalId, external_id, token)
            .await?;

        let plan = plan_user_update(identity.display.status.as_ref(), change);
        if plan.is_noop() {
            tracing::debug!(tenant = %tenant, external_id = %external_id, "User unchanged");
            return Ok(plan);
        }

        if let Some(transition) = plan.transition {
            let id = numeric_id(tenant, &identity, external_id)?;
            let spec = RequestSpec::post(format!("/system/users/{}/{}", id, transition.action()))
                .token(token)
                .api_version(ApiVersion::V1);
            self.executor().execute(tenant, spec).await?;
            tracing::info!(tenant = %tenant, external_id = %external_id, action = transition.action(), "User status changed");
        }

        if let Some(attributes) = &plan.patch {
            let path = format!("/system/Users/{}", identity.internal_id);
            let body = PatchUserBody {
                attributes,
                email_username: attributes.email_address.as_deref(),
            };
            let body = to_value(tenant, &Method::PUT, &path, &body)?;
            let spec = RequestSpec::put(path).body(body).token(token).api_version(ApiVersion::V2);
            self.executor().execute(tenant, spec).await?;
            tracing::info!(tenant = %tenant, external_id = %external_id, "User attributes updated");
        }

        Ok(plan)
    }
}

/// The numeric `Id.Value` the v1 endpoints address users by.
pub(crate) fn numeric_id(tenant: &str, identity: &ResolvedIdentity, key: &str) -> ClientResult<i64> {
    identity.numeric_id.ok_or_else(|| ClientError::IncompleteIdentity {
        tenant: tenant.to_string(),
        kind: ResourceKind::UserByExternalId.label(),
        key: key.to_string(),
        field: "numeric id",
    })
}

pub(crate) fn to_value<T: Serialize>(tenant: &str, method: &Method, path: &str, body: &T) -> ClientResult<Value> {
    serde_json::to_value(body).map_err(|e| ClientError::Serialization {
        context: RequestContext::new(tenant, method, path),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_body() {
        let attributes = UserAttributes {
            first_name: Some("Ann".into()),
            email_address: Some("ann@corp.example".into()),
            ..UserAttributes::default()
        };
        let body = CreateUserBody {
            user_name: "ann",
            external_id: Some("ext-ann"),
            status: true,
            attributes: &attributes,
            email_username: attributes.email_address.as_deref(),
            aad_mapping_attribute: Some("124304d9-ec7a-443b-b460-cf80a09d00c8"),
            custom_attribute1: Some("124304d9-ec7a-443b-b460-cf80a09d00c8"),
            security_type: "directory",
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            json!({
                "userName": "ann",
                "externalId": "ext-ann",
                "status": true,
                "firstName": "Ann",
                "emailAddress": "ann@corp.example",
                "emailUsername": "ann@corp.example",
                "aadMappingAttribute": "124304d9-ec7a-443b-b460-cf80a09d00c8",
                "customAttribute1": "124304d9-ec7a-443b-b460-cf80a09d00c8",
                "securityType": "directory"
            })
        );
    }

    #[test]
    fn test_record_parsing() {
        let record: UserRecord = serde_json::from_value(json!({
            "userName": "ann",
            "status": "true",
            "department": "Sales",
            "customAttribute1": "124304d9-ec7a-443b-b460-cf80a09d00c8",
            "uuid": "ignored"
        }))
        .unwrap();
        assert_eq!(record.user_name.as_deref(), Some("ann"));
        assert_eq!(record.attributes.department.as_deref(), Some("Sales"));
        assert_eq!(record.status.as_ref().and_then(normalize_status), Some(true));
    }

    #[test]
    fn test_empty_attributes() {
        assert!(UserAttributes::default().is_empty());
        let cleared = UserAttributes {
            phone_number: Some(String::new()),
            ..UserAttributes::default()
        };
        assert!(!cleared.is_empty());
    }
}
