//! Custom user group operations.

use futures_util::future::try_join_all;
use reqwest::Method;
use serde_json::json;

use crate::client::descriptor::{ApiVersion, RequestSpec};
use crate::client::error::{ClientError, ClientResult};
use crate::client::response::ResponseBody;
use crate::directory::users::{numeric_id, to_value};
use crate::directory::DeviceDirectory;
use crate::identity::resolver::{LookupIntent, ResolvedIdentity, ResourceKind};

/// Membership change direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemberOperation {
    #[default]
    Add,
    Remove,
}

impl MemberOperation {
    fn action(&self) -> &'static str {
        match self {
            MemberOperation::Add => "addusertogroup",
            MemberOperation::Remove => "removeuserfromgroup",
        }
    }
}

/// One member to add to or remove from a group, by user external id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberChange {
    pub external_id: String,
    pub operation: MemberOperation,
}

impl MemberChange {
    pub fn add(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            operation: MemberOperation::Add,
        }
    }

    pub fn remove(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            operation: MemberOperation::Remove,
        }
    }
}

impl DeviceDirectory {
    /// Look up a custom group by name.
    pub async fn get_group(&self, tenant: &str, name: &str, token: Option<&str>) -> ClientResult<Option<ResolvedIdentity>> {
        self.resolver
            .resolve_anchor(tenant, ResourceKind::Group, name, token, LookupIntent::Read)
            .await
    }

    /// Create a custom group. Returns the platform's response body.
    pub async fn create_group(&self, tenant: &str, name: &str, token: Option<&str>) -> ClientResult<ResponseBody> {
        let path = "/system/usergroups/createcustomusergroup";
        let body = to_value(tenant, &Method::POST, path, &json!({ "GroupName": name }))?;
        let spec = RequestSpec::post(path).body(body).token(token).api_version(ApiVersion::V1);
        let envelope = self.executor().execute(tenant, spec).await?;

        tracing::info!(tenant = %tenant, group = %name, "Group created");
        Ok(envelope.body)
    }

    /// Delete the custom group named `name`.
    pub async fn delete_group(&self, tenant: &str, name: &str, token: Option<&str>) -> ClientResult<()> {
        let group = self.resolver.require(tenant, ResourceKind::Group, name, token).await?;

        let spec = RequestSpec::delete(format!("/system/usergroups/{}/delete", group.internal_id))
            .token(token)
            .api_version(ApiVersion::V1);
        self.executor().execute(tenant, spec).await?;

        tracing::info!(tenant = %tenant, group = %name, "Group deleted");
        Ok(())
    }

    /// Apply membership changes to the group named `name`.
    ///
    /// Members are resolved and updated concurrently; the first failure is
    /// returned and the remaining calls are dropped.
    pub async fn modify_group_members(
        &self,
        tenant: &str,
        name: &str,
        changes: &[MemberChange],
        token: Option<&str>,
    ) -> ClientResult<()> {
        let group = self.resolver.require(tenant, ResourceKind::Group, name, token).await?;
        let group_id = group.internal_id.as_str();

        try_join_all(changes.iter().map(|change| async move {
            let user = self
                .resolver
                .require(tenant, ResourceKind::UserByExternalId, &change.external_id, token)
                .await?;
            let user_id = numeric_id(tenant, &user, &change.external_id)?;

            let path = format!(
                "/system/usergroups/{}/user/{}/{}",
                group_id,
                user_id,
                change.operation.action()
            );
            let spec = RequestSpec::post(path)
                .body(json!({}))
                .token(token)
                .api_version(ApiVersion::V1);
            self.executor().execute(tenant, spec).await?;

            tracing::debug!(
                tenant = %tenant,
                group = %name,
                member = %change.external_id,
                action = change.operation.action(),
                "Group membership changed"
            );
            Ok::<(), ClientError>(())
        }))
        .await?;

        tracing::info!(tenant = %tenant, group = %name, members = changes.len(), "Group members updated");
        Ok(())
    }
}
