//! Platform directory operations.
//!
//! # Responsibilities
//! - Typed user and custom-group operations on top of the request executor
//! - Translate external keys to platform ids through the identity resolver
//! - Plan user status transitions separately from attribute updates
//!
//! # Endpoints
//! ```text
//! users   GET    /system/users/{uuid}                              (v2)
//!         POST   /system/Users                                     (v2)
//!         PUT    /system/Users/{uuid}                              (v2)
//!         DELETE /system/users/{uuid}                              (v2)
//!         POST   /system/users/{id}/activate|deactivate            (v1)
//! groups  POST   /system/usergroups/createcustomusergroup          (v1)
//!         DELETE /system/usergroups/{id}/delete                    (v1)
//!         POST   /system/usergroups/{gid}/user/{uid}/addusertogroup
//!         POST   /system/usergroups/{gid}/user/{uid}/removeuserfromgroup
//! ```

pub mod groups;
pub mod status;
pub mod users;

use std::sync::Arc;

use crate::client::executor::RequestExecutor;
use crate::client::registry::ServiceClientRegistry;
use crate::identity::resolver::IdentityResolver;

pub use groups::{MemberChange, MemberOperation};
pub use status::{normalize_status, plan_user_update, StatusTransition, UserUpdatePlan};
pub use users::{NewUser, UserAttributes, UserChange, UserLookup, VendorUser};

/// User and group operations for every configured tenant.
#[derive(Debug, Clone)]
pub struct DeviceDirectory {
    resolver: IdentityResolver,
}

impl DeviceDirectory {
    pub fn new(resolver: IdentityResolver) -> Self {
        Self { resolver }
    }

    /// Wire a directory over a shared registry.
    pub fn from_registry(registry: Arc<ServiceClientRegistry>) -> Self {
        Self::new(IdentityResolver::new(RequestExecutor::new(registry)))
    }

    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    fn executor(&self) -> &RequestExecutor {
        self.resolver.executor()
    }
}
