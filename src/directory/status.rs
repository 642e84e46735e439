//! User status planning.
//!
//! The platform changes a user's active flag through dedicated
//! activate/deactivate endpoints, separate from the attribute update. The
//! status value itself arrives as a bool, a string or a number depending on
//! the endpoint, so both sides are normalized before comparing.

use serde_json::Value;

use crate::directory::users::{UserAttributes, UserChange};

/// Status endpoint to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTransition {
    Activate,
    Deactivate,
}

impl StatusTransition {
    /// Final path segment of the status endpoint.
    pub fn action(&self) -> &'static str {
        match self {
            StatusTransition::Activate => "activate",
            StatusTransition::Deactivate => "deactivate",
        }
    }

    fn towards(active: bool) -> Self {
        if active {
            StatusTransition::Activate
        } else {
            StatusTransition::Deactivate
        }
    }
}

/// Calls required to apply a `UserChange`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserUpdatePlan {
    pub transition: Option<StatusTransition>,
    pub patch: Option<UserAttributes>,
}

impl UserUpdatePlan {
    pub fn is_noop(&self) -> bool {
        self.transition.is_none() && self.patch.is_none()
    }
}

/// Normalize a platform or caller status value.
///
/// Accepts booleans, `"true"`/`"false"` in any case and `1`/`0`. Anything
/// else is unknown.
pub fn normalize_status(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Decide which calls a change needs, given the user's current status.
///
/// A transition is planned only when the desired status is known and differs
/// from the current one; an unknown current status always takes the desired
/// value. A patch is planned when any attribute is set.
pub fn plan_user_update(current: Option<&Value>, change: &UserChange) -> UserUpdatePlan {
    let desired = change.active.as_ref().and_then(normalize_status);
    let current = current.and_then(normalize_status);

    let transition = match (current, desired) {
        (_, None) => None,
        (Some(current), Some(desired)) if current == desired => None,
        (_, Some(desired)) => Some(StatusTransition::towards(desired)),
    };

    let patch = (!change.attributes.is_empty()).then(|| change.attributes.clone());

    UserUpdatePlan { transition, patch }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn change(active: Option<Value>, department: Option<&str>) -> UserChange {
        UserChange {
            active,
            attributes: UserAttributes {
                department: department.map(str::to_string),
                ..UserAttributes::default()
            },
        }
    }

    #[test]
    fn test_normalize_status() {
        assert_eq!(normalize_status(&json!(true)), Some(true));
        assert_eq!(normalize_status(&json!("FALSE")), Some(false));
        assert_eq!(normalize_status(&json!("True")), Some(true));
        assert_eq!(normalize_status(&json!(1)), Some(true));
        assert_eq!(normalize_status(&json!(0)), Some(false));
        assert_eq!(normalize_status(&json!("maybe")), None);
        assert_eq!(normalize_status(&json!(null)), None);
        assert_eq!(normalize_status(&json!(2)), None);
    }

    #[test]
    fn test_same_status_is_noop() {
        let plan = plan_user_update(Some(&json!(true)), &change(Some(json!("true")), None));
        assert!(plan.is_noop());

        let plan = plan_user_update(Some(&json!("false")), &change(Some(json!(false)), None));
        assert!(plan.is_noop());
    }

    #[test]
    fn test_status_change() {
        let plan = plan_user_update(Some(&json!(true)), &change(Some(json!("False")), None));
        assert_eq!(plan.transition, Some(StatusTransition::Deactivate));
        assert!(plan.patch.is_none());

        let plan = plan_user_update(Some(&json!(0)), &change(Some(json!(true)), None));
        assert_eq!(plan.transition, Some(StatusTransition::Activate));
    }

    #[test]
    fn test_status_and_attributes() {
        let plan = plan_user_update(Some(&json!(false)), &change(Some(json!(true)), Some("Sales")));
        assert_eq!(plan.transition, Some(StatusTransition::Activate));
        assert_eq!(
            plan.patch.and_then(|p| p.department),
            Some("Sales".to_string())
        );
    }

    #[test]
    fn test_attributes_only() {
        let plan = plan_user_update(Some(&json!(true)), &change(None, Some("")));
        assert!(plan.transition.is_none());
        // an empty string still clears the attribute
        assert!(plan.patch.is_some());
    }

    #[test]
    fn test_unknown_current_status() {
        let plan = plan_user_update(None, &change(Some(json!(false)), None));
        assert_eq!(plan.transition, Some(StatusTransition::Deactivate));

        let plan = plan_user_update(None, &change(Some(json!("unknown")), None));
        assert!(plan.is_noop());
    }
}
