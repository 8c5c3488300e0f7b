//! Static per-operation authorization metadata read by the guards.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::action::Action;
use super::policy::ConditionMap;
use super::role::Role;
use super::subject::Subject;

/// A permission an operation requires.
///
/// An operation may declare several; the permission guard grants the call
/// only if every one of them holds. Condition templates are interpolated
/// against the operation's arguments, not against the principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PermissionRequirement {
    pub action: Action,
    pub subject: Subject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub conditions: Option<ConditionMap>,
}

impl PermissionRequirement {
    /// Create a requirement with no conditions.
    pub fn new(action: Action, subject: impl Into<Subject>) -> Self {
        PermissionRequirement {
            action,
            subject: subject.into(),
            conditions: None,
        }
    }

    /// Add one condition template and return the updated requirement.
    pub fn with_condition(mut self, key: impl Into<String>, template: Value) -> Self {
        self.conditions
            .get_or_insert_with(ConditionMap::new)
            .insert(key.into(), template);
        self
    }
}

/// A role membership requirement, read by the role guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RoleRequirement {
    pub roles: Vec<Role>,
}

impl RoleRequirement {
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        RoleRequirement {
            roles: roles.into_iter().collect(),
        }
    }
}
