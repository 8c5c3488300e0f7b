//! Action verbs for policies and permission requirements.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// An action a caller may attempt on a subject.
///
/// `Manage` is a superset action: a rule granting `Manage` on a subject
/// grants every other action on that subject as well.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Manage,
}

impl Action {
    /// Whether a rule carrying this action satisfies a query for `other`.
    pub fn implies(self, other: Action) -> bool {
        self == Action::Manage || self == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use yare::parameterized;

    #[parameterized(
        manage_implies_create = { Action::Manage, Action::Create, true },
        manage_implies_read = { Action::Manage, Action::Read, true },
        manage_implies_delete = { Action::Manage, Action::Delete, true },
        manage_implies_manage = { Action::Manage, Action::Manage, true },
        read_implies_read = { Action::Read, Action::Read, true },
        read_does_not_imply_update = { Action::Read, Action::Update, false },
        delete_does_not_imply_manage = { Action::Delete, Action::Manage, false },
    )]
    fn test_action_implies(rule_action: Action, queried: Action, expected: bool) {
        assert_eq!(rule_action.implies(queried), expected);
    }

    #[parameterized(
        read_lowercase = { "read", Action::Read },
        update_mixed_case = { "Update", Action::Update },
        manage_uppercase = { "MANAGE", Action::Manage },
    )]
    fn test_action_from_str(input: &str, expected: Action) {
        assert_eq!(Action::from_str(input).unwrap(), expected);
    }

    #[test]
    fn test_action_from_str_rejects_unknown() {
        assert!(Action::from_str("publish").is_err());
    }

    #[test]
    fn test_action_serialization() {
        let serialized = serde_json::to_value(Action::Delete).unwrap();
        assert_eq!(serialized, serde_json::json!("delete"));
        let deserialized: Action = serde_json::from_value(serialized).unwrap();
        assert_eq!(deserialized, Action::Delete);
    }

    #[test]
    fn test_action_display() {
        assert_eq!(Action::Create.to_string(), "create");
    }
}
