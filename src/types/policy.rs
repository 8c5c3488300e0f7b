//! Static policy records, the configuration unit of the registry.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{Display as StrumDisplay, EnumString};
use utoipa::ToSchema;

use super::action::Action;
use super::subject::Subject;

/// Whether a policy grants or revokes its actions.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    StrumDisplay,
    EnumString,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Effect {
    Allow,
    Deny,
}

/// A map of condition keys to templates. Template values are either
/// literals or strings containing `{{ path }}` placeholders resolved per
/// request.
pub type ConditionMap = BTreeMap<String, Value>;

/// One static policy: an effect, the actions it covers, the subjects it
/// applies to, an optional field restriction, and optional condition
/// templates.
///
/// An empty `fields` list means every field is covered, not none. An empty
/// `subjects` list means the policy applies to the subject of the registry
/// entry that carries it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Policy {
    pub effect: Effect,
    pub actions: Vec<Action>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<Subject>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub conditions: Option<ConditionMap>,
}

impl Policy {
    /// Create an allow policy for the given actions.
    pub fn allow(actions: impl IntoIterator<Item = Action>) -> Self {
        Policy {
            effect: Effect::Allow,
            actions: actions.into_iter().collect(),
            subjects: Vec::new(),
            fields: Vec::new(),
            conditions: None,
        }
    }

    /// Create a deny policy for the given actions.
    pub fn deny(actions: impl IntoIterator<Item = Action>) -> Self {
        Policy {
            effect: Effect::Deny,
            ..Policy::allow(actions)
        }
    }

    /// Set the subjects and return the updated policy.
    pub fn with_subjects<S: Into<Subject>>(mut self, subjects: impl IntoIterator<Item = S>) -> Self {
        self.subjects = subjects.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict the policy to the given fields and return it.
    pub fn with_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Add one condition template and return the updated policy.
    pub fn with_condition(mut self, key: impl Into<String>, template: Value) -> Self {
        self.conditions
            .get_or_insert_with(ConditionMap::new)
            .insert(key.into(), template);
        self
    }
}

impl Display for Policy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let actions = self
            .actions
            .iter()
            .map(Action::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}([{actions}])", self.effect)?;
        if !self.fields.is_empty() {
            write!(f, " fields [{}]", self.fields.join(", "))?;
        }
        if let Some(conditions) = &self.conditions {
            let keys = conditions.keys().cloned().collect::<Vec<_>>().join(", ");
            write!(f, " when [{keys}]")?;
        }
        Ok(())
    }
}
