//! Per-request compiled rule sets and the factory that builds them.
//!
//! An [`Ability`] is compiled from the static [`PolicyRegistry`] and one
//! [`Principal`] at the start of guard evaluation, queried within that
//! evaluation, and then discarded. Nothing in it is shared or cached across
//! requests; condition maps are interpolated fresh per compilation.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;

use itertools::Itertools;
use serde_json::Value;
use tracing::debug;

use crate::interpolate::interpolate;
use crate::registry::PolicyRegistry;
use crate::types::{Action, ConditionMap, Effect, Principal, Subject, SubjectInstance};

/// One compiled rule: the actions it covers, the subject it applies to, an
/// optional field restriction (`None` = unrestricted), resolved conditions,
/// and whether it revokes rather than grants.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    actions: Vec<Action>,
    subject: Subject,
    fields: Option<Vec<String>>,
    conditions: Option<ConditionMap>,
    inverted: bool,
}

impl Rule {
    fn manage_all() -> Self {
        Rule {
            actions: vec![Action::Manage],
            subject: Subject::all(),
            fields: None,
            conditions: None,
            inverted: false,
        }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    /// The field restriction, if any. `None` means every field is covered.
    pub fn fields(&self) -> Option<&[String]> {
        self.fields.as_deref()
    }

    pub fn conditions(&self) -> Option<&ConditionMap> {
        self.conditions.as_ref()
    }

    /// Whether this rule revokes (deny-derived) rather than grants.
    pub fn inverted(&self) -> bool {
        self.inverted
    }

    /// Whether this rule matches a query.
    ///
    /// The subject must equal the query subject or be the universal `"all"`
    /// subject; the actions must include the queried action or `Manage`;
    /// the field check applies only when a field is queried; the condition
    /// check applies only when instance data is supplied.
    fn matches(
        &self,
        action: Action,
        subject: &Subject,
        field: Option<&str>,
        data: Option<&BTreeMap<String, Value>>,
    ) -> bool {
        if !self.subject.is_all() && self.subject != *subject {
            return false;
        }
        if !self.actions.iter().any(|a| a.implies(action)) {
            return false;
        }
        if let (Some(field), Some(fields)) = (field, &self.fields)
            && !fields.iter().any(|f| f == field)
        {
            return false;
        }
        if let (Some(conditions), Some(data)) = (&self.conditions, data)
            && !conditions.iter().all(|(key, value)| data.get(key) == Some(value))
        {
            return false;
        }
        true
    }
}

impl Display for Rule {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let effect = if self.inverted { "deny" } else { "allow" };
        let actions = self
            .actions
            .iter()
            .map(Action::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{effect} [{actions}] on {}", self.subject)?;
        if let Some(fields) = &self.fields {
            write!(f, " fields [{}]", fields.join(", "))?;
        }
        if let Some(conditions) = &self.conditions {
            let pairs = conditions
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, " when {{{pairs}}}")?;
        }
        Ok(())
    }
}

/// The named deny-overrides combining algorithm: any matching deny rule
/// wins over any matching allow rule; no match at all is a deny.
fn deny_overrides(allow_match: bool, deny_match: bool) -> bool {
    allow_match && !deny_match
}

/// The compiled, per-request queryable rule set.
///
/// Allow and deny rules are held in separate lists and combined by
/// [`deny_overrides`]. The admin override is carried apart from both lists
/// and checked as an unconditional alternative before the combinator, so
/// deny rules cannot restrict it. The listing order preserved by
/// [`Ability::rules`] is the override first (when present), then allow
/// rules most-recently-compiled first, then deny rules in compilation
/// order.
#[derive(Debug, Clone, Default)]
pub struct Ability {
    admin_override: Option<Rule>,
    allow_rules: Vec<Rule>,
    deny_rules: Vec<Rule>,
}

impl Ability {
    /// Whether any rule grants `action` on `subject`, regardless of fields
    /// and conditions.
    pub fn can(&self, action: Action, subject: &Subject) -> bool {
        self.decide(action, subject, None, None)
    }

    /// Whether `action` on `subject` is granted for one specific field.
    pub fn can_field(&self, action: Action, subject: &Subject, field: &str) -> bool {
        self.decide(action, subject, Some(field), None)
    }

    /// Whether `action` is granted on a concrete subject instance; rule
    /// conditions are matched against the instance's attribute data.
    pub fn can_instance(&self, action: Action, instance: &SubjectInstance) -> bool {
        self.decide(action, instance.subject(), None, Some(instance.data()))
    }

    fn decide(
        &self,
        action: Action,
        subject: &Subject,
        field: Option<&str>,
        data: Option<&BTreeMap<String, Value>>,
    ) -> bool {
        if let Some(rule) = &self.admin_override
            && rule.matches(action, subject, field, data)
        {
            return true;
        }

        let allow_match = self
            .allow_rules
            .iter()
            .any(|r| r.matches(action, subject, field, data));
        let deny_match = self
            .deny_rules
            .iter()
            .any(|r| r.matches(action, subject, field, data));

        deny_overrides(allow_match, deny_match)
    }

    /// The combined rule listing: the admin override first when present,
    /// then allow rules (most recently compiled first), then deny rules in
    /// compilation order.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.admin_override
            .iter()
            .chain(self.allow_rules.iter())
            .chain(self.deny_rules.iter())
    }

    /// Distinct actions any granting rule covers on `subject`, sorted.
    ///
    /// This reflects grants only; deny rules and conditions are not
    /// consulted. The admin override and rules on the universal subject
    /// contribute too.
    pub fn actions_for(&self, subject: &Subject) -> Vec<Action> {
        self.admin_override
            .iter()
            .chain(self.allow_rules.iter())
            .filter(|r| r.subject.is_all() || r.subject == *subject)
            .flat_map(|r| r.actions.iter().copied())
            .sorted()
            .dedup()
            .collect()
    }
}

/// Compiles abilities from the registry, applying the admin override and
/// interpolating policy conditions against the principal.
#[derive(Debug, Clone)]
pub struct AbilityFactory {
    registry: Arc<PolicyRegistry>,
}

impl AbilityFactory {
    pub fn new(registry: Arc<PolicyRegistry>) -> Self {
        AbilityFactory { registry }
    }

    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    /// Compile an ability for one principal. Pure and total: a registry
    /// entry that does not apply to the principal simply yields a rule that
    /// never matches.
    pub fn build_for(&self, principal: &Principal) -> Ability {
        let mut allow_rules = Vec::new();
        let mut deny_rules = Vec::new();

        // Admins hold Manage on every subject, unconditionally. Ordinary
        // policies are still compiled below, but the override sits outside
        // the allow/deny lists so no deny policy can restrict it.
        let admin_override = principal.is_admin().then(Rule::manage_all);

        let values = serde_json::to_value(principal).unwrap_or_default();

        for entry in self.registry.entries() {
            for policy in &entry.policies {
                let conditions = policy
                    .conditions
                    .as_ref()
                    .filter(|c| !c.is_empty())
                    .map(|c| interpolate(c, &values));
                let fields = if policy.fields.is_empty() {
                    None
                } else {
                    Some(policy.fields.clone())
                };
                let subjects: &[Subject] = if policy.subjects.is_empty() {
                    std::slice::from_ref(&entry.subject)
                } else {
                    &policy.subjects
                };

                for subject in subjects {
                    let rule = Rule {
                        actions: policy.actions.clone(),
                        subject: subject.clone(),
                        fields: fields.clone(),
                        conditions: conditions.clone(),
                        inverted: policy.effect == Effect::Deny,
                    };
                    match policy.effect {
                        Effect::Allow => allow_rules.push(rule),
                        Effect::Deny => deny_rules.push(rule),
                    }
                }
            }
        }

        // Listing contract: allow rules most-recently-compiled first.
        allow_rules.reverse();

        debug!(
            event = "Ability",
            phase = "Compiled",
            principal = principal.id(),
            admin = admin_override.is_some(),
            allow_rules = allow_rules.len(),
            deny_rules = deny_rules.len()
        );

        Ability {
            admin_override,
            allow_rules,
            deny_rules,
        }
    }
}
