//! Request-time enforcement points.
//!
//! Both guards are stateless across calls: each evaluation parses the
//! principal header, compiles what it needs, answers, and discards
//! everything. Authorization outcomes are booleans; denial is never an
//! error.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::ability::AbilityFactory;
use crate::interpolate::interpolate;
use crate::registry::PolicyRegistry;
use crate::types::{PermissionRequirement, Principal, Role, SubjectInstance};

/// The request-time gate invoked before a protected operation executes.
///
/// Evaluates the operation's declared [`PermissionRequirement`]s against an
/// ability compiled fresh for the calling principal. Protection is opt-in:
/// an operation with no requirements is always granted by this guard, which
/// composes with an upstream authentication check.
#[derive(Debug, Clone)]
pub struct PermissionGuard {
    factory: AbilityFactory,
}

impl PermissionGuard {
    pub fn new(registry: Arc<PolicyRegistry>) -> Self {
        PermissionGuard {
            factory: AbilityFactory::new(registry),
        }
    }

    /// Decide whether the caller may invoke the operation.
    ///
    /// - No requirements: granted.
    /// - Unparseable or absent principal header: denied, never an error.
    /// - Otherwise every requirement must hold. Requirement conditions are
    ///   interpolated against `operation_args` and matched as a concrete
    ///   subject instance; neither the requirement templates nor the
    ///   arguments are mutated.
    pub fn authorize(
        &self,
        requirements: &[PermissionRequirement],
        principal_header: Option<&str>,
        operation_args: &Value,
    ) -> bool {
        if requirements.is_empty() {
            return true;
        }

        let Some(principal) = Principal::from_header(principal_header) else {
            warn!(event = "Authorize", phase = "Principal", granted = false);
            return false;
        };

        let ability = self.factory.build_for(&principal);

        let granted = requirements.iter().all(|requirement| {
            let holds = match requirement.conditions.as_ref().filter(|c| !c.is_empty()) {
                Some(conditions) => {
                    let resolved = interpolate(conditions, operation_args);
                    let instance = SubjectInstance::new(requirement.subject.clone(), resolved);
                    ability.can_instance(requirement.action, &instance)
                }
                None => ability.can(requirement.action, &requirement.subject),
            };
            debug!(
                event = "Authorize",
                phase = "Requirement",
                principal = principal.id(),
                action = %requirement.action,
                subject = %requirement.subject,
                holds = holds
            );
            holds
        });

        debug!(
            event = "Authorize",
            phase = "Decision",
            principal = principal.id(),
            granted = granted
        );
        granted
    }
}

/// A coarse role-membership gate, independent of the ability engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleGuard;

impl RoleGuard {
    pub fn new() -> Self {
        RoleGuard
    }

    /// Grant when no roles are required, or when the parsed principal holds
    /// at least one of the required roles.
    pub fn authorize(&self, required_roles: &[Role], principal_header: Option<&str>) -> bool {
        if required_roles.is_empty() {
            return true;
        }

        let Some(principal) = Principal::from_header(principal_header) else {
            warn!(event = "RoleCheck", phase = "Principal", granted = false);
            return false;
        };

        let granted = required_roles.iter().any(|role| principal.has_role(*role));
        debug!(
            event = "RoleCheck",
            phase = "Decision",
            principal = principal.id(),
            granted = granted
        );
        granted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SubjectPolicies;
    use crate::types::{Action, Policy};
    use serde_json::json;
    use yare::parameterized;

    const USER_HEADER: &str = r#"{"id": "u1", "email": "u1@example.com", "roles": ["User"]}"#;
    const ADMIN_HEADER: &str = r#"{"id": "root", "roles": ["Admin"]}"#;

    fn guard_with(entries: Vec<SubjectPolicies>) -> PermissionGuard {
        PermissionGuard::new(Arc::new(PolicyRegistry::new(entries).unwrap()))
    }

    fn user_registry() -> Vec<SubjectPolicies> {
        vec![SubjectPolicies::new(
            "User",
            vec![
                Policy::allow([Action::Read]),
                Policy::allow([Action::Update]).with_condition("id", json!("{{id}}")),
            ],
        )]
    }

    #[parameterized(
        no_header = { None },
        garbage_header = { Some("{broken") },
        literal_undefined = { Some("undefined") },
    )]
    fn test_fail_open_when_undecorated(header: Option<&str>) {
        let guard = guard_with(vec![]);
        assert!(guard.authorize(&[], header, &json!({})));
    }

    #[parameterized(
        no_header = { None },
        literal_undefined = { Some("undefined") },
        malformed_json = { Some("{broken") },
        missing_roles = { Some(r#"{"id": "u1"}"#) },
    )]
    fn test_fail_closed_when_unauthenticated(header: Option<&str>) {
        let guard = guard_with(user_registry());
        let requirements = [PermissionRequirement::new(Action::Read, "User")];
        assert!(!guard.authorize(&requirements, header, &json!({})));
    }

    #[test]
    fn test_unconditional_requirement_granted() {
        let guard = guard_with(user_registry());
        let requirements = [PermissionRequirement::new(Action::Read, "User")];
        assert!(guard.authorize(&requirements, Some(USER_HEADER), &json!({})));
    }

    #[test]
    fn test_unconditional_requirement_denied_for_uncovered_action() {
        let guard = guard_with(user_registry());
        let requirements = [PermissionRequirement::new(Action::Delete, "User")];
        assert!(!guard.authorize(&requirements, Some(USER_HEADER), &json!({})));
    }

    #[parameterized(
        own_record_granted = { json!({"id": "u1"}), true },
        other_record_denied = { json!({"id": "u2"}), false },
        missing_argument_denied = { json!({}), false },
    )]
    fn test_end_to_end_conditional_update(operation_args: Value, expected: bool) {
        // The policy condition binds to the principal's id, the requirement
        // condition binds to the update's arguments.
        let guard = guard_with(user_registry());
        let requirements = [
            PermissionRequirement::new(Action::Update, "User")
                .with_condition("id", json!("{{id}}")),
        ];

        assert_eq!(
            guard.authorize(&requirements, Some(USER_HEADER), &operation_args),
            expected
        );
    }

    #[test]
    fn test_all_requirements_must_hold() {
        let guard = guard_with(user_registry());
        let requirements = [
            PermissionRequirement::new(Action::Read, "User"),
            PermissionRequirement::new(Action::Delete, "User"),
        ];
        assert!(!guard.authorize(&requirements, Some(USER_HEADER), &json!({})));
    }

    #[test]
    fn test_admin_granted_without_matching_policies() {
        let guard = guard_with(vec![]);
        let requirements = [
            PermissionRequirement::new(Action::Delete, "User"),
            PermissionRequirement::new(Action::Update, "Document")
                .with_condition("ownerId", json!("{{ownerId}}")),
        ];
        assert!(guard.authorize(&requirements, Some(ADMIN_HEADER), &json!({"ownerId": "u9"})));
    }

    #[test]
    fn test_admin_granted_despite_deny_policies() {
        let guard = guard_with(vec![SubjectPolicies::new(
            "User",
            vec![Policy::deny([Action::Delete])],
        )]);
        let requirements = [PermissionRequirement::new(Action::Delete, "User")];

        assert!(guard.authorize(&requirements, Some(ADMIN_HEADER), &json!({})));
        assert!(!guard.authorize(&requirements, Some(USER_HEADER), &json!({})));
    }

    #[test]
    fn test_requirement_templates_left_pristine() {
        let guard = guard_with(user_registry());
        let requirements = [
            PermissionRequirement::new(Action::Update, "User")
                .with_condition("id", json!("{{id}}")),
        ];

        let _ = guard.authorize(&requirements, Some(USER_HEADER), &json!({"id": "u1"}));

        assert_eq!(
            requirements[0].conditions.as_ref().unwrap().get("id"),
            Some(&json!("{{id}}"))
        );
    }

    #[test]
    fn test_nested_argument_paths() {
        let guard = guard_with(vec![SubjectPolicies::new(
            "Document",
            vec![Policy::allow([Action::Read]).with_condition("department", json!("sales"))],
        )]);
        let requirements = [
            PermissionRequirement::new(Action::Read, "Document")
                .with_condition("department", json!("{{input.department}}")),
        ];

        let args = json!({"input": {"department": "sales"}});
        assert!(guard.authorize(&requirements, Some(USER_HEADER), &args));

        let args = json!({"input": {"department": "finance"}});
        assert!(!guard.authorize(&requirements, Some(USER_HEADER), &args));
    }

    #[parameterized(
        no_required_roles_any_header = { vec![], None, true },
        admin_required_admin_header = { vec![Role::Admin], Some(ADMIN_HEADER), true },
        admin_required_user_header = { vec![Role::Admin], Some(USER_HEADER), false },
        any_of_required_roles = { vec![Role::Admin, Role::User], Some(USER_HEADER), true },
        required_but_unauthenticated = { vec![Role::User], None, false },
        required_but_undefined_header = { vec![Role::User], Some("undefined"), false },
    )]
    fn test_role_guard(required: Vec<Role>, header: Option<&str>, expected: bool) {
        let guard = RoleGuard::new();
        assert_eq!(guard.authorize(&required, header), expected);
    }
}
