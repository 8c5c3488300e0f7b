// src/lib.rs
pub use ability::{Ability, AbilityFactory, Rule};
pub use error::PolicyError;
pub use guard::{PermissionGuard, RoleGuard};
pub use interpolate::interpolate;
pub use registry::{PolicyRegistry, SubjectPolicies};
pub use types::{
    Action, ConditionMap, Effect, PermissionRequirement, Policy, Principal, PrincipalClaims, Role,
    RoleRequirement, Subject, SubjectInstance,
};

mod ability;
mod error;
mod guard;
mod interpolate;
mod registry;
mod types;
