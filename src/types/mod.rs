//! Data model types for principals, policies, and permission requirements.
//!
//! Wire forms:
//! - Principal header: JSON `{id, email?, roles: [..], department?, clearance?}`
//! - Policy registry: JSON array of `{subject, policies: [..]}` entries
//! - Condition template placeholders: `{{identifier[.identifier]*}}`,
//!   tolerant of whitespace inside the braces

mod action;
mod policy;
mod principal;
mod requirement;
mod role;
mod subject;

pub use action::Action;
pub use policy::{ConditionMap, Effect, Policy};
pub use principal::{Principal, PrincipalClaims};
pub use requirement::{PermissionRequirement, RoleRequirement};
pub use role::Role;
pub use subject::{Subject, SubjectInstance};
