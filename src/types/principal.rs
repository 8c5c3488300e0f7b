//! The authenticated caller for one request.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use super::role::Role;

/// Wire format of the principal header, produced by the upstream
/// authentication layer and carried as a single JSON header value.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PrincipalClaims {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clearance: Option<String>,
}

/// The authenticated caller's identity and role set.
///
/// Constructed fresh per request from the principal header and discarded at
/// request end; never persisted by this engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Principal {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    roles: BTreeSet<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    clearance: Option<String>,
}

impl Principal {
    /// Create a principal with an id and a set of roles.
    pub fn new(id: impl Into<String>, roles: impl IntoIterator<Item = Role>) -> Self {
        Principal {
            id: id.into(),
            email: None,
            roles: roles.into_iter().collect(),
            department: None,
            clearance: None,
        }
    }

    /// Set the email and return the updated principal.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the department and return the updated principal.
    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    /// Set the clearance and return the updated principal.
    pub fn with_clearance(mut self, clearance: impl Into<String>) -> Self {
        self.clearance = Some(clearance.into());
        self
    }

    /// Parse a principal from the raw header value.
    ///
    /// Returns `None` for every way the header can fail to identify a
    /// caller: absent header, the literal string `"undefined"`, malformed
    /// JSON, or claims missing `id` or `roles`. Parse failures are logged
    /// and converted to `None`, never propagated.
    pub fn from_header(header: Option<&str>) -> Option<Self> {
        let raw = header?.trim();
        if raw.is_empty() || raw == "undefined" || raw == "null" {
            return None;
        }

        let claims: PrincipalClaims = match serde_json::from_str(raw) {
            Ok(claims) => claims,
            Err(err) => {
                warn!(event = "Principal", phase = "Parse", error = %err);
                return None;
            }
        };

        Self::from_claims(claims)
    }

    /// Build a principal from decoded claims.
    ///
    /// Unknown role strings are dropped with a warning rather than failing
    /// the whole principal; an empty id yields `None`.
    pub fn from_claims(claims: PrincipalClaims) -> Option<Self> {
        if claims.id.is_empty() {
            warn!(event = "Principal", phase = "Validate", reason = "empty id");
            return None;
        }

        let mut roles = BTreeSet::new();
        for role in &claims.roles {
            match Role::from_str(role) {
                Ok(role) => {
                    roles.insert(role);
                }
                Err(_) => {
                    warn!(
                        event = "Principal",
                        phase = "Validate",
                        id = %claims.id,
                        unknown_role = %role
                    );
                }
            }
        }

        Some(Principal {
            id: claims.id,
            email: claims.email,
            roles,
            department: claims.department,
            clearance: claims.clearance,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Whether this principal holds the `Admin` role.
    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    pub fn department(&self) -> Option<&str> {
        self.department.as_deref()
    }

    pub fn clearance(&self) -> Option<&str> {
        self.clearance.as_deref()
    }
}

impl Display for Principal {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let roles = self
            .roles
            .iter()
            .map(Role::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}[{roles}]", self.id)
    }
}
