//! The static policy registry, loaded once at process start.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::error::PolicyError;
use crate::types::{Policy, Subject};

/// The policies configured for one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubjectPolicies {
    pub subject: Subject,
    pub policies: Vec<Policy>,
}

impl SubjectPolicies {
    pub fn new(subject: impl Into<Subject>, policies: Vec<Policy>) -> Self {
        SubjectPolicies {
            subject: subject.into(),
            policies,
        }
    }
}

/// The immutable, ordered subject-to-policies mapping.
///
/// Built once at process start, shape-validated at load time, and passed by
/// reference into the ability factory. Safe for unsynchronized concurrent
/// reads; never mutated after construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyRegistry {
    entries: Vec<SubjectPolicies>,
}

impl PolicyRegistry {
    /// Build a registry from entries, validating their shape.
    pub fn new(entries: Vec<SubjectPolicies>) -> Result<Self, PolicyError> {
        validate(&entries)?;

        let policies: usize = entries.iter().map(|e| e.policies.len()).sum();
        info!(
            event = "Registry",
            phase = "Loaded",
            subjects = entries.len(),
            policies = policies
        );

        Ok(PolicyRegistry { entries })
    }

    /// A registry with no policies. Every non-admin query denies.
    pub fn empty() -> Self {
        PolicyRegistry::default()
    }

    /// Parse and validate a registry from its JSON document.
    pub fn from_json(text: &str) -> Result<Self, PolicyError> {
        let entries: Vec<SubjectPolicies> = serde_json::from_str(text)?;
        Self::new(entries)
    }

    /// Parse and validate a registry from an already-decoded JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, PolicyError> {
        let entries: Vec<SubjectPolicies> = serde_json::from_value(value)?;
        Self::new(entries)
    }

    pub fn entries(&self) -> &[SubjectPolicies] {
        &self.entries
    }

    /// Subjects with at least one configured policy, sorted by name.
    pub fn subjects(&self) -> Vec<&Subject> {
        self.entries.iter().map(|e| &e.subject).sorted().collect()
    }

    /// The policies configured for one subject, if any.
    pub fn policies_for(&self, subject: &Subject) -> Option<&[Policy]> {
        self.entries
            .iter()
            .find(|e| &e.subject == subject)
            .map(|e| e.policies.as_slice())
    }

    /// Number of registry entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn validate(entries: &[SubjectPolicies]) -> Result<(), PolicyError> {
    for entry in entries {
        if entry.subject.name().is_empty() {
            return Err(PolicyError::InvalidRegistry(
                "registry entry with an empty subject name".to_string(),
            ));
        }
        for policy in &entry.policies {
            if policy.actions.is_empty() {
                return Err(PolicyError::InvalidRegistry(format!(
                    "policy for subject '{}' declares no actions",
                    entry.subject
                )));
            }
            if policy.subjects.iter().any(|s| s.name().is_empty()) {
                return Err(PolicyError::InvalidRegistry(format!(
                    "policy for subject '{}' lists an empty subject name",
                    entry.subject
                )));
            }
            if let Some(conditions) = &policy.conditions
                && conditions.keys().any(|k| k.is_empty())
            {
                return Err(PolicyError::InvalidRegistry(format!(
                    "policy for subject '{}' has a condition with an empty key",
                    entry.subject
                )));
            }
        }
    }
    Ok(())
}
