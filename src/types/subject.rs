//! Subjects: resource type names, plus concrete instances for condition matching.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// The universal subject matched by the admin override rule.
const ALL_SUBJECT: &str = "all";

/// A subject name, i.e. a resource type such as `"User"` or `"Document"`.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct Subject(String);

impl Subject {
    /// Create a subject from its name.
    pub fn new(name: impl Into<String>) -> Self {
        Subject(name.into())
    }

    /// The universal subject, `"all"`, matched by every query subject.
    pub fn all() -> Self {
        Subject(ALL_SUBJECT.to_string())
    }

    /// Whether this is the universal subject.
    pub fn is_all(&self) -> bool {
        self.0 == ALL_SUBJECT
    }

    /// The subject name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Display for Subject {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Subject {
    fn from(name: &str) -> Self {
        Subject::new(name)
    }
}

impl From<String> for Subject {
    fn from(name: String) -> Self {
        Subject(name)
    }
}

/// A subject name paired with concrete attribute values, used to match rule
/// conditions against the data of one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubjectInstance {
    subject: Subject,
    #[schema(value_type = Object)]
    data: BTreeMap<String, Value>,
}

impl SubjectInstance {
    /// Create an instance with the given attribute data.
    pub fn new(subject: impl Into<Subject>, data: BTreeMap<String, Value>) -> Self {
        SubjectInstance {
            subject: subject.into(),
            data,
        }
    }

    /// Create an instance with no attributes.
    pub fn empty(subject: impl Into<Subject>) -> Self {
        Self::new(subject, BTreeMap::new())
    }

    /// Add one attribute and return the updated instance.
    pub fn with_attr(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    /// Look up one attribute value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn data(&self) -> &BTreeMap<String, Value> {
        &self.data
    }
}

impl Display for SubjectInstance {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let attrs = self
            .data
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}{{{attrs}}}", self.subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use serde_json::json;

    #[test]
    fn test_subject_all() {
        assert!(Subject::all().is_all());
        assert!(!Subject::new("User").is_all());
        assert_eq!(Subject::all().name(), "all");
    }

    #[test]
    fn test_subject_serialization_is_transparent() {
        let subject = Subject::new("User");
        assert_eq!(serde_json::to_value(&subject).unwrap(), json!("User"));
        let back: Subject = serde_json::from_value(json!("User")).unwrap();
        assert_eq!(back, subject);
    }

    #[test]
    fn test_subject_instance_attrs() {
        let instance = SubjectInstance::empty("User")
            .with_attr("id", json!("u1"))
            .with_attr("department", json!("sales"));

        assert_eq!(instance.subject(), &Subject::new("User"));
        assert_eq!(instance.get("id"), Some(&json!("u1")));
        assert_eq!(instance.get("missing"), None);
        assert_eq!(instance.data().len(), 2);
    }

    #[test]
    fn test_subject_instance_display() {
        let instance = SubjectInstance::empty("User").with_attr("id", json!("u1"));
        assert_snapshot!(instance.to_string(), @r#"User{id="u1"}"#);
    }

    #[test]
    fn test_subject_instance_schema_generation() {
        use utoipa::PartialSchema;
        let schema = serde_json::to_value(SubjectInstance::schema()).unwrap();
        let properties = schema.get("properties").unwrap();
        assert!(properties.get("subject").is_some());
        assert!(properties.get("data").is_some());
    }
}
