use crate::error::KilnError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// What to do when a row receives a second, different value for a field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Keep the field where it first appeared and take the newer value
    #[default]
    Overwrite,
    /// Fail with `KilnError::FieldNameCollision`
    Reject,
}

/// One flat row: field name to string value, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<String, String>,
}

impl Record {
    pub fn new() -> Self {
        Record::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.fields.get_index(index).map(|(name, _)| name.as_str())
    }

    pub fn value_at(&self, index: usize) -> Option<&str> {
        self.fields.get_index(index).map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Add a field, resolving a repeated name with `policy`
    ///
    /// A repeated name with the same value is a no-op. `row` is only used to
    /// report where a collision happened.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        policy: CollisionPolicy,
        row: usize,
    ) -> Result<(), KilnError> {
        let name = name.into();
        let value = value.into();

        match self.fields.get_mut(&name) {
            None => {
                self.fields.insert(name, value);
            }
            Some(existing) if *existing == value => {}
            Some(existing) => match policy {
                CollisionPolicy::Overwrite => {
                    warn!(field = %name, row, old = %existing, new = %value, "field collision, keeping last value");
                    *existing = value;
                }
                CollisionPolicy::Reject => {
                    return Err(KilnError::FieldNameCollision { field: name, row });
                }
            },
        }

        Ok(())
    }
}

impl FromIterator<(String, String)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Record {
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_positional_access() {
        let mut record = Record::new();
        record.insert("id", "1", CollisionPolicy::Reject, 0).unwrap();
        record.insert("name", "Ada", CollisionPolicy::Reject, 0).unwrap();

        assert_eq!(record.len(), 2);
        assert_eq!(record.name_at(1), Some("name"));
        assert_eq!(record.value_at(0), Some("1"));
        assert_eq!(record.name_at(2), None);
        assert_eq!(record.get("missing"), None);
    }

    #[test]
    fn test_overwrite_keeps_first_position() {
        let mut record = Record::new();
        record.insert("a", "1", CollisionPolicy::Overwrite, 3).unwrap();
        record.insert("b", "2", CollisionPolicy::Overwrite, 3).unwrap();
        record.insert("a", "9", CollisionPolicy::Overwrite, 3).unwrap();

        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(record.get("a"), Some("9"));
    }

    #[test]
    fn test_reject_only_fails_on_different_values() {
        let mut record = Record::new();
        record.insert("a", "1", CollisionPolicy::Reject, 5).unwrap();
        record.insert("a", "1", CollisionPolicy::Reject, 5).unwrap();
        assert_eq!(record.len(), 1);

        let err = record.insert("a", "2", CollisionPolicy::Reject, 5).unwrap_err();
        assert!(matches!(err, KilnError::FieldNameCollision { ref field, row: 5 } if field == "a"));
        assert_eq!(record.get("a"), Some("1"));
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let record: Record = vec![
            ("z".to_string(), "1".to_string()),
            ("a".to_string(), "2".to_string()),
        ]
        .into_iter()
        .collect();

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, json!({"z": "1", "a": "2"}));
        assert_eq!(serde_json::to_string(&record).unwrap(), r#"{"z":"1","a":"2"}"#);

        let policy: CollisionPolicy = serde_json::from_value(json!("reject")).unwrap();
        assert_eq!(policy, CollisionPolicy::Reject);
    }
}
