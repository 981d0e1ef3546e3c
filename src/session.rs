//! Session record and session handle

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::id::SessionId;

/// Arbitrary application session state
///
/// Serialized as a plain JSON object. Keys are kept ordered so the stored
/// encoding of a given record is always the same.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionRecord {
    data: BTreeMap<String, Value>,
}

impl SessionRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value from the record
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Get the raw JSON value for a key
    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Set a value in the record
    ///
    /// Values that cannot be represented as JSON are ignored.
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) {
        match serde_json::to_value(value) {
            Ok(v) => {
                self.data.insert(key.to_string(), v);
            }
            Err(e) => tracing::warn!(key, error = %e, "Dropping non-JSON session value"),
        }
    }

    /// Remove a value from the record
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// Check if a key exists
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }
}

impl From<serde_json::Map<String, Value>> for SessionRecord {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        Self {
            data: map.into_iter().collect(),
        }
    }
}

impl FromIterator<(String, Value)> for SessionRecord {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().collect(),
        }
    }
}

/// A session: an identifier bound to its record
///
/// Tracks whether the identifier was minted during this request and whether
/// the record changed since it was loaded.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    record: SessionRecord,
    is_new: bool,
    modified: bool,
}

impl Session {
    /// A freshly minted session with an empty record
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            record: SessionRecord::new(),
            is_new: true,
            modified: false,
        }
    }

    /// A session loaded (or assumed) under an existing identifier
    pub fn existing(id: SessionId, record: SessionRecord) -> Self {
        Self {
            id,
            record,
            is_new: false,
            modified: false,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    /// Mutable access to the record; marks the session modified
    pub fn record_mut(&mut self) -> &mut SessionRecord {
        self.modified = true;
        &mut self.record
    }

    /// Check if the identifier was minted for this session
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Check if the record has been modified
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.record.get(key)
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: T) {
        self.record_mut().set(key, value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let result = self.record.remove(key);
        if result.is_some() {
            self.modified = true;
        }
        result
    }

    /// Clear all session data
    pub fn clear(&mut self) {
        self.record_mut().clear();
    }

    /// Move the record under a new identifier
    pub(crate) fn rebind(self, id: SessionId) -> Self {
        Self {
            id,
            record: self.record,
            is_new: true,
            modified: true,
        }
    }

    /// Split into identifier and record
    pub fn into_parts(self) -> (SessionId, SessionRecord) {
        (self.id, self.record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_get_set() {
        let mut record = SessionRecord::new();
        record.set("user", "alice");
        record.set("cart", vec![1, 2, 3]);

        assert_eq!(record.get::<String>("user"), Some("alice".to_string()));
        assert_eq!(record.get::<Vec<i32>>("cart"), Some(vec![1, 2, 3]));
        assert_eq!(record.get::<i32>("user"), None);
        assert!(record.contains("cart"));
        assert_eq!(record.len(), 2);

        record.remove("cart");
        assert!(!record.contains("cart"));
    }

    #[test]
    fn test_record_serializes_as_object() {
        let mut record = SessionRecord::new();
        record.set("b", 2);
        record.set("a", 1);

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"a":1,"b":2}"#);

        let parsed: SessionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_record_iterates_in_key_order() {
        let record: SessionRecord = [
            ("uid".to_string(), json!(7)),
            ("csrf".to_string(), json!("token")),
        ]
        .into_iter()
        .collect();

        let keys: Vec<&str> = record.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["csrf", "uid"]);
        assert_eq!(record.get_value("uid"), Some(&json!(7)));
    }

    #[test]
    fn test_record_rejects_non_object() {
        assert!(serde_json::from_str::<SessionRecord>("[1, 2]").is_err());
        assert!(serde_json::from_str::<SessionRecord>("\"text\"").is_err());
    }

    #[test]
    fn test_session_modified_tracking() {
        let id = SessionId::generate().unwrap();
        let mut session = Session::existing(id, SessionRecord::new());
        assert!(!session.is_new());
        assert!(!session.is_modified());

        assert_eq!(session.remove("missing"), None);
        assert!(!session.is_modified());

        session.set("csrf", json!("token"));
        assert!(session.is_modified());
        assert_eq!(session.get::<String>("csrf"), Some("token".to_string()));
    }

    #[test]
    fn test_into_parts() {
        let id = SessionId::generate().unwrap();
        let session = Session::new(id.clone());
        assert!(session.is_new());

        let (sid, record) = session.into_parts();
        assert_eq!(sid, id);
        assert!(record.is_empty());
    }
}
