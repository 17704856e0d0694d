//! Record model
//!
//! A record is a single document pulled from the source store. Its `kind`
//! determines the destination collection and is fixed when the record is
//! read; routing never re-infers it later (in particular not during retry
//! rounds, where a queue can mix kinds).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable record identity, the upsert key at the destination
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Create a new record id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Destination routing tag, assigned at read time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    User,
    Transaction,
}

impl RecordKind {
    /// All kinds, in the order collections are migrated
    pub const ALL: [RecordKind; 2] = [RecordKind::User, RecordKind::Transaction];

    /// Name of the collection this kind lives in, on both stores
    pub fn collection(&self) -> &'static str {
        match self {
            RecordKind::User => "users",
            RecordKind::Transaction => "transactions",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

/// A single document in flight between stores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Stable identity, the destination upsert key
    pub id: RecordId,
    /// Destination routing tag
    pub kind: RecordKind,
    /// Opaque document body
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl Record {
    /// Create a record with an empty body
    pub fn new(id: impl Into<RecordId>, kind: RecordKind) -> Self {
        Self {
            id: id.into(),
            kind,
            fields: serde_json::Map::new(),
        }
    }

    /// Attach a field to the record body
    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_collection_names() {
        assert_eq!(RecordKind::User.collection(), "users");
        assert_eq!(RecordKind::Transaction.collection(), "transactions");
    }

    #[test]
    fn test_kind_order_is_users_first() {
        assert_eq!(RecordKind::ALL[0], RecordKind::User);
        assert_eq!(RecordKind::ALL[1], RecordKind::Transaction);
    }

    #[test]
    fn test_record_builder() {
        let record = Record::new("u-1", RecordKind::User)
            .with_field("name", json!("Ada"))
            .with_field("balance", json!(12.5));

        assert_eq!(record.id.as_str(), "u-1");
        assert_eq!(record.kind, RecordKind::User);
        assert_eq!(record.fields["name"], json!("Ada"));
        assert_eq!(record.fields["balance"], json!(12.5));
    }

    #[test]
    fn test_record_serde_roundtrip() {
        let record = Record::new("tx-9", RecordKind::Transaction).with_field("amount", json!(100));

        let encoded = serde_json::to_string(&record).unwrap();
        let decoded: Record = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, record);
        assert!(encoded.contains("\"transaction\""));
    }
}
