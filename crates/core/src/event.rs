use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Unique identifier of a decoded log record.
pub type EventId = Uuid;

/// One decoded log record: the unit stored in match histories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: DateTime<Utc>,
    /// Log source the record came from (file path, channel name, ...).
    pub location: String,
    /// Program name extracted by the decoder, when the format carries one.
    pub program: Option<String>,
    pub message: String,
    pub fields: HashMap<String, FieldValue>,
}

impl Event {
    pub fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            location: location.into(),
            program: None,
            message: message.into(),
            fields: HashMap::new(),
        }
    }
}

/// Typed field values extracted by decoders. Source data arrives as strings
/// but type info is preserved where the decoder knows better.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
}

impl FieldValue {
    /// Extract as string, returning None for non-text values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}
