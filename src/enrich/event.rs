//! Event field access

use serde_json::{Map, Value};

/// Field names read and written by the enricher
pub mod fields {
    pub const DATABASE: &str = "Database";
    pub const MESSAGE: &str = "message";
    pub const TIMEZONE: &str = "[event][timezone]";

    pub const USER_ID: &str = "UserId";
    pub const COMPUTER_ID: &str = "ComputerId";
    pub const APPLICATION_ID: &str = "ApplicationId";
    pub const EVENT_ID: &str = "EventId";
    pub const METADATA_ID: &str = "MetadataId";
    pub const WORK_SERVER_ID: &str = "WorkServerId";
    pub const PRIMARY_PORT_ID: &str = "PrimaryPortId";
    pub const SECONDARY_PORT_ID: &str = "SecondaryPortId";
    pub const MORE_METADATA_ARRAY: &str = "MoreMetadataArray";

    pub const USER: &str = "User";
    pub const COMPUTER: &str = "Computer";
    pub const APPLICATION: &str = "Application";
    pub const EVENT: &str = "Event";
    pub const METADATA: &str = "Metadata";
    pub const MORE_METADATA: &str = "MoreMetadata";
    pub const WORK_SERVER: &str = "WorkServer";
    pub const PRIMARY_PORT: &str = "PrimaryPort";
    pub const SECONDARY_PORT: &str = "SecondaryPort";
    pub const TRANSACTION: &str = "Transaction";
    pub const TRANSACTION_START_OFFSET: &str = "TransactionStartOffset";
    pub const SESSION_PARAMETERS: &str = "SessionParameters";
}

/// A field bag owned by the host pipeline
///
/// Field names are either plain (`UserId`) or nested in bracket notation
/// (`[event][timezone]`).
pub trait EventRecord {
    fn get_field(&self, name: &str) -> Option<&Value>;

    /// Set a field; `Value::Null` marks a resolved-but-absent value
    fn set_field(&mut self, name: &str, value: Value);
}

/// Split `[a][b]` into `["a", "b"]`; plain names are a single segment
pub fn field_path(name: &str) -> Vec<&str> {
    if name.starts_with('[') && name.ends_with(']') {
        name[1..name.len() - 1].split("][").collect()
    } else {
        vec![name]
    }
}

impl EventRecord for Map<String, Value> {
    fn get_field(&self, name: &str) -> Option<&Value> {
        let path = field_path(name);
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(self.get(*first)?, |value, segment| value.get(*segment))
    }

    fn set_field(&mut self, name: &str, value: Value) {
        let path = field_path(name);
        let Some((last, parents)) = path.split_last() else {
            return;
        };

        let mut current = self;
        for segment in parents {
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            current = match entry.as_object_mut() {
                Some(object) => object,
                None => return,
            };
        }
        current.insert(last.to_string(), value);
    }
}

/// Text form of a scalar field; numbers become their decimal string
pub fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_field_path() {
        assert_eq!(field_path("UserId"), vec!["UserId"]);
        assert_eq!(field_path("[event][timezone]"), vec!["event", "timezone"]);
        assert_eq!(field_path("[host]"), vec!["host"]);
    }

    #[test]
    fn test_get_nested_field() {
        let e = event(json!({"UserId": "12", "event": {"timezone": "+03:00"}}));

        assert_eq!(e.get_field("UserId"), Some(&json!("12")));
        assert_eq!(e.get_field(fields::TIMEZONE), Some(&json!("+03:00")));
        assert_eq!(e.get_field("[event][missing]"), None);
        assert_eq!(e.get_field("[UserId][x]"), None);
    }

    #[test]
    fn test_set_nested_field_creates_parents() {
        let mut e = event(json!({}));
        e.set_field("[event][timezone]", json!("+05:00"));
        e.set_field("User", Value::Null);

        assert_eq!(e["event"]["timezone"], "+05:00");
        assert!(e.contains_key("User"));
        assert!(e["User"].is_null());
    }

    #[test]
    fn test_field_text() {
        assert_eq!(field_text(&json!("12")), Some("12".to_string()));
        assert_eq!(field_text(&json!(12)), Some("12".to_string()));
        assert_eq!(field_text(&json!(null)), None);
        assert_eq!(field_text(&json!([1])), None);
    }
}
