//! Dictionary types extracted from the event log catalog

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque identifier of one monitored infobase
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DatabaseId(pub String);

impl DatabaseId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatabaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference id → name (or description, or port number as a string)
pub type SimpleDictionary = BTreeMap<String, String>;

/// Parameter id → value id → typed value
pub type SessionParameterValues = BTreeMap<String, BTreeMap<String, SessionParameterValue>>;

/// Database id → display name, shared by all databases
pub type DatabaseNames = BTreeMap<String, String>;

/// Storage name of the global database name map
pub const DATABASE_NAMES: &str = "dblist";

/// Storage name of the nested session parameter value dictionary
pub const SESSION_PARAMETER_VALUES: &str = "session-parameters";

/// The nine flat per-database dictionaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DictionaryKind {
    User,
    Computer,
    Application,
    Event,
    Metadata,
    Server,
    PrimaryPort,
    SecondaryPort,
    SessionParameter,
}

impl DictionaryKind {
    pub const ALL: [DictionaryKind; 9] = [
        DictionaryKind::User,
        DictionaryKind::Computer,
        DictionaryKind::Application,
        DictionaryKind::Event,
        DictionaryKind::Metadata,
        DictionaryKind::Server,
        DictionaryKind::PrimaryPort,
        DictionaryKind::SecondaryPort,
        DictionaryKind::SessionParameter,
    ];

    /// Name used in the persisted layout
    pub fn name(&self) -> &'static str {
        match self {
            DictionaryKind::User => "user",
            DictionaryKind::Computer => "computer",
            DictionaryKind::Application => "application",
            DictionaryKind::Event => "event",
            DictionaryKind::Metadata => "metadata",
            DictionaryKind::Server => "server",
            DictionaryKind::PrimaryPort => "primary-port",
            DictionaryKind::SecondaryPort => "secondary-port",
            DictionaryKind::SessionParameter => "session-parameter",
        }
    }
}

impl fmt::Display for DictionaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed session parameter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionParameterValue {
    #[serde(rename = "type")]
    pub value_type: String,
    pub value: String,
}

/// All ten dictionaries produced by one extraction run for one database
///
/// A snapshot fully replaces the previous one for its database. Members are
/// persisted independently, so readers may observe members from two
/// consecutive snapshots but never a partially written member.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DictionarySnapshot {
    pub user: SimpleDictionary,
    pub computer: SimpleDictionary,
    pub application: SimpleDictionary,
    pub event: SimpleDictionary,
    pub metadata: SimpleDictionary,
    pub server: SimpleDictionary,
    pub primary_port: SimpleDictionary,
    pub secondary_port: SimpleDictionary,
    pub session_parameter: SimpleDictionary,
    pub session_parameters: SessionParameterValues,
}

impl DictionarySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: DictionaryKind) -> &SimpleDictionary {
        match kind {
            DictionaryKind::User => &self.user,
            DictionaryKind::Computer => &self.computer,
            DictionaryKind::Application => &self.application,
            DictionaryKind::Event => &self.event,
            DictionaryKind::Metadata => &self.metadata,
            DictionaryKind::Server => &self.server,
            DictionaryKind::PrimaryPort => &self.primary_port,
            DictionaryKind::SecondaryPort => &self.secondary_port,
            DictionaryKind::SessionParameter => &self.session_parameter,
        }
    }

    pub fn get_mut(&mut self, kind: DictionaryKind) -> &mut SimpleDictionary {
        match kind {
            DictionaryKind::User => &mut self.user,
            DictionaryKind::Computer => &mut self.computer,
            DictionaryKind::Application => &mut self.application,
            DictionaryKind::Event => &mut self.event,
            DictionaryKind::Metadata => &mut self.metadata,
            DictionaryKind::Server => &mut self.server,
            DictionaryKind::PrimaryPort => &mut self.primary_port,
            DictionaryKind::SecondaryPort => &mut self.secondary_port,
            DictionaryKind::SessionParameter => &mut self.session_parameter,
        }
    }

    /// Store a typed session parameter value
    pub fn insert_session_value(
        &mut self,
        param_id: impl Into<String>,
        value_id: impl Into<String>,
        value: SessionParameterValue,
    ) {
        self.session_parameters
            .entry(param_id.into())
            .or_default()
            .insert(value_id.into(), value);
    }

    /// Look up a typed session parameter value
    pub fn session_value(&self, param_id: &str, value_id: &str) -> Option<&SessionParameterValue> {
        self.session_parameters
            .get(param_id)
            .and_then(|values| values.get(value_id))
    }

    /// Total number of entries across all dictionaries
    pub fn len(&self) -> usize {
        let simple: usize = DictionaryKind::ALL
            .iter()
            .map(|kind| self.get(*kind).len())
            .sum();
        let nested: usize = self.session_parameters.values().map(|v| v.len()).sum();
        simple + nested
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dictionary_kind_names_are_unique() {
        let mut names: Vec<_> = DictionaryKind::ALL.iter().map(|k| k.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 9);
        assert!(!names.contains(&SESSION_PARAMETER_VALUES));
        assert!(!names.contains(&DATABASE_NAMES));
    }

    #[test]
    fn test_snapshot_get_mut_targets_matching_dictionary() {
        let mut snapshot = DictionarySnapshot::new();
        snapshot
            .get_mut(DictionaryKind::PrimaryPort)
            .insert("1".to_string(), "1560".to_string());

        assert_eq!(snapshot.primary_port.get("1").map(String::as_str), Some("1560"));
        assert!(snapshot.get(DictionaryKind::SecondaryPort).is_empty());
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_session_value_lookup() {
        let mut snapshot = DictionarySnapshot::new();
        snapshot.insert_session_value(
            "10",
            "100",
            SessionParameterValue {
                value_type: "S".to_string(),
                value: "en".to_string(),
            },
        );

        assert_eq!(snapshot.session_value("10", "100").unwrap().value, "en");
        assert!(snapshot.session_value("10", "101").is_none());
        assert!(snapshot.session_value("11", "100").is_none());
        assert!(!snapshot.is_empty());
    }

    #[test]
    fn test_session_value_serializes_type_field() {
        let value = SessionParameterValue {
            value_type: "string".to_string(),
            value: "admin".to_string(),
        };
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["type"], "string");
        assert_eq!(json["value"], "admin");
    }
}
