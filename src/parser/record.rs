//! Record type codes and line shapes of the event log catalog

use crate::dictionary::{DictionaryKind, SessionParameterValue};
use regex::Regex;
use std::sync::LazyLock;

static RECORD_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{([0-9]+),").expect("record code pattern"));

/// `{code,<guid>,"name",id}` (users, metadata objects, session parameter names)
static NAMED_RECORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\{([0-9]+),(.*),"(.*)",([0-9]+)\},?$"#).expect("named record pattern")
});

/// `{code,"name",id}` (computers, applications, events, servers)
static QUOTED_RECORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\{([0-9]+),"(.*)",([0-9]+)\},?$"#).expect("quoted record pattern")
});

/// `{code,port,id}` (primary and secondary ports)
static PORT_RECORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\{([0-9]+),([0-9]+),([0-9]+)\},?$").expect("port record pattern")
});

/// `{"type","value"},paramId,valueId}` following a code 10 header line
static SESSION_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\{"(.*)","?(.*?)"?\},([0-9]+),([0-9]+)\},?$"#).expect("session value pattern")
});

/// Catalog record type, keyed by the leading integer of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    /// Codes 1 to 9: a flat id → name entry
    Dictionary(DictionaryKind),
    /// Code 10: header of a session parameter value, payload on the next line
    SessionValueHeader,
    /// Code 11: session parameters bound to a user at login
    UserSessionBind,
    /// Code 12: session parameters bound to a computer at login
    ComputerSessionBind,
    /// Code 13: computer and user bind
    ComputerUserBind,
    /// A code this parser does not know about
    Other(u32),
    /// No leading `{code,` at all
    Unknown,
}

impl RecordType {
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => RecordType::Dictionary(DictionaryKind::User),
            2 => RecordType::Dictionary(DictionaryKind::Computer),
            3 => RecordType::Dictionary(DictionaryKind::Application),
            4 => RecordType::Dictionary(DictionaryKind::Event),
            5 => RecordType::Dictionary(DictionaryKind::Metadata),
            6 => RecordType::Dictionary(DictionaryKind::Server),
            7 => RecordType::Dictionary(DictionaryKind::PrimaryPort),
            8 => RecordType::Dictionary(DictionaryKind::SecondaryPort),
            9 => RecordType::Dictionary(DictionaryKind::SessionParameter),
            10 => RecordType::SessionValueHeader,
            11 => RecordType::UserSessionBind,
            12 => RecordType::ComputerSessionBind,
            13 => RecordType::ComputerUserBind,
            other => RecordType::Other(other),
        }
    }

    /// Classify a line by its leading record code
    pub fn classify(line: &str) -> Self {
        RECORD_CODE
            .captures(line)
            .and_then(|caps| caps[1].parse::<u32>().ok())
            .map(RecordType::from_code)
            .unwrap_or(RecordType::Unknown)
    }
}

/// Extract `(id, name)` from a line of a flat dictionary record
///
/// Returns `None` when the line does not have the exact shape of its kind.
pub fn dictionary_entry(kind: DictionaryKind, line: &str) -> Option<(String, String)> {
    let (pattern, name_group, id_group): (&Regex, usize, usize) = match kind {
        DictionaryKind::User | DictionaryKind::Metadata | DictionaryKind::SessionParameter => {
            (&*NAMED_RECORD, 3, 4)
        }
        DictionaryKind::Computer
        | DictionaryKind::Application
        | DictionaryKind::Event
        | DictionaryKind::Server => (&*QUOTED_RECORD, 2, 3),
        DictionaryKind::PrimaryPort | DictionaryKind::SecondaryPort => (&*PORT_RECORD, 2, 3),
    };

    let caps = pattern.captures(line)?;
    Some((caps[id_group].to_string(), caps[name_group].to_string()))
}

/// A session parameter value payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionValueEntry {
    pub param_id: String,
    pub value_id: String,
    pub value: SessionParameterValue,
}

/// Extract a session parameter value from the line after a code 10 header
///
/// Field order is unverified: the trailing number may turn out to be a
/// server id rather than a value id. They coincide in all observed logs.
pub fn session_value_entry(line: &str) -> Option<SessionValueEntry> {
    let caps = SESSION_VALUE.captures(line)?;
    Some(SessionValueEntry {
        param_id: caps[3].to_string(),
        value_id: caps[4].to_string(),
        value: SessionParameterValue {
            value_type: caps[1].to_string(),
            value: caps[2].to_string(),
        },
    })
}
