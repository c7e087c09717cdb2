//! Stateful parser for the dictionary block of an event log

use crate::dictionary::{DatabaseId, DictionarySnapshot};
use crate::logging::Timer;
use crate::parser::record::{RecordType, dictionary_entry, session_value_entry};

/// What the previous line announced about the current one
///
/// This is the parser's only state across lines. It is replaced exactly once
/// per line, after both dispatches for that line have run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Lookback {
    #[default]
    Nothing,
    /// Previous line was a code 10 header; this line carries the value
    SessionValue,
    /// Previous line was code 11; bind payload is not decoded yet
    UserSessionBind,
    /// Previous line was code 12; bind payload is not decoded yet
    ComputerSessionBind,
}

impl From<RecordType> for Lookback {
    fn from(record_type: RecordType) -> Self {
        match record_type {
            RecordType::SessionValueHeader => Lookback::SessionValue,
            RecordType::UserSessionBind => Lookback::UserSessionBind,
            RecordType::ComputerSessionBind => Lookback::ComputerSessionBind,
            _ => Lookback::Nothing,
        }
    }
}

/// Counters for one parser run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub lines: usize,
    pub entries: usize,
    pub session_values: usize,
    pub skipped: usize,
    pub unknown: usize,
}

/// Turns the lines of one dictionary block into a [`DictionarySnapshot`]
#[derive(Debug, Default)]
pub struct MetadataParser {
    lookback: Lookback,
    snapshot: DictionarySnapshot,
    stats: ParseStats,
}

impl MetadataParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookback(&self) -> Lookback {
        self.lookback
    }

    pub fn stats(&self) -> &ParseStats {
        &self.stats
    }

    /// Process one line; never fails
    pub fn feed_line(&mut self, line: &str) {
        let line = line.trim_end_matches(['\r', '\n']);
        self.stats.lines += 1;

        let record_type = RecordType::classify(line);
        self.dispatch(record_type, line);
        self.dispatch_lookback(line);
        self.lookback = Lookback::from(record_type);
    }

    fn dispatch(&mut self, record_type: RecordType, line: &str) {
        match record_type {
            RecordType::Dictionary(kind) => match dictionary_entry(kind, line) {
                Some((id, name)) => {
                    self.snapshot.get_mut(kind).insert(id, name);
                    self.stats.entries += 1;
                }
                None => self.stats.skipped += 1,
            },
            RecordType::SessionValueHeader
            | RecordType::UserSessionBind
            | RecordType::ComputerSessionBind
            | RecordType::ComputerUserBind => {}
            RecordType::Other(code) => {
                self.stats.unknown += 1;
                tracing::warn!(code = code, "Unknown record type");
            }
            RecordType::Unknown => {
                self.stats.unknown += 1;
                tracing::debug!(line = self.stats.lines, "Line without record type");
            }
        }
    }

    fn dispatch_lookback(&mut self, line: &str) {
        match self.lookback {
            Lookback::SessionValue => {
                if let Some(entry) = session_value_entry(line) {
                    self.snapshot
                        .insert_session_value(entry.param_id, entry.value_id, entry.value);
                    self.stats.session_values += 1;
                }
            }
            // TODO: decode login binds once a sample with more than one server is available
            Lookback::UserSessionBind | Lookback::ComputerSessionBind => {}
            Lookback::Nothing => {}
        }
    }

    pub fn finish(self) -> (DictionarySnapshot, ParseStats) {
        (self.snapshot, self.stats)
    }
}

/// Parse a whole dictionary block for one database
pub fn parse_block(database: &DatabaseId, text: &str) -> DictionarySnapshot {
    let _timer = Timer::new("parse_block", database.as_str());
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut parser = MetadataParser::new();
    for line in text.lines() {
        parser.feed_line(line);
    }

    let (snapshot, stats) = parser.finish();
    tracing::debug!(
        database = %database,
        lines = stats.lines,
        entries = stats.entries,
        session_values = stats.session_values,
        skipped = stats.skipped,
        unknown = stats.unknown,
        "Parsed dictionary block"
    );
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> DictionarySnapshot {
        parse_block(&DatabaseId::new("DB1"), text)
    }

    #[test]
    fn test_parse_users_and_computers() {
        let snapshot = parse("{1,010,\"Administrator\",12},\n{2,\"WKSTN01\",5},\n");

        assert_eq!(snapshot.user.get("12").map(String::as_str), Some("Administrator"));
        assert_eq!(snapshot.computer.get("5").map(String::as_str), Some("WKSTN01"));
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_parse_every_flat_kind() {
        let text = r#"1CV8LOG(ver 2.0)
a1b2c3d4-0000-0000-0000-000000000000

{1,u1,"Administrator",1},
{2,"WKSTN01",1},
{3,"1CV8C",1},
{4,"_$Session$_.Start",1},
{5,m1,"Document.Invoice",1},
{6,"srv-1c",1},
{7,1541,1},
{8,1560,1},
{9,p1,"Lang",1},
"#;
        let snapshot = parse(text);

        assert_eq!(snapshot.user["1"], "Administrator");
        assert_eq!(snapshot.computer["1"], "WKSTN01");
        assert_eq!(snapshot.application["1"], "1CV8C");
        assert_eq!(snapshot.event["1"], "_$Session$_.Start");
        assert_eq!(snapshot.metadata["1"], "Document.Invoice");
        assert_eq!(snapshot.server["1"], "srv-1c");
        assert_eq!(snapshot.primary_port["1"], "1541");
        assert_eq!(snapshot.secondary_port["1"], "1560");
        assert_eq!(snapshot.session_parameter["1"], "Lang");
    }

    #[test]
    fn test_unknown_record_type_does_not_stop_parsing() {
        let snapshot = parse("{99,whatever},\n{2,\"WKSTN01\",5},\n{1,u,\"Admin\",3},");

        assert_eq!(snapshot.computer["5"], "WKSTN01");
        assert_eq!(snapshot.user["3"], "Admin");
    }

    #[test]
    fn test_garbled_lines_are_skipped() {
        let mut parser = MetadataParser::new();
        parser.feed_line("{2,\"WKSTN01");
        parser.feed_line("{7,abc,1},");
        parser.feed_line("{3,\"1CV8C\",2},");

        let (snapshot, stats) = parser.finish();
        assert!(snapshot.computer.is_empty());
        assert!(snapshot.primary_port.is_empty());
        assert_eq!(snapshot.application["2"], "1CV8C");
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_session_value_on_line_after_header() {
        let snapshot = parse("{9,p,\"Lang\",10},\n{10,\n{\"S\",\"en\"},10,100},\n");

        let value = snapshot.session_value("10", "100").unwrap();
        assert_eq!(value.value_type, "S");
        assert_eq!(value.value, "en");
    }

    #[test]
    fn test_session_value_requires_header_on_previous_line() {
        let snapshot = parse("{10,\n{2,\"WKSTN01\",5},\n{\"S\",\"en\"},10,100},\n");

        assert!(snapshot.session_parameters.is_empty());
        assert_eq!(snapshot.computer["5"], "WKSTN01");
    }

    #[test]
    fn test_lookback_advances_once_per_line() {
        let mut parser = MetadataParser::new();
        assert_eq!(parser.lookback(), Lookback::Nothing);

        parser.feed_line("{10,");
        assert_eq!(parser.lookback(), Lookback::SessionValue);

        parser.feed_line("{\"S\",\"en\"},10,100},");
        assert_eq!(parser.lookback(), Lookback::Nothing);

        parser.feed_line("{11,1,2},");
        assert_eq!(parser.lookback(), Lookback::UserSessionBind);

        parser.feed_line("{12,1,2},");
        assert_eq!(parser.lookback(), Lookback::ComputerSessionBind);

        parser.feed_line("{13,1,2},");
        assert_eq!(parser.lookback(), Lookback::Nothing);

        assert_eq!(parser.stats().session_values, 1);
    }

    #[test]
    fn test_header_line_followed_by_header_line() {
        let mut parser = MetadataParser::new();
        parser.feed_line("{10,");
        parser.feed_line("{10,");
        parser.feed_line("{\"B\",1},4,1},");

        let (snapshot, _) = parser.finish();
        assert_eq!(snapshot.session_value("4", "1").unwrap().value_type, "B");
    }

    #[test]
    fn test_empty_block_yields_empty_snapshot() {
        assert!(parse("").is_empty());
        assert!(parse("\n\n\r\n").is_empty());
    }

    #[test]
    fn test_crlf_and_bom_are_stripped() {
        let snapshot = parse("\u{feff}{2,\"WKSTN01\",5},\r\n{3,\"1CV8\",1}\r\n");

        assert_eq!(snapshot.computer["5"], "WKSTN01");
        assert_eq!(snapshot.application["1"], "1CV8");
    }

    #[test]
    fn test_later_entry_overwrites_earlier_id() {
        let snapshot = parse("{2,\"OLD\",5},\n{2,\"NEW\",5},");
        assert_eq!(snapshot.computer["5"], "NEW");
        assert_eq!(snapshot.computer.len(), 1);
    }
}
