//! Dictionary extraction from the catalog block of a 1C event log
//!
//! Every line starts with `{code,` where the code selects the record shape.
//! Session parameter values span two lines: a code 10 header and a payload
//! line, correlated through a one-slot [`Lookback`].

mod block;
mod record;

pub use block::{Lookback, MetadataParser, ParseStats, parse_block};
pub use record::{RecordType, SessionValueEntry, dictionary_entry, session_value_entry};
