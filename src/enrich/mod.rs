//! Event enrichment
//!
//! Replaces numeric reference ids with names from the stored dictionaries
//! and decodes the encoded `Transaction`, `TransactionStartOffset` and
//! `SessionParameters` fields.
//!
//! Key behaviour:
//! - `"0"` is "no reference" and resolves to null
//! - Unknown ids pass through unchanged
//! - Unreadable dictionaries are treated as empty

mod decode;
mod enricher;
mod event;

pub use decode::{
    NO_REFERENCE, TRANSACTION_SCALE, UNIX_EPOCH_OFFSET_SECS, decode_offset,
    decode_session_parameters, decode_transaction, parse_hex_or_number, resolve_reference,
    resolve_references,
};
pub use enricher::{Enricher, apply_dictionaries};
pub use event::{EventRecord, field_path, field_text, fields};
