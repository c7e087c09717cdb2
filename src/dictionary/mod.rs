//! Reference dictionaries for one infobase
//!
//! Nine flat id → name dictionaries, one nested session parameter value
//! dictionary, and the global database name map.

mod types;

pub use types::{
    DATABASE_NAMES, DatabaseId, DatabaseNames, DictionaryKind, DictionarySnapshot,
    SESSION_PARAMETER_VALUES, SessionParameterValue, SessionParameterValues, SimpleDictionary,
};
