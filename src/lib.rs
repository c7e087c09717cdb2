pub mod config;
pub mod dictionary;
pub mod enrich;
pub mod error;
pub mod logging;
pub mod parser;
pub mod pipeline;
pub mod storage;
pub mod watch;

pub use error::{OnecMapError, Result};
