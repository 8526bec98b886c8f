//! Reads stimulus for, and writes changes produced by, a [`Simulator`] as JSON.
//!
//! Both directions use the same shape, an array of events ordered by time:
//!
//! ```json
//! [{"time": 0, "net": "clk", "value": "0"}, {"time": 5, "net": "clk", "value": "1"}]
//! ```
//!
//! where `value` is one of `"0"`, `"1"`, `"X"` or `"Z"`.
//!
//! [`Simulator`]: gatesim_sim::Simulator

use std::fmt::Display;

mod import;
mod export;

pub use import::import_stimulus;
pub use export::export_changes;

#[derive(Debug)]
pub enum JsonError {
    Io(std::io::Error),
    Syntax(jzon::Error),
    /// The document is valid JSON, but not a list of events.
    Shape { index: Option<usize>, message: &'static str },
    UnknownNet { index: usize, name: String },
    BadValue { index: usize, value: String },
}

impl Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JsonError::Io(error) => write!(f, "I/O error: {error}"),
            JsonError::Syntax(error) => write!(f, "JSON syntax error: {error}"),
            JsonError::Shape { index: None, message } => write!(f, "{message}"),
            JsonError::Shape { index: Some(index), message } => write!(f, "event {index}: {message}"),
            JsonError::UnknownNet { index, name } => write!(f, "event {index}: unknown net {name:?}"),
            JsonError::BadValue { index, value } => write!(f, "event {index}: invalid logic value {value:?}"),
        }
    }
}

impl std::error::Error for JsonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            JsonError::Io(error) => Some(error),
            JsonError::Syntax(error) => Some(error),
            _ => None,
        }
    }
}

impl From<std::io::Error> for JsonError {
    fn from(error: std::io::Error) -> Self {
        JsonError::Io(error)
    }
}

impl From<jzon::Error> for JsonError {
    fn from(error: jzon::Error) -> Self {
        JsonError::Syntax(error)
    }
}
