//! Backend build and lookup errors

use thiserror::Error;

use crate::MapKind;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid address on line {line}: {entry}")]
    InvalidAddress { line: usize, entry: String },

    #[error("Invalid prefix length on line {line}: {entry} (max {max})")]
    InvalidPrefix {
        line: usize,
        entry: String,
        max: u8,
    },

    #[error("Map content is not valid UTF-8 at byte {offset}")]
    NotUtf8 { offset: usize },

    #[error("Key of type {key} cannot be looked up in a {kind} map")]
    WrongKeyType { kind: MapKind, key: &'static str },
}

impl Error {
    /// Short code for diagnostics and metrics labels
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidAddress { .. } => "INVALID_ADDRESS",
            Error::InvalidPrefix { .. } => "INVALID_PREFIX",
            Error::NotUtf8 { .. } => "NOT_UTF8",
            Error::WrongKeyType { .. } => "WRONG_KEY_TYPE",
        }
    }

    /// True for errors raised while parsing map content (as opposed to lookups)
    pub fn is_parse_error(&self) -> bool {
        !matches!(self, Error::WrongKeyType { .. })
    }
}
