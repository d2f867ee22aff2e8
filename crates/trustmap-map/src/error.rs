//! Map error types
//!
//! Every error here is scoped to one operation or one update cycle: the
//! operation does not take effect and the previous state stays in place.

use thiserror::Error;
use trustmap_core::MapKind;
use trustmap_sign::SignError;

#[derive(Error, Debug)]
pub enum MapError {
    #[error("Invalid map configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Key or signature error: {0}")]
    Sign(#[from] SignError),

    #[error("Map content rejected: {0}")]
    Build(#[source] trustmap_core::Error),

    #[error("Invalid lookup: {0}")]
    InvalidLookup(#[source] trustmap_core::Error),

    #[error("Signature verification failed for {map}: {reason}")]
    VerificationFailed { map: String, reason: String },

    #[error("No data read for map {map}")]
    NoData { map: String },

    #[error("Cannot set key for embedded maps")]
    EmbeddedMap,

    #[error("Invalid pubkey string: {0}")]
    InvalidKey(String),

    #[error("Not a callback map: {0} map")]
    NotCallbackMap(MapKind),

    #[error("Unknown or released map handle")]
    UnknownMap,
}

impl MapError {
    /// Stable code for diagnostics and metrics labels
    pub fn code(&self) -> &'static str {
        match self {
            MapError::Config(_) => "CONFIG_ERROR",
            MapError::Io(_) => "IO_ERROR",
            MapError::Sign(e) => e.code(),
            MapError::Build(_) => "BUILD_FAILED",
            MapError::InvalidLookup(_) => "INVALID_LOOKUP",
            MapError::VerificationFailed { .. } => "VERIFICATION_FAILED",
            MapError::NoData { .. } => "NO_DATA",
            MapError::EmbeddedMap => "EMBEDDED_MAP",
            MapError::InvalidKey(_) => "INVALID_KEY",
            MapError::NotCallbackMap(_) => "NOT_CALLBACK_MAP",
            MapError::UnknownMap => "UNKNOWN_MAP",
        }
    }

    /// Verification failures are reported as security events, not warnings
    pub fn is_security_event(&self) -> bool {
        matches!(self, MapError::VerificationFailed { .. })
    }
}

impl From<trustmap_core::Error> for MapError {
    fn from(e: trustmap_core::Error) -> Self {
        if e.is_parse_error() {
            MapError::Build(e)
        } else {
            MapError::InvalidLookup(e)
        }
    }
}

pub type Result<T> = std::result::Result<T, MapError>;
