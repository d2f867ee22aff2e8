//! Signing error types

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid key material: {0}")]
    KeyParse(String),

    #[error("Invalid key encoding: {0}")]
    Encoding(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Signature file already exists: {}", .0.display())]
    SignatureExists(PathBuf),
}

impl SignError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        SignError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Short code for diagnostics
    pub fn code(&self) -> &'static str {
        match self {
            SignError::Io { .. } => "IO_ERROR",
            SignError::KeyParse(_) => "KEY_PARSE",
            SignError::Encoding(_) => "KEY_ENCODING",
            SignError::Signing(_) => "SIGNING_FAILED",
            SignError::SignatureExists(_) => "SIGNATURE_EXISTS",
        }
    }
}

pub type Result<T> = std::result::Result<T, SignError>;
