//! Detached signatures
//!
//! On disk a signature is the raw signature bytes, nothing else: no header,
//! no framing, no encoding.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::Path;

use crate::error::{Result, SignError};

/// An immutable detached signature
#[derive(Clone, PartialEq, Eq)]
pub struct Signature {
    bytes: Vec<u8>,
}

impl Signature {
    /// Wrap signature bytes produced elsewhere
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Read a whole signature file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Cannot open signature file");
            SignError::io(path, e)
        })?;
        Ok(Self { bytes })
    }

    /// Write the signature to `path`.
    ///
    /// Without `forced` the file must not exist yet and nothing is written if
    /// it does. With `forced` an existing file is truncated and overwritten.
    pub fn save(&self, path: impl AsRef<Path>, forced: bool) -> Result<()> {
        let path = path.as_ref();

        let mut options = OpenOptions::new();
        options.write(true);
        if forced {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }

        let mut file = match options.open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                tracing::error!(path = %path.display(), "Signature file already exists");
                return Err(SignError::SignatureExists(path.to_path_buf()));
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Cannot create signature file");
                return Err(SignError::io(path, e));
            }
        };

        // write_all resumes after short writes and retries EINTR
        file.write_all(&self.bytes)
            .and_then(|()| file.flush())
            .map_err(|e| {
                tracing::error!(path = %path.display(), error = %e, "Cannot write signature file");
                SignError::io(path, e)
            })?;

        tracing::debug!(path = %path.display(), bytes = self.bytes.len(), forced, "Saved signature");
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head = &self.bytes[..self.bytes.len().min(8)];
        f.debug_struct("Signature")
            .field("len", &self.bytes.len())
            .field("head", &hex::encode(head))
            .finish()
    }
}
