//! File-backed update cycles
//!
//! [`FileLoader::load`] runs exactly one update cycle for a file map: the
//! file is streamed into the map's [`Ingestion`] in fixed-size chunks, the
//! `<path>.sig` sidecar is attached for signed maps, and the cycle is
//! finalized. Scheduling repeated loads is up to the caller.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use trustmap_sign::{SignError, Signature, SIGNATURE_EXTENSION};

use crate::error::{MapError, Result};
use crate::ingest::{Ingestion, UpdateOutcome};

pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct FileLoader {
    chunk_size: usize,
}

impl Default for FileLoader {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl FileLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Run one update cycle for the map behind `ingestion`
    pub fn load(&self, ingestion: &mut Ingestion) -> Result<UpdateOutcome> {
        let source = ingestion.handle().source().ok_or(MapError::EmbeddedMap)?;
        let path = source.file_path().ok_or_else(|| {
            MapError::Config(format!("{} is not a file map", source.uri()))
        })?;
        let signature = if source.is_signed() {
            load_sidecar(&signature_path(&path))?
        } else {
            None
        };

        let mut file = File::open(&path)?;
        let mut buf = vec![0u8; self.chunk_size];
        let mut total = 0usize;

        loop {
            match file.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    ingestion.on_chunk(&buf[..n]);
                    total += n;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    ingestion.abort();
                    return Err(e.into());
                }
            }
        }

        if total == 0 {
            // a zero-length file is an empty update, not a missing one
            ingestion.on_chunk(&[]);
        }
        if let Some(signature) = signature {
            ingestion.on_signature(signature);
        }

        tracing::debug!(path = %path.display(), bytes = total, "Map file read");
        ingestion.on_finalize()
    }
}

/// A missing sidecar is not an IO failure: the update goes on unsigned and
/// the trust check rejects it.
fn load_sidecar(path: &Path) -> Result<Option<Signature>> {
    match Signature::load(path) {
        Ok(signature) => Ok(Some(signature)),
        Err(SignError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "Signature file not found");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// `hosts.map` -> `hosts.map.sig`
pub fn signature_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(SIGNATURE_EXTENSION);
    PathBuf::from(name)
}
