//! Streaming ingestion of map updates
//!
//! An update cycle delivers zero or more chunks, optionally a detached
//! signature, then a finalize. Chunks are appended into the current
//! accumulator; finalize checks trust, builds or dispatches, and then keeps
//! the cycle's buffer as the *previous* generation. The previous generation
//! is released at the start of the next finalize, so a callback handler's
//! `Arc<[u8]>` and anything borrowed from the last cycle outlive one full
//! cycle after delivery.
//!
//! ```text
//!   Idle --chunk--> Accumulating --finalize--> Idle
//!                      |   ^
//!                      +---+ chunk / signature
//! ```

use std::sync::Arc;

use trustmap_core::{Backend, MapKind};
use trustmap_sign::Signature;

use crate::error::{MapError, Result};
use crate::handle::MapHandle;
use crate::metrics;
use crate::trust;

/// What a successful finalize did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// A new backend was built and published
    Applied { entries: usize },
    /// The content was handed to the callback handler
    Delivered { bytes: usize },
    /// Callback map without a handler; content discarded
    NoHandler,
    /// Zero-length update; the current backend stays
    Empty,
}

impl UpdateOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            UpdateOutcome::Applied { .. } => "applied",
            UpdateOutcome::Delivered { .. } => "delivered",
            UpdateOutcome::NoHandler => "no_handler",
            UpdateOutcome::Empty => "empty",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestState {
    Idle,
    Accumulating,
}

#[derive(Default)]
struct Accumulator {
    buffer: Vec<u8>,
    frozen: Option<Arc<[u8]>>,
    signature: Option<Signature>,
}

impl Accumulator {
    fn freeze(&mut self) -> Arc<[u8]> {
        let data: Arc<[u8]> = std::mem::take(&mut self.buffer).into();
        self.frozen = Some(Arc::clone(&data));
        data
    }

    fn retained(&self) -> usize {
        self.frozen.as_ref().map_or(self.buffer.len(), |data| data.len())
    }
}

/// Per-map update state driven by a loader
pub struct Ingestion {
    handle: Arc<MapHandle>,
    previous: Option<Accumulator>,
    current: Option<Accumulator>,
    cycles: u64,
}

impl Ingestion {
    pub fn new(handle: Arc<MapHandle>) -> Self {
        Self {
            handle,
            previous: None,
            current: None,
            cycles: 0,
        }
    }

    pub fn handle(&self) -> &Arc<MapHandle> {
        &self.handle
    }

    pub fn state(&self) -> IngestState {
        if self.current.is_some() {
            IngestState::Accumulating
        } else {
            IngestState::Idle
        }
    }

    /// Finalize calls that found an update in progress, whatever their
    /// outcome. Empty and signature-only cycles count; finalize with nothing
    /// received does not.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Bytes held from the last finalized cycle
    pub fn retained_bytes(&self) -> usize {
        self.previous.as_ref().map_or(0, Accumulator::retained)
    }

    /// Append one chunk to the update in progress
    pub fn on_chunk(&mut self, chunk: &[u8]) {
        let current = self.current.get_or_insert_with(|| {
            tracing::trace!(map = %self.handle.uri(), "Update cycle started");
            Accumulator::default()
        });
        current.buffer.extend_from_slice(chunk);
        metrics::record_chunk(self.handle.uri());
    }

    /// Attach the detached signature of the update in progress
    pub fn on_signature(&mut self, signature: Signature) {
        let current = self.current.get_or_insert_with(Accumulator::default);
        current.signature = Some(signature);
    }

    /// Drop the update in progress without touching the backend.
    ///
    /// Returns whether there was anything to drop.
    pub fn abort(&mut self) -> bool {
        match self.current.take() {
            Some(current) => {
                tracing::warn!(
                    map = %self.handle.uri(),
                    bytes = current.buffer.len(),
                    "Update cycle aborted"
                );
                true
            }
            None => false,
        }
    }

    /// Complete the update cycle.
    ///
    /// Errors leave the previously active backend in place.
    pub fn on_finalize(&mut self) -> Result<UpdateOutcome> {
        if let Some(previous) = self.previous.take() {
            tracing::trace!(
                map = %self.handle.uri(),
                bytes = previous.retained(),
                "Released previous update data"
            );
        }

        let Some(mut current) = self.current.take() else {
            tracing::error!(map = %self.handle.uri(), "No data read for map");
            metrics::record_update(self.handle.uri(), "no_data");
            return Err(MapError::NoData {
                map: self.handle.uri().to_string(),
            });
        };

        self.cycles += 1;
        let data = current.freeze();
        let result = self.apply(data, current.signature.as_ref());
        self.previous = Some(current);
        result
    }

    fn apply(&self, data: Arc<[u8]>, signature: Option<&Signature>) -> Result<UpdateOutcome> {
        let map = self.handle.uri();

        if data.is_empty() {
            tracing::debug!(map = %map, "Empty update, keeping current content");
            metrics::record_update(map, UpdateOutcome::Empty.label());
            return Ok(UpdateOutcome::Empty);
        }

        if let Err(e) = trust::check_update(&self.handle, &data, signature) {
            metrics::record_update(map, "verify_failed");
            return Err(e);
        }

        let outcome = match self.handle.kind() {
            MapKind::Callback => match self.handle.callback() {
                Some(callback) => {
                    let bytes = data.len();
                    callback.call(data, &self.handle);
                    tracing::debug!(map = %map, bytes, "Delivered update to callback");
                    UpdateOutcome::Delivered { bytes }
                }
                None => {
                    tracing::error!(map = %map, "Map has no callback set");
                    UpdateOutcome::NoHandler
                }
            },
            kind => match Backend::build(kind, &data) {
                Ok(backend) => {
                    let entries = backend.len();
                    self.handle.install(backend);
                    metrics::record_entries(map, entries);
                    tracing::info!(map = %map, %kind, entries, "Map updated");
                    UpdateOutcome::Applied { entries }
                }
                Err(e) => {
                    tracing::error!(
                        map = %map,
                        error = %e,
                        "Map content rejected, keeping previous content"
                    );
                    metrics::record_update(map, "build_failed");
                    return Err(MapError::Build(e));
                }
            },
        };

        metrics::record_update(map, outcome.label());
        Ok(outcome)
    }
}

impl std::fmt::Debug for Ingestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingestion")
            .field("map", &self.handle.uri())
            .field("state", &self.state())
            .field("cycles", &self.cycles)
            .field("retained_bytes", &self.retained_bytes())
            .finish()
    }
}
