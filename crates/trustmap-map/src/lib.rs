//! trustmap-map: trusted, dynamically updated maps
//!
//! A map is a [`MapHandle`] over one [`Backend`](trustmap_core::Backend)
//! variant, fed by update cycles through an [`Ingestion`]:
//!
//! ```text
//! chunks + signature --> Ingestion::on_finalize
//!                          |-- trust check (signed maps)
//!                          |-- build backend --> ArcSwap publish --> MapHandle::get
//!                          `-- or hand bytes to the callback handler
//! ```
//!
//! Maps are registered in a [`MapRegistry`], either one by one or from a
//! JSON [`MapsConfig`]. [`FileLoader`] drives one update cycle from a local
//! file and its `.sig` sidecar.
//!
//! Security events (rejected signatures) are logged at error level under
//! the `trustmap::security` target with `security = true`.

mod config;
mod error;
mod handle;
mod ingest;
mod loader;
pub mod metrics;
mod registry;
mod source;
mod trust;

pub use config::{MapDefinition, MapSourceConfig, MapsConfig};
pub use error::{MapError, Result};
pub use handle::{MapCallback, MapHandle, EMBEDDED};
pub use ingest::{IngestState, Ingestion, UpdateOutcome};
pub use loader::{signature_path, FileLoader, DEFAULT_CHUNK_SIZE};
pub use registry::{MapId, MapRegistry};
pub use source::{Protocol, SourceMeta};
pub use trust::{check_update, SECURITY_TARGET};
