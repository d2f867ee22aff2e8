//! trustmap: trusted, dynamically updatable lookup maps
//!
//! Re-exports the workspace crates under one name:
//!
//! - [`core`]: backends (radix trie, host set, key/value) and list parsers
//! - [`sign`]: RSA keys, detached signatures, file signing
//! - [`map`]: handles, ingestion, registry, configuration and file loading
//!
//! ```no_run
//! use trustmap::{FileLoader, MapRegistry};
//!
//! # fn main() -> trustmap::Result<()> {
//! let mut registry = MapRegistry::new();
//! let id = registry.add_set_map("/etc/maps/hosts.map", Some("blocked hosts")).unwrap();
//!
//! FileLoader::new().load(registry.ingestion_mut(id)?)?;
//! let blocked = registry.get(id)?.get("spam.example")?.is_found();
//! # Ok(())
//! # }
//! ```

pub use trustmap_core as core;
pub use trustmap_map as map;
pub use trustmap_sign as sign;

pub use trustmap_core::{Backend, LookupKey, MapKind, MapValue, Network};
pub use trustmap_map::{
    FileLoader, IngestState, Ingestion, MapCallback, MapError, MapHandle, MapId, MapRegistry,
    MapsConfig, Protocol, Result, UpdateOutcome,
};
pub use trustmap_sign::{PrivateKey, PublicKey, Signature};
