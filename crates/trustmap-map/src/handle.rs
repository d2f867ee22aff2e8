//! The map handle: what users hold and query
//!
//! A handle owns the active backend behind an [`ArcSwap`]. Lookups load the
//! current snapshot and never block; an update builds a fresh backend off to
//! the side and publishes it with a single swap, so a reader sees either the
//! old content or the new content and nothing in between.

use std::fmt;
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use trustmap_core::{Backend, LookupKey, MapKind, MapValue};
use trustmap_sign::PublicKey;

use crate::error::{MapError, Result};
use crate::source::SourceMeta;

/// Protocol and URI reported for embedded maps
pub const EMBEDDED: &str = "embedded";

/// Handler receiving the raw content of a callback map update
pub struct MapCallback {
    f: Box<dyn Fn(Arc<[u8]>, &MapHandle) + Send + Sync>,
}

impl MapCallback {
    pub fn new(f: impl Fn(Arc<[u8]>, &MapHandle) + Send + Sync + 'static) -> Self {
        Self { f: Box::new(f) }
    }

    pub(crate) fn call(&self, data: Arc<[u8]>, handle: &MapHandle) {
        (self.f)(data, handle)
    }
}

impl fmt::Debug for MapCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MapCallback(..)")
    }
}

pub struct MapHandle {
    kind: MapKind,
    description: Option<String>,
    backend: ArcSwap<Backend>,
    callback: ArcSwapOption<MapCallback>,
    source: Option<SourceMeta>,
}

impl MapHandle {
    /// A map populated once from inline content, never updated
    pub fn embedded(backend: Backend, description: Option<String>) -> Self {
        Self {
            kind: backend.kind(),
            description,
            backend: ArcSwap::from_pointee(backend),
            callback: ArcSwapOption::empty(),
            source: None,
        }
    }

    /// A map fed by update cycles from `source`, empty until the first one lands
    pub fn with_source(kind: MapKind, source: SourceMeta, description: Option<String>) -> Self {
        Self {
            kind,
            description,
            backend: ArcSwap::from_pointee(Backend::empty(kind)),
            callback: ArcSwapOption::empty(),
            source: Some(source),
        }
    }

    pub fn kind(&self) -> MapKind {
        self.kind
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn source(&self) -> Option<&SourceMeta> {
        self.source.as_ref()
    }

    pub fn is_embedded(&self) -> bool {
        self.source.is_none()
    }

    /// Look up a key in the current backend.
    ///
    /// Radix maps take addresses, host-order IPv4 integers, address strings
    /// or raw address bytes. Set and kv maps take strings only.
    pub fn get<'k>(&self, key: impl Into<LookupKey<'k>>) -> Result<MapValue> {
        self.backend.load().lookup(key.into()).map_err(MapError::from)
    }

    /// The backend that lookups currently see
    pub fn snapshot(&self) -> Arc<Backend> {
        self.backend.load_full()
    }

    /// Entries in the current backend
    pub fn len(&self) -> usize {
        self.backend.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_signed(&self) -> bool {
        self.source.as_ref().is_some_and(SourceMeta::is_signed)
    }

    /// `"file"`, `"http"` or `"embedded"`
    pub fn protocol(&self) -> &'static str {
        match &self.source {
            Some(source) => source.protocol().as_str(),
            None => EMBEDDED,
        }
    }

    /// Source URI, or `"embedded"`
    pub fn uri(&self) -> &str {
        match &self.source {
            Some(source) => source.uri(),
            None => EMBEDDED,
        }
    }

    /// Base32 form of the trusted key, if one is set
    pub fn trusted_key(&self) -> Option<String> {
        self.trusted_public_key()
            .map(|key| key.to_base32().to_string())
    }

    pub fn trusted_public_key(&self) -> Option<Arc<PublicKey>> {
        self.source.as_ref().and_then(SourceMeta::trusted_key)
    }

    /// Decode a base32 public key and make it the map's trust anchor.
    ///
    /// On any error the previous key stays in place.
    pub fn set_trusted_key(&self, encoded: &str) -> Result<()> {
        let source = self.source.as_ref().ok_or(MapError::EmbeddedMap)?;
        let key = PublicKey::from_base32(encoded).map_err(|e| MapError::InvalidKey(e.to_string()))?;

        let replaced = source.set_trusted_key(key).is_some();
        tracing::info!(map = %self.uri(), replaced, "Trusted key set");
        Ok(())
    }

    /// Register the handler for a callback map, replacing any earlier one
    pub fn set_callback(&self, callback: MapCallback) -> Result<()> {
        if self.kind != MapKind::Callback {
            return Err(MapError::NotCallbackMap(self.kind));
        }
        self.callback.store(Some(Arc::new(callback)));
        tracing::debug!(map = %self.uri(), "Callback handler registered");
        Ok(())
    }

    pub fn callback(&self) -> Option<Arc<MapCallback>> {
        self.callback.load_full()
    }

    pub fn has_callback(&self) -> bool {
        self.callback.load().is_some()
    }

    /// Publish a new backend, returning the one it replaces
    pub(crate) fn install(&self, backend: Backend) -> Arc<Backend> {
        debug_assert_eq!(backend.kind(), self.kind);
        self.backend.swap(Arc::new(backend))
    }
}

impl fmt::Display for MapHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} map {}", self.kind, self.uri())
    }
}

impl fmt::Debug for MapHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapHandle")
            .field("kind", &self.kind)
            .field("description", &self.description)
            .field("entries", &self.len())
            .field("source", &self.source)
            .finish()
    }
}
