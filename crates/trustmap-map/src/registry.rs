//! Map registry
//!
//! Maps live in an arena of generational slots. A [`MapId`] names a slot
//! and the generation it was issued for, so an id kept after
//! [`MapRegistry::release`] can never reach a map registered later in the
//! same slot.

use std::collections::HashMap;
use std::sync::Arc;

use trustmap_core::{Backend, MapKind, RadixBackend};

use crate::config::{MapDefinition, MapSourceConfig, MapsConfig};
use crate::error::{MapError, Result};
use crate::handle::{MapCallback, MapHandle};
use crate::ingest::Ingestion;
use crate::source::SourceMeta;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MapId {
    index: u32,
    generation: u32,
}

struct Entry {
    name: Option<String>,
    handle: Arc<MapHandle>,
    /// `None` for embedded maps
    ingestion: Option<Ingestion>,
}

#[derive(Default)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

#[derive(Default)]
pub struct MapRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    names: HashMap<String, MapId>,
}

impl MapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry holding every map in `config`.
    ///
    /// Fails on the first invalid definition.
    pub fn from_config(config: &MapsConfig) -> Result<Self> {
        let mut registry = Self::new();
        for def in &config.maps {
            registry.add_definition(def)?;
        }
        tracing::info!(maps = registry.len(), "Map registry loaded");
        Ok(registry)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_config(&MapsConfig::from_json(json)?)
    }

    /// Register a map fed from `line`.
    ///
    /// Returns `None` when the line is not a usable source; nothing is
    /// registered in that case.
    pub fn register_source(
        &mut self,
        kind: MapKind,
        line: &str,
        description: Option<&str>,
    ) -> Option<MapId> {
        let handle = source_handle(kind, line, description)?;
        Some(self.insert(handle))
    }

    pub fn add_radix_map(&mut self, line: &str, description: Option<&str>) -> Option<MapId> {
        self.register_source(MapKind::Radix, line, description)
    }

    pub fn add_set_map(&mut self, line: &str, description: Option<&str>) -> Option<MapId> {
        self.register_source(MapKind::Set, line, description)
    }

    pub fn add_kv_map(&mut self, line: &str, description: Option<&str>) -> Option<MapId> {
        self.register_source(MapKind::KeyValue, line, description)
    }

    /// Register a callback map, optionally with its handler already set
    pub fn add_callback_map(
        &mut self,
        line: &str,
        description: Option<&str>,
        callback: Option<MapCallback>,
    ) -> Option<MapId> {
        let handle = source_handle(MapKind::Callback, line, description)?;
        if let Some(callback) = callback {
            if let Err(e) = handle.set_callback(callback) {
                tracing::warn!(line, error = %e, "Cannot set map callback, map not registered");
                return None;
            }
        }
        Some(self.insert(handle))
    }

    /// Register a radix map populated once from an inline network list
    pub fn add_embedded_radix(&mut self, list: &str, description: Option<&str>) -> Result<MapId> {
        let backend = RadixBackend::build(list.as_bytes()).map_err(MapError::Build)?;
        tracing::debug!(entries = backend.len(), "Embedded radix map built");
        let handle = MapHandle::embedded(Backend::Radix(backend), description.map(str::to_string));
        Ok(self.insert(handle))
    }

    pub fn get(&self, id: MapId) -> Result<&Arc<MapHandle>> {
        self.entry(id).map(|entry| &entry.handle)
    }

    /// Update state of a fetchable map
    pub fn ingestion_mut(&mut self, id: MapId) -> Result<&mut Ingestion> {
        let entry = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_mut())
            .ok_or(MapError::UnknownMap)?;
        entry.ingestion.as_mut().ok_or(MapError::EmbeddedMap)
    }

    /// Id of a map registered by name from configuration
    pub fn find(&self, name: &str) -> Option<MapId> {
        self.names.get(name).copied()
    }

    pub fn name(&self, id: MapId) -> Option<&str> {
        self.entry(id).ok().and_then(|entry| entry.name.as_deref())
    }

    /// Remove a map. Handles already cloned out stay usable; the id does not.
    pub fn release(&mut self, id: MapId) -> bool {
        let Some(slot) = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
        else {
            return false;
        };
        let Some(entry) = slot.entry.take() else {
            return false;
        };

        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        if let Some(name) = &entry.name {
            self.names.remove(name);
        }
        tracing::debug!(map = %entry.handle, "Map released");
        true
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> impl Iterator<Item = MapId> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.entry.as_ref().map(|_| MapId {
                index: index as u32,
                generation: slot.generation,
            })
        })
    }

    fn add_definition(&mut self, def: &MapDefinition) -> Result<MapId> {
        if self.names.contains_key(&def.name) {
            return Err(MapError::Config(format!("duplicate map name '{}'", def.name)));
        }

        let id = match &def.source {
            MapSourceConfig::Embedded(list) => {
                if def.kind != MapKind::Radix {
                    return Err(MapError::Config(format!(
                        "map '{}': embedded content is only supported for radix maps",
                        def.name
                    )));
                }
                if def.signed || def.trusted_key.is_some() {
                    return Err(MapError::EmbeddedMap);
                }
                self.add_embedded_radix(list, def.description.as_deref())?
            }
            MapSourceConfig::Uri(uri) => {
                let line = if def.signed && !uri.trim_start().starts_with("sign+") {
                    format!("sign+{}", uri.trim_start())
                } else {
                    uri.clone()
                };
                let id = self
                    .register_source(def.kind, &line, def.description.as_deref())
                    .ok_or_else(|| {
                        MapError::Config(format!("map '{}': invalid source '{uri}'", def.name))
                    })?;
                if let Some(key) = &def.trusted_key {
                    if let Err(e) = self.get(id).and_then(|handle| handle.set_trusted_key(key)) {
                        self.release(id);
                        return Err(e);
                    }
                }
                id
            }
        };

        self.names.insert(def.name.clone(), id);
        if let Some(slot) = self.slots.get_mut(id.index as usize) {
            if let Some(entry) = slot.entry.as_mut() {
                entry.name = Some(def.name.clone());
            }
        }
        Ok(id)
    }

    fn entry(&self, id: MapId) -> Result<&Entry> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
            .ok_or(MapError::UnknownMap)
    }

    fn insert(&mut self, handle: MapHandle) -> MapId {
        let handle = Arc::new(handle);
        let ingestion = (!handle.is_embedded()).then(|| Ingestion::new(Arc::clone(&handle)));
        tracing::debug!(map = %handle, "Map registered");

        let entry = Entry {
            name: None,
            handle,
            ingestion,
        };

        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entry = Some(entry);
                MapId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                MapId {
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        }
    }
}

impl std::fmt::Debug for MapRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapRegistry")
            .field("maps", &self.len())
            .field("named", &self.names.len())
            .finish()
    }
}

fn source_handle(kind: MapKind, line: &str, description: Option<&str>) -> Option<MapHandle> {
    let Some(source) = SourceMeta::parse(line) else {
        tracing::warn!(%kind, line, "Invalid map source, map not registered");
        return None;
    };
    Some(MapHandle::with_source(
        kind,
        source,
        description.map(str::to_string),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_keys::test_key;
    use std::net::IpAddr;

    #[test]
    fn test_add_and_get() {
        let mut registry = MapRegistry::new();
        let id = registry.add_set_map("/tmp/hosts.map", Some("hosts")).unwrap();

        let handle = registry.get(id).unwrap();
        assert_eq!(handle.kind(), MapKind::Set);
        assert_eq!(handle.description(), Some("hosts"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_invalid_source_registers_nothing() {
        let mut registry = MapRegistry::new();
        assert!(registry.add_radix_map("", None).is_none());
        assert!(registry.add_kv_map("gopher://old.example/map", None).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_release_invalidates_id() {
        let mut registry = MapRegistry::new();
        let first = registry.add_set_map("/tmp/a.map", None).unwrap();
        let handle = Arc::clone(registry.get(first).unwrap());

        assert!(registry.release(first));
        assert!(!registry.release(first));
        assert!(matches!(registry.get(first), Err(MapError::UnknownMap)));

        let second = registry.add_set_map("/tmp/b.map", None).unwrap();
        assert_ne!(first, second);
        assert!(registry.get(first).is_err());
        assert_eq!(registry.get(second).unwrap().uri(), "/tmp/b.map");

        // handles cloned out before release stay usable
        assert_eq!(handle.uri(), "/tmp/a.map");
    }

    #[test]
    fn test_embedded_has_no_ingestion() {
        let mut registry = MapRegistry::new();
        let id = registry.add_embedded_radix("127.0.0.0/8, ::1", None).unwrap();
        assert!(matches!(registry.ingestion_mut(id), Err(MapError::EmbeddedMap)));

        let loopback: IpAddr = "127.0.0.1".parse().unwrap();
        assert!(registry.get(id).unwrap().get(loopback).unwrap().is_found());
    }

    #[test]
    fn test_embedded_invalid_list_rejected() {
        let mut registry = MapRegistry::new();
        assert!(matches!(
            registry.add_embedded_radix("10.0.0.0/40", None),
            Err(MapError::Build(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_callback_map_with_handler() {
        let mut registry = MapRegistry::new();
        let id = registry
            .add_callback_map("/tmp/raw.map", None, Some(MapCallback::new(|_, _| {})))
            .unwrap();
        assert!(registry.get(id).unwrap().has_callback());

        let bare = registry.add_callback_map("/tmp/raw2.map", None, None).unwrap();
        assert!(!registry.get(bare).unwrap().has_callback());

        let invalid =
            registry.add_callback_map("ftp://raw.map", None, Some(MapCallback::new(|_, _| {})));
        assert!(invalid.is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_ingestion_feeds_handle() {
        let mut registry = MapRegistry::new();
        let id = registry.add_kv_map("/tmp/kv.map", None).unwrap();

        let ing = registry.ingestion_mut(id).unwrap();
        ing.on_chunk(b"alpha beta\n");
        ing.on_finalize().unwrap();

        let value = registry.get(id).unwrap().get("alpha").unwrap();
        assert_eq!(value.as_str(), Some("beta"));
    }

    #[test]
    fn test_from_json() {
        let key = test_key().public_key().unwrap().to_base32().to_string();
        let json = format!(
            r#"{{"maps":[
                {{"name":"nets","kind":"radix","source":{{"uri":"/tmp/nets.map"}},"signed":true,"trusted_key":"{key}"}},
                {{"name":"local","kind":"radix","source":{{"embedded":"10.0.0.0/8"}}}},
                {{"name":"hosts","kind":"set","source":{{"uri":"file:///tmp/hosts.map"}},"description":"blocked hosts"}}
            ]}}"#
        );
        let registry = MapRegistry::from_json(&json).unwrap();
        assert_eq!(registry.len(), 3);

        let nets = registry.get(registry.find("nets").unwrap()).unwrap();
        assert!(nets.is_signed());
        assert_eq!(nets.trusted_key().as_deref(), Some(key.as_str()));
        assert_eq!(nets.uri(), "/tmp/nets.map");

        let local = registry.find("local").unwrap();
        assert_eq!(registry.get(local).unwrap().protocol(), "embedded");
        assert_eq!(registry.name(local), Some("local"));
        assert!(registry.find("missing").is_none());
    }

    #[test]
    fn test_from_json_rejects_bad_definitions() {
        let embedded_set = r#"{"maps":[{"name":"x","kind":"set","source":{"embedded":"a.example"}}]}"#;
        assert!(matches!(MapRegistry::from_json(embedded_set), Err(MapError::Config(_))));

        let duplicate = r#"{"maps":[
            {"name":"x","kind":"set","source":{"uri":"/tmp/a"}},
            {"name":"x","kind":"set","source":{"uri":"/tmp/b"}}
        ]}"#;
        assert!(matches!(MapRegistry::from_json(duplicate), Err(MapError::Config(_))));

        let bad_key = r#"{"maps":[{"name":"x","kind":"radix","source":{"uri":"/tmp/a"},"trusted_key":"!!"}]}"#;
        assert!(matches!(MapRegistry::from_json(bad_key), Err(MapError::InvalidKey(_))));

        let bad_uri = r#"{"maps":[{"name":"x","kind":"kv","source":{"uri":"ftp://h/m"}}]}"#;
        assert!(matches!(MapRegistry::from_json(bad_uri), Err(MapError::Config(_))));
    }
}
