//! Update cycles end to end: registry, loader, ingestion and lookups

use std::net::IpAddr;
use std::sync::{Arc, Mutex};

use tempfile::tempdir;
use trustmap::{
    FileLoader, LookupKey, MapCallback, MapError, MapKind, MapRegistry, MapValue, UpdateOutcome,
};

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

#[test]
fn test_radix_map_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nets.map");
    std::fs::write(&path, "# local networks\n10.0.0.0/8, 192.168.0.0/16\n2001:db8::/32\n").unwrap();

    let mut registry = MapRegistry::new();
    let id = registry
        .add_radix_map(&format!("file://{}", path.display()), Some("local"))
        .unwrap();

    let outcome = FileLoader::new()
        .load(registry.ingestion_mut(id).unwrap())
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::Applied { entries: 3 });

    let map = registry.get(id).unwrap();
    assert_eq!(map.get(ip("10.1.2.3")).unwrap(), MapValue::Bool(true));
    assert_eq!(map.get(ip("11.0.0.0")).unwrap(), MapValue::Bool(false));
    assert!(map.get(LookupKey::Ipv4Host(0xc0a8_0101)).unwrap().is_found());
    assert!(map.get("2001:db8::1").unwrap().is_found());
    assert_eq!(map.protocol(), "file");
}

#[test]
fn test_reload_replaces_content() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("hosts.map");
    std::fs::write(&path, "old.example\n").unwrap();

    let mut registry = MapRegistry::new();
    let id = registry.add_set_map(path.to_str().unwrap(), None).unwrap();
    let loader = FileLoader::new();

    loader.load(registry.ingestion_mut(id).unwrap()).unwrap();
    assert!(registry.get(id).unwrap().get("old.example").unwrap().is_found());

    std::fs::write(&path, "new.example\n").unwrap();
    loader.load(registry.ingestion_mut(id).unwrap()).unwrap();

    let map = registry.get(id).unwrap();
    assert!(!map.get("old.example").unwrap().is_found());
    assert!(map.get("NEW.example").unwrap().is_found());
    assert_eq!(registry.ingestion_mut(id).unwrap().cycles(), 2);
}

#[test]
fn test_broken_update_keeps_previous_content() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nets.map");
    std::fs::write(&path, "10.0.0.0/8\n").unwrap();

    let mut registry = MapRegistry::new();
    let id = registry.add_radix_map(path.to_str().unwrap(), None).unwrap();
    let loader = FileLoader::new();
    loader.load(registry.ingestion_mut(id).unwrap()).unwrap();

    std::fs::write(&path, "10.0.0.0/8\nnot-a-network\n").unwrap();
    let err = loader.load(registry.ingestion_mut(id).unwrap()).unwrap_err();
    assert!(matches!(err, MapError::Build(_)));

    assert!(registry.get(id).unwrap().get(ip("10.4.4.4")).unwrap().is_found());
}

#[test]
fn test_kv_map_values() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kv.map");
    std::fs::write(&path, "alpha beta\nGamma  delta epsilon \nflag\n").unwrap();

    let mut registry = MapRegistry::new();
    let id = registry.add_kv_map(path.to_str().unwrap(), None).unwrap();
    FileLoader::with_chunk_size(3)
        .load(registry.ingestion_mut(id).unwrap())
        .unwrap();

    let map = registry.get(id).unwrap();
    assert_eq!(map.get("alpha").unwrap().as_str(), Some("beta"));
    assert_eq!(map.get("gamma").unwrap().as_str(), Some("delta epsilon"));
    assert_eq!(map.get("flag").unwrap().as_str(), Some(""));
    assert_eq!(map.get("missing").unwrap(), MapValue::Value(None));
}

#[test]
fn test_callback_map_receives_content() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("raw.map");
    std::fs::write(&path, "opaque payload").unwrap();

    let seen: Arc<Mutex<Option<(Vec<u8>, String)>>> = Arc::default();
    let sink = Arc::clone(&seen);

    let mut registry = MapRegistry::new();
    let id = registry
        .add_callback_map(
            path.to_str().unwrap(),
            None,
            Some(MapCallback::new(move |data, map| {
                *sink.lock().unwrap() = Some((data.to_vec(), map.to_string()));
            })),
        )
        .unwrap();

    let outcome = FileLoader::new()
        .load(registry.ingestion_mut(id).unwrap())
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::Delivered { bytes: 14 });

    let (data, name) = seen.lock().unwrap().clone().unwrap();
    assert_eq!(data, b"opaque payload");
    assert_eq!(name, format!("callback map {}", path.display()));

    let map = registry.get(id).unwrap();
    assert_eq!(map.kind(), MapKind::Callback);
    assert_eq!(map.get("anything").unwrap(), MapValue::Bool(false));
}

#[test]
fn test_embedded_map_from_config() {
    let registry = MapRegistry::from_json(
        r#"{"maps":[{"name":"loopback","kind":"radix","source":{"embedded":"127.0.0.0/8 ::1"}}]}"#,
    )
    .unwrap();

    let map = registry.get(registry.find("loopback").unwrap()).unwrap();
    assert_eq!(map.uri(), "embedded");
    assert!(map.get(ip("127.0.0.53")).unwrap().is_found());
    assert!(map.get(ip("::1")).unwrap().is_found());
    assert!(!map.get(ip("::2")).unwrap().is_found());
}
