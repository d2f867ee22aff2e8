//! Signed maps: the trust gate in front of every rebuild

use std::net::IpAddr;
use std::path::Path;
use std::sync::OnceLock;

use tempfile::tempdir;
use trustmap::map::signature_path;
use trustmap::sign::{sign_file, verify_file};
use trustmap::{FileLoader, MapError, MapRegistry, PrivateKey, PublicKey, UpdateOutcome};

fn signing_key() -> &'static PrivateKey {
    static KEY: OnceLock<PrivateKey> = OnceLock::new();
    KEY.get_or_init(|| PrivateKey::generate(1024).unwrap())
}

fn attacker_key() -> &'static PrivateKey {
    static KEY: OnceLock<PrivateKey> = OnceLock::new();
    KEY.get_or_init(|| PrivateKey::generate(1024).unwrap())
}

fn trusted_key() -> String {
    signing_key().public_key().unwrap().to_base32().to_string()
}

fn write_signed(path: &Path, content: &str, key: &PrivateKey) {
    std::fs::write(path, content).unwrap();
    sign_file(key, path)
        .unwrap()
        .save(signature_path(path), true)
        .unwrap();
}

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

#[test]
fn test_signed_map_accepts_only_trusted_signatures() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nets.map");
    write_signed(&path, "10.0.0.0/8\n", signing_key());

    let mut registry = MapRegistry::new();
    let id = registry
        .add_radix_map(&format!("sign+file://{}", path.display()), None)
        .unwrap();
    let map = std::sync::Arc::clone(registry.get(id).unwrap());
    assert!(map.is_signed());
    map.set_trusted_key(&trusted_key()).unwrap();

    let loader = FileLoader::new();
    assert_eq!(
        loader.load(registry.ingestion_mut(id).unwrap()).unwrap(),
        UpdateOutcome::Applied { entries: 1 }
    );

    // a validly formed signature from the wrong key
    write_signed(&path, "0.0.0.0/0\n", attacker_key());
    let err = loader.load(registry.ingestion_mut(id).unwrap()).unwrap_err();
    assert!(err.is_security_event());
    assert!(!map.get(ip("8.8.8.8")).unwrap().is_found());
    assert!(map.get(ip("10.0.0.1")).unwrap().is_found());

    // back to a trusted signature
    write_signed(&path, "10.0.0.0/8\n172.16.0.0/12\n", signing_key());
    loader.load(registry.ingestion_mut(id).unwrap()).unwrap();
    assert!(map.get(ip("172.20.0.1")).unwrap().is_found());
}

#[test]
fn test_signed_map_without_key_rejects() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("hosts.map");
    write_signed(&path, "a.example\n", signing_key());

    let mut registry = MapRegistry::new();
    let id = registry
        .add_set_map(&format!("sign+{}", path.display()), None)
        .unwrap();

    let err = FileLoader::new()
        .load(registry.ingestion_mut(id).unwrap())
        .unwrap_err();
    assert!(matches!(err, MapError::VerificationFailed { .. }));
    assert!(registry.get(id).unwrap().is_empty());
}

#[test]
fn test_trusted_key_from_config() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kv.map");
    write_signed(&path, "alpha beta\n", signing_key());

    let config = serde_json::json!({
        "maps": [{
            "name": "kv",
            "kind": "kv",
            "source": { "uri": path.to_str().unwrap() },
            "signed": true,
            "trusted_key": trusted_key(),
        }]
    });
    let mut registry = MapRegistry::from_json(&config.to_string()).unwrap();
    let id = registry.find("kv").unwrap();

    FileLoader::new()
        .load(registry.ingestion_mut(id).unwrap())
        .unwrap();
    let map = registry.get(id).unwrap();
    assert!(map.is_signed());
    assert_eq!(map.trusted_key(), Some(trusted_key()));
    assert_eq!(map.get("alpha").unwrap().as_str(), Some("beta"));
}

#[test]
fn test_trusted_key_string_roundtrip() {
    let public = signing_key().public_key().unwrap();
    let encoded = public.to_base32().to_string();

    let decoded = PublicKey::from_base32(&encoded).unwrap();
    assert_eq!(decoded, public);
    assert_eq!(decoded.to_base32(), encoded);
}

#[test]
fn test_file_signatures() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("hosts.map");
    std::fs::write(&path, "a.example\n").unwrap();

    let sig = sign_file(signing_key(), &path).unwrap();
    let public = signing_key().public_key().unwrap();
    assert!(verify_file(&public, &sig, &path).unwrap());

    // refuses to clobber an existing signature unless forced
    sig.save(signature_path(&path), false).unwrap();
    assert!(sig.save(signature_path(&path), false).is_err());
    sig.save(signature_path(&path), true).unwrap();

    std::fs::write(&path, "b.example\n").unwrap();
    assert!(!verify_file(&public, &sig, &path).unwrap());
}
