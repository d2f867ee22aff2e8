//! Signature gate in front of backend rebuilds

use trustmap_sign::Signature;

use crate::error::{MapError, Result};
use crate::handle::MapHandle;

/// Tracing target for rejected updates
pub const SECURITY_TARGET: &str = "trustmap::security";

/// Decide whether `data` may replace the content of `map`.
///
/// Unsigned and embedded maps accept everything. A signed map needs a
/// trusted key, a signature, and an exact match between them; anything
/// less is a rejection.
pub fn check_update(map: &MapHandle, data: &[u8], signature: Option<&Signature>) -> Result<()> {
    if !map.is_signed() {
        return Ok(());
    }

    let Some(key) = map.trusted_public_key() else {
        return Err(reject(map, "no trusted key configured"));
    };
    let Some(signature) = signature else {
        return Err(reject(map, "signature missing"));
    };

    if trustmap_sign::verify(&key, signature, data) {
        tracing::debug!(map = %map.uri(), bytes = data.len(), "Map signature verified");
        Ok(())
    } else {
        Err(reject(map, "signature mismatch"))
    }
}

fn reject(map: &MapHandle, reason: &str) -> MapError {
    tracing::error!(
        target: SECURITY_TARGET,
        security = true,
        map = %map.uri(),
        reason,
        "Rejected map update: signature verification failed"
    );
    MapError::VerificationFailed {
        map: map.uri().to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceMeta;
    use crate::test_keys::{other_key, test_key};
    use trustmap_core::MapKind;

    fn signed_map() -> MapHandle {
        let map = MapHandle::with_source(
            MapKind::Radix,
            SourceMeta::parse("sign+/tmp/nets.map").unwrap(),
            None,
        );
        let encoded = test_key().public_key().unwrap().to_base32().to_string();
        map.set_trusted_key(&encoded).unwrap();
        map
    }

    #[test]
    fn test_unsigned_map_accepts_anything() {
        let map = MapHandle::with_source(
            MapKind::Radix,
            SourceMeta::parse("/tmp/nets.map").unwrap(),
            None,
        );
        assert!(check_update(&map, b"10.0.0.0/8", None).is_ok());
    }

    #[test]
    fn test_valid_signature_passes() {
        let map = signed_map();
        let sig = trustmap_sign::sign(test_key(), b"10.0.0.0/8").unwrap();
        assert!(check_update(&map, b"10.0.0.0/8", Some(&sig)).is_ok());
    }

    #[test]
    fn test_rejections() {
        let map = signed_map();
        let data = b"10.0.0.0/8";

        let missing = check_update(&map, data, None).unwrap_err();
        assert!(missing.is_security_event());

        let wrong_key = trustmap_sign::sign(other_key(), data).unwrap();
        let err = check_update(&map, data, Some(&wrong_key)).unwrap_err();
        assert!(matches!(err, MapError::VerificationFailed { ref reason, .. } if reason == "signature mismatch"));

        let good = trustmap_sign::sign(test_key(), data).unwrap();
        assert!(check_update(&map, b"10.0.0.0/9", Some(&good)).is_err());
    }

    #[test]
    fn test_signed_without_key_fails_closed() {
        let map = MapHandle::with_source(
            MapKind::Set,
            SourceMeta::parse("sign+/tmp/hosts.map").unwrap(),
            None,
        );
        let sig = trustmap_sign::sign(test_key(), b"a.example").unwrap();
        let err = check_update(&map, b"a.example", Some(&sig)).unwrap_err();
        assert_eq!(err.code(), "VERIFICATION_FAILED");
    }
}
