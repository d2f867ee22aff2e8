//! Sign and verify byte buffers and files
//!
//! Both directions hash the content with SHA-256 and use PKCS#1 v1.5
//! padding over that digest. The digest algorithm is the same on both paths;
//! a signature made with any other digest will not verify.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use rsa::Pkcs1v15Sign;
use sha2::{Digest, Sha256};

use crate::error::{Result, SignError};
use crate::{PrivateKey, PublicKey, Signature};

/// SHA-256 digest length
pub const DIGEST_SIZE: usize = 32;

/// Content digest signed by [`sign`] and checked by [`verify`]
pub fn digest(data: &[u8]) -> [u8; DIGEST_SIZE] {
    Sha256::digest(data).into()
}

/// Sign `data`. The signature is exactly `key.size()` bytes.
pub fn sign(key: &PrivateKey, data: &[u8]) -> Result<Signature> {
    let digest = digest(data);
    let bytes = key
        .rsa()
        .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
        .map_err(|e| {
            tracing::info!(error = %e, "Cannot make a signature for data");
            SignError::Signing(e.to_string())
        })?;
    Ok(Signature::new(bytes))
}

/// Check `signature` over `data`. Only an exact cryptographic match is `true`.
pub fn verify(key: &PublicKey, signature: &Signature, data: &[u8]) -> bool {
    let digest = digest(data);
    match key
        .rsa()
        .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, signature.as_bytes())
    {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, "RSA signature check failed");
            false
        }
    }
}

/// Sign the whole content of a file
pub fn sign_file(key: &PrivateKey, path: impl AsRef<Path>) -> Result<Signature> {
    with_mapped(path.as_ref(), |data| sign(key, data))?
}

/// Check a signature over the whole content of a file.
///
/// A missing or unreadable file is an `Err`, distinct from `Ok(false)`.
pub fn verify_file(key: &PublicKey, signature: &Signature, path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    let valid = with_mapped(path, |data| verify(key, signature, data))?;
    if !valid {
        tracing::info!(path = %path.display(), "Cannot check rsa signature for file");
    }
    Ok(valid)
}

/// Run `f` over a read-only mapping of the file
fn with_mapped<T>(path: &Path, f: impl FnOnce(&[u8]) -> T) -> Result<T> {
    let file = File::open(path).map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "Cannot open file");
        SignError::io(path, e)
    })?;
    let len = file.metadata().map_err(|e| SignError::io(path, e))?.len();

    // zero-length files cannot be mapped
    if len == 0 {
        return Ok(f(&[]));
    }

    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "Cannot mmap file");
        SignError::io(path, e)
    })?;

    Ok(f(&mmap))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_keys::{other_key, test_key};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_sign_verify_roundtrip() {
        let key = test_key();
        let public = key.public_key().unwrap();
        let data = b"10.0.0.0/8\n192.168.0.0/16\n";

        let sig = sign(key, data).unwrap();
        assert_eq!(sig.len(), key.size());
        assert!(verify(&public, &sig, data));
    }

    #[test]
    fn test_verify_rejects_data_bit_flip() {
        let key = test_key();
        let public = key.public_key().unwrap();
        let data = b"host1.example\nhost2.example\n".to_vec();
        let sig = sign(key, &data).unwrap();

        for byte in 0..data.len() {
            for bit in 0..8 {
                let mut tampered = data.clone();
                tampered[byte] ^= 1 << bit;
                assert!(!verify(&public, &sig, &tampered), "byte {byte} bit {bit}");
            }
        }
    }

    #[test]
    fn test_verify_rejects_signature_bit_flip() {
        let key = test_key();
        let public = key.public_key().unwrap();
        let data = b"alpha beta";
        let sig = sign(key, data).unwrap().into_bytes();

        for byte in (0..sig.len()).step_by(7) {
            let mut tampered = sig.clone();
            tampered[byte] ^= 0x10;
            assert!(!verify(&public, &Signature::new(tampered), data));
        }
    }

    #[test]
    fn test_verify_wrong_key() {
        let sig = sign(test_key(), b"payload").unwrap();
        let wrong = other_key().public_key().unwrap();
        assert!(!verify(&wrong, &sig, b"payload"));
    }

    #[test]
    fn test_verify_truncated_signature() {
        let public = test_key().public_key().unwrap();
        assert!(!verify(&public, &Signature::new(vec![0u8; 4]), b"payload"));
        assert!(!verify(&public, &Signature::new(Vec::new()), b"payload"));
    }

    #[test]
    fn test_empty_data() {
        let key = test_key();
        let sig = sign(key, b"").unwrap();
        assert!(verify(&key.public_key().unwrap(), &sig, b""));
    }

    #[test]
    fn test_file_and_memory_agree() {
        let key = test_key();
        let public = key.public_key().unwrap();
        let data = b"example.com value\n";

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(data).unwrap();
        file.flush().unwrap();

        let from_file = sign_file(key, file.path()).unwrap();
        assert!(verify(&public, &from_file, data));

        let from_memory = sign(key, data).unwrap();
        assert!(verify_file(&public, &from_memory, file.path()).unwrap());
        assert!(!verify_file(&public, &sign(key, b"other").unwrap(), file.path()).unwrap());
    }

    #[test]
    fn test_empty_file() {
        let key = test_key();
        let file = NamedTempFile::new().unwrap();

        let sig = sign_file(key, file.path()).unwrap();
        assert!(verify(&key.public_key().unwrap(), &sig, b""));
    }

    #[test]
    fn test_missing_file_is_error_not_false() {
        let key = test_key();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.map");

        assert!(matches!(sign_file(key, &path), Err(SignError::Io { .. })));
        let sig = sign(key, b"x").unwrap();
        assert!(matches!(
            verify_file(&key.public_key().unwrap(), &sig, &path),
            Err(SignError::Io { .. })
        ));
    }

    #[test]
    fn test_digest_is_sha256() {
        assert_eq!(
            hex::encode(digest(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
