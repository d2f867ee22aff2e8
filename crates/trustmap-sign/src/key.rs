//! RSA key material
//!
//! Keys are loaded from PEM. A public key also has a compact text form used
//! for map trust configuration: lowercase, unpadded RFC 4648 base32 over the
//! SubjectPublicKeyInfo DER encoding.

use std::fmt;
use std::path::Path;

use data_encoding::BASE32_NOPAD;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::error::{Result, SignError};

/// RSA public key
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    inner: RsaPublicKey,
    encoded: String,
}

impl PublicKey {
    pub fn from_rsa(inner: RsaPublicKey) -> Result<Self> {
        let der = inner
            .to_public_key_der()
            .map_err(|e| SignError::Encoding(e.to_string()))?;
        let encoded = BASE32_NOPAD.encode(der.as_bytes()).to_ascii_lowercase();
        Ok(Self { inner, encoded })
    }

    /// Load a PEM public key from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let pem = std::fs::read_to_string(path).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Cannot open public key");
            SignError::io(path, e)
        })?;
        Self::from_pem(&pem)
    }

    /// Parse a PEM public key (`PUBLIC KEY` or `RSA PUBLIC KEY`)
    pub fn from_pem(pem: &str) -> Result<Self> {
        let inner = RsaPublicKey::from_public_key_pem(pem)
            .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
            .map_err(|e| SignError::KeyParse(format!("public key: {e}")))?;
        Self::from_rsa(inner)
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = RsaPublicKey::from_public_key_der(der)
            .map_err(|e| SignError::KeyParse(format!("public key: {e}")))?;
        Self::from_rsa(inner)
    }

    /// Parse the base32 trusted-key form. Case and surrounding whitespace are ignored.
    pub fn from_base32(encoded: &str) -> Result<Self> {
        let der = BASE32_NOPAD
            .decode(encoded.trim().to_ascii_uppercase().as_bytes())
            .map_err(|e| SignError::Encoding(e.to_string()))?;
        Self::from_der(&der)
    }

    pub fn to_base32(&self) -> &str {
        &self.encoded
    }

    pub fn to_pem(&self) -> Result<String> {
        self.inner
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| SignError::Encoding(e.to_string()))
    }

    /// Modulus size in bytes, which is also the signature length
    pub fn size(&self) -> usize {
        self.inner.size()
    }

    pub(crate) fn rsa(&self) -> &RsaPublicKey {
        &self.inner
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("bits", &(self.size() * 8))
            .field("base32", &self.encoded)
            .finish()
    }
}

/// RSA private key
pub struct PrivateKey {
    inner: RsaPrivateKey,
}

impl PrivateKey {
    /// Generate a fresh key pair
    pub fn generate(bits: usize) -> Result<Self> {
        let inner = RsaPrivateKey::new(&mut rand::thread_rng(), bits)
            .map_err(|e| SignError::Signing(format!("key generation: {e}")))?;
        Ok(Self { inner })
    }

    /// Load a PEM private key from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let pem = std::fs::read_to_string(path).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Cannot open private key");
            SignError::io(path, e)
        })?;
        Self::from_pem(&pem)
    }

    /// Parse a PEM private key (`RSA PRIVATE KEY` or PKCS#8 `PRIVATE KEY`)
    pub fn from_pem(pem: &str) -> Result<Self> {
        let inner = RsaPrivateKey::from_pkcs1_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
            .map_err(|e| SignError::KeyParse(format!("private key: {e}")))?;
        Ok(Self { inner })
    }

    /// PKCS#1 PEM encoding
    pub fn to_pem(&self) -> Result<String> {
        let pem = self
            .inner
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| SignError::Encoding(e.to_string()))?;
        Ok(pem.as_str().to_owned())
    }

    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_rsa(self.inner.to_public_key())
    }

    pub fn size(&self) -> usize {
        self.inner.size()
    }

    pub(crate) fn rsa(&self) -> &RsaPrivateKey {
        &self.inner
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("bits", &(self.size() * 8))
            .finish_non_exhaustive()
    }
}
