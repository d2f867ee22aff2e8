//! trustmap-sign: RSA signatures that gate map updates
//!
//! A signed map is only rebuilt from content whose detached signature
//! verifies against the map's trusted public key. This crate provides the
//! pieces for that check and for producing signatures:
//!
//! - [`PublicKey`] / [`PrivateKey`]: PEM-loaded RSA keys; public keys also
//!   round-trip through the base32 trusted-key string
//! - [`Signature`]: raw detached signature bytes, loadable and savable
//! - [`sign`] / [`verify`]: SHA-256 + PKCS#1 v1.5 over memory buffers
//! - [`sign_file`] / [`verify_file`]: the same over memory-mapped files
//!
//! All operations are synchronous and block on file IO or RSA math.

mod error;
mod key;
mod signature;
mod signer;

pub use error::{Result, SignError};
pub use key::{PrivateKey, PublicKey};
pub use signature::Signature;
pub use signer::{digest, sign, sign_file, verify, verify_file, DIGEST_SIZE};

/// File extension of detached signature sidecars (`hosts.map.sig`)
pub const SIGNATURE_EXTENSION: &str = "sig";
