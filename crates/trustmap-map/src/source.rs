//! Where a map's content comes from
//!
//! A map line is a URI with an optional `sign+` prefix:
//!
//! ```text
//! file:///etc/maps/hosts.map        file map
//! /etc/maps/hosts.map               file map (bare path)
//! https://maps.example/hosts.map    http map
//! sign+file:///etc/maps/nets.map    signed file map
//! ```

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};
use trustmap_sign::PublicKey;

const SIGNED_PREFIX: &str = "sign+";
const FILE_SCHEME: &str = "file://";

/// Transport of a fetchable map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    File,
    Http,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::File => "file",
            Protocol::Http => "http",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fetch and trust metadata of a non-embedded map
pub struct SourceMeta {
    protocol: Protocol,
    uri: String,
    signed: bool,
    trusted_key: ArcSwapOption<PublicKey>,
}

impl SourceMeta {
    pub fn new(protocol: Protocol, uri: impl Into<String>, signed: bool) -> Self {
        Self {
            protocol,
            uri: uri.into(),
            signed,
            trusted_key: ArcSwapOption::empty(),
        }
    }

    /// Parse a map line. Returns `None` for empty lines and unsupported schemes.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (signed, uri) = match line.strip_prefix(SIGNED_PREFIX) {
            Some(rest) => (true, rest.trim()),
            None => (false, line),
        };

        let http_rest = uri
            .strip_prefix("http://")
            .or_else(|| uri.strip_prefix("https://"));
        let protocol = if let Some(rest) = http_rest {
            if rest.is_empty() {
                return None;
            }
            Protocol::Http
        } else if let Some(path) = uri.strip_prefix(FILE_SCHEME) {
            if path.is_empty() {
                return None;
            }
            Protocol::File
        } else if uri.contains("://") || uri.is_empty() {
            return None;
        } else {
            Protocol::File
        };

        Some(Self::new(protocol, uri, signed))
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// URI without the `sign+` marker
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    /// Local path of a file map
    pub fn file_path(&self) -> Option<PathBuf> {
        match self.protocol {
            Protocol::File => Some(PathBuf::from(
                self.uri.strip_prefix(FILE_SCHEME).unwrap_or(&self.uri),
            )),
            Protocol::Http => None,
        }
    }

    pub fn trusted_key(&self) -> Option<Arc<PublicKey>> {
        self.trusted_key.load_full()
    }

    /// Replace the trusted key, returning the previous one
    pub fn set_trusted_key(&self, key: PublicKey) -> Option<Arc<PublicKey>> {
        self.trusted_key.swap(Some(Arc::new(key)))
    }
}

impl fmt::Debug for SourceMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceMeta")
            .field("protocol", &self.protocol)
            .field("uri", &self.uri)
            .field("signed", &self.signed)
            .field("has_trusted_key", &self.trusted_key.load().is_some())
            .finish()
    }
}
