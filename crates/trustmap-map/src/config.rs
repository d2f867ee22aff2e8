//! JSON map configuration
//!
//! ```json
//! {
//!   "maps": [
//!     { "name": "nets", "kind": "radix", "source": { "uri": "sign+/etc/maps/nets.map" },
//!       "trusted_key": "mjqxg..." },
//!     { "name": "local", "kind": "radix", "source": { "embedded": "127.0.0.0/8, ::1" } },
//!     { "name": "hosts", "kind": "set", "source": { "uri": "file:///etc/maps/hosts.map" },
//!       "description": "blocked hosts", "signed": false }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use trustmap_core::MapKind;

use crate::error::{MapError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapsConfig {
    #[serde(default)]
    pub maps: Vec<MapDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapDefinition {
    pub name: String,
    pub kind: MapKind,
    pub source: MapSourceConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Same as a `sign+` prefix on the URI
    #[serde(default)]
    pub signed: bool,
    /// Base32 public key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trusted_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapSourceConfig {
    Uri(String),
    /// Inline network list (radix maps only)
    Embedded(String),
}

impl MapsConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| MapError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "Loading map configuration");
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| MapError::Config(e.to_string()))
    }
}
