//! Backend variants and dispatch
//!
//! [`Backend`] is a closed sum type: build, lookup and size accounting all
//! match exhaustively on the variant, so one variant's payload can never be
//! read as another's.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};

use crate::lists::{parse_host_list, parse_kv_list, parse_network_list};
use crate::network::{address_key, parse_addr};
use crate::{Error, Network, RadixTrie, Result};

/// Map variant tag, fixed when a map is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapKind {
    Radix,
    Set,
    #[serde(rename = "kv")]
    KeyValue,
    Callback,
}

impl fmt::Display for MapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKind::Radix => write!(f, "radix"),
            MapKind::Set => write!(f, "set"),
            MapKind::KeyValue => write!(f, "kv"),
            MapKind::Callback => write!(f, "callback"),
        }
    }
}

/// A lookup key in any of the accepted forms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKey<'a> {
    /// Parsed address (radix maps)
    Addr(IpAddr),
    /// IPv4 address as a host-order integer, e.g. `0x0a000001` for 10.0.0.1.
    /// Zero is the valid address 0.0.0.0.
    Ipv4Host(u32),
    /// Host or key string; radix maps parse it as an address
    Text(&'a str),
    /// Raw big-endian address bytes, 4 or 16 long
    Bytes(&'a [u8]),
}

impl LookupKey<'_> {
    fn type_name(&self) -> &'static str {
        match self {
            LookupKey::Addr(_) => "address",
            LookupKey::Ipv4Host(_) => "integer",
            LookupKey::Text(_) => "string",
            LookupKey::Bytes(_) => "bytes",
        }
    }
}

impl From<IpAddr> for LookupKey<'_> {
    fn from(addr: IpAddr) -> Self {
        LookupKey::Addr(addr)
    }
}

impl<'a> From<&'a str> for LookupKey<'a> {
    fn from(s: &'a str) -> Self {
        LookupKey::Text(s)
    }
}

/// Result of a lookup: presence for radix/set maps, a value for kv maps
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapValue {
    Bool(bool),
    Value(Option<String>),
}

impl MapValue {
    pub fn is_found(&self) -> bool {
        match self {
            MapValue::Bool(found) => *found,
            MapValue::Value(value) => value.is_some(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MapValue::Bool(_) => None,
            MapValue::Value(value) => value.as_deref(),
        }
    }
}

/// Network prefixes in a compressed trie
#[derive(Debug, Default)]
pub struct RadixBackend {
    trie: RadixTrie<Network>,
}

impl RadixBackend {
    pub fn build(raw: &[u8]) -> Result<Self> {
        Ok(Self::from_networks(parse_network_list(raw)?))
    }

    pub fn from_networks(networks: impl IntoIterator<Item = Network>) -> Self {
        let mut trie = RadixTrie::new();
        for net in networks {
            let (key, len) = net.trie_key();
            trie.insert(key, len, net);
        }
        Self { trie }
    }

    pub fn contains(&self, addr: IpAddr) -> bool {
        self.trie.contains(address_key(addr))
    }

    /// Most specific network containing `addr`
    pub fn matching(&self, addr: IpAddr) -> Option<&Network> {
        self.trie.longest_match(address_key(addr)).map(|(_, net)| net)
    }

    pub fn lookup(&self, key: LookupKey<'_>) -> Result<bool> {
        let addr = match key {
            LookupKey::Addr(addr) => addr,
            LookupKey::Ipv4Host(host) => IpAddr::V4(Ipv4Addr::from(host)),
            LookupKey::Text(text) => match parse_addr(text) {
                Some(addr) => addr,
                None => return Ok(false),
            },
            LookupKey::Bytes(bytes) => {
                if let Ok(v4) = <[u8; 4]>::try_from(bytes) {
                    IpAddr::V4(Ipv4Addr::from(v4))
                } else if let Ok(v6) = <[u8; 16]>::try_from(bytes) {
                    IpAddr::V6(Ipv6Addr::from(v6))
                } else {
                    return Err(Error::WrongKeyType {
                        kind: MapKind::Radix,
                        key: "bytes",
                    });
                }
            }
        };
        Ok(self.contains(addr))
    }

    pub fn len(&self) -> usize {
        self.trie.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trie.is_empty()
    }
}

/// Case-insensitive host set
#[derive(Debug, Default)]
pub struct SetBackend {
    hosts: HashSet<String>,
}

impl SetBackend {
    pub fn build(raw: &[u8]) -> Result<Self> {
        Ok(Self {
            hosts: parse_host_list(raw)?.into_iter().collect(),
        })
    }

    pub fn contains(&self, host: &str) -> bool {
        self.hosts.contains(fold_case(host).as_ref())
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

/// Case-insensitive key to string value map
#[derive(Debug, Default)]
pub struct KvBackend {
    entries: HashMap<String, String>,
}

impl KvBackend {
    /// Later duplicates of a key replace earlier ones.
    pub fn build(raw: &[u8]) -> Result<Self> {
        Ok(Self {
            entries: parse_kv_list(raw)?.into_iter().collect(),
        })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(fold_case(key).as_ref()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The active lookup structure of a map
#[derive(Debug)]
pub enum Backend {
    Radix(RadixBackend),
    Set(SetBackend),
    KeyValue(KvBackend),
    /// Callback maps hand their content to a handler and keep nothing
    Callback,
}

impl Backend {
    /// Empty backend of the given kind, used before the first update lands
    pub fn empty(kind: MapKind) -> Self {
        match kind {
            MapKind::Radix => Backend::Radix(RadixBackend::default()),
            MapKind::Set => Backend::Set(SetBackend::default()),
            MapKind::KeyValue => Backend::KeyValue(KvBackend::default()),
            MapKind::Callback => Backend::Callback,
        }
    }

    /// Build a fresh backend from the complete content of one update
    pub fn build(kind: MapKind, raw: &[u8]) -> Result<Self> {
        Ok(match kind {
            MapKind::Radix => Backend::Radix(RadixBackend::build(raw)?),
            MapKind::Set => Backend::Set(SetBackend::build(raw)?),
            MapKind::KeyValue => Backend::KeyValue(KvBackend::build(raw)?),
            MapKind::Callback => Backend::Callback,
        })
    }

    pub fn kind(&self) -> MapKind {
        match self {
            Backend::Radix(_) => MapKind::Radix,
            Backend::Set(_) => MapKind::Set,
            Backend::KeyValue(_) => MapKind::KeyValue,
            Backend::Callback => MapKind::Callback,
        }
    }

    /// Number of entries (prefixes, hosts or pairs)
    pub fn len(&self) -> usize {
        match self {
            Backend::Radix(radix) => radix.len(),
            Backend::Set(set) => set.len(),
            Backend::KeyValue(kv) => kv.len(),
            Backend::Callback => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up `key` according to the variant.
    ///
    /// Callback maps hold no data and always answer `Bool(false)`.
    pub fn lookup(&self, key: LookupKey<'_>) -> Result<MapValue> {
        match self {
            Backend::Radix(radix) => radix.lookup(key).map(MapValue::Bool),
            Backend::Set(set) => match key {
                LookupKey::Text(host) => Ok(MapValue::Bool(set.contains(host))),
                other => Err(Error::WrongKeyType {
                    kind: MapKind::Set,
                    key: other.type_name(),
                }),
            },
            Backend::KeyValue(kv) => match key {
                LookupKey::Text(k) => Ok(MapValue::Value(kv.get(k).map(str::to_string))),
                other => Err(Error::WrongKeyType {
                    kind: MapKind::KeyValue,
                    key: other.type_name(),
                }),
            },
            Backend::Callback => Ok(MapValue::Bool(false)),
        }
    }
}

fn fold_case(s: &str) -> Cow<'_, str> {
    if s.bytes().any(|b| b.is_ascii_uppercase()) {
        Cow::Owned(s.to_ascii_lowercase())
    } else {
        Cow::Borrowed(s)
    }
}
