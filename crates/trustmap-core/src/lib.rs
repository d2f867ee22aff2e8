//! trustmap-core: lookup backends for dynamically updated maps
//!
//! This crate defines the structures a map can be built into:
//! - Radix: compressed binary trie over network prefixes (longest-prefix match)
//! - Set: case-insensitive host membership
//! - KeyValue: case-insensitive key to string value
//! - Callback: no structure at all, raw content goes to a user handler
//!
//! Every variant is built from a complete raw buffer in one go and is never
//! mutated afterwards. Updating a map means building a fresh [`Backend`] and
//! swapping it in whole; see `trustmap-map` for the swap itself.
//!
//! ## Input formats
//!
//! | Variant | Format |
//! |---------|--------|
//! | Radix | CIDR entries or bare addresses, separated by newlines, `,`, `;` or whitespace |
//! | Set | one host per line |
//! | KeyValue | `key value` per line, value is the rest of the line |
//!
//! `#` starts a comment in all formats.

mod backend;
mod error;
mod lists;
mod network;
pub mod radix;

pub use backend::{
    Backend, KvBackend, LookupKey, MapKind, MapValue, RadixBackend, SetBackend,
};
pub use error::Error;
pub use lists::{parse_host_list, parse_kv_list, parse_network_list};
pub use network::{address_key, Network};
pub use radix::RadixTrie;

pub type Result<T> = std::result::Result<T, Error>;

/// Constants shared by the backends
pub mod constants {
    /// Width of a trie key in bits (IPv6, IPv4 is stored mapped)
    pub const KEY_BITS: u8 = 128;

    /// Offset of an IPv4 prefix inside an IPv4-mapped IPv6 key
    pub const IPV4_MAPPED_OFFSET: u8 = 96;

    /// Comment marker for all list formats
    pub const COMMENT_CHAR: char = '#';
}
