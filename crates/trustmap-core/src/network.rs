//! Network prefixes and their trie keys
//!
//! All addresses are keyed as 128-bit big-endian integers. IPv4 addresses use
//! their IPv4-mapped IPv6 form (`::ffff:a.b.c.d`), so an IPv4 `/8` becomes a
//! `/104` in key space and both families share one trie.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::constants::{IPV4_MAPPED_OFFSET, KEY_BITS};
use crate::{Error, Result};

/// An address prefix (`10.0.0.0/8`, `2001:db8::/32`, or a single host)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Network {
    addr: IpAddr,
    prefix: u8,
}

impl Network {
    /// Create a network, masking off host bits.
    ///
    /// Returns `None` if `prefix` is longer than the address family allows.
    pub fn new(addr: IpAddr, prefix: u8) -> Option<Self> {
        match addr {
            IpAddr::V4(v4) => {
                if prefix > 32 {
                    return None;
                }
                let mask = if prefix == 0 { 0 } else { u32::MAX << (32 - prefix) };
                let masked = Ipv4Addr::from(u32::from(v4) & mask);
                Some(Self {
                    addr: IpAddr::V4(masked),
                    prefix,
                })
            }
            IpAddr::V6(v6) => {
                if prefix > KEY_BITS {
                    return None;
                }
                let mask = if prefix == 0 { 0 } else { u128::MAX << (KEY_BITS - prefix) };
                let masked = Ipv6Addr::from(u128::from(v6) & mask);
                Some(Self {
                    addr: IpAddr::V6(masked),
                    prefix,
                })
            }
        }
    }

    /// A network covering exactly one address
    pub fn host(addr: IpAddr) -> Self {
        let prefix = match addr {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => KEY_BITS,
        };
        Self { addr, prefix }
    }

    /// Parse one list entry. `line` is only used for error reporting.
    pub fn parse_entry(entry: &str, line: usize) -> Result<Self> {
        let (addr_part, prefix_part) = match entry.split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (entry, None),
        };

        let addr = parse_addr(addr_part).ok_or_else(|| Error::InvalidAddress {
            line,
            entry: entry.to_string(),
        })?;

        let max = match addr {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => KEY_BITS,
        };

        let prefix = match prefix_part {
            None => max,
            Some(p) => p.parse::<u8>().ok().filter(|&p| p <= max).ok_or_else(|| {
                Error::InvalidPrefix {
                    line,
                    entry: entry.to_string(),
                    max,
                }
            })?,
        };

        // prefix was validated against the family above
        Self::new(addr, prefix).ok_or(Error::InvalidPrefix {
            line,
            entry: entry.to_string(),
            max,
        })
    }

    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Key and prefix length in the shared 128-bit key space
    pub fn trie_key(&self) -> (u128, u8) {
        match self.addr {
            IpAddr::V4(_) => (address_key(self.addr), self.prefix + IPV4_MAPPED_OFFSET),
            IpAddr::V6(_) => (address_key(self.addr), self.prefix),
        }
    }

    /// Check whether `addr` falls inside this network
    pub fn contains(&self, addr: IpAddr) -> bool {
        let (key, len) = self.trie_key();
        if len == 0 {
            return true;
        }
        let mask = u128::MAX << (KEY_BITS - len);
        address_key(addr) & mask == key
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_entry(s.trim(), 0)
    }
}

/// 128-bit trie key for an address
pub fn address_key(addr: IpAddr) -> u128 {
    match addr {
        IpAddr::V4(v4) => u128::from(v4.to_ipv6_mapped()),
        IpAddr::V6(v6) => u128::from(v6),
    }
}

/// Parse an address, accepting bracketed IPv6 (`[::1]`) as well
pub(crate) fn parse_addr(s: &str) -> Option<IpAddr> {
    let s = s.trim();
    let s = s
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(s);
    s.parse().ok()
}
