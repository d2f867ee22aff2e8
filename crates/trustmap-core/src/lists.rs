//! Parsers for the textual map formats
//!
//! All parsers take the complete raw buffer of one update. Lines are
//! 1-based in error messages.

use crate::constants::COMMENT_CHAR;
use crate::{Error, Network, Result};

/// Parse a list of networks.
///
/// Entries may be separated by newlines, `,`, `;` or whitespace, so both a
/// one-per-line file and an inline config value like
/// `"10.0.0.0/8, 192.168.0.0/16"` work.
pub fn parse_network_list(raw: &[u8]) -> Result<Vec<Network>> {
    let text = as_text(raw)?;
    let mut networks = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let entries = strip_comment(line)
            .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
            .filter(|e| !e.is_empty());

        for entry in entries {
            networks.push(Network::parse_entry(entry, idx + 1)?);
        }
    }

    Ok(networks)
}

/// Parse a host list: the first token of each line, lowercased.
pub fn parse_host_list(raw: &[u8]) -> Result<Vec<String>> {
    let text = as_text(raw)?;

    Ok(text
        .lines()
        .filter_map(|line| strip_comment(line).split_whitespace().next())
        .map(|host| host.to_ascii_lowercase())
        .collect())
}

/// Parse `key value` lines. The key is lowercased; the value is the rest of
/// the line with surrounding whitespace removed (empty if absent).
pub fn parse_kv_list(raw: &[u8]) -> Result<Vec<(String, String)>> {
    let text = as_text(raw)?;
    let mut pairs = Vec::new();

    for line in text.lines() {
        let line = strip_comment(line).trim();
        if line.is_empty() {
            continue;
        }

        let (key, value) = match line.split_once(char::is_whitespace) {
            Some((key, value)) => (key, value.trim()),
            None => (line, ""),
        };
        pairs.push((key.to_ascii_lowercase(), value.to_string()));
    }

    Ok(pairs)
}

fn as_text(raw: &[u8]) -> Result<&str> {
    std::str::from_utf8(raw).map_err(|e| Error::NotUtf8 {
        offset: e.valid_up_to(),
    })
}

fn strip_comment(line: &str) -> &str {
    match line.find(COMMENT_CHAR) {
        Some(pos) => &line[..pos],
        None => line,
    }
}
