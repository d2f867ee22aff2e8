//! Path-compressed binary radix trie with longest-prefix match
//!
//! Keys are 128-bit big-endian integers with a prefix length in bits.
//! Each node stores the full (masked) prefix it represents, so chains of
//! single-child nodes never exist: a node has either a value, two children,
//! or both.
//!
//! ```text
//!            [::/0]
//!           /      \
//!   [::ffff:0:0/96]  [2001:db8::/32]
//!        |
//!   [::ffff:10.0.0.0/104]  <- 10.0.0.0/8
//! ```

use crate::constants::KEY_BITS;

struct Node<V> {
    key: u128,
    len: u8,
    value: Option<V>,
    children: [Option<Box<Node<V>>>; 2],
}

impl<V> Node<V> {
    fn leaf(key: u128, len: u8, value: V) -> Box<Self> {
        Box::new(Self {
            key,
            len,
            value: Some(value),
            children: [None, None],
        })
    }
}

/// Compressed radix trie mapping prefixes to values
pub struct RadixTrie<V> {
    root: Option<Box<Node<V>>>,
    len: usize,
}

impl<V> RadixTrie<V> {
    pub fn new() -> Self {
        Self { root: None, len: 0 }
    }

    /// Number of stored prefixes
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a prefix. Host bits beyond `len` are ignored.
    ///
    /// Returns the previous value if the exact prefix was already present.
    pub fn insert(&mut self, key: u128, len: u8, value: V) -> Option<V> {
        let len = len.min(KEY_BITS);
        let key = mask(key, len);
        let previous = insert_at(&mut self.root, key, len, value);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Most specific stored prefix covering `key`, with its prefix length
    pub fn longest_match(&self, key: u128) -> Option<(u8, &V)> {
        let mut best = None;
        let mut cursor = self.root.as_deref();

        while let Some(node) = cursor {
            if mask(key, node.len) != node.key {
                break;
            }
            if let Some(value) = node.value.as_ref() {
                best = Some((node.len, value));
            }
            if node.len == KEY_BITS {
                break;
            }
            cursor = node.children[bit_at(key, node.len)].as_deref();
        }

        best
    }

    /// Check whether any stored prefix covers `key`
    pub fn contains(&self, key: u128) -> bool {
        self.longest_match(key).is_some()
    }

    /// Value stored for exactly this prefix
    pub fn get_exact(&self, key: u128, len: u8) -> Option<&V> {
        let len = len.min(KEY_BITS);
        let key = mask(key, len);
        let mut cursor = self.root.as_deref();

        while let Some(node) = cursor {
            if node.len > len || mask(key, node.len) != node.key {
                return None;
            }
            if node.len == len {
                return node.value.as_ref();
            }
            cursor = node.children[bit_at(key, node.len)].as_deref();
        }

        None
    }
}

impl<V> Default for RadixTrie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for RadixTrie<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadixTrie").field("len", &self.len).finish()
    }
}

fn insert_at<V>(slot: &mut Option<Box<Node<V>>>, key: u128, len: u8, value: V) -> Option<V> {
    let Some(node) = slot else {
        *slot = Some(Node::leaf(key, len, value));
        return None;
    };

    let common = common_prefix(node.key, node.len, key, len);

    if common == node.len && common == len {
        return node.value.replace(value);
    }

    if common == node.len {
        // node is a strict prefix of the new key, descend
        let bit = bit_at(key, node.len);
        return insert_at(&mut node.children[bit], key, len, value);
    }

    // Split: a new node at the common prefix takes over this slot
    let Some(old) = slot.take() else {
        return None;
    };
    let old_bit = bit_at(old.key, common);

    let mut split = if common == len {
        Node::leaf(key, len, value)
    } else {
        let mut internal = Box::new(Node {
            key: mask(key, common),
            len: common,
            value: None,
            children: [None, None],
        });
        internal.children[bit_at(key, common)] = Some(Node::leaf(key, len, value));
        internal
    };
    split.children[old_bit] = Some(old);
    *slot = Some(split);

    None
}

/// Keep the top `len` bits
#[inline]
fn mask(key: u128, len: u8) -> u128 {
    if len == 0 {
        0
    } else {
        key & (u128::MAX << (KEY_BITS - len))
    }
}

/// Bit at position `index`, counted from the most significant bit
#[inline]
fn bit_at(key: u128, index: u8) -> usize {
    ((key >> (KEY_BITS - 1 - index)) & 1) as usize
}

#[inline]
fn common_prefix(a: u128, a_len: u8, b: u128, b_len: u8) -> u8 {
    let diff = (a ^ b).leading_zeros() as u8;
    diff.min(a_len).min(b_len)
}
