//! Identifier algebra over a small circular key space.
//!
//! The ring has `2^M` positions. Every node and every file name is mapped
//! onto one of them by [`Identify::identifier`], which hashes the relevant
//! bytes with SHA-256 and keeps the low `M` bits. `M` is fixed at compile
//! time: every peer in a ring must agree on it, so it is not something a
//! single node can be configured with independently of the rest of the
//! ring.
//!
//! [`in_arc`] is the one predicate the rest of the routing code is built
//! on: "does key `k` lie in the half-open arc `(a, b]`, wrapping through
//! zero if necessary".

use ring::digest;
use std::fmt;
use std::net::SocketAddr;

/// Number of bits in the identifier space.
pub const M: u32 = 8;

/// Size of the identifier space, `2^M`.
pub const KEY_SPACE: u64 = 1 << M;

/// A key on the `2^M`-point identifier circle.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Identifier(u64);

impl Identifier {
    /// Wraps a raw value into the identifier space.
    pub fn new(raw: u64) -> Self {
        Identifier(raw % KEY_SPACE)
    }

    fn generate(bytes: &[u8]) -> Self {
        let digest = digest::digest(&digest::SHA256, bytes);
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&digest.as_ref()[..8]);
        Identifier::new(u64::from_be_bytes(raw))
    }

    /// Returns `self + 2^i mod 2^M`, the target key of finger table entry `i`.
    pub fn plus_power_of_two(self, i: u32) -> Self {
        Identifier::new(self.0 + (1u64 << i))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Identifier({})", self.0)
    }
}

/// Returns whether `k` lies in the half-open arc `(a, b]` on the ring.
///
/// `a == b` denotes the full ring: every key lies in it. Otherwise, if
/// `a < b` the arc does not wrap and the condition is `a < k <= b`; if
/// `a >= b` the arc wraps through zero and the condition is
/// `k > a || k <= b`.
pub fn in_arc(k: Identifier, a: Identifier, b: Identifier) -> bool {
    if a == b {
        return true;
    }

    if a < b {
        a < k && k <= b
    } else {
        k > a || k <= b
    }
}

/// Obtains an [`Identifier`] for a value by hashing some representation of it.
pub trait Identify {
    fn identifier(&self) -> Identifier;
}

/// A node's identifier is derived from the port it listens on.
impl Identify for SocketAddr {
    fn identifier(&self) -> Identifier {
        Identifier::generate(&self.port().to_be_bytes())
    }
}

/// A file's identifier is derived from its name.
impl Identify for str {
    fn identifier(&self) -> Identifier {
        Identifier::generate(self.as_bytes())
    }
}

impl Identify for String {
    fn identifier(&self) -> Identifier {
        self.as_str().identifier()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(v: u64) -> Identifier {
        Identifier::new(v)
    }

    #[test]
    fn in_arc_full_ring_when_equal() {
        for k in 0..KEY_SPACE {
            assert!(in_arc(id(k), id(7), id(7)));
        }
    }

    #[test]
    fn in_arc_non_wrapping() {
        assert!(!in_arc(id(10), id(10), id(20)));
        assert!(in_arc(id(11), id(10), id(20)));
        assert!(in_arc(id(20), id(10), id(20)));
        assert!(!in_arc(id(21), id(10), id(20)));
    }

    #[test]
    fn in_arc_wrapping() {
        // arc (250, 5]: wraps through 0
        assert!(in_arc(id(251), id(250), id(5)));
        assert!(in_arc(id(255), id(250), id(5)));
        assert!(in_arc(id(0), id(250), id(5)));
        assert!(in_arc(id(5), id(250), id(5)));
        assert!(!in_arc(id(6), id(250), id(5)));
        assert!(!in_arc(id(250), id(250), id(5)));
    }

    #[test]
    fn in_arc_covers_every_key_exactly_once_per_point() {
        // every key other than `a` lies in the arc (a, a] trivially (full ring);
        // for a proper arc (a, b] with a != b, every key is in exactly one of
        // (a, b] and (b, a].
        let a = id(30);
        let b = id(90);
        for k in 0..KEY_SPACE {
            let k = id(k);
            assert_ne!(in_arc(k, a, b), in_arc(k, b, a));
        }
    }

    #[test]
    fn port_hash_is_deterministic() {
        let addr1: SocketAddr = "127.0.0.1:1111".parse().unwrap();
        let addr2: SocketAddr = "10.0.0.5:1111".parse().unwrap();
        assert_eq!(addr1.identifier(), addr2.identifier());

        let addr3: SocketAddr = "127.0.0.1:2222".parse().unwrap();
        assert_ne!(addr1.identifier(), addr3.identifier());
    }

    #[test]
    fn plus_power_of_two_wraps() {
        let base = id(KEY_SPACE - 1);
        assert_eq!(base.plus_power_of_two(0), id(0));
    }
}
