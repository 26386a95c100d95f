//! Deterministic 64-bit hashes for type names and structural signatures.
//!
//! [`TypeHash`] keys the type registry's alias table and gives overload
//! matching a cheap pre-filter: two parameter lists whose signature hashes
//! differ can never be structurally equal, so the full recursive comparison
//! only runs on hash hits.
//!
//! ```
//! use netpolicy_core::TypeHash;
//!
//! assert_eq!(TypeHash::from_name("conn_id"), TypeHash::from_name("conn_id"));
//! assert_ne!(TypeHash::from_name("conn_id"), TypeHash::from_name("connection"));
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants.
pub mod hash_constants {
    /// Separator used when folding components together.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for type names.
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for structural signatures.
    pub const SIGNATURE: u64 = 0x5ea77ffbcdf5f302;

    /// Per-position markers so component order matters.
    pub const POSITION_MARKERS: [u64; 8] = [
        0x9e3779b97f4a7c15,
        0xbf58476d1ce4e5b9,
        0x94d049bb133111eb,
        0xd6e8feb86659fd93,
        0xe7037ed1a0b428db,
        0xc6a4a7935bd1e995,
        0x8648dbbc94d49b8d,
        0xa2b48b2c69e0d657,
    ];
}

/// A deterministic 64-bit hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty hash.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Hash of a (fully qualified) type name.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Hash of a leaf structural tag (e.g. `count`, `record`).
    #[inline]
    pub fn from_tag(tag: &str) -> Self {
        TypeHash(hash_constants::SIGNATURE ^ xxh64(tag.as_bytes(), 0))
    }

    /// Fold ordered component hashes into a parent hash.
    ///
    /// `combine(a, [b, c])` differs from `combine(a, [c, b])`.
    pub fn combine(self, parts: &[TypeHash]) -> Self {
        let mut hash = self.0;
        for (i, part) in parts.iter().enumerate() {
            let marker = hash_constants::POSITION_MARKERS
                [i % hash_constants::POSITION_MARKERS.len()]
            .wrapping_add(i as u64);
            hash = hash
                .wrapping_mul(hash_constants::SEP)
                .wrapping_add(marker ^ part.0);
        }
        TypeHash(hash)
    }

    /// Whether this is the empty hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
