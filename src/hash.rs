//! Row fingerprinting

use crate::record::Record;
use blake3::Hasher;
use serde::{Serialize, Serializer};
use std::fmt;

/// Marker hashed in place of an absent value
pub const NULL_MARKER: &str = "NULL";

/// 64-bit content digest of a row's value columns.
///
/// Taken from the first eight bytes (little-endian) of a 256-bit BLAKE3 hash.
/// Equal fingerprints are treated as equal content: two different rows that
/// collide would be reported as unchanged. The chance of that is about
/// n² / 2⁶⁵ for n rows per entity and is accepted rather than detected.
///
/// Absence is hashed as the text `NULL`, so a cell holding the literal text
/// `NULL` fingerprints the same as an absent cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(pub u64);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Computes fingerprints over `name=value|` sequences
#[derive(Debug, Clone, Copy, Default)]
pub struct FingerprintComputer;

impl FingerprintComputer {
    pub fn new() -> Self {
        Self
    }

    /// Fingerprint a record in its own column order
    pub fn fingerprint(&self, record: &Record) -> Fingerprint {
        self.fingerprint_pairs(record.iter())
    }

    /// Fingerprint an arbitrary ordered sequence of (column, value) pairs
    pub fn fingerprint_pairs<'a, I>(&self, pairs: I) -> Fingerprint
    where
        I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
    {
        let mut hasher = Hasher::new();
        for (name, value) in pairs {
            hasher.update(name.as_bytes());
            hasher.update(b"=");
            hasher.update(value.unwrap_or(NULL_MARKER).as_bytes());
            hasher.update(b"|");
        }
        let digest = hasher.finalize();
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest.as_bytes()[..8]);
        Fingerprint(u64::from_le_bytes(prefix))
    }
}
