//! Content hashing used by the files index and repository index cache
//! invalidation (not the per-package SHA-1 used by the archive container,
//! which lives in `coralpkg-archive`).

use std::fmt;
use std::hash::Hasher;

/// A 128-bit content digest, truncated from a `blake3` hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    #[must_use]
    pub fn of_bytes(data: &[u8]) -> Self {
        let full = blake3::hash(data);
        let mut out = [0u8; 16];
        out.copy_from_slice(&full.as_bytes()[..16]);
        Self(out)
    }

    #[must_use]
    pub fn of_str(s: &str) -> Self {
        Self::of_bytes(s.as_bytes())
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[must_use]
    pub fn into_bytes(self) -> [u8; 16] {
        self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Incremental hasher wrapping `blake3`, for hashing a file's contents
/// without loading the whole thing into memory at once.
#[derive(Debug, Default)]
pub struct ContentHasher(blake3::Hasher);

impl ContentHasher {
    #[must_use]
    pub fn new() -> Self {
        Self(blake3::Hasher::new())
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }

    #[must_use]
    pub fn finish_content_hash(&self) -> ContentHash {
        let full = self.0.finalize();
        let mut out = [0u8; 16];
        out.copy_from_slice(&full.as_bytes()[..16]);
        ContentHash(out)
    }
}

impl Hasher for ContentHasher {
    fn finish(&self) -> u64 {
        let full = self.0.finalize();
        u64::from_le_bytes(full.as_bytes()[..8].try_into().unwrap())
    }

    fn write(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_bytes_hash_identically() {
        let a = ContentHash::of_str("hello");
        let b = ContentHash::of_str("hello");
        assert_eq!(a, b);
    }

    #[test]
    fn different_bytes_hash_differently() {
        assert_ne!(ContentHash::of_str("hello"), ContentHash::of_str("world"));
    }

    #[test]
    fn incremental_matches_one_shot() {
        let mut h = ContentHasher::new();
        h.update(b"hel");
        h.update(b"lo");
        assert_eq!(h.finish_content_hash(), ContentHash::of_str("hello"));
    }
}
