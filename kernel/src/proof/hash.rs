//! Content-addressed digests with domain separation.
//!
//! Algorithm: SHA-256. Result format: `"sha256:<hex_digest>"`.
//! Each domain prefix is null-terminated so no two domains can produce the
//! same preimage.

use sha2::{Digest, Sha256};

/// A content-addressed hash with algorithm identifier.
///
/// Invariant: the inner string always contains exactly one `:` separator,
/// with non-empty substrings on both sides (enforced by [`ContentHash::parse`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash {
    full: String,
    colon: usize,
}

impl ContentHash {
    /// Parse from `"algorithm:hex"` format. `None` if malformed.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let colon = s.find(':')?;
        if colon == 0 || colon == s.len() - 1 {
            return None;
        }
        Some(Self {
            full: s.to_string(),
            colon,
        })
    }

    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.full[..self.colon]
    }

    #[must_use]
    pub fn hex_digest(&self) -> &str {
        &self.full[self.colon + 1..]
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.full
    }
}

/// Domain prefix for run report digests.
pub const DOMAIN_RUN_REPORT: &[u8] = b"LINKSCOUT::RUN_REPORT::V1\0";

/// Domain prefix for trace fingerprints.
pub const DOMAIN_TRACE: &[u8] = b"LINKSCOUT::TRACE::V1\0";

/// Domain prefix for world description digests.
pub const DOMAIN_WORLD: &[u8] = b"LINKSCOUT::WORLD::V1\0";

/// SHA-256 over `domain || data`.
#[must_use]
pub fn canonical_hash(domain: &[u8], data: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(data);
    let digest = hasher.finalize();
    let full = format!("sha256:{}", hex::encode(digest));
    let colon = "sha256".len();
    ContentHash { full, colon }
}
