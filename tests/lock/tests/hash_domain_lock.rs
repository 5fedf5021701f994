//! Hash domain governance lock tests.
//!
//! Proves:
//! 1. All domain byte strings are unique
//! 2. All domains are null-terminated
//! 3. All domains follow `LINKSCOUT::*::V1\0` naming
//! 4. Digests computed for the same bytes differ across domains

use std::collections::BTreeSet;

use linkscout_kernel::proof::hash::{canonical_hash, DOMAIN_RUN_REPORT, DOMAIN_TRACE, DOMAIN_WORLD};

const ALL: [&[u8]; 3] = [DOMAIN_RUN_REPORT, DOMAIN_TRACE, DOMAIN_WORLD];

fn name(domain: &[u8]) -> String {
    String::from_utf8_lossy(domain).into_owned()
}

// ---------------------------------------------------------------------------
// 1. Unique
// ---------------------------------------------------------------------------

#[test]
fn hash_domain_all_unique_bytes() {
    let mut seen = BTreeSet::new();
    for domain in ALL {
        assert!(seen.insert(domain), "duplicate domain bytes: {}", name(domain));
    }
}

// ---------------------------------------------------------------------------
// 2. Null-terminated
// ---------------------------------------------------------------------------

#[test]
fn hash_domain_all_null_terminated() {
    for domain in ALL {
        assert!(domain.ends_with(&[0]), "{} is not null-terminated", name(domain));
        assert_eq!(
            domain.iter().filter(|&&b| b == 0).count(),
            1,
            "{} has an interior null byte",
            name(domain)
        );
    }
}

// ---------------------------------------------------------------------------
// 3. Naming convention
// ---------------------------------------------------------------------------

#[test]
fn hash_domain_all_follow_naming_convention() {
    for domain in ALL {
        assert!(domain.starts_with(b"LINKSCOUT::"), "{} does not start with LINKSCOUT::", name(domain));
        assert!(domain.ends_with(b"::V1\0"), "{} does not end with ::V1\\0", name(domain));
    }
}

// ---------------------------------------------------------------------------
// 4. Separation
// ---------------------------------------------------------------------------

#[test]
fn same_payload_hashes_differently_per_domain() {
    let digests: BTreeSet<String> = ALL
        .iter()
        .map(|d| canonical_hash(d, b"b1\nb2").as_str().to_string())
        .collect();
    assert_eq!(digests.len(), ALL.len());
}
