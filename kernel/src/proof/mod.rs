//! Proof module: canonical JSON bytes and content-addressed digests.

pub mod canon;
pub mod hash;
