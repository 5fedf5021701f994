//! Report directory persistence: write and verify a run's outcome on disk.
//!
//! # Directory layout
//!
//! ```text
//! <dir>/
//!   report.json        canonical JSON run report
//!   digest.txt         report digest ("sha256:...")
//!   world_digest.txt   digest of the world description
//!   ground_truth.json  canonical JSON comparison (only with a wiring file)
//! ```
//!
//! The directory path is never part of any hash surface.
//!
//! # Fail-closed verification
//!
//! - Missing `report.json`, `digest.txt` or `world_digest.txt` -> error
//! - Files outside the layout -> error
//! - Non-canonical `report.json` or `ground_truth.json` -> error
//! - Digest mismatch -> error

use std::path::Path;

use tracing::info;

use linkscout_kernel::proof::canon::canonical_json_bytes;
use linkscout_kernel::proof::hash::{canonical_hash, ContentHash, DOMAIN_RUN_REPORT};

use crate::error::HarnessError;
use crate::runner::RunOutcomeV1;

pub const REPORT_FILENAME: &str = "report.json";
pub const DIGEST_FILENAME: &str = "digest.txt";
pub const WORLD_DIGEST_FILENAME: &str = "world_digest.txt";
pub const COMPARISON_FILENAME: &str = "ground_truth.json";

const KNOWN_FILENAMES: &[&str] = &[
    REPORT_FILENAME,
    DIGEST_FILENAME,
    WORLD_DIGEST_FILENAME,
    COMPARISON_FILENAME,
];

/// Write `outcome` into `dir`, creating it if needed.
///
/// # Errors
///
/// [`HarnessError::Io`] on file system errors, [`HarnessError::Canon`] if
/// canonicalization fails.
pub fn write_report_dir(outcome: &RunOutcomeV1, dir: &Path) -> Result<ContentHash, HarnessError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| HarnessError::io(&format!("creating {}", dir.display()), &e))?;

    let report_bytes = outcome.report.to_canonical_json_bytes()?;
    let digest = canonical_hash(DOMAIN_RUN_REPORT, &report_bytes);
    write_file(dir, REPORT_FILENAME, &report_bytes)?;
    write_file(dir, DIGEST_FILENAME, digest.as_str().as_bytes())?;
    write_file(dir, WORLD_DIGEST_FILENAME, outcome.world_digest.as_str().as_bytes())?;
    if let Some(cmp) = &outcome.comparison {
        write_file(dir, COMPARISON_FILENAME, &canonical_json_bytes(&cmp.to_json_value())?)?;
    }
    info!(dir = %dir.display(), digest = %digest.as_str(), "report directory written");
    Ok(digest)
}

/// Check a report directory and return its report digest.
///
/// # Errors
///
/// [`HarnessError::Verify`] for any layout, canonical-form or digest
/// violation; [`HarnessError::Io`] if the directory cannot be read.
pub fn verify_report_dir(dir: &Path) -> Result<ContentHash, HarnessError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| HarnessError::io(&format!("listing {}", dir.display()), &e))?;
    for entry in entries {
        let entry = entry.map_err(|e| HarnessError::io("reading directory entry", &e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !KNOWN_FILENAMES.contains(&name.as_str()) {
            return Err(verify_error(format!("unexpected file {name}")));
        }
    }

    let report_bytes = read_required(dir, REPORT_FILENAME)?;
    check_canonical(REPORT_FILENAME, &report_bytes)?;
    let stored = String::from_utf8(read_required(dir, DIGEST_FILENAME)?)
        .map_err(|_| verify_error(format!("{DIGEST_FILENAME} is not UTF-8")))?;
    let stored = ContentHash::parse(stored.trim())
        .ok_or_else(|| verify_error(format!("{DIGEST_FILENAME} is not a content hash")))?;
    let recomputed = canonical_hash(DOMAIN_RUN_REPORT, &report_bytes);
    if stored != recomputed {
        return Err(verify_error(format!(
            "digest mismatch: stored {}, recomputed {}",
            stored.as_str(),
            recomputed.as_str()
        )));
    }

    read_required(dir, WORLD_DIGEST_FILENAME)?;
    let comparison = dir.join(COMPARISON_FILENAME);
    if comparison.exists() {
        let bytes = std::fs::read(&comparison)
            .map_err(|e| HarnessError::io(&format!("reading {}", comparison.display()), &e))?;
        check_canonical(COMPARISON_FILENAME, &bytes)?;
    }
    Ok(recomputed)
}

fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> Result<(), HarnessError> {
    let path = dir.join(name);
    std::fs::write(&path, bytes).map_err(|e| HarnessError::io(&format!("writing {}", path.display()), &e))
}

fn read_required(dir: &Path, name: &str) -> Result<Vec<u8>, HarnessError> {
    let path = dir.join(name);
    if !path.exists() {
        return Err(verify_error(format!("missing {name}")));
    }
    std::fs::read(&path).map_err(|e| HarnessError::io(&format!("reading {}", path.display()), &e))
}

fn check_canonical(name: &str, bytes: &[u8]) -> Result<(), HarnessError> {
    let value: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|e| verify_error(format!("{name} is not JSON: {e}")))?;
    if canonical_json_bytes(&value)? != bytes {
        return Err(verify_error(format!("{name} is not in canonical form")));
    }
    Ok(())
}

fn verify_error(detail: String) -> HarnessError {
    HarnessError::Verify { detail }
}
