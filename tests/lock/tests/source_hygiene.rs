//! Source hygiene lock tests.
//!
//! - Library code propagates errors: no `.unwrap()` or `.expect(` outside
//!   `#[cfg(test)]` blocks in kernel, search and harness.
//! - Raw `LINKSCOUT::` domain literals live only in `hash.rs`.
//! - Canonical JSON is produced in exactly one place.
//! - Library crates never install a tracing subscriber.
//! - The search crate does not depend on the harness.

use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};

const LIBRARY_CRATES: [&str; 3] = ["kernel", "search", "harness"];

/// Files compiled only under `cfg(test)` as a whole.
const TEST_ONLY_FILES: [&str; 1] = ["test_world.rs"];

fn workspace_root() -> &'static Path {
    // lock-tests lives at tests/lock/, so workspace root is ../..
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("tests/ exists")
        .parent()
        .expect("workspace root exists")
}

fn rs_files(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let Ok(entries) = fs::read_dir(dir) else {
        return out;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            out.extend(rs_files(&path));
        } else if path.extension().is_some_and(|e| e == "rs") {
            out.push(path);
        }
    }
    out.sort();
    out
}

fn library_sources() -> Vec<PathBuf> {
    LIBRARY_CRATES
        .iter()
        .flat_map(|c| rs_files(&workspace_root().join(c).join("src")))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| !TEST_ONLY_FILES.contains(&n))
        })
        .collect()
}

/// Non-comment lines outside `#[cfg(test)]` blocks, with 1-based numbers.
fn production_lines(content: &str) -> Vec<(usize, &str)> {
    let mut lines = Vec::new();
    let mut brace_depth: usize = 0;
    let mut skip_depth: Option<usize> = None;
    let mut cfg_test_pending = false;

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.contains("#[cfg(test)]") {
            cfg_test_pending = true;
            continue;
        }

        let opens = line.chars().filter(|&c| c == '{').count();
        let closes = line.chars().filter(|&c| c == '}').count();
        if cfg_test_pending && opens > 0 {
            skip_depth = Some(brace_depth);
            cfg_test_pending = false;
        }
        // A braceless item such as `mod tests;` ends the attribute's reach.
        if cfg_test_pending && trimmed.ends_with(';') {
            cfg_test_pending = false;
            continue;
        }
        brace_depth = brace_depth.saturating_add(opens).saturating_sub(closes);

        if let Some(depth) = skip_depth {
            if brace_depth <= depth {
                skip_depth = None;
            }
            continue;
        }
        if trimmed.starts_with("//") {
            continue;
        }
        lines.push((i + 1, trimmed));
    }
    lines
}

fn scan(pattern_hit: impl Fn(&Path, &str) -> bool) -> Vec<String> {
    let mut violations = Vec::new();
    for path in library_sources() {
        let Ok(content) = fs::read_to_string(&path) else {
            continue;
        };
        for (line_no, line) in production_lines(&content) {
            if pattern_hit(&path, line) {
                violations.push(format!("  {}:{line_no}: {line}", path.display()));
            }
        }
    }
    violations
}

fn report(title: &str, violations: &[String]) {
    if violations.is_empty() {
        return;
    }
    let mut msg = format!("{title}:\n");
    for v in violations {
        let _ = writeln!(msg, "{v}");
    }
    panic!("{msg}");
}

fn file_name_is(path: &Path, name: &str) -> bool {
    path.file_name().and_then(|n| n.to_str()) == Some(name)
}

#[test]
fn library_code_has_no_unwrap_or_expect() {
    let violations = scan(|_, line| line.contains(".unwrap()") || line.contains(".expect("));
    report("unwrap/expect in library code", &violations);
}

#[test]
fn domain_literals_live_only_in_hash_module() {
    let violations = scan(|path, line| line.contains("b\"LINKSCOUT::") && !file_name_is(path, "hash.rs"));
    report("raw LINKSCOUT:: domain literals outside hash.rs", &violations);
}

#[test]
fn one_canonicalizer() {
    let violations = scan(|path, line| {
        line.contains("pub fn canonical_json_bytes") && !file_name_is(path, "canon.rs")
    });
    report("second canonical JSON implementation", &violations);
}

#[test]
fn libraries_do_not_install_subscribers() {
    let violations = scan(|_, line| line.contains("tracing_subscriber"));
    report("tracing_subscriber referenced from library code", &violations);
    for krate in LIBRARY_CRATES {
        let manifest = fs::read_to_string(workspace_root().join(krate).join("Cargo.toml"))
            .expect("library manifest is readable");
        assert!(
            !manifest.contains("tracing-subscriber"),
            "{krate}/Cargo.toml depends on tracing-subscriber"
        );
    }
}

#[test]
fn search_does_not_depend_on_harness() {
    let manifest = fs::read_to_string(workspace_root().join("search").join("Cargo.toml"))
        .expect("search manifest is readable");
    assert!(!manifest.contains("linkscout-harness"));
    let violations: Vec<String> = rs_files(&workspace_root().join("search").join("src"))
        .into_iter()
        .filter(|p| {
            fs::read_to_string(p).is_ok_and(|c| c.contains("linkscout_harness::"))
        })
        .map(|p| p.display().to_string())
        .collect();
    report("search source references the harness", &violations);
}
