//! Import path normalization and comparison.
//!
//! Import paths are slash-separated regardless of host OS. Vendored
//! dependencies live under a `vendor/` directory and are referenced in
//! import statements by the path *after* the last vendor segment, so the
//! index stores both forms and strips the indirection here.

use std::path::Path;

use memchr::memmem;
use once_cell::sync::Lazy;

const VENDOR_SEGMENT: &str = "/vendor/";
const VENDOR_PREFIX: &str = "vendor/";

/// Devendorize an import path for use in an import statement, and report
/// whether anything was stripped.
///
/// `"foo/bar/vendor/a/b"` becomes `("a/b", true)`; a path with no vendor
/// segment is returned unchanged.
///
/// This runs once per visited file, so the reverse scan uses
/// `memmem::rfind` rather than allocating or walking char-by-char.
pub fn devendor(ipath: &str) -> (&str, bool) {
    if let Some(i) = memmem::rfind(ipath.as_bytes(), VENDOR_SEGMENT.as_bytes()) {
        return (&ipath[i + VENDOR_SEGMENT.len()..], true);
    }
    if let Some(rest) = ipath.strip_prefix(VENDOR_PREFIX) {
        return (rest, true);
    }
    (ipath, false)
}

/// Whether `ipath` names an `internal` package or lives below one.
pub fn has_internal_segment(ipath: &str) -> bool {
    ipath == "internal"
        || ipath.starts_with("internal/")
        || ipath.ends_with("/internal")
        || ipath.contains("/internal/")
}

/// Filesystem case sensitivity, probed once per process: stat the working
/// directory under a case-swapped spelling and see if it is the same file.
static CASE_SENSITIVE: Lazy<bool> = Lazy::new(detect_case_sensitive);

#[cfg(unix)]
fn detect_case_sensitive() -> bool {
    use std::os::unix::fs::MetadataExt;

    let Ok(wd) = std::env::current_dir() else {
        return true;
    };
    let Ok(here) = std::fs::metadata(&wd) else {
        return true;
    };
    let swapped: String = wd
        .to_string_lossy()
        .chars()
        .map(|c| {
            if c.is_ascii_uppercase() {
                c.to_ascii_lowercase()
            } else if c.is_ascii_lowercase() {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect();
    match std::fs::metadata(&swapped) {
        Ok(dup) => !(dup.dev() == here.dev() && dup.ino() == here.ino()),
        Err(_) => true,
    }
}

#[cfg(not(unix))]
fn detect_case_sensitive() -> bool {
    false
}

/// Raw prefix comparison used by the vendor/internal scope rule.
///
/// Case-folded on filesystems detected as case-insensitive. Operates on
/// bytes so a prefix length landing inside a multi-byte character compares
/// unequal instead of panicking.
pub fn has_path_prefix(s: &str, prefix: &str) -> bool {
    if s.len() < prefix.len() {
        return false;
    }
    let head = &s.as_bytes()[..prefix.len()];
    if *CASE_SENSITIVE {
        head == prefix.as_bytes()
    } else {
        head.eq_ignore_ascii_case(prefix.as_bytes())
    }
}

/// Canonicalize path separators to forward slashes.
pub fn to_slash(path: &Path) -> String {
    #[cfg(windows)]
    {
        path.to_string_lossy().replace('\\', "/")
    }
    #[cfg(not(windows))]
    {
        path.to_string_lossy().into_owned()
    }
}
