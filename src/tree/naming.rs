//! Collision-safe child naming.
//!
//! Sibling filenames are unique within a directory. A proposed name that is
//! already taken gets a space-separated counter between base and extension:
//! `hello.txt`, `hello 1.txt`, `hello 2.txt`, and so on.

use crate::pathutil::split_extension;
use unicode_normalization::UnicodeNormalization;

/// Normalize a proposed filename: NFC form, path separators and NULs
/// stripped.
///
/// Uniqueness checks compare normalized names, so two byte-level spellings
/// of the same name cannot coexist as siblings.
pub(crate) fn sanitize(proposed: &str) -> String {
    proposed
        .chars()
        .filter(|c| *c != '/' && *c != '\0')
        .nfc()
        .collect()
}

/// Pick the first free name for `proposed` given an occupancy probe.
pub(crate) fn resolve_collision(proposed: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(proposed) {
        return proposed.to_string();
    }
    let (base, ext) = split_extension(proposed);
    let mut n = 1u64;
    loop {
        let candidate = format!("{base} {n}{ext}");
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
