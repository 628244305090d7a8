//! Locating the boundary between the stub and the manifest.
//!
//! The stub is followed by the PHP halt directive; everything after the
//! directive is the archive proper.

/// Token that ends script execution; it must not appear inside a stub
pub const HALT_TOKEN: &[u8] = b"__HALT_COMPILER();";

/// Marker written between the stub and the manifest
pub const HALT_MARKER: &[u8] = b"__HALT_COMPILER(); ?>\r\n";

/// Find the halt directive. Returns the length of the stub (the offset of the
/// token) and the offset where the manifest starts.
///
/// The token may be followed by ` ?>` and then by `\r\n` or `\n`, which are
/// part of the marker.
pub fn find_halt(data: &[u8]) -> Option<(usize, usize)> {
    let stub_len = find(data, HALT_TOKEN)?;
    let mut pos = stub_len + HALT_TOKEN.len();

    if data[pos..].starts_with(b" ?>") {
        pos += 3;
    }
    if data[pos..].starts_with(b"\r\n") {
        pos += 2;
    } else if data[pos..].starts_with(b"\n") {
        pos += 1;
    }
    Some((stub_len, pos))
}

pub fn contains_halt(stub: &[u8]) -> bool {
    find(stub, HALT_TOKEN).is_some()
}

/// Cut a trailing halt directive off a stub written for PHP, such as
/// `<?php ... __HALT_COMPILER(); ?>`, so it can be stored as a stub.
/// Stubs without the directive are returned unchanged.
pub fn strip_halt(code: &[u8]) -> &[u8] {
    match find_halt(code) {
        Some((stub_len, end)) if code[end..].iter().all(u8::is_ascii_whitespace) => {
            &code[..stub_len]
        }
        _ => code,
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_variants() {
        assert_eq!(find_halt(b"STUB\n__HALT_COMPILER(); ?>\r\nXX"), Some((5, 28)));
        assert_eq!(find_halt(b"<?php __HALT_COMPILER(); ?>\nXX"), Some((6, 28)));
        assert_eq!(find_halt(b"__HALT_COMPILER();XX"), Some((0, 18)));
        assert_eq!(find_halt(b"no marker here"), None);
    }

    #[test]
    fn strip_php_stub() {
        let code = b"#!/usr/bin/env php\n<?php\nPhar::mapPhar(__FILE__);\n__HALT_COMPILER(); ?>";
        assert_eq!(
            strip_halt(code),
            &b"#!/usr/bin/env php\n<?php\nPhar::mapPhar(__FILE__);\n"[..]
        );
        assert_eq!(strip_halt(b"STUB\n"), &b"STUB\n"[..]);
    }

    #[test]
    fn halt_in_middle_is_kept() {
        let code = b"__HALT_COMPILER(); ?>\necho 1;";
        assert_eq!(strip_halt(code), &code[..]);
        assert!(contains_halt(code));
    }
}
