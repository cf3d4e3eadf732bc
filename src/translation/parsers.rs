//! Byte-level checks the placeholder scanner uses to enter and leave comments and
//! dollar-quoted bodies. Each one looks at `bytes[idx..]` without consuming anything.

pub(super) fn starts_line_comment(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx..idx + 2) == Some(b"--")
}

pub(super) fn starts_block_comment(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx..idx + 2) == Some(b"/*")
}

pub(super) fn ends_block_comment(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx..idx + 2) == Some(b"*/")
}

/// Opening `$tag$` (or `$$`) at `start`, returning the tag and the index of its closing `$`.
///
/// A `$` followed by a digit is a `$N` placeholder and never opens a body.
pub(super) fn open_dollar_quote(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    if bytes.get(start + 1).is_some_and(u8::is_ascii_digit) {
        return None;
    }
    let tag_len = bytes
        .get(start + 1..)?
        .iter()
        .position(|&b| !(b.is_ascii_alphanumeric() || b == b'_'))?;
    let close = start + 1 + tag_len;
    if bytes[close] != b'$' {
        return None;
    }
    let tag = std::str::from_utf8(&bytes[start + 1..close]).ok()?;
    Some((tag.to_string(), close))
}

/// Whether the `$` at `idx` begins the `$tag$` that closes the current body.
pub(super) fn closes_dollar_quote(bytes: &[u8], idx: usize, tag: &str) -> bool {
    let end = idx + 1 + tag.len();
    bytes.get(idx + 1..end) == Some(tag.as_bytes()) && bytes.get(end) == Some(&b'$')
}
