//! Percent-decoding and re-encoding helpers shared by the host and path
//! normalizers.
//!
//! The decoder here is deliberately not a plain single-pass decoder: it
//! decodes repeatedly, so `%2525252525252525` collapses all the way down
//! to `%`. That matches what browsers end up displaying and is what the
//! normalizers need to compare attacker-supplied URLs against clean ones.

use std::borrow::Cow;

use crate::char_util::{is_hex, is_whitespace};

/// Decode percent-encoded sequences iteratively, with backtracking.
///
/// Whenever a `%XX` pair decodes, the result may itself complete an
/// earlier, previously undecodable `%` sequence; a stack of those pending
/// `%` positions lets the scan jump back instead of restarting. The string
/// shrinks on every accepted decode, so the loop terminates.
pub(crate) fn decode(url: &str) -> String {
    let mut chars: Vec<char> = url.chars().collect();
    let mut pending_percents: Vec<isize> = Vec::new();

    let mut i: isize = 0;
    while i < chars.len() as isize - 2 {
        let idx = i as usize;
        if chars[idx] == '%' {
            if is_hex(chars[idx + 1]) && is_hex(chars[idx + 2]) {
                let hi = chars[idx + 1].to_digit(16).unwrap_or(0);
                let lo = chars[idx + 2].to_digit(16).unwrap_or(0);
                let decoded = char::from_u32(hi * 16 + lo).unwrap_or('\u{FFFD}');
                chars.splice(idx..idx + 3, [decoded]);

                if decoded == '%' {
                    // re-examine this position, it may start another escape
                    i -= 1;
                } else if !pending_percents.is_empty()
                    && is_hex(decoded)
                    && is_hex(chars[idx - 1])
                    && i - pending_percents.last().copied().unwrap_or(0) == 2
                {
                    // the decode completed a %[HEX][HEX] at the last pending
                    // percent sign, so jump back to it
                    i = pending_percents.pop().unwrap_or(0) - 1;
                } else if !pending_percents.is_empty() && idx == chars.len() - 2 {
                    // %[HEX][unknown] at the end of the string
                    i = pending_percents.pop().unwrap_or(0) - 1;
                }
            } else {
                pending_percents.push(i);
            }
        }
        i += 1;
    }

    chars.into_iter().collect()
}

/// Fast check for TAB/CR/LF or a space anywhere in the input.
pub(crate) fn has_special_whitespace(input: &str) -> bool {
    let bytes = input.as_bytes();
    memchr::memchr3(b'\t', b'\n', b'\r', bytes).is_some() || memchr::memchr(b' ', bytes).is_some()
}

/// Remove TAB (0x09), LF (0x0A), CR (0x0D), and ASCII space from the
/// input. Returns a borrow when nothing needs stripping.
pub(crate) fn remove_special_spaces(url_part: &str) -> Cow<'_, str> {
    if !has_special_whitespace(url_part) {
        return Cow::Borrowed(url_part);
    }
    Cow::Owned(url_part.chars().filter(|&c| !is_whitespace(c)).collect())
}

/// Re-encode everything outside the printable ASCII range, plus `#` and
/// `%`, as an uppercase `%XX` escape of the unit's low byte.
pub(crate) fn encode(url: &str) -> String {
    let mut encoded = String::with_capacity(url.len());
    for c in url.chars() {
        let low = (c as u32 & 0xFF) as u8;
        if low <= 0x20 || low >= 0x7F || c == '#' || c == '%' {
            encoded.push_str(&format!("%{low:02X}"));
        } else {
            encoded.push(c);
        }
    }
    encoded
}

/// Collapse runs of dots to a single dot and strip leading and trailing
/// dots: `.lalal.....com.` becomes `lalal.com`.
pub(crate) fn remove_extra_dots(host: &str) -> String {
    let mut result = String::with_capacity(host.len());
    let mut prev_dot = false;
    for c in host.chars() {
        if c == '.' {
            if prev_dot || result.is_empty() {
                continue;
            }
            prev_dot = true;
        } else {
            prev_dot = false;
        }
        result.push(c);
    }
    if result.ends_with('.') {
        result.pop();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode() {
        let cases = [
            ("%%32%35", "%"),
            ("%2%35", "%"),
            ("%%325", "%"),
            ("%%32%3525", "%"),
            ("%%%32%35", "%%"),
            ("%%32%35%", "%%"),
            ("%%32%3532", "2"),
            ("%%%32%3532%%32%3535", "%"),
            ("/%25%32%35", "/%"),
            ("/%2%2%2", "/%2%2%2"),
            ("/%2%%335", "/%"),
            ("/%25%32%35%25%32%35", "/%%"),
            ("/%2525252525252525", "/%"),
            ("/asdf%25%32%35asd", "/asdf%asd"),
            ("/%%%25%32%35asd%%", "/%%%asd%%"),
            (
                "/%2E%73%65%63%75%72%65/%77%77%77%2E%65%62%61%79%2E%63%6F%6D/",
                "/.secure/www.ebay.com/",
            ),
            ("/uploads/%20%20%20%20/", "/uploads/    /"),
            (
                "/%257Ea%2521b%2540c%2523d%2524e%25f%255E00%252611%252A22%252833%252944_55%252B",
                "/~a!b@c#d$e%f^00&11*22(33)44_55+",
            ),
        ];
        for (input, expected) in cases {
            assert_eq!(decode(input), expected, "input: {input:?}");
        }
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode("/lnjbk%"), "/lnjbk%25");
        assert_eq!(encode("/%2%2%2"), "/%252%252%252");
        assert_eq!(encode("plain/path"), "plain/path");
        assert_eq!(encode("a b"), "a%20b");
        assert_eq!(encode("frag#ment"), "frag%23ment");
        assert_eq!(encode("\u{1}\u{80}"), "%01%80");
    }

    #[test]
    fn test_remove_special_spaces() {
        assert_eq!(remove_special_spaces("a\tb\nc\rd e"), "abcde");
        assert!(matches!(
            remove_special_spaces("clean"),
            Cow::Borrowed("clean")
        ));
    }

    #[test]
    fn test_remove_extra_dots() {
        let cases = [
            (".s..ales.....com", "s.ales.com"),
            ("33r.nEt...", "33r.nEt"),
            ("[::-34:50]...", "[::-34:50]"),
            ("asdf.[-34::192.168.34.-3]...", "asdf.[-34::192.168.34.-3]"),
            (".", ""),
        ];
        for (input, expected) in cases {
            assert_eq!(remove_extra_dots(input), expected, "input: {input:?}");
        }
    }
}
