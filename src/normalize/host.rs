//! Host canonicalization: IDN conversion, lowercasing, repeated decoding,
//! and rewriting numeric hosts into canonical IP text.

use core::fmt::Write;

use crate::char_util::{is_hex, split_by_dot};
use crate::url_util::{decode, encode, remove_extra_dots};

/// The largest value of an undotted numeric host.
const MAX_NUMERIC_DOMAIN_VALUE: u64 = 4_294_967_295;

/// The largest value of one dotted IPv4 part.
const MAX_IPV4_PART: u64 = 255;

/// The largest value of one IPv6 section.
const MAX_IPV6_PART: u32 = 0xFFFF;

/// Where the IPv4 octets of an IPv4-mapped IPv6 address live.
const IPV4_MAPPED_IPV6_START_OFFSET: usize = 12;

/// Normalize a host and derive its 16-byte IP form when it is an IP
/// address.
///
/// Returns `(normalized_host, host_bytes)`. The host comes back `None`
/// when IDN conversion fails, in which case the caller keeps the host it
/// had. IPv4 addresses are stored IPv4-mapped (`::ffff:a.b.c.d`) and
/// rendered in dotted decimal; IPv6 addresses render with all eight
/// sections spelled out.
pub(crate) fn normalize_host(host: &str) -> (Option<String>, Option<[u8; 16]>) {
    if host.is_empty() {
        return (None, None);
    }

    // replace high unicode characters; an invalid idn means no
    // normalized form
    let Some(ascii) = domain_to_ascii(host) else {
        return (None, None);
    };

    let decoded = decode(&ascii.to_lowercase());

    let bytes = try_decode_host_to_ip(&decoded);
    let host_text = match &bytes {
        Some(b) => ip_to_string(b),
        None => decoded,
    };

    if host_text.is_empty() {
        return (None, bytes);
    }

    let folded = remove_extra_dots(&host_text);
    (Some(encode(&folded).replace("\\x", "%")), bytes)
}

/// Check if 4 bytes match `xn--`, case insensitive.
fn is_punycode_prefix(slice: &[u8]) -> bool {
    slice.len() >= 4
        && matches!(slice[0], b'x' | b'X')
        && matches!(slice[1], b'n' | b'N')
        && slice[2] == b'-'
        && slice[3] == b'-'
}

/// Check if any label of the domain is a punycode A-label.
fn has_punycode(domain: &str) -> bool {
    let bytes = domain.as_bytes();
    if bytes.len() < 4 {
        return false;
    }

    if is_punycode_prefix(bytes) {
        return true;
    }

    memchr::memchr_iter(b'.', bytes).any(|pos| is_punycode_prefix(&bytes[pos + 1..]))
}

/// IDN-to-ASCII with a fast path: pure ASCII hosts without punycode
/// labels only need lowercasing. The slow path validates through the
/// full IDNA processing.
fn domain_to_ascii(domain: &str) -> Option<String> {
    if domain.is_ascii() && !has_punycode(domain) {
        return Some(domain.to_ascii_lowercase());
    }
    idna::domain_to_ascii(domain).ok()
}

/// Decode the host into a 16-byte IP representation if it is one.
fn try_decode_host_to_ip(host: &str) -> Option<[u8; 16]> {
    if host.starts_with('[') && host.ends_with(']') {
        try_decode_host_to_ipv6(host)
    } else {
        try_decode_host_to_ipv4(host)
    }
}

/// Covers every numeric host form a browser accepts:
/// hexadecimal `0x1283983`, decimal `12839273`, octal `037362273110`,
/// dotted decimal `192.168.1.1`, dotted hex `0xfe.0x83.0x18.0x1`,
/// dotted octal `0301.00.046.00`, and mixes of those.
fn try_decode_host_to_ipv4(host: &str) -> Option<[u8; 16]> {
    let parts = split_by_dot(host);
    let num_parts = parts.len();

    if num_parts != 4 && num_parts != 1 {
        return None;
    }

    let mut bytes = [0u8; 16];
    // an ipv4-mapped ipv6 address has 0xff in bytes 10 and 11
    bytes[10] = 0xff;
    bytes[11] = 0xff;

    for (i, part) in parts.iter().enumerate() {
        let (digits, base) = if let Some(hex) = part.strip_prefix("0x") {
            (hex, 16)
        } else if let Some(octal) = part.strip_prefix('0') {
            (octal, 8)
        } else {
            (part.as_str(), 10)
        };

        let section = if digits.is_empty() {
            0
        } else {
            u64::from_str_radix(digits, base).ok()?
        };

        if (num_parts == 4 && section > MAX_IPV4_PART)
            || (num_parts == 1 && section > MAX_NUMERIC_DOMAIN_VALUE)
        {
            return None;
        }

        if num_parts == 4 {
            bytes[IPV4_MAPPED_IPV6_START_OFFSET + i] = section as u8;
        } else {
            // a single number fills all four octets
            bytes[12] = (section >> 24) as u8;
            bytes[13] = (section >> 16) as u8;
            bytes[14] = (section >> 8) as u8;
            bytes[15] = section as u8;
            return Some(bytes);
        }
    }

    Some(bytes)
}

/// Parse a bracketed IPv6 host, including truncated (`::`) notation and
/// an embedded IPv4 address in the final part.
fn try_decode_host_to_ipv6(host: &str) -> Option<[u8; 16]> {
    let ip = &host[1..host.len() - 1];
    let parts: Vec<&str> = ip.split(':').collect();
    if parts.len() < 3 {
        return None;
    }

    // an embedded ipv4 address sits in the last part, before any zone index
    let last_part = parts[parts.len() - 1];
    let last_part_without_zone = match last_part.rfind('%') {
        Some(pos) => &last_part[..pos],
        None => last_part,
    };
    let ipv4_address = if !is_hex_section(last_part_without_zone) {
        try_decode_host_to_ipv4(last_part_without_zone)
    } else {
        None
    };

    let mut bytes = [0u8; 16];
    // sections to fill overall; an embedded ipv4 address takes the last two
    let total_size: usize = if ipv4_address.is_some() { 6 } else { 8 };
    let size = if ipv4_address.is_some() {
        parts.len() - 1
    } else {
        parts.len()
    };

    // zero sections inserted for a "::", e.g. [::1] fills seven
    let mut filled_zeroes = 0;

    for (i, part) in parts.iter().take(size).enumerate() {
        if part.is_empty() && i != 0 && i != parts.len() - 1 {
            filled_zeroes = total_size.saturating_sub(size);
        }

        let section = if part.is_empty() {
            0
        } else {
            u32::from_str_radix(part, 16).ok()?
        };
        if section > MAX_IPV6_PART {
            return None;
        }

        let offset = (filled_zeroes + i) * 2;
        if offset + 1 >= bytes.len() {
            return None;
        }
        bytes[offset] = (section >> 8) as u8;
        bytes[offset + 1] = section as u8;
    }

    if let Some(v4) = ipv4_address {
        bytes[IPV4_MAPPED_IPV6_START_OFFSET..].copy_from_slice(&v4[IPV4_MAPPED_IPV6_START_OFFSET..]);
    }

    Some(bytes)
}

fn is_hex_section(section: &str) -> bool {
    section.chars().all(is_hex)
}

fn is_ipv4_mapped(bytes: &[u8; 16]) -> bool {
    bytes[..10].iter().all(|&b| b == 0) && bytes[10] == 0xff && bytes[11] == 0xff
}

/// Canonical text for a 16-byte address: dotted decimal for IPv4-mapped
/// values, otherwise all eight hex sections, bracketed.
fn ip_to_string(bytes: &[u8; 16]) -> String {
    if is_ipv4_mapped(bytes) {
        return format!("{}.{}.{}.{}", bytes[12], bytes[13], bytes[14], bytes[15]);
    }

    let mut out = String::with_capacity(41);
    out.push('[');
    for i in 0..8 {
        if i > 0 {
            out.push(':');
        }
        let section = u16::from_be_bytes([bytes[2 * i], bytes[2 * i + 1]]);
        let _ = write!(out, "{section:x}");
    }
    out.push(']');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v4_mapped(octets: [u8; 4]) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes[10] = 0xff;
        bytes[11] = 0xff;
        bytes[12..].copy_from_slice(&octets);
        bytes
    }

    fn v6(sections: [u16; 8]) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        for (i, section) in sections.into_iter().enumerate() {
            bytes[2 * i..2 * i + 2].copy_from_slice(&section.to_be_bytes());
        }
        bytes
    }

    #[test]
    fn test_ip_host_normalization_and_bytes() {
        let cases: [(&str, &str, [u8; 16]); 14] = [
            ("[fefe::]", "[fefe:0:0:0:0:0:0:0]", v6([0xfefe, 0, 0, 0, 0, 0, 0, 0])),
            ("[::ffff]", "[0:0:0:0:0:0:0:ffff]", v6([0, 0, 0, 0, 0, 0, 0, 0xffff])),
            (
                "[::255.255.255.255]",
                "[0:0:0:0:0:0:ffff:ffff]",
                v6([0, 0, 0, 0, 0, 0, 0xffff, 0xffff]),
            ),
            ("[::]", "[0:0:0:0:0:0:0:0]", v6([0; 8])),
            ("[::1]", "[0:0:0:0:0:0:0:1]", v6([0, 0, 0, 0, 0, 0, 0, 1])),
            (
                "[aAaA::56.7.7.5]",
                "[aaaa:0:0:0:0:0:3807:705]",
                v6([0xaaaa, 0, 0, 0, 0, 0, 0x3807, 0x705]),
            ),
            (
                "[BBBB:ab:f78F:f:DDDD:bab:56.7.7.5]",
                "[bbbb:ab:f78f:f:dddd:bab:3807:705]",
                v6([0xbbbb, 0xab, 0xf78f, 0xf, 0xdddd, 0xbab, 0x3807, 0x705]),
            ),
            ("[Aaaa::1]", "[aaaa:0:0:0:0:0:0:1]", v6([0xaaaa, 0, 0, 0, 0, 0, 0, 1])),
            (
                "[::192.167.2.2]",
                "[0:0:0:0:0:0:c0a7:202]",
                v6([0, 0, 0, 0, 0, 0, 0xc0a7, 0x202]),
            ),
            (
                "[0:ffff::077.0x22.222.11]",
                "[0:ffff:0:0:0:0:3f22:de0b]",
                v6([0, 0xffff, 0, 0, 0, 0, 0x3f22, 0xde0b]),
            ),
            (
                "[0::ffff:077.0x22.222.11]",
                "63.34.222.11",
                v4_mapped([63, 34, 222, 11]),
            ),
            ("192.168.1.1", "192.168.1.1", v4_mapped([192, 168, 1, 1])),
            ("0x92.168.1.1", "146.168.1.1", v4_mapped([146, 168, 1, 1])),
            ("3279880203", "195.127.0.11", v4_mapped([195, 127, 0, 11])),
        ];

        for (original, expected_host, expected_bytes) in cases {
            let (host, bytes) = normalize_host(original);
            assert_eq!(host.as_deref(), Some(expected_host), "host: {original:?}");
            assert_eq!(bytes, Some(expected_bytes), "bytes: {original:?}");
        }
    }

    #[test]
    fn test_sanity_addresses_pass_through() {
        let hosts = [
            "sALes.com",
            "33r.nEt",
            "173839.com",
            "192.168.-3.1",
            "[::-34:50]",
            "[-34::192.168.34.-3]",
        ];
        for host in hosts {
            let (normalized, bytes) = normalize_host(host);
            assert_eq!(
                normalized.as_deref(),
                Some(host.to_lowercase().as_str()),
                "host: {host:?}"
            );
            assert_eq!(bytes, None, "host: {host:?}");
        }
    }

    #[test]
    fn test_idn_host_converts_to_alabel() {
        let (normalized, bytes) = normalize_host("пример.испытание");
        let normalized = normalized.unwrap_or_default();
        assert!(normalized.starts_with("xn--"), "got {normalized:?}");
        assert!(bytes.is_none());
    }

    #[test]
    fn test_normalization_is_identity_on_normalized_hosts() {
        for host in ["195.127.0.11", "[fefe:0:0:0:0:0:0:0]", "sales.com", "xn--e1afmkfd.xn--80akhbyknj4f"] {
            let (normalized, _) = normalize_host(host);
            assert_eq!(normalized.as_deref(), Some(host), "host: {host:?}");
        }
    }
}
