//! Detection options, encoded as a bit mask so callers can combine them.

/// Options controlling how the detector treats surrounding syntax. The
/// composite values are bitwise ORs of the simple ones and keep fixed
/// numeric encodings so they can round-trip through FFI or config as
/// plain integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DetectorOptions(u32);

impl DetectorOptions {
    /// Default options, no special checks.
    pub const DEFAULT: Self = Self(0);

    /// Matches quotes in the beginning and end of a string. If a candidate
    /// starts inside double quotes, the closing quote ends it, so
    /// `"http://linkedin.com"` yields `http://linkedin.com` without the
    /// trailing quote.
    pub const QUOTE_MATCH: Self = Self(1);

    /// Matches single quotes in the beginning and end of a string.
    pub const SINGLE_QUOTE_MATCH: Self = Self(2);

    /// Matches brackets (`()`, `{}`, `[]`) and stops a candidate when a
    /// closing bracket outnumbers its opener.
    pub const BRACKET_MATCH: Self = Self(4);

    /// Quote and bracket matching, for JSON input.
    pub const JSON: Self = Self(5);

    /// JSON rules plus single-quote matching, for JavaScript input.
    pub const JAVASCRIPT: Self = Self(7);

    /// Quote matching plus XML angle-bracket matching.
    pub const XML: Self = Self(9);

    /// Everything except plain-bracket matching: XML rules plus embedded
    /// JavaScript quoting.
    pub const HTML: Self = Self(27);

    /// Also accept hosts without a dot, such as `localhost` or `go/`.
    pub const ALLOW_SINGLE_LEVEL_DOMAIN: Self = Self(32);

    /// Check whether every bit of `flag` is set in `self`.
    pub fn has_flag(self, flag: Self) -> bool {
        self.0 & flag.0 == flag.0
    }

    /// The raw bit mask value.
    pub fn value(self) -> u32 {
        self.0
    }
}

impl core::ops::BitOr for DetectorOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composites_keep_numeric_encoding() {
        assert_eq!(
            DetectorOptions::JSON,
            DetectorOptions::QUOTE_MATCH | DetectorOptions::BRACKET_MATCH
        );
        assert_eq!(
            DetectorOptions::JAVASCRIPT,
            DetectorOptions::JSON | DetectorOptions::SINGLE_QUOTE_MATCH
        );
        assert_eq!(
            DetectorOptions::XML,
            DetectorOptions::QUOTE_MATCH | DetectorOptions(8)
        );
        assert_eq!(
            DetectorOptions::HTML,
            DetectorOptions::XML | DetectorOptions::SINGLE_QUOTE_MATCH | DetectorOptions(16)
        );
        assert_eq!(DetectorOptions::HTML.value(), 27);
        assert_eq!(DetectorOptions::ALLOW_SINGLE_LEVEL_DOMAIN.value(), 32);
    }

    #[test]
    fn test_has_flag() {
        assert!(DetectorOptions::HTML.has_flag(DetectorOptions::QUOTE_MATCH));
        assert!(DetectorOptions::HTML.has_flag(DetectorOptions::XML));
        assert!(!DetectorOptions::HTML.has_flag(DetectorOptions::BRACKET_MATCH));
        assert!(!DetectorOptions::DEFAULT.has_flag(DetectorOptions::QUOTE_MATCH));
        assert!(DetectorOptions::DEFAULT.has_flag(DetectorOptions::DEFAULT));
    }
}
