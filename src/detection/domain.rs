//! Nested state machine that validates a candidate authority.
//!
//! The domain reader shares the detector's input cursor and candidate
//! buffer. It consumes characters until the authority either ends at a
//! component delimiter (handing control back with the component to read
//! next) or turns out invalid, in which case it rewinds one character so
//! the detector can resume scanning without losing the terminator.

use super::detector::CharacterMatcher;
use crate::char_util::{is_alpha, is_alphanumeric, is_dot, is_hex, is_numeric, is_unreserved, split_by_dot};
use crate::error::Result;
use crate::options::DetectorOptions;
use crate::reader::InputTextReader;

/// The minimum length of an ASCII top level domain.
const MIN_TOP_LEVEL_DOMAIN: usize = 2;

/// The maximum length of an ASCII top level domain.
const MAX_TOP_LEVEL_DOMAIN: usize = 22;

/// The largest value of an undotted numeric host, as in
/// `http://123123123123/path`.
const MAX_NUMERIC_DOMAIN_VALUE: u64 = 4_294_967_295;

/// The smallest value of an undotted numeric host.
const MIN_NUMERIC_DOMAIN_VALUE: u64 = 16_843_008;

/// The maximum value of a single part of a dotted IP address.
const MAX_IP_PART: u32 = 255;

/// First code point treated as an international domain character.
/// Everything below is either a-z, A-Z, 0-9 or punctuation that never
/// appears in a domain name.
const INTERNATIONAL_CHAR_START: u32 = 192;

/// The maximum length of each label in the domain name.
const MAX_LABEL_LENGTH: usize = 64;

/// The maximum number of labels in a single domain name.
const MAX_NUMBER_LABELS: usize = 127;

/// The maximum domain name length.
const MAX_DOMAIN_LENGTH: usize = 255;

/// What the detector should do after a domain read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReaderNextState {
    /// Trying to read the domain name caused it to be invalid.
    InvalidDomainName,
    /// The domain name is valid and the candidate ended with it.
    ValidDomainName,
    /// Valid so far; next step is to read the fragment.
    ReadFragment,
    /// Valid so far; next step is to read the path.
    ReadPath,
    /// Valid so far; next step is to read the port.
    ReadPort,
    /// Valid so far; next step is to read the query string.
    ReadQueryString,
}

/// Reads and validates one authority out of the shared input stream.
pub(crate) struct DomainNameReader<'a> {
    reader: &'a mut InputTextReader,
    /// The candidate buffer shared with the detector.
    buffer: &'a mut Vec<char>,
    /// Portion of the buffer already consumed before hand-off, if any.
    current: Option<Vec<char>>,
    options: DetectorOptions,
    /// Counts the detector's quote and bracket matches for characters the
    /// domain reader consumes but rejects.
    matcher: &'a mut CharacterMatcher,
    /// Dots seen in the domain so far.
    dots: usize,
    /// Characters since the last dot.
    current_label_length: usize,
    /// Length of the rightmost label seen so far.
    top_level_length: usize,
    /// Where the domain starts inside the buffer. Non-zero when the buffer
    /// begins with a scheme or userinfo.
    start_domain_name: usize,
    /// Whether the whole domain is numeric so far.
    numeric: bool,
    /// Whether a `[` opened an IPv6 literal.
    seen_bracket: bool,
    /// Whether a complete `[...]` bracket set has been consumed.
    seen_complete_bracket_set: bool,
    /// Whether the cursor is inside an IPv6 zone index.
    zone_index: bool,
}

impl<'a> DomainNameReader<'a> {
    pub(crate) fn new(
        reader: &'a mut InputTextReader,
        buffer: &'a mut Vec<char>,
        current: Option<Vec<char>>,
        options: DetectorOptions,
        matcher: &'a mut CharacterMatcher,
    ) -> Self {
        Self {
            reader,
            buffer,
            current,
            options,
            matcher,
            dots: 0,
            current_label_length: 0,
            top_level_length: 0,
            start_domain_name: 0,
            numeric: false,
            seen_bracket: false,
            seen_complete_bracket_set: false,
            zone_index: false,
        }
    }

    /// Validate the pre-accumulated prefix so the scan can pick up where
    /// the detector left off.
    fn read_current(&mut self) -> ReaderNextState {
        let Some(current) = self.current.take() else {
            self.start_domain_name = self.buffer.len();
            return ReaderNextState::ValidDomainName;
        };

        // ".hello" and "%2ehello" cannot start a domain
        if current.len() == 1 && is_dot(current[0]) {
            return ReaderNextState::InvalidDomainName;
        }
        if current.len() == 3
            && current[0] == '%'
            && current[1] == '2'
            && matches!(current[2], 'e' | 'E')
        {
            return ReaderNextState::InvalidDomainName;
        }

        self.start_domain_name = self.buffer.len() - current.len();
        self.numeric = true;

        // if an invalid character is found, the domain restarts right after it
        let mut new_start = 0;

        let length = current.len();
        let mut is_all_hex_so_far =
            length > 2 && current[0] == '0' && matches!(current[1], 'x' | 'X');

        let mut index = if is_all_hex_so_far { 2 } else { 0 };
        let mut done = false;

        while index < length && !done {
            let curr = current[index];
            self.current_label_length += 1;
            self.top_level_length = self.current_label_length;

            if self.current_label_length > MAX_LABEL_LENGTH {
                return ReaderNextState::InvalidDomainName;
            } else if is_dot(curr) {
                self.dots += 1;
                self.current_label_length = 0;
            } else if curr == '[' {
                self.seen_bracket = true;
                self.numeric = false;
            } else if curr == '%'
                && index + 2 < length
                && is_hex(current[index + 1])
                && is_hex(current[index + 2])
            {
                if current[index + 1] == '2' && current[index + 2] == 'e' {
                    // url encoded dot
                    self.dots += 1;
                    self.current_label_length = 0;
                } else {
                    self.numeric = false;
                }
                index += 2;
            } else if is_all_hex_so_far {
                if !is_hex(curr) {
                    self.numeric = false;
                    is_all_hex_so_far = false;
                    // rerun the current character knowing it isn't hex
                    index -= 1;
                }
            } else if is_alpha(curr) || curr == '-' || curr as u32 >= INTERNATIONAL_CHAR_START {
                self.numeric = false;
            } else if !is_numeric(curr)
                && !self
                    .options
                    .has_flag(DetectorOptions::ALLOW_SINGLE_LEVEL_DOMAIN)
            {
                // neither numeric nor alphabetic: restart the domain search
                // from just past this character
                new_start = index + 1;
                self.current_label_length = 0;
                self.top_level_length = 0;
                self.numeric = true;
                self.dots = 0;
                done = true;
            }
            index += 1;
        }

        // an invalid character was found somewhere in the prefix; cut
        // everything before it out. For http://asdf%asdf.google.com the
        // domain restarts at asdf.google.com.
        if new_start > 0 {
            if new_start < current.len() {
                self.buffer.clear();
                self.buffer.extend_from_slice(&current[new_start..]);
                self.start_domain_name = 0;
            }

            if new_start >= current.len() || (self.buffer.len() == 1 && self.buffer[0] == '.') {
                return ReaderNextState::InvalidDomainName;
            }
        }

        ReaderNextState::ValidDomainName
    }

    /// Run the domain state machine and report what to parse next.
    pub(crate) fn read_domain_name(mut self) -> Result<ReaderNextState> {
        if self.read_current() == ReaderNextState::InvalidDomainName {
            return Ok(ReaderNextState::InvalidDomainName);
        }

        let mut done = false;
        while !done && !self.reader.eof() {
            let curr = self.reader.read();

            match curr {
                '/' => {
                    return self.check_domain_name_valid(ReaderNextState::ReadPath, Some(curr));
                }
                ':' if !self.seen_bracket || self.seen_complete_bracket_set => {
                    // not mid-IPv6, so this colon starts a port
                    return self.check_domain_name_valid(ReaderNextState::ReadPort, Some(curr));
                }
                '?' => {
                    return self
                        .check_domain_name_valid(ReaderNextState::ReadQueryString, Some(curr));
                }
                '#' => {
                    return self.check_domain_name_valid(ReaderNextState::ReadFragment, Some(curr));
                }
                c if is_dot(c)
                    || (c == '%'
                        && self.reader.can_read(2)
                        && self.reader.peek(2).eq_ignore_ascii_case("2e")) =>
                {
                    // handles the case: hello..
                    if self.current_label_length < 1 {
                        done = true;
                    } else {
                        self.buffer.push(c);

                        // a url encoded dot carries its two hex characters
                        if !is_dot(c) {
                            let next = self.reader.read();
                            self.buffer.push(next);
                            let next = self.reader.read();
                            self.buffer.push(next);
                        }

                        if !self.zone_index {
                            self.dots += 1;
                            self.current_label_length = 0;
                        }

                        if self.current_label_length >= MAX_LABEL_LENGTH {
                            return Ok(ReaderNextState::InvalidDomainName);
                        }
                    }
                }
                c if self.seen_bracket
                    && !self.seen_complete_bracket_set
                    && (is_hex(c) || matches!(c, ':' | '[' | ']' | '%')) =>
                {
                    // inside an ipv6 literal
                    match c {
                        ':' => self.current_label_length = 0,
                        '[' => {
                            // a second '[' forces a re-read from this bracket
                            self.reader.go_back()?;
                            return Ok(ReaderNextState::InvalidDomainName);
                        }
                        ']' => {
                            self.seen_complete_bracket_set = true;
                            // resume counting dots after the address is over
                            self.zone_index = false;
                        }
                        '%' => self.zone_index = true,
                        _ => self.current_label_length += 1,
                    }
                    self.numeric = false;
                    self.buffer.push(c);
                }
                c if is_alphanumeric(c) || c == '-' || c as u32 >= INTERNATIONAL_CHAR_START => {
                    if self.seen_complete_bracket_set {
                        // covers the case of [fe80::]www.google.com
                        self.reader.go_back()?;
                        done = true;
                    } else {
                        // x/X is excluded so hex ip addresses stay numeric
                        if !matches!(c, 'x' | 'X') && !is_numeric(c) {
                            self.numeric = false;
                        }
                        self.buffer.push(c);
                        self.current_label_length += 1;
                        self.top_level_length = self.current_label_length;
                    }
                }
                '[' if !self.seen_bracket => {
                    self.seen_bracket = true;
                    self.numeric = false;
                    self.buffer.push(curr);
                }
                '[' if self.seen_complete_bracket_set => {
                    // case where [::][ ...
                    self.reader.go_back()?;
                    done = true;
                }
                '%' if self.reader.can_read(2)
                    && is_hex(self.reader.peek_char(0))
                    && is_hex(self.reader.peek_char(1)) =>
                {
                    self.buffer.push(curr);
                    let next = self.reader.read();
                    self.buffer.push(next);
                    let next = self.reader.read();
                    self.buffer.push(next);
                    self.current_label_length += 3;
                    self.top_level_length = self.current_label_length;
                }
                c => {
                    // let the detector count this character for its quote
                    // and bracket matching, then stop
                    self.matcher.check(c);
                    done = true;
                }
            }
        }

        self.check_domain_name_valid(ReaderNextState::ValidDomainName, None)
    }

    /// Final validity check. On success appends the terminator (if any)
    /// and returns `valid_state`; on failure rewinds one character so the
    /// terminator is not swallowed (handles `00:41.<br />` which would
    /// otherwise detect `41.br`).
    fn check_domain_name_valid(
        mut self,
        valid_state: ReaderNextState,
        last_char: Option<char>,
    ) -> Result<ReaderNextState> {
        // The max domain length of 255 includes the trailing dot, which is
        // usually not written out; account for it when a label is open.
        // The trailing dot may also be url encoded.
        let len = self.buffer.len();
        let last_dot_length = if len > 3
            && self.buffer[len - 3] == '%'
            && self.buffer[len - 2] == '2'
            && matches!(self.buffer[len - 1], 'e' | 'E')
        {
            3
        } else {
            1
        };

        let domain_length = len - self.start_domain_name
            + if self.current_label_length > 0 {
                last_dot_length
            } else {
                0
            };
        let dot_count = self.dots + usize::from(self.current_label_length > 0);

        let valid = if domain_length >= MAX_DOMAIN_LENGTH || dot_count > MAX_NUMBER_LABELS {
            false
        } else if self.numeric {
            let test_domain: String = self.buffer[self.start_domain_name..]
                .iter()
                .collect::<String>()
                .to_lowercase();
            self.is_valid_ipv4(&test_domain)
        } else if self.seen_bracket {
            let test_domain: String = self.buffer[self.start_domain_name..]
                .iter()
                .collect::<String>()
                .to_lowercase();
            self.is_valid_ipv6(&test_domain)
        } else if (self.current_label_length > 0 && self.dots >= 1)
            || (self.dots >= 2 && self.current_label_length == 0)
            || (self
                .options
                .has_flag(DetectorOptions::ALLOW_SINGLE_LEVEL_DOMAIN)
                && self.dots == 0)
        {
            let mut top_start = self.buffer.len() as isize - self.top_level_length as isize;
            if self.current_label_length == 0 {
                top_start -= 1;
            }
            let top_start = top_start.max(0) as usize;

            // no size restriction on international top level domains
            let top_end = top_start + 4.min(self.buffer.len() - top_start);
            let top_level_start: String = self.buffer[top_start..top_end].iter().collect();
            top_level_start.eq_ignore_ascii_case("xn--")
                || (self.top_level_length >= MIN_TOP_LEVEL_DOMAIN
                    && self.top_level_length <= MAX_TOP_LEVEL_DOMAIN)
        } else {
            false
        };

        if valid {
            if let Some(c) = last_char {
                self.buffer.push(c);
            }
            return Ok(valid_state);
        }

        self.reader.go_back()?;
        Ok(ReaderNextState::InvalidDomainName)
    }

    /// Validate a numeric host as IPv4: hexadecimal, octal, decimal,
    /// dotted decimal, dotted hex, dotted octal.
    fn is_valid_ipv4(&self, test_domain: &str) -> bool {
        if test_domain.is_empty() {
            return false;
        }

        if self.dots == 0 {
            // undotted form, e.g. http://2123123123123/path or http://0x8242343/path
            let value = if test_domain.len() > 2 && test_domain.starts_with("0x") {
                u64::from_str_radix(&test_domain[2..], 16)
            } else if test_domain.starts_with('0') {
                u64::from_str_radix(&test_domain[1..], 8)
            } else {
                test_domain.parse::<u64>()
            };
            return value
                .is_ok_and(|v| (MIN_NUMERIC_DOMAIN_VALUE..=MAX_NUMERIC_DOMAIN_VALUE).contains(&v));
        }

        if self.dots != 3 {
            return false;
        }

        for part in split_by_dot(test_domain) {
            if part.is_empty() {
                return false;
            }
            let (digits, base) = if part.len() > 2 && part.starts_with("0x") {
                (&part[2..], 16)
            } else if part.starts_with('0') {
                (&part[1..], 8)
            } else {
                (part.as_str(), 10)
            };

            let section = if digits.is_empty() {
                Some(0)
            } else {
                u32::from_str_radix(digits, base).ok()
            };
            if !section.is_some_and(|s| s <= MAX_IP_PART) {
                return false;
            }
        }
        true
    }

    /// Validate a bracketed host as IPv6: truncated notation, embedded
    /// IPv4 in the final sections, zone indices after `%`.
    fn is_valid_ipv6(&self, test_domain: &str) -> bool {
        let arr: Vec<char> = test_domain.chars().collect();

        // require [....], reject bare [] and [:x (only [:: may start with a colon)
        if arr.len() < 3
            || arr[arr.len() - 1] != ']'
            || arr[0] != '['
            || (arr[1] == ':' && arr[2] != ':')
        {
            return false;
        }

        let mut num_sections = 1;
        let mut hex_digits = 0;
        let mut prev_char = '\0';

        // collects a possible ipv4 address in the final sections
        let mut last_section = String::new();
        let mut hex_section = true;

        // entered after a '%', e.g. http://[::ffff:0xC0.0x00.0x02.0xEB%251]
        let mut zone_index_mode = false;

        // at most one "::" is allowed
        let mut double_colon_flag = false;

        let mut index = 0;
        while index < arr.len() {
            match arr[index] {
                '[' => {}
                '%' | ']' => {
                    let curr = arr[index];
                    let mut encoded_dot = false;
                    if curr == '%' {
                        // a url encoded dot keeps ipv4 collection going
                        if index + 2 < arr.len() && arr[index + 1] == '2' && arr[index + 2] == 'e' {
                            last_section.push_str("%2e");
                            index += 2;
                            hex_section = false;
                            encoded_dot = true;
                        } else {
                            zone_index_mode = true;
                        }
                    }
                    if !encoded_dot && !hex_section && (!zone_index_mode || curr == '%') {
                        if self.is_valid_ipv4(&last_section) {
                            // an embedded ipv4 address takes up two sections
                            num_sections += 1;
                        } else {
                            return false;
                        }
                    }
                }
                ':' => {
                    if prev_char == ':' {
                        if double_colon_flag {
                            return false;
                        }
                        double_colon_flag = true;
                    }

                    // the previous section had invalid characters
                    if !hex_section {
                        return false;
                    }

                    hex_section = true;
                    hex_digits = 0;
                    num_sections += 1;
                    last_section.clear();
                }
                c => {
                    if zone_index_mode {
                        if !is_unreserved(c) {
                            return false;
                        }
                    } else {
                        last_section.push(c);
                        if hex_section && is_hex(c) {
                            hex_digits += 1;
                        } else {
                            hex_section = false;
                        }
                    }
                }
            }
            if hex_digits > 4 || num_sections > 8 {
                return false;
            }
            prev_char = arr[index];
            index += 1;
        }

        // num_sections == 1 catches things like [adf]; beyond that either
        // all eight sections are present or the address was truncated
        num_sections != 1 && (num_sections >= 8 || double_colon_flag)
    }
}
