//! The top-level scanner that finds URLs inside arbitrary text.
//!
//! The detector walks the input once, accumulating a candidate in a
//! buffer. Trigger characters (dots, colons, `@`, `[`, `/`, `%`) hand the
//! cursor to the [`DomainNameReader`]; its answer tells the detector which
//! component to read next or that the candidate was bogus. Option flags
//! teach the scanner about the surrounding syntax (quotes, brackets, XML
//! tags) so that `<a href="http://x/">` does not leak markup into the URL.

use std::collections::HashMap;

use super::domain::{DomainNameReader, ReaderNextState};
use crate::char_util::{is_alpha, is_dot, is_hex};
use crate::error::Result;
use crate::marker::{UrlMarker, UrlPart};
use crate::options::DetectorOptions;
use crate::reader::InputTextReader;
use crate::url::Url;

/// Scheme prefixes the detector accepts, including the percent-encoded
/// colon forms browsers tolerate.
const VALID_SCHEMES: [&str; 8] = [
    "http://",
    "https://",
    "ftp://",
    "ftps://",
    "http%3a//",
    "https%3a//",
    "ftp%3a//",
    "ftps%3a//",
];

/// In HTML mode, a candidate ending with this is a mail link, not a URL.
const HTML_MAILTO: &str = "mailto:";

/// The response of matching a quote or bracket character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CharacterMatch {
    /// The character was not matched.
    NotMatched,
    /// A character was matched which requires a stop.
    Stop,
    /// The character was matched and opens a range.
    Start,
}

/// Whether the current candidate should be committed or discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadEndState {
    ValidUrl,
    InvalidUrl,
}

/// Counts quotes, brackets, and XML angle brackets seen in the document
/// so a closing character that outnumbers its opener ends the candidate.
pub(crate) struct CharacterMatcher {
    options: DetectorOptions,
    counts: HashMap<char, u32>,
    /// A double quote opened the current context.
    quote_start: bool,
    /// A single quote opened the current context.
    single_quote_start: bool,
}

impl CharacterMatcher {
    fn new(options: DetectorOptions) -> Self {
        Self {
            options,
            counts: HashMap::new(),
            quote_start: false,
            single_quote_start: false,
        }
    }

    fn count(&self, c: char) -> u32 {
        self.counts.get(&c).copied().unwrap_or(0)
    }

    pub(crate) fn quote_start(&self) -> bool {
        self.quote_start
    }

    fn reset_quote_start(&mut self) {
        self.quote_start = false;
    }

    /// Record `curr` and report whether it stops the current candidate.
    pub(crate) fn check(&mut self, curr: char) -> CharacterMatch {
        if (curr == '"' && self.options.has_flag(DetectorOptions::QUOTE_MATCH))
            || (curr == '\'' && self.options.has_flag(DetectorOptions::SINGLE_QUOTE_MATCH))
        {
            let quote_start = if curr == '"' {
                let was = self.quote_start;
                self.quote_start = true;
                was
            } else {
                let was = self.single_quote_start;
                self.single_quote_start = true;
                was
            };

            let curr_val = self.count(curr) + 1;
            self.counts.insert(curr, curr_val);

            // a quote was already open, or this quote closes a pair
            return if quote_start || curr_val % 2 == 0 {
                CharacterMatch::Stop
            } else {
                CharacterMatch::Start
            };
        }

        if self.options.has_flag(DetectorOptions::BRACKET_MATCH)
            && matches!(curr, '[' | '{' | '(')
        {
            self.counts.insert(curr, self.count(curr) + 1);
            return CharacterMatch::Start;
        }

        if self.options.has_flag(DetectorOptions::XML) && curr == '<' {
            self.counts.insert(curr, self.count(curr) + 1);
            return CharacterMatch::Start;
        }

        if (self.options.has_flag(DetectorOptions::BRACKET_MATCH)
            && matches!(curr, ']' | '}' | ')'))
            || (self.options.has_flag(DetectorOptions::XML) && curr == '>')
        {
            let curr_val = self.count(curr) + 1;
            self.counts.insert(curr, curr_val);

            let opening = match curr {
                ']' => '[',
                '}' => '{',
                ')' => '(',
                '>' => '<',
                _ => '\0',
            };

            // more openers than closers means the candidate continues
            return if self.count(opening) > curr_val {
                CharacterMatch::Stop
            } else {
                CharacterMatch::Start
            };
        }

        CharacterMatch::NotMatched
    }
}

/// Finds URLs inside text.
///
/// A detector is single-use: it owns a cursor over its input and mutable
/// candidate state, so detecting consumes it. Distinct detectors over
/// distinct inputs are independent.
///
/// # Examples
///
/// ```
/// use urlsift::{DetectorOptions, UrlDetector};
///
/// let urls = UrlDetector::new("read this: www.google.com", DetectorOptions::DEFAULT)
///     .detect()
///     .unwrap();
/// assert_eq!(urls.len(), 1);
/// assert_eq!(urls[0].original_url(), "www.google.com");
/// ```
pub struct UrlDetector {
    reader: InputTextReader,
    options: DetectorOptions,
    /// The candidate accumulated so far.
    buffer: Vec<char>,
    /// Has the scheme been found for this candidate?
    has_scheme: bool,
    /// Set after a `[...]` failed to read as IPv6, so the content inside
    /// the brackets gets scanned instead of looping on the bracket.
    dont_match_ipv6: bool,
    matcher: CharacterMatcher,
    current_url_marker: UrlMarker,
    url_list: Vec<Url>,
}

impl UrlDetector {
    /// Create a detector over `content` with the given options.
    pub fn new(content: &str, options: DetectorOptions) -> Self {
        Self {
            reader: InputTextReader::new(content),
            options,
            buffer: Vec::new(),
            has_scheme: false,
            dont_match_ipv6: false,
            matcher: CharacterMatcher::new(options),
            current_url_marker: UrlMarker::new(),
            url_list: Vec::new(),
        }
    }

    /// Scan the input and return the detected URLs, in the order found.
    ///
    /// # Errors
    ///
    /// Fails only when the backtrack budget is exceeded on pathological
    /// input; no input is ever rejected for failing to contain URLs.
    pub fn detect(mut self) -> Result<Vec<Url>> {
        self.read_default()?;
        Ok(self.url_list)
    }

    /// Slice of the buffer from `length` to the end, the portion belonging
    /// to the current candidate domain.
    fn current_from(&self, length: usize) -> Vec<char> {
        self.buffer.get(length..).unwrap_or(&[]).to_vec()
    }

    /// The default reader, looking for trigger characters to start
    /// detecting a URL. `length` tracks where the part being accumulated
    /// started, to later cut out the domain name.
    fn read_default(&mut self) -> Result<()> {
        let mut length = 0;

        while !self.reader.eof() {
            let curr = self.reader.read();

            match curr {
                ' ' => {
                    // a space ends the candidate; with single level domains
                    // on, what was buffered may still be a bare host
                    if self
                        .options
                        .has_flag(DetectorOptions::ALLOW_SINGLE_LEVEL_DOMAIN)
                        && !self.buffer.is_empty()
                        && self.has_scheme
                    {
                        self.reader.go_back()?;
                        let current = self.current_from(length);
                        self.read_domain_name(Some(current))?;
                    }
                    self.buffer.push(curr);
                    self.read_end(ReadEndState::InvalidUrl);
                    length = 0;
                }
                '%' => {
                    if self.reader.can_read(2) {
                        if self.reader.peek(2).eq_ignore_ascii_case("3a") {
                            // percent-encoded colon
                            self.buffer.push(curr);
                            let next = self.reader.read();
                            self.buffer.push(next);
                            let next = self.reader.read();
                            self.buffer.push(next);
                            length = self.process_colon(length)?;
                        } else if is_hex(self.reader.peek_char(0))
                            && is_hex(self.reader.peek_char(1))
                        {
                            self.buffer.push(curr);
                            let next = self.reader.read();
                            self.buffer.push(next);
                            let next = self.reader.read();
                            self.buffer.push(next);

                            let current = self.current_from(length);
                            self.read_domain_name(Some(current))?;
                            length = 0;
                        }
                    }
                }
                c if is_dot(c) => {
                    // read the domain name starting from `length`
                    self.buffer.push(c);
                    let current = self.current_from(length);
                    self.read_domain_name(Some(current))?;
                    length = 0;
                }
                '@' => {
                    // check the domain name after a username
                    if !self.buffer.is_empty() {
                        self.current_url_marker
                            .set_index(UrlPart::UsernamePassword, length);
                        self.buffer.push(curr);
                        self.read_domain_name(None)?;
                        length = 0;
                    }
                }
                '[' => {
                    if self.dont_match_ipv6
                        && self.matcher.check(curr) != CharacterMatch::NotMatched
                    {
                        // this bracket opens or closes a matched range,
                        // either way reset and start over
                        self.read_end(ReadEndState::InvalidUrl);
                        length = 0;
                    }
                    let beginning = self.reader.position();

                    if !self.has_scheme {
                        self.buffer.clear();
                    }
                    self.buffer.push(curr);

                    let current = self.current_from(length);
                    if !self.read_domain_name(Some(current))? {
                        // no ipv6 address here; look for urls inside the
                        // brackets instead
                        self.reader.seek(beginning)?;
                        self.dont_match_ipv6 = true;
                    }
                    length = 0;
                }
                '/' => {
                    if self.has_scheme
                        || (self
                            .options
                            .has_flag(DetectorOptions::ALLOW_SINGLE_LEVEL_DOMAIN)
                            && self.buffer.len() > 1)
                    {
                        // with a scheme already read this may be
                        // http://123123123/asdf, so re-check the domain.
                        // The buffer length condition weeds out infinite
                        // backtracking on html5 roots.
                        self.reader.go_back()?;
                        let current = self.current_from(length);
                        self.read_domain_name(Some(current))?;
                        length = 0;
                    } else {
                        // no scheme: clear state, then check for an html5
                        // root such as //google.com/
                        self.read_end(ReadEndState::InvalidUrl);
                        self.buffer.push(curr);
                        self.has_scheme = self.read_html5_root()?;
                        length = self.buffer.len();
                    }
                }
                ':' => {
                    self.buffer.push(curr);
                    length = self.process_colon(length)?;
                }
                c => {
                    if self.matcher.check(c) != CharacterMatch::NotMatched {
                        self.read_end(ReadEndState::InvalidUrl);
                        length = 0;
                    } else {
                        self.buffer.push(c);
                    }
                }
            }
        }

        // a single level domain may end with the input
        if self
            .options
            .has_flag(DetectorOptions::ALLOW_SINGLE_LEVEL_DOMAIN)
            && !self.buffer.is_empty()
            && self.has_scheme
        {
            let current = self.current_from(length);
            self.read_domain_name(Some(current))?;
        }
        Ok(())
    }

    /// A `:` was found; try to read a scheme or username/password.
    /// `length` is the first index of the previous part; returns the new
    /// index of where the domain starts.
    fn process_colon(&mut self, mut length: usize) -> Result<usize> {
        if self.has_scheme {
            // with a scheme present this should be username/password
            if !self.read_user_pass(length)? && !self.buffer.is_empty() {
                // unread the ":" so the domain reader can process it
                self.reader.go_back()?;
                self.buffer.pop();

                let backtrack_on_fail =
                    (self.reader.position() + length).saturating_sub(self.buffer.len());
                let current = self.current_from(length);
                if !self.read_domain_name(Some(current))? {
                    // go back to the length location and restart the search
                    self.reader.seek(backtrack_on_fail)?;
                    self.read_end(ReadEndState::InvalidUrl);
                }
            }
            // whichever way the userinfo read went, the candidate was either
            // committed or discarded, so the next domain starts fresh
            length = 0;
        } else if self.read_scheme()? && !self.buffer.is_empty() {
            self.has_scheme = true;
            // the domain starts right after the scheme
            length = self.buffer.len();
        } else if !self.buffer.is_empty()
            && self
                .options
                .has_flag(DetectorOptions::ALLOW_SINGLE_LEVEL_DOMAIN)
            && self.reader.can_read(1)
        {
            // takes care of a case like hi:
            // unread the ":" so the domain reader can handle the port
            self.reader.go_back()?;
            self.buffer.pop();
            let current = self.buffer.clone();
            self.read_domain_name(Some(current))?;
        } else {
            self.read_end(ReadEndState::InvalidUrl);
            length = 0;
        }

        Ok(length)
    }

    /// Check for a scheme-relative url in the format //google.com/static/js.js
    fn read_html5_root(&mut self) -> Result<bool> {
        if self.reader.eof() {
            return Ok(false);
        }

        let curr = self.reader.read();
        if curr == '/' {
            self.buffer.push(curr);
            Ok(true)
        } else {
            self.reader.go_back()?;
            self.read_end(ReadEndState::InvalidUrl);
            Ok(false)
        }
    }

    /// Read the scheme; true if it is one of the recognized prefixes.
    fn read_scheme(&mut self) -> Result<bool> {
        // an html candidate ending in mailto: is an email, not a url
        if self.options.has_flag(DetectorOptions::HTML) && self.buffer.len() >= HTML_MAILTO.len() {
            let tail: String = self.buffer[self.buffer.len() - HTML_MAILTO.len()..]
                .iter()
                .collect();
            if tail.eq_ignore_ascii_case(HTML_MAILTO) {
                return Ok(self.read_end(ReadEndState::InvalidUrl));
            }
        }

        let original_length = self.buffer.len();
        let mut num_slashes = 0;

        while !self.reader.eof() {
            let curr = self.reader.read();

            if curr == '/' {
                self.buffer.push(curr);
                if num_slashes == 1 {
                    // only approved protocols pass
                    let candidate: String = self.buffer.iter().collect::<String>().to_lowercase();
                    if VALID_SCHEMES.contains(&candidate.as_str()) {
                        self.current_url_marker.set_index(UrlPart::Scheme, 0);
                        return Ok(true);
                    }
                    return Ok(false);
                }
                num_slashes += 1;
            } else if curr == ' ' || self.matcher.check(curr) != CharacterMatch::NotMatched {
                self.buffer.push(curr);
                return Ok(false);
            } else if curr == '[' {
                // starting to see an ipv6 address; unread the bracket so
                // domain reading can pick it up
                self.reader.go_back()?;
                return Ok(false);
            } else if original_length > 0 || num_slashes > 0 || !is_alpha(curr) {
                // not a scheme after all, assume username and password
                self.reader.go_back()?;
                return self.read_user_pass(0);
            }
        }

        Ok(false)
    }

    /// Look for `username:password@`. A dot or `[` before the `@` means
    /// this might be a domain instead, so remember to roll back.
    fn read_user_pass(&mut self, beginning_of_username: usize) -> Result<bool> {
        let start = self.buffer.len();

        let mut done = false;
        let mut rollback = false;

        while !done && !self.reader.eof() {
            let curr = self.reader.read();

            if curr == '@' {
                // everything is ok, a domain name follows
                self.buffer.push(curr);
                self.current_url_marker
                    .set_index(UrlPart::UsernamePassword, beginning_of_username);
                return self.read_domain_name(Some(Vec::new()));
            } else if is_dot(curr) || curr == '[' {
                self.buffer.push(curr);
                rollback = true;
            } else if curr == '#'
                || curr == ' '
                || curr == '/'
                || self.matcher.check(curr) != CharacterMatch::NotMatched
            {
                rollback = true;
                done = true;
            } else {
                self.buffer.push(curr);
            }
        }

        if rollback {
            // no @ was found, so there is no username and password
            let distance = self.buffer.len() - start;
            self.buffer.truncate(start);

            let curr_index = self
                .reader
                .position()
                .saturating_sub(distance + usize::from(done));
            self.reader.seek(curr_index)?;

            Ok(false)
        } else {
            Ok(self.read_end(ReadEndState::InvalidUrl))
        }
    }

    /// Try to read the current candidate as a domain name and continue
    /// with whatever component the domain reader says comes next.
    fn read_domain_name(&mut self, current: Option<Vec<char>>) -> Result<bool> {
        let host_index = match &current {
            None => self.buffer.len(),
            Some(c) => self.buffer.len() - c.len(),
        };
        self.current_url_marker.set_index(UrlPart::Host, host_index);

        let state = DomainNameReader::new(
            &mut self.reader,
            &mut self.buffer,
            current,
            self.options,
            &mut self.matcher,
        )
        .read_domain_name()?;

        match state {
            ReaderNextState::ValidDomainName => Ok(self.read_end(ReadEndState::ValidUrl)),
            ReaderNextState::ReadFragment => self.read_fragment(),
            ReaderNextState::ReadPath => self.read_path(),
            ReaderNextState::ReadPort => self.read_port(),
            ReaderNextState::ReadQueryString => self.read_query_string(),
            ReaderNextState::InvalidDomainName => Ok(self.read_end(ReadEndState::InvalidUrl)),
        }
    }

    /// Read the fragment, the part of the url starting with `#`.
    fn read_fragment(&mut self) -> Result<bool> {
        self.current_url_marker
            .set_index(UrlPart::Fragment, self.buffer.len() - 1);

        while !self.reader.eof() {
            let curr = self.reader.read();

            // a space or matched character ends the url; anything read so
            // far is already valid
            if curr == ' ' || self.matcher.check(curr) != CharacterMatch::NotMatched {
                return Ok(self.read_end(ReadEndState::ValidUrl));
            }
            self.buffer.push(curr);
        }

        Ok(self.read_end(ReadEndState::ValidUrl))
    }

    /// Try to read the query string.
    fn read_query_string(&mut self) -> Result<bool> {
        self.current_url_marker
            .set_index(UrlPart::Query, self.buffer.len() - 1);

        while !self.reader.eof() {
            let curr = self.reader.read();

            if curr == '#' {
                self.buffer.push(curr);
                return self.read_fragment();
            }
            if curr == ' ' || self.matcher.check(curr) != CharacterMatch::NotMatched {
                return Ok(self.read_end(ReadEndState::ValidUrl));
            }
            self.buffer.push(curr);
        }

        Ok(self.read_end(ReadEndState::ValidUrl))
    }

    /// Try to read the port of the url.
    fn read_port(&mut self) -> Result<bool> {
        self.current_url_marker
            .set_index(UrlPart::Port, self.buffer.len());

        let mut port_len = 0;
        while !self.reader.eof() {
            let curr = self.reader.read();
            port_len += 1;

            if curr == '/' {
                self.buffer.push(curr);
                return self.read_path();
            }
            if curr == '?' {
                self.buffer.push(curr);
                return self.read_query_string();
            }
            if curr == '#' {
                self.buffer.push(curr);
                return self.read_fragment();
            }
            if self.matcher.check(curr) == CharacterMatch::Stop || !curr.is_ascii_digit() {
                // what was read so far is a valid url, but there is no
                // port; it was something like google.com:hello.world
                self.reader.go_back()?;

                if port_len == 1 {
                    // remove the ":" from the end
                    self.buffer.pop();
                }
                self.current_url_marker.unset_index(UrlPart::Port);
                return Ok(self.read_end(ReadEndState::ValidUrl));
            }
            self.buffer.push(curr);
        }

        Ok(self.read_end(ReadEndState::ValidUrl))
    }

    /// Try to read the path.
    fn read_path(&mut self) -> Result<bool> {
        self.current_url_marker
            .set_index(UrlPart::Path, self.buffer.len() - 1);

        while !self.reader.eof() {
            let curr = self.reader.read();

            if curr == ' ' || self.matcher.check(curr) != CharacterMatch::NotMatched {
                return Ok(self.read_end(ReadEndState::ValidUrl));
            }

            self.buffer.push(curr);

            if curr == '?' {
                return self.read_query_string();
            }
            if curr == '#' {
                return self.read_fragment();
            }
        }

        Ok(self.read_end(ReadEndState::ValidUrl))
    }

    /// The url has been read to here; commit it if valid and reset all
    /// per-candidate state.
    fn read_end(&mut self, state: ReadEndState) -> bool {
        if state == ReadEndState::ValidUrl && !self.buffer.is_empty() {
            // if the last character is a quote that opened the candidate,
            // cut it off
            if self.matcher.quote_start() && self.buffer.last() == Some(&'"') {
                self.buffer.pop();
            }

            if !self.buffer.is_empty() {
                let original: String = self.buffer.iter().collect();
                self.current_url_marker.set_original_url(original);
                let marker = std::mem::take(&mut self.current_url_marker);
                self.url_list.push(Url::from_marker(marker));
            }
        }

        self.buffer.clear();
        self.matcher.reset_quote_start();
        self.has_scheme = false;
        self.dont_match_ipv6 = false;
        self.current_url_marker = UrlMarker::new();

        state == ReadEndState::ValidUrl
    }
}
