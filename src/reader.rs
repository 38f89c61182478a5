//! Character-by-character input reader with bounded backtracking.
//!
//! The detector and the domain reader share one of these: both advance the
//! same cursor, and either may rewind it when a candidate turns out not to
//! be a URL. Rewinding is budgeted so that pathological inputs (for
//! example `http:http:http://`) terminate with an error instead of
//! ping-ponging forever.

use crate::char_util::is_whitespace;
use crate::error::{ParseError, Result};

/// The number of times something can be backtracked is this multiplier
/// times the length of the input.
const MAX_BACKTRACK_MULTIPLIER: usize = 10;

/// When reporting an exceeded budget, include at least this many
/// characters of the offending region (clamped to the available tail).
const MIN_BACKTRACK_SNIPPET: usize = 20;

/// Reads input text one character at a time with one-character pushback,
/// absolute seeks, and a cumulative backtrack budget.
pub(crate) struct InputTextReader {
    content: Vec<char>,
    index: usize,
    /// Total characters moved backwards so far.
    backtracked: usize,
}

impl InputTextReader {
    pub(crate) fn new(content: &str) -> Self {
        Self {
            content: content.chars().collect(),
            index: 0,
            backtracked: 0,
        }
    }

    /// Read the next character and advance. Whitespace is normalized to an
    /// ASCII space. Callers must check [`eof`](Self::eof) first.
    pub(crate) fn read(&mut self) -> char {
        let c = self.content[self.index];
        self.index += 1;
        if is_whitespace(c) { ' ' } else { c }
    }

    /// Peek at the next `n` characters without advancing. Callers must
    /// check [`can_read`](Self::can_read) first.
    pub(crate) fn peek(&self, n: usize) -> String {
        self.content[self.index..self.index + n].iter().collect()
    }

    /// Peek at the character `offset` positions past the cursor.
    pub(crate) fn peek_char(&self, offset: usize) -> char {
        self.content[self.index + offset]
    }

    /// Whether `n` more characters are available.
    pub(crate) fn can_read(&self, n: usize) -> bool {
        self.content.len() >= self.index + n
    }

    pub(crate) fn eof(&self) -> bool {
        self.content.len() <= self.index
    }

    pub(crate) fn position(&self) -> usize {
        self.index
    }

    /// Move the cursor to an absolute position, possibly backwards.
    pub(crate) fn seek(&mut self, position: usize) -> Result<()> {
        let backtrack_length = self.index.saturating_sub(position);
        self.backtracked += backtrack_length;
        self.index = position;
        self.check_backtrack_loop(backtrack_length)
    }

    /// Push the last character back onto the stream.
    pub(crate) fn go_back(&mut self) -> Result<()> {
        self.backtracked += 1;
        self.index = self.index.saturating_sub(1);
        self.check_backtrack_loop(1)
    }

    fn check_backtrack_loop(&self, backtrack_length: usize) -> Result<()> {
        if self.backtracked > self.content.len() * MAX_BACKTRACK_MULTIPLIER {
            let start = self.index.min(self.content.len());
            let len = backtrack_length
                .max(MIN_BACKTRACK_SNIPPET)
                .min(self.content.len() - start);
            let snippet: String = self.content[start..start + len].iter().collect();
            return Err(ParseError::BacktrackLimitExceeded(snippet));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT: &str = "HELLO WORLD";

    #[test]
    fn test_simple_read() {
        let mut reader = InputTextReader::new(CONTENT);
        for expected in CONTENT.chars() {
            assert_eq!(reader.read(), expected);
        }
    }

    #[test]
    fn test_eof() {
        let mut reader = InputTextReader::new(CONTENT);
        for _ in 0..CONTENT.len() - 1 {
            reader.read();
        }
        assert!(!reader.eof());
        reader.read();
        assert!(reader.eof());
    }

    #[test]
    fn test_go_back() {
        let chars: Vec<char> = CONTENT.chars().collect();
        let mut reader = InputTextReader::new(CONTENT);
        assert_eq!(reader.read(), chars[0]);
        reader.go_back().unwrap();
        assert_eq!(reader.read(), chars[0]);
        assert_eq!(reader.read(), chars[1]);
        assert_eq!(reader.read(), chars[2]);
        reader.go_back().unwrap();
        reader.go_back().unwrap();
        assert_eq!(reader.read(), chars[1]);
        assert_eq!(reader.read(), chars[2]);
    }

    #[test]
    fn test_seek() {
        let chars: Vec<char> = CONTENT.chars().collect();
        let mut reader = InputTextReader::new(CONTENT);
        reader.seek(4).unwrap();
        assert_eq!(reader.read(), chars[4]);

        reader.seek(1).unwrap();
        assert_eq!(reader.read(), chars[1]);
    }

    #[test]
    fn test_whitespace_normalized_to_space() {
        let mut reader = InputTextReader::new("a\tb\nc\rd");
        assert_eq!(reader.read(), 'a');
        assert_eq!(reader.read(), ' ');
        assert_eq!(reader.read(), 'b');
        assert_eq!(reader.read(), ' ');
        assert_eq!(reader.read(), 'c');
        assert_eq!(reader.read(), ' ');
        assert_eq!(reader.read(), 'd');
    }

    #[test]
    fn test_endless_loop_detection() {
        let mut reader = InputTextReader::new(CONTENT);
        let mut result = Ok(());
        for _ in 0..=MAX_BACKTRACK_MULTIPLIER {
            result = reader.seek(CONTENT.len()).and_then(|()| reader.seek(0));
            if result.is_err() {
                break;
            }
        }
        match result {
            Err(ParseError::BacktrackLimitExceeded(snippet)) => {
                assert!(CONTENT.contains(&snippet) || snippet.contains(CONTENT));
            }
            other => panic!("expected backtrack error, got {other:?}"),
        }
    }

    #[test]
    fn test_snippet_clamped_to_tail() {
        let mut reader = InputTextReader::new("abc");
        let mut err = None;
        for _ in 0..100 {
            if let Err(e) = reader.seek(3).and_then(|()| reader.seek(1)) {
                err = Some(e);
                break;
            }
        }
        match err {
            Some(ParseError::BacktrackLimitExceeded(snippet)) => {
                assert!(snippet.len() <= 3);
            }
            other => panic!("expected backtrack error, got {other:?}"),
        }
    }
}
