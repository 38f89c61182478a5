/// Errors that can occur while detecting or parsing URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The input contained no URL, or more than one, where exactly one was
    /// expected. The payload describes which case was hit.
    MalformedUrl(String),
    /// The scanner moved backwards more than ten times the input length.
    /// This is a liveness guard against inputs that cause the detector and
    /// the domain reader to ping-pong forever. The payload is a snippet of
    /// the region being re-read when the budget ran out.
    BacktrackLimitExceeded(String),
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::MalformedUrl(reason) => write!(f, "malformed URL: {reason}"),
            Self::BacktrackLimitExceeded(snippet) => write!(
                f,
                "backtracked max amount of characters, endless loop detected near '{snippet}'"
            ),
        }
    }
}

impl std::error::Error for ParseError {}

/// Result type for URL detection operations
pub type Result<T> = core::result::Result<T, ParseError>;
