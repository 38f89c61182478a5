//! Find URLs in arbitrary text and normalize them the way a browser
//! would, not the way RFC 3986 says.
//!
//! The detector recognizes anything a mainstream address bar will follow:
//! bare hosts (`www.google.com`), userinfo (`user:pass@host`), numeric
//! hosts in decimal, octal and hex, IPv6 literals with zone indices, and
//! percent-encoded dots and colons. Overdetection is acceptable; missing
//! a browser-visitable URL is not. Context options teach the scanner
//! about quotes, brackets, and markup so URLs embedded in HTML, JSON, or
//! JavaScript come out clean.
//!
//! ```
//! use urlsift::{DetectorOptions, detect};
//!
//! let urls = detect(
//!     "<a href=\"http://www.google.com/\">google.com</a>",
//!     DetectorOptions::HTML,
//! )
//! .unwrap();
//! let found: Vec<&str> = urls.iter().map(|u| u.original_url()).collect();
//! assert_eq!(found, ["http://www.google.com/", "google.com"]);
//! ```

// Internal modules (not public API)
mod char_util;
mod detection;
mod error;
mod marker;
mod normalize;
mod options;
mod reader;
mod url;
mod url_util;

// Public API
pub use detection::UrlDetector;
pub use error::ParseError;
pub use options::DetectorOptions;
pub use url::{NormalizedUrl, Url};

pub type Result<T> = core::result::Result<T, ParseError>;

/// Detect every URL in `text`, in the order they appear.
///
/// # Errors
///
/// Fails only when the backtrack budget is exceeded on pathological
/// input; text without URLs simply yields an empty list.
pub fn detect(text: &str, options: DetectorOptions) -> Result<Vec<Url>> {
    UrlDetector::new(text, options).detect()
}
