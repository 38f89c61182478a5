//! The detection state machines: the top-level scanner and the nested
//! domain reader it hands the cursor to.

mod detector;
mod domain;

pub use detector::UrlDetector;
