//! Component offsets recorded by the detector.
//!
//! A marker stores where each component starts inside the committed URL
//! string, in character positions. Components are sliced out lazily by the
//! accessors in [`crate::url`]; nothing here copies text.

/// The seven URL components, in the order they appear in a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UrlPart {
    Scheme,
    UsernamePassword,
    Host,
    Port,
    Path,
    Query,
    Fragment,
}

impl UrlPart {
    /// The component that follows this one in a URL, if any.
    pub(crate) fn next(self) -> Option<UrlPart> {
        match self {
            Self::Scheme => Some(Self::UsernamePassword),
            Self::UsernamePassword => Some(Self::Host),
            Self::Host => Some(Self::Port),
            Self::Port => Some(Self::Path),
            Self::Path => Some(Self::Query),
            Self::Query => Some(Self::Fragment),
            Self::Fragment => None,
        }
    }

    fn slot(self) -> usize {
        match self {
            Self::Scheme => 0,
            Self::UsernamePassword => 1,
            Self::Host => 2,
            Self::Port => 3,
            Self::Path => 4,
            Self::Query => 5,
            Self::Fragment => 6,
        }
    }
}

/// Start offsets (in characters) of each component of a detected URL,
/// plus the original text the offsets point into.
#[derive(Debug, Clone, Default)]
pub(crate) struct UrlMarker {
    original_url: String,
    indices: [Option<usize>; 7],
}

impl UrlMarker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_original_url(&mut self, original_url: String) {
        self.original_url = original_url;
    }

    pub(crate) fn original_url(&self) -> &str {
        &self.original_url
    }

    pub(crate) fn set_index(&mut self, part: UrlPart, index: usize) {
        self.indices[part.slot()] = Some(index);
    }

    pub(crate) fn unset_index(&mut self, part: UrlPart) {
        self.indices[part.slot()] = None;
    }

    pub(crate) fn index_of(&self, part: UrlPart) -> Option<usize> {
        self.indices[part.slot()]
    }

    /// Build a marker from explicit offsets, in component order.
    #[cfg(test)]
    pub(crate) fn with_indices(original_url: &str, indices: [Option<usize>; 7]) -> Self {
        Self {
            original_url: original_url.to_string(),
            indices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_order() {
        let mut part = UrlPart::Scheme;
        let mut seen = vec![part];
        while let Some(next) = part.next() {
            seen.push(next);
            part = next;
        }
        assert_eq!(seen.len(), 7);
        assert_eq!(part, UrlPart::Fragment);
    }

    #[test]
    fn test_set_and_unset() {
        let mut marker = UrlMarker::new();
        assert_eq!(marker.index_of(UrlPart::Host), None);
        marker.set_index(UrlPart::Host, 3);
        assert_eq!(marker.index_of(UrlPart::Host), Some(3));
        marker.unset_index(UrlPart::Host);
        assert_eq!(marker.index_of(UrlPart::Host), None);
    }
}
