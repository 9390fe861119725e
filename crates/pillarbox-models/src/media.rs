use std::fmt;

use url::Url;

const URN_PREFIX: &str = "urn:";

/// A data source handed to `initialize`, classified once by its prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaReference {
    /// Business-catalog identifier, resolved by the engine.
    Urn(String),
    /// Anything else, handed to the engine as a direct source. The engine
    /// decides whether it can play it.
    Url(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Urn,
    Url,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Urn => "urn",
            MediaKind::Url => "url",
        }
    }
}

impl MediaReference {
    pub fn parse(reference: &str) -> Self {
        if reference.starts_with(URN_PREFIX) {
            MediaReference::Urn(reference.to_string())
        } else {
            MediaReference::Url(reference.to_string())
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            MediaReference::Urn(_) => MediaKind::Urn,
            MediaReference::Url(_) => MediaKind::Url,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MediaReference::Urn(urn) => urn,
            MediaReference::Url(url) => url,
        }
    }

    /// The source as an absolute URL, when it is one. Catalog references and
    /// scheme-less paths yield `None`.
    pub fn url(&self) -> Option<Url> {
        match self {
            MediaReference::Urn(_) => None,
            MediaReference::Url(raw) => Url::parse(raw).ok(),
        }
    }
}

impl fmt::Display for MediaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
