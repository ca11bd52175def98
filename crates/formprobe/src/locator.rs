//! Locator candidates and ordered locator sets.
//!
//! A logical element ("the login button") is rarely reachable through one
//! guaranteed selector. A [`LocatorSet`] lists every known way to find it, in
//! order of preference; the cascade tries them first to last.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::result::{ProbeError, ProbeResult};

/// Strategy used to find an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// `name` attribute (e.g., `email`)
    #[serde(rename = "name")]
    ByName,
    /// XPath expression
    #[serde(rename = "xpath")]
    ByXPath,
    /// Tag name (e.g., `button`)
    #[serde(rename = "tag")]
    ByTag,
    /// CSS selector
    #[serde(rename = "css")]
    ByCss,
}

impl Strategy {
    /// Short prefix used in `Display` and `FromStr`
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::ByName => "name",
            Self::ByXPath => "xpath",
            Self::ByTag => "tag",
            Self::ByCss => "css",
        }
    }
}

/// One concrete way of finding an element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocatorCandidate {
    /// Lookup strategy
    #[serde(rename = "by")]
    pub strategy: Strategy,
    /// Strategy-specific expression
    #[serde(rename = "value")]
    pub expression: String,
}

impl LocatorCandidate {
    /// Create a candidate
    #[must_use]
    pub fn new(strategy: Strategy, expression: impl Into<String>) -> Self {
        Self {
            strategy,
            expression: expression.into(),
        }
    }

    /// Find by `name` attribute
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::new(Strategy::ByName, name)
    }

    /// Find by XPath
    #[must_use]
    pub fn xpath(xpath: impl Into<String>) -> Self {
        Self::new(Strategy::ByXPath, xpath)
    }

    /// Find by tag name
    #[must_use]
    pub fn tag(tag: impl Into<String>) -> Self {
        Self::new(Strategy::ByTag, tag)
    }

    /// Find by CSS selector
    #[must_use]
    pub fn css(css: impl Into<String>) -> Self {
        Self::new(Strategy::ByCss, css)
    }

    /// Equivalent CSS selector, when the strategy has one
    #[must_use]
    pub fn to_css(&self) -> Option<String> {
        match self.strategy {
            Strategy::ByName => Some(format!("[name={:?}]", self.expression)),
            Strategy::ByTag | Strategy::ByCss => Some(self.expression.clone()),
            Strategy::ByXPath => None,
        }
    }

    /// JavaScript expression evaluating to the first matching node (or `null`)
    #[must_use]
    pub fn to_query(&self) -> String {
        match self.to_css() {
            Some(css) => format!("document.querySelector({css:?})"),
            None => format!(
                "document.evaluate({:?}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
                self.expression
            ),
        }
    }

    /// JavaScript expression evaluating to an array of every matching node
    #[must_use]
    pub fn to_query_all(&self) -> String {
        match self.to_css() {
            Some(css) => format!("Array.from(document.querySelectorAll({css:?}))"),
            None => format!(
                "(() => {{ const r = document.evaluate({:?}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
                 return Array.from({{ length: r.snapshotLength }}, (_, i) => r.snapshotItem(i)); }})()",
                self.expression
            ),
        }
    }
}

impl fmt::Display for LocatorCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.strategy.prefix(), self.expression)
    }
}

impl FromStr for LocatorCandidate {
    type Err = ProbeError;

    /// Parse `name=email`, `xpath=//button`, `tag=button` or `css=#id`.
    /// A bare string starting with `/` or `(` is taken as XPath.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((prefix, expr)) = s.split_once('=') {
            let strategy = match prefix {
                "name" => Some(Strategy::ByName),
                "xpath" => Some(Strategy::ByXPath),
                "tag" => Some(Strategy::ByTag),
                "css" => Some(Strategy::ByCss),
                _ => None,
            };
            if let Some(strategy) = strategy {
                if expr.is_empty() {
                    return Err(ProbeError::config(format!("empty locator expression in `{s}`")));
                }
                return Ok(Self::new(strategy, expr));
            }
        }
        if s.starts_with('/') || s.starts_with('(') {
            return Ok(Self::xpath(s));
        }
        Err(ProbeError::config(format!(
            "cannot parse locator `{s}` (expected name=, xpath=, tag= or css=)"
        )))
    }
}

/// Ordered, non-empty list of candidates for one logical element
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocatorSet {
    target: String,
    candidates: Vec<LocatorCandidate>,
}

impl LocatorSet {
    /// Create a locator set. Order of `candidates` is the order they are tried.
    pub fn new(
        target: impl Into<String>,
        candidates: impl IntoIterator<Item = LocatorCandidate>,
    ) -> ProbeResult<Self> {
        let target = target.into();
        let candidates: Vec<_> = candidates.into_iter().collect();
        if candidates.is_empty() {
            return Err(ProbeError::EmptyLocatorSet { target });
        }
        Ok(Self { target, candidates })
    }

    /// Create a set from a primary candidate and its fallbacks; never empty
    #[must_use]
    pub fn with_fallbacks(
        target: impl Into<String>,
        primary: LocatorCandidate,
        fallbacks: impl IntoIterator<Item = LocatorCandidate>,
    ) -> Self {
        let mut candidates = vec![primary];
        candidates.extend(fallbacks);
        Self {
            target: target.into(),
            candidates,
        }
    }

    /// Create a set of XPath candidates
    pub fn xpaths<I, S>(target: impl Into<String>, xpaths: I) -> ProbeResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(target, xpaths.into_iter().map(LocatorCandidate::xpath))
    }

    /// Logical element name
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Candidates in try order
    #[must_use]
    pub fn candidates(&self) -> &[LocatorCandidate] {
        &self.candidates
    }

    /// Preferred candidate
    #[must_use]
    pub fn primary(&self) -> &LocatorCandidate {
        &self.candidates[0]
    }

    /// Number of candidates (never zero)
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Always false; present for API symmetry with slices
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Iterate candidates in try order
    pub fn iter(&self) -> std::slice::Iter<'_, LocatorCandidate> {
        self.candidates.iter()
    }

    /// Same candidates under another logical name
    #[must_use]
    pub fn renamed(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }
}

impl<'a> IntoIterator for &'a LocatorSet {
    type Item = &'a LocatorCandidate;
    type IntoIter = std::slice::Iter<'a, LocatorCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for LocatorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [", self.target)?;
        for (i, c) in self.candidates.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{c}")?;
        }
        write!(f, "]")
    }
}
