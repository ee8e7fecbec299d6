//! Canonical article titles
//!
//! A [`Title`] is the identity of a node in the sense graph. Every title that
//! enters the crawler passes through [`normalize_title`], so two spellings of
//! the same article (`shot_put`, ` Shot  put `, `Shot put#History`) collapse
//! to one value.

mod normalize;

pub use normalize::{normalize_title, title_from_href};

use crate::TitleError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A normalized article title
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Title(String);

impl Title {
    /// Normalizes `raw` into a canonical title
    ///
    /// # Example
    ///
    /// ```
    /// use disamgraph::Title;
    ///
    /// let title = Title::new("shot_put#History").unwrap();
    /// assert_eq!(title.as_str(), "Shot put");
    /// ```
    pub fn new(raw: &str) -> Result<Self, TitleError> {
        normalize_title(raw)
    }

    /// Builds the title of the disambiguation page for `term`
    pub fn disambiguation(term: &str, suffix: &str) -> Result<Self, TitleError> {
        Self::new(&format!("{}{}", term.trim(), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Wraps an already-normalized string
    pub(crate) fn from_normalized(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Title {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Title {
    type Err = TitleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for Title {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
