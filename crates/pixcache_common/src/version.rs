//! Loosely structured version strings such as tool versions reported by
//! external programs ("3.04.01", "4.0.0-beta.1", "5.3.0-dev").

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// One component of a [`LooseVersion`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionPart {
    /// A run of ASCII digits.
    Number(u64),
    /// A run of anything else, with separators removed.
    Text(String),
}

impl PartialOrd for VersionPart {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionPart {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (VersionPart::Number(a), VersionPart::Number(b)) => a.cmp(b),
            (VersionPart::Text(a), VersionPart::Text(b)) => a.cmp(b),
            (VersionPart::Number(_), VersionPart::Text(_)) => Ordering::Less,
            (VersionPart::Text(_), VersionPart::Number(_)) => Ordering::Greater,
        }
    }
}

/// A version number with no fixed scheme.
///
/// The string is split into runs of digits and runs of other characters;
/// `.`, `-`, `_` and `+` only separate runs. Versions compare component by
/// component, numbers numerically, so `"3.10" > "3.9"` and `"4.0" > "3.05"`.
///
/// The canonical form used for display (and for cache keys) is the original
/// string, trimmed.
#[derive(Clone)]
pub struct LooseVersion {
    text: String,
    parts: Vec<VersionPart>,
}

impl LooseVersion {
    /// Parses a version string. Never fails: any string is a loose version.
    pub fn new(text: &str) -> Self {
        let text = text.trim().to_string();
        let parts = split_parts(&text);
        Self { text, parts }
    }

    /// The parsed components.
    pub fn parts(&self) -> &[VersionPart] {
        &self.parts
    }

    /// The version string as given.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

fn split_parts(text: &str) -> Vec<VersionPart> {
    let mut parts = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        if matches!(c, '.' | '-' | '_' | '+') || c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() {
            let mut run = String::new();
            while let Some(&d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                run.push(d);
                chars.next();
            }
            match run.parse() {
                Ok(n) => parts.push(VersionPart::Number(n)),
                Err(_) => parts.push(VersionPart::Text(run)),
            }
        } else {
            let mut run = String::new();
            while let Some(&t) = chars.peek().filter(|&&t| {
                !t.is_ascii_digit() && !t.is_whitespace() && !matches!(t, '.' | '-' | '_' | '+')
            }) {
                run.push(t);
                chars.next();
            }
            parts.push(VersionPart::Text(run));
        }
    }
    parts
}

impl PartialEq for LooseVersion {
    fn eq(&self, other: &Self) -> bool {
        self.parts == other.parts
    }
}

impl Eq for LooseVersion {}

impl PartialOrd for LooseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LooseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parts.cmp(&other.parts)
    }
}

impl fmt::Display for LooseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl fmt::Debug for LooseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LooseVersion({:?})", self.text)
    }
}

impl FromStr for LooseVersion {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl Serialize for LooseVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for LooseVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Self::new(&text))
    }
}
