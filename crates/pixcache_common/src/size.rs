//! Byte-size values with binary unit parsing and display.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

/// A size in bytes.
///
/// Supports parsing from strings like "1GiB", "512MiB", "64KiB", "4096B",
/// and bare integers (interpreted as bytes). Displays using the largest
/// binary unit that divides the value exactly.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteSize(u64);

impl ByteSize {
    /// One gibibyte.
    pub const GIB: ByteSize = ByteSize(GIB);

    /// Creates a size from a byte count.
    pub const fn new(bytes: u64) -> Self {
        Self(bytes)
    }

    /// Creates a size from a count of mebibytes.
    pub const fn mib(n: u64) -> Self {
        Self(n * MIB)
    }

    /// Returns the size in bytes.
    pub fn bytes(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteSize({self})")
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0;
        if b != 0 && b % GIB == 0 {
            write!(f, "{}GiB", b / GIB)
        } else if b != 0 && b % MIB == 0 {
            write!(f, "{}MiB", b / MIB)
        } else if b != 0 && b % KIB == 0 {
            write!(f, "{}KiB", b / KIB)
        } else {
            write!(f, "{b}B")
        }
    }
}

/// Error type for parsing size strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid size: '{input}'")]
pub struct ParseSizeError {
    /// The input string that failed to parse.
    pub input: String,
}

impl FromStr for ByteSize {
    type Err = ParseSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParseSizeError {
            input: s.to_string(),
        };

        let lower = s.to_ascii_lowercase();
        let (num, scale) = if let Some(num) = lower.strip_suffix("gib") {
            (num, GIB)
        } else if let Some(num) = lower.strip_suffix("mib") {
            (num, MIB)
        } else if let Some(num) = lower.strip_suffix("kib") {
            (num, KIB)
        } else if let Some(num) = lower.strip_suffix('b') {
            (num, 1)
        } else {
            (lower.as_str(), 1)
        };

        let val: u64 = num.trim().parse().map_err(|_| err())?;
        val.checked_mul(scale).map(ByteSize).ok_or_else(err)
    }
}

impl Serialize for ByteSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bytes(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Bytes(b) => Ok(ByteSize(b)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_gib() {
        let s: ByteSize = "1GiB".parse().unwrap();
        assert_eq!(s.bytes(), 1024 * 1024 * 1024);
        assert_eq!(s, ByteSize::GIB);
    }

    #[test]
    fn parse_mib() {
        let s: ByteSize = "512MiB".parse().unwrap();
        assert_eq!(s.bytes(), 512 * 1024 * 1024);
    }

    #[test]
    fn parse_kib_and_bytes() {
        assert_eq!("64KiB".parse::<ByteSize>().unwrap().bytes(), 65_536);
        assert_eq!("4096B".parse::<ByteSize>().unwrap().bytes(), 4096);
        assert_eq!("4096".parse::<ByteSize>().unwrap().bytes(), 4096);
    }

    #[test]
    fn parse_case_insensitive() {
        let s: ByteSize = "2gib".parse().unwrap();
        assert_eq!(s.bytes(), 2 * 1024 * 1024 * 1024);
    }

    #[test]
    fn parse_invalid() {
        assert!("lots".parse::<ByteSize>().is_err());
        assert!("1.5GiB".parse::<ByteSize>().is_err());
        assert!("-1MiB".parse::<ByteSize>().is_err());
    }

    #[test]
    fn parse_overflow_is_error() {
        assert!("18446744073709551615GiB".parse::<ByteSize>().is_err());
    }

    #[test]
    fn display_selects_best_unit() {
        assert_eq!(ByteSize::GIB.to_string(), "1GiB");
        assert_eq!(ByteSize::mib(3).to_string(), "3MiB");
        assert_eq!(ByteSize::new(65_536).to_string(), "64KiB");
        assert_eq!(ByteSize::new(1000).to_string(), "1000B");
        assert_eq!(ByteSize::new(0).to_string(), "0B");
    }

    #[test]
    fn serde_accepts_number_or_string() {
        let a: ByteSize = serde_json::from_str("\"1MiB\"").unwrap();
        let b: ByteSize = serde_json::from_str("1048576").unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"1MiB\"");
    }
}
