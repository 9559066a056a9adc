//! Fixed-width node names.
//!
//! Every node header starts with an eight byte, left-justified, space padded
//! ASCII name (an "eightcc"). Literal nodes conventionally start with `#`,
//! for example `#int` or `#str`; grammar nodes use whatever names the grammar
//! picks.
//!
//! # Example
//!
//! ```rust
//! use yyast::tag::Tag;
//!
//! let tag = Tag::new("expr");
//! assert_eq!(tag.as_bytes(), b"expr    ");
//! assert_eq!(tag.to_string(), "expr");
//! assert_eq!(Tag::new("much_too_long"), Tag::new("much_too"));
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Width of a tag in bytes.
pub const TAG_SIZE: usize = 8;

/// An eight byte node name.
///
/// Equality and ordering compare the raw bytes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag([u8; TAG_SIZE]);

impl Tag {
    /// The all-spaces tag.
    pub const BLANK: Tag = Tag([b' '; TAG_SIZE]);

    /// Create a tag from a name, padding with spaces or truncating to 8 bytes.
    pub fn new(name: &str) -> Self {
        let mut bytes = [b' '; TAG_SIZE];
        for (slot, byte) in bytes.iter_mut().zip(name.bytes()) {
            *slot = byte;
        }
        Tag(bytes)
    }

    /// Wrap raw header bytes.
    #[inline]
    pub const fn from_bytes(bytes: [u8; TAG_SIZE]) -> Self {
        Tag(bytes)
    }

    /// The raw, padded bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; TAG_SIZE] {
        &self.0
    }

    /// Whether this is a literal name (starts with `#`).
    pub fn is_literal(&self) -> bool {
        self.0[0] == b'#'
    }

    fn trimmed(&self) -> &[u8] {
        let end = self
            .0
            .iter()
            .rposition(|&b| b != b' ')
            .map_or(0, |last| last + 1);
        &self.0[..end]
    }
}

impl From<&str> for Tag {
    fn from(name: &str) -> Self {
        Tag::new(name)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.trimmed()))
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({:?})", String::from_utf8_lossy(&self.0))
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Tag::new(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pads_with_spaces() {
        assert_eq!(Tag::new("#int").as_bytes(), b"#int    ");
        assert_eq!(Tag::new(""), Tag::BLANK);
    }

    #[test]
    fn test_truncates_long_names() {
        assert_eq!(Tag::new("abcdefghij").as_bytes(), b"abcdefgh");
    }

    #[test]
    fn test_display_trims_padding() {
        assert_eq!(Tag::new("#re").to_string(), "#re");
        assert_eq!(Tag::BLANK.to_string(), "");
    }

    #[test]
    fn test_ordering_is_bytewise() {
        assert!(Tag::new("a") < Tag::new("b"));
        assert!(Tag::new("a") < Tag::new("aa"));
        assert_eq!(Tag::from_bytes(*b"expr    "), Tag::new("expr"));
    }

    #[test]
    fn test_literal_names() {
        assert!(Tag::new("#str").is_literal());
        assert!(!Tag::new("stmt").is_literal());
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&Tag::new("#flt")).unwrap();
        assert_eq!(json, "\"#flt\"");
        let back: Tag = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Tag::new("#flt"));
    }
}
