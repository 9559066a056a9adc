//! Literal decoding.
//!
//! Pure functions that turn raw token text into payload values. Nothing here
//! knows about positions; the [`AstBuilder`](crate::builder::AstBuilder)
//! attaches the tracker position when it wraps a [`LiteralError`].
//!
//! - Integers: any base from 0 to 64 using the RFC 4648 alphabets, accumulated
//!   in 128 bits. Characters outside the alphabet are skipped, so `1_000`
//!   reads as one thousand.
//! - Floats: the longest strtod-style decimal prefix, with overflow and
//!   underflow reported instead of silently producing `inf` or `0`.
//! - Text: backslash escapes, decoded in place.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ErrorKind;
use crate::node::NodeType;
use crate::utf8::{self, MAX_SEQUENCE_LEN};

/// Highest supported integer base.
pub const MAX_BASE: u32 = 64;

/// Errors from decoding literal text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum LiteralError {
    /// No digits at all.
    #[error("could not convert {what} value '{text}'")]
    Malformed { what: &'static str, text: String },
    /// The value does not fit in 128 bits.
    #[error("overflow of integer literal '{text}'")]
    IntegerOverflow { text: String },
    #[error("could not convert real value '{text}', overflow")]
    FloatOverflow { text: String },
    #[error("could not convert real value '{text}', underflow")]
    FloatUnderflow { text: String },
    #[error("could not decode hex escape character '{}'", .found.escape_ascii())]
    InvalidHexDigit { found: u8 },
    #[error("escape sequence ends before its {expected} hex digits")]
    TruncatedEscape { expected: usize },
    #[error("code point {0:#x} can not be encoded as UTF-8")]
    InvalidCodePoint(u32),
    /// A grammar asked for a base the decoder has no alphabet for.
    #[error("integer base {0} is not supported, the maximum is 64")]
    UnsupportedBase(u32),
}

impl LiteralError {
    /// The classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LiteralError::Malformed { .. } => ErrorKind::MalformedLiteral,
            LiteralError::IntegerOverflow { .. } | LiteralError::FloatOverflow { .. } => {
                ErrorKind::NumericOverflow
            }
            LiteralError::FloatUnderflow { .. } => ErrorKind::NumericUnderflow,
            LiteralError::InvalidHexDigit { .. }
            | LiteralError::TruncatedEscape { .. }
            | LiteralError::InvalidCodePoint(_) => ErrorKind::MalformedEscape,
            LiteralError::UnsupportedBase(_) => ErrorKind::InternalConsistency,
        }
    }
}

fn lossy(text: &[u8]) -> String {
    String::from_utf8_lossy(text).into_owned()
}

// ============================================================================
// Integers
// ============================================================================

/// Sign of an integer literal. The payload never stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sign {
    /// No sign or `+`.
    Positive,
    /// `-`.
    Negative,
}

impl Sign {
    /// The node type carrying this sign.
    pub fn node_type(self) -> NodeType {
        match self {
            Sign::Positive => NodeType::PositiveInteger,
            Sign::Negative => NodeType::NegativeInteger,
        }
    }
}

/// Value of `c` as a digit in `base`, or `None` if it is not one.
///
/// Base 32 uses the RFC 4648 Base32 alphabet, bases 37 to 64 the Base64
/// alphabet, every other base the extended hex alphabet `0-9A-Z`. Letters
/// are case-insensitive except in the Base64 alphabet.
pub fn digit_value(c: u8, base: u32) -> Option<u32> {
    let value = match base {
        32 => match c {
            b'A'..=b'Z' => c - b'A',
            b'a'..=b'z' => c - b'a',
            b'2'..=b'7' => c - b'2' + 26,
            _ => return None,
        },
        37..=MAX_BASE => match c {
            b'A'..=b'Z' => c - b'A',
            b'a'..=b'z' => c - b'a' + 26,
            b'0'..=b'9' => c - b'0' + 52,
            b'+' => 62,
            b'/' => 63,
            _ => return None,
        },
        _ => match c {
            b'0'..=b'9' => c - b'0',
            b'A'..=b'Z' => c - b'A' + 10,
            b'a'..=b'z' => c - b'a' + 10,
            _ => return None,
        },
    } as u32;

    (value < base).then_some(value)
}

/// Decode the digits of an integer in `base`.
///
/// Characters that are not digits of `base` are skipped. Text without a
/// single digit is malformed; a value that needs more than 128 bits is an
/// overflow.
pub fn decode_integer(digits: &[u8], base: u32) -> Result<u128, LiteralError> {
    if base > MAX_BASE {
        return Err(LiteralError::UnsupportedBase(base));
    }

    let mut value: u128 = 0;
    let mut seen_digit = false;
    for &c in digits {
        let Some(digit) = digit_value(c, base) else {
            continue;
        };
        seen_digit = true;
        value = value
            .checked_mul(u128::from(base))
            .and_then(|v| v.checked_add(u128::from(digit)))
            .ok_or_else(|| LiteralError::IntegerOverflow { text: lossy(digits) })?;
    }

    if !seen_digit {
        return Err(LiteralError::Malformed {
            what: "int",
            text: lossy(digits),
        });
    }
    Ok(value)
}

/// Big-endian payload for an integer magnitude: 8 bytes when it fits in
/// 64 bits, 16 bytes otherwise.
pub fn integer_payload(value: u128) -> Vec<u8> {
    match u64::try_from(value) {
        Ok(small) => small.to_be_bytes().to_vec(),
        Err(_) => value.to_be_bytes().to_vec(),
    }
}

/// Decode a C-style integer literal.
///
/// Accepts an optional sign, then `0x`, `0o`, `0b` or `0d` for hex, octal,
/// binary or decimal; a bare leading `0` means octal and anything else is
/// decimal.
pub fn parse_c_integer(text: &[u8]) -> Result<(Sign, u128), LiteralError> {
    let (sign, rest) = match text {
        [b'-', rest @ ..] => (Sign::Negative, rest),
        [b'+', rest @ ..] => (Sign::Positive, rest),
        _ => (Sign::Positive, text),
    };

    let (base, digits) = match rest {
        [b'0', b'x' | b'X', digits @ ..] => (16, digits),
        [b'0', b'o' | b'O', digits @ ..] => (8, digits),
        [b'0', b'b' | b'B', digits @ ..] => (2, digits),
        [b'0', b'd' | b'D', digits @ ..] => (10, digits),
        // Keep the zero itself so that a lone "0" still has a digit.
        [b'0', ..] => (8, rest),
        _ => (10, rest),
    };

    match decode_integer(digits, base) {
        Ok(value) => Ok((sign, value)),
        Err(LiteralError::Malformed { what, .. }) => Err(LiteralError::Malformed {
            what,
            text: lossy(text),
        }),
        Err(err) => Err(err),
    }
}

// ============================================================================
// Floats
// ============================================================================

struct FloatPrefix {
    len: usize,
    special: bool,
    nonzero_mantissa: bool,
}

fn count_digits(bytes: &[u8], from: usize) -> usize {
    bytes
        .get(from..)
        .map_or(0, |tail| tail.iter().take_while(|b| b.is_ascii_digit()).count())
}

/// Find the longest prefix strtod would consume.
fn scan_float_prefix(text: &str) -> FloatPrefix {
    let bytes = text.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i = 1;
    }

    for word in ["infinity", "inf", "nan"] {
        let end = i + word.len();
        if bytes.len() >= end && bytes[i..end].eq_ignore_ascii_case(word.as_bytes()) {
            return FloatPrefix {
                len: end,
                special: true,
                nonzero_mantissa: true,
            };
        }
    }

    let mantissa_start = i;
    let int_digits = count_digits(bytes, i);
    i += int_digits;
    let mut frac_digits = 0;
    if bytes.get(i) == Some(&b'.') {
        frac_digits = count_digits(bytes, i + 1);
        if int_digits + frac_digits > 0 {
            i += 1 + frac_digits;
        }
    }

    if int_digits + frac_digits == 0 {
        return FloatPrefix {
            len: 0,
            special: false,
            nonzero_mantissa: false,
        };
    }
    let nonzero_mantissa = bytes[mantissa_start..i]
        .iter()
        .any(|b| (b'1'..=b'9').contains(b));

    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_digits = count_digits(bytes, j);
        if exp_digits > 0 {
            i = j + exp_digits;
        }
    }

    FloatPrefix {
        len: i,
        special: false,
        nonzero_mantissa,
    }
}

/// Decode a decimal floating point literal.
///
/// Leading whitespace is skipped and anything after the longest valid
/// prefix is ignored.
pub fn decode_float(text: &[u8]) -> Result<f64, LiteralError> {
    let owned = String::from_utf8_lossy(text);
    let trimmed = owned.trim_start();
    let prefix = scan_float_prefix(trimmed);

    let malformed = || LiteralError::Malformed {
        what: "real",
        text: lossy(text),
    };
    if prefix.len == 0 {
        return Err(malformed());
    }

    let value: f64 = trimmed[..prefix.len].parse().map_err(|_| malformed())?;
    if value.is_infinite() && !prefix.special {
        return Err(LiteralError::FloatOverflow { text: lossy(text) });
    }
    if value == 0.0 && prefix.nonzero_mantissa {
        return Err(LiteralError::FloatUnderflow { text: lossy(text) });
    }
    Ok(value)
}

/// Big-endian IEEE-754 binary64 payload.
pub fn float_payload(value: f64) -> Vec<u8> {
    value.to_bits().to_be_bytes().to_vec()
}

// ============================================================================
// Text
// ============================================================================

/// Which backslash escapes a text literal honours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rawness {
    /// `\n \r \t \xHH \uHHHH \UHHHHHHHH \\ \" \/`.
    #[default]
    Cooked,
    /// Only `\"`.
    Raw,
    /// Only `\/`.
    RegexRaw,
}

enum Escape {
    Byte(u8),
    Hex(usize),
    Verbatim,
}

fn classify_escape(rawness: Rawness, c: u8) -> Escape {
    match (rawness, c) {
        (Rawness::Cooked, b'n') => Escape::Byte(b'\n'),
        (Rawness::Cooked, b'r') => Escape::Byte(b'\r'),
        (Rawness::Cooked, b't') => Escape::Byte(b'\t'),
        (Rawness::Cooked, b'\\') => Escape::Byte(b'\\'),
        (Rawness::Cooked | Rawness::Raw, b'"') => Escape::Byte(b'"'),
        (Rawness::Cooked | Rawness::RegexRaw, b'/') => Escape::Byte(b'/'),
        (Rawness::Cooked, b'x') => Escape::Hex(2),
        (Rawness::Cooked, b'u') => Escape::Hex(4),
        (Rawness::Cooked, b'U') => Escape::Hex(8),
        _ => Escape::Verbatim,
    }
}

fn hex_value(c: u8) -> Result<u32, LiteralError> {
    match c {
        b'0'..=b'9' => Ok(u32::from(c - b'0')),
        b'a'..=b'f' => Ok(u32::from(c - b'a' + 10)),
        b'A'..=b'F' => Ok(u32::from(c - b'A' + 10)),
        _ => Err(LiteralError::InvalidHexDigit { found: c }),
    }
}

/// Decode backslash escapes in place, returning the decoded length.
///
/// Unknown escapes are kept with their backslash and a trailing lone
/// backslash is kept as is. Hex escapes are replaced by the UTF-8 encoding of
/// their code point. The result is never longer than the input.
pub fn unescape_in_place(buf: &mut [u8], rawness: Rawness) -> Result<usize, LiteralError> {
    let mut read = 0;
    let mut write = 0;

    while read < buf.len() {
        let c = buf[read];
        if c != b'\\' {
            buf[write] = c;
            write += 1;
            read += 1;
            continue;
        }

        let Some(&next) = buf.get(read + 1) else {
            buf[write] = b'\\';
            write += 1;
            read += 1;
            continue;
        };
        read += 2;

        match classify_escape(rawness, next) {
            Escape::Byte(byte) => {
                buf[write] = byte;
                write += 1;
            }
            Escape::Verbatim => {
                buf[write] = b'\\';
                buf[write + 1] = next;
                write += 2;
            }
            Escape::Hex(expected) => {
                let digits = buf
                    .get(read..read + expected)
                    .ok_or(LiteralError::TruncatedEscape { expected })?;
                let code_point = digits
                    .iter()
                    .try_fold(0u32, |acc, &d| hex_value(d).map(|v| (acc << 4) | v))?;
                read += expected;

                let mut encoded = [0u8; MAX_SEQUENCE_LEN];
                let len = utf8::encode_code_point(code_point, &mut encoded)
                    .ok_or(LiteralError::InvalidCodePoint(code_point))?;
                buf[write..write + len].copy_from_slice(&encoded[..len]);
                write += len;
            }
        }
    }

    Ok(write)
}

/// Decode backslash escapes into a new buffer.
pub fn unescape(text: &[u8], rawness: Rawness) -> Result<Vec<u8>, LiteralError> {
    let mut buf = text.to_vec();
    let len = unescape_in_place(&mut buf, rawness)?;
    buf.truncate(len);
    Ok(buf)
}
