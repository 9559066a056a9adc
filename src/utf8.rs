//! UTF-8 helpers shared by the position tracker and the escape decoder.
//!
//! Both sides use the pre RFC 3629 UTF-8 scheme with sequences of
//! up to six bytes, so any 31-bit code point can be re-encoded.

/// Largest code point the six byte scheme can represent.
pub const MAX_CODE_POINT: u32 = 0x7FFF_FFFF;

/// Longest encoded sequence.
pub const MAX_SEQUENCE_LEN: usize = 6;

/// Classification of a single UTF-8 byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteClass {
    /// Single-byte character (0x00-0x7F).
    Single(u8),
    /// Continuation byte (10xxxxxx).
    Cont(u8),
    /// Lead byte with the number of continuation bytes that follow.
    Leading(u8),
    /// 0xFE and 0xFF never appear in UTF-8.
    Invalid,
}

impl ByteClass {
    /// Classify a byte by its run of leading one bits.
    ///
    /// A lead byte with `n` leading ones is followed by `n - 1`
    /// continuation bytes.
    pub fn classify(byte: u8) -> Self {
        match byte.leading_ones() {
            0 => ByteClass::Single(byte),
            1 => ByteClass::Cont(byte & 0b0011_1111),
            ones @ 2..=6 => ByteClass::Leading(ones as u8 - 1),
            _ => ByteClass::Invalid,
        }
    }

    /// Whether this byte starts a new character on screen.
    ///
    /// Printable ASCII and every lead byte count, continuation bytes and
    /// control characters do not.
    pub fn advances_column(self) -> bool {
        match self {
            ByteClass::Single(byte) => (0x20..=0x7E).contains(&byte),
            ByteClass::Leading(_) | ByteClass::Invalid => true,
            ByteClass::Cont(_) => false,
        }
    }
}

/// Number of bytes needed to encode `code_point`, or `None` past 31 bits.
pub fn encoded_len(code_point: u32) -> Option<usize> {
    match code_point {
        0..=0x7F => Some(1),
        0x80..=0x7FF => Some(2),
        0x800..=0xFFFF => Some(3),
        0x1_0000..=0x1F_FFFF => Some(4),
        0x20_0000..=0x3FF_FFFF => Some(5),
        0x400_0000..=MAX_CODE_POINT => Some(6),
        _ => None,
    }
}

/// Encode a code point into `out`, returning the number of bytes written.
///
/// Surrogates and values above U+10FFFF are encoded like any other value.
pub fn encode_code_point(code_point: u32, out: &mut [u8; MAX_SEQUENCE_LEN]) -> Option<usize> {
    const LEAD_MARKERS: [u8; MAX_SEQUENCE_LEN + 1] = [0, 0, 0xC0, 0xE0, 0xF0, 0xF8, 0xFC];

    let len = encoded_len(code_point)?;
    if len == 1 {
        out[0] = code_point as u8;
        return Some(1);
    }

    let mut rest = code_point;
    for slot in out[1..len].iter_mut().rev() {
        *slot = 0x80 | (rest & 0x3F) as u8;
        rest >>= 6;
    }
    out[0] = LEAD_MARKERS[len] | rest as u8;
    Some(len)
}
