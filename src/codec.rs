//! Node header codec and tree decoder.
//!
//! Every node is a 32 byte header followed by its data, zero padded to a
//! multiple of 8 bytes. All integers are big-endian.
//!
//! # Node Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ Offset  0-7:  name, space padded ASCII (8 bytes)                    │
//! │ Offset  8-15: size of header + data + padding (u64)                 │
//! │ Offset 16-19: file index (u32)                                      │
//! │ Offset 20-23: line (u32)                                            │
//! │ Offset 24-27: column (u32)                                          │
//! │ Offset 28-30: reserved, zero (3 bytes)                              │
//! │ Offset 31:    node type (u8)                                        │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │ Data: empty, UTF-8 text, big-endian number, or child nodes          │
//! │ Padding: zero bytes up to the next multiple of 8                    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A branch's data is the plain concatenation of its children, so a tree can
//! be walked without any index. Unknown file, line or column values are
//! stored as `0xFFFFFFFF`.

use serde::Serialize;
use thiserror::Error;

use crate::error::ErrorKind;
use crate::node::NodeType;
use crate::position::Position;
use crate::tag::{Tag, TAG_SIZE};

/// Size of a node header in bytes.
pub const HEADER_SIZE: usize = 32;

/// Every node size is a multiple of this.
pub const ALIGNMENT: usize = 8;

const SIZE_OFFSET: usize = TAG_SIZE;
const FILE_OFFSET: usize = 16;
const LINE_OFFSET: usize = 20;
const COLUMN_OFFSET: usize = 24;
const RESERVED_OFFSET: usize = 28;
const TYPE_OFFSET: usize = 31;

/// Round `len` up to the next multiple of [`ALIGNMENT`].
#[inline]
pub const fn align8(len: usize) -> usize {
    (len + ALIGNMENT - 1) & !(ALIGNMENT - 1)
}

/// Errors from decoding encoded nodes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Fewer bytes than a header.
    #[error("buffer of {available} bytes is too short for a node header")]
    BufferTooShort {
        /// Bytes that were left.
        available: usize,
    },
    /// The declared size runs past the end of the buffer.
    #[error("node declares {declared} bytes but only {available} are available")]
    SizeMismatch {
        /// Size field of the header.
        declared: u64,
        /// Bytes that were left.
        available: usize,
    },
    /// The declared size does not even cover the header.
    #[error("node declares {declared} bytes, less than its own header")]
    SizeTooSmall {
        /// Size field of the header.
        declared: u64,
    },
}

impl DecodeError {
    /// The classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DecodeError::BufferTooShort { .. } => ErrorKind::BufferTooShort,
            DecodeError::SizeMismatch { .. } | DecodeError::SizeTooSmall { .. } => {
                ErrorKind::SizeMismatch
            }
        }
    }
}

// ============================================================================
// Header
// ============================================================================

/// A decoded node header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Node name.
    pub name: Tag,
    /// Total size of the node including header and padding.
    pub size: u64,
    /// Source position.
    pub position: Position,
    /// Raw node type byte.
    pub type_code: u8,
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_be_bytes(bytes)
}

fn read_u64(buf: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[offset..offset + 8]);
    u64::from_be_bytes(bytes)
}

impl Header {
    /// Create a header for a node of the given type.
    pub fn new(name: Tag, node_type: NodeType, position: Position, size: u64) -> Self {
        Self {
            name,
            size,
            position,
            type_code: node_type.code(),
        }
    }

    /// Encode into `out`.
    pub fn write_to(&self, out: &mut [u8; HEADER_SIZE]) {
        out[..SIZE_OFFSET].copy_from_slice(self.name.as_bytes());
        out[SIZE_OFFSET..FILE_OFFSET].copy_from_slice(&self.size.to_be_bytes());
        out[FILE_OFFSET..LINE_OFFSET].copy_from_slice(&self.position.file.to_be_bytes());
        out[LINE_OFFSET..COLUMN_OFFSET].copy_from_slice(&self.position.line.to_be_bytes());
        out[COLUMN_OFFSET..RESERVED_OFFSET].copy_from_slice(&self.position.column.to_be_bytes());
        out[RESERVED_OFFSET..TYPE_OFFSET].fill(0);
        out[TYPE_OFFSET] = self.type_code;
    }

    /// Encode into a fresh array.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        self.write_to(&mut out);
        out
    }

    /// Decode the header at the start of `buf`.
    ///
    /// Nonzero reserved bytes are logged and otherwise ignored.
    pub fn decode(buf: &[u8]) -> Result<Header, DecodeError> {
        if buf.len() < HEADER_SIZE {
            return Err(DecodeError::BufferTooShort {
                available: buf.len(),
            });
        }

        let mut name = [0u8; TAG_SIZE];
        name.copy_from_slice(&buf[..TAG_SIZE]);
        let header = Header {
            name: Tag::from_bytes(name),
            size: read_u64(buf, SIZE_OFFSET),
            position: Position::new(
                read_u32(buf, FILE_OFFSET),
                read_u32(buf, LINE_OFFSET),
                read_u32(buf, COLUMN_OFFSET),
            ),
            type_code: buf[TYPE_OFFSET],
        };

        if buf[RESERVED_OFFSET..TYPE_OFFSET].iter().any(|&b| b != 0) {
            log::warn!("node '{}' has nonzero reserved header bytes", header.name);
        }
        Ok(header)
    }

    /// The node type, if the type byte is a known one.
    pub fn node_type(&self) -> Option<NodeType> {
        NodeType::from_code(self.type_code)
    }
}

// ============================================================================
// Decoded Trees
// ============================================================================

/// Data of a decoded node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Payload {
    /// No data.
    Null,
    /// No data, the name is the value.
    Leaf,
    /// Child nodes in order.
    Branch(Vec<DecodedNode>),
    /// Text with trailing padding removed. Invalid UTF-8 is replaced.
    Text(String),
    /// A magnitude that fits in 64 bits.
    PositiveInteger(u64),
    /// A magnitude that fits in 64 bits, to be negated.
    NegativeInteger(u64),
    /// An IEEE-754 double.
    BinaryFloat(f64),
    /// A numeric node whose data is not 8 bytes, for example a 128-bit
    /// integer.
    Raw {
        /// The node type.
        node_type: NodeType,
        /// The data, padding included.
        bytes: Vec<u8>,
    },
    /// A node type this decoder does not know or that never appears in
    /// files.
    Unknown {
        /// The raw type byte.
        type_code: u8,
        /// The data, padding included.
        bytes: Vec<u8>,
    },
}

/// A node read back from its encoded form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedNode {
    /// Node name.
    pub name: Tag,
    /// Source position.
    pub position: Position,
    /// Size of the encoded node.
    pub size: u64,
    /// Raw node type byte.
    pub type_code: u8,
    /// Decoded data.
    pub payload: Payload,
}

impl DecodedNode {
    /// Children of a branch; empty for every other node.
    pub fn children(&self) -> &[DecodedNode] {
        match &self.payload {
            Payload::Branch(children) => children,
            _ => &[],
        }
    }

    /// First child with the given name.
    pub fn child(&self, name: &str) -> Option<&DecodedNode> {
        let tag = Tag::new(name);
        self.children().iter().find(|child| child.name == tag)
    }

    /// Number of nodes on the longest path from this node to a leaf.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 1)];
        while let Some((node, depth)) = pending.pop() {
            deepest = deepest.max(depth);
            pending.extend(node.children().iter().map(|child| (child, depth + 1)));
        }
        deepest
    }
}

impl Drop for DecodedNode {
    fn drop(&mut self) {
        let mut pending = match &mut self.payload {
            Payload::Branch(children) => std::mem::take(children),
            _ => return,
        };
        while let Some(mut node) = pending.pop() {
            if let Payload::Branch(children) = &mut node.payload {
                pending.append(children);
            }
        }
    }
}

fn eight_bytes(data: &[u8]) -> Option<[u8; 8]> {
    data.try_into().ok()
}

/// Decode the data of a node, or `None` for a branch whose children are
/// still to be read.
fn scalar_payload(header: &Header, data: &[u8]) -> Option<Payload> {
    let raw = |node_type| Payload::Raw {
        node_type,
        bytes: data.to_vec(),
    };

    let payload = match header.node_type() {
        Some(NodeType::Null) => Payload::Null,
        Some(NodeType::Leaf) => Payload::Leaf,
        Some(NodeType::Branch) => return None,
        Some(NodeType::Text) => {
            let end = data.iter().rposition(|&b| b != 0).map_or(0, |last| last + 1);
            Payload::Text(String::from_utf8_lossy(&data[..end]).into_owned())
        }
        Some(node_type @ NodeType::PositiveInteger) => match eight_bytes(data) {
            Some(bytes) => Payload::PositiveInteger(u64::from_be_bytes(bytes)),
            None => raw(node_type),
        },
        Some(node_type @ NodeType::NegativeInteger) => match eight_bytes(data) {
            Some(bytes) => Payload::NegativeInteger(u64::from_be_bytes(bytes)),
            None => raw(node_type),
        },
        Some(node_type @ NodeType::BinaryFloat) => match eight_bytes(data) {
            Some(bytes) => Payload::BinaryFloat(f64::from_bits(u64::from_be_bytes(bytes))),
            None => raw(node_type),
        },
        Some(NodeType::List | NodeType::Count) | None => {
            log::warn!(
                "node '{}' has type code {} which does not belong in an encoded tree",
                header.name,
                header.type_code
            );
            Payload::Unknown {
                type_code: header.type_code,
                bytes: data.to_vec(),
            }
        }
    };
    Some(payload)
}

/// Read the header at the start of `buf` and check its size, returning the
/// header, its data and the padded number of bytes the node occupies.
fn read_node(buf: &[u8]) -> Result<(Header, &[u8], usize), DecodeError> {
    let header = Header::decode(buf)?;

    if header.size < HEADER_SIZE as u64 {
        return Err(DecodeError::SizeTooSmall {
            declared: header.size,
        });
    }
    match usize::try_from(header.size) {
        Ok(size) if size <= buf.len() && align8(size) <= buf.len() => {
            Ok((header, &buf[HEADER_SIZE..size], align8(size)))
        }
        _ => Err(DecodeError::SizeMismatch {
            declared: header.size,
            available: buf.len(),
        }),
    }
}

fn decoded(header: Header, payload: Payload) -> DecodedNode {
    DecodedNode {
        name: header.name,
        position: header.position,
        size: header.size,
        type_code: header.type_code,
        payload,
    }
}

/// A branch whose children are being read.
struct OpenBranch<'a> {
    header: Header,
    data: &'a [u8],
    offset: usize,
    children: Vec<DecodedNode>,
}

impl<'a> OpenBranch<'a> {
    fn new(header: Header, data: &'a [u8]) -> Self {
        Self {
            header,
            data,
            offset: 0,
            children: Vec::new(),
        }
    }

    fn remaining(&self) -> &'a [u8] {
        &self.data[self.offset..]
    }

    fn close(self) -> DecodedNode {
        decoded(self.header, Payload::Branch(self.children))
    }
}

/// Decode the node at the start of `buf`, returning it and the number of
/// bytes it occupies, padding included.
///
/// Branches are walked with an explicit stack, so nesting depth is bounded
/// only by the size of `buf`.
pub fn decode_node(buf: &[u8]) -> Result<(DecodedNode, usize), DecodeError> {
    let (header, data, used) = read_node(buf)?;
    if let Some(payload) = scalar_payload(&header, data) {
        return Ok((decoded(header, payload), used));
    }

    let mut open = OpenBranch::new(header, data);
    let mut parents = Vec::new();
    loop {
        let remaining = open.remaining();
        if remaining.len() >= HEADER_SIZE {
            let (header, data, child_used) = read_node(remaining)?;
            open.offset += child_used;
            match scalar_payload(&header, data) {
                Some(payload) => open.children.push(decoded(header, payload)),
                None => parents.push(std::mem::replace(&mut open, OpenBranch::new(header, data))),
            }
            continue;
        }

        let node = open.close();
        match parents.pop() {
            Some(parent) => {
                open = parent;
                open.children.push(node);
            }
            None => return Ok((node, used)),
        }
    }
}

/// Decode a sequence of nodes filling `buf`.
///
/// Trailing bytes too short for a header are ignored.
pub fn decode_all(buf: &[u8]) -> Result<Vec<DecodedNode>, DecodeError> {
    let mut nodes = Vec::new();
    let mut offset = 0;
    while buf.len() - offset >= HEADER_SIZE {
        let (node, used) = decode_node(&buf[offset..])?;
        nodes.push(node);
        offset += used;
    }
    Ok(nodes)
}
