//! Encoded nodes and the values a grammar passes around.
//!
//! A [`Node`] owns its complete encoding, header included, so building a
//! parent is a matter of concatenating children. Nodes are neither `Clone`
//! nor `Copy`: every value is consumed exactly once, by a merge or by
//! [`AstBuilder::document`](crate::builder::AstBuilder::document).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::codec::{align8, Header, HEADER_SIZE};
use crate::error::{Error, Result};
use crate::position::Position;
use crate::tag::Tag;

/// Type byte stored in every node header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum NodeType {
    /// No data.
    Null = 0,
    /// No data, the name carries the meaning.
    Leaf = 1,
    /// Data is a sequence of child nodes.
    Branch = 2,
    /// Data is UTF-8 text.
    Text = 3,
    /// Data is a big-endian magnitude.
    PositiveInteger = 4,
    /// Data is a big-endian magnitude of a negative number.
    NegativeInteger = 5,
    /// Data is a big-endian IEEE-754 double.
    BinaryFloat = 6,
    /// Children to be spliced into the parent. Never written.
    List = 254,
    /// Token coordinates. Never written and never merged.
    Count = 255,
}

impl NodeType {
    /// The header byte.
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Map a header byte back to a type.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(NodeType::Null),
            1 => Some(NodeType::Leaf),
            2 => Some(NodeType::Branch),
            3 => Some(NodeType::Text),
            4 => Some(NodeType::PositiveInteger),
            5 => Some(NodeType::NegativeInteger),
            6 => Some(NodeType::BinaryFloat),
            254 => Some(NodeType::List),
            255 => Some(NodeType::Count),
            _ => None,
        }
    }

    /// Whether this type only exists while building.
    pub fn is_transient(self) -> bool {
        matches!(self, NodeType::List | NodeType::Count)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeType::Null => "null",
            NodeType::Leaf => "leaf",
            NodeType::Branch => "branch",
            NodeType::Text => "text",
            NodeType::PositiveInteger => "positive integer",
            NodeType::NegativeInteger => "negative integer",
            NodeType::BinaryFloat => "binary float",
            NodeType::List => "list",
            NodeType::Count => "count",
        };
        f.write_str(name)
    }
}

/// A fully encoded node.
pub struct Node {
    name: Tag,
    node_type: NodeType,
    position: Position,
    bytes: Vec<u8>,
}

impl Node {
    /// Encode a node around a copy of `data`.
    pub(crate) fn from_payload(
        name: Tag,
        node_type: NodeType,
        position: Position,
        data: &[u8],
    ) -> Self {
        let mut bytes = Vec::with_capacity(align8(HEADER_SIZE + data.len()));
        bytes.resize(HEADER_SIZE, 0);
        bytes.extend_from_slice(data);
        Self::assemble(name, node_type, position, bytes)
    }

    /// Finish a buffer whose first [`HEADER_SIZE`] bytes are reserved for
    /// the header: pad it and write the header.
    pub(crate) fn assemble(
        name: Tag,
        node_type: NodeType,
        position: Position,
        mut bytes: Vec<u8>,
    ) -> Self {
        debug_assert!(bytes.len() >= HEADER_SIZE);
        bytes.resize(align8(bytes.len().max(HEADER_SIZE)), 0);
        let header = Header::new(name, node_type, position, bytes.len() as u64);
        bytes[..HEADER_SIZE].copy_from_slice(&header.to_bytes());
        Self {
            name,
            node_type,
            position,
            bytes,
        }
    }

    /// Node name.
    pub fn name(&self) -> Tag {
        self.name
    }

    /// Node type.
    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    /// Source position.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Encoded size, header and padding included.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// The complete encoding.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The data after the header, padding included.
    pub fn data(&self) -> &[u8] {
        &self.bytes[HEADER_SIZE..]
    }

    /// Take the complete encoding.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("node_type", &self.node_type)
            .field("position", &self.position)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// What a grammar action produces.
#[derive(Debug)]
pub enum Value {
    /// Nothing; merges skip it.
    Pass,
    /// Coordinates of a token from
    /// [`PositionTracker::count`](crate::position::PositionTracker::count).
    Count {
        /// Where the token started.
        start: Position,
        /// Where the cursor was after it.
        end: Position,
    },
    /// An encoded node.
    Node(Node),
}

impl Value {
    /// The pass value.
    pub const PASS: Value = Value::Pass;

    /// Position of the value, [`Position::UNKNOWN`] for a pass.
    pub fn position(&self) -> Position {
        match self {
            Value::Pass => Position::UNKNOWN,
            Value::Count { start, .. } => *start,
            Value::Node(node) => node.position(),
        }
    }

    /// Type of the value, `None` for a pass.
    pub fn node_type(&self) -> Option<NodeType> {
        match self {
            Value::Pass => None,
            Value::Count { .. } => Some(NodeType::Count),
            Value::Node(node) => Some(node.node_type()),
        }
    }

    /// Encoded size, zero unless this is a node.
    pub fn size(&self) -> usize {
        self.as_node().map_or(0, Node::size)
    }

    /// Borrow the node, if this is one.
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Take the node out of this value.
    pub fn into_node(self) -> Result<Node> {
        match self {
            Value::Node(node) => Ok(node),
            Value::Pass => Err(Error::internal("expected a node but got a pass value")),
            Value::Count { start, .. } => Err(Error::internal(format!(
                "expected a node but got token coordinates from line {start}"
            ))),
        }
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Node(node)
    }
}
