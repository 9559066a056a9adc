//! yyast - abstract syntax tree builder and binary codec
//!
//! This crate builds syntax trees for lexer/parser front ends and encodes
//! them in a compact, position-annotated binary format that other tools can
//! walk without a schema.
//!
//! # Architecture
//!
//! - [`PositionTracker`] - follows the scanner through the input and owns
//!   the file table
//! - [`literal`] - pure decoders for integer, float and escaped text tokens
//! - [`AstBuilder`] - turns tokens into literal nodes and merges children
//!   into branches and lists
//! - [`codec`] - the 32 byte node header and the tree decoder
//! - [`writer`] and [`dump`] - output of finished and decoded trees
//! - [`driver`] - a command line tool around a grammar's [`Frontend`]
//!
//! Builder values are move-only: a node is consumed by exactly one merge, so
//! a subtree can never end up in the tree twice.
//!
//! ```rust
//! use yyast::{AstBuilder, BuilderConfig, codec};
//!
//! let mut builder = AstBuilder::for_input(BuilderConfig::default(), "hello.y");
//! builder.advance(b"\"hi\"");
//! let greeting = builder.string(b"hi").unwrap();
//! let document = builder.document(greeting).unwrap();
//!
//! let (decoded, _) = codec::decode_node(document.as_bytes()).unwrap();
//! assert_eq!(decoded.children().len(), 2);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![allow(clippy::uninlined_format_args)]

pub mod builder;
pub mod codec;
pub mod config;
pub mod driver;
pub mod dump;
pub mod error;
pub mod literal;
pub mod node;
pub mod position;
pub mod tag;
pub mod utf8;
pub mod writer;

// Re-exports for convenience
pub use builder::AstBuilder;
pub use codec::{decode_node, DecodedNode, Payload};
pub use config::BuilderConfig;
pub use driver::Frontend;
pub use error::{Error, ErrorKind, Result};
pub use node::{Node, NodeType, Value};
pub use position::{Position, PositionTracker};
pub use tag::Tag;
