//! The tree builder a grammar drives.
//!
//! The scanner feeds every token to [`AstBuilder::advance`] (or
//! [`AstBuilder::count`]); literal constructors then stamp the new node with
//! the position the token started at. Reductions combine values with
//! [`AstBuilder::branch`] and [`AstBuilder::list`], and the last reduction
//! hands the root to [`AstBuilder::document`].
//!
//! # Merging
//!
//! A merge concatenates the encodings of its children behind a new header.
//! List children contribute their children instead of themselves,
//! [`Value::Pass`] contributes nothing, and a [`Value::Count`] that never got
//! turned into a literal is an internal consistency error.
//!
//! # Example
//!
//! ```rust
//! use yyast::builder::AstBuilder;
//! use yyast::config::BuilderConfig;
//!
//! let mut builder = AstBuilder::for_input(BuilderConfig::default(), "calc.y");
//! builder.advance(b"1");
//! let lhs = builder.integer(b"1").unwrap();
//! builder.advance(b" + ");
//! builder.advance(b"2");
//! let rhs = builder.integer(b"2").unwrap();
//!
//! let sum = builder.branch("add", [lhs, rhs]).unwrap();
//! let document = builder.document(sum).unwrap();
//! assert_eq!(document.size() % 8, 0);
//! ```

use crate::codec::HEADER_SIZE;
use crate::config::BuilderConfig;
use crate::error::{Error, Result};
use crate::literal::{self, LiteralError, Rawness};
use crate::node::{Node, NodeType, Value};
use crate::position::{self, Position, PositionTracker};
use crate::tag::Tag;

/// Builds encoded nodes while tracking the scanner's position.
///
/// One builder serves one parse stream.
#[derive(Debug)]
pub struct AstBuilder {
    tracker: PositionTracker,
    config: BuilderConfig,
}

impl AstBuilder {
    /// Create a builder with an unnamed input.
    pub fn new(config: BuilderConfig) -> Self {
        Self {
            tracker: PositionTracker::new(&config),
            config,
        }
    }

    /// Create a builder and register `name` as the current input file.
    pub fn for_input(config: BuilderConfig, name: &str) -> Self {
        let mut builder = Self::new(config);
        builder.tracker.set_input(name);
        builder
    }

    /// The configuration this builder was created with.
    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// The position tracker.
    pub fn tracker(&self) -> &PositionTracker {
        &self.tracker
    }

    /// Mutable access to the position tracker.
    pub fn tracker_mut(&mut self) -> &mut PositionTracker {
        &mut self.tracker
    }

    /// See [`PositionTracker::advance`].
    pub fn advance(&mut self, text: &[u8]) -> (Position, Position) {
        self.tracker.advance(text)
    }

    /// See [`PositionTracker::count`].
    pub fn count(&mut self, text: &[u8]) -> Value {
        self.tracker.count(text)
    }

    /// See [`PositionTracker::reposition`].
    pub fn reposition(&mut self, directive: &str) -> Result<()> {
        self.tracker.reposition(directive)
    }

    // ========================================================================
    // Literals
    // ========================================================================

    fn literal_error(&self, source: LiteralError) -> Error {
        Error::Literal {
            position: self.tracker.current_position(),
            source,
        }
    }

    fn literal(&self, name: Tag, node_type: NodeType, data: &[u8]) -> Value {
        let position = self.tracker.previous_position();
        log::debug!("{} node '{}' at {}", node_type, name, position);
        Value::Node(Node::from_payload(name, node_type, position, data))
    }

    /// A node without data.
    pub fn leaf(&self, name: impl Into<Tag>) -> Value {
        self.literal(name.into(), NodeType::Leaf, &[])
    }

    /// The `#null` node.
    pub fn null(&self) -> Value {
        self.literal(Tag::new("#null"), NodeType::Null, &[])
    }

    /// A text node holding `text` as is.
    pub fn text(&self, name: impl Into<Tag>, text: &[u8]) -> Value {
        self.literal(name.into(), NodeType::Text, text)
    }

    /// A text node holding `text` with its escapes decoded.
    pub fn escaped_text(&self, name: impl Into<Tag>, text: &[u8], rawness: Rawness) -> Result<Value> {
        let decoded = literal::unescape(text, rawness).map_err(|err| self.literal_error(err))?;
        Ok(self.text(name, &decoded))
    }

    fn integer_node(&self, name: Tag, node_type: NodeType, digits: &[u8], base: u32) -> Result<Value> {
        let value = literal::decode_integer(digits, base).map_err(|err| self.literal_error(err))?;
        Ok(self.literal(name, node_type, &literal::integer_payload(value)))
    }

    /// A positive integer decoded from `digits` in `base`.
    pub fn positive_integer(&self, name: impl Into<Tag>, digits: &[u8], base: u32) -> Result<Value> {
        self.integer_node(name.into(), NodeType::PositiveInteger, digits, base)
    }

    /// A negative integer decoded from `digits` in `base`. The digits are the
    /// magnitude, without a sign.
    pub fn negative_integer(&self, name: impl Into<Tag>, digits: &[u8], base: u32) -> Result<Value> {
        self.integer_node(name.into(), NodeType::NegativeInteger, digits, base)
    }

    /// A binary float decoded from decimal text.
    pub fn binary_float(&self, name: impl Into<Tag>, text: &[u8]) -> Result<Value> {
        let value = literal::decode_float(text).map_err(|err| self.literal_error(err))?;
        Ok(self.literal(name.into(), NodeType::BinaryFloat, &literal::float_payload(value)))
    }

    /// `#int` from a C-style integer literal such as `-0x1F`.
    pub fn integer(&self, text: &[u8]) -> Result<Value> {
        let (sign, value) = literal::parse_c_integer(text).map_err(|err| self.literal_error(err))?;
        Ok(self.literal(
            Tag::new("#int"),
            sign.node_type(),
            &literal::integer_payload(value),
        ))
    }

    /// `#flt` from a decimal float literal.
    pub fn real(&self, text: &[u8]) -> Result<Value> {
        self.binary_float("#flt", text)
    }

    /// `#str` with all escapes decoded.
    pub fn string(&self, text: &[u8]) -> Result<Value> {
        self.escaped_text("#str", text, Rawness::Cooked)
    }

    /// `#str` with only `\"` decoded.
    pub fn raw_string(&self, text: &[u8]) -> Result<Value> {
        self.escaped_text("#str", text, Rawness::Raw)
    }

    /// `#re` with only `\/` decoded.
    pub fn regex(&self, text: &[u8]) -> Result<Value> {
        self.escaped_text("#re", text, Rawness::RegexRaw)
    }

    /// `#id` for an identifier.
    pub fn identifier(&self, text: &[u8]) -> Result<Value> {
        self.escaped_text("#id", text, Rawness::Raw)
    }

    /// `#asm` for inline assembly.
    pub fn assembly(&self, text: &[u8]) -> Result<Value> {
        self.escaped_text("#asm", text, Rawness::Raw)
    }

    /// `#doc` for a documentation comment.
    pub fn comment(&self, text: &[u8]) -> Result<Value> {
        self.escaped_text("#doc", text, Rawness::Raw)
    }

    // ========================================================================
    // Merges
    // ========================================================================

    fn merge(
        &self,
        name: Tag,
        node_type: NodeType,
        children: impl IntoIterator<Item = Value>,
        fixed_position: Option<Position>,
    ) -> Result<Node> {
        let mut bytes = vec![0u8; HEADER_SIZE];
        let mut positions = Vec::new();

        for child in children {
            let node = match child {
                Value::Pass => continue,
                Value::Count { start, .. } => {
                    return Err(Error::internal(format!(
                        "token at {start} was merged into '{name}' before becoming a literal"
                    )));
                }
                Value::Node(node) => node,
            };

            positions.push(node.position());
            match node.node_type() {
                NodeType::List => bytes.extend_from_slice(node.data()),
                _ => bytes.extend_from_slice(node.as_bytes()),
            }
        }

        let position = fixed_position
            .or_else(|| position::earliest(positions))
            .unwrap_or_else(|| self.tracker.current_position());
        log::trace!(
            "merged {} bytes into {} '{}' at {}",
            bytes.len() - HEADER_SIZE,
            node_type,
            name,
            position
        );
        Ok(Node::assemble(name, node_type, position, bytes))
    }

    /// A branch holding `children` in order.
    pub fn branch(&self, name: impl Into<Tag>, children: impl IntoIterator<Item = Value>) -> Result<Value> {
        self.merge(name.into(), NodeType::Branch, children, None)
            .map(Value::Node)
    }

    /// A list of `children`, spliced into whatever it is merged into.
    pub fn list(&self, children: impl IntoIterator<Item = Value>) -> Result<Value> {
        self.merge(Tag::new("#list"), NodeType::List, children, None)
            .map(Value::Node)
    }

    /// Wrap the finished tree in the document node: the file table followed
    /// by `root`, at an unknown position.
    pub fn document(&self, root: Value) -> Result<Node> {
        let name = Tag::new(&self.config.document_name);
        self.merge(
            name,
            NodeType::Branch,
            [self.tracker.filenames_as_node(), root],
            Some(Position::UNKNOWN),
        )
    }
}

impl Default for AstBuilder {
    fn default() -> Self {
        Self::new(BuilderConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_node, Payload};
    use crate::error::ErrorKind;

    fn builder() -> AstBuilder {
        AstBuilder::for_input(BuilderConfig::default(), "test.y")
    }

    fn node(value: Value) -> Node {
        value.into_node().unwrap()
    }

    #[test]
    fn test_list_children_are_spliced() {
        let builder = builder();
        let a = node(builder.leaf("a"));
        let b = node(builder.text("b", b"bee"));
        let c = node(builder.leaf("c"));
        let expected = [a.as_bytes(), b.as_bytes(), c.as_bytes()].concat();

        let list = builder.list([Value::from(a), Value::from(b)]).unwrap();
        let parent = node(builder.branch("expr", [list, Value::from(c)]).unwrap());
        assert_eq!(parent.data(), &expected[..]);
        assert_eq!(parent.size(), HEADER_SIZE + expected.len());
    }

    #[test]
    fn test_nested_lists_flatten() {
        let builder = builder();
        let inner = builder.list([builder.leaf("a")]).unwrap();
        let outer = builder.list([inner, builder.leaf("b")]).unwrap();
        let parent = node(builder.branch("seq", [outer]).unwrap());

        let (decoded, _) = decode_node(parent.as_bytes()).unwrap();
        let names: Vec<_> = decoded.children().iter().map(|c| c.name.to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_sizes_are_aligned_and_padding_is_zero() {
        let builder = builder();
        for text in [&b""[..], b"x", b"hello", b"exactly8", b"nine char"] {
            let node = node(builder.text("#str", text));
            assert_eq!(node.size() % 8, 0);
            assert!(node.data()[text.len()..].iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn test_literals_use_previous_position() {
        let mut builder = builder();
        builder.advance(b"    ");
        builder.advance(b"foo");
        let value = builder.identifier(b"foo").unwrap();
        assert_eq!(value.position(), Position::new(0, 1, 5));
    }

    #[test]
    fn test_branch_takes_earliest_position() {
        let mut builder = builder();
        builder.advance(b"x");
        let x = builder.leaf("x");
        builder.advance(b"\n  ");
        builder.advance(b"y");
        let y = builder.leaf("y");
        assert_eq!(y.position(), Position::new(0, 2, 3));

        let pair = node(builder.branch("pair", [y, x]).unwrap());
        assert_eq!(pair.position(), Position::new(0, 1, 1));
    }

    #[test]
    fn test_branch_falls_back_to_current_position() {
        let mut builder = builder();
        builder.advance(b"abc");
        let empty = node(builder.branch("empty", [Value::PASS]).unwrap());
        assert_eq!(empty.position(), builder.tracker().current_position());
        assert_eq!(empty.size(), HEADER_SIZE);
    }

    #[test]
    fn test_pass_is_reusable() {
        let builder = builder();
        let parent = node(builder.branch("p", [Value::PASS, builder.leaf("x"), Value::PASS]).unwrap());
        assert_eq!(parent.size(), 2 * HEADER_SIZE);
    }

    #[test]
    fn test_count_in_merge_is_internal_error() {
        let mut builder = builder();
        let count = builder.count(b"tok");
        let err = builder.branch("bad", [count]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InternalConsistency);
        assert!(err.is_internal());
    }

    #[test]
    fn test_literal_errors_carry_current_position() {
        let mut builder = builder();
        builder.advance(b"x = ");
        builder.advance(b"0x");
        let err = builder.integer(b"0x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedLiteral);
        assert_eq!(err.position(), Some(Position::new(0, 1, 7)));
        assert_eq!(err.to_string(), "line 1:7, could not convert int value '0x'");
    }

    #[test]
    fn test_integer_nodes() {
        let builder = builder();
        let value = node(builder.integer(b"-42").unwrap());
        assert_eq!(value.name(), Tag::new("#int"));
        assert_eq!(value.node_type(), NodeType::NegativeInteger);
        assert_eq!(value.data(), &42u64.to_be_bytes());

        let wide = node(builder.positive_integer("#int", &[b'z'; 23], 36).unwrap());
        assert_eq!(wide.size(), HEADER_SIZE + 16);

        let err = builder.positive_integer("#int", &[b'z'; 25], 36).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NumericOverflow);
    }

    #[test]
    fn test_float_and_null() {
        let builder = builder();
        let value = node(builder.real(b"2.5").unwrap());
        assert_eq!(value.data(), &2.5f64.to_bits().to_be_bytes());
        assert_eq!(builder.real(b"1e999").unwrap_err().kind(), ErrorKind::NumericOverflow);

        let null = node(builder.null());
        assert_eq!(null.name(), Tag::new("#null"));
        assert_eq!(null.node_type(), NodeType::Null);
    }

    #[test]
    fn test_text_helpers() {
        let builder = builder();
        let cooked = node(builder.string(br"a\tb").unwrap());
        assert_eq!(&cooked.data()[..3], b"a\tb");
        let raw = node(builder.raw_string(br"a\tb").unwrap());
        assert_eq!(&raw.data()[..4], br"a\tb");
        let regex = node(builder.regex(br"a\/b").unwrap());
        assert_eq!(regex.name(), Tag::new("#re"));
        assert_eq!(&regex.data()[..3], b"a/b");
        assert_eq!(node(builder.comment(b"doc").unwrap()).name(), Tag::new("#doc"));
        assert_eq!(node(builder.assembly(b"nop").unwrap()).name(), Tag::new("#asm"));

        let err = builder.string(br"\xZZ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedEscape);
    }

    #[test]
    fn test_document_wraps_files_and_root() {
        let mut builder = builder();
        builder.advance(b"x");
        let root = builder.leaf("root");
        let document = builder.document(root).unwrap();
        assert_eq!(document.position(), Position::UNKNOWN);

        let (decoded, used) = decode_node(document.as_bytes()).unwrap();
        assert_eq!(used, document.size());
        assert_eq!(decoded.name, Tag::new("yyast"));
        assert_eq!(decoded.children().len(), 2);

        let files = decoded.child("files").unwrap();
        assert_eq!(files.children()[0].payload, Payload::Text("test.y".to_string()));
        let root = decoded.child("root").unwrap();
        assert_eq!(root.payload, Payload::Leaf);
        assert_eq!(root.position, Position::new(0, 1, 1));
    }

    #[test]
    fn test_document_name_from_config() {
        let config = BuilderConfig::builder().document_name("tree").build();
        let builder = AstBuilder::new(config);
        let document = builder.document(Value::PASS).unwrap();
        assert_eq!(document.name(), Tag::new("tree"));
    }
}
