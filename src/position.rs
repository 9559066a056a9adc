//! Source positions, the file table and the position tracker.
//!
//! The tracker follows the scanner through the input: every matched token is
//! fed to [`PositionTracker::advance`], which remembers where the token
//! started (the *previous* position) and where the cursor is now (the
//! *current* position). Literal nodes are stamped with the previous position,
//! merges fall back to the current one.
//!
//! Lines are 1-indexed. The cursor column counts the characters already
//! consumed on the line, a finalized [`Position`] stores the 1-indexed column
//! of the character under the cursor.
//!
//! # Example
//!
//! ```rust
//! use yyast::config::BuilderConfig;
//! use yyast::position::PositionTracker;
//!
//! let mut tracker = PositionTracker::new(&BuilderConfig::default());
//! tracker.set_input("grammar.y");
//! let (start, end) = tracker.advance(b"ab\tcd");
//!
//! assert_eq!((start.line, start.column), (1, 1));
//! assert_eq!(tracker.cursor().column, 10);
//! assert_eq!(end.column, 11);
//! ```

use ahash::AHashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::codec::HEADER_SIZE;
use crate::config::BuilderConfig;
use crate::error::{Error, Result};
use crate::literal::{self, Rawness};
use crate::node::{Node, NodeType, Value};
use crate::tag::Tag;
use crate::utf8::ByteClass;

/// Sentinel for an unknown file, line or column.
pub const UNKNOWN: u32 = u32::MAX;

/// File index handed out once the file table is exhausted.
pub const FILE_TABLE_FULL: u32 = u32::MAX - 1;

// ============================================================================
// Position
// ============================================================================

/// A (file, line, column) source coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Index into the file table.
    pub file: u32,
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    pub column: u32,
}

impl Position {
    /// The fully unknown position.
    pub const UNKNOWN: Position = Position {
        file: UNKNOWN,
        line: UNKNOWN,
        column: UNKNOWN,
    };

    /// Create a position.
    pub const fn new(file: u32, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }

    /// Whether the file index refers to an entry of the file table.
    pub fn has_file(&self) -> bool {
        self.file != UNKNOWN && self.file != FILE_TABLE_FULL
    }

    /// Whether nothing at all is known about this position.
    pub fn is_unknown(&self) -> bool {
        *self == Position::UNKNOWN
    }

    /// Whether `self` lies strictly before `other` in the same file.
    pub fn precedes(&self, other: &Position) -> bool {
        self.file == other.file && (self.line, self.column) < (other.line, other.column)
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::UNKNOWN
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (UNKNOWN, _) => write!(f, "?:?"),
            (line, UNKNOWN) => write!(f, "{}:?", line),
            (line, column) => write!(f, "{}:{}", line, column),
        }
    }
}

/// The earliest of a set of positions.
///
/// The first position with a known file wins the file; later positions in
/// that same file replace it when they come strictly earlier. Positions in
/// other files are ignored. Returns `None` when no position has a file.
pub fn earliest(positions: impl IntoIterator<Item = Position>) -> Option<Position> {
    let mut best: Option<Position> = None;
    for position in positions {
        if !position.has_file() {
            continue;
        }
        match best {
            None => best = Some(position),
            Some(current) if position.precedes(&current) => best = Some(position),
            Some(_) => {}
        }
    }
    best
}

// ============================================================================
// File Table
// ============================================================================

/// Append-only table of input file names.
///
/// Indices are handed out in insertion order. Once `capacity` names are
/// stored, new names get [`FILE_TABLE_FULL`] instead of an index.
#[derive(Debug)]
pub struct FileTable {
    indices: AHashMap<String, u32>,
    names: Vec<String>,
    capacity: usize,
}

impl FileTable {
    /// Create an empty table holding at most `capacity` names.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            indices: AHashMap::new(),
            names: Vec::new(),
            capacity: capacity.min(FILE_TABLE_FULL as usize),
        }
    }

    /// Intern a file name, returning its index.
    pub fn intern(&mut self, name: &str) -> u32 {
        if let Some(&index) = self.indices.get(name) {
            return index;
        }

        if self.names.len() >= self.capacity {
            log::warn!(
                "file table is full ({} entries), '{}' is recorded as an unknown file",
                self.capacity,
                name
            );
            return FILE_TABLE_FULL;
        }

        let index = self.names.len() as u32;
        self.names.push(name.to_string());
        self.indices.insert(name.to_string(), index);
        index
    }

    /// Look up the name for an index.
    pub fn get(&self, index: u32) -> Option<&str> {
        self.names.get(index as usize).map(|s| s.as_str())
    }

    /// Number of interned names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no name has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate over the names in index order.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.names.iter().map(|s| s.as_str())
    }
}

// ============================================================================
// Position Tracker
// ============================================================================

/// The raw scanning state of the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// Bytes consumed so far.
    pub offset: u64,
    /// Current line (1-indexed).
    pub line: u32,
    /// Characters consumed on the current line.
    pub column: u32,
    /// Current file index.
    pub file: u32,
}

impl Cursor {
    fn start() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 0,
            file: UNKNOWN,
        }
    }

    /// The finalized position of the character under the cursor.
    pub fn position(&self) -> Position {
        Position::new(self.file, self.line, self.column.saturating_add(1))
    }
}

static LINE_DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*(\d+)(?:\s+"((?:[^"\\]|\\.)*)")?(?:\s+\d+)*\s*$"#)
        .expect("line directive pattern is valid")
});

/// Tracks the scanner's position through the input.
///
/// One tracker serves one parse stream; it is owned by the
/// [`AstBuilder`](crate::builder::AstBuilder) and must not be shared.
#[derive(Debug)]
pub struct PositionTracker {
    previous: Cursor,
    current: Cursor,
    files: FileTable,
    tab_width: u32,
}

impl PositionTracker {
    /// Create a tracker at line 1, column 0 of an unknown file.
    pub fn new(config: &BuilderConfig) -> Self {
        Self {
            previous: Cursor::start(),
            current: Cursor::start(),
            files: FileTable::with_capacity(config.file_table_capacity),
            tab_width: config.tab_width.max(1),
        }
    }

    /// Intern the input file name and make it the current file.
    pub fn set_input(&mut self, name: &str) -> u32 {
        let index = self.files.intern(name);
        self.current.file = index;
        self.previous.file = index;
        index
    }

    /// Consume `text`, returning the positions before and after it.
    pub fn advance(&mut self, text: &[u8]) -> (Position, Position) {
        self.previous = self.current;
        self.current.offset += text.len() as u64;

        for &byte in text {
            match byte {
                b'\n' => {
                    self.current.line = self.current.line.saturating_add(1);
                    self.current.column = 0;
                }
                b'\r' => self.current.column = 0,
                b'\t' => {
                    let column = self.current.column;
                    self.current.column = column.saturating_add(self.tab_width - column % self.tab_width);
                }
                _ if ByteClass::classify(byte).advances_column() => {
                    self.current.column = self.current.column.saturating_add(1);
                }
                _ => {}
            }
        }

        (self.previous.position(), self.current.position())
    }

    /// Consume a token and return its coordinates as a transient value.
    ///
    /// The value must be replaced by a literal before it reaches a merge.
    pub fn count(&mut self, text: &[u8]) -> Value {
        let (start, end) = self.advance(text);
        Value::Count { start, end }
    }

    /// Apply a `<line> "<file>"` directive from a preprocessor.
    ///
    /// The line is set to one less than the directive says, the newline that
    /// ends the directive brings it back.
    pub fn reposition(&mut self, directive: &str) -> Result<()> {
        let position = self.current_position();
        let malformed = || Error::MalformedReposition {
            position,
            directive: directive.to_string(),
        };

        let captures = LINE_DIRECTIVE.captures(directive).ok_or_else(malformed)?;
        let line: u32 = captures[1].parse().map_err(|_| malformed())?;

        if let Some(quoted) = captures.get(2) {
            let name = literal::unescape(quoted.as_str().as_bytes(), Rawness::Raw)
                .map_err(|_| malformed())?;
            self.current.file = self.files.intern(&String::from_utf8_lossy(&name));
        }

        self.current.line = line.saturating_sub(1);
        self.current.column = 0;
        log::debug!(
            "repositioned to line {} of file {}",
            line,
            self.files.get(self.current.file).unwrap_or("?")
        );
        Ok(())
    }

    /// Intern a file name without changing the current file.
    pub fn intern_filename(&mut self, name: &str) -> u32 {
        self.files.intern(name)
    }

    /// The file table.
    pub fn files(&self) -> &FileTable {
        &self.files
    }

    /// Where the most recent token started.
    pub fn previous_position(&self) -> Position {
        self.previous.position()
    }

    /// Where the cursor is now.
    pub fn current_position(&self) -> Position {
        self.current.position()
    }

    /// The raw cursor.
    pub fn cursor(&self) -> &Cursor {
        &self.current
    }

    /// Render the file table as a `files` branch of `#file` text nodes.
    pub fn filenames_as_node(&self) -> Value {
        let file_tag = Tag::new("#file");
        let mut bytes = vec![0u8; HEADER_SIZE];
        for name in self.files.iter() {
            let entry = Node::from_payload(file_tag, NodeType::Text, Position::UNKNOWN, name.as_bytes());
            bytes.extend_from_slice(entry.as_bytes());
        }
        Value::Node(Node::assemble(
            Tag::new("files"),
            NodeType::Branch,
            Position::UNKNOWN,
            bytes,
        ))
    }
}

impl Default for PositionTracker {
    fn default() -> Self {
        Self::new(&BuilderConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode_node;
    use crate::codec::Payload;
    use crate::error::ErrorKind;

    #[test]
    fn test_tab_and_newline_scenario() {
        let mut tracker = PositionTracker::default();
        tracker.advance(b"ab");
        assert_eq!(tracker.cursor().column, 2);
        tracker.advance(b"\t");
        assert_eq!(tracker.cursor().column, 8);
        tracker.advance(b"cd");
        assert_eq!(tracker.cursor().column, 10);
        tracker.advance(b"\n");
        assert_eq!(tracker.cursor().line, 2);
        assert_eq!(tracker.cursor().column, 0);
        assert_eq!(tracker.cursor().offset, 6);
    }

    #[test]
    fn test_advance_returns_previous_and_current() {
        let mut tracker = PositionTracker::default();
        tracker.set_input("a.y");
        tracker.advance(b"let ");
        let (start, end) = tracker.advance(b"x");
        assert_eq!(start, Position::new(0, 1, 5));
        assert_eq!(end, Position::new(0, 1, 6));
        assert_eq!(tracker.previous_position(), start);
        assert_eq!(tracker.current_position(), end);
    }

    #[test]
    fn test_utf8_counts_characters() {
        let mut tracker = PositionTracker::default();
        tracker.advance("héllo€".as_bytes());
        assert_eq!(tracker.cursor().column, 6);
        assert_eq!(tracker.cursor().offset, "héllo€".len() as u64);
    }

    #[test]
    fn test_carriage_return_and_controls() {
        let mut tracker = PositionTracker::default();
        tracker.advance(b"abc\rde\x07");
        assert_eq!(tracker.cursor().line, 1);
        assert_eq!(tracker.cursor().column, 2);
    }

    #[test]
    fn test_count_produces_transient_value() {
        let mut tracker = PositionTracker::default();
        let value = tracker.count(b"token");
        assert!(matches!(value, Value::Count { .. }));
        assert_eq!(value.node_type(), Some(NodeType::Count));
    }

    #[test]
    fn test_reposition_with_file() {
        let mut tracker = PositionTracker::default();
        tracker.set_input("main.y");
        tracker.advance(b"abc");
        tracker.reposition("42 \"foo.y\"").unwrap();
        assert_eq!(tracker.cursor().line, 41);
        assert_eq!(tracker.cursor().column, 0);
        assert_eq!(tracker.files().get(1), Some("foo.y"));
        assert_eq!(tracker.cursor().file, 1);

        tracker.advance(b"\n");
        assert_eq!(tracker.cursor().line, 42);
    }

    #[test]
    fn test_reposition_without_file_keeps_file() {
        let mut tracker = PositionTracker::default();
        tracker.set_input("main.y");
        tracker.reposition("7").unwrap();
        assert_eq!(tracker.cursor().line, 6);
        assert_eq!(tracker.cursor().file, 0);
    }

    #[test]
    fn test_reposition_unescapes_quotes() {
        let mut tracker = PositionTracker::default();
        tracker.reposition(r#"1 "we\"ird.y" 2"#).unwrap();
        assert_eq!(tracker.files().get(0), Some("we\"ird.y"));
    }

    #[test]
    fn test_reposition_rejects_garbage() {
        let mut tracker = PositionTracker::default();
        for directive in ["", "abc", "\"foo.y\"", "12 foo.y", "99999999999"] {
            let err = tracker.reposition(directive).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedReposition, "{directive}");
        }
    }

    #[test]
    fn test_file_table_interning() {
        let mut table = FileTable::with_capacity(2);
        assert_eq!(table.intern("a"), 0);
        assert_eq!(table.intern("b"), 1);
        assert_eq!(table.intern("a"), 0);
        assert_eq!(table.intern("c"), FILE_TABLE_FULL);
        assert_eq!(table.len(), 2);
        assert_eq!(table.iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_full_table_position_has_no_file() {
        let config = BuilderConfig::builder().file_table_capacity(0).build();
        let mut tracker = PositionTracker::new(&config);
        assert_eq!(tracker.set_input("x.y"), FILE_TABLE_FULL);
        assert!(!tracker.current_position().has_file());
    }

    #[test]
    fn test_earliest() {
        let positions = [
            Position::UNKNOWN,
            Position::new(1, 5, 3),
            Position::new(0, 1, 1),
            Position::new(1, 4, 9),
            Position::new(1, 4, 2),
        ];
        assert_eq!(earliest(positions), Some(Position::new(1, 4, 2)));
        assert_eq!(earliest([Position::UNKNOWN]), None);
    }

    #[test]
    fn test_filenames_as_node() {
        let mut tracker = PositionTracker::default();
        tracker.set_input("main.y");
        tracker.intern_filename("lib.y");
        let node = tracker.filenames_as_node().into_node().unwrap();
        let (decoded, used) = decode_node(node.as_bytes()).unwrap();
        assert_eq!(used, node.size());
        assert_eq!(decoded.name, Tag::new("files"));
        assert!(matches!(decoded.payload, Payload::Branch(_)));
        let names: Vec<_> = decoded
            .children()
            .iter()
            .map(|child| match &child.payload {
                Payload::Text(text) => text.as_str(),
                other => panic!("unexpected payload {other:?}"),
            })
            .collect();
        assert_eq!(names, vec!["main.y", "lib.y"]);
    }

    #[test]
    fn test_position_display() {
        assert_eq!(Position::new(0, 3, 7).to_string(), "3:7");
        assert_eq!(Position::UNKNOWN.to_string(), "?:?");
    }
}
