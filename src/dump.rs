//! Human readable renderings of decoded trees.
//!
//! The text format prints one node per line, children indented under their
//! parent:
//!
//! ```text
//!     ?:? (   216) yyast
//!     ?:? (    72)   files
//!     ?:? (    40)     #file "calc.y"
//!     1:1 (   112)   add
//!     1:1 (    40)     #int 1
//!     1:5 (    40)     #int 2
//! ```

use std::io::{self, Write};

use serde::ser::Error as _;

use crate::codec::{DecodedNode, Payload};
use crate::node::NodeType;

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn render_value(payload: &Payload) -> Option<String> {
    let rendered = match payload {
        Payload::Null => "null".to_string(),
        Payload::Leaf | Payload::Branch(_) => return None,
        Payload::Text(text) => format!("{text:?}"),
        Payload::PositiveInteger(value) => value.to_string(),
        Payload::NegativeInteger(value) => format!("-{value}"),
        Payload::BinaryFloat(value) => format!("{value:?}"),
        Payload::Raw { node_type, bytes } => {
            let wide = <[u8; 16]>::try_from(bytes.as_slice()).map(u128::from_be_bytes);
            match (node_type, wide) {
                (NodeType::PositiveInteger, Ok(value)) => value.to_string(),
                (NodeType::NegativeInteger, Ok(value)) => format!("-{value}"),
                _ => format!("<{node_type} {}>", hex(bytes)),
            }
        }
        Payload::Unknown { type_code, bytes } => format!("<type {type_code} {}>", hex(bytes)),
    };
    Some(rendered)
}

fn dump_line<W: Write>(out: &mut W, node: &DecodedNode, depth: usize) -> io::Result<()> {
    let position = node.position.to_string();
    write!(
        out,
        "{position:>7} ({:>6}) {:indent$}{}",
        node.size,
        "",
        node.name,
        indent = depth * 2
    )?;
    if let Some(value) = render_value(&node.payload) {
        write!(out, " {value}")?;
    }
    writeln!(out)
}

/// Write the indented text rendering of `node`.
pub fn dump_text<W: Write>(out: &mut W, node: &DecodedNode) -> io::Result<()> {
    let mut pending = vec![(node, 0)];
    while let Some((node, depth)) = pending.pop() {
        dump_line(out, node, depth)?;
        pending.extend(node.children().iter().rev().map(|child| (child, depth + 1)));
    }
    Ok(())
}

/// Deepest tree [`dump_json`] will serialize.
pub const MAX_JSON_DEPTH: usize = 512;

/// Write `node` as pretty printed JSON.
///
/// Trees deeper than [`MAX_JSON_DEPTH`] are rejected.
pub fn dump_json<W: Write>(out: &mut W, node: &DecodedNode) -> serde_json::Result<()> {
    let depth = node.depth();
    if depth > MAX_JSON_DEPTH {
        return Err(serde_json::Error::custom(format!(
            "tree is {depth} levels deep, JSON output is limited to {MAX_JSON_DEPTH}"
        )));
    }
    serde_json::to_writer_pretty(&mut *out, node)?;
    writeln!(out).map_err(serde_json::Error::io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::AstBuilder;
    use crate::codec::decode_node;
    use crate::config::BuilderConfig;

    fn calc_tree() -> DecodedNode {
        let mut builder = AstBuilder::for_input(BuilderConfig::default(), "calc.y");
        builder.advance(b"1");
        let lhs = builder.integer(b"1").unwrap();
        builder.advance(b" + ");
        builder.advance(b"-2");
        let rhs = builder.integer(b"-2").unwrap();
        let sum = builder.branch("add", [lhs, rhs]).unwrap();
        let document = builder.document(sum).unwrap();
        decode_node(document.as_bytes()).unwrap().0
    }

    #[test]
    fn test_text_dump() {
        let mut out = Vec::new();
        dump_text(&mut out, &calc_tree()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "    ?:? (   216) yyast");
        assert_eq!(lines[2], "    ?:? (    40)     #file \"calc.y\"");
        assert_eq!(lines[3], "    1:1 (   112)   add");
        assert_eq!(lines[5], "    1:5 (    40)     #int -2");
    }

    #[test]
    fn test_wide_integer_is_rendered() {
        let payload = Payload::Raw {
            node_type: NodeType::PositiveInteger,
            bytes: (u128::from(u64::MAX) + 1).to_be_bytes().to_vec(),
        };
        assert_eq!(render_value(&payload).unwrap(), "18446744073709551616");
    }

    #[test]
    fn test_json_dump() {
        let mut out = Vec::new();
        dump_json(&mut out, &calc_tree()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(json["name"], "yyast");
        let add = &json["payload"]["value"][1];
        assert_eq!(add["name"], "add");
        assert_eq!(add["position"]["line"], 1);
        assert_eq!(add["payload"]["value"][1]["payload"]["kind"], "negative_integer");
        assert_eq!(add["payload"]["value"][1]["payload"]["value"], 2);
    }

    fn deep_tree(depth: usize) -> DecodedNode {
        let builder = AstBuilder::default();
        let mut value = builder.leaf("end");
        for _ in 1..depth {
            value = builder.branch("n", [value]).unwrap();
        }
        decode_node(value.into_node().unwrap().as_bytes()).unwrap().0
    }

    #[test]
    fn test_text_dump_of_deep_tree() {
        let mut out = Vec::new();
        dump_text(&mut out, &deep_tree(3001)).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), 3001);
        assert!(lines[0].ends_with(") n"));
        let last = lines[3000];
        assert!(last.ends_with(&format!("{}end", " ".repeat(2 * 3000))));
        assert!(last.contains("(    32)"));
    }

    #[test]
    fn test_json_dump_depth_limit() {
        let mut out = Vec::new();
        dump_json(&mut out, &deep_tree(32)).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["payload"]["value"][0]["name"], "n");

        let mut out = Vec::new();
        let err = dump_json(&mut out, &deep_tree(MAX_JSON_DEPTH + 1)).unwrap_err();
        assert!(err.to_string().contains("513 levels deep"));
        assert!(out.is_empty());
    }
}
