//! Tree writer.
//!
//! A finished tree is written as its encoding, with no outer framing: the
//! file length equals the root node's size.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::node::Node;

fn check_persistable(node: &Node) -> Result<()> {
    if node.node_type().is_transient() {
        return Err(Error::internal(format!(
            "{} node '{}' can not be written",
            node.node_type(),
            node.name()
        )));
    }
    Ok(())
}

/// Write the encoded bytes of `node` to `sink`.
///
/// List and count nodes only exist while building and are rejected.
pub fn write_node<W: Write>(sink: &mut W, node: &Node) -> Result<()> {
    check_persistable(node)?;
    sink.write_all(node.as_bytes())?;
    Ok(())
}

/// Write a tree to a file.
pub fn save(output_path: &Path, node: &Node) -> Result<()> {
    check_persistable(node)?;

    let file = File::create(output_path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(node.as_bytes())?;
    writer.flush()?;

    log::info!(
        "wrote {} bytes to {}",
        node.size(),
        output_path.display()
    );
    Ok(())
}

/// Write a tree to a Vec<u8> (for testing).
pub fn write_node_to_vec(node: &Node) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(node.size());
    write_node(&mut result, node)?;
    Ok(result)
}
