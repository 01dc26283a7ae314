//! Mesh stream reader.

use super::record::{ReadContext, RecordReader};
use super::{Block, END_MARKER};
use crate::error::{Error, Result};
use crate::mesh::{Mesh, Node};
use crate::registry::Registry;
use crate::types::{NodeId, Point2};
use std::io::{BufRead, ErrorKind};

/// Reads a mesh from a text stream, instantiating variants through a [`Registry`].
///
/// The whole stream is validated before a mesh is returned: any error drops
/// the partially built mesh.
pub struct MeshReader<'r> {
    registry: &'r Registry,
}

/// Block currently being consumed.
struct OpenBlock {
    block: Block,
    remaining: usize,
}

impl<'r> MeshReader<'r> {
    /// Create a reader resolving type tags against `registry`.
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Read and resolve a complete mesh.
    pub fn read<R: BufRead>(&self, input: R) -> Result<Mesh> {
        let mut mesh = Mesh::new();
        let mut last_block: Option<Block> = None;
        let mut open: Option<OpenBlock> = None;
        let mut line_no = 0;

        for line in input.lines() {
            line_no += 1;
            let line = line.map_err(|e| match e.kind() {
                ErrorKind::InvalidData => {
                    Error::malformed(line_no, format!("line is not valid UTF-8: {}", e))
                }
                _ => Error::Io(e),
            })?;
            let text = strip_comment(&line).trim();
            if text.is_empty() {
                continue;
            }

            match open.as_mut() {
                Some(current) if current.remaining > 0 => {
                    self.read_record(&mut mesh, current.block, line_no, text)?;
                    current.remaining -= 1;
                }
                _ => {
                    if text.split_whitespace().next() == Some(END_MARKER) {
                        break;
                    }
                    let header = parse_header(line_no, text)?;
                    if let Some(prev) = last_block {
                        if header.block <= prev {
                            return Err(Error::RecordOrder {
                                line: line_no,
                                message: format!(
                                    "{} block cannot follow {} block",
                                    header.block.header(),
                                    prev.header()
                                ),
                            });
                        }
                    }
                    log::trace!(
                        "line {}: {} block with {} records",
                        line_no,
                        header.block.header(),
                        header.remaining
                    );
                    last_block = Some(header.block);
                    open = Some(header);
                }
            }
        }

        if let Some(current) = open {
            if current.remaining > 0 {
                return Err(Error::malformed(
                    line_no,
                    format!(
                        "unexpected end of stream: {} more {} records expected",
                        current.remaining,
                        current.block.marker()
                    ),
                ));
            }
        }

        mesh.resolve()?;
        log::debug!(
            "read mesh: {} nodes, {} materials, {} elements, {} loads",
            mesh.n_nodes(),
            mesh.n_materials(),
            mesh.n_elements(),
            mesh.n_loads()
        );
        Ok(mesh)
    }

    fn read_record(&self, mesh: &mut Mesh, block: Block, line: usize, text: &str) -> Result<()> {
        let (marker, fields) = split_first(text);
        if marker != block.marker() {
            return Err(Error::malformed(
                line,
                format!(
                    "expected {} record inside {} block, found '{}'",
                    block.marker(),
                    block.header(),
                    marker
                ),
            ));
        }
        log::trace!("line {}: {}", line, text);

        if block == Block::Nodes {
            let mut record = RecordReader::new(line, fields);
            let id = NodeId(record.next_u32("node id")?);
            let x = record.next_f64("x coordinate")?;
            let y = record.next_f64("y coordinate")?;
            record.finish()?;
            return mesh
                .add_node(Node::new(id, Point2::new(x, y)))
                .map(|_| ())
                .map_err(|e| at_line(e, line));
        }

        let (tag, fields) = split_first(fields);
        if tag.is_empty() {
            return Err(Error::malformed(line, "missing type tag"));
        }
        let mut record = RecordReader::new(line, fields);

        match block {
            Block::Materials => {
                let mut material = self.registry.create_material(tag)?;
                material.read(&mut record, &ReadContext::new(mesh))?;
                record.finish()?;
                mesh.add_material(material).map_err(|e| at_line(e, line))?;
            }
            Block::Elements => {
                let mut element = self.registry.create_element(tag)?;
                element.read(&mut record, &ReadContext::new(mesh))?;
                record.finish()?;
                mesh.add_element(element).map_err(|e| at_line(e, line))?;
            }
            Block::Loads => {
                let mut load = self.registry.create_load(tag)?;
                load.read(&mut record, &ReadContext::new(mesh))?;
                record.finish()?;
                mesh.add_load(load).map_err(|e| at_line(e, line))?;
            }
            Block::Nodes => unreachable!("node records are handled above"),
        }
        Ok(())
    }
}

fn parse_header(line: usize, text: &str) -> Result<OpenBlock> {
    let (token, fields) = split_first(text);
    let block = Block::from_header(token).ok_or_else(|| {
        Error::malformed(line, format!("expected block header, found '{}'", token))
    })?;
    let mut record = RecordReader::new(line, fields);
    let remaining = record.next_usize("record count")?;
    record.finish()?;
    Ok(OpenBlock { block, remaining })
}

fn split_first(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.find(char::is_whitespace) {
        Some(pos) => (&text[..pos], &text[pos..]),
        None => (text, ""),
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('%') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

/// Attach a line number to mesh-level validation failures.
fn at_line(err: Error, line: usize) -> Error {
    match err {
        Error::Mesh(message) => Error::malformed(line, message),
        other => other,
    }
}
