//! Mesh stream writer.

use super::record::RecordWriter;
use super::{Block, END_MARKER};
use crate::error::Result;
use crate::mesh::Mesh;
use std::io::Write;

/// Writes a mesh in the block format understood by [`super::MeshReader`].
pub struct MeshWriter<W: Write> {
    out: W,
}

impl<W: Write> MeshWriter<W> {
    /// Wrap an output stream.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Write every entity of `mesh`, blocks in reading order.
    pub fn write(&mut self, mesh: &Mesh) -> Result<()> {
        writeln!(self.out, "% femkit mesh")?;

        self.header(Block::Nodes, mesh.n_nodes())?;
        for node in mesh.nodes() {
            let mut record = RecordWriter::new();
            record.field(node.id).field(node.coords.x).field(node.coords.y);
            self.record(Block::Nodes, None, &record)?;
        }

        self.header(Block::Materials, mesh.n_materials())?;
        for material in mesh.materials() {
            let mut record = RecordWriter::new();
            material.write(&mut record);
            self.record(Block::Materials, Some(material.tag()), &record)?;
        }

        self.header(Block::Elements, mesh.n_elements())?;
        for element in mesh.elements() {
            let mut record = RecordWriter::new();
            element.write(&mut record);
            self.record(Block::Elements, Some(element.tag()), &record)?;
        }

        self.header(Block::Loads, mesh.n_loads())?;
        for load in mesh.loads() {
            let mut record = RecordWriter::new();
            load.write(&mut record);
            self.record(Block::Loads, Some(load.tag()), &record)?;
        }

        writeln!(self.out, "{}", END_MARKER)?;
        self.out.flush()?;
        Ok(())
    }

    /// Recover the underlying stream.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn header(&mut self, block: Block, count: usize) -> Result<()> {
        writeln!(self.out, "{} {}", block.header(), count)?;
        Ok(())
    }

    fn record(&mut self, block: Block, tag: Option<&str>, body: &RecordWriter) -> Result<()> {
        match tag {
            Some(tag) => writeln!(self.out, "{} {} {}", block.marker(), tag, body.as_str())?,
            None => writeln!(self.out, "{} {}", block.marker(), body.as_str())?,
        }
        Ok(())
    }
}
