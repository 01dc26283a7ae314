//! Text persistence for meshes.
//!
//! A mesh stream is four count-prefixed blocks in a fixed order. Each record
//! is one line: an entity-kind marker, a type tag naming the concrete variant
//! (nodes have no variants and carry no tag), then the variant's fields.
//!
//! ```text
//! % comments run to end of line
//! <Nodes> 2
//! Node 0 0 0
//! Node 1 1 0
//! <Materials> 1
//! Material LinearElastic 0 E=1 A=1 I=1 nu=0 h=1 rho=0
//! <Elements> 1
//! Element Bar2D 0 0 1 0
//! <Loads> 1
//! Load LoadNode 0 0 1 2 1 0
//! <End>
//! ```
//!
//! Records may only refer to entities of earlier blocks (or earlier records
//! of the same block); anything else is a [`crate::Error::DanglingReference`].
//! A block appearing after a later one is a [`crate::Error::RecordOrder`].
//!
//! # Submodules
//!
//! - [`record`] - field tokenizer/writer and the cross-reference context
//! - [`reader`] - [`MeshReader`]
//! - [`writer`] - [`MeshWriter`]

pub mod reader;
pub mod record;
pub mod writer;

pub use reader::MeshReader;
pub use record::{ReadContext, RecordReader, RecordWriter};
pub use writer::MeshWriter;

pub(crate) const END_MARKER: &str = "<End>";

/// Stream blocks in their required order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Block {
    Nodes,
    Materials,
    Elements,
    Loads,
}

impl Block {
    pub(crate) fn header(self) -> &'static str {
        match self {
            Block::Nodes => "<Nodes>",
            Block::Materials => "<Materials>",
            Block::Elements => "<Elements>",
            Block::Loads => "<Loads>",
        }
    }

    pub(crate) fn marker(self) -> &'static str {
        match self {
            Block::Nodes => "Node",
            Block::Materials => "Material",
            Block::Elements => "Element",
            Block::Loads => "Load",
        }
    }

    pub(crate) fn from_header(token: &str) -> Option<Self> {
        [Block::Nodes, Block::Materials, Block::Elements, Block::Loads]
            .into_iter()
            .find(|b| b.header() == token)
    }
}
