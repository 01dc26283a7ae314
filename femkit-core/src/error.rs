//! Error types for femkit operations.

use thiserror::Error;

/// Result type alias using femkit Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading, assembling or solving a mesh.
#[derive(Error, Debug)]
pub enum Error {
    /// A persisted type tag that no registry entry knows about.
    #[error("unknown {category} type '{tag}'")]
    UnknownType {
        /// Entity category ("element", "material" or "load").
        category: &'static str,
        /// The unregistered tag.
        tag: String,
    },

    /// A reference to an entity that was not read before the referencing record.
    #[error("dangling reference: {kind} {id} is not defined")]
    DanglingReference {
        /// Kind of the referenced entity.
        kind: &'static str,
        /// Identity that failed to resolve.
        id: u32,
    },

    /// Stiffness or load computation attempted on an unresolved mesh.
    #[error("unresolved reference: {0}")]
    UnresolvedReference(String),

    /// A record that could not be parsed.
    #[error("malformed record at line {line}: {message}")]
    MalformedRecord {
        /// 1-based line number in the stream.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// A block appearing out of the Nodes, Materials, Elements, Loads order.
    #[error("record order violation at line {line}: {message}")]
    RecordOrder {
        /// 1-based line number in the stream.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// Element-related errors.
    #[error("element error: {0}")]
    Element(String),

    /// Mesh-related errors.
    #[error("mesh error: {0}")]
    Mesh(String),

    /// Assembly errors.
    #[error("assembly error: {0}")]
    Assembly(String),

    /// Solver errors.
    #[error("solver error: {0}")]
    Solver(String),

    /// Matrix singularity or conditioning issues.
    #[error("singular matrix: {0}")]
    SingularMatrix(String),

    /// Invalid material properties.
    #[error("invalid material: {0}")]
    InvalidMaterial(String),

    /// I/O errors from the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn malformed(line: usize, message: impl Into<String>) -> Self {
        Error::MalformedRecord {
            line,
            message: message.into(),
        }
    }
}
