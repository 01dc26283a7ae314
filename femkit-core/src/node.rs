//! Mesh nodes.

use crate::types::{NodeId, Point2};

/// A mesh node: identity and planar coordinates.
///
/// Global DOF indices are not stored on the node; they come from the
/// numbering pass, see [`DofMap`](crate::dof::DofMap).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    /// Identity, unique within a mesh.
    pub id: NodeId,
    /// Coordinates.
    pub coords: Point2,
}

impl Node {
    /// Create a node.
    pub fn new(id: NodeId, coords: Point2) -> Self {
        Self { id, coords }
    }
}
