//! Global degree-of-freedom numbering.
//!
//! Nodes are numbered in mesh order. Each node gets as many consecutive
//! global DOFs as the most demanding element attached to it needs (2 for a
//! node shared only by bars and triangles, 3 once a beam uses it), so the
//! numbering depends only on node order and per-node arity.

use crate::error::{Error, Result};
use crate::mesh::Mesh;
use std::ops::Range;

/// Mapping from nodes to their global DOF indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DofMap {
    /// `offsets[n]..offsets[n + 1]` are the global DOFs of node slot `n`.
    offsets: Vec<usize>,
}

impl DofMap {
    /// Number the DOFs of `mesh`.
    pub fn new(mesh: &Mesh) -> Self {
        let mut arity = vec![0usize; mesh.n_nodes()];
        for element in mesh.elements() {
            for id in element.node_ids() {
                if let Some(slot) = mesh.node_slot(*id) {
                    arity[slot] = arity[slot].max(element.dofs_per_node());
                }
            }
        }

        let unused = arity.iter().filter(|&&a| a == 0).count();
        if unused > 0 {
            log::warn!("{} nodes are not used by any element and carry no DOFs", unused);
        }

        Self::from_arity(&arity)
    }

    /// Number DOFs given the arity of each node slot.
    pub fn from_arity(arity: &[usize]) -> Self {
        let mut offsets = Vec::with_capacity(arity.len() + 1);
        offsets.push(0);
        let mut next = 0;
        for a in arity {
            next += a;
            offsets.push(next);
        }
        Self { offsets }
    }

    /// Total number of global DOFs.
    pub fn n_dofs(&self) -> usize {
        self.offsets.last().copied().unwrap_or(0)
    }

    /// Number of numbered nodes.
    pub fn n_nodes(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Global DOFs of the node at `slot`, or `None` past the last numbered node.
    pub fn node_dofs(&self, slot: usize) -> Option<Range<usize>> {
        let start = *self.offsets.get(slot)?;
        let end = *self.offsets.get(slot + 1)?;
        Some(start..end)
    }

    /// Global DOF indices of an element's local DOFs, in local order.
    ///
    /// Local DOF `d` of local node `k` maps to `node_dofs(node_k).start + d`.
    /// Fails if `mesh` has nodes this map did not number, or a node carries
    /// fewer DOFs than the element needs.
    pub fn element_dofs(&self, mesh: &Mesh, slot: usize) -> Result<Vec<usize>> {
        let element = mesh
            .element(slot)
            .ok_or_else(|| Error::Mesh(format!("element slot {} out of bounds", slot)))?;
        let dofs_per_node = element.dofs_per_node();

        let mut dofs = Vec::with_capacity(element.n_dofs());
        for &node in mesh.element_node_slots(slot)? {
            let range = self
                .node_dofs(node)
                .filter(|range| range.len() >= dofs_per_node)
                .ok_or_else(|| {
                    Error::Mesh(format!(
                        "node slot {} has no {} DOFs in this numbering",
                        node, dofs_per_node
                    ))
                })?;
            dofs.extend(range.start..range.start + dofs_per_node);
        }
        Ok(dofs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Bar2D, Beam2D};
    use crate::material::LinearElastic;
    use crate::mesh::Node;
    use crate::types::{ElementId, MaterialId, NodeId, Point2};

    fn frame() -> Mesh {
        let mut mesh = Mesh::new();
        for (i, x) in [0.0, 1.0, 2.0, 3.0].into_iter().enumerate() {
            mesh.add_node(Node::new(NodeId(i as u32), Point2::new(x, 0.0))).unwrap();
        }
        mesh.add_material(Box::new(LinearElastic::new(MaterialId(0), 1.0, 0.0).unwrap())).unwrap();
        let element = Bar2D::new(ElementId(0), [NodeId(0), NodeId(1)], MaterialId(0));
        mesh.add_element(Box::new(element)).unwrap();
        let element = Beam2D::new(ElementId(1), [NodeId(1), NodeId(2)], MaterialId(0));
        mesh.add_element(Box::new(element)).unwrap();
        mesh.resolve().unwrap();
        mesh
    }

    #[test]
    fn test_arity_follows_elements() {
        let map = DofMap::new(&frame());
        assert_eq!(map.node_dofs(0), Some(0..2));
        assert_eq!(map.node_dofs(1), Some(2..5));
        assert_eq!(map.node_dofs(2), Some(5..8));
        // Node 3 is not used by any element.
        assert_eq!(map.node_dofs(3), Some(8..8));
        assert_eq!(map.node_dofs(4), None);
        assert_eq!(map.n_dofs(), 8);
        assert_eq!(map.n_nodes(), 4);
    }

    #[test]
    fn test_element_dofs() {
        let mesh = frame();
        let map = DofMap::new(&mesh);
        // The bar only touches the translational DOFs of node 1.
        assert_eq!(map.element_dofs(&mesh, 0).unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(map.element_dofs(&mesh, 1).unwrap(), vec![2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_numbering_is_deterministic() {
        let mesh = frame();
        assert_eq!(DofMap::new(&mesh), DofMap::new(&mesh));
    }

    #[test]
    fn test_element_dofs_against_other_numbering() {
        let mesh = frame();
        // Too few nodes numbered.
        let short = DofMap::from_arity(&[2]);
        assert!(matches!(short.element_dofs(&mesh, 0), Err(Error::Mesh(_))));
        // Node 2 lacks the rotation the beam needs.
        let flat = DofMap::from_arity(&[2, 2, 2, 0]);
        assert!(flat.element_dofs(&mesh, 0).is_ok());
        assert!(matches!(flat.element_dofs(&mesh, 1), Err(Error::Mesh(_))));
        // Element slot out of range.
        assert!(DofMap::new(&mesh).element_dofs(&mesh, 7).is_err());
    }

    #[test]
    fn test_from_arity() {
        let map = DofMap::from_arity(&[2, 3, 2]);
        assert_eq!(map.n_dofs(), 7);
        assert_eq!(map.node_dofs(1), Some(2..5));
        assert_eq!(DofMap::from_arity(&[]).n_dofs(), 0);
    }
}
