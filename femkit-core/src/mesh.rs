//! Mesh data structure for FEM.
//!
//! The mesh owns every node, material, element and load, in insertion order,
//! and indexes them by identity. Elements and loads refer to other entities
//! by identity only; [`Mesh::resolve`] turns those identities into table
//! slots once all entities are present. Stiffness and load computations go
//! through the resolved slots and fail with
//! [`Error::UnresolvedReference`] on a mesh that has changed since its last
//! resolution.

use crate::codec::{MeshReader, MeshWriter};
use crate::draw::Canvas;
use crate::element::Element;
use crate::error::{Error, Result};
use crate::load::Load;
use crate::material::Material;
use crate::registry;
use crate::types::{ElementId, LoadId, MaterialId, NodeId, Point2};
use nalgebra::{DMatrix, DVector};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

pub use crate::node::Node;

/// Resolved slots of one element's references.
#[derive(Debug, Clone)]
struct ElementLinks {
    nodes: Vec<usize>,
    material: usize,
}

/// Slot tables produced by [`Mesh::resolve`].
#[derive(Debug, Clone, Default)]
struct Links {
    elements: Vec<ElementLinks>,
    load_targets: Vec<usize>,
}

/// Finite element mesh.
#[derive(Debug, Default)]
pub struct Mesh {
    nodes: Vec<Node>,
    node_slots: HashMap<NodeId, usize>,
    materials: Vec<Box<dyn Material>>,
    material_slots: HashMap<MaterialId, usize>,
    elements: Vec<Box<dyn Element>>,
    element_slots: HashMap<ElementId, usize>,
    loads: Vec<Box<dyn Load>>,
    load_slots: HashMap<LoadId, usize>,
    links: Option<Links>,
}

fn dangling(kind: &'static str, id: u32) -> Error {
    Error::DanglingReference { kind, id }
}

impl Mesh {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a mesh using the process-wide registry.
    pub fn from_reader<R: BufRead>(input: R) -> Result<Self> {
        MeshReader::new(registry::global()).read(input)
    }

    /// Read a mesh file using the process-wide registry.
    pub fn read_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Write this mesh to a stream.
    pub fn to_writer<W: Write>(&self, out: W) -> Result<()> {
        MeshWriter::new(out).write(self)
    }

    /// Write this mesh to a file.
    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        self.to_writer(BufWriter::new(file))
    }

    /// Add a node, returning its slot.
    pub fn add_node(&mut self, node: Node) -> Result<usize> {
        if self.node_slots.contains_key(&node.id) {
            return Err(Error::Mesh(format!("duplicate node id {}", node.id)));
        }
        let slot = self.nodes.len();
        self.node_slots.insert(node.id, slot);
        self.nodes.push(node);
        self.links = None;
        Ok(slot)
    }

    /// Add a material, returning its slot.
    pub fn add_material(&mut self, material: Box<dyn Material>) -> Result<usize> {
        let id = material.id();
        if self.material_slots.contains_key(&id) {
            return Err(Error::Mesh(format!("duplicate material id {}", id)));
        }
        let slot = self.materials.len();
        self.material_slots.insert(id, slot);
        self.materials.push(material);
        self.links = None;
        Ok(slot)
    }

    /// Add an element, returning its slot.
    ///
    /// Every node and the material it refers to must already be in the mesh.
    pub fn add_element(&mut self, element: Box<dyn Element>) -> Result<usize> {
        let id = element.id();
        if self.element_slots.contains_key(&id) {
            return Err(Error::Mesh(format!("duplicate element id {}", id)));
        }
        if element.node_ids().len() != element.n_nodes() {
            return Err(Error::Mesh(format!(
                "{} element {} requires {} nodes, got {}",
                element.tag(),
                id,
                element.n_nodes(),
                element.node_ids().len()
            )));
        }
        for node in element.node_ids() {
            if !self.node_slots.contains_key(node) {
                return Err(dangling(NodeId::KIND, node.0));
            }
        }
        if !self.material_slots.contains_key(&element.material_id()) {
            return Err(dangling(MaterialId::KIND, element.material_id().0));
        }

        let slot = self.elements.len();
        self.element_slots.insert(id, slot);
        self.elements.push(element);
        self.links = None;
        Ok(slot)
    }

    /// Add a load, returning its slot.
    ///
    /// The target element must already be in the mesh and the load must fit it.
    pub fn add_load(&mut self, load: Box<dyn Load>) -> Result<usize> {
        let id = load.id();
        if self.load_slots.contains_key(&id) {
            return Err(Error::Mesh(format!("duplicate load id {}", id)));
        }
        let target = self
            .element_by_id(load.element_id())
            .ok_or_else(|| dangling(ElementId::KIND, load.element_id().0))?;
        load.validate(target)?;

        let slot = self.loads.len();
        self.load_slots.insert(id, slot);
        self.loads.push(load);
        self.links = None;
        Ok(slot)
    }

    /// Resolve every element and load reference to a table slot.
    pub fn resolve(&mut self) -> Result<()> {
        let mut links = Links {
            elements: Vec::with_capacity(self.elements.len()),
            load_targets: Vec::with_capacity(self.loads.len()),
        };

        for element in &self.elements {
            let nodes = element
                .node_ids()
                .iter()
                .map(|id| {
                    self.node_slots
                        .get(id)
                        .copied()
                        .ok_or_else(|| dangling(NodeId::KIND, id.0))
                })
                .collect::<Result<Vec<_>>>()?;
            let material = self
                .material_slot(element.material_id())
                .ok_or_else(|| dangling(MaterialId::KIND, element.material_id().0))?;
            links.elements.push(ElementLinks { nodes, material });
        }

        for load in &self.loads {
            let target = self
                .element_slot(load.element_id())
                .ok_or_else(|| dangling(ElementId::KIND, load.element_id().0))?;
            links.load_targets.push(target);
        }

        log::debug!(
            "resolved {} elements and {} loads",
            links.elements.len(),
            links.load_targets.len()
        );
        self.links = Some(links);
        Ok(())
    }

    /// Whether all references are resolved against the current tables.
    pub fn is_resolved(&self) -> bool {
        self.links.is_some()
    }

    fn links(&self) -> Result<&Links> {
        self.links.as_ref().ok_or_else(|| {
            Error::UnresolvedReference("mesh references have not been resolved".into())
        })
    }

    /// Move a node. Resolution is unaffected, so the mesh can be re-assembled
    /// directly afterwards.
    pub fn set_node_coords(&mut self, id: NodeId, coords: Point2) -> Result<()> {
        let slot = self
            .node_slot(id)
            .ok_or_else(|| Error::Mesh(format!("no node with id {}", id)))?;
        self.nodes[slot].coords = coords;
        Ok(())
    }

    /// Number of nodes in the mesh.
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of materials in the mesh.
    pub fn n_materials(&self) -> usize {
        self.materials.len()
    }

    /// Number of elements in the mesh.
    pub fn n_elements(&self) -> usize {
        self.elements.len()
    }

    /// Number of loads in the mesh.
    pub fn n_loads(&self) -> usize {
        self.loads.len()
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Slot of a node identity.
    pub fn node_slot(&self, id: NodeId) -> Option<usize> {
        self.node_slots.get(&id).copied()
    }

    /// Look up a node by identity.
    pub fn node_by_id(&self, id: NodeId) -> Option<&Node> {
        self.node_slot(id).map(|slot| &self.nodes[slot])
    }

    /// Materials in insertion order.
    pub fn materials(&self) -> &[Box<dyn Material>] {
        &self.materials
    }

    /// Slot of a material identity.
    pub fn material_slot(&self, id: MaterialId) -> Option<usize> {
        self.material_slots.get(&id).copied()
    }

    /// Look up a material by identity.
    pub fn material_by_id(&self, id: MaterialId) -> Option<&dyn Material> {
        self.material_slot(id).map(|slot| self.materials[slot].as_ref())
    }

    /// Elements in insertion order.
    pub fn elements(&self) -> &[Box<dyn Element>] {
        &self.elements
    }

    /// Element at a slot.
    pub fn element(&self, slot: usize) -> Option<&dyn Element> {
        self.elements.get(slot).map(|e| e.as_ref())
    }

    /// Slot of an element identity.
    pub fn element_slot(&self, id: ElementId) -> Option<usize> {
        self.element_slots.get(&id).copied()
    }

    /// Look up an element by identity.
    pub fn element_by_id(&self, id: ElementId) -> Option<&dyn Element> {
        self.element_slot(id).map(|slot| self.elements[slot].as_ref())
    }

    /// Loads in insertion order.
    pub fn loads(&self) -> &[Box<dyn Load>] {
        &self.loads
    }

    /// Look up a load by identity.
    pub fn load_by_id(&self, id: LoadId) -> Option<&dyn Load> {
        self.load_slots.get(&id).map(|&slot| self.loads[slot].as_ref())
    }

    fn element_links(&self, slot: usize) -> Result<&ElementLinks> {
        self.links()?
            .elements
            .get(slot)
            .ok_or_else(|| Error::Mesh(format!("element slot {} out of bounds", slot)))
    }

    /// Node slots of an element, in local order.
    pub fn element_node_slots(&self, slot: usize) -> Result<&[usize]> {
        Ok(&self.element_links(slot)?.nodes)
    }

    /// Coordinates of an element's nodes.
    pub fn element_coords(&self, slot: usize) -> Result<Vec<Point2>> {
        Ok(self
            .element_links(slot)?
            .nodes
            .iter()
            .map(|&n| self.nodes[n].coords)
            .collect())
    }

    /// Material of an element.
    pub fn element_material(&self, slot: usize) -> Result<&dyn Material> {
        let links = self.element_links(slot)?;
        Ok(self.materials[links.material].as_ref())
    }

    /// Local stiffness matrix of the element at `slot`.
    pub fn element_stiffness(&self, slot: usize) -> Result<DMatrix<f64>> {
        let coords = self.element_coords(slot)?;
        let material = self.element_material(slot)?;
        self.elements[slot].stiffness(&coords, material)
    }

    /// Slot of the element targeted by the load at `load_slot`.
    pub fn load_target(&self, load_slot: usize) -> Result<usize> {
        self.links()?
            .load_targets
            .get(load_slot)
            .copied()
            .ok_or_else(|| Error::Mesh(format!("load slot {} out of bounds", load_slot)))
    }

    /// Local load vector the load at `load_slot` puts on its target element.
    pub fn element_load_vector(&self, load_slot: usize) -> Result<DVector<f64>> {
        let target = self.load_target(load_slot)?;
        let coords = self.element_coords(target)?;
        let material = self.element_material(target)?;
        self.elements[target].load_vector(&self.loads[load_slot].contribution(), &coords, material)
    }

    /// Draw every element on `canvas`.
    pub fn draw(&self, canvas: &mut dyn Canvas) -> Result<()> {
        for (slot, element) in self.elements.iter().enumerate() {
            let coords = self.element_coords(slot)?;
            element.draw(canvas, &coords);
        }
        Ok(())
    }

    /// Compute mesh bounding box.
    pub fn bounds(&self) -> Option<(Point2, Point2)> {
        let first = self.nodes.first()?.coords;
        Some(self.nodes[1..].iter().fold((first, first), |(min, max), node| {
            (min.inf(&node.coords), max.sup(&node.coords))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::SegmentList;
    use crate::element::{Bar2D, Tri3};
    use crate::load::{LoadBc, LoadNode};
    use crate::material::LinearElastic;

    fn two_bar_mesh() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.add_node(Node::new(NodeId(10), Point2::new(0.0, 0.0))).unwrap();
        mesh.add_node(Node::new(NodeId(20), Point2::new(1.0, 0.0))).unwrap();
        mesh.add_node(Node::new(NodeId(30), Point2::new(1.0, 1.0))).unwrap();
        mesh.add_material(Box::new(LinearElastic::new(MaterialId(1), 1.0, 0.0).unwrap())).unwrap();
        let element = Bar2D::new(ElementId(0), [NodeId(10), NodeId(20)], MaterialId(1));
        mesh.add_element(Box::new(element)).unwrap();
        let element = Bar2D::new(ElementId(1), [NodeId(20), NodeId(30)], MaterialId(1));
        mesh.add_element(Box::new(element)).unwrap();
        mesh
    }

    #[test]
    fn test_mesh_creation() {
        let mut mesh = two_bar_mesh();
        assert_eq!(mesh.n_nodes(), 3);
        assert_eq!(mesh.n_elements(), 2);
        assert!(!mesh.is_resolved());
        mesh.resolve().unwrap();
        assert!(mesh.is_resolved());
        assert_eq!(mesh.element_node_slots(1).unwrap(), &[1, 2]);
    }

    #[test]
    fn test_stiffness_requires_resolution() {
        let mut mesh = two_bar_mesh();
        assert!(matches!(
            mesh.element_stiffness(0),
            Err(Error::UnresolvedReference(_))
        ));
        mesh.resolve().unwrap();
        assert_eq!(mesh.element_stiffness(0).unwrap().shape(), (4, 4));

        // Adding an entity invalidates the resolution.
        mesh.add_node(Node::new(NodeId(40), Point2::new(2.0, 2.0))).unwrap();
        assert!(matches!(
            mesh.element_stiffness(0),
            Err(Error::UnresolvedReference(_))
        ));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut mesh = two_bar_mesh();
        assert!(mesh.add_node(Node::new(NodeId(10), Point2::new(5.0, 5.0))).is_err());
        assert!(mesh
            .add_material(Box::new(LinearElastic::new(MaterialId(1), 2.0, 0.0).unwrap()))
            .is_err());
        let bar = Bar2D::new(ElementId(1), [NodeId(10), NodeId(30)], MaterialId(1));
        assert!(mesh.add_element(Box::new(bar)).is_err());
    }

    #[test]
    fn test_element_with_missing_node() {
        let mut mesh = two_bar_mesh();
        let bar = Bar2D::new(ElementId(5), [NodeId(10), NodeId(99)], MaterialId(1));
        let result = mesh.add_element(Box::new(bar));
        assert!(matches!(
            result,
            Err(Error::DanglingReference { kind: "node", id: 99 })
        ));
    }

    #[test]
    fn test_element_with_missing_material() {
        let mut mesh = two_bar_mesh();
        let bar = Bar2D::new(ElementId(5), [NodeId(10), NodeId(30)], MaterialId(7));
        let result = mesh.add_element(Box::new(bar));
        assert!(matches!(
            result,
            Err(Error::DanglingReference { kind: "material", id: 7 })
        ));
    }

    #[test]
    fn test_load_validation() {
        let mut mesh = two_bar_mesh();
        assert!(matches!(
            mesh.add_load(Box::new(LoadBc::new(LoadId(0), ElementId(9), 0, 0.0))),
            Err(Error::DanglingReference { kind: "element", id: 9 })
        ));
        assert!(mesh
            .add_load(Box::new(LoadNode::new(LoadId(0), ElementId(0), 0, vec![1.0])))
            .is_err());
        let load = LoadNode::new(LoadId(0), ElementId(1), 1, vec![0.0, -1.0]);
        mesh.add_load(Box::new(load)).unwrap();
        mesh.resolve().unwrap();
        assert_eq!(mesh.load_target(0).unwrap(), 1);
        assert_eq!(
            mesh.element_load_vector(0).unwrap().as_slice(),
            &[0.0, 0.0, 0.0, -1.0]
        );
    }

    #[test]
    fn test_set_node_coords_keeps_resolution() {
        let mut mesh = two_bar_mesh();
        mesh.resolve().unwrap();
        mesh.set_node_coords(NodeId(20), Point2::new(2.0, 0.0)).unwrap();
        assert!(mesh.is_resolved());
        let ke = mesh.element_stiffness(0).unwrap();
        assert!((ke[(0, 0)] - 0.5).abs() < 1e-14);
        assert!(mesh.set_node_coords(NodeId(99), Point2::zeros()).is_err());
    }

    #[test]
    fn test_lookup_by_id() {
        let mesh = two_bar_mesh();
        assert_eq!(mesh.node_by_id(NodeId(30)).unwrap().coords, Point2::new(1.0, 1.0));
        assert_eq!(mesh.element_by_id(ElementId(1)).unwrap().node_ids()[0], NodeId(20));
        assert_eq!(mesh.material_by_id(MaterialId(1)).unwrap().property("E"), Some(1.0));
        assert!(mesh.node_by_id(NodeId(0)).is_none());
    }

    #[test]
    fn test_draw() {
        let mut mesh = two_bar_mesh();
        mesh.add_element(Box::new(Tri3::new(
            ElementId(2),
            [NodeId(10), NodeId(20), NodeId(30)],
            MaterialId(1),
        )))
        .unwrap();
        mesh.resolve().unwrap();
        let mut canvas = SegmentList::new();
        mesh.draw(&mut canvas).unwrap();
        assert_eq!(canvas.segments.len(), 5);
        assert_eq!(canvas.segments[0], (Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)));
    }

    #[test]
    fn test_bounds() {
        let mut mesh = Mesh::new();
        assert!(mesh.bounds().is_none());
        mesh.add_node(Node::new(NodeId(0), Point2::new(-1.0, 2.0))).unwrap();
        mesh.add_node(Node::new(NodeId(1), Point2::new(1.0, -2.0))).unwrap();
        mesh.add_node(Node::new(NodeId(2), Point2::new(0.0, 0.0))).unwrap();

        let (min, max) = mesh.bounds().unwrap();
        assert_eq!(min, Point2::new(-1.0, -2.0));
        assert_eq!(max, Point2::new(1.0, 2.0));
    }

    #[test]
    fn test_file_round_trip() {
        let mut mesh = two_bar_mesh();
        mesh.resolve().unwrap();
        let path = std::env::temp_dir().join(format!("femkit-mesh-{}.txt", std::process::id()));
        mesh.write_file(&path).unwrap();
        let back = Mesh::read_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(back.nodes(), mesh.nodes());
        assert_eq!(back.n_elements(), 2);
    }
}
