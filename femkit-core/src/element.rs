//! Element trait and implementations.
//!
//! The Element trait defines the interface for finite elements, enabling
//! the assembly process and the mesh codec to work with any element type
//! uniformly. Concrete variants are created by tag through the
//! [`Registry`](crate::registry::Registry).
//!
//! # Submodules
//!
//! - [`bar2d`] - two-node axial bar (spring)
//! - [`beam2d`] - two-node Euler–Bernoulli frame element
//! - [`tri3`] - constant-strain plane stress triangle

use crate::codec::{ReadContext, RecordReader, RecordWriter};
use crate::draw::Canvas;
use crate::error::{Error, Result};
use crate::load::LoadContribution;
use crate::material::Material;
use crate::types::{ElementId, MaterialId, NodeId, Point2, Vec2};
use nalgebra::{DMatrix, DVector};
use std::fmt;

pub mod bar2d;
pub mod beam2d;
pub mod tri3;

pub use bar2d::Bar2D;
pub use beam2d::Beam2D;
pub use tri3::Tri3;

/// Finite element interface.
///
/// All element types implement this trait, providing:
/// - Element stiffness matrix computation
/// - Element load vector computation
/// - Persistence of the element's own fields
///
/// Elements refer to nodes and materials by identity only. The mesh
/// resolves those identities and hands the element its nodal coordinates
/// and material when it asks for a stiffness matrix.
///
/// Elements must be thread-safe (Send + Sync) to enable parallel assembly.
pub trait Element: Send + Sync + fmt::Debug {
    /// Persisted type tag of this variant.
    fn tag(&self) -> &'static str;

    /// Identity within the owning mesh.
    fn id(&self) -> ElementId;

    /// Number of nodes in this element.
    fn n_nodes(&self) -> usize;

    /// Degrees of freedom per node.
    fn dofs_per_node(&self) -> usize;

    /// Total degrees of freedom for this element.
    fn n_dofs(&self) -> usize {
        self.n_nodes() * self.dofs_per_node()
    }

    /// Node identities, in local order.
    fn node_ids(&self) -> &[NodeId];

    /// Identity of the element's material.
    fn material_id(&self) -> MaterialId;

    /// Compute the element stiffness matrix.
    ///
    /// # Arguments
    ///
    /// * `coords` - Nodal coordinates, in local node order
    /// * `material` - Material properties
    ///
    /// # Returns
    ///
    /// Dense symmetric stiffness matrix of shape (n_dofs, n_dofs)
    fn stiffness(&self, coords: &[Point2], material: &dyn Material) -> Result<DMatrix<f64>>;

    /// Distribute a body acceleration over the element's nodes.
    ///
    /// Variants that cannot carry body forces keep the default, which rejects them.
    fn body_force(
        &self,
        _acceleration: &Vec2,
        _coords: &[Point2],
        _material: &dyn Material,
    ) -> Result<DVector<f64>> {
        Err(Error::Element(format!(
            "{} element {} does not support body forces",
            self.tag(),
            self.id()
        )))
    }

    /// Compute the element load vector for a load targeting this element.
    ///
    /// Returns a vector of length n_dofs.
    fn load_vector(
        &self,
        load: &LoadContribution<'_>,
        coords: &[Point2],
        material: &dyn Material,
    ) -> Result<DVector<f64>> {
        match *load {
            LoadContribution::NodalForce { point, force } => {
                let dofs = self.dofs_per_node();
                if point >= self.n_nodes() || force.len() != dofs {
                    return Err(Error::Element(format!(
                        "{} element {}: nodal force on point {} with {} components \
                         (element has {} nodes with {} DOFs each)",
                        self.tag(),
                        self.id(),
                        point,
                        force.len(),
                        self.n_nodes(),
                        dofs
                    )));
                }
                let mut fe = DVector::zeros(self.n_dofs());
                fe.rows_mut(point * dofs, dofs).copy_from_slice(force);
                Ok(fe)
            }
            LoadContribution::BodyForce { acceleration } => {
                self.body_force(&acceleration, coords, material)
            }
            LoadContribution::Constraint { .. } => Ok(DVector::zeros(self.n_dofs())),
        }
    }

    /// Populate this instance from a record body.
    fn read(&mut self, record: &mut RecordReader<'_>, ctx: &ReadContext<'_>) -> Result<()>;

    /// Write the record body.
    fn write(&self, record: &mut RecordWriter);

    /// Draw the element outline. Elements without a visual form draw nothing.
    fn draw(&self, _canvas: &mut dyn Canvas, _coords: &[Point2]) {}
}

/// Read the common `id nodes... material` prefix shared by the built-in variants.
pub(crate) fn read_connectivity<const N: usize>(
    record: &mut RecordReader<'_>,
    ctx: &ReadContext<'_>,
) -> Result<(ElementId, [NodeId; N], MaterialId)> {
    let id = ElementId(record.next_u32("element id")?);
    let mut nodes = [NodeId::default(); N];
    for node in nodes.iter_mut() {
        *node = ctx.require_node(NodeId(record.next_u32("node id")?))?;
    }
    let material = ctx.require_material(MaterialId(record.next_u32("material id")?))?;
    Ok((id, nodes, material))
}

/// Write the common `id nodes... material` prefix.
pub(crate) fn write_connectivity(
    record: &mut RecordWriter,
    id: ElementId,
    nodes: &[NodeId],
    material: MaterialId,
) {
    record.field(id);
    for node in nodes {
        record.field(node);
    }
    record.field(material);
}

/// Check the coordinate count handed to a variant.
pub(crate) fn check_coords(element: &dyn Element, coords: &[Point2]) -> Result<()> {
    if coords.len() != element.n_nodes() {
        return Err(Error::Element(format!(
            "{} element {} requires {} nodal coordinates, got {}",
            element.tag(),
            element.id(),
            element.n_nodes(),
            coords.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_util {
    use nalgebra::DMatrix;

    /// Assert that `m` equals its transpose, relative to its largest entry.
    pub fn assert_symmetric(m: &DMatrix<f64>) {
        let scale = m.amax().max(1.0);
        for i in 0..m.nrows() {
            for j in 0..m.ncols() {
                assert!(
                    (m[(i, j)] - m[(j, i)]).abs() / scale < 1e-12,
                    "not symmetric at ({}, {}): {} vs {}",
                    i,
                    j,
                    m[(i, j)],
                    m[(j, i)]
                );
            }
        }
    }
}
