//! 3-node plane stress triangle (Constant Strain Triangle).
//!
//! - 3 nodes at vertices
//! - 2 DOFs per node (u, v displacements)
//! - 6 total DOFs
//! - Constant strain/stress within element
//!
//! Ke = h · Area · Bᵀ D B, where D is the plane stress constitutive matrix and
//! h the material thickness. Nodes may be ordered either way around.

use crate::codec::{ReadContext, RecordReader, RecordWriter};
use crate::draw::Canvas;
use crate::element::{check_coords, read_connectivity, write_connectivity, Element};
use crate::error::{Error, Result};
use crate::material::{constitutive_plane_stress, Material};
use crate::types::{ElementId, MaterialId, NodeId, Point2, Vec2};
use nalgebra::{DMatrix, DVector};

/// 3-node triangular plane stress element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tri3 {
    id: ElementId,
    nodes: [NodeId; 3],
    material: MaterialId,
}

impl Tri3 {
    /// Persisted type tag.
    pub const TAG: &'static str = "Tri3";

    /// Create a triangle over three nodes.
    pub fn new(id: ElementId, nodes: [NodeId; 3], material: MaterialId) -> Self {
        Self { id, nodes, material }
    }

    /// Strain-displacement matrix and unsigned area.
    fn compute_b_matrix(&self, coords: &[Point2]) -> Result<(DMatrix<f64>, f64)> {
        check_coords(self, coords)?;
        let (x1, y1) = (coords[0].x, coords[0].y);
        let (x2, y2) = (coords[1].x, coords[1].y);
        let (x3, y3) = (coords[2].x, coords[2].y);

        let area_2 = (x2 - x1) * (y3 - y1) - (x3 - x1) * (y2 - y1);
        if area_2.abs() <= f64::EPSILON * (x2 - x1).hypot(y2 - y1).powi(2) {
            return Err(Error::Element(format!(
                "Tri3 element {} is degenerate (zero area)",
                self.id
            )));
        }

        let b = [y2 - y3, y3 - y1, y1 - y2];
        let c = [x3 - x2, x1 - x3, x2 - x1];

        let mut bm = DMatrix::zeros(3, 6);
        for i in 0..3 {
            bm[(0, 2 * i)] = b[i] / area_2;
            bm[(1, 2 * i + 1)] = c[i] / area_2;
            bm[(2, 2 * i)] = c[i] / area_2;
            bm[(2, 2 * i + 1)] = b[i] / area_2;
        }
        Ok((bm, area_2.abs() / 2.0))
    }
}

impl Element for Tri3 {
    fn tag(&self) -> &'static str {
        Self::TAG
    }

    fn id(&self) -> ElementId {
        self.id
    }

    fn n_nodes(&self) -> usize {
        3
    }

    fn dofs_per_node(&self) -> usize {
        2
    }

    fn node_ids(&self) -> &[NodeId] {
        &self.nodes
    }

    fn material_id(&self) -> MaterialId {
        self.material
    }

    fn stiffness(&self, coords: &[Point2], material: &dyn Material) -> Result<DMatrix<f64>> {
        let (b, area) = self.compute_b_matrix(coords)?;
        let d = constitutive_plane_stress(material.require("E")?, material.require("nu")?);
        let h = material.require("h")?;

        let d = DMatrix::from_iterator(3, 3, d.iter().copied());
        Ok(b.transpose() * d * b * (h * area))
    }

    fn body_force(
        &self,
        acceleration: &Vec2,
        coords: &[Point2],
        material: &dyn Material,
    ) -> Result<DVector<f64>> {
        let (_, area) = self.compute_b_matrix(coords)?;
        let mass = material.require("rho")? * material.require("h")? * area;
        let f = acceleration * (mass / 3.0);
        Ok(DVector::from_column_slice(&[f.x, f.y, f.x, f.y, f.x, f.y]))
    }

    fn read(&mut self, record: &mut RecordReader<'_>, ctx: &ReadContext<'_>) -> Result<()> {
        let (id, nodes, material) = read_connectivity::<3>(record, ctx)?;
        *self = Self::new(id, nodes, material);
        Ok(())
    }

    fn write(&self, record: &mut RecordWriter) {
        write_connectivity(record, self.id, &self.nodes, self.material);
    }

    fn draw(&self, canvas: &mut dyn Canvas, coords: &[Point2]) {
        if let [a, b, c] = coords {
            canvas.line(*a, *b);
            canvas.line(*b, *c);
            canvas.line(*c, *a);
        }
    }
}
