//! Two-node bar (spring) element in the plane.
//!
//! The Bar2D resists axial load only:
//! - 2 nodes
//! - 2 DOFs per node (u, v displacements)
//! - 4 total DOFs
//! - No bending stiffness
//!
//! # Formulation
//!
//! Axial stiffness k = A·E/L acts along the element axis with direction
//! cosines (c, s). Projected onto the global displacement directions:
//!
//! ```text
//!          [ c²   cs  -c²  -cs]
//! Ke = k * [ cs   s²  -cs  -s²]
//!          [-c²  -cs   c²   cs]
//!          [-cs  -s²   cs   s²]
//! ```

use crate::codec::{ReadContext, RecordReader, RecordWriter};
use crate::draw::Canvas;
use crate::element::{check_coords, read_connectivity, write_connectivity, Element};
use crate::error::{Error, Result};
use crate::material::Material;
use crate::types::{segment_geometry, ElementId, MaterialId, NodeId, Point2, Vec2};
use nalgebra::{DMatrix, DVector};

/// Two-node axial bar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bar2D {
    id: ElementId,
    nodes: [NodeId; 2],
    material: MaterialId,
}

impl Bar2D {
    /// Persisted type tag.
    pub const TAG: &'static str = "Bar2D";

    /// Create a bar between two nodes.
    pub fn new(id: ElementId, nodes: [NodeId; 2], material: MaterialId) -> Self {
        Self { id, nodes, material }
    }

    /// Length and direction cosines, rejecting coincident nodes.
    fn geometry(&self, coords: &[Point2]) -> Result<(f64, f64, f64)> {
        check_coords(self, coords)?;
        let (length, c, s) = segment_geometry(&coords[0], &coords[1]);
        if length <= 0.0 {
            return Err(Error::Element(format!(
                "Bar2D element {} has zero length",
                self.id
            )));
        }
        Ok((length, c, s))
    }

    /// Axial force (positive in tension) for the given local displacements.
    ///
    /// `displacements` holds [u1, v1, u2, v2].
    pub fn axial_force(
        &self,
        coords: &[Point2],
        material: &dyn Material,
        displacements: &[f64],
    ) -> Result<f64> {
        if displacements.len() != self.n_dofs() {
            return Err(Error::Element(format!(
                "Bar2D element {} expects {} displacements, got {}",
                self.id,
                self.n_dofs(),
                displacements.len()
            )));
        }
        let (length, c, s) = self.geometry(coords)?;
        let k = material.require("A")? * material.require("E")? / length;
        let elongation =
            (displacements[2] - displacements[0]) * c + (displacements[3] - displacements[1]) * s;
        Ok(k * elongation)
    }
}

impl Element for Bar2D {
    fn tag(&self) -> &'static str {
        Self::TAG
    }

    fn id(&self) -> ElementId {
        self.id
    }

    fn n_nodes(&self) -> usize {
        2
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
        let (length, c, s) = self.geometry(coords)?;
        let k = material.require("A")? * material.require("E")? / length;

        let cc = k * c * c;
        let cs = k * c * s;
        let ss = k * s * s;

        #[rustfmt::skip]
        let ke = DMatrix::from_row_slice(4, 4, &[
             cc,  cs, -cc, -cs,
             cs,  ss, -cs, -ss,
            -cc, -cs,  cc,  cs,
            -cs, -ss,  cs,  ss,
        ]);
        Ok(ke)
    }

    fn body_force(
        &self,
        acceleration: &Vec2,
        coords: &[Point2],
        material: &dyn Material,
    ) -> Result<DVector<f64>> {
        let (length, _, _) = self.geometry(coords)?;
        let mass = material.require("rho")? * material.require("A")? * length;
        // Lumped: half the weight on each node.
        let f = acceleration * (mass / 2.0);
        Ok(DVector::from_column_slice(&[f.x, f.y, f.x, f.y]))
    }

    fn read(&mut self, record: &mut RecordReader<'_>, ctx: &ReadContext<'_>) -> Result<()> {
        let (id, nodes, material) = read_connectivity::<2>(record, ctx)?;
        *self = Self::new(id, nodes, material);
        Ok(())
    }

    fn write(&self, record: &mut RecordWriter) {
        write_connectivity(record, self.id, &self.nodes, self.material);
    }

    fn draw(&self, canvas: &mut dyn Canvas, coords: &[Point2]) {
        if let [a, b] = coords {
            canvas.line(*a, *b);
        }
    }
}
