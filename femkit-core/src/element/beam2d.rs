//! Two-node Euler–Bernoulli frame element in the plane.
//!
//! - 2 nodes
//! - 3 DOFs per node (u, v, θ)
//! - 6 total DOFs
//! - Axial stiffness EA/L plus cubic bending with EI
//!
//! The local stiffness matrix in element axes is rotated to global axes
//! with Ke = Tᵀ k T, where T applies the direction cosines to each node's
//! translational pair and leaves the rotation untouched.

use crate::codec::{ReadContext, RecordReader, RecordWriter};
use crate::draw::Canvas;
use crate::element::{check_coords, read_connectivity, write_connectivity, Element};
use crate::error::{Error, Result};
use crate::material::Material;
use crate::types::{segment_geometry, ElementId, MaterialId, NodeId, Point2, Vec2};
use nalgebra::{DMatrix, DVector};

/// Two-node planar frame element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Beam2D {
    id: ElementId,
    nodes: [NodeId; 2],
    material: MaterialId,
}

impl Beam2D {
    /// Persisted type tag.
    pub const TAG: &'static str = "Beam2D";

    /// Create a beam between two nodes.
    pub fn new(id: ElementId, nodes: [NodeId; 2], material: MaterialId) -> Self {
        Self { id, nodes, material }
    }

    fn geometry(&self, coords: &[Point2]) -> Result<(f64, f64, f64)> {
        check_coords(self, coords)?;
        let (length, c, s) = segment_geometry(&coords[0], &coords[1]);
        if length <= 0.0 {
            return Err(Error::Element(format!(
                "Beam2D element {} has zero length",
                self.id
            )));
        }
        Ok((length, c, s))
    }

    /// Global-from-local rotation for all six DOFs.
    fn rotation(c: f64, s: f64) -> DMatrix<f64> {
        let mut t = DMatrix::zeros(6, 6);
        for node in 0..2 {
            let o = 3 * node;
            t[(o, o)] = c;
            t[(o, o + 1)] = s;
            t[(o + 1, o)] = -s;
            t[(o + 1, o + 1)] = c;
            t[(o + 2, o + 2)] = 1.0;
        }
        t
    }
}

impl Element for Beam2D {
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
        3
    }

    fn node_ids(&self) -> &[NodeId] {
        &self.nodes
    }

    fn material_id(&self) -> MaterialId {
        self.material
    }

    fn stiffness(&self, coords: &[Point2], material: &dyn Material) -> Result<DMatrix<f64>> {
        let (l, c, s) = self.geometry(coords)?;
        let e = material.require("E")?;
        let ea = e * material.require("A")?;
        let ei = e * material.require("I")?;

        let a = ea / l;
        let b = 12.0 * ei / l.powi(3);
        let m = 6.0 * ei / l.powi(2);
        let d = 4.0 * ei / l;
        let h = 2.0 * ei / l;

        #[rustfmt::skip]
        let k_local = DMatrix::from_row_slice(6, 6, &[
             a,  0.0,  0.0, -a,  0.0,  0.0,
            0.0,  b,    m,  0.0, -b,    m,
            0.0,  m,    d,  0.0, -m,    h,
            -a,  0.0,  0.0,  a,  0.0,  0.0,
            0.0, -b,   -m,  0.0,  b,   -m,
            0.0,  m,    h,  0.0, -m,    d,
        ]);

        let t = Self::rotation(c, s);
        Ok(t.transpose() * k_local * t)
    }

    fn body_force(
        &self,
        acceleration: &Vec2,
        coords: &[Point2],
        material: &dyn Material,
    ) -> Result<DVector<f64>> {
        let (l, c, s) = self.geometry(coords)?;
        let q = material.require("rho")? * material.require("A")?;
        // Distributed load per unit length in element axes.
        let qa = q * (c * acceleration.x + s * acceleration.y);
        let qt = q * (-s * acceleration.x + c * acceleration.y);

        let f_local = DVector::from_column_slice(&[
            qa * l / 2.0,
            qt * l / 2.0,
            qt * l * l / 12.0,
            qa * l / 2.0,
            qt * l / 2.0,
            -qt * l * l / 12.0,
        ]);
        Ok(Self::rotation(c, s).transpose() * f_local)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::test_util::assert_symmetric;
    use crate::load::LoadContribution;
    use crate::material::LinearElastic;
    use approx::assert_relative_eq;

    fn beam() -> Beam2D {
        Beam2D::new(ElementId(0), [NodeId(0), NodeId(1)], MaterialId(0))
    }

    fn material() -> LinearElastic {
        LinearElastic::new(MaterialId(0), 200.0, 0.3)
            .unwrap()
            .with_area(0.5)
            .unwrap()
            .with_moment_of_inertia(0.02)
            .unwrap()
            .with_density(3.0)
            .unwrap()
    }

    #[test]
    fn test_beam2d_horizontal_entries() {
        let coords = [Point2::new(0.0, 0.0), Point2::new(2.0, 0.0)];
        let ke = beam().stiffness(&coords, &material()).unwrap();
        let ei = 200.0 * 0.02;
        assert_relative_eq!(ke[(0, 0)], 200.0 * 0.5 / 2.0, epsilon = 1e-12);
        assert_relative_eq!(ke[(1, 1)], 12.0 * ei / 8.0, epsilon = 1e-12);
        assert_relative_eq!(ke[(1, 2)], 6.0 * ei / 4.0, epsilon = 1e-12);
        assert_relative_eq!(ke[(2, 2)], 4.0 * ei / 2.0, epsilon = 1e-12);
        assert_relative_eq!(ke[(2, 5)], 2.0 * ei / 2.0, epsilon = 1e-12);
        assert_relative_eq!(ke[(0, 1)], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_beam2d_inclined_symmetric() {
        let coords = [Point2::new(1.0, 1.0), Point2::new(-0.5, 3.2)];
        let ke = beam().stiffness(&coords, &material()).unwrap();
        assert_eq!(ke.shape(), (6, 6));
        assert_symmetric(&ke);
    }

    #[test]
    fn test_beam2d_rotation_invariant_axial_stiffness() {
        // A vertical beam carries its axial stiffness on the v DOFs.
        let horizontal = [Point2::new(0.0, 0.0), Point2::new(2.0, 0.0)];
        let vertical = [Point2::new(0.0, 0.0), Point2::new(0.0, 2.0)];
        let kh = beam().stiffness(&horizontal, &material()).unwrap();
        let kv = beam().stiffness(&vertical, &material()).unwrap();
        assert_relative_eq!(kv[(1, 1)], kh[(0, 0)], epsilon = 1e-12);
        assert_relative_eq!(kv[(0, 0)], kh[(1, 1)], epsilon = 1e-12);
        assert_relative_eq!(kv[(2, 2)], kh[(2, 2)], epsilon = 1e-12);
    }

    #[test]
    fn test_beam2d_rigid_body_modes() {
        let coords = [Point2::new(0.0, 0.0), Point2::new(3.0, 4.0)];
        let ke = beam().stiffness(&coords, &material()).unwrap();

        // Rigid rotation about the origin: u = -θy, v = θx, rotation θ.
        let modes = [
            [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0, -4.0, 3.0, 1.0],
        ];
        for mode in modes {
            let f = &ke * DVector::from_column_slice(&mode);
            assert!(f.norm() < 1e-10, "mode {:?} gives force {}", mode, f.norm());
        }
    }

    #[test]
    fn test_beam2d_gravity_consistent_load() {
        let coords = [Point2::new(0.0, 0.0), Point2::new(2.0, 0.0)];
        let fe = beam()
            .load_vector(
                &LoadContribution::BodyForce {
                    acceleration: Vec2::new(0.0, -10.0),
                },
                &coords,
                &material(),
            )
            .unwrap();
        // q = rho * A * g = 3 * 0.5 * -10 = -15 per unit length
        assert_relative_eq!(fe[1], -15.0, epsilon = 1e-12);
        assert_relative_eq!(fe[4], -15.0, epsilon = 1e-12);
        assert_relative_eq!(fe[2], -5.0, epsilon = 1e-12);
        assert_relative_eq!(fe[5], 5.0, epsilon = 1e-12);
        assert_relative_eq!(fe[0], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_beam2d_nodal_moment() {
        let coords = [Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)];
        let force = [0.0, 0.0, 7.0];
        let fe = beam()
            .load_vector(
                &LoadContribution::NodalForce { point: 0, force: &force },
                &coords,
                &material(),
            )
            .unwrap();
        assert_eq!(fe.as_slice(), &[0.0, 0.0, 7.0, 0.0, 0.0, 0.0]);
    }
}
