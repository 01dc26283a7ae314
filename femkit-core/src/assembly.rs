//! Global system assembly.
//!
//! Builds the global stiffness matrix and load vector of a resolved mesh from
//! its element and load contributions. Element stiffness can be evaluated in
//! parallel with Rayon: each worker folds into its own triplet partial and the
//! partials are merged before CSR conversion.

use crate::dof::DofMap;
use crate::error::{Error, Result};
use crate::load::LoadContribution;
use crate::mesh::Mesh;
use crate::sparse::{CsrMatrix, LoadVector, TripletMatrix};
use rayon::prelude::*;
use std::collections::HashMap;

/// Assembled system ready for solving.
#[derive(Debug, Clone)]
pub struct AssembledSystem {
    /// Global stiffness matrix.
    pub stiffness: CsrMatrix,
    /// Right-hand side (load) vector.
    pub rhs: Vec<f64>,
    /// Number of DOFs in the system.
    pub n_dofs: usize,
    /// Constrained DOF indices and their prescribed values.
    pub constraints: HashMap<usize, f64>,
    /// Node to global DOF numbering used for this system.
    pub dof_map: DofMap,
}

/// Assembly options.
#[derive(Debug, Clone)]
pub struct AssemblyOptions {
    /// Evaluate element stiffness matrices in parallel.
    pub parallel: bool,
    /// Number of parallel threads (0 = Rayon's global pool).
    pub n_threads: usize,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            n_threads: 0,
        }
    }
}

impl AssemblyOptions {
    /// Options for single-threaded assembly.
    pub fn serial() -> Self {
        Self {
            parallel: false,
            n_threads: 0,
        }
    }
}

/// Assemble the global stiffness matrix, load vector and constraint set.
///
/// The mesh must be resolved. It is only read, so assembly can be repeated,
/// for example after moving nodes with [`Mesh::set_node_coords`].
///
/// # Example
///
/// ```ignore
/// use femkit_core::assembly::{assemble, AssemblyOptions};
/// use femkit_core::mesh::Mesh;
///
/// let mesh = Mesh::read_file("truss.fem")?;
/// let system = assemble(&mesh, &AssemblyOptions::default())?;
/// assert_eq!(system.rhs.len(), system.n_dofs);
/// ```
pub fn assemble(mesh: &Mesh, options: &AssemblyOptions) -> Result<AssembledSystem> {
    if !mesh.is_resolved() {
        return Err(Error::UnresolvedReference(
            "cannot assemble a mesh whose references are not resolved".into(),
        ));
    }

    let dof_map = DofMap::new(mesh);
    let n_dofs = dof_map.n_dofs();

    let triplets = if options.parallel {
        assemble_stiffness_parallel(mesh, &dof_map, options.n_threads)?
    } else {
        assemble_stiffness_serial(mesh, &dof_map)?
    };
    let stiffness = triplets.to_csr()?;

    let (rhs, constraints) = assemble_loads(mesh, &dof_map)?;

    log::debug!(
        "assembled {} elements and {} loads: {} DOFs, {} non-zeros, {} constraints",
        mesh.n_elements(),
        mesh.n_loads(),
        n_dofs,
        stiffness.nnz(),
        constraints.len()
    );

    Ok(AssembledSystem {
        stiffness,
        rhs: rhs.into_vec(),
        n_dofs,
        constraints,
        dof_map,
    })
}

fn scatter_element(
    mesh: &Mesh,
    dof_map: &DofMap,
    slot: usize,
    triplets: &mut TripletMatrix,
) -> Result<()> {
    let ke = mesh.element_stiffness(slot)?;
    let dofs = dof_map.element_dofs(mesh, slot)?;
    triplets.add_submatrix(&dofs, &ke);
    Ok(())
}

fn nnz_estimate(mesh: &Mesh) -> usize {
    mesh.elements()
        .iter()
        .map(|e| e.n_dofs() * e.n_dofs())
        .sum()
}

fn assemble_stiffness_serial(mesh: &Mesh, dof_map: &DofMap) -> Result<TripletMatrix> {
    let n = dof_map.n_dofs();
    let mut triplets = TripletMatrix::with_capacity(n, n, nnz_estimate(mesh));
    for slot in 0..mesh.n_elements() {
        scatter_element(mesh, dof_map, slot, &mut triplets)?;
    }
    Ok(triplets)
}

fn assemble_stiffness_parallel(
    mesh: &Mesh,
    dof_map: &DofMap,
    n_threads: usize,
) -> Result<TripletMatrix> {
    let n = dof_map.n_dofs();
    let run = || {
        (0..mesh.n_elements())
            .into_par_iter()
            .try_fold(
                || TripletMatrix::new(n, n),
                |mut partial, slot| {
                    scatter_element(mesh, dof_map, slot, &mut partial)?;
                    Ok::<_, Error>(partial)
                },
            )
            .try_reduce(
                || TripletMatrix::new(n, n),
                |mut merged, partial| {
                    merged.append(partial);
                    Ok(merged)
                },
            )
    };

    if n_threads == 0 {
        return run();
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build()
        .map_err(|e| Error::Assembly(format!("failed to build thread pool: {}", e)))?;
    pool.install(run)
}

fn assemble_loads(mesh: &Mesh, dof_map: &DofMap) -> Result<(LoadVector, HashMap<usize, f64>)> {
    let mut rhs = LoadVector::zeros(dof_map.n_dofs());
    let mut constraints = HashMap::new();

    for (slot, load) in mesh.loads().iter().enumerate() {
        let target = mesh.load_target(slot)?;
        let dofs = dof_map.element_dofs(mesh, target)?;

        if let LoadContribution::Constraint { dof, value } = load.contribution() {
            let global = dofs[dof];
            match constraints.insert(global, value) {
                Some(previous) if previous != value => {
                    return Err(Error::Assembly(format!(
                        "DOF {} constrained to both {} and {} (load {})",
                        global,
                        previous,
                        value,
                        load.id()
                    )));
                }
                _ => {}
            }
            continue;
        }

        let fe = mesh.element_load_vector(slot)?;
        rhs.add_subvector(&dofs, fe.as_slice());
    }

    Ok((rhs, constraints))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Bar2D, Beam2D};
    use crate::load::{LoadBc, LoadGravity, LoadNode};
    use crate::material::LinearElastic;
    use crate::mesh::Node;
    use crate::types::{ElementId, LoadId, MaterialId, NodeId, Point2, Vec2};
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    fn bar_chain(xs: &[(f64, f64)]) -> Mesh {
        let mut mesh = Mesh::new();
        for (i, &(x, y)) in xs.iter().enumerate() {
            mesh.add_node(Node::new(NodeId(i as u32), Point2::new(x, y))).unwrap();
        }
        mesh.add_material(Box::new(LinearElastic::new(MaterialId(0), 1.0, 0.0).unwrap())).unwrap();
        for i in 0..xs.len() - 1 {
            let nodes = [NodeId(i as u32), NodeId(i as u32 + 1)];
            let element = Bar2D::new(ElementId(i as u32), nodes, MaterialId(0));
            mesh.add_element(Box::new(element)).unwrap();
        }
        mesh
    }

    fn dense(system: &AssembledSystem) -> DMatrix<f64> {
        DMatrix::from(&system.stiffness)
    }

    #[test]
    fn test_assembly_empty_mesh() {
        let mut mesh = Mesh::new();
        mesh.resolve().unwrap();
        let system = assemble(&mesh, &AssemblyOptions::default()).unwrap();
        assert_eq!(system.n_dofs, 0);
        assert!(system.rhs.is_empty());
        assert!(system.constraints.is_empty());
    }

    #[test]
    fn test_unresolved_mesh_rejected() {
        let mesh = bar_chain(&[(0.0, 0.0), (1.0, 0.0)]);
        assert!(matches!(
            assemble(&mesh, &AssemblyOptions::default()),
            Err(Error::UnresolvedReference(_))
        ));
    }

    #[test]
    fn test_single_bar_assembly() {
        let mut mesh = bar_chain(&[(0.0, 0.0), (1.0, 0.0)]);
        mesh.resolve().unwrap();
        let system = assemble(&mesh, &AssemblyOptions::default()).unwrap();

        assert_eq!(system.n_dofs, 4);
        let expected = DMatrix::from_row_slice(
            4,
            4,
            &[
                1.0, 0.0, -1.0, 0.0, //
                0.0, 0.0, 0.0, 0.0, //
                -1.0, 0.0, 1.0, 0.0, //
                0.0, 0.0, 0.0, 0.0,
            ],
        );
        assert_relative_eq!(dense(&system), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_shared_node_accumulates() {
        // Two collinear unit bars sharing node 1.
        let mut mesh = bar_chain(&[(0.0, 0.0), (1.0, 0.0), (3.0, 0.0)]);
        mesh.resolve().unwrap();
        let system = assemble(&mesh, &AssemblyOptions::serial()).unwrap();
        let k = dense(&system);

        assert_eq!(system.n_dofs, 6);
        // EA/L of 1 and 0.5 meet on the shared x DOF.
        assert_relative_eq!(k[(2, 2)], 1.5, epsilon = 1e-12);
        assert_relative_eq!(k[(0, 2)], -1.0, epsilon = 1e-12);
        assert_relative_eq!(k[(2, 4)], -0.5, epsilon = 1e-12);
        assert_relative_eq!(k[(0, 4)], 0.0);
        assert_relative_eq!(k.clone(), k.transpose(), epsilon = 1e-12);
    }

    #[test]
    fn test_parallel_matches_serial() {
        let mut mesh = bar_chain(&[(0.0, 0.0), (1.0, 0.5), (2.0, 0.0), (3.0, 1.0), (4.0, 0.0)]);
        mesh.resolve().unwrap();
        let serial = assemble(&mesh, &AssemblyOptions::serial()).unwrap();
        let parallel = assemble(&mesh, &AssemblyOptions::default()).unwrap();
        let pinned = assemble(
            &mesh,
            &AssemblyOptions {
                parallel: true,
                n_threads: 2,
            },
        )
        .unwrap();

        assert_eq!(serial.dof_map, parallel.dof_map);
        assert_relative_eq!(dense(&serial), dense(&parallel), epsilon = 1e-12);
        assert_relative_eq!(dense(&serial), dense(&pinned), epsilon = 1e-12);
    }

    #[test]
    fn test_reassembly_is_repeatable() {
        let mut mesh = bar_chain(&[(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)]);
        mesh.resolve().unwrap();
        let first = assemble(&mesh, &AssemblyOptions::serial()).unwrap();
        let second = assemble(&mesh, &AssemblyOptions::serial()).unwrap();
        assert_eq!(first.dof_map, second.dof_map);
        assert_eq!(dense(&first), dense(&second));

        // Moving a node changes K without re-resolving.
        mesh.set_node_coords(NodeId(2), Point2::new(3.0, 0.0)).unwrap();
        let moved = assemble(&mesh, &AssemblyOptions::serial()).unwrap();
        assert_ne!(dense(&first), dense(&moved));
    }

    #[test]
    fn test_loads_and_constraints_placed() {
        let mut mesh = bar_chain(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        let load = LoadNode::new(LoadId(0), ElementId(1), 1, vec![5.0, -2.0]);
        mesh.add_load(Box::new(load)).unwrap();
        mesh.add_load(Box::new(LoadBc::new(LoadId(1), ElementId(0), 0, 0.0))).unwrap();
        mesh.add_load(Box::new(LoadBc::new(LoadId(2), ElementId(0), 1, 0.25))).unwrap();
        mesh.resolve().unwrap();

        let system = assemble(&mesh, &AssemblyOptions::default()).unwrap();
        assert_eq!(system.rhs, vec![0.0, 0.0, 0.0, 0.0, 5.0, -2.0]);
        assert_eq!(system.constraints.len(), 2);
        assert_eq!(system.constraints[&0], 0.0);
        assert_eq!(system.constraints[&1], 0.25);
    }

    #[test]
    fn test_conflicting_constraints_rejected() {
        let mut mesh = bar_chain(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        // Local DOF 2 of element 0 and local DOF 0 of element 1 are both node 1 x.
        mesh.add_load(Box::new(LoadBc::new(LoadId(0), ElementId(0), 2, 0.0))).unwrap();
        mesh.add_load(Box::new(LoadBc::new(LoadId(1), ElementId(1), 0, 1.0))).unwrap();
        mesh.resolve().unwrap();
        assert!(matches!(
            assemble(&mesh, &AssemblyOptions::default()),
            Err(Error::Assembly(_))
        ));
    }

    #[test]
    fn test_mixed_arity_gravity() {
        // A beam and a bar share node 1, which therefore carries a rotation.
        let mut mesh = bar_chain(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        mesh.add_material(Box::new(
            LinearElastic::new(MaterialId(1), 1.0, 0.0)
                .unwrap()
                .with_density(2.0)
                .unwrap(),
        ))
        .unwrap();
        mesh.add_element(Box::new(Beam2D::new(
            ElementId(5),
            [NodeId(1), NodeId(2)],
            MaterialId(1),
        )))
        .unwrap();
        let load = LoadGravity::new(LoadId(0), ElementId(5), Vec2::new(0.0, -1.0));
        mesh.add_load(Box::new(load)).unwrap();
        mesh.resolve().unwrap();

        let system = assemble(&mesh, &AssemblyOptions::default()).unwrap();
        assert_eq!(system.dof_map.node_dofs(1), Some(2..5));
        assert_eq!(system.n_dofs, 8);
        // Total vertical load equals the beam weight rho * A * L * g.
        let fy = system.rhs[3] + system.rhs[6];
        assert_relative_eq!(fy, -2.0, epsilon = 1e-12);
    }
}
