//! femkit core: a small linear finite element kernel for planar structures.
//!
//! - Element library: 2D bars, Euler–Bernoulli beams and constant strain triangles
//! - Plain-text mesh persistence with a tag-driven type registry
//! - Parallel assembly using Rayon
//! - Sparse matrix operations (CSR format)
//! - Direct and iterative linear solvers
//!
//! # Architecture
//!
//! The kernel is designed around these core abstractions:
//!
//! - [`Element`] trait: local stiffness and load vectors from nodal coordinates
//! - [`Material`] and [`Load`] traits: the data elements consume
//! - [`Mesh`]: owns nodes, materials, elements and loads, resolves identities
//! - [`Registry`]: maps persisted type tags to constructors
//! - [`assemble`]: global stiffness, load vector and constraints
//! - [`Solver`] trait: linear system solution strategies
//!
//! # Example
//!
//! ```ignore
//! use femkit_core::{assemble, AssemblyOptions, Mesh};
//! use femkit_core::solver::{solve_system, FaerCholeskySolver};
//!
//! let mesh = Mesh::read_file("truss.fem")?;
//! let system = assemble(&mesh, &AssemblyOptions::default())?;
//! let displacements = solve_system(&system, &FaerCholeskySolver::new())?;
//! ```

pub mod assembly;
pub mod codec;
pub mod dof;
pub mod draw;
pub mod element;
pub mod error;
pub mod load;
pub mod material;
pub mod mesh;
pub mod node;
pub mod registry;
pub mod solver;
pub mod sparse;
pub mod types;

pub use assembly::{assemble, AssembledSystem, AssemblyOptions};
pub use codec::{MeshReader, MeshWriter};
pub use dof::DofMap;
pub use element::{Bar2D, Beam2D, Element, Tri3};
pub use error::{Error, Result};
pub use load::{Load, LoadBc, LoadContribution, LoadGravity, LoadNode};
pub use material::{LinearElastic, Material};
pub use mesh::Mesh;
pub use node::Node;
pub use registry::Registry;
pub use solver::{solve_system, Solver, SolverConfig, SolverType};
pub use sparse::CsrMatrix;
pub use types::{ElementId, LoadId, MaterialId, NodeId, Point2, Vec2};
