//! Linear system solvers.
//!
//! Solves the assembled system Ku = f behind the narrow [`Solver`] trait.
//! [`solve_system`] applies the prescribed DOF values of an
//! [`AssembledSystem`] first and hands the reduced problem to a solver.
//!
//! # Solver Backends
//!
//! - [`FaerCholeskySolver`]: Sparse Cholesky factorization using the faer library.
//!   Stiffness matrices are symmetric positive definite once enough DOFs are
//!   constrained to remove rigid-body motion.
//! - [`CachedCholeskySolver`]: The same, reusing the symbolic analysis across
//!   solves with one sparsity pattern.
//! - [`ConjugateGradientSolver`]: Jacobi-preconditioned conjugate gradients.
//! - [`DenseLUSolver`]: nalgebra dense LU, for small problems and tests.

use crate::assembly::AssembledSystem;
use crate::error::{Error, Result};
use crate::sparse::{CsrMatrix, TripletMatrix};
use faer::linalg::cholesky::llt::factor::LltError;
use faer::linalg::solvers::Solve;
use faer::sparse::linalg::solvers::{Llt, SymbolicLlt};
use faer::sparse::linalg::LltError as SparseLltError;
use faer::sparse::{SparseColMat, SymbolicSparseColMat};
use rayon::prelude::*;

/// Linear solver interface.
pub trait Solver: Send + Sync {
    /// Solve the linear system Ax = b.
    ///
    /// # Arguments
    ///
    /// * `matrix` - System matrix (K)
    /// * `rhs` - Right-hand side vector (f)
    ///
    /// # Returns
    ///
    /// Solution vector (u)
    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64]) -> Result<Vec<f64>>;

    /// Solver name for diagnostics.
    fn name(&self) -> &str;
}

/// Solver selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverType {
    /// Sparse Cholesky.
    Direct,
    /// Preconditioned conjugate gradients.
    Iterative,
    /// Direct below `auto_threshold` DOFs, iterative from there on.
    #[default]
    Auto,
}

/// Solver configuration.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Solver type to use.
    pub solver_type: SolverType,
    /// Relative residual tolerance for iterative solvers.
    pub tolerance: f64,
    /// Maximum iterations for iterative solvers.
    pub max_iterations: usize,
    /// Problem size threshold for auto-selection (direct below, iterative above).
    pub auto_threshold: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            solver_type: SolverType::Auto,
            tolerance: 1e-10,
            max_iterations: 10000,
            auto_threshold: 100_000,
        }
    }
}

fn check_dimensions(matrix: &CsrMatrix, rhs: &[f64]) -> Result<()> {
    if matrix.nrows() != matrix.ncols() {
        return Err(Error::Solver(format!(
            "matrix must be square, got {}x{}",
            matrix.nrows(),
            matrix.ncols()
        )));
    }
    if matrix.nrows() != rhs.len() {
        return Err(Error::Solver(format!(
            "RHS size mismatch: {} rows, {} values",
            matrix.nrows(),
            rhs.len()
        )));
    }
    Ok(())
}

/// Direct solver using nalgebra dense LU factorization.
///
/// Converts the matrix to dense storage, so it is only suitable for small
/// systems. Unlike the Cholesky solvers it does not require symmetry.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenseLUSolver;

impl DenseLUSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Solver for DenseLUSolver {
    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64]) -> Result<Vec<f64>> {
        use nalgebra::{DMatrix, DVector};

        check_dimensions(matrix, rhs)?;
        if rhs.is_empty() {
            return Ok(vec![]);
        }

        let dense = DMatrix::from(matrix);
        let b = DVector::from_column_slice(rhs);

        let solution = dense
            .lu()
            .solve(&b)
            .ok_or_else(|| Error::SingularMatrix("LU factorization failed".into()))?;

        Ok(solution.as_slice().to_vec())
    }

    fn name(&self) -> &str {
        "Dense LU"
    }
}

/// Convert a CSR matrix to faer's CSC format.
///
/// Each CSR row is scattered into the columns it touches. Rows are visited in
/// increasing order, so row indices come out sorted within every column.
fn csr_to_faer_csc(csr: &CsrMatrix) -> SparseColMat<usize, f64> {
    let nrows = csr.nrows();
    let ncols = csr.ncols();
    let row_offsets = csr.row_offsets();
    let col_indices = csr.col_indices();
    let values = csr.values();

    let mut col_offsets = vec![0usize; ncols + 1];
    for &col in col_indices {
        col_offsets[col + 1] += 1;
    }
    for i in 0..ncols {
        col_offsets[i + 1] += col_offsets[i];
    }

    let nnz = values.len();
    let mut csc_row_indices = vec![0usize; nnz];
    let mut csc_values = vec![0.0f64; nnz];
    let mut next = col_offsets[..ncols].to_vec();

    for row in 0..nrows {
        for idx in row_offsets[row]..row_offsets[row + 1] {
            let col = col_indices[idx];
            let pos = next[col];
            csc_row_indices[pos] = row;
            csc_values[pos] = values[idx];
            next[col] += 1;
        }
    }

    // SAFETY: offsets are non-decreasing and end at nnz, and row indices are
    // in bounds and sorted within each column.
    unsafe {
        SparseColMat::new(
            SymbolicSparseColMat::new_unchecked(nrows, ncols, col_offsets, None, csc_row_indices),
            csc_values,
        )
    }
}

fn llt_error(e: SparseLltError) -> Error {
    match e {
        SparseLltError::Generic(err) => Error::Solver(format!("sparse Cholesky error: {:?}", err)),
        SparseLltError::Numeric(LltError::NonPositivePivot { index }) => Error::SingularMatrix(
            format!("matrix is not positive definite at pivot {}", index),
        ),
    }
}

fn symbolic_llt(csc: &SparseColMat<usize, f64>) -> Result<SymbolicLlt<usize>> {
    SymbolicLlt::try_new(csc.as_ref().symbolic(), faer::Side::Lower)
        .map_err(|_| Error::Solver("symbolic Cholesky analysis failed".into()))
}

fn llt_solve(
    symbolic: SymbolicLlt<usize>,
    csc: &SparseColMat<usize, f64>,
    rhs: &[f64],
) -> Result<Vec<f64>> {
    let llt = Llt::try_new_with_symbolic(symbolic, csc.as_ref(), faer::Side::Lower)
        .map_err(llt_error)?;

    let n = rhs.len();
    let mut x = faer::Mat::from_fn(n, 1, |i, _| rhs[i]);
    llt.solve_in_place(x.as_mut());
    Ok((0..n).map(|i| x[(i, 0)]).collect())
}

/// Sparse Cholesky solver using the faer library.
///
/// Uses faer's sparse LLᵀ factorization. Only the lower triangle is read, so
/// the matrix is assumed symmetric.
///
/// # Example
///
/// ```ignore
/// let solver = FaerCholeskySolver::new();
/// let solution = solver.solve(&stiffness_matrix, &force_vector)?;
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FaerCholeskySolver;

impl FaerCholeskySolver {
    /// Create a new sparse Cholesky solver.
    pub fn new() -> Self {
        Self
    }
}

impl Solver for FaerCholeskySolver {
    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64]) -> Result<Vec<f64>> {
        check_dimensions(matrix, rhs)?;
        if rhs.is_empty() {
            return Ok(vec![]);
        }

        let csc = csr_to_faer_csc(matrix);
        let symbolic = symbolic_llt(&csc)?;
        llt_solve(symbolic, &csc, rhs)
    }

    fn name(&self) -> &str {
        "faer Sparse Cholesky (LLᵀ)"
    }
}

/// Sparse Cholesky solver with cached symbolic factorization.
///
/// Re-assembling after [`Mesh::set_node_coords`](crate::mesh::Mesh::set_node_coords)
/// keeps the sparsity pattern, so the symbolic analysis can be done once and
/// reused for every subsequent solve.
#[derive(Default)]
pub struct CachedCholeskySolver {
    symbolic: Option<SymbolicLlt<usize>>,
}

impl CachedCholeskySolver {
    /// Create a new cached Cholesky solver.
    pub fn new() -> Self {
        Self { symbolic: None }
    }

    /// Perform symbolic analysis on the matrix sparsity pattern.
    pub fn analyze(&mut self, matrix: &CsrMatrix) -> Result<()> {
        let csc = csr_to_faer_csc(matrix);
        self.symbolic = Some(symbolic_llt(&csc)?);
        Ok(())
    }

    /// Whether a symbolic factorization is cached.
    pub fn is_analyzed(&self) -> bool {
        self.symbolic.is_some()
    }

    /// Solve using the cached symbolic factorization.
    ///
    /// The matrix must have the same sparsity pattern as the one used for `analyze`.
    pub fn solve_with_cached_symbolic(&self, matrix: &CsrMatrix, rhs: &[f64]) -> Result<Vec<f64>> {
        let symbolic = self.symbolic.as_ref().ok_or_else(|| {
            Error::Solver("no cached symbolic factorization, call analyze() first".into())
        })?;

        check_dimensions(matrix, rhs)?;
        if rhs.is_empty() {
            return Ok(vec![]);
        }

        let csc = csr_to_faer_csc(matrix);
        llt_solve(symbolic.clone(), &csc, rhs)
    }
}

impl Solver for CachedCholeskySolver {
    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64]) -> Result<Vec<f64>> {
        if self.is_analyzed() {
            self.solve_with_cached_symbolic(matrix, rhs)
        } else {
            FaerCholeskySolver::new().solve(matrix, rhs)
        }
    }

    fn name(&self) -> &str {
        "faer Sparse Cholesky (cached)"
    }
}

/// Conjugate gradient solver with a Jacobi (diagonal) preconditioner.
///
/// Requires a symmetric positive definite matrix. Matrix-vector products run
/// row-parallel on the Rayon pool.
#[derive(Debug, Clone)]
pub struct ConjugateGradientSolver {
    /// Convergence threshold on ||r|| / ||b||.
    pub tolerance: f64,
    /// Iteration limit.
    pub max_iterations: usize,
}

impl Default for ConjugateGradientSolver {
    fn default() -> Self {
        let config = SolverConfig::default();
        Self::new(config.tolerance, config.max_iterations)
    }
}

impl ConjugateGradientSolver {
    /// Create a solver with the given tolerance and iteration limit.
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }
}

fn multiply(matrix: &CsrMatrix, x: &[f64], y: &mut [f64]) {
    y.par_iter_mut().enumerate().for_each(|(i, yi)| {
        let row = matrix.row(i);
        *yi = row
            .col_indices()
            .iter()
            .zip(row.values())
            .map(|(&j, &a)| a * x[j])
            .sum();
    });
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.par_iter().zip(b).map(|(x, y)| x * y).sum()
}

impl Solver for ConjugateGradientSolver {
    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64]) -> Result<Vec<f64>> {
        check_dimensions(matrix, rhs)?;
        let n = rhs.len();

        let mut inv_diag = vec![0.0; n];
        for (i, j, &v) in matrix.triplet_iter() {
            if i == j {
                inv_diag[i] += v;
            }
        }
        for (i, d) in inv_diag.iter_mut().enumerate() {
            if *d <= 0.0 {
                return Err(Error::SingularMatrix(format!(
                    "non-positive diagonal entry {} at row {}",
                    d, i
                )));
            }
            *d = 1.0 / *d;
        }

        let b_norm = dot(rhs, rhs).sqrt();
        let mut x = vec![0.0; n];
        if b_norm == 0.0 {
            return Ok(x);
        }

        let mut r = rhs.to_vec();
        let mut z: Vec<f64> = r.iter().zip(&inv_diag).map(|(r, m)| r * m).collect();
        let mut p = z.clone();
        let mut ap = vec![0.0; n];
        let mut rz = dot(&r, &z);

        for iteration in 0..self.max_iterations {
            multiply(matrix, &p, &mut ap);
            let pap = dot(&p, &ap);
            if pap <= 0.0 {
                return Err(Error::SingularMatrix(format!(
                    "matrix is not positive definite (pAp = {:e} at iteration {})",
                    pap, iteration
                )));
            }

            let alpha = rz / pap;
            for i in 0..n {
                x[i] += alpha * p[i];
                r[i] -= alpha * ap[i];
            }

            let residual = dot(&r, &r).sqrt() / b_norm;
            if residual <= self.tolerance {
                log::debug!(
                    "conjugate gradients converged in {} iterations (residual {:e})",
                    iteration + 1,
                    residual
                );
                return Ok(x);
            }

            for i in 0..n {
                z[i] = r[i] * inv_diag[i];
            }
            let rz_next = dot(&r, &z);
            let beta = rz_next / rz;
            rz = rz_next;
            for i in 0..n {
                p[i] = z[i] + beta * p[i];
            }
        }

        Err(Error::Solver(format!(
            "conjugate gradients did not converge in {} iterations",
            self.max_iterations
        )))
    }

    fn name(&self) -> &str {
        "Conjugate Gradient (Jacobi)"
    }
}

/// Select solver based on configuration and problem size.
pub fn select_solver(config: &SolverConfig, n_dofs: usize) -> Box<dyn Solver> {
    let iterative = || -> Box<dyn Solver> {
        Box::new(ConjugateGradientSolver::new(
            config.tolerance,
            config.max_iterations,
        ))
    };
    match config.solver_type {
        SolverType::Direct => Box::new(FaerCholeskySolver::new()),
        SolverType::Iterative => iterative(),
        SolverType::Auto if n_dofs < config.auto_threshold => Box::new(FaerCholeskySolver::new()),
        SolverType::Auto => iterative(),
    }
}

/// Eliminate the prescribed DOFs of `system`.
///
/// Returns a matrix and load vector of the same size in which every
/// constrained row and column is replaced by the identity and the known
/// values are moved to the right-hand side. Symmetry is preserved, and the
/// solution holds the prescribed value at every constrained DOF.
pub fn apply_constraints(system: &AssembledSystem) -> Result<(CsrMatrix, Vec<f64>)> {
    let n = system.n_dofs;
    if let Some(&dof) = system.constraints.keys().find(|&&dof| dof >= n) {
        return Err(Error::Solver(format!(
            "constraint on DOF {} outside a system of {} DOFs",
            dof, n
        )));
    }

    let mut rhs = system.rhs.clone();
    let mut triplets = TripletMatrix::with_capacity(n, n, system.stiffness.nnz());

    for (i, j, &v) in system.stiffness.triplet_iter() {
        match (system.constraints.get(&i), system.constraints.get(&j)) {
            (None, None) => triplets.add(i, j, v),
            (None, Some(&value)) => rhs[i] -= v * value,
            _ => {}
        }
    }
    for (&dof, &value) in &system.constraints {
        triplets.add(dof, dof, 1.0);
        rhs[dof] = value;
    }

    Ok((triplets.to_csr()?, rhs))
}

/// Apply constraints and solve the system, returning the global displacement vector.
pub fn solve_system(system: &AssembledSystem, solver: &dyn Solver) -> Result<Vec<f64>> {
    let (matrix, rhs) = apply_constraints(system)?;
    log::debug!(
        "solving {} DOFs ({} constrained) with {}",
        system.n_dofs,
        system.constraints.len(),
        solver.name()
    );
    solver.solve(&matrix, &rhs)
}
