//! Sparse matrix operations.
//!
//! The global stiffness matrix is accumulated as COO triplets and converted
//! to CSR (Compressed Sparse Row) once all elements are in. The load vector
//! is dense.

use crate::error::{Error, Result};
use nalgebra::DMatrix;
use nalgebra_sparse::coo::CooMatrix;
use nalgebra_sparse::csr::CsrMatrix as NalgebraCsr;

/// Compressed Sparse Row matrix.
pub type CsrMatrix = NalgebraCsr<f64>;

/// COO accumulator for the global stiffness matrix.
///
/// Entries at the same (row, col) are summed when converting to CSR, which is
/// what makes element contributions on shared nodes accumulate. Exact zeros
/// are skipped; every other value is kept, however small.
#[derive(Debug, Clone)]
pub struct TripletMatrix {
    n_rows: usize,
    n_cols: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<f64>,
}

impl TripletMatrix {
    /// Create an empty accumulator.
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        Self::with_capacity(n_rows, n_cols, 0)
    }

    /// Create with estimated capacity.
    pub fn with_capacity(n_rows: usize, n_cols: usize, nnz_estimate: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            rows: Vec::with_capacity(nnz_estimate),
            cols: Vec::with_capacity(nnz_estimate),
            values: Vec::with_capacity(nnz_estimate),
        }
    }

    /// Add a value at (row, col).
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row < self.n_rows, "Row index out of bounds");
        debug_assert!(col < self.n_cols, "Column index out of bounds");

        if value != 0.0 {
            self.rows.push(row);
            self.cols.push(col);
            self.values.push(value);
        }
    }

    /// Scatter a dense element matrix into the global positions `dofs`.
    pub fn add_submatrix(&mut self, dofs: &[usize], local: &DMatrix<f64>) {
        debug_assert_eq!(local.nrows(), dofs.len());
        debug_assert_eq!(local.ncols(), dofs.len());

        for (j, &col) in dofs.iter().enumerate() {
            for (i, &row) in dofs.iter().enumerate() {
                self.add(row, col, local[(i, j)]);
            }
        }
    }

    /// Move every triplet of `other` into this accumulator.
    ///
    /// Used to merge per-thread partial assemblies.
    pub fn append(&mut self, mut other: TripletMatrix) {
        debug_assert_eq!((self.n_rows, self.n_cols), (other.n_rows, other.n_cols));
        self.rows.append(&mut other.rows);
        self.cols.append(&mut other.cols);
        self.values.append(&mut other.values);
    }

    /// Number of stored triplets.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Convert to CSR format, summing duplicate entries.
    pub fn to_csr(self) -> Result<CsrMatrix> {
        let coo = CooMatrix::try_from_triplets(
            self.n_rows,
            self.n_cols,
            self.rows,
            self.cols,
            self.values,
        )
        .map_err(|e| Error::Assembly(format!("invalid triplet data: {}", e)))?;

        Ok(CsrMatrix::from(&coo))
    }
}

/// Dense accumulator for the global load vector.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadVector {
    values: Vec<f64>,
}

impl LoadVector {
    /// Create a zero vector of given size.
    pub fn zeros(size: usize) -> Self {
        Self {
            values: vec![0.0; size],
        }
    }

    /// Add element load values at their global indices.
    pub fn add_subvector(&mut self, indices: &[usize], values: &[f64]) {
        debug_assert_eq!(indices.len(), values.len());
        for (&idx, &val) in indices.iter().zip(values) {
            self.values[idx] += val;
        }
    }

    /// Get the underlying dense vector.
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Consume and return the dense vector.
    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }
}
