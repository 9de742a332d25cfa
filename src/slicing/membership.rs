//! Slice membership matrices.
//!
//! Membership arrives sparse (`examples × slices`, ones only) and is
//! densified before labels are built.

use crate::error::{Error, Result};
use crate::slicing::naming::BASE_SLICE;
use ndarray::{concatenate, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Largest dense membership matrix accepted, counting the base column.
pub const MAX_MEMBERSHIP_CELLS: usize = 1 << 30;

/// Compressed sparse row boolean matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrMatrix {
    n_rows: usize,
    n_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
}

impl CsrMatrix {
    /// Build from the `(row, col)` coordinates of the set entries.
    ///
    /// Repeated coordinates collapse into one entry. The shape is checked
    /// against [`MAX_MEMBERSHIP_CELLS`] before anything is allocated.
    pub fn from_coords(n_rows: usize, n_cols: usize, coords: &[(usize, usize)]) -> Result<Self> {
        let cells = n_cols
            .checked_add(1)
            .and_then(|cols| n_rows.checked_mul(cols))
            .filter(|&cells| cells <= MAX_MEMBERSHIP_CELLS);
        if cells.is_none() {
            return Err(Error::Validation(format!(
                "Membership of {}x{} exceeds {} cells",
                n_rows, n_cols, MAX_MEMBERSHIP_CELLS
            )));
        }
        if let Some(&(row, col)) = coords.iter().find(|&&(r, c)| r >= n_rows || c >= n_cols) {
            return Err(Error::Validation(format!(
                "Entry ({}, {}) is outside a {}x{} matrix",
                row, col, n_rows, n_cols
            )));
        }

        let mut sorted = coords.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut indptr = vec![0; n_rows + 1];
        for &(row, _) in &sorted {
            indptr[row + 1] += 1;
        }
        for row in 0..n_rows {
            indptr[row + 1] += indptr[row];
        }

        Ok(Self {
            n_rows,
            n_cols,
            indptr,
            indices: sorted.into_iter().map(|(_, col)| col).collect(),
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    /// Number of set entries.
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Column indices set in `row`.
    pub fn row(&self, row: usize) -> &[usize] {
        if row >= self.n_rows {
            return &[];
        }
        &self.indices[self.indptr[row]..self.indptr[row + 1]]
    }

    pub fn to_dense(&self) -> Array2<u8> {
        let mut dense = Array2::zeros((self.n_rows, self.n_cols));
        for row in 0..self.n_rows {
            for &col in self.row(row) {
                dense[[row, col]] = 1;
            }
        }
        dense
    }
}

/// Dense membership matrix with one named column per slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceMembership {
    names: Vec<String>,
    matrix: Array2<u8>,
}

impl SliceMembership {
    /// Wrap a dense matrix. Shapes are checked by [`Self::with_base_slice`].
    pub fn from_dense(matrix: Array2<u8>, names: Vec<String>) -> Self {
        Self { names, matrix }
    }

    pub fn from_sparse(matrix: &CsrMatrix, names: Vec<String>) -> Self {
        Self::from_dense(matrix.to_dense(), names)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn matrix(&self) -> &Array2<u8> {
        &self.matrix
    }

    pub fn num_examples(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn num_slices(&self) -> usize {
        self.names.len()
    }

    pub fn column(&self, slice: usize) -> ArrayView1<'_, u8> {
        self.matrix.column(slice)
    }

    /// Append an all-ones `base` column unless one is already named,
    /// then require exactly one column per name.
    pub fn with_base_slice(self) -> Result<Self> {
        let Self {
            mut names,
            mut matrix,
        } = self;

        if !names.iter().any(|n| n == BASE_SLICE) {
            let ones = Array2::<u8>::ones((matrix.nrows(), 1));
            let extended = concatenate(Axis(1), &[matrix.view(), ones.view()]).map_err(|e| {
                Error::Validation(format!("Cannot append base slice column: {}", e))
            })?;
            matrix = extended;
            names.push(BASE_SLICE.to_string());
        }

        if matrix.ncols() != names.len() {
            return Err(Error::ShapeMismatch {
                context: "slice label columns".to_string(),
                expected: names.len(),
                found: matrix.ncols(),
            });
        }

        Ok(Self { names, matrix })
    }

    /// Reject entries other than 0 and 1.
    pub fn ensure_binary(&self) -> Result<()> {
        match self.matrix.indexed_iter().find(|(_, v)| **v > 1) {
            Some(((row, col), value)) => Err(Error::Validation(format!(
                "Membership value {} at ({}, {}) is not 0 or 1",
                value, row, col
            ))),
            None => Ok(()),
        }
    }
}
