//! Dense `ndarray` matrices to Clarabel's compressed sparse column format.

use clarabel::algebra::CscMatrix;
use ndarray::Array2;

/// Converts a dense matrix to CSC, keeping every entry that is not exactly
/// zero.
///
/// Values are stored column by column with ascending row indices, and
/// `colptr[j]..colptr[j + 1]` spans column `j`.
pub fn dense_to_csc(dense: &Array2<f64>) -> CscMatrix<f64> {
    compress(dense, |_, _| true)
}

/// Converts a symmetric dense matrix to CSC keeping only the upper triangle
/// (`row <= col`), which is the half Clarabel reads for the kernel.
pub fn dense_to_csc_upper_tri(dense: &Array2<f64>) -> CscMatrix<f64> {
    compress(dense, |row, col| row <= col)
}

fn compress(dense: &Array2<f64>, keep: impl Fn(usize, usize) -> bool) -> CscMatrix<f64> {
    let (nrows, ncols) = dense.dim();
    let mut colptr = Vec::with_capacity(ncols + 1);
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();

    colptr.push(0);
    for (col, column) in dense.columns().into_iter().enumerate() {
        for (row, &val) in column.iter().enumerate() {
            if val != 0.0 && keep(row, col) {
                rowval.push(row);
                nzval.push(val);
            }
        }
        colptr.push(rowval.len());
    }

    CscMatrix::new(nrows, ncols, colptr, rowval, nzval)
}
