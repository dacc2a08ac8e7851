//! Affine constraints `lower <= A z <= upper` of the finite-element QP.
//!
//! Rows are emitted in a fixed order and never permuted, since the bound
//! vectors are positional:
//!
//! 1. jerk rows, `n - 1`
//! 2. first derivative continuity rows, `n - 1`
//! 3. value continuity rows, `n - 1`
//! 4. initial state rows, `3`
//! 5. range rows, one per variable, `3n`

use ndarray::{Array1, Array2};
use tracing::debug;

use crate::core::error::FemError;
use crate::core::params::FemParams;

/// Symmetric range applied to derivative and second derivative coordinates
/// that have no explicit bounds.
pub const DERIVATIVE_SENTINEL_BOUND: f64 = 2.0;

/// Dense constraint matrix with its per-row bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct AffineConstraint {
    /// `R x 3n` coefficient matrix.
    pub matrix: Array2<f64>,
    /// Row lower bounds (length `R`).
    pub lower: Array1<f64>,
    /// Row upper bounds (length `R`).
    pub upper: Array1<f64>,
}

impl AffineConstraint {
    pub fn num_rows(&self) -> usize {
        self.matrix.nrows()
    }

    /// A row is an equality iff its bounds coincide.
    pub fn is_equality(&self, row: usize) -> bool {
        self.lower[row] == self.upper[row]
    }
}

/// Number of constraint rows for `num_samples` samples:
/// `3n` range rows, `3(n - 1)` continuity rows and `3` initial rows.
pub fn constraint_row_count(num_samples: usize) -> usize {
    3 * num_samples + 3 * num_samples.saturating_sub(1) + 3
}

/// Builds the affine constraint of the smoothing problem.
///
/// With `p_i`, `v_i`, `a_i` the value, first and second derivative at sample
/// `i` and `ds` the spacing:
/// * jerk: `-J ds <= a_{i+1} - a_i <= J ds`
/// * derivative continuity: `v_{i+1} - v_i - ds/2 (a_i + a_{i+1}) = 0`
/// * value continuity: `p_{i+1} - p_i - ds v_i - ds^2/3 a_i - ds^2/6 a_{i+1} = 0`
/// * initial state: `p_0`, `v_0`, `a_0` pinned to the initial state
/// * range: every coordinate within its bounds; value coordinates use the
///   caller's bounds, derivative coordinates use explicit bounds if set and
///   `±DERIVATIVE_SENTINEL_BOUND` otherwise.
///
/// # Returns
/// `FemError::RowCountMismatch` if the emitted rows do not add up to
/// [`constraint_row_count`].
pub fn build_affine_constraint(params: &FemParams) -> Result<AffineConstraint, FemError> {
    let layout = params.layout();
    let n = layout.num_samples();
    let num_rows = constraint_row_count(n);
    let ds = params.delta_s();
    let max_jerk_step = params.max_x_third_order_derivative() * ds;

    let mut matrix = Array2::zeros((num_rows, layout.num_variables()));
    let mut lower = Array1::zeros(num_rows);
    let mut upper = Array1::zeros(num_rows);
    let mut row = 0;

    // a_{i+1} - a_i
    for i in 0..n.saturating_sub(1) {
        matrix[[row, layout.second_derivative(i)]] = -1.0;
        matrix[[row, layout.second_derivative(i + 1)]] = 1.0;
        lower[row] = -max_jerk_step;
        upper[row] = max_jerk_step;
        row += 1;
    }

    // v_{i+1} - v_i - 0.5 ds (a_i + a_{i+1})
    for i in 0..n.saturating_sub(1) {
        matrix[[row, layout.derivative(i)]] = -1.0;
        matrix[[row, layout.derivative(i + 1)]] = 1.0;
        matrix[[row, layout.second_derivative(i)]] = -0.5 * ds;
        matrix[[row, layout.second_derivative(i + 1)]] = -0.5 * ds;
        row += 1;
    }

    // p_{i+1} - p_i - ds v_i - ds^2/3 a_i - ds^2/6 a_{i+1}
    for i in 0..n.saturating_sub(1) {
        matrix[[row, layout.position(i)]] = -1.0;
        matrix[[row, layout.position(i + 1)]] = 1.0;
        matrix[[row, layout.derivative(i)]] = -ds;
        matrix[[row, layout.second_derivative(i)]] = -ds * ds / 3.0;
        matrix[[row, layout.second_derivative(i + 1)]] = -ds * ds / 6.0;
        row += 1;
    }

    let init = params.x_init();
    for (col, value) in [
        (layout.position(0), init.x),
        (layout.derivative(0), init.x_derivative),
        (layout.second_derivative(0), init.x_second_order_derivative),
    ] {
        matrix[[row, col]] = 1.0;
        lower[row] = value;
        upper[row] = value;
        row += 1;
    }

    let sentinel = (-DERIVATIVE_SENTINEL_BOUND, DERIVATIVE_SENTINEL_BOUND);
    let derivative_bound = |bounds: Option<&[(f64, f64)]>, i: usize| {
        bounds.map_or(sentinel, |b| b[i])
    };
    for col in 0..layout.num_variables() {
        let (lo, hi) = if col < n {
            params.x_bounds()[col]
        } else if col < 2 * n {
            derivative_bound(params.x_derivative_bounds(), col - n)
        } else {
            derivative_bound(params.x_second_order_derivative_bounds(), col - 2 * n)
        };
        matrix[[row, col]] = 1.0;
        lower[row] = lo;
        upper[row] = hi;
        row += 1;
    }

    if row != num_rows {
        return Err(FemError::RowCountMismatch {
            built: row,
            expected: num_rows,
        });
    }
    debug!(
        samples = n,
        rows = num_rows,
        cols = layout.num_variables(),
        "built affine constraint"
    );

    Ok(AffineConstraint {
        matrix,
        lower,
        upper,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::params::{FemWeights, InitialState};
    use approx::assert_relative_eq;

    fn params(n: usize, ds: f64, init: InitialState, max_jerk: f64) -> FemParams {
        FemParams::new(
            vec![(-1.0, 1.0); n],
            init,
            ds,
            FemWeights::new(1.0, 1.0, 1.0, 1.0),
            max_jerk,
        )
        .unwrap()
    }

    #[test]
    fn test_row_count_formula() {
        assert_eq!(constraint_row_count(1), 6);
        assert_eq!(constraint_row_count(2), 12);
        assert_eq!(constraint_row_count(10), 60);
    }

    #[test]
    fn test_dimensions() {
        for n in [1, 2, 3, 7, 20] {
            let c = build_affine_constraint(&params(n, 0.5, InitialState::default(), 1.0)).unwrap();
            assert_eq!(c.matrix.dim(), (constraint_row_count(n), 3 * n));
            assert_eq!(c.lower.len(), c.num_rows());
            assert_eq!(c.upper.len(), c.num_rows());
        }
    }

    #[test]
    fn test_single_sample_has_no_continuity_rows() {
        let init = InitialState::new(0.3, -0.2, 0.1);
        let c = build_affine_constraint(&params(1, 1.0, init, 1.0)).unwrap();
        assert_eq!(c.num_rows(), 6);

        // Initial rows come first when n = 1.
        for (row, (col, value)) in [(0, 0.3), (1, -0.2), (2, 0.1)].into_iter().enumerate() {
            assert_eq!(c.matrix[[row, col]], 1.0);
            assert!(c.is_equality(row));
            assert_eq!(c.lower[row], value);
        }
        // Range rows.
        assert_eq!((c.lower[3], c.upper[3]), (-1.0, 1.0));
        assert_eq!((c.lower[4], c.upper[4]), (-2.0, 2.0));
        assert_eq!((c.lower[5], c.upper[5]), (-2.0, 2.0));
    }

    #[test]
    fn test_jerk_rows() {
        let n = 4;
        let c = build_affine_constraint(&params(n, 0.5, InitialState::default(), 3.0)).unwrap();
        for i in 0..n - 1 {
            let row = c.matrix.row(i);
            assert_eq!(row[2 * n + i], -1.0);
            assert_eq!(row[2 * n + i + 1], 1.0);
            assert_eq!(row.iter().filter(|&&v| v != 0.0).count(), 2);
            assert_relative_eq!(c.lower[i], -1.5);
            assert_relative_eq!(c.upper[i], 1.5);
            assert!(!c.is_equality(i));
        }
    }

    #[test]
    fn test_derivative_continuity_rows() {
        let n = 4;
        let ds = 0.5;
        let c = build_affine_constraint(&params(n, ds, InitialState::default(), 1.0)).unwrap();
        for i in 0..n - 1 {
            let r = (n - 1) + i;
            let row = c.matrix.row(r);
            assert_eq!(row[n + i], -1.0);
            assert_eq!(row[n + i + 1], 1.0);
            assert_relative_eq!(row[2 * n + i], -0.25);
            assert_relative_eq!(row[2 * n + i + 1], -0.25);
            assert_eq!(row.iter().filter(|&&v| v != 0.0).count(), 4);
            assert!(c.is_equality(r));
            assert_eq!(c.lower[r], 0.0);
        }
    }

    #[test]
    fn test_value_continuity_rows() {
        let n = 4;
        let ds = 0.6;
        let c = build_affine_constraint(&params(n, ds, InitialState::default(), 1.0)).unwrap();
        for i in 0..n - 1 {
            let r = 2 * (n - 1) + i;
            let row = c.matrix.row(r);
            assert_eq!(row[i], -1.0);
            assert_eq!(row[i + 1], 1.0);
            assert_relative_eq!(row[n + i], -ds);
            assert_relative_eq!(row[2 * n + i], -ds * ds / 3.0);
            assert_relative_eq!(row[2 * n + i + 1], -ds * ds / 6.0);
            assert_eq!(row.iter().filter(|&&v| v != 0.0).count(), 5);
            assert!(c.is_equality(r));
        }
    }

    #[test]
    fn test_initial_rows_follow_continuity() {
        let n = 5;
        let init = InitialState::new(0.4, 0.2, -0.1);
        let c = build_affine_constraint(&params(n, 1.0, init, 1.0)).unwrap();
        let first = 3 * (n - 1);
        let expected = [(0, 0.4), (n, 0.2), (2 * n, -0.1)];
        for (k, &(col, value)) in expected.iter().enumerate() {
            let r = first + k;
            assert_eq!(c.matrix[[r, col]], 1.0);
            assert_eq!(c.matrix.row(r).iter().filter(|&&v| v != 0.0).count(), 1);
            assert_eq!(c.lower[r], value);
            assert_eq!(c.upper[r], value);
        }
    }

    #[test]
    fn test_range_rows_use_bounds_then_sentinel() {
        let n = 3;
        let p = FemParams::new(
            vec![(-1.0, 1.0), (0.0, 2.0), (-3.0, 0.5)],
            InitialState::default(),
            1.0,
            FemWeights::new(1.0, 1.0, 1.0, 1.0),
            1.0,
        )
        .unwrap();
        let c = build_affine_constraint(&p).unwrap();
        let first = 3 * (n - 1) + 3;
        for col in 0..3 * n {
            let r = first + col;
            assert_eq!(c.matrix[[r, col]], 1.0);
            assert_eq!(c.matrix.row(r).iter().filter(|&&v| v != 0.0).count(), 1);
        }
        assert_eq!((c.lower[first + 1], c.upper[first + 1]), (0.0, 2.0));
        assert_eq!((c.lower[first + 2], c.upper[first + 2]), (-3.0, 0.5));
        for col in n..3 * n {
            assert_eq!(c.lower[first + col], -DERIVATIVE_SENTINEL_BOUND);
            assert_eq!(c.upper[first + col], DERIVATIVE_SENTINEL_BOUND);
        }
    }

    #[test]
    fn test_range_rows_use_explicit_derivative_bounds() {
        let n = 3;
        let p = params(n, 1.0, InitialState::default(), 1.0)
            .with_derivative_bounds(vec![(-0.5, 0.5); n])
            .unwrap()
            .with_second_derivative_bounds(vec![(-0.1, 0.2); n])
            .unwrap();
        let c = build_affine_constraint(&p).unwrap();
        let first = 3 * (n - 1) + 3;
        for i in 0..n {
            assert_eq!((c.lower[first + n + i], c.upper[first + n + i]), (-0.5, 0.5));
            assert_eq!(
                (c.lower[first + 2 * n + i], c.upper[first + 2 * n + i]),
                (-0.1, 0.2)
            );
        }
    }

    #[test]
    fn test_zero_jerk_bound_collapses_to_equality() {
        let c = build_affine_constraint(&params(3, 1.0, InitialState::default(), 0.0)).unwrap();
        // -0.0 and 0.0 compare equal, so zero jerk collapses to an equality.
        assert!(c.is_equality(0));
        assert_eq!(c.upper[0], 0.0);
    }
}
