//! Quadratic and linear terms of the smoothing objective
//! `min 1/2 z'Pz + q'z` over `z = [p, v, a]`.

use ndarray::{Array1, Array2};

use crate::core::params::FemParams;

/// Builds the kernel (Hessian) matrix `P`.
///
/// The objective is a separable sum of squared terms, so `P` is diagonal:
/// * positions: `2 * (x_w + x_mid_line_w)`
/// * first derivatives: `2 * x_derivative_w`
/// * second derivatives: `2 * x_second_order_derivative_w`
///
/// # Returns
/// A dense `3n x 3n` matrix.
pub fn build_kernel(params: &FemParams) -> Array2<f64> {
    let layout = params.layout();
    let w = params.weights();
    let mut kernel = Array2::zeros((layout.num_variables(), layout.num_variables()));

    for i in 0..layout.num_samples() {
        let p = layout.position(i);
        let v = layout.derivative(i);
        let a = layout.second_derivative(i);
        kernel[[p, p]] = 2.0 * w.x + 2.0 * w.x_mid_line;
        kernel[[v, v]] = 2.0 * w.x_derivative;
        kernel[[a, a]] = 2.0 * w.x_second_order_derivative;
    }
    kernel
}

/// Builds the linear term `q`.
///
/// Position entries are `-2 * x_mid_line_w * (lower_i + upper_i)`; derivative
/// entries are zero.
pub fn build_offset(params: &FemParams) -> Array1<f64> {
    let layout = params.layout();
    let w_mid = params.weights().x_mid_line;
    let mut q = Array1::zeros(layout.num_variables());

    for (i, &(lower, upper)) in params.x_bounds().iter().enumerate() {
        q[layout.position(i)] = -2.0 * w_mid * (lower + upper);
    }
    q
}
