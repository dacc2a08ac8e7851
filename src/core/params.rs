//! Problem parameters for the finite-element QP: per-sample bounds, spacing,
//! initial state, smoothing weights and the jerk bound.

use serde::{Deserialize, Serialize};

use crate::core::error::FemError;

/// Smoothing weights of the QP objective.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FemWeights {
    /// Penalty on the value itself (pulls toward zero).
    pub x: f64,
    /// Penalty on the distance to the bound-pair center line.
    pub x_mid_line: f64,
    /// Penalty on the first derivative.
    pub x_derivative: f64,
    /// Penalty on the second derivative.
    pub x_second_order_derivative: f64,
}

impl FemWeights {
    pub fn new(x: f64, x_mid_line: f64, x_derivative: f64, x_second_order_derivative: f64) -> Self {
        Self {
            x,
            x_mid_line,
            x_derivative,
            x_second_order_derivative,
        }
    }

    fn validate(&self) -> Result<(), FemError> {
        let named = [
            ("x", self.x),
            ("x_mid_line", self.x_mid_line),
            ("x_derivative", self.x_derivative),
            ("x_second_order_derivative", self.x_second_order_derivative),
        ];
        for (name, w) in named {
            if !w.is_finite() || w < 0.0 {
                return Err(FemError::InvalidParams(format!(
                    "weight `{}` must be finite and non-negative, got {}",
                    name, w
                )));
            }
        }
        Ok(())
    }
}

/// State of the profile at sample 0: value, first and second derivative.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InitialState {
    pub x: f64,
    pub x_derivative: f64,
    pub x_second_order_derivative: f64,
}

impl InitialState {
    pub fn new(x: f64, x_derivative: f64, x_second_order_derivative: f64) -> Self {
        Self {
            x,
            x_derivative,
            x_second_order_derivative,
        }
    }
}

/// Offsets of each sample's variables inside the flat solver vector.
///
/// The vector is `[p_0..p_{n-1}, v_0..v_{n-1}, a_0..a_{n-1}]`; every builder
/// and the solution decoder index through this mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableLayout {
    num_samples: usize,
}

impl VariableLayout {
    pub fn new(num_samples: usize) -> Self {
        Self { num_samples }
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Total number of QP variables (`3n`).
    pub fn num_variables(&self) -> usize {
        3 * self.num_samples
    }

    #[inline]
    pub fn position(&self, i: usize) -> usize {
        i
    }

    #[inline]
    pub fn derivative(&self, i: usize) -> usize {
        self.num_samples + i
    }

    #[inline]
    pub fn second_derivative(&self, i: usize) -> usize {
        2 * self.num_samples + i
    }
}

/// Validated inputs of one smoothing problem.
///
/// The sample count is the length of `x_bounds`. Derivative and second
/// derivative bounds are optional; when unset, the constraint builder falls
/// back to a fixed sentinel range for those coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct FemParams {
    x_bounds: Vec<(f64, f64)>,
    x_derivative_bounds: Option<Vec<(f64, f64)>>,
    x_second_order_derivative_bounds: Option<Vec<(f64, f64)>>,
    x_init: InitialState,
    delta_s: f64,
    weights: FemWeights,
    max_x_third_order_derivative: f64,
}

impl FemParams {
    /// Creates a parameter set after checking every invariant.
    ///
    /// # Arguments
    /// * `x_bounds` - `(lower, upper)` value bounds, one pair per sample.
    /// * `x_init` - State pinned at sample 0.
    /// * `delta_s` - Uniform spacing between samples.
    /// * `weights` - Objective weights.
    /// * `max_x_third_order_derivative` - Jerk bound; the second derivative may
    ///   change by at most `max_x_third_order_derivative * delta_s` between
    ///   adjacent samples.
    ///
    /// # Returns
    /// `FemError::InvalidParams` if the bounds are empty or malformed, the
    /// spacing is not strictly positive, a weight or the jerk bound is negative,
    /// or any input is not finite.
    pub fn new(
        x_bounds: Vec<(f64, f64)>,
        x_init: InitialState,
        delta_s: f64,
        weights: FemWeights,
        max_x_third_order_derivative: f64,
    ) -> Result<Self, FemError> {
        if x_bounds.is_empty() {
            return Err(FemError::InvalidParams(
                "at least one sample bound is required".to_string(),
            ));
        }
        validate_bounds("x_bounds", &x_bounds, x_bounds.len())?;

        if !delta_s.is_finite() || delta_s <= 0.0 {
            return Err(FemError::InvalidParams(format!(
                "delta_s must be finite and positive, got {}",
                delta_s
            )));
        }
        if !max_x_third_order_derivative.is_finite() || max_x_third_order_derivative < 0.0 {
            return Err(FemError::InvalidParams(format!(
                "max_x_third_order_derivative must be finite and non-negative, got {}",
                max_x_third_order_derivative
            )));
        }
        let init = [x_init.x, x_init.x_derivative, x_init.x_second_order_derivative];
        if init.iter().any(|v| !v.is_finite()) {
            return Err(FemError::InvalidParams(format!(
                "initial state must be finite, got {:?}",
                x_init
            )));
        }
        weights.validate()?;

        Ok(Self {
            x_bounds,
            x_derivative_bounds: None,
            x_second_order_derivative_bounds: None,
            x_init,
            delta_s,
            weights,
            max_x_third_order_derivative,
        })
    }

    /// Replaces the sentinel range on the first derivative with explicit
    /// per-sample bounds.
    pub fn with_derivative_bounds(mut self, bounds: Vec<(f64, f64)>) -> Result<Self, FemError> {
        validate_bounds("x_derivative_bounds", &bounds, self.num_samples())?;
        self.x_derivative_bounds = Some(bounds);
        Ok(self)
    }

    /// Replaces the sentinel range on the second derivative with explicit
    /// per-sample bounds.
    pub fn with_second_derivative_bounds(
        mut self,
        bounds: Vec<(f64, f64)>,
    ) -> Result<Self, FemError> {
        validate_bounds("x_second_order_derivative_bounds", &bounds, self.num_samples())?;
        self.x_second_order_derivative_bounds = Some(bounds);
        Ok(self)
    }

    pub fn num_samples(&self) -> usize {
        self.x_bounds.len()
    }

    pub fn layout(&self) -> VariableLayout {
        VariableLayout::new(self.num_samples())
    }

    pub fn x_bounds(&self) -> &[(f64, f64)] {
        &self.x_bounds
    }

    pub fn x_derivative_bounds(&self) -> Option<&[(f64, f64)]> {
        self.x_derivative_bounds.as_deref()
    }

    pub fn x_second_order_derivative_bounds(&self) -> Option<&[(f64, f64)]> {
        self.x_second_order_derivative_bounds.as_deref()
    }

    pub fn x_init(&self) -> &InitialState {
        &self.x_init
    }

    pub fn delta_s(&self) -> f64 {
        self.delta_s
    }

    pub fn weights(&self) -> &FemWeights {
        &self.weights
    }

    pub fn max_x_third_order_derivative(&self) -> f64 {
        self.max_x_third_order_derivative
    }
}

fn validate_bounds(name: &str, bounds: &[(f64, f64)], expected_len: usize) -> Result<(), FemError> {
    if bounds.len() != expected_len {
        return Err(FemError::InvalidParams(format!(
            "{} has {} entries, expected {}",
            name,
            bounds.len(),
            expected_len
        )));
    }
    for (i, &(lower, upper)) in bounds.iter().enumerate() {
        if !lower.is_finite() || !upper.is_finite() {
            return Err(FemError::InvalidParams(format!(
                "{}[{}] = ({}, {}) is not finite",
                name, i, lower, upper
            )));
        }
        if lower > upper {
            return Err(FemError::InvalidParams(format!(
                "{}[{}]: lower bound {} exceeds upper bound {}",
                name, i, lower, upper
            )));
        }
    }
    Ok(())
}
