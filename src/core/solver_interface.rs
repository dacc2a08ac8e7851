use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettings, DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::constraints::{build_affine_constraint, AffineConstraint};
use crate::core::error::FemError;
use crate::core::objective::{build_kernel, build_offset};
use crate::core::params::{FemParams, VariableLayout};
use crate::core::sparse::{dense_to_csc, dense_to_csc_upper_tri};

/// Interior point solver settings forwarded to Clarabel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Maximum number of interior point iterations.
    pub max_iter: u32,
    /// Wall-clock limit in seconds; `None` means unlimited.
    pub time_limit: Option<f64>,
    /// Primal/dual feasibility tolerance.
    pub tol_feas: f64,
    /// Absolute duality gap tolerance.
    pub tol_gap_abs: f64,
    /// Relative duality gap tolerance.
    pub tol_gap_rel: f64,
    /// Print Clarabel's iteration log to stdout.
    pub verbose: bool,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iter: 200,
            time_limit: None,
            tol_feas: 1e-8,
            tol_gap_abs: 1e-8,
            tol_gap_rel: 1e-8,
            verbose: false,
        }
    }
}

impl SolverSettings {
    fn to_clarabel(&self) -> Result<DefaultSettings<f64>, FemError> {
        if self.max_iter == 0 {
            return Err(FemError::Settings("max_iter must be at least 1".to_string()));
        }
        for (name, tol) in [
            ("tol_feas", self.tol_feas),
            ("tol_gap_abs", self.tol_gap_abs),
            ("tol_gap_rel", self.tol_gap_rel),
        ] {
            if !tol.is_finite() || tol <= 0.0 {
                return Err(FemError::Settings(format!(
                    "{} must be finite and positive, got {}",
                    name, tol
                )));
            }
        }
        let time_limit = match self.time_limit {
            Some(t) if t.is_nan() || t <= 0.0 => {
                return Err(FemError::Settings(format!(
                    "time_limit must be positive, got {}",
                    t
                )))
            }
            Some(t) => t,
            None => f64::INFINITY,
        };

        DefaultSettingsBuilder::<f64>::default()
            .max_iter(self.max_iter)
            .time_limit(time_limit)
            .tol_feas(self.tol_feas)
            .tol_gap_abs(self.tol_gap_abs)
            .tol_gap_rel(self.tol_gap_rel)
            .verbose(self.verbose)
            .build()
            .map_err(|e| FemError::Settings(e.to_string()))
    }
}

/// Smoothed profile decoded from the solver's primal vector.
#[derive(Debug, Clone, PartialEq)]
pub struct FemSolution {
    /// Values `p_0..p_{n-1}`.
    pub x: Vec<f64>,
    /// First derivatives `v_0..v_{n-1}`; the last entry is always `0.0`.
    pub x_derivative: Vec<f64>,
    /// Second derivatives `a_0..a_{n-1}`; the last entry is always `0.0`.
    pub x_second_order_derivative: Vec<f64>,
    /// Objective value reported by the solver.
    pub obj_val: f64,
}

/// Constraints in Clarabel's conic form `A z + s = b`, `s` in `cones`.
#[derive(Debug)]
struct ConicConstraint {
    a: CscMatrix<f64>,
    b: Vec<f64>,
    cones: Vec<SupportedConeT<f64>>,
}

/// Rewrites `lower <= A z <= upper` for Clarabel.
///
/// Rows with `lower == upper` become `a z = upper` in a zero cone. Every other
/// row becomes `a z <= upper` and `-a z <= -lower` in a nonnegative cone,
/// skipping infinite sides. Within each block rows keep their original order.
fn to_conic_form(constraint: &AffineConstraint) -> ConicConstraint {
    let num_rows = constraint.num_rows();
    let ncols = constraint.matrix.ncols();

    let eq_rows: Vec<usize> = (0..num_rows).filter(|&r| constraint.is_equality(r)).collect();
    let upper_rows: Vec<usize> = (0..num_rows)
        .filter(|&r| !constraint.is_equality(r) && constraint.upper[r].is_finite())
        .collect();
    let lower_rows: Vec<usize> = (0..num_rows)
        .filter(|&r| !constraint.is_equality(r) && constraint.lower[r].is_finite())
        .collect();

    let num_ineq = upper_rows.len() + lower_rows.len();
    let mut a = Array2::zeros((eq_rows.len() + num_ineq, ncols));
    let mut b = Vec::with_capacity(eq_rows.len() + num_ineq);
    let mut out = 0;

    for &r in eq_rows.iter().chain(upper_rows.iter()) {
        a.row_mut(out).assign(&constraint.matrix.row(r));
        b.push(constraint.upper[r]);
        out += 1;
    }
    for &r in &lower_rows {
        a.row_mut(out).assign(&constraint.matrix.row(r).mapv(|v| -v));
        b.push(-constraint.lower[r]);
        out += 1;
    }

    let mut cones = Vec::new();
    if !eq_rows.is_empty() {
        cones.push(SupportedConeT::ZeroConeT(eq_rows.len()));
    }
    if num_ineq > 0 {
        cones.push(SupportedConeT::NonnegativeConeT(num_ineq));
    }

    ConicConstraint {
        a: dense_to_csc(&a),
        b,
        cones,
    }
}

/// Splits the flat primal vector into the three profiles.
///
/// The last first and second derivative entries are overwritten with zero,
/// treating the final sample as a rest state.
fn decode_solution(layout: VariableLayout, z: &[f64], obj_val: f64) -> FemSolution {
    let n = layout.num_samples();
    let x = (0..n).map(|i| z[layout.position(i)]).collect();
    let mut x_derivative: Vec<f64> = (0..n).map(|i| z[layout.derivative(i)]).collect();
    let mut x_second_order_derivative: Vec<f64> =
        (0..n).map(|i| z[layout.second_derivative(i)]).collect();

    if let Some(last) = x_derivative.last_mut() {
        *last = 0.0;
    }
    if let Some(last) = x_second_order_derivative.last_mut() {
        *last = 0.0;
    }

    FemSolution {
        x,
        x_derivative,
        x_second_order_derivative,
        obj_val,
    }
}

/// Builds and solves the finite-element smoothing QP.
///
/// The problem is
/// min 1/2 z'Pz + q'z
/// s.t. lower <= A z <= upper
/// with `z = [p, v, a]`, `P` from [`build_kernel`], `q` from [`build_offset`]
/// and `A`, `lower`, `upper` from [`build_affine_constraint`].
///
/// # Returns
/// The decoded [`FemSolution`], or `FemError::SolverFailed` when Clarabel
/// reports infeasibility, a numerical failure or an exhausted iteration or
/// time budget.
pub fn solve_fem_problem(
    params: &FemParams,
    settings: &SolverSettings,
) -> Result<FemSolution, FemError> {
    let layout = params.layout();
    let num_variables = layout.num_variables();

    let kernel = build_kernel(params);
    let q = build_offset(params).to_vec();
    let constraint = build_affine_constraint(params)?;

    let p_csc = dense_to_csc_upper_tri(&kernel);
    let conic = to_conic_form(&constraint);
    let clarabel_settings = settings.to_clarabel()?;

    debug!(
        variables = num_variables,
        constraint_rows = constraint.num_rows(),
        conic_rows = conic.b.len(),
        "solving finite-element QP"
    );

    let mut solver = DefaultSolver::new(
        &p_csc,
        &q,
        &conic.a,
        &conic.b,
        &conic.cones,
        clarabel_settings,
    );
    solver.solve();

    let solution = &solver.solution;
    match solution.status {
        SolverStatus::Solved | SolverStatus::AlmostSolved => {
            if solution.status == SolverStatus::AlmostSolved {
                warn!(
                    iterations = solution.iterations,
                    "solver reached reduced accuracy only"
                );
            } else {
                debug!(
                    iterations = solution.iterations,
                    obj_val = solution.obj_val,
                    "solver converged"
                );
            }
            Ok(decode_solution(layout, &solution.x, solution.obj_val))
        }
        status => {
            warn!(?status, iterations = solution.iterations, "finite-element QP failed");
            Err(FemError::SolverFailed { status })
        }
    }
}

/// A smoothing problem together with its most recent solution.
///
/// Every [`optimize`](Self::optimize) call builds all matrices from scratch;
/// only the decoded profiles are kept.
#[derive(Debug, Clone)]
pub struct FemQpProblem {
    params: FemParams,
    settings: SolverSettings,
    solution: Option<FemSolution>,
}

impl FemQpProblem {
    pub fn new(params: FemParams) -> Self {
        Self {
            params,
            settings: SolverSettings::default(),
            solution: None,
        }
    }

    pub fn with_settings(mut self, settings: SolverSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn params(&self) -> &FemParams {
        &self.params
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    pub fn num_samples(&self) -> usize {
        self.params.num_samples()
    }

    /// Solves the problem and stores the result.
    ///
    /// Any previously stored solution is discarded first, so a failed call
    /// leaves no result behind.
    pub fn optimize(&mut self) -> Result<&FemSolution, FemError> {
        self.solution = None;
        let solution = solve_fem_problem(&self.params, &self.settings)?;
        Ok(self.solution.insert(solution))
    }

    pub fn solution(&self) -> Option<&FemSolution> {
        self.solution.as_ref()
    }

    /// Solved values, empty until a successful [`optimize`](Self::optimize).
    pub fn x(&self) -> &[f64] {
        self.solution.as_ref().map(|s| s.x.as_slice()).unwrap_or(&[])
    }

    pub fn x_derivative(&self) -> &[f64] {
        self.solution
            .as_ref()
            .map(|s| s.x_derivative.as_slice())
            .unwrap_or(&[])
    }

    pub fn x_second_order_derivative(&self) -> &[f64] {
        self.solution
            .as_ref()
            .map(|s| s.x_second_order_derivative.as_slice())
            .unwrap_or(&[])
    }
}
