pub mod constraints;
pub mod error;
pub mod objective;
pub mod params;
pub mod solver_interface;
pub mod sparse;

pub use constraints::{
    build_affine_constraint, constraint_row_count, AffineConstraint, DERIVATIVE_SENTINEL_BOUND,
};
pub use error::FemError;
pub use objective::{build_kernel, build_offset};
pub use params::{FemParams, FemWeights, InitialState, VariableLayout};
pub use solver_interface::{solve_fem_problem, FemQpProblem, FemSolution, SolverSettings};
pub use sparse::{dense_to_csc, dense_to_csc_upper_tri};
