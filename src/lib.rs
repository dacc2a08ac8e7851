//! Finite-element QP smoothing of one-dimensional profiles.
//!
//! A profile sampled at a uniform spacing (lateral offset, speed, ...) is
//! smoothed into consistent value, first derivative and second derivative
//! sequences by solving a convex quadratic program with `clarabel`.
//!
//! ```no_run
//! use fem_qp_rs::core::{FemParams, FemQpProblem, FemWeights, InitialState};
//!
//! let params = FemParams::new(
//!     vec![(-1.0, 1.0); 10],
//!     InitialState::new(0.2, 0.0, 0.0),
//!     0.5,
//!     FemWeights::new(1.0, 1.0, 10.0, 100.0),
//!     1.0,
//! )?;
//! let mut problem = FemQpProblem::new(params);
//! let solution = problem.optimize()?;
//! println!("{:?}", solution.x);
//! # Ok::<(), fem_qp_rs::core::FemError>(())
//! ```

pub mod core;
