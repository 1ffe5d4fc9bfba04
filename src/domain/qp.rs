//! Dense convex quadratic program with one linear equality and box bounds.
//!
//! ```text
//! minimize    1/2 x'Px + q'x
//! subject to  a'x = b
//!             l <= x <= u
//! ```
//!
//! Solved with the Clarabel interior-point solver. The equality row goes in
//! a zero cone; every finite bound becomes one row of a nonnegative cone
//! (`-x_i <= -l_i` or `x_i <= u_i`). P only needs to be positive
//! semidefinite, so a zero Hessian (a linear program) is accepted.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

pub const DEFAULT_MAX_ITERATIONS: usize = 5_000;
pub const DEFAULT_TOLERANCE: f64 = 1e-8;

/// Outcome of one solve.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveStatus {
    Optimal(DVector<f64>),
    Infeasible,
    Unbounded,
    NumericalError { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverSettings {
    pub max_iterations: usize,
    /// Feasibility and relative duality-gap tolerance.
    pub tolerance: f64,
    /// Print the solver's iteration table.
    pub show_progress: bool,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            show_progress: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuadraticProgram {
    pub hessian: DMatrix<f64>,
    pub linear: DVector<f64>,
    pub equality: DVector<f64>,
    pub equality_rhs: f64,
    pub lower: DVector<f64>,
    pub upper: DVector<f64>,
}

/// Constraint rows `A x + s = b` in compressed-column form.
struct ConstraintRows {
    colptr: Vec<usize>,
    rowval: Vec<usize>,
    nzval: Vec<f64>,
    rhs: Vec<f64>,
    n_bounds: usize,
}

impl QuadraticProgram {
    pub fn dim(&self) -> usize {
        self.linear.len()
    }

    pub fn objective(&self, x: &DVector<f64>) -> f64 {
        0.5 * x.dot(&(&self.hessian * x)) + self.linear.dot(x)
    }

    fn validate(&self) -> Result<(), String> {
        let n = self.dim();
        if self.hessian.shape() != (n, n) {
            return Err(format!(
                "hessian is {:?}, expected ({n}, {n})",
                self.hessian.shape()
            ));
        }
        if self.equality.len() != n || self.lower.len() != n || self.upper.len() != n {
            return Err("constraint dimensions do not match the objective".into());
        }
        if self.hessian.iter().any(|v| !v.is_finite())
            || self.linear.iter().any(|v| !v.is_finite())
            || self.equality.iter().any(|v| !v.is_finite())
            || !self.equality_rhs.is_finite()
        {
            return Err("objective or equality row contains non-finite values".into());
        }
        if self.lower.iter().chain(self.upper.iter()).any(|v| v.is_nan()) {
            return Err("bounds contain NaN".into());
        }
        Ok(())
    }

    /// Upper triangle of the Hessian, column by column.
    fn hessian_triu(&self) -> (Vec<usize>, Vec<usize>, Vec<f64>) {
        let n = self.dim();
        let mut colptr = vec![0];
        let mut rowval = Vec::new();
        let mut nzval = Vec::new();
        for j in 0..n {
            for i in 0..=j {
                let v = self.hessian[(i, j)];
                if v != 0.0 {
                    rowval.push(i);
                    nzval.push(v);
                }
            }
            colptr.push(nzval.len());
        }
        (colptr, rowval, nzval)
    }

    /// Row 0 is the equality. Lower-bound rows follow, then upper-bound rows,
    /// so row indices stay sorted within each column.
    fn constraint_rows(&self) -> ConstraintRows {
        let n = self.dim();
        let mut next = 1;
        let lower_rows: Vec<Option<usize>> = (0..n)
            .map(|i| {
                self.lower[i].is_finite().then(|| {
                    next += 1;
                    next - 1
                })
            })
            .collect();
        let upper_rows: Vec<Option<usize>> = (0..n)
            .map(|i| {
                self.upper[i].is_finite().then(|| {
                    next += 1;
                    next - 1
                })
            })
            .collect();

        let mut rhs = vec![0.0; next];
        rhs[0] = self.equality_rhs;
        let mut colptr = vec![0];
        let mut rowval = Vec::new();
        let mut nzval = Vec::new();
        for j in 0..n {
            if self.equality[j] != 0.0 {
                rowval.push(0);
                nzval.push(self.equality[j]);
            }
            if let Some(r) = lower_rows[j] {
                rowval.push(r);
                nzval.push(-1.0);
                rhs[r] = -self.lower[j];
            }
            if let Some(r) = upper_rows[j] {
                rowval.push(r);
                nzval.push(1.0);
                rhs[r] = self.upper[j];
            }
            colptr.push(nzval.len());
        }

        ConstraintRows {
            colptr,
            rowval,
            nzval,
            rhs,
            n_bounds: next - 1,
        }
    }

    pub fn solve(&self, settings: &SolverSettings) -> SolveStatus {
        use clarabel::algebra::*;
        use clarabel::solver::*;

        if let Err(reason) = self.validate() {
            return SolveStatus::NumericalError { reason };
        }
        let n = self.dim();
        if n == 0 {
            return SolveStatus::Optimal(DVector::zeros(0));
        }
        if (0..n).any(|i| self.lower[i] > self.upper[i]) {
            return SolveStatus::Infeasible;
        }

        let (p_colptr, p_rowval, p_nzval) = self.hessian_triu();
        let p = CscMatrix::new(n, n, p_colptr, p_rowval, p_nzval);

        let rows = self.constraint_rows();
        let m = rows.rhs.len();
        let a = CscMatrix::new(m, n, rows.colptr, rows.rowval, rows.nzval);

        let mut cones = vec![ZeroConeT(1)];
        if rows.n_bounds > 0 {
            cones.push(NonnegativeConeT(rows.n_bounds));
        }

        let max_iter = u32::try_from(settings.max_iterations).unwrap_or(u32::MAX);
        let solver_settings = match DefaultSettingsBuilder::default()
            .max_iter(max_iter)
            .tol_feas(settings.tolerance)
            .tol_gap_rel(settings.tolerance)
            .verbose(settings.show_progress)
            .build()
        {
            Ok(s) => s,
            Err(e) => {
                return SolveStatus::NumericalError {
                    reason: format!("invalid solver settings: {}", e),
                };
            }
        };

        let mut solver = match DefaultSolver::new(
            &p,
            self.linear.as_slice(),
            &a,
            &rows.rhs,
            &cones,
            solver_settings,
        ) {
            Ok(s) => s,
            Err(e) => {
                return SolveStatus::NumericalError {
                    reason: format!("failed to set up solver: {:?}", e),
                };
            }
        };
        solver.solve();

        let solution = &solver.solution;
        debug!(
            "qp solved: status {:?}, {} iterations, objective {:.6e}",
            solution.status, solution.iterations, solution.obj_val
        );
        match solution.status {
            SolverStatus::Solved => SolveStatus::Optimal(DVector::from_column_slice(&solution.x)),
            SolverStatus::PrimalInfeasible => SolveStatus::Infeasible,
            SolverStatus::DualInfeasible => SolveStatus::Unbounded,
            other => SolveStatus::NumericalError {
                reason: format!("solver stopped with status {:?}", other),
            },
        }
    }
}
