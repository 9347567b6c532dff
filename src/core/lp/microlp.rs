use std::time::Instant;

use good_lp::{
    Expression,
    ProblemVariables,
    ResolutionError,
    Solution,
    SolverModel,
    Variable,
    constraint,
    solvers::microlp::microlp,
    variable,
};

use crate::{
    core::{
        Error,
        lp::{Backend, LinearProgram, Relation},
    },
    prelude::*,
};

/// Simplex backend, pure Rust.
///
/// Always returns a vertex of the feasible region, so ties between equally priced periods
/// are resolved by filling whole periods rather than spreading thin.
#[derive(Copy, Clone, Debug, Default)]
pub struct MicroLp;

impl Backend for MicroLp {
    #[instrument(skip_all, fields(n_variables = program.n_variables(), n_rows = program.rows().len()))]
    fn solve(&self, program: &LinearProgram) -> Result<Vec<f64>, Error> {
        if program.n_variables() == 0 {
            return Ok(Vec::new());
        }
        let start_instant = Instant::now();

        let mut variables = ProblemVariables::new();
        let mut objective = Expression::from(0.0);
        let handles: Vec<Variable> = program
            .variables()
            .map(|(_, bounds, cost)| {
                let handle = variables.add(variable().min(bounds.min).max(bounds.max));
                objective += cost * handle;
                handle
            })
            .collect();

        let mut model = variables.minimise(objective).using(microlp);
        for row in program.rows() {
            let mut lhs = Expression::from(0.0);
            for (id, coefficient) in &row.terms {
                lhs += *coefficient * handles[id.index()];
            }
            let rhs = row.rhs;
            model = model.with(match row.relation {
                Relation::Equal => constraint!(lhs == rhs),
                Relation::LessOrEqual => constraint!(lhs <= rhs),
            });
        }

        let solution = model.solve().map_err(|error| match error {
            ResolutionError::Infeasible => Error::SolverInfeasible,
            error => Error::Solver(format!("{error:?}")),
        })?;
        let values: Vec<f64> = handles.into_iter().map(|handle| solution.value(handle)).collect();
        debug!(
            elapsed = ?start_instant.elapsed(),
            max_violation = program.max_violation(&values),
            "solved",
        );
        Ok(values)
    }
}
