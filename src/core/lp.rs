//! Solver-agnostic linear programs.
//!
//! The model is a plain indexed structure: bounded variables, a linear objective to minimize,
//! and sparse rows that are either equalities or upper bounds. Any [`Backend`] able to handle
//! those can solve it.

mod microlp;

pub use self::microlp::MicroLp;
use crate::{core::Error, ops::RangeInclusive};

#[must_use]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VariableId(usize);

impl VariableId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Relation {
    Equal,
    LessOrEqual,
}

#[must_use]
#[derive(Clone, Debug)]
pub struct Row {
    pub terms: Vec<(VariableId, f64)>,
    pub relation: Relation,
    pub rhs: f64,
}

impl Row {
    pub const fn equal(terms: Vec<(VariableId, f64)>, rhs: f64) -> Self {
        Self { terms, relation: Relation::Equal, rhs }
    }

    pub const fn less_or_equal(terms: Vec<(VariableId, f64)>, rhs: f64) -> Self {
        Self { terms, relation: Relation::LessOrEqual, rhs }
    }

    /// Evaluate the left-hand side for the given variable values.
    #[must_use]
    pub fn lhs(&self, values: &[f64]) -> f64 {
        self.terms.iter().map(|(id, coefficient)| coefficient * values[id.index()]).sum()
    }
}

/// Minimization problem.
#[must_use]
#[derive(Clone, Debug, Default)]
pub struct LinearProgram {
    bounds: Vec<RangeInclusive<f64>>,
    costs: Vec<f64>,
    rows: Vec<Row>,
}

impl LinearProgram {
    pub fn add_variable(&mut self, bounds: RangeInclusive<f64>, cost: f64) -> VariableId {
        debug_assert!(bounds.min <= bounds.max, "empty bounds: {bounds:?}");
        self.bounds.push(bounds);
        self.costs.push(cost);
        VariableId(self.bounds.len() - 1)
    }

    pub fn add_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    #[must_use]
    pub const fn n_variables(&self) -> usize {
        self.bounds.len()
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Iterate over the variables with their bounds and objective coefficients.
    pub fn variables(&self) -> impl Iterator<Item = (VariableId, RangeInclusive<f64>, f64)> {
        self.bounds
            .iter()
            .zip(&self.costs)
            .enumerate()
            .map(|(index, (bounds, cost))| (VariableId(index), *bounds, *cost))
    }

    /// Objective value of the given solution.
    #[must_use]
    pub fn objective(&self, values: &[f64]) -> f64 {
        self.costs.iter().zip(values).map(|(cost, value)| cost * value).sum()
    }

    /// Largest bound or row violation of the given solution.
    #[must_use]
    pub fn max_violation(&self, values: &[f64]) -> f64 {
        let bounds = self
            .bounds
            .iter()
            .zip(values)
            .map(|(bounds, value)| (bounds.min - value).max(value - bounds.max));
        let rows = self.rows.iter().map(|row| {
            let residual = row.lhs(values) - row.rhs;
            match row.relation {
                Relation::Equal => residual.abs(),
                Relation::LessOrEqual => residual,
            }
        });
        bounds.chain(rows).fold(0.0, f64::max)
    }
}

pub trait Backend {
    /// Solve the program and return the variable values indexed by [`VariableId::index`].
    fn solve(&self, program: &LinearProgram) -> Result<Vec<f64>, Error>;
}
