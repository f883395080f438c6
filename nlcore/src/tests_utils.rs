//! In-memory problem used by unit and integration tests.
use crate::{
    magic::DEFAULT_FEASIBILITY_TOLERANCE,
    provider::{ConstraintSink, NonlinearRow, ToleranceProvider, VariableProvider},
};

/// Handle of a variable of an [`InMemoryProblem`]. Auxiliary variables are
/// numbered after the decision variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Var(pub usize);

#[derive(Debug, Clone)]
pub struct InMemoryProblem {
    pub variable_count: usize,
    /// Auxiliary variables as `(name, objective coefficient)`.
    pub aux: Vec<(String, f64)>,
    pub rows: Vec<NonlinearRow<Var>>,
    pub infinity: f64,
    pub tolerance: f64,
    /// Status code returned by every mutating call, if set.
    pub reject: Option<i32>,
}

impl InMemoryProblem {
    pub fn with_variables(variable_count: usize) -> Self {
        Self {
            variable_count,
            aux: Vec::new(),
            rows: Vec::new(),
            infinity: 1e20,
            tolerance: DEFAULT_FEASIBILITY_TOLERANCE,
            reject: None,
        }
    }

    /// Make every mutating call fail with `code`.
    pub fn rejecting(mut self, code: i32) -> Self {
        self.reject = Some(code);
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn row(&self, name: &str) -> Option<&NonlinearRow<Var>> {
        self.rows.iter().find(|row| row.name == name)
    }
}

impl VariableProvider for InMemoryProblem {
    type Handle = Var;

    fn variable_count(&self) -> usize {
        self.variable_count
    }

    fn variable(&self, index: usize) -> Option<Var> {
        (index < self.variable_count).then_some(Var(index))
    }
}

impl ToleranceProvider for InMemoryProblem {
    fn feasibility_tolerance(&self) -> f64 {
        self.tolerance
    }
}

impl ConstraintSink for InMemoryProblem {
    fn infinity(&self) -> f64 {
        self.infinity
    }

    fn add_free_variable(&mut self, name: &str, objective: f64) -> Result<Var, i32> {
        if let Some(code) = self.reject {
            return Err(code);
        }
        self.aux.push((name.to_string(), objective));
        Ok(Var(self.variable_count + self.aux.len() - 1))
    }

    fn add_nonlinear_constraint(&mut self, row: NonlinearRow<Var>) -> Result<(), i32> {
        if let Some(code) = self.reject {
            return Err(code);
        }
        self.rows.push(row);
        Ok(())
    }
}
