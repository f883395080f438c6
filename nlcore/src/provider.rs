//! Interfaces between the compiler and the optimization problem it feeds.
//!
//! The problem owns the decision variables and the constraint storage; the
//! compiler only reads variables by index and hands finished rows over.
use nlinstr::Expression;
use smallvec::SmallVec;

/// Read-only, index-addressed view of the problem's decision variables.
pub trait VariableProvider {
    /// Opaque handle the problem uses to refer to one of its variables.
    type Handle: Copy + std::fmt::Debug;

    fn variable_count(&self) -> usize;

    /// Handle of the decision variable at `index`, if it exists.
    fn variable(&self, index: usize) -> Option<Self::Handle>;
}

/// Source of the feasibility tolerance used for validation.
pub trait ToleranceProvider {
    fn feasibility_tolerance(&self) -> f64;
}

/// Destination for compiled nonlinear rows.
///
/// Failures are reported as the problem's own integer status code.
pub trait ConstraintSink: VariableProvider {
    /// Value the problem uses for an unbounded side.
    fn infinity(&self) -> f64;

    /// Create a free auxiliary variable with the given objective coefficient.
    fn add_free_variable(&mut self, name: &str, objective: f64) -> Result<Self::Handle, i32>;

    /// Take ownership of a finished row.
    fn add_nonlinear_constraint(&mut self, row: NonlinearRow<Self::Handle>) -> Result<(), i32>;
}

/// `lhs <= expression + Σ coefficient · handle <= rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct NonlinearRow<H> {
    pub name: String,
    pub expression: Expression,
    /// Problem handle of every variable occurrence, indexed by occurrence slot.
    pub handles: Vec<H>,
    /// Linear terms added next to the expression (the objective's auxiliary
    /// variable).
    pub linear: SmallVec<(H, f64), 1>,
    pub lhs: f64,
    pub rhs: f64,
}

impl<H> NonlinearRow<H> {
    pub fn is_equality(&self) -> bool {
        self.lhs == self.rhs
    }
}
