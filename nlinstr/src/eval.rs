//! Expression evaluation and validation
//!
//! Evaluation walks the nodes reachable from the root in post-order with an
//! explicit stack, so deep expressions do not recurse. Nodes shared by several
//! parents are evaluated once. Nodes that are not reachable from the root
//! (for instance a term dropped because of a zero coefficient) are never
//! evaluated and cannot raise errors.
use log::trace;
use smallvec::SmallVec;
use strum::EnumIs;

use crate::{
    expr::{ExprNode, Expression, NodeId},
    opcode::BinaryOp,
    utils::Error,
};

/// Outcome of [`Expression::validate`].
#[derive(Debug, Clone, Copy, PartialEq, EnumIs)]
pub enum Validation {
    /// The expression evaluates to the expected value within tolerance.
    Passed { value: f64 },
    Mismatch {
        value: f64,
        expected: f64,
        difference: f64,
    },
}

impl Validation {
    /// The value the expression evaluated to.
    pub fn value(&self) -> f64 {
        match self {
            Validation::Passed { value } | Validation::Mismatch { value, .. } => *value,
        }
    }
}

/// `value` agrees with `expected` when they are equal (infinities included),
/// both NaN, or within `tolerance` of each other.
pub fn agrees(value: f64, expected: f64, tolerance: f64) -> bool {
    value == expected
        || (value.is_nan() && expected.is_nan())
        || (value - expected).abs() <= tolerance
}

impl Expression {
    /// Evaluate the expression at `point`, indexed by decision-variable index.
    pub fn evaluate(&self, point: &[f64]) -> Result<f64, Error> {
        enum Frame {
            Enter(NodeId),
            Exit(NodeId),
        }

        let mut values: Vec<Option<f64>> = vec![None; self.len()];
        let mut stack: SmallVec<Frame, 32> = SmallVec::new();
        stack.push(Frame::Enter(self.root()));

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(id) => {
                    if values[id.index()].is_some() {
                        continue;
                    }
                    stack.push(Frame::Exit(id));
                    // Children are pushed in reverse so the left operand is
                    // visited first.
                    for child in self.nodes()[id.index()].children().into_iter().rev() {
                        if values[child.index()].is_none() {
                            stack.push(Frame::Enter(child));
                        }
                    }
                }
                Frame::Exit(id) => {
                    if values[id.index()].is_some() {
                        continue;
                    }
                    let value = self.evaluate_node(id, point, &values)?;
                    values[id.index()] = Some(value);
                }
            }
        }

        let value = values[self.root().index()].unwrap_or(f64::NAN);
        trace!("Evaluated expression with {} nodes to {}", self.len(), value);
        Ok(value)
    }

    /// Evaluate at `point` and compare against `expected`.
    pub fn validate(&self, point: &[f64], expected: f64, tolerance: f64) -> Result<Validation, Error> {
        let value = self.evaluate(point)?;
        if agrees(value, expected, tolerance) {
            Ok(Validation::Passed { value })
        } else {
            Ok(Validation::Mismatch {
                value,
                expected,
                difference: (value - expected).abs(),
            })
        }
    }

    /// Value of a single node whose children are already evaluated.
    fn evaluate_node(&self, id: NodeId, point: &[f64], values: &[Option<f64>]) -> Result<f64, Error> {
        // Children always precede their parent and were evaluated on Exit.
        let get = |child: &NodeId| values[child.index()].unwrap_or(f64::NAN);

        let value = match &self.nodes()[id.index()] {
            ExprNode::Constant(value) => *value,
            ExprNode::Variable { index, .. } => {
                *point.get(*index).ok_or(Error::PointTooShort {
                    index: *index,
                    len: point.len(),
                })?
            }
            ExprNode::Sum { terms, constant } => terms
                .iter()
                .fold(*constant, |acc, (child, coefficient)| acc + coefficient * get(child)),
            ExprNode::Unary { op, child } => op.apply(get(child)),
            ExprNode::Binary { op, lhs, rhs } => {
                let (a, b) = (get(lhs), get(rhs));
                match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div if b == 0.0 => return Err(Error::DivisionByZero { node: id }),
                    BinaryOp::Div => a / b,
                    BinaryOp::Pow => a.powf(b),
                }
            }
        };
        Ok(value)
    }
}
