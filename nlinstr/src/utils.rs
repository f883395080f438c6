use strum::EnumIs;
use thiserror::Error;

use crate::{expr::NodeId, opcode::Opcode, stack::PendingKind};

/// Reason an instruction stream could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, EnumIs, Error)]
pub enum StreamFault {
    #[error("the instruction stream is empty")]
    Empty,

    #[error("`{0}` is not a known opcode (unknown or out of order instruction)")]
    UnknownOpcode(f64),

    #[error("opcode `{0}` expects an argument but the stream ends")]
    MissingArgument(Opcode),

    #[error("`{0}` is not a valid variable index (expected a non-negative integer)")]
    InvalidVariableIndex(f64),
}

/// Reason a node list does not form a valid expression arena.
#[derive(Debug, Clone, Copy, PartialEq, EnumIs, Error)]
pub enum ArenaFault {
    #[error("the expression has no nodes")]
    Empty,

    #[error("root {root} is not the last of the {len} nodes")]
    MisplacedRoot { root: NodeId, len: usize },

    #[error("node {node} references {child}, which is not created before it")]
    ForwardReference { node: NodeId, child: NodeId },

    #[error("variable leaf {node} uses slot {slot} but the variable table holds {len} slots")]
    UnknownSlot { node: NodeId, slot: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq, EnumIs, Error)]
pub enum Error {
    /// The token sequence itself is ill-formed (truncated, unknown opcode, ...).
    #[error("Malformed instruction stream at position {position}: {fault}.")]
    MalformedStream { position: usize, fault: StreamFault },

    /// Operator/operand arity mismatch the state machine could not resolve.
    #[error("Malformed expression at position {position} (`{operator}`): {detail}.")]
    MalformedExpression {
        position: usize,
        operator: &'static str,
        detail: &'static str,
    },

    /// Recognized opcode without an implementation.
    #[error(
        "Function `{opcode}` at position {position} is not supported. The functions min, max, tan and sign are not available for nonlinear expressions."
    )]
    UnsupportedOperator { position: usize, opcode: Opcode },

    /// A pending-operand stack would grow past its configured capacity.
    #[error(
        "Maximum function depth exceeded at position {position} while processing `{opcode}`: the pending {stack} list is limited to {limit} entries."
    )]
    DepthExceeded {
        position: usize,
        opcode: Opcode,
        stack: PendingKind,
        limit: usize,
    },

    /// Division by exactly zero, only detected when evaluating.
    #[error("Division by zero while evaluating node {node}.")]
    DivisionByZero { node: NodeId },

    /// `pow` whose exponent is not a constant.
    #[error(
        "You cannot use `pow` with a variable exponent (position {position}). For x^y use exp(y*log(x))."
    )]
    InvalidPower { position: usize },

    /// A `VAR` operand refers to a decision variable that does not exist.
    #[error(
        "Variable index {index} at position {position} is out of range, the problem declares {count} variables."
    )]
    UnknownVariable {
        position: usize,
        index: usize,
        count: usize,
    },

    /// The evaluation point has no value for a referenced variable.
    #[error("The evaluation point holds {len} values but variable index {index} is referenced.")]
    PointTooShort { index: usize, len: usize },
}

impl Error {
    /// Instruction position that triggered the error, if the error is tied to one.
    pub fn position(&self) -> Option<usize> {
        match self {
            Error::MalformedStream { position, .. }
            | Error::MalformedExpression { position, .. }
            | Error::UnsupportedOperator { position, .. }
            | Error::DepthExceeded { position, .. }
            | Error::InvalidPower { position }
            | Error::UnknownVariable { position, .. } => Some(*position),
            Error::DivisionByZero { .. } | Error::PointTooShort { .. } => None,
        }
    }

    /// Evaluation-time errors can only be raised by [`crate::expr::Expression::evaluate`].
    pub fn is_evaluation_error(&self) -> bool {
        matches!(
            self,
            Error::DivisionByZero { .. } | Error::PointTooShort { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_operator_and_position() {
        let err = Error::UnsupportedOperator {
            position: 4,
            opcode: Opcode::Tan,
        };
        let rendered = err.to_string();
        assert!(rendered.contains("`tan`"));
        assert!(rendered.contains("position 4"));
        assert_eq!(err.position(), Some(4));
    }

    #[test]
    fn depth_errors_name_the_opcode() {
        let err = Error::DepthExceeded {
            position: 7,
            opcode: Opcode::Var,
            stack: PendingKind::Var,
            limit: 2,
        };
        let rendered = err.to_string();
        assert!(rendered.contains("position 7 while processing `var`"));
        assert!(rendered.contains("pending variable list is limited to 2 entries"));
        assert_eq!(err.position(), Some(7));
    }

    #[test]
    fn stream_faults_render_inside_stream_errors() {
        let err = Error::MalformedStream {
            position: 2,
            fault: StreamFault::MissingArgument(Opcode::Var),
        };
        assert!(err.to_string().contains("opcode `var` expects an argument"));
        assert!(!err.is_evaluation_error());
        assert!(Error::DivisionByZero { node: NodeId(3) }.is_evaluation_error());
    }
}
