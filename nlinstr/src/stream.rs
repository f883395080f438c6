//! Instruction stream decoding
//!
//! Positions alternate between opcodes and inline arguments. Only `NUM` and
//! `VAR` consume the slot that follows them, so the meaning of a token depends
//! on the decoder state rather than on the token itself. Decoding also counts
//! variable occurrences and operators so the builder can size its arena up
//! front.
use log::debug;

use crate::{
    opcode::Opcode,
    utils::{Error, StreamFault},
};

/// A decoded stream element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InstructionKind {
    /// `NUM` followed by its literal.
    Num(f64),
    /// `VAR` followed by its decision-variable index.
    Var(usize),
    /// Any opcode that stands alone.
    Op(Opcode),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instruction {
    /// Position of the opcode token in the raw stream.
    pub position: usize,
    pub kind: InstructionKind,
}

/// Result of [`decode`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedStream {
    pub instructions: Vec<Instruction>,
    /// Variable indices in order of occurrence (one entry per `VAR`).
    pub variables: Vec<usize>,
    /// Number of operator opcodes, supported or not.
    pub operator_count: usize,
    /// Length of the raw token stream.
    pub token_count: usize,
}

impl DecodedStream {
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Upper bound on the nodes a build creates: one leaf per variable, one
    /// node per operator, and a leaf for every literal.
    pub fn node_capacity(&self) -> usize {
        self.instructions.len() + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    /// Expecting an opcode.
    Read,
    /// Expecting the argument of `NUM` or `VAR` (position of the opcode).
    Argument(Opcode, usize),
}

/// Classify every token of `tokens`.
///
/// Fails with [`Error::MalformedStream`] on an empty or truncated stream, an
/// unknown opcode value, or a `VAR` argument that is not a non-negative
/// integer.
pub fn decode(tokens: &[f64]) -> Result<DecodedStream, Error> {
    if tokens.is_empty() {
        return Err(Error::MalformedStream {
            position: 0,
            fault: StreamFault::Empty,
        });
    }

    let mut decoded = DecodedStream {
        instructions: Vec::with_capacity(tokens.len()),
        token_count: tokens.len(),
        ..Default::default()
    };
    let mut state = DecodeState::Read;

    for (position, &token) in tokens.iter().enumerate() {
        state = match state {
            DecodeState::Read => {
                let opcode = Opcode::from_token(token).ok_or(Error::MalformedStream {
                    position,
                    fault: StreamFault::UnknownOpcode(token),
                })?;

                if opcode.takes_argument() {
                    DecodeState::Argument(opcode, position)
                } else {
                    decoded.operator_count += 1;
                    decoded.instructions.push(Instruction {
                        position,
                        kind: InstructionKind::Op(opcode),
                    });
                    DecodeState::Read
                }
            }
            DecodeState::Argument(opcode, at) => {
                let kind = match opcode {
                    Opcode::Var => {
                        let index = variable_index(token).ok_or(Error::MalformedStream {
                            position,
                            fault: StreamFault::InvalidVariableIndex(token),
                        })?;
                        decoded.variables.push(index);
                        InstructionKind::Var(index)
                    }
                    _ => InstructionKind::Num(token),
                };
                decoded.instructions.push(Instruction { position: at, kind });
                DecodeState::Read
            }
        };
    }

    if let DecodeState::Argument(opcode, at) = state {
        return Err(Error::MalformedStream {
            position: at,
            fault: StreamFault::MissingArgument(opcode),
        });
    }

    debug!(
        "Decoded instruction stream: {} tokens, {} variables, {} operators",
        decoded.token_count,
        decoded.variables.len(),
        decoded.operator_count
    );

    Ok(decoded)
}

fn variable_index(token: f64) -> Option<usize> {
    if token.is_finite() && token >= 0.0 && token.fract() == 0.0 && token <= u32::MAX as f64 {
        Some(token as usize)
    } else {
        None
    }
}
