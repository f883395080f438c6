//! Compiler from postfix nonlinear instruction streams to expression trees.
//!
//! A stream is a flat `f64` sequence of opcodes and inline arguments (see
//! [`opcode`]). [`stream::decode`] classifies the tokens, [`builder`] turns them
//! into an arena-backed [`Expression`], and [`Expression::evaluate`] /
//! [`Expression::validate`] check the result against a reference point.

pub mod builder;
pub mod eval;
pub mod expr;
mod fmt;
pub mod opcode;
pub mod stack;
pub mod stream;
pub mod utils;

pub use builder::{BuildOptions, compile};
pub use eval::Validation;
pub use expr::{ExprNode, Expression, NodeId};
pub use opcode::Opcode;
pub use utils::Error;
