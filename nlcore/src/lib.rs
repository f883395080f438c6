//! Problem-level driver for nonlinear instruction streams.
//!
//! [`compiler::Compiler`] compiles the constraint and objective streams of a
//! problem with [`nlinstr`], validates them against an optional reference
//! point, and hands the results to a [`provider::ConstraintSink`].

pub mod compiler;
pub mod emitter;
pub mod magic;
pub mod provider;
#[cfg(any(test, feature = "test-utils"))]
pub mod tests_utils;
pub mod utils;

pub use nlinstr;
