//! Wrapping compiled expressions as problem rows.
use log::debug;
use nlinstr::Expression;
use smallvec::smallvec;

use crate::{
    magic::{CONSTRAINT_NAME_PREFIX, OBJECTIVE_AUX_NAME, OBJECTIVE_NAME_PREFIX},
    provider::{ConstraintSink, NonlinearRow, VariableProvider},
    utils::error::{NlError, NlResult, Target},
};

/// Map an infinite bound onto the problem's infinity sentinel.
pub fn map_bound(value: f64, infinity: f64) -> f64 {
    if value.is_infinite() {
        infinity.copysign(value)
    } else {
        value
    }
}

/// Name of the row emitted for `target`.
pub fn row_name(target: Target) -> String {
    match target {
        Target::Constraint(index) => format!("{}{}", CONSTRAINT_NAME_PREFIX, index),
        Target::Objective(index) => format!("{}{}", OBJECTIVE_NAME_PREFIX, index),
    }
}

/// Problem handle of every variable occurrence of `expression`, in slot order.
pub fn resolve_handles<P: VariableProvider + ?Sized>(
    problem: &P,
    expression: &Expression,
    target: Target,
) -> NlResult<Vec<P::Handle>> {
    expression
        .variables()
        .iter()
        .map(|(_, index)| {
            problem
                .variable(index)
                .ok_or(NlError::UnresolvedVariable { target, index })
        })
        .collect()
}

/// Emit `lhs <= expression <= rhs` and return the row name.
pub fn emit_constraint<S: ConstraintSink + ?Sized>(
    sink: &mut S,
    expression: Expression,
    index: usize,
    lhs: f64,
    rhs: f64,
) -> NlResult<String> {
    let target = Target::Constraint(index);
    let handles = resolve_handles(&*sink, &expression, target)?;
    let infinity = sink.infinity();
    let name = row_name(target);

    sink.add_nonlinear_constraint(NonlinearRow {
        name: name.clone(),
        expression,
        handles,
        linear: smallvec![],
        lhs: map_bound(lhs, infinity),
        rhs: map_bound(rhs, infinity),
    })
    .map_err(|code| NlError::SinkRejected {
        target,
        operation: "add the nonlinear constraint",
        code,
    })?;

    debug!("Emitted nonlinear constraint `{}`", name);
    Ok(name)
}

/// Emit `expression - aux = 0` where `aux` is a fresh free variable with
/// objective coefficient 1, and return the row name.
pub fn emit_objective<S: ConstraintSink + ?Sized>(
    sink: &mut S,
    expression: Expression,
    index: usize,
) -> NlResult<String> {
    let target = Target::Objective(index);
    let handles = resolve_handles(&*sink, &expression, target)?;
    let aux = sink
        .add_free_variable(OBJECTIVE_AUX_NAME, 1.0)
        .map_err(|code| NlError::SinkRejected {
            target,
            operation: "create the objective variable",
            code,
        })?;
    let name = row_name(target);

    sink.add_nonlinear_constraint(NonlinearRow {
        name: name.clone(),
        expression,
        handles,
        linear: smallvec![(aux, -1.0)],
        lhs: 0.0,
        rhs: 0.0,
    })
    .map_err(|code| NlError::SinkRejected {
        target,
        operation: "add the nonlinear objective",
        code,
    })?;

    debug!("Emitted nonlinear objective `{}` through `{}`", name, OBJECTIVE_AUX_NAME);
    Ok(name)
}
