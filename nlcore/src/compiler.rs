//! Problem-level pipeline: compile every nonlinear stream of a problem,
//! optionally validate it against a reference point, and emit it.
use log::{debug, info, warn};
use nlinstr::{BuildOptions, Expression, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    emitter::{emit_constraint, emit_objective},
    provider::{ConstraintSink, ToleranceProvider},
    utils::{
        conf::CompilerConfig,
        error::{NlError, NlResult, Target},
    },
};

/// One bounded nonlinear constraint `lhs <= f(x) <= rhs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintInput {
    pub instructions: Vec<f64>,
    pub lhs: f64,
    pub rhs: f64,
}

/// Reference point and the values the expressions are expected to take there.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationInput {
    pub point: Vec<f64>,
    /// One expected value per constraint.
    #[serde(default)]
    pub constraint_values: Vec<f64>,
    #[serde(default)]
    pub objective_value: Option<f64>,
}

/// Nonlinear part of an optimization problem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NonlinearInput {
    #[serde(default)]
    pub constraints: Vec<ConstraintInput>,
    #[serde(default)]
    pub objective: Option<Vec<f64>>,
    #[serde(default)]
    pub validation: Option<ValidationInput>,
}

impl NonlinearInput {
    /// Check that the validation record lines up with the streams.
    pub fn check(&self) -> NlResult<()> {
        let Some(validation) = &self.validation else {
            return Ok(());
        };

        if validation.constraint_values.len() != self.constraints.len() {
            return Err(NlError::InvalidInput(format!(
                "{} expected constraint values were given for {} nonlinear constraints",
                validation.constraint_values.len(),
                self.constraints.len()
            )));
        }
        if validation.objective_value.is_some() && self.objective.is_none() {
            return Err(NlError::InvalidInput(
                "an expected objective value was given without a nonlinear objective".to_string(),
            ));
        }
        Ok(())
    }

    fn expected(&self, target: Target) -> Option<(&[f64], f64)> {
        let validation = self.validation.as_ref()?;
        let expected = match target {
            Target::Constraint(index) => *validation.constraint_values.get(index)?,
            Target::Objective(_) => validation.objective_value?,
        };
        Some((&validation.point, expected))
    }
}

/// Outcome for one compiled constraint or objective.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTarget {
    pub target: Target,
    /// Name of the emitted row.
    pub name: String,
    pub node_count: usize,
    /// Value at the validation point, when validation ran.
    pub value: Option<f64>,
}

#[derive(Debug, Default)]
pub struct CompileReport {
    pub targets: Vec<CompiledTarget>,
    /// Non-fatal validation mismatches ([`NlError::ValidationMismatch`]).
    pub warnings: Vec<NlError>,
}

impl CompileReport {
    pub fn constraint_count(&self) -> usize {
        self.targets.iter().filter(|t| t.target.is_constraint()).count()
    }

    pub fn has_objective(&self) -> bool {
        self.targets.iter().any(|t| t.target.is_objective())
    }

    /// Names of the emitted rows, in emission order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(|t| t.name.as_str())
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Compiler {
    pub config: CompilerConfig,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    /// Tolerance from the configuration, else from the problem.
    pub fn tolerance<P: ToleranceProvider + ?Sized>(&self, problem: &P) -> f64 {
        self.config
            .feasibility_tolerance
            .unwrap_or_else(|| problem.feasibility_tolerance())
    }

    pub fn build_options(&self, tolerance: f64, variable_count: usize) -> BuildOptions {
        BuildOptions {
            max_depth: self.config.max_depth,
            zero_tolerance: tolerance,
            variable_count: Some(variable_count),
        }
    }

    /// Compile one stream, attributing any failure to `target`.
    pub fn compile_expression(
        &self,
        tokens: &[f64],
        target: Target,
        options: &BuildOptions,
    ) -> NlResult<Expression> {
        let expression =
            nlinstr::compile(tokens, options).map_err(|source| NlError::Compile { target, source })?;
        debug!("Compiled nonlinear {}: {}", target, expression);
        Ok(expression)
    }

    /// Evaluate `expression` at `point` and compare with `expected`.
    ///
    /// Evaluation errors are fatal; a mismatch is returned as a warning.
    pub fn validate(
        &self,
        expression: &Expression,
        target: Target,
        point: &[f64],
        expected: f64,
        tolerance: f64,
    ) -> NlResult<(f64, Option<NlError>)> {
        let outcome = expression
            .validate(point, expected, tolerance)
            .map_err(|source| NlError::Compile { target, source })?;

        match outcome {
            Validation::Passed { value } => Ok((value, None)),
            Validation::Mismatch {
                value,
                expected,
                difference,
            } => {
                warn!(
                    "Nonlinear {} evaluates to {} at the validation point, expected {} (difference {} > {})",
                    target, value, expected, difference, tolerance
                );
                Ok((
                    value,
                    Some(NlError::ValidationMismatch {
                        target,
                        value,
                        expected,
                        difference,
                    }),
                ))
            }
        }
    }

    /// Compile, validate and emit every nonlinear stream of `input` into
    /// `problem`. Stops at the first fatal error.
    pub fn compile_into<S>(&self, input: &NonlinearInput, problem: &mut S) -> NlResult<CompileReport>
    where
        S: ConstraintSink + ToleranceProvider + ?Sized,
    {
        input.check()?;

        let tolerance = self.tolerance(&*problem);
        let options = self.build_options(tolerance, problem.variable_count());
        let mut report = CompileReport::default();

        let objective = input
            .objective
            .as_ref()
            .map(|tokens| (Target::Objective(0), tokens.as_slice(), 0.0, 0.0));
        let constraints = input
            .constraints
            .iter()
            .enumerate()
            .map(|(i, c)| (Target::Constraint(i), c.instructions.as_slice(), c.lhs, c.rhs));

        for (target, tokens, lhs, rhs) in constraints.chain(objective) {
            let expression = self.compile_expression(tokens, target, &options)?;
            let node_count = expression.len();

            let mut value = None;
            if self.config.validate {
                if let Some((point, expected)) = input.expected(target) {
                    let (evaluated, warning) =
                        self.validate(&expression, target, point, expected, tolerance)?;
                    value = Some(evaluated);
                    report.warnings.extend(warning);
                }
            }

            let name = match target {
                Target::Constraint(index) => emit_constraint(&mut *problem, expression, index, lhs, rhs)?,
                Target::Objective(index) => emit_objective(&mut *problem, expression, index)?,
            };

            report.targets.push(CompiledTarget {
                target,
                name,
                node_count,
                value,
            });
        }

        info!(
            "Compiled {} nonlinear constraints{} ({} validation warnings)",
            report.constraint_count(),
            if report.has_objective() { " and a nonlinear objective" } else { "" },
            report.warnings.len()
        );

        Ok(report)
    }
}
