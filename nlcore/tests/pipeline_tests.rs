use nlcore::{
    compiler::{Compiler, NonlinearInput},
    provider::{ConstraintSink, NonlinearRow, ToleranceProvider, VariableProvider},
    utils::error::{NlError, Target},
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Problem whose variables are addressed by name.
#[derive(Default)]
struct NamedProblem {
    variables: Vec<String>,
    rows: Vec<NonlinearRow<usize>>,
    objective: Vec<(usize, f64)>,
}

impl NamedProblem {
    fn new(names: &[&str]) -> Self {
        Self {
            variables: names.iter().map(|name| name.to_string()).collect(),
            ..Default::default()
        }
    }
}

impl VariableProvider for NamedProblem {
    type Handle = usize;

    fn variable_count(&self) -> usize {
        self.variables.len()
    }

    fn variable(&self, index: usize) -> Option<usize> {
        (index < self.variables.len()).then_some(index)
    }
}

impl ToleranceProvider for NamedProblem {
    fn feasibility_tolerance(&self) -> f64 {
        1e-9
    }
}

impl ConstraintSink for NamedProblem {
    fn infinity(&self) -> f64 {
        1e30
    }

    fn add_free_variable(&mut self, name: &str, objective: f64) -> Result<usize, i32> {
        self.variables.push(name.to_string());
        let handle = self.variables.len() - 1;
        self.objective.push((handle, objective));
        Ok(handle)
    }

    fn add_nonlinear_constraint(&mut self, row: NonlinearRow<usize>) -> Result<(), i32> {
        self.rows.push(row);
        Ok(())
    }
}

const PROBLEM: &str = r#"
# (1 - x)^2 + 100 * (y - x^2)^2
objective = [0, 1, 1, 0, 6, 0, 2, 9, 0, 100, 1, 1, 1, 0, 7, 6, 7, 3, 5]

# sin(x) + y <= 2
[[constraints]]
instructions = [1, 0, 12, 1, 1, 5]
lhs = -inf
rhs = 2.0

# 1 <= x * y - 3 <= 4
[[constraints]]
instructions = [1, 0, 1, 1, 3, 0, 3, 6]
lhs = 1.0
rhs = 4.0

[validation]
point = [1.0, 1.0]
constraint_values = [1.8414709848078965, -2.0]
objective_value = 0.0
"#;

#[test]
fn toml_problem_compiles_and_validates() {
    let input: NonlinearInput = toml::from_str(PROBLEM).unwrap();
    let mut problem = NamedProblem::new(&["x", "y"]);

    let report = Compiler::default().compile_into(&input, &mut problem).unwrap();
    assert!(report.is_clean(), "{:?}", report.warnings);
    assert_eq!(
        report.names().collect::<Vec<_>>(),
        vec!["NonlinearExp0", "NonlinearExp1", "NonlinearObj0"]
    );

    assert_eq!(problem.rows[0].lhs, -1e30);
    assert_eq!(problem.variables, vec!["x", "y", "nlobj"]);
    assert_eq!(problem.objective, vec![(2, 1.0)]);
    assert_eq!(problem.rows[2].linear.as_slice(), &[(2, -1.0)]);
    assert_eq!(problem.rows[2].expression.evaluate(&[0.0, 0.0]).unwrap(), 1.0);
}

#[test]
fn wrong_expectations_only_warn() {
    let mut input: NonlinearInput = toml::from_str(PROBLEM).unwrap();
    if let Some(validation) = input.validation.as_mut() {
        validation.objective_value = Some(1.0);
    }
    let mut problem = NamedProblem::new(&["x", "y"]);

    let report = Compiler::default().compile_into(&input, &mut problem).unwrap();
    assert_eq!(report.warnings.len(), 1);
    assert!(matches!(
        report.warnings[0],
        NlError::ValidationMismatch {
            target: Target::Objective(0),
            ..
        }
    ));
    assert_eq!(problem.rows.len(), 3);
}

#[test]
fn random_points_validate_against_direct_evaluation() {
    let mut rng = ChaCha20Rng::seed_from_u64(7);
    let base: NonlinearInput = toml::from_str(PROBLEM).unwrap();

    for _ in 0..50 {
        let (x, y): (f64, f64) = (rng.random_range(-3.0..3.0), rng.random_range(-3.0..3.0));
        let mut input = base.clone();
        if let Some(validation) = input.validation.as_mut() {
            validation.point = vec![x, y];
            validation.constraint_values = vec![x.sin() + y, x * y - 3.0];
            validation.objective_value = Some((1.0 - x).powf(2.0) + 100.0 * ((y - x * x) * (y - x * x)));
        }

        let mut problem = NamedProblem::new(&["x", "y"]);
        let report = Compiler::default().compile_into(&input, &mut problem).unwrap();
        assert!(report.is_clean(), "x = {x}, y = {y}: {:?}", report.warnings);
    }
}
