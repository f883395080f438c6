//! Randomized conformance suite: random expression trees are serialized to
//! postfix streams, compiled, and compared against a direct evaluation of the
//! tree at the same point.
use nlinstr::{BuildOptions, Opcode, compile};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

const VARIABLES: usize = 4;

#[derive(Debug, Clone)]
enum Tree {
    Num(f64),
    Var(usize),
    Binary(Opcode, Box<Tree>, Box<Tree>),
    Unary(Opcode, Box<Tree>),
    Pow(Box<Tree>, f64),
}

impl Tree {
    fn random<R: Rng>(budget: usize, rng: &mut R) -> Tree {
        if budget == 0 || rng.random_bool(0.25) {
            return if rng.random_bool(0.3) {
                Tree::Num(rng.random_range(0.5..3.0))
            } else {
                Tree::Var(rng.random_range(0..VARIABLES))
            };
        }

        let child = |rng: &mut R| Box::new(Tree::random(budget - 1, rng));
        match rng.random_range(0..=9) {
            0 => Tree::Binary(Opcode::Add, child(rng), child(rng)),
            1 => Tree::Binary(Opcode::Sub, child(rng), child(rng)),
            2 => Tree::Binary(Opcode::Mul, child(rng), child(rng)),
            // a / (b^2 + 1)
            3 => {
                let (lhs, rhs) = (child(rng), child(rng));
                let denominator = Tree::Binary(
                    Opcode::Add,
                    Box::new(Tree::Unary(Opcode::Square, rhs)),
                    Box::new(Tree::Num(1.0)),
                );
                Tree::Binary(Opcode::Div, lhs, Box::new(denominator))
            }
            4 => {
                let base = child(rng);
                let exponent = if rng.random_bool(0.5) { 2.0 } else { 3.0 };
                Tree::Pow(base, exponent)
            }
            // sqrt(|a| + 1) and log(|a| + 1)
            5 | 6 => {
                let opcode = if rng.random_bool(0.5) { Opcode::Sqrt } else { Opcode::Log };
                let shifted = Tree::Binary(
                    Opcode::Add,
                    Box::new(Tree::Unary(Opcode::Abs, child(rng))),
                    Box::new(Tree::Num(1.0)),
                );
                Tree::Unary(opcode, Box::new(shifted))
            }
            // exp(sin(a))
            7 => Tree::Unary(
                Opcode::Exp,
                Box::new(Tree::Unary(Opcode::Sin, child(rng))),
            ),
            8 => Tree::Unary(Opcode::Cos, child(rng)),
            _ => Tree::Unary(Opcode::Abs, child(rng)),
        }
    }

    fn write_postfix(&self, out: &mut Vec<f64>) {
        match self {
            Tree::Num(value) => out.extend([Opcode::Num.to_token(), *value]),
            Tree::Var(index) => out.extend([Opcode::Var.to_token(), *index as f64]),
            Tree::Binary(opcode, lhs, rhs) => {
                lhs.write_postfix(out);
                rhs.write_postfix(out);
                out.push(opcode.to_token());
            }
            Tree::Unary(opcode, child) => {
                child.write_postfix(out);
                out.push(opcode.to_token());
            }
            Tree::Pow(base, exponent) => {
                base.write_postfix(out);
                out.extend([Opcode::Num.to_token(), *exponent, Opcode::Pow.to_token()]);
            }
        }
    }

    fn evaluate(&self, point: &[f64]) -> f64 {
        match self {
            Tree::Num(value) => *value,
            Tree::Var(index) => point[*index],
            Tree::Binary(opcode, lhs, rhs) => {
                let (a, b) = (lhs.evaluate(point), rhs.evaluate(point));
                match opcode {
                    Opcode::Add => a + b,
                    Opcode::Sub => a - b,
                    Opcode::Mul => a * b,
                    Opcode::Div => a / b,
                    other => unreachable!("{other} is not generated as a binary operator"),
                }
            }
            Tree::Unary(opcode, child) => {
                let a = child.evaluate(point);
                match opcode {
                    Opcode::Square => a * a,
                    Opcode::Sqrt => a.sqrt(),
                    Opcode::Log => a.ln(),
                    Opcode::Exp => a.exp(),
                    Opcode::Sin => a.sin(),
                    Opcode::Cos => a.cos(),
                    Opcode::Abs => a.abs(),
                    other => unreachable!("{other} is not generated as a function"),
                }
            }
            Tree::Pow(base, exponent) => base.evaluate(point).powf(*exponent),
        }
    }
}

#[test]
fn random_streams_compile_and_match_direct_evaluation() {
    let mut rng = ChaCha20Rng::seed_from_u64(0x5eed);
    let options = BuildOptions {
        variable_count: Some(VARIABLES),
        zero_tolerance: 0.0,
        ..Default::default()
    };

    for case in 0..500 {
        let tree = Tree::random(6, &mut rng);
        let mut tokens = Vec::new();
        tree.write_postfix(&mut tokens);

        let expr = compile(&tokens, &options)
            .unwrap_or_else(|err| panic!("case {case}: {err}\nstream: {tokens:?}\ntree: {tree:?}"));

        for _ in 0..4 {
            let point: Vec<f64> = (0..VARIABLES).map(|_| rng.random_range(-2.0..2.0)).collect();
            let expected = tree.evaluate(&point);
            let tolerance = 1e-9 * expected.abs().max(1.0);
            let outcome = expr
                .validate(&point, expected, tolerance)
                .unwrap_or_else(|err| panic!("case {case}: {err}\nexpression: {expr}"));
            assert!(
                outcome.is_passed(),
                "case {case}: {outcome:?}\nexpression: {expr}\ntree: {tree:?}\npoint: {point:?}"
            );
        }
    }
}

#[test]
fn random_streams_never_leave_pending_operands() {
    let mut rng = ChaCha20Rng::seed_from_u64(0x42);

    for _ in 0..200 {
        let tree = Tree::random(10, &mut rng);
        let mut tokens = Vec::new();
        tree.write_postfix(&mut tokens);

        match compile(&tokens, &BuildOptions::default()) {
            Ok(expr) => assert_eq!(expr.root().index(), expr.len() - 1),
            Err(err) => panic!("well-formed stream rejected: {err}"),
        }
    }
}
