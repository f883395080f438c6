use criterion::{Criterion, black_box, criterion_group, criterion_main};

use nlinstr::{BuildOptions, Opcode, compile, stream::decode};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

const VARIABLES: usize = 16;

fn simple_stream() -> Vec<f64> {
    // x0 * x1 + sqrt(x2)
    vec![
        Opcode::Var.to_token(),
        0.0,
        Opcode::Var.to_token(),
        1.0,
        Opcode::Mul.to_token(),
        Opcode::Var.to_token(),
        2.0,
        Opcode::Sqrt.to_token(),
        Opcode::Add.to_token(),
    ]
}

fn random_stream(budget: usize) -> Vec<f64> {
    // Seeded so every run measures the same expression.
    let mut rng = ChaCha20Rng::seed_from_u64(0x42);

    fn next_create(budget: usize, rng: &mut impl Rng, out: &mut Vec<f64>) {
        if budget == 0 || rng.random_bool(0.2) {
            if rng.random_bool(0.3) {
                out.extend([Opcode::Num.to_token(), rng.random_range(0.5..3.0)]);
            } else {
                let index = rng.random_range(0..VARIABLES);
                out.extend([Opcode::Var.to_token(), index as f64]);
            }
            return;
        }

        match rng.random_range(0..=5) {
            0..=2 => {
                next_create(budget - 1, rng, out);
                next_create(budget - 1, rng, out);
                let opcode = [Opcode::Add, Opcode::Sub, Opcode::Mul][rng.random_range(0..3)];
                out.push(opcode.to_token());
            }
            3 => {
                next_create(budget - 1, rng, out);
                out.extend([Opcode::Num.to_token(), 2.0, Opcode::Pow.to_token()]);
            }
            _ => {
                next_create(budget - 1, rng, out);
                let opcode = [Opcode::Sin, Opcode::Cos, Opcode::Abs][rng.random_range(0..3)];
                out.push(opcode.to_token());
            }
        }
    }

    let mut out = Vec::new();
    next_create(budget, &mut rng, &mut out);
    out
}

fn bench_decode(c: &mut Criterion) {
    let complex = random_stream(12);

    c.bench_function("decode_complex", |b| {
        b.iter(|| {
            black_box(decode(&complex).ok());
        })
    });
}

fn bench_compile(c: &mut Criterion) {
    let options = BuildOptions::default();
    let simple = simple_stream();
    let complex = random_stream(12);

    c.bench_function("compile_simple", |b| {
        b.iter(|| {
            black_box(compile(&simple, &options).ok());
        })
    });

    c.bench_function("compile_complex", |b| {
        b.iter(|| {
            black_box(compile(&complex, &options).ok());
        })
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let options = BuildOptions::default();
    let point: Vec<f64> = (0..VARIABLES).map(|i| 0.5 + i as f64 / 8.0).collect();
    let Ok(expr) = compile(&random_stream(12), &options) else {
        return;
    };

    c.bench_function("evaluate_complex", |b| {
        b.iter(|| {
            black_box(expr.evaluate(&point).ok());
        })
    });
}

criterion_group!(benches, bench_decode, bench_compile, bench_evaluate);
criterion_main!(benches);
