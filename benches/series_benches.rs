use RustedTaylor::series_ODE::series_api::*;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn y_of(name: &str) -> Expr {
    Expr::func(name, Expr::var("x"))
}

fn bench_scalar(c: &mut Criterion) {
    // y' = 1 + y^2, y(0) = 0
    let eq = Equation::explicit(
        Expr::derivative(y_of("y"), "x", 1),
        Expr::one() + y_of("y").pow(Expr::int(2)),
    );
    let point = ExpansionPoint::new("x", Expr::zero());
    let ic = InitialCondition::value("y", Expr::zero(), Expr::zero());
    c.bench_function("scalar tan order 7", |b| {
        b.iter(|| solve_scalar(&eq, "y", "x", &point, black_box(7), &ic))
    });
}

fn bench_nth_order(c: &mut Criterion) {
    // y''' = x + y
    let eq = Equation::explicit(
        Expr::derivative(y_of("y"), "x", 3),
        Expr::var("x") + y_of("y"),
    );
    let point = ExpansionPoint::new("x", Expr::zero());
    let ics = vec![
        InitialCondition::value("y", Expr::zero(), Expr::one()),
        InitialCondition::derivative("y", 1, Expr::zero(), Expr::zero()),
        InitialCondition::derivative("y", 2, Expr::zero(), Expr::zero()),
    ];
    c.bench_function("third order forced order 10", |b| {
        b.iter(|| solve_nth_order(&eq, "y", "x", &point, black_box(10), &ics))
    });
}

fn bench_system(c: &mut Criterion) {
    // f' = f*g, g' = -f
    let eqs = vec![
        Equation::explicit(
            Expr::derivative(y_of("f"), "x", 1),
            y_of("f") * y_of("g"),
        ),
        Equation::explicit(Expr::derivative(y_of("g"), "x", 1), -y_of("f")),
    ];
    let dep_vars = vec!["f".to_string(), "g".to_string()];
    let point = ExpansionPoint::new("x", Expr::zero());
    let ics = vec![
        InitialCondition::value("f", Expr::zero(), Expr::one()),
        InitialCondition::value("g", Expr::zero(), Expr::zero()),
    ];
    let mut group = c.benchmark_group("coupled system order 6");
    group.bench_function("serial", |b| {
        b.iter(|| solve_system(&eqs, &dep_vars, "x", &point, black_box(6), &ics))
    });
    let parallel = TaylorSolver::new(SeriesConfig::new().with_parallel_system(true));
    group.bench_function("parallel", |b| {
        b.iter(|| parallel.solve_system(&eqs, &dep_vars, "x", &point, black_box(6), &ics))
    });
    group.finish();
}

criterion_group!(benches, bench_scalar, bench_nth_order, bench_system);
criterion_main!(benches);
