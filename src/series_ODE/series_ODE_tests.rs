use crate::series_ODE::config::SeriesConfig;
use crate::series_ODE::series_api::*;
use crate::series_ODE::trace::{RecordingTrace, TraceEvent};
use approx::assert_relative_eq;
use std::sync::Arc;

fn x() -> Expr {
    Expr::var("x")
}

fn f_of(name: &str) -> Expr {
    Expr::func(name, x())
}

fn d(name: &str, order: usize) -> Expr {
    Expr::derivative(f_of(name), "x", order)
}

fn at_zero() -> ExpansionPoint {
    ExpansionPoint::new("x", Expr::zero())
}

fn value_ic(name: &str, value: Expr) -> InitialCondition {
    InitialCondition::value(name, Expr::zero(), value)
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

//___________________________________SCALAR____________________________________

#[test]
fn test_exponential() {
    let eq = Equation::explicit(d("y", 1), f_of("y"));
    let ic = value_ic("y", Expr::one());
    let series = solve_scalar(&eq, "y", "x", &at_zero(), 4, &ic).unwrap();
    assert_eq!(series.to_string(), "1 + x + x^2/2 + x^3/6 + x^4/24");
    assert!(check_scalar(&eq, "y", "x", &at_zero(), 4, &ic, &series).unwrap());
}

#[test]
fn test_shifted_expansion_point() {
    // y' = x^2, y(1) = 2
    let eq = Equation::explicit(d("y", 1), x().pow(Expr::int(2)));
    let point = ExpansionPoint::new("x", Expr::one());
    let ic = InitialCondition::value("y", Expr::one(), Expr::int(2));
    let series = solve_scalar(&eq, "y", "x", &point, 4, &ic).unwrap();
    assert_eq!(series.to_string(), "2 + (x - 1) + (x - 1)^2 + (x - 1)^3/3");
    assert!(check_scalar(&eq, "y", "x", &point, 4, &ic, &series).unwrap());
}

#[test]
fn test_tangent_fifth_coefficient() {
    // y' = 1 + y^2, y(0) = 0 -> tan(x)
    let eq = Equation::explicit(d("y", 1), Expr::one() + f_of("y").pow(Expr::int(2)));
    let ic = value_ic("y", Expr::zero());
    let series = solve_scalar(&eq, "y", "x", &at_zero(), 5, &ic).unwrap();
    assert_eq!(series.to_string(), "x + x^3/3 + 2*x^5/15");
}

#[test]
fn test_square_root_rhs() {
    // y' = sqrt(1 - x^2), y(0) = 0
    let eq = Equation::explicit(d("y", 1), (Expr::one() - x().pow(Expr::int(2))).sqrt());
    let ic = value_ic("y", Expr::zero());
    let series = solve_scalar(&eq, "y", "x", &at_zero(), 5, &ic).unwrap();
    assert_eq!(series.to_string(), "x - x^3/6 - x^5/40");
}

#[test]
fn test_irrational_coefficients_cancel() {
    // y' = sqrt(y), y(0) = 2: y'' = 1/2 for every x
    let eq = Equation::explicit(d("y", 1), f_of("y").sqrt());
    let ic = value_ic("y", Expr::int(2));
    let series = solve_scalar(&eq, "y", "x", &at_zero(), 3, &ic).unwrap();
    assert_eq!(series.coefficient(0), Some(&Expr::int(2)));
    assert!(series.coefficient(1).unwrap().same_value(&Expr::int(2).sqrt()));
    assert_eq!(series.coefficient(2), Some(&Expr::rational(1, 4)));
    assert_eq!(series.coefficient(3), Some(&Expr::zero()));
    assert_eq!(series.nonzero_terms(), 3);
    assert!(check_scalar(&eq, "y", "x", &at_zero(), 3, &ic, &series).unwrap());
}

#[test]
fn test_elementary_right_hand_sides() {
    // y' = cos(x) -> sin(x)
    let eq = Equation::explicit(d("y", 1), Expr::cos(x().boxed()));
    let ic = value_ic("y", Expr::zero());
    let series = solve_scalar(&eq, "y", "x", &at_zero(), 5, &ic).unwrap();
    assert_eq!(series.to_string(), "x - x^3/6 + x^5/120");
    // y' = 1/(1 + x^2) -> arctg(x)
    let eq = Equation::explicit(d("y", 1), Expr::one() / (Expr::one() + x().pow(Expr::int(2))));
    let series = solve_scalar(&eq, "y", "x", &at_zero(), 5, &ic).unwrap();
    assert_eq!(series.to_string(), "x - x^3/3 + x^5/5");
}

#[test]
fn test_more_right_hand_sides() {
    let ic = value_ic("y", Expr::zero());
    // y' = 1/sqrt(1 - x^2) -> arcsin(x)
    let eq = Equation::explicit(
        d("y", 1),
        Expr::one() / (Expr::one() - x().pow(Expr::int(2))).sqrt(),
    );
    let series = solve_scalar(&eq, "y", "x", &at_zero(), 5, &ic).unwrap();
    assert_eq!(series.to_string(), "x + x^3/6 + 3*x^5/40");
    // y' = y + sin(x) -> (exp(x) - sin(x) - cos(x))/2
    let eq = Equation::explicit(d("y", 1), f_of("y") + Expr::sin(x().boxed()));
    let series = solve_scalar(&eq, "y", "x", &at_zero(), 4, &ic).unwrap();
    assert_eq!(series.to_string(), "x^2/2 + x^3/6");
    // y' = y^2, y(0) = 1 -> 1/(1 - x)
    let eq = Equation::explicit(d("y", 1), f_of("y").pow(Expr::int(2)));
    let one = value_ic("y", Expr::one());
    let series = solve_scalar(&eq, "y", "x", &at_zero(), 4, &one).unwrap();
    assert_eq!(series.to_string(), "1 + x + x^2 + x^3 + x^4");
    assert!(check_scalar(&eq, "y", "x", &at_zero(), 4, &one, &series).unwrap());
}

#[test]
fn test_implicit_form_is_isolated() {
    // y' - x*y = 0, y(0) = 1 -> exp(x^2/2)
    let eq = Equation::homogeneous(d("y", 1) - x() * f_of("y"));
    let ic = value_ic("y", Expr::one());
    let series = solve_scalar(&eq, "y", "x", &at_zero(), 4, &ic).unwrap();
    assert_eq!(series.to_string(), "1 + x^2/2 + x^4/8");
}

#[test]
fn test_symbolic_parameter() {
    // y' = a*y, y(0) = 1
    let a = Expr::var("a");
    let eq = Equation::explicit(d("y", 1), a.clone() * f_of("y"));
    let ic = value_ic("y", Expr::one());
    let series = solve_scalar(&eq, "y", "x", &at_zero(), 3, &ic).unwrap();
    assert!(series.coefficient(1).unwrap().same_value(&a));
    let half_a2 = Expr::rational(1, 2) * a.clone().pow(Expr::int(2));
    assert!(series.coefficient(2).unwrap().same_value(&half_a2));
    let sixth_a3 = Expr::rational(1, 6) * a.pow(Expr::int(3));
    assert!(series.coefficient(3).unwrap().same_value(&sixth_a3));
    assert_eq!(series.evaluate(0.5), None);
}

#[test]
fn test_numeric_evaluation() {
    let eq = Equation::explicit(d("y", 1), f_of("y"));
    let ic = value_ic("y", Expr::one());
    let series = solve_scalar(&eq, "y", "x", &at_zero(), 10, &ic).unwrap();
    assert_relative_eq!(series.evaluate(0.5).unwrap(), 0.5f64.exp(), epsilon = 1e-8);
    assert_eq!(series.nonzero_terms(), 11);
    // a_0 = a_1 = 1
    assert_eq!(series.distinct_coefficients(), 10);
    assert!(series.distinct_coefficients() <= series.nonzero_terms());
}

#[test]
fn test_order_zero() {
    let eq = Equation::explicit(d("y", 1), f_of("y"));
    let ic = value_ic("y", Expr::int(3));
    let series = solve_scalar(&eq, "y", "x", &at_zero(), 0, &ic).unwrap();
    assert_eq!(series.to_string(), "3");
    assert_eq!(series.order(), 0);

    let eq = Equation::explicit(d("y", 2), -f_of("y"));
    let ics = vec![
        value_ic("y", Expr::int(1)),
        InitialCondition::derivative("y", 1, Expr::zero(), Expr::int(4)),
    ];
    let series = solve_nth_order(&eq, "y", "x", &at_zero(), 0, &ics).unwrap();
    assert_eq!(series.to_string(), "1");

    let eqs = vec![
        Equation::explicit(d("f", 1), f_of("g")),
        Equation::explicit(d("g", 1), -f_of("f")),
    ];
    let ics = vec![value_ic("f", Expr::int(0)), value_ic("g", Expr::int(1))];
    let series = solve_system(&eqs, &names(&["f", "g"]), "x", &at_zero(), 0, &ics).unwrap();
    assert_eq!(series[0].to_string(), "0");
    assert_eq!(series[1].to_string(), "1");
}

//___________________________________N-TH ORDER____________________________________

#[test]
fn test_harmonic_oscillator() {
    let eq = Equation::explicit(d("y", 2), -f_of("y"));
    let ics = vec![
        value_ic("y", Expr::one()),
        InitialCondition::derivative("y", 1, Expr::zero(), Expr::zero()),
    ];
    let series = solve_nth_order(&eq, "y", "x", &at_zero(), 6, &ics).unwrap();
    assert_eq!(series.to_string(), "1 - x^2/2 + x^4/24 - x^6/720");
    assert!(check_nth_order(&eq, "y", "x", &at_zero(), 6, &ics, &series).unwrap());
}

#[test]
fn test_third_order_polynomial_solution() {
    let eq = Equation::explicit(d("y", 3), Expr::zero());
    let ics = vec![
        value_ic("y", Expr::int(1)),
        InitialCondition::derivative("y", 1, Expr::zero(), Expr::int(2)),
        InitialCondition::derivative("y", 2, Expr::zero(), Expr::int(3)),
    ];
    let series = solve_nth_order(&eq, "y", "x", &at_zero(), 3, &ics).unwrap();
    assert_eq!(series.to_string(), "1 + 2*x + 3*x^2/2");
    assert_eq!(series.coefficient(3), Some(&Expr::zero()));
}

#[test]
fn test_third_order_forced() {
    // y''' = x + y, y(0) = 1, y'(0) = y''(0) = 0
    let eq = Equation::explicit(d("y", 3), x() + f_of("y"));
    let ics = vec![
        value_ic("y", Expr::int(1)),
        InitialCondition::derivative("y", 1, Expr::zero(), Expr::zero()),
        InitialCondition::derivative("y", 2, Expr::zero(), Expr::zero()),
    ];
    let series = solve_nth_order(&eq, "y", "x", &at_zero(), 6, &ics).unwrap();
    assert_eq!(series.to_string(), "1 + x^3/6 + x^4/24 + x^6/720");
    assert!(check_nth_order(&eq, "y", "x", &at_zero(), 6, &ics, &series).unwrap());
}

#[test]
fn test_nth_order_accepts_first_order_equation() {
    let eq = Equation::explicit(d("y", 1), f_of("y"));
    let ics = vec![value_ic("y", Expr::one())];
    let series = solve_nth_order(&eq, "y", "x", &at_zero(), 3, &ics).unwrap();
    assert_eq!(series.to_string(), "1 + x + x^2/2 + x^3/6");
}

//___________________________________SYSTEMS____________________________________

#[test]
fn test_rotation_system() {
    let eqs = vec![
        Equation::explicit(d("f", 1), f_of("g")),
        Equation::explicit(d("g", 1), -f_of("f")),
    ];
    let dep_vars = names(&["f", "g"]);
    let ics = vec![value_ic("f", Expr::int(0)), value_ic("g", Expr::int(1))];
    let series = solve_system(&eqs, &dep_vars, "x", &at_zero(), 5, &ics).unwrap();
    assert_eq!(series[0].to_string(), "x - x^3/6 + x^5/120");
    assert_eq!(series[1].to_string(), "1 - x^2/2 + x^4/24");
    assert!(check_system(&eqs, &dep_vars, "x", &at_zero(), 5, &ics, &series).unwrap());
}

#[test]
fn test_rotation_system_in_reverse_order() {
    // the equation for g is listed first
    let eqs = vec![
        Equation::explicit(d("g", 1), -f_of("f")),
        Equation::explicit(d("f", 1), f_of("g")),
    ];
    let dep_vars = names(&["f", "g"]);
    let ics = vec![value_ic("f", Expr::int(0)), value_ic("g", Expr::int(1))];
    let series = solve_system(&eqs, &dep_vars, "x", &at_zero(), 5, &ics).unwrap();
    assert_eq!(series[0].to_string(), "x - x^3/6 + x^5/120");
    assert_eq!(series[1].to_string(), "1 - x^2/2 + x^4/24");
    assert!(check_system(&eqs, &dep_vars, "x", &at_zero(), 5, &ics, &series).unwrap());
}

#[test]
fn test_coupled_exponential_system() {
    // f' = f + g, g' = f + g, f(0) = 1, g(0) = 0
    let sum = f_of("f") + f_of("g");
    let eqs = vec![
        Equation::explicit(d("f", 1), sum.clone()),
        Equation::explicit(d("g", 1), sum),
    ];
    let dep_vars = names(&["f", "g"]);
    let ics = vec![value_ic("f", Expr::one()), value_ic("g", Expr::zero())];
    let series = solve_system(&eqs, &dep_vars, "x", &at_zero(), 5, &ics).unwrap();
    assert_eq!(
        series[0].to_string(),
        "1 + x + x^2 + 2*x^3/3 + x^4/3 + 2*x^5/15"
    );
    assert_eq!(series[1].to_string(), "x + x^2 + 2*x^3/3 + x^4/3 + 2*x^5/15");
    assert_eq!(series[0].coefficient(5), Some(&Expr::rational(2, 15)));
    assert!(check_system(&eqs, &dep_vars, "x", &at_zero(), 5, &ics, &series).unwrap());
}

#[test]
fn test_three_component_cycle() {
    // f' = g, g' = h, h' = f, all starting at 1 -> exp(x) each
    let eqs = vec![
        Equation::explicit(d("f", 1), f_of("g")),
        Equation::explicit(d("g", 1), f_of("h")),
        Equation::explicit(d("h", 1), f_of("f")),
    ];
    let dep_vars = names(&["f", "g", "h"]);
    let ics = vec![
        value_ic("f", Expr::one()),
        value_ic("g", Expr::one()),
        value_ic("h", Expr::one()),
    ];
    let series = solve_system(&eqs, &dep_vars, "x", &at_zero(), 3, &ics).unwrap();
    for s in &series {
        assert_eq!(s.to_string(), "1 + x + x^2/2 + x^3/6");
    }
}

#[test]
fn test_nonlinear_coupling() {
    // f' = f*g, g' = -f, f(0) = 1, g(0) = 0
    let eqs = vec![
        Equation::explicit(d("f", 1), f_of("f") * f_of("g")),
        Equation::explicit(d("g", 1), -f_of("f")),
    ];
    let dep_vars = names(&["f", "g"]);
    let ics = vec![value_ic("f", Expr::one()), value_ic("g", Expr::zero())];
    let series = solve_system(&eqs, &dep_vars, "x", &at_zero(), 3, &ics).unwrap();
    assert_eq!(series[0].to_string(), "1 - x^2/2");
    assert_eq!(series[1].to_string(), "-x + x^3/6");
    assert!(check_system(&eqs, &dep_vars, "x", &at_zero(), 3, &ics, &series).unwrap());
}

#[test]
fn test_parallel_system_matches_serial() {
    let eqs = vec![
        Equation::explicit(d("f", 1), f_of("f") * f_of("g")),
        Equation::explicit(d("g", 1), -f_of("f")),
    ];
    let dep_vars = names(&["f", "g"]);
    let ics = vec![value_ic("f", Expr::one()), value_ic("g", Expr::zero())];
    let serial = solve_system(&eqs, &dep_vars, "x", &at_zero(), 5, &ics).unwrap();
    let solver = TaylorSolver::new(SeriesConfig::new().with_parallel_system(true));
    let parallel = solver
        .solve_system(&eqs, &dep_vars, "x", &at_zero(), 5, &ics)
        .unwrap();
    assert_eq!(serial, parallel);
}

//___________________________________CHECKS____________________________________

#[test]
fn test_check_rejects_wrong_series() {
    let eq = Equation::explicit(d("y", 1), f_of("y"));
    let ic = value_ic("y", Expr::one());
    let wrong = SeriesPolynomial::from_coefficients(
        "y",
        "x",
        Expr::zero(),
        vec![Expr::one(), Expr::one(), Expr::one()],
    );
    assert!(!check_scalar(&eq, "y", "x", &at_zero(), 2, &ic, &wrong).unwrap());
    // right recursion, wrong initial value
    let shifted = SeriesPolynomial::from_coefficients(
        "y",
        "x",
        Expr::zero(),
        vec![Expr::int(2), Expr::int(2), Expr::int(1)],
    );
    assert!(!check_scalar(&eq, "y", "x", &at_zero(), 2, &ic, &shifted).unwrap());
}

#[test]
fn test_check_nth_order_with_low_order_is_vacuous() {
    let eq = Equation::explicit(d("y", 2), -f_of("y"));
    let ics = vec![
        value_ic("y", Expr::one()),
        InitialCondition::derivative("y", 1, Expr::zero(), Expr::zero()),
    ];
    let series = SeriesPolynomial::from_coefficients("y", "x", Expr::zero(), vec![Expr::one()]);
    assert!(check_nth_order(&eq, "y", "x", &at_zero(), 1, &ics, &series).unwrap());
}

//___________________________________ERRORS____________________________________

#[test]
fn test_invalid_inputs() {
    let eq = Equation::explicit(d("y", 1), f_of("y"));
    let ic = value_ic("y", Expr::one());
    let err = solve_scalar(&eq, "y", "x", &at_zero(), -1, &ic).unwrap_err();
    assert!(matches!(err, SeriesError::InputValidation(_)));
    // second order equation given to the scalar solver
    let second = Equation::explicit(d("y", 2), f_of("y"));
    let err = solve_scalar(&second, "y", "x", &at_zero(), 3, &ic).unwrap_err();
    assert!(matches!(err, SeriesError::InputValidation(_)));
    // one initial condition for a second order equation
    let err = solve_nth_order(&second, "y", "x", &at_zero(), 3, &[ic.clone()]).unwrap_err();
    assert!(matches!(err, SeriesError::InputValidation(_)));
    // dependent function applied to something other than x
    let odd = Equation::explicit(d("y", 1), Expr::func("y", Expr::int(2) * x()));
    let err = solve_scalar(&odd, "y", "x", &at_zero(), 3, &ic).unwrap_err();
    assert!(matches!(err, SeriesError::InputValidation(_)));
    // initial condition at another point
    let elsewhere = InitialCondition::value("y", Expr::one(), Expr::one());
    let err = solve_scalar(&eq, "y", "x", &at_zero(), 3, &elsewhere).unwrap_err();
    assert!(matches!(err, SeriesError::InputValidation(_)));
}

#[test]
fn test_nonlinear_in_highest_derivative() {
    // y'^2 = y cannot be made explicit
    let eq = Equation::new(d("y", 1).pow(Expr::int(2)), f_of("y"));
    let ic = value_ic("y", Expr::one());
    let err = solve_scalar(&eq, "y", "x", &at_zero(), 3, &ic).unwrap_err();
    assert!(matches!(err, SeriesError::Isolation { .. }));
    assert!(!err.is_defect());
}

#[test]
fn test_nth_order_initial_condition_elsewhere() {
    // y'' = -y with y'(1) given while expanding around 0
    let eq = Equation::explicit(d("y", 2), -f_of("y"));
    let ics = vec![
        value_ic("y", Expr::zero()),
        InitialCondition::derivative("y", 1, Expr::one(), Expr::one()),
    ];
    let err = solve_nth_order(&eq, "y", "x", &at_zero(), 4, &ics).unwrap_err();
    assert!(matches!(err, SeriesError::InputValidation(_)));
}

#[test]
fn test_system_input_mismatches() {
    let eqs = vec![
        Equation::explicit(d("f", 1), f_of("g")),
        Equation::explicit(d("g", 1), -f_of("f")),
    ];
    let dep_vars = names(&["f", "g"]);
    let ics = vec![value_ic("f", Expr::int(0)), value_ic("g", Expr::int(1))];
    // three equations for two functions
    let mut extra = eqs.clone();
    extra.push(Equation::explicit(d("f", 1), f_of("g")));
    let err = solve_system(&extra, &dep_vars, "x", &at_zero(), 3, &ics).unwrap_err();
    assert!(matches!(err, SeriesError::InputValidation(_)));
    // one initial condition for two functions
    let err = solve_system(&eqs, &dep_vars, "x", &at_zero(), 3, &ics[..1]).unwrap_err();
    assert!(matches!(err, SeriesError::InputValidation(_)));
    // g(1) given while expanding around 0
    let elsewhere = vec![
        value_ic("f", Expr::int(0)),
        InitialCondition::value("g", Expr::one(), Expr::int(1)),
    ];
    let err = solve_system(&eqs, &dep_vars, "x", &at_zero(), 3, &elsewhere).unwrap_err();
    assert!(matches!(err, SeriesError::InputValidation(_)));
}

#[test]
fn test_missing_derivative_is_detection_error() {
    let eq = Equation::new(f_of("y"), x());
    let ics = vec![value_ic("y", Expr::one())];
    let err = solve_nth_order(&eq, "y", "x", &at_zero(), 3, &ics).unwrap_err();
    assert!(matches!(err, SeriesError::Detection(_)));
}

#[test]
fn test_singular_rhs_at_expansion_point() {
    let eq = Equation::explicit(d("y", 1), Expr::one() / x());
    let ic = value_ic("y", Expr::one());
    let err = solve_scalar(&eq, "y", "x", &at_zero(), 2, &ic).unwrap_err();
    assert!(matches!(err, SeriesError::InputValidation(_)));
}

#[test]
fn test_system_rejects_second_order_component() {
    let eqs = vec![
        Equation::explicit(d("f", 2), f_of("g")),
        Equation::explicit(d("g", 1), -f_of("f")),
    ];
    let ics = vec![value_ic("f", Expr::int(0)), value_ic("g", Expr::int(1))];
    let err = solve_system(&eqs, &names(&["f", "g"]), "x", &at_zero(), 3, &ics).unwrap_err();
    assert!(matches!(err, SeriesError::InputValidation(_)));
}

//___________________________________TRACE____________________________________

#[test]
fn test_trace_records_pipeline() {
    let trace = Arc::new(RecordingTrace::new());
    let solver = TaylorSolver::default().with_trace(Box::new(trace.clone()));
    let eq = Equation::explicit(d("y", 1), f_of("y"));
    let ic = value_ic("y", Expr::one());
    let series = solver.solve_scalar(&eq, "y", "x", &at_zero(), 3, &ic).unwrap();
    assert_eq!(series.order(), 3);
    let events = trace.events();
    assert!(matches!(events[0], TraceEvent::Canonical { .. }));
    assert!(
        events
            .iter()
            .any(|e| matches!(e, TraceEvent::RhsIsolated { order: 1, .. }))
    );
    let coefficients = events
        .iter()
        .filter(|e| matches!(e, TraceEvent::Coefficient { .. }))
        .count();
    assert_eq!(coefficients, 3);
    assert!(events.contains(&TraceEvent::Coefficient {
        function: "y".to_string(),
        power: 3,
        value: Expr::rational(1, 6).to_string(),
    }));
}
