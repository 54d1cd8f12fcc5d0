//! Residual check of candidate series solutions.
//!
//! For each component the series S is differentiated symbolically first, then
//! `r(x) = S^(n)(x) - H(x, S, S', ...)` is built and `r, r', r'', ...` are evaluated at x0.
//! Bounds on the checked derivative orders:
//! - scalar first order: 0..order-1
//! - scalar n-th order: 0..order-n (nothing to check when order < n)
//! - system: 0..order-1 for every component
use crate::series_ODE::equation_form::{EquationForm, ExpansionPoint};
use crate::series_ODE::errors::SeriesError;
use crate::series_ODE::order_detector::structural_max_order;
use crate::series_ODE::rhs_extractor::{extract_rhs, extract_rhs_vector};
use crate::series_ODE::series_polynomial::SeriesPolynomial;
use crate::series_ODE::trace::{TraceEvent, TraceSink};
use crate::symbolic::symbolic_engine::Expr;
use log::{info, warn};

fn check_series_shape(
    series: &[SeriesPolynomial],
    form: &EquationForm,
    point: &ExpansionPoint,
) -> Result<(), SeriesError> {
    let dep_vars = form.dep_vars();
    if series.len() != dep_vars.len() {
        return Err(SeriesError::input(format!(
            "{} series given for {} dependent functions",
            series.len(),
            dep_vars.len()
        )));
    }
    for (s, dep) in series.iter().zip(&dep_vars) {
        if s.function() != dep {
            return Err(SeriesError::input(format!(
                "series of {} given where {} is expected",
                s.function(),
                dep
            )));
        }
        if s.var() != point.var || s.var() != form.indep_var() {
            return Err(SeriesError::input(format!(
                "series in {} does not match the independent variable {}",
                s.var(),
                form.indep_var()
            )));
        }
        if !s.center().same_value(&point.value) {
            return Err(SeriesError::input(format!(
                "series is centred at {}, the expansion point is {}",
                s.center(),
                point.value
            )));
        }
    }
    Ok(())
}

/// right-hand sides of the highest derivatives, one per component
fn right_hand_sides(form: &EquationForm) -> Result<(Vec<Expr>, usize), SeriesError> {
    let x = form.indep_var().to_string();
    let n = form.differential_order();
    let targets: Vec<Expr> = form
        .dep_vars()
        .iter()
        .map(|dep| Expr::derivative(Expr::func(dep, Expr::var(&x)), &x, n))
        .collect();
    let rhs = match form {
        EquationForm::System { equations, .. } => extract_rhs_vector(equations, &targets)?,
        _ => {
            let equation = form.equations()[0];
            vec![extract_rhs(equation, &targets[0])?]
        }
    };
    Ok((rhs, n))
}

/// Replaces every `f^(m)(x)` and `f(x)` in `expr` by the corresponding derivative of the series.
fn substitute_series(expr: &Expr, series: &[SeriesPolynomial], indep_var: &str) -> Expr {
    let mut current = expr.clone();
    let max_order = series
        .iter()
        .map(|s| structural_max_order(expr, s.function(), indep_var).unwrap_or(0))
        .max()
        .unwrap_or(0);
    for s in series {
        let f_x = Expr::func(s.function(), Expr::var(indep_var));
        let mut derivative = s.to_expr();
        let mut by_order = vec![derivative.clone()];
        for _ in 0..max_order {
            derivative = derivative.total_derivative(indep_var).simplify();
            by_order.push(derivative.clone());
        }
        for m in (1..=max_order).rev() {
            let node = Expr::derivative(f_x.clone(), indep_var, m);
            current = current.substitute_node(&node, &by_order[m]);
        }
        current = current.substitute_node(&f_x, &by_order[0]);
    }
    current
}

/// true if every residual derivative within the bound vanishes at the expansion point
pub fn check_residual(
    series: &[SeriesPolynomial],
    form: &EquationForm,
    point: &ExpansionPoint,
    order: usize,
    trace: &dyn TraceSink,
) -> Result<bool, SeriesError> {
    check_series_shape(series, form, point)?;
    let (rhs, n) = right_hand_sides(form)?;
    let x = form.indep_var();
    let checked_orders = match form {
        EquationForm::ScalarNthOrder { .. } if order < n => 0,
        EquationForm::ScalarNthOrder { .. } => order - n + 1,
        _ => order,
    };
    if checked_orders == 0 {
        info!("order {} leaves no residual condition to check", order);
        return Ok(true);
    }
    for (s, h) in series.iter().zip(&rhs) {
        let lhs = s.to_expr().nth_total_derivative(x, n);
        let h_on_series = substitute_series(h, series, x);
        let mut residual = (lhs - h_on_series).simplify();
        for j in 0..checked_orders {
            if j > 0 {
                residual = residual.total_derivative(x).simplify();
            }
            let at_x0 = residual.substitute_variable(x, &point.value).simplify();
            trace.record(TraceEvent::ResidualCheck {
                function: s.function().to_string(),
                derivative_order: j,
                value: at_x0.to_string(),
            });
            if at_x0.is_singular() || !at_x0.is_identically_zero() {
                warn!(
                    "residual of {} does not vanish: derivative {} at x0 is {}",
                    s.function(),
                    j,
                    at_x0
                );
                return Ok(false);
            }
        }
    }
    Ok(true)
}
