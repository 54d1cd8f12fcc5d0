//! Coefficient-by-coefficient construction of the Taylor series.
//!
//! All three modes share one step: take the current derivative expression, differentiate it
//! with respect to x, canonicalize, reduce it to its value at x0 with the two-stage substitution
//! engine and divide by the factorial of the order. Coefficients are appended to the output
//! polynomial in strictly increasing order.
use crate::series_ODE::errors::SeriesError;
use crate::series_ODE::series_polynomial::SeriesPolynomial;
use crate::series_ODE::substitution_engine::{KnownDerivatives, reduce_to_value};
use crate::series_ODE::trace::{TraceEvent, TraceSink};
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::utils::{factorial, falling_factorial_ratio};
use log::info;
use num::BigRational;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Taylor coefficients a_k = f^(k)(x0)/k! resolved so far in one recursion call.
#[derive(Debug, Clone, Default)]
pub struct CoefficientTable {
    coefficients: BTreeMap<(String, usize), Expr>,
}

impl CoefficientTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, function: &str, k: usize, coefficient: Expr) {
        self.coefficients
            .insert((function.to_string(), k), coefficient);
    }

    pub fn coefficient(&self, function: &str, k: usize) -> Option<&Expr> {
        self.coefficients.get(&(function.to_string(), k))
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }
}

impl KnownDerivatives for CoefficientTable {
    fn value_of(&self, function: &str, order: usize) -> Option<Expr> {
        let coefficient = self.coefficient(function, order)?;
        Some(scale(coefficient, &factorial(order)))
    }
}

/// factor * expr, kept as an exact rational when possible
fn scale(expr: &Expr, factor: &BigRational) -> Expr {
    match expr {
        Expr::Const(c) => Expr::Const(c * factor),
        symbolic => (Expr::Const(factor.clone()) * symbolic.clone()).expand_normal(),
    }
}

fn divide(expr: &Expr, divisor: &BigRational) -> Expr {
    scale(expr, &divisor.recip())
}

/// Shared settings of one recursion call.
pub struct RecursionContext<'a> {
    pub indep_var: &'a str,
    pub x0: &'a Expr,
    pub functions: &'a [String],
    pub safety_margin: usize,
    pub trace: &'a dyn TraceSink,
}

impl RecursionContext<'_> {
    /// d/dx of the current derivative expression, back in canonical form
    fn advance(&self, current: &Expr) -> Result<Expr, SeriesError> {
        let differentiated = current.total_derivative(self.indep_var).simplify();
        Ok(differentiated.canonicalize_with_margin(self.safety_margin)?)
    }

    fn value(&self, current: &Expr, known: &CoefficientTable) -> Result<Expr, SeriesError> {
        reduce_to_value(
            current,
            self.indep_var,
            self.x0,
            self.functions,
            known,
            self.safety_margin,
        )
    }

    fn report(&self, function: &str, k: usize, value: &Expr, coefficient: &Expr) {
        self.trace.record(TraceEvent::DerivativeValue {
            function: function.to_string(),
            order: k,
            value: value.to_string(),
        });
        self.trace.record(TraceEvent::Coefficient {
            function: function.to_string(),
            power: k,
            value: coefficient.to_string(),
        });
    }
}

/// y' = H(x, y), y(x0) = y0
pub fn scalar_first_order(
    ctx: &RecursionContext,
    dep_var: &str,
    rhs: &Expr,
    y0: &Expr,
    order: usize,
) -> Result<SeriesPolynomial, SeriesError> {
    let mut table = CoefficientTable::new();
    let mut series = SeriesPolynomial::new(dep_var, ctx.indep_var, ctx.x0.clone());
    table.insert(dep_var, 0, y0.clone());
    series.push_coefficient(y0.clone());

    let mut current = rhs.clone();
    for k in 1..=order {
        if k > 1 {
            current = ctx.advance(&current)?;
        }
        // current = y^(k)(x) expressed through lower derivatives
        let value = ctx.value(&current, &table)?;
        let a_k = divide(&value, &factorial(k));
        ctx.report(dep_var, k, &value, &a_k);
        table.insert(dep_var, k, a_k.clone());
        series.push_coefficient(a_k);
    }
    info!("{} coefficients of {} computed", series.terms().len(), dep_var);
    Ok(series)
}

/// y^(n) = H(x, y, ..., y^(n-1)) with y^(j)(x0) = ics[j], j < n
pub fn scalar_nth_order(
    ctx: &RecursionContext,
    dep_var: &str,
    rhs: &Expr,
    n: usize,
    ics: &[Expr],
    order: usize,
) -> Result<SeriesPolynomial, SeriesError> {
    let mut table = CoefficientTable::new();
    let mut series = SeriesPolynomial::new(dep_var, ctx.indep_var, ctx.x0.clone());
    for (j, ic) in ics.iter().enumerate().take(order.min(n.saturating_sub(1)) + 1) {
        let a_j = divide(ic, &factorial(j));
        table.insert(dep_var, j, a_j.clone());
        series.push_coefficient(a_j);
    }
    // known derivatives below n are needed even when the series is shorter
    for (j, ic) in ics.iter().enumerate().skip(order + 1) {
        table.insert(dep_var, j, divide(ic, &factorial(j)));
    }

    let mut current = rhs.clone();
    for k in n..=order {
        let j = k - n;
        if j > 0 {
            current = ctx.advance(&current)?;
        }
        // j-th derivative of H = y^(n+j)(x0); c_j is the j-th coefficient of y^(n)
        let value = ctx.value(&current, &table)?;
        let c_j = divide(&value, &factorial(j));
        let a_k = divide(&c_j, &falling_factorial_ratio(n, j));
        ctx.report(dep_var, k, &value, &a_k);
        table.insert(dep_var, k, a_k.clone());
        series.push_coefficient(a_k);
    }
    info!("{} coefficients of {} computed", series.terms().len(), dep_var);
    Ok(series)
}

/// f_i' = H_i(x, f_1, ..., f_m), f_i(x0) = ics[i]. All components advance together; every value
/// of order k is computed from the same snapshot of the table holding orders < k.
pub fn system_first_order(
    ctx: &RecursionContext,
    rhs: &[Expr],
    ics: &[Expr],
    order: usize,
    parallel: bool,
) -> Result<Vec<SeriesPolynomial>, SeriesError> {
    let functions = ctx.functions;
    let mut table = CoefficientTable::new();
    let mut series: Vec<SeriesPolynomial> = functions
        .iter()
        .map(|f| SeriesPolynomial::new(f, ctx.indep_var, ctx.x0.clone()))
        .collect();
    for ((function, y0), s) in functions.iter().zip(ics).zip(series.iter_mut()) {
        table.insert(function, 0, y0.clone());
        s.push_coefficient(y0.clone());
    }

    let mut currents: Vec<Expr> = rhs.to_vec();
    for k in 1..=order {
        let snapshot = &table;
        let step = |current: &Expr| -> Result<(Expr, Expr), SeriesError> {
            let next = if k > 1 {
                ctx.advance(current)?
            } else {
                current.clone()
            };
            let value = ctx.value(&next, snapshot)?;
            Ok((next, value))
        };
        let results: Vec<(Expr, Expr)> = if parallel {
            currents
                .par_iter()
                .map(step)
                .collect::<Result<Vec<_>, SeriesError>>()?
        } else {
            currents
                .iter()
                .map(step)
                .collect::<Result<Vec<_>, SeriesError>>()?
        };
        let mut new_coefficients = Vec::with_capacity(results.len());
        currents = Vec::with_capacity(results.len());
        for (function, (next, value)) in functions.iter().zip(results) {
            let a_k = divide(&value, &factorial(k));
            ctx.report(function, k, &value, &a_k);
            new_coefficients.push((function, a_k));
            currents.push(next);
        }
        for ((function, a_k), s) in new_coefficients.into_iter().zip(series.iter_mut()) {
            table.insert(function, k, a_k.clone());
            s.push_coefficient(a_k);
        }
    }
    info!(
        "{} coefficients of {} components computed",
        order + 1,
        functions.len()
    );
    Ok(series)
}
