//! Two-stage reduction of a derivative expression to its value at the expansion point.
//!
//! The steps always run in this order:
//! 1. Stage A, to a fixed point: canonicalize, then substitute every known derivative of order >= 2
//! 2. Stage B, once: canonicalize, then substitute the known first derivatives
//! 3. substitute the function values `f(x) -> f(x0)` outside derivative nodes
//! 4. zero out derivative nodes whose target no longer depends on `x`
//! 5. substitute `x -> x0` and simplify
//!
//! A value that still contains a derivative node or a dependent function afterwards is an internal
//! defect, never a result.
use crate::series_ODE::errors::{InvariantViolation, SeriesError};
use crate::symbolic::symbolic_engine::Expr;
use log::debug;
use std::collections::BTreeMap;

/// Source of already resolved derivative values `function^(order)(x0)`.
pub trait KnownDerivatives {
    fn value_of(&self, function: &str, order: usize) -> Option<Expr>;
}

impl KnownDerivatives for BTreeMap<(String, usize), Expr> {
    fn value_of(&self, function: &str, order: usize) -> Option<Expr> {
        self.get(&(function.to_string(), order)).cloned()
    }
}

/// canonical derivative nodes `f^(k)(x)` in the expression, deduplicated
fn derivative_nodes(expr: &Expr, indep_var: &str) -> Vec<(String, usize, Expr)> {
    let mut found: Vec<(String, usize, Expr)> = Vec::new();
    collect_derivative_nodes(expr, indep_var, &mut found);
    found
}

fn collect_derivative_nodes(expr: &Expr, indep_var: &str, found: &mut Vec<(String, usize, Expr)>) {
    if let Expr::Derivative(target, var, k) = expr {
        if let Expr::Func(name, _) = target.as_ref() {
            if var == indep_var && !found.iter().any(|(_, _, node)| node == expr) {
                found.push((name.clone(), *k, expr.clone()));
            }
        }
        return;
    }
    for child in expr.children() {
        collect_derivative_nodes(child, indep_var, found);
    }
}

/// Replaces the known derivative nodes selected by `pick_order`. Returns the new expression and
/// the number of substitutions made.
fn substitute_known<K, P>(expr: &Expr, indep_var: &str, known: &K, pick_order: P) -> (Expr, usize)
where
    K: KnownDerivatives + ?Sized,
    P: Fn(usize) -> bool,
{
    let mut current = expr.clone();
    let mut count = 0;
    for (function, order, node) in derivative_nodes(expr, indep_var) {
        if !pick_order(order) {
            continue;
        }
        if let Some(value) = known.value_of(&function, order) {
            current = current.substitute_node(&node, &value);
            count += 1;
        }
    }
    (current, count)
}

fn zero_constant_derivatives(expr: &Expr, indep_var: &str) -> Expr {
    match expr {
        Expr::Derivative(target, _, _) | Expr::Diff(target, _)
            if !target.contains_variable(indep_var) =>
        {
            Expr::zero()
        }
        _ => expr.map_children(|child| zero_constant_derivatives(child, indep_var)),
    }
}

/// Reduces `expr` to its value at `x = x0`, using the known derivative values of the dependent
/// functions `functions`.
pub fn reduce_to_value<K>(
    expr: &Expr,
    indep_var: &str,
    x0: &Expr,
    functions: &[String],
    known: &K,
    safety_margin: usize,
) -> Result<Expr, SeriesError>
where
    K: KnownDerivatives + ?Sized,
{
    // Stage A
    let max_passes = expr.depth() + safety_margin;
    let mut current = expr.canonicalize_with_margin(safety_margin)?;
    let mut passes = 0;
    loop {
        let (next, substituted) = substitute_known(&current, indep_var, known, |k| k >= 2);
        if substituted == 0 {
            break;
        }
        current = next.canonicalize_with_margin(safety_margin)?;
        passes += 1;
        if passes > max_passes {
            return Err(SeriesError::InternalInvariant(
                InvariantViolation::CanonicalFixedPoint {
                    expr: expr.to_string(),
                    passes,
                },
            ));
        }
    }
    // Stage B
    current = current.canonicalize_with_margin(safety_margin)?;
    let (next, _) = substitute_known(&current, indep_var, known, |k| k == 1);
    current = next;
    // function values
    let x = Expr::var(indep_var);
    for function in functions {
        if let Some(value) = known.value_of(function, 0) {
            let at_x = Expr::func(function, x.clone());
            let at_x0 = Expr::func(function, x0.clone());
            current = current
                .substitute_node_outside_derivatives(&at_x, &value)
                .substitute_node_outside_derivatives(&at_x0, &value);
        }
    }
    // derivative-of-constant artifacts
    current = zero_constant_derivatives(&current, indep_var);
    // independent variable
    let value = current.substitute_variable(indep_var, x0).simplify();

    if value.contains_derivative() || value.contains_any_function() {
        return Err(SeriesError::InternalInvariant(
            InvariantViolation::SubstitutionArtifact {
                residue: value.to_string(),
            },
        ));
    }
    if value.is_singular() {
        return Err(SeriesError::input(format!(
            "{} is singular at the expansion point {} = {}",
            expr, indep_var, x0
        )));
    }
    let normalised = match value {
        Expr::Const(_) => value,
        symbolic => symbolic.expand_normal(),
    };
    debug!("{} at {} = {} -> {}", expr, indep_var, x0, normalised);
    Ok(normalised)
}
