//! Highest derivative order of a dependent function in a canonical equation.
//!
//! Layered strategy, first hit wins:
//! 1. structural scan for the largest `Derivative(f(x), x, k)`
//! 2. presence sweep of any derivative node of order k acting on an expression that contains
//!    `f`, k going down from a generous upper bound
//! 3. isolation attempt: the largest k for which `f^(k)(x)` can be isolated
//!
//! Exhausting all stages is a `SeriesError::Detection`; there is no default order.
use crate::series_ODE::equation_form::Equation;
use crate::series_ODE::errors::SeriesError;
use crate::series_ODE::rhs_extractor::extract_rhs;
use crate::series_ODE::trace::{DetectionStage, TraceEvent, TraceSink};
use crate::symbolic::symbolic_engine::Expr;
use log::info;
use strum::IntoEnumIterator;

/// Largest k such that `Derivative(dep(x), x, k)` occurs in `expr`.
pub fn structural_max_order(expr: &Expr, dep_var: &str, indep_var: &str) -> Option<usize> {
    let own = match expr {
        Expr::Derivative(target, var, k) if var == indep_var => match target.as_ref() {
            Expr::Func(name, arg)
                if name == dep_var && matches!(arg.as_ref(), Expr::Var(v) if v == indep_var) =>
            {
                Some(*k)
            }
            _ => None,
        },
        _ => None,
    };
    expr.children()
        .into_iter()
        .filter_map(|child| structural_max_order(child, dep_var, indep_var))
        .chain(own)
        .max()
}

fn has_derivative_of_order(expr: &Expr, dep_var: &str, indep_var: &str, order: usize) -> bool {
    expr.any_node(&|e| match e {
        Expr::Derivative(target, var, k) => {
            var == indep_var && *k == order && target.contains_function(dep_var)
        }
        _ => false,
    })
}

fn stage(trace: &dyn TraceSink, dep_var: &str, stage: DetectionStage, outcome: Option<usize>) {
    info!("order detection for {}: {} -> {:?}", dep_var, stage, outcome);
    trace.record(TraceEvent::DetectorStage {
        function: dep_var.to_string(),
        stage,
        outcome,
    });
}

/// Detects the order of the highest derivative of `dep_var` in a canonical equation.
///
/// `upper_bound` is where stages 2 and 3 start their downward sweep.
pub fn detect_order(
    equation: &Equation,
    dep_var: &str,
    indep_var: &str,
    upper_bound: usize,
    trace: &dyn TraceSink,
) -> Result<usize, SeriesError> {
    let x = Expr::var(indep_var);
    for current in DetectionStage::iter() {
        let outcome = match current {
            DetectionStage::StructuralScan => [&equation.lhs, &equation.rhs]
                .into_iter()
                .filter_map(|side| structural_max_order(side, dep_var, indep_var))
                .max(),
            DetectionStage::PresenceSweep => (1..=upper_bound).rev().find(|k| {
                has_derivative_of_order(&equation.lhs, dep_var, indep_var, *k)
                    || has_derivative_of_order(&equation.rhs, dep_var, indep_var, *k)
            }),
            DetectionStage::IsolationAttempt => (1..=upper_bound).rev().find(|k| {
                let target = Expr::derivative(Expr::func(dep_var, x.clone()), indep_var, *k);
                extract_rhs(equation, &target).is_ok()
            }),
        };
        stage(trace, dep_var, current, outcome);
        if let Some(order) = outcome {
            return Ok(order);
        }
    }
    Err(SeriesError::Detection(format!(
        "no derivative of {} with respect to {} found in {} (searched orders 1..={})",
        dep_var, indep_var, equation, upper_bound
    )))
}
