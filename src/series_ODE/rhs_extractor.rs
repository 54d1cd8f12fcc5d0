//! Isolation of the highest derivative: `T = H(x, y, y', ...)`.
//!
//! Explicit equations (`T = H` or `H = T`) are read off directly. Otherwise the equation is
//! written as `F = lhs - rhs = 0` and must be affine in `T`: `F = A*T + B` with `dA/dT = 0`, then
//! `H = -B/A`.
use crate::series_ODE::equation_form::Equation;
use crate::series_ODE::errors::SeriesError;
use crate::symbolic::symbolic_engine::Expr;
use log::debug;

fn isolation_error(equation: &Equation, reason: String) -> SeriesError {
    SeriesError::Isolation {
        equation: equation.to_string(),
        reason,
    }
}

/// Returns `H` such that the canonical `equation` is equivalent to `target = H`.
pub fn extract_rhs(equation: &Equation, target: &Expr) -> Result<Expr, SeriesError> {
    if equation.lhs == *target && !equation.rhs.contains_node(target) {
        return Ok(equation.rhs.simplify());
    }
    if equation.rhs == *target && !equation.lhs.contains_node(target) {
        return Ok(equation.lhs.simplify());
    }
    let residual = (equation.lhs.clone() - equation.rhs.clone()).simplify();
    let a = residual.partial_wrt_node(target).ok_or_else(|| {
        isolation_error(
            equation,
            format!("{} occurs inside a function that cannot be inverted", target),
        )
    })?;
    if a.is_identically_zero() {
        return Err(isolation_error(
            equation,
            format!("{} does not occur in the equation", target),
        ));
    }
    let nonlinear = match a.partial_wrt_node(target) {
        Some(da) => !da.is_identically_zero(),
        None => true,
    };
    if nonlinear {
        return Err(isolation_error(
            equation,
            format!("the equation is not linear in {}", target),
        ));
    }
    let b = residual.substitute_node(target, &Expr::zero());
    let h = (-b / a).simplify();
    debug!("isolated {} = {}", target, h);
    Ok(h)
}

/// one row of the linear system `A * T = C` read from an equation affine in every target
fn linear_row(equation: &Equation, targets: &[Expr]) -> Result<(Vec<Expr>, Expr), SeriesError> {
    // explicit in one target: unit row
    for (j, target) in targets.iter().enumerate() {
        let explicit = if equation.lhs == *target {
            Some(&equation.rhs)
        } else if equation.rhs == *target {
            Some(&equation.lhs)
        } else {
            None
        };
        if let Some(h) = explicit {
            if !targets.iter().any(|t| h.contains_node(t)) {
                let row = (0..targets.len())
                    .map(|k| if k == j { Expr::one() } else { Expr::zero() })
                    .collect();
                return Ok((row, h.simplify()));
            }
        }
    }
    let residual = (equation.lhs.clone() - equation.rhs.clone()).simplify();
    let mut row = Vec::with_capacity(targets.len());
    for target in targets {
        let a = residual.partial_wrt_node(target).ok_or_else(|| {
            isolation_error(
                equation,
                format!("{} occurs inside a function that cannot be inverted", target),
            )
        })?;
        if targets.iter().any(|t| a.contains_node(t)) {
            return Err(isolation_error(
                equation,
                format!("the equation is not linear in {}", target),
            ));
        }
        row.push(a);
    }
    let mut b = residual;
    for target in targets {
        b = b.substitute_node(target, &Expr::zero());
    }
    Ok((row, (-b).simplify()))
}

fn system_error(equations: &[Equation], reason: String) -> SeriesError {
    let listed: Vec<String> = equations.iter().map(|eq| eq.to_string()).collect();
    SeriesError::Isolation {
        equation: listed.join("; "),
        reason,
    }
}

/// Isolates all `targets` of a system at once. Every equation must be affine in the targets;
/// the resulting linear system `A * T = C` is solved by Gauss-Jordan elimination, so the order
/// of the equations does not matter and derivatives may be coupled across equations.
pub fn extract_rhs_vector(
    equations: &[Equation],
    targets: &[Expr],
) -> Result<Vec<Expr>, SeriesError> {
    if equations.len() != targets.len() {
        return Err(SeriesError::input(format!(
            "{} equations for {} unknown derivatives",
            equations.len(),
            targets.len()
        )));
    }
    let n = targets.len();
    let mut a: Vec<Vec<Expr>> = Vec::with_capacity(n);
    let mut c: Vec<Expr> = Vec::with_capacity(n);
    for equation in equations {
        let (row, value) = linear_row(equation, targets)?;
        a.push(row);
        c.push(value);
    }
    for col in 0..n {
        // prefer a non-zero constant pivot, then any entry that is not identically zero
        let candidates: Vec<usize> = (col..n)
            .filter(|&r| !a[r][col].is_identically_zero())
            .collect();
        let pivot_row = candidates
            .iter()
            .copied()
            .find(|&r| matches!(a[r][col], Expr::Const(_)))
            .or_else(|| candidates.first().copied())
            .ok_or_else(|| {
                system_error(
                    equations,
                    format!("no equation of the system determines {}", targets[col]),
                )
            })?;
        a.swap(col, pivot_row);
        c.swap(col, pivot_row);
        let pivot = a[col][col].clone();
        if !pivot.is_one() {
            for entry in a[col].iter_mut() {
                *entry = (entry.clone() / pivot.clone()).simplify();
            }
            c[col] = (c[col].clone() / pivot).simplify();
        }
        for r in 0..n {
            if r == col || a[r][col].is_identically_zero() {
                continue;
            }
            let factor = a[r][col].clone();
            for k in 0..n {
                let reduced = a[r][k].clone() - factor.clone() * a[col][k].clone();
                a[r][k] = reduced.simplify();
            }
            c[r] = (c[r].clone() - factor * c[col].clone()).simplify();
        }
    }
    for (target, h) in targets.iter().zip(&c) {
        debug!("isolated {} = {}", target, h);
    }
    Ok(c)
}
