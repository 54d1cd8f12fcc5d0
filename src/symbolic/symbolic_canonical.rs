//! # Derivative Canonicalization
//!
//! Rewrites every derivative in an expression into the canonical node
//! `Derivative(f(x), x, k)` with `k >= 1`:
//!
//! - raw applications `Diff(t, x)` become `Derivative(t, x, 1)`
//! - nested derivatives in the same variable are merged by adding orders
//! - order 0 collapses to the target
//! - derivatives of targets independent of `x` vanish
//! - derivatives of composite targets (`d/dx (x*y(x))`) are expanded with the total derivative
//!
//! The rewrite is run to a fixed point. The number of passes is bounded by the depth of the
//! expression plus a safety margin; running out of passes is an internal defect.

use crate::symbolic::symbolic_engine::Expr;
use std::fmt;

/// Canonicalization did not reach a canonical fixed point within the pass limit.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedPointError {
    pub expr: String,
    pub passes: usize,
}

impl fmt::Display for FixedPointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "canonicalization of {} did not converge after {} passes",
            self.expr, self.passes
        )
    }
}

impl std::error::Error for FixedPointError {}

pub const DEFAULT_SAFETY_MARGIN: usize = 16;

fn canonical_derivative(target: Expr, var: String, order: usize) -> Expr {
    if order == 0 {
        return target;
    }
    match target {
        Expr::Derivative(inner, inner_var, k) if inner_var == var => {
            Expr::Derivative(inner, var, k + order)
        }
        Expr::Func(..) if target.contains_variable(&var) => {
            Expr::Derivative(target.boxed(), var, order)
        }
        _ if !target.contains_variable(&var) => Expr::zero(),
        composite => composite.nth_total_derivative(&var, order),
    }
}

impl Expr {
    /// One bottom-up rewriting pass.
    pub fn canonical_pass(&self) -> Expr {
        let node = self.map_children(|child| child.canonical_pass());
        match node {
            Expr::Diff(target, var) => canonical_derivative(*target, var, 1),
            Expr::Derivative(target, var, order) => canonical_derivative(*target, var, order),
            other => other,
        }
    }

    /// true if no raw derivative is left and every derivative node is `Derivative(f(..), x, k>=1)`
    pub fn is_canonical(&self) -> bool {
        !self.any_node(&|e| match e {
            Expr::Diff(..) => true,
            Expr::Derivative(target, var, order) => {
                *order == 0
                    || !matches!(target.as_ref(), Expr::Func(..))
                    || !target.contains_variable(var)
            }
            _ => false,
        })
    }

    /// Canonicalizes with the default safety margin.
    pub fn canonicalize(&self) -> Result<Expr, FixedPointError> {
        self.canonicalize_with_margin(DEFAULT_SAFETY_MARGIN)
    }

    /// Runs `canonical_pass` until the expression stops changing, at most `depth + margin` times.
    pub fn canonicalize_with_margin(&self, margin: usize) -> Result<Expr, FixedPointError> {
        let max_passes = self.depth() + margin;
        let mut current = self.clone();
        for _ in 0..max_passes {
            let next = current.canonical_pass();
            if next == current {
                if current.is_canonical() {
                    return Ok(current);
                }
                break;
            }
            current = next;
        }
        Err(FixedPointError {
            expr: self.to_string(),
            passes: max_passes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn y() -> Expr {
        Expr::func("y", Expr::var("x"))
    }

    #[test]
    fn test_raw_diff_becomes_first_order() {
        let e = Expr::diff_of(y(), "x");
        assert_eq!(e.canonicalize().unwrap(), Expr::derivative(y(), "x", 1));
    }

    #[test]
    fn test_nested_orders_are_summed() {
        let e = Expr::diff_of(Expr::diff_of(Expr::derivative(y(), "x", 2), "x"), "x");
        assert_eq!(e.canonicalize().unwrap(), Expr::derivative(y(), "x", 4));
    }

    #[test]
    fn test_order_zero_and_constants() {
        assert_eq!(Expr::derivative(y(), "x", 0).canonicalize().unwrap(), y());
        let at_point = Expr::func("y", Expr::int(0));
        assert_eq!(
            Expr::derivative(at_point, "x", 3).canonicalize().unwrap(),
            Expr::zero()
        );
        let c = Expr::diff_of(Expr::var("a") + Expr::int(2), "x");
        assert_eq!(c.canonicalize().unwrap(), Expr::zero());
    }

    #[test]
    fn test_composite_target_is_expanded() {
        // d/dx (x * y(x)) = y(x) + x*y'(x)
        let e = Expr::diff_of(Expr::var("x") * y(), "x");
        let canonical = e.canonicalize().unwrap();
        assert!(canonical.is_canonical());
        let expected = y() + Expr::var("x") * Expr::derivative(y(), "x", 1);
        assert!(canonical.same_value(&expected));
    }

    #[test]
    fn test_canonical_is_fixed_point() {
        let e = Expr::derivative(y(), "x", 2) + Expr::diff_of(y(), "x");
        let once = e.canonicalize().unwrap();
        assert_eq!(once.canonical_pass(), once);
    }
}
