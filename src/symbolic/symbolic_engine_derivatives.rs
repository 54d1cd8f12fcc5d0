//! # Symbolic Engine Derivatives Module
//!
//! Analytical differentiation of symbolic expressions.
//!
//! ## Key Methods
//!
//! ### Differentiation
//! - `diff(var)` - partial derivative with respect to a symbol, dependent functions are constants
//! - `total_derivative(var)` - total derivative, dependent functions `y(x)` are differentiated
//!   through the chain rule into derivative nodes `y'(x)`, `y''(x)`, ...
//! - `nth_total_derivative(var, n)` - repeated total derivative with simplification after each step
//! - `partial_wrt_node(node)` - partial derivative with respect to an arbitrary subtree, used to
//!   isolate the highest derivative of an implicit equation
//!
//! All three share one set of structural rules (sum, product, quotient, power and the chain rule
//! for every elementary function); they differ only in how leaves are treated.

use crate::symbolic::symbolic_engine::Expr;

/// how a differentiation flavour treats a node before structural rules are tried
enum Leaf {
    /// the derivative of this node is known
    Value(Expr),
    /// the node hides the differentiation variable inside an atom we cannot look into
    Opaque,
    /// apply the structural rules
    Structural,
}

impl Expr {
    /// DIFFERENTIATION

    /// Shared structural rules. Returns None as soon as the leaf rule reports an opaque node.
    fn derive_with(&self, leaf: &dyn Fn(&Expr) -> Leaf) -> Option<Expr> {
        match leaf(self) {
            Leaf::Value(value) => return Some(value),
            Leaf::Opaque => return None,
            Leaf::Structural => {}
        }
        let derivative = match self {
            // leaves are always handled by the leaf rule; treat anything left as constant
            Expr::Const(_)
            | Expr::Var(_)
            | Expr::Func(..)
            | Expr::Diff(..)
            | Expr::Derivative(..) => Expr::zero(),
            Expr::Add(lhs, rhs) => lhs.derive_with(leaf)? + rhs.derive_with(leaf)?,
            Expr::Sub(lhs, rhs) => lhs.derive_with(leaf)? - rhs.derive_with(leaf)?,
            Expr::Mul(lhs, rhs) => {
                let (lhs, rhs) = (lhs.as_ref(), rhs.as_ref());
                lhs.derive_with(leaf)? * rhs.clone() + lhs.clone() * rhs.derive_with(leaf)?
            }
            Expr::Div(lhs, rhs) => {
                let (lhs, rhs) = (lhs.as_ref(), rhs.as_ref());
                let numerator = lhs.derive_with(leaf)? * rhs.clone() - lhs.clone() * rhs.derive_with(leaf)?;
                numerator / rhs.clone().pow(Expr::int(2))
            }
            Expr::Pow(base, exp) => {
                let d_base = base.derive_with(leaf)?;
                let d_exp = exp.derive_with(leaf)?.simplify();
                let base = base.as_ref().clone();
                let exp = exp.as_ref().clone();
                if d_exp.is_zero() {
                    // power rule: e * b^(e-1) * b'
                    exp.clone() * base.pow(exp - Expr::one()) * d_base
                } else {
                    // b^e * (e' * ln(b) + e * b' / b)
                    base.clone().pow(exp.clone())
                        * (d_exp * base.clone().ln() + exp * d_base / base)
                }
            }
            Expr::Exp(arg) => Expr::Exp(arg.clone()) * arg.derive_with(leaf)?,
            Expr::Ln(arg) => arg.derive_with(leaf)? / arg.as_ref().clone(),
            Expr::sin(arg) => Expr::cos(arg.clone()) * arg.derive_with(leaf)?,
            Expr::cos(arg) => -(Expr::sin(arg.clone()) * arg.derive_with(leaf)?),
            Expr::tg(arg) => arg.derive_with(leaf)? / Expr::cos(arg.clone()).pow(Expr::int(2)),
            Expr::arcsin(arg) => {
                let root = (Expr::one() - arg.as_ref().clone().pow(Expr::int(2))).sqrt();
                arg.derive_with(leaf)? / root
            }
            Expr::arccos(arg) => {
                let root = (Expr::one() - arg.as_ref().clone().pow(Expr::int(2))).sqrt();
                -(arg.derive_with(leaf)? / root)
            }
            Expr::arctg(arg) => {
                let den = Expr::one() + arg.as_ref().clone().pow(Expr::int(2));
                arg.derive_with(leaf)? / den
            }
        };
        Some(derivative)
    }

    /// Computes the analytical partial derivative of the expression with respect to a symbol.
    /// Dependent function applications and derivative nodes are treated as constants.
    ///
    /// # Examples
    /// ```rust, ignore
    /// let x = Expr::Var("x".to_string());
    /// let f = x.clone().pow(Expr::int(2)); // x^2
    /// let df_dx = f.diff("x").simplify(); // 2*x
    /// ```
    pub fn diff(&self, var: &str) -> Expr {
        let leaf = |e: &Expr| match e {
            Expr::Const(_) => Leaf::Value(Expr::zero()),
            Expr::Var(name) if name == var => Leaf::Value(Expr::one()),
            Expr::Var(_) | Expr::Func(..) | Expr::Diff(..) | Expr::Derivative(..) => {
                Leaf::Value(Expr::zero())
            }
            _ => Leaf::Structural,
        };
        self.derive_with(&leaf).unwrap_or_else(Expr::zero)
    }

    /// Total derivative with respect to the independent variable `var`.
    ///
    /// - `d/dx y(x) = y'(x)`
    /// - `d/dx y^(k)(x) = y^(k+1)(x)`
    /// - symbols other than `var` are constants, so are applications at a point, `y(x0)`
    ///
    /// The result is not simplified.
    pub fn total_derivative(&self, var: &str) -> Expr {
        let is_indep = |arg: &Expr| matches!(arg, Expr::Var(name) if name == var);
        let leaf = |e: &Expr| match e {
            Expr::Const(_) => Leaf::Value(Expr::zero()),
            Expr::Var(name) if name == var => Leaf::Value(Expr::one()),
            Expr::Var(_) => Leaf::Value(Expr::zero()),
            Expr::Func(_, arg) if !arg.contains_variable(var) => Leaf::Value(Expr::zero()),
            Expr::Func(..) => Leaf::Value(Expr::derivative(e.clone(), var, 1)),
            Expr::Derivative(target, v, k) if v == var => match target.as_ref() {
                Expr::Func(_, arg) if is_indep(arg) => {
                    Leaf::Value(Expr::Derivative(target.clone(), var.to_string(), k + 1))
                }
                _ => Leaf::Value(Expr::derivative(e.clone(), var, 1)),
            },
            Expr::Diff(target, v) if v == var => {
                Leaf::Value(Expr::Derivative(target.clone(), var.to_string(), 2))
            }
            Expr::Diff(..) | Expr::Derivative(..) if !e.contains_variable(var) => {
                Leaf::Value(Expr::zero())
            }
            Expr::Diff(..) | Expr::Derivative(..) => {
                Leaf::Value(Expr::derivative(e.clone(), var, 1))
            }
            _ => Leaf::Structural,
        };
        match self.derive_with(&leaf) {
            Some(derivative) => derivative,
            None => Expr::derivative(self.clone(), var, 1),
        }
    }

    /// n-th total derivative, simplified after every step.
    pub fn nth_total_derivative(&self, var: &str, n: usize) -> Expr {
        let mut expr = self.clone();
        for _ in 0..n {
            expr = expr.total_derivative(var).simplify();
        }
        expr
    }

    /// Partial derivative with respect to the subtree `node`, every other atom held fixed.
    ///
    /// Returns None when `node` occurs inside an atom (a function application or a derivative
    /// node other than `node` itself), because the dependence is not visible there.
    pub fn partial_wrt_node(&self, node: &Expr) -> Option<Expr> {
        let leaf = |e: &Expr| {
            if e == node {
                return Leaf::Value(Expr::one());
            }
            match e {
                Expr::Const(_) | Expr::Var(_) => Leaf::Value(Expr::zero()),
                Expr::Func(..) | Expr::Diff(..) | Expr::Derivative(..) => {
                    if e.contains_node(node) {
                        Leaf::Opaque
                    } else {
                        Leaf::Value(Expr::zero())
                    }
                }
                _ => Leaf::Structural,
            }
        };
        self.derive_with(&leaf).map(|d| d.simplify())
    }
}
