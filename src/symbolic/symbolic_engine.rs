//! # Symbolic Engine Module
//!
//! Core expression tree of the crate. Expressions are immutable trees over a small algebra:
//! exact rational constants, symbols (the independent variable or symbolic constants), applications
//! of dependent functions (`y(x)`), derivative nodes and the usual arithmetic and elementary
//! functions.
//!
//! ## Main Structures and Methods
//!
//! ### `Expr` Enum
//! - **Constants**: `Const(BigRational)` - exact arbitrary-precision rationals
//! - **Symbols**: `Var(String)` - the independent variable or a symbolic constant
//! - **Applications**: `Func(String, Box<Expr>)` - a dependent function applied to its argument
//! - **Derivatives**: `Diff(target, var)` is the raw first-derivative application produced by a
//!   front end; `Derivative(target, var, order)` is the canonical node carrying a concrete order
//! - **Operations**: `Add`, `Sub`, `Mul`, `Div`, `Pow`
//! - **Functions**: `Exp`, `Ln`, `sin`, `cos`, `tg`, `arcsin`, `arccos`, `arctg`
//!
//! ### Key Methods
//! - `Symbols(symbols: &str)` - create multiple variables from a comma-separated string
//! - `func(name, arg)`, `derivative(target, var, order)` - dependent function helpers
//! - `substitute_variable()`, `substitute_node()` - structural substitution
//! - `contains_variable()`, `contains_node()`, `contains_derivative()` - structural queries
//!
//! Differentiation lives in `symbolic_engine_derivatives`, canonicalization in
//! `symbolic_canonical` and exact simplification in `symbolic_simplify`.

#![allow(non_camel_case_types)]

use num::{BigInt, BigRational, One, Signed, Zero};
use std::convert::Infallible;
use std::fmt;

/// Core symbolic expression enum representing mathematical expressions as an abstract syntax tree.
///
/// # Examples
/// ```rust, ignore
/// use RustedTaylor::symbolic::symbolic_engine::Expr;
/// let x = Expr::Var("x".to_string());
/// let y = Expr::func("y", x.clone());
/// let rhs = x.clone() * y + Expr::int(2);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Expr {
    /// Exact rational constant
    Const(BigRational),
    /// Symbol: the independent variable or a symbolic constant
    Var(String),
    /// Dependent function applied to an argument: y(x), or y(x0) once substituted
    Func(String, Box<Expr>),
    /// Raw first-derivative application d(target)/d(var), as a front end writes it
    Diff(Box<Expr>, String),
    /// Canonical derivative node: d^order(target)/d(var)^order
    Derivative(Box<Expr>, String, usize),
    /// Addition operation: left + right
    Add(Box<Expr>, Box<Expr>),
    /// Subtraction operation: left - right
    Sub(Box<Expr>, Box<Expr>),
    /// Multiplication operation: left * right
    Mul(Box<Expr>, Box<Expr>),
    /// Division operation: left / right
    Div(Box<Expr>, Box<Expr>),
    /// Power operation: base ^ exponent
    Pow(Box<Expr>, Box<Expr>),
    /// Exponential function: e^x
    Exp(Box<Expr>),
    /// Natural logarithm: ln(x)
    Ln(Box<Expr>),
    /// Sine function
    sin(Box<Expr>),
    /// Cosine function
    cos(Box<Expr>),
    /// Tangent function - mathematical notation 'tg'
    tg(Box<Expr>),
    /// Arcsine function
    arcsin(Box<Expr>),
    /// Arccosine function
    arccos(Box<Expr>),
    /// Arctangent function - mathematical notation 'arctg'
    arctg(Box<Expr>),
}

fn primes(order: usize) -> String {
    match order {
        1 => "'".to_string(),
        2 => "''".to_string(),
        3 => "'''".to_string(),
        n => format!("^({})", n),
    }
}

/// Display implementation for pretty printing symbolic expressions.
///
/// Binary operations are fully parenthesised; derivatives of dependent functions are printed in
/// prime notation: `y'(x)`, `y''(x)`, `y^(4)(x)`.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Const(val) => write!(f, "{}", val),
            Expr::Var(name) => write!(f, "{}", name),
            Expr::Func(name, arg) => write!(f, "{}({})", name, arg),
            Expr::Diff(target, var) => write!(f, "diff({}, {})", target, var),
            Expr::Derivative(target, var, order) => match target.as_ref() {
                Expr::Func(name, arg) => write!(f, "{}{}({})", name, primes(*order), arg),
                _ => write!(f, "d^{}/d{}^{}({})", order, var, order, target),
            },
            Expr::Add(lhs, rhs) => write!(f, "({} + {})", lhs, rhs),
            Expr::Sub(lhs, rhs) => write!(f, "({} - {})", lhs, rhs),
            Expr::Mul(lhs, rhs) => write!(f, "({} * {})", lhs, rhs),
            Expr::Div(lhs, rhs) => write!(f, "({} / {})", lhs, rhs),
            Expr::Pow(base, exp) => write!(f, "({} ^ {})", base, exp),
            Expr::Exp(expr) => write!(f, "exp({})", expr),
            Expr::Ln(expr) => write!(f, "ln({})", expr),
            Expr::sin(expr) => write!(f, "sin({})", expr),
            Expr::cos(expr) => write!(f, "cos({})", expr),
            Expr::tg(expr) => write!(f, "tg({})", expr),
            Expr::arcsin(expr) => write!(f, "arcsin({})", expr),
            Expr::arccos(expr) => write!(f, "arccos({})", expr),
            Expr::arctg(expr) => write!(f, "arctg({})", expr),
        }
    }
}

impl std::ops::Add for Expr {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Expr::Add(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Sub for Expr {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Expr::Sub(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Mul for Expr {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Expr::Mul(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Div for Expr {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Expr::Div(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Neg for Expr {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Expr::Mul(Box::new(Expr::int(-1)), Box::new(self))
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Expr::int(value)
    }
}

impl From<BigRational> for Expr {
    fn from(value: BigRational) -> Self {
        Expr::Const(value)
    }
}

impl Expr {
    /// BASIC FEATURES

    /// Creates multiple symbolic variables from a comma-separated string.
    ///
    /// # Examples
    /// ```rust, ignore
    /// let vars = Expr::Symbols("x, a, b");
    /// assert_eq!(vars.len(), 3);
    /// ```
    #[allow(non_snake_case)]
    pub fn Symbols(symbols: &str) -> Vec<Expr> {
        symbols
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| Expr::Var(s.to_string()))
            .collect()
    }

    pub fn var(name: &str) -> Expr {
        Expr::Var(name.to_string())
    }

    /// Integer constant.
    pub fn int(value: i64) -> Expr {
        Expr::Const(BigRational::from_integer(BigInt::from(value)))
    }

    /// Rational constant `numer/denom`.
    ///
    /// # Panics
    /// Panics if `denom` is zero.
    pub fn rational(numer: i64, denom: i64) -> Expr {
        Expr::Const(BigRational::new(BigInt::from(numer), BigInt::from(denom)))
    }

    pub fn zero() -> Expr {
        Expr::Const(BigRational::zero())
    }

    pub fn one() -> Expr {
        Expr::Const(BigRational::one())
    }

    /// Dependent function application `name(arg)`.
    pub fn func(name: &str, arg: Expr) -> Expr {
        Expr::Func(name.to_string(), arg.boxed())
    }

    /// Canonical derivative node of the given order.
    pub fn derivative(target: Expr, var: &str, order: usize) -> Expr {
        Expr::Derivative(target.boxed(), var.to_string(), order)
    }

    /// Raw first-derivative application, as produced by a textual front end.
    pub fn diff_of(target: Expr, var: &str) -> Expr {
        Expr::Diff(target.boxed(), var.to_string())
    }

    /// Convenience method to wrap expression in Box for recursive structures.
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    pub fn pow(self, rhs: Expr) -> Expr {
        Expr::Pow(self.boxed(), rhs.boxed())
    }

    /// Square root as the rational power 1/2.
    pub fn sqrt(self) -> Expr {
        self.pow(Expr::rational(1, 2))
    }

    pub fn exp(self) -> Expr {
        Expr::Exp(self.boxed())
    }

    pub fn ln(self) -> Expr {
        Expr::Ln(self.boxed())
    }

    pub fn as_rational(&self) -> Option<&BigRational> {
        match self {
            Expr::Const(val) => Some(val),
            _ => None,
        }
    }

    /// Checks if expression is exactly the constant zero.
    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Const(val) if val.is_zero())
    }

    pub fn is_one(&self) -> bool {
        matches!(self, Expr::Const(val) if val.is_one())
    }

    pub fn is_negative_const(&self) -> bool {
        matches!(self, Expr::Const(val) if val.is_negative())
    }

    //___________________________________TRAVERSAL____________________________________

    /// Rebuilds this node with every direct child passed through `f`.
    /// Leaves (`Const`, `Var`) are returned unchanged.
    pub fn try_map_children<E, F>(&self, f: &mut F) -> Result<Expr, E>
    where
        F: FnMut(&Expr) -> Result<Expr, E>,
    {
        let mapped = match self {
            Expr::Const(_) | Expr::Var(_) => self.clone(),
            Expr::Func(name, arg) => Expr::Func(name.clone(), f(arg.as_ref())?.boxed()),
            Expr::Diff(target, var) => Expr::Diff(f(target.as_ref())?.boxed(), var.clone()),
            Expr::Derivative(target, var, order) => {
                Expr::Derivative(f(target.as_ref())?.boxed(), var.clone(), *order)
            }
            Expr::Add(lhs, rhs) => Expr::Add(f(lhs.as_ref())?.boxed(), f(rhs.as_ref())?.boxed()),
            Expr::Sub(lhs, rhs) => Expr::Sub(f(lhs.as_ref())?.boxed(), f(rhs.as_ref())?.boxed()),
            Expr::Mul(lhs, rhs) => Expr::Mul(f(lhs.as_ref())?.boxed(), f(rhs.as_ref())?.boxed()),
            Expr::Div(lhs, rhs) => Expr::Div(f(lhs.as_ref())?.boxed(), f(rhs.as_ref())?.boxed()),
            Expr::Pow(base, exp) => Expr::Pow(f(base.as_ref())?.boxed(), f(exp.as_ref())?.boxed()),
            Expr::Exp(expr) => Expr::Exp(f(expr.as_ref())?.boxed()),
            Expr::Ln(expr) => Expr::Ln(f(expr.as_ref())?.boxed()),
            Expr::sin(expr) => Expr::sin(f(expr.as_ref())?.boxed()),
            Expr::cos(expr) => Expr::cos(f(expr.as_ref())?.boxed()),
            Expr::tg(expr) => Expr::tg(f(expr.as_ref())?.boxed()),
            Expr::arcsin(expr) => Expr::arcsin(f(expr.as_ref())?.boxed()),
            Expr::arccos(expr) => Expr::arccos(f(expr.as_ref())?.boxed()),
            Expr::arctg(expr) => Expr::arctg(f(expr.as_ref())?.boxed()),
        };
        Ok(mapped)
    }

    /// Infallible version of `try_map_children`.
    pub fn map_children<F>(&self, mut f: F) -> Expr
    where
        F: FnMut(&Expr) -> Expr,
    {
        let mapped: Result<Expr, Infallible> = self.try_map_children(&mut |child| Ok(f(child)));
        match mapped {
            Ok(expr) => expr,
            Err(never) => match never {},
        }
    }

    /// Direct children of this node.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Const(_) | Expr::Var(_) => vec![],
            Expr::Func(_, arg) => vec![arg.as_ref()],
            Expr::Diff(target, _) | Expr::Derivative(target, _, _) => vec![target.as_ref()],
            Expr::Add(lhs, rhs)
            | Expr::Sub(lhs, rhs)
            | Expr::Mul(lhs, rhs)
            | Expr::Div(lhs, rhs)
            | Expr::Pow(lhs, rhs) => vec![lhs.as_ref(), rhs.as_ref()],
            Expr::Exp(expr)
            | Expr::Ln(expr)
            | Expr::sin(expr)
            | Expr::cos(expr)
            | Expr::tg(expr)
            | Expr::arcsin(expr)
            | Expr::arccos(expr)
            | Expr::arctg(expr) => vec![expr.as_ref()],
        }
    }

    /// true if `pred` holds for this node or any node below it
    pub fn any_node(&self, pred: &dyn Fn(&Expr) -> bool) -> bool {
        pred(self) || self.children().into_iter().any(|child| child.any_node(pred))
    }

    /// Nesting depth of the tree (a leaf has depth 1).
    pub fn depth(&self) -> usize {
        1 + self
            .children()
            .into_iter()
            .map(|child| child.depth())
            .max()
            .unwrap_or(0)
    }

    /// check if the expression contains a variable
    pub fn contains_variable(&self, var_name: &str) -> bool {
        self.any_node(&|e| matches!(e, Expr::Var(name) if name == var_name))
    }

    pub fn contains_node(&self, node: &Expr) -> bool {
        self.any_node(&|e| e == node)
    }

    /// true if any derivative node (raw or canonical) is left in the tree
    pub fn contains_derivative(&self) -> bool {
        self.any_node(&|e| matches!(e, Expr::Diff(..) | Expr::Derivative(..)))
    }

    /// true if an application of the named dependent function is left in the tree
    pub fn contains_function(&self, name: &str) -> bool {
        self.any_node(&|e| matches!(e, Expr::Func(f, _) if f == name))
    }

    pub fn contains_any_function(&self) -> bool {
        self.any_node(&|e| matches!(e, Expr::Func(..)))
    }

    //___________________________________SUBSTITUTION____________________________________

    /// substitute a variable with an expression everywhere in the tree
    pub fn substitute_variable(&self, var: &str, expr: &Expr) -> Expr {
        match self {
            Expr::Var(name) if name == var => expr.clone(),
            _ => self.map_children(|child| child.substitute_variable(var, expr)),
        }
    }

    /// Replaces every occurrence of the subtree `node` by `with`. Matching is top-down, so an
    /// enclosing node is replaced before its children are visited.
    pub fn substitute_node(&self, node: &Expr, with: &Expr) -> Expr {
        if self == node {
            return with.clone();
        }
        self.map_children(|child| child.substitute_node(node, with))
    }

    /// Like `substitute_node` but never descends into derivative targets.
    pub fn substitute_node_outside_derivatives(&self, node: &Expr, with: &Expr) -> Expr {
        if self == node {
            return with.clone();
        }
        match self {
            Expr::Diff(..) | Expr::Derivative(..) => self.clone(),
            _ => self.map_children(|child| child.substitute_node_outside_derivatives(node, with)),
        }
    }

    /// Rewrites bare symbols naming dependent functions (`y`) into applications `y(x)`.
    pub fn bind_dependent(&self, dep_var: &str, indep_var: &str) -> Expr {
        match self {
            Expr::Var(name) if name == dep_var => Expr::func(dep_var, Expr::var(indep_var)),
            Expr::Func(..) => self.clone(),
            _ => self.map_children(|child| child.bind_dependent(dep_var, indep_var)),
        }
    }
}
