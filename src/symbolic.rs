#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
///____________________________________________________________________________________________________________________________
/// # Symbolic engine
/// exact symbolic expressions over arbitrary-precision rationals:
/// 1) expression tree with dependent function applications `y(x)` and derivative nodes
/// 2) structural queries and substitution
/// 3) printing in prime notation for checking results
///# Example#
/// ```
/// use RustedTaylor::symbolic::symbolic_engine::Expr;
/// let x = Expr::var("x");
/// let y = Expr::func("y", x.clone());
/// let rhs = x.clone() * y.clone() + Expr::int(1);
/// let dy = Expr::derivative(y, "x", 1);
/// assert_eq!(format!("{}", dy), "y'(x)");
/// assert!(rhs.contains_function("y"));
/// ```
/// ________________________________________________________________________________________________________________________________________________
pub mod symbolic_engine;
///________________________________________________________________________________________________________________________________________________
/// differentiation: partial, total (chain rule through dependent functions) and with respect to a subtree
/// Example#
/// ```
/// use RustedTaylor::symbolic::symbolic_engine::Expr;
/// let y = Expr::func("y", Expr::var("x"));
/// // d/dx y(x)^2 = 2*y(x)*y'(x)
/// let d = y.clone().pow(Expr::int(2)).total_derivative("x");
/// let expected = Expr::int(2) * y.clone() * Expr::derivative(y, "x", 1);
/// assert!(d.same_value(&expected));
/// ```
pub mod symbolic_engine_derivatives;
/// canonical form of derivative nodes
pub mod symbolic_canonical;
/// exact simplification and polynomial normal form
pub mod symbolic_simplify;
///______________________________________________________________________________________________________________________________________________
/// exact rational helpers: factorials and exact powers
/// _____________________________________________________________________________________________________________________________________________
pub mod utils;
