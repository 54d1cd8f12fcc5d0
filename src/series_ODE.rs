#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
///____________________________________________________________________________________________________________________________
/// # Taylor series solutions of ordinary differential equations
/// exact series solutions of initial value problems around an expansion point x0:
/// 1) scalar first order equations y' = H(x, y)
/// 2) scalar equations of order n, explicit in the highest derivative
/// 3) first order systems f_i' = H_i(x, f_1, ..., f_k)
/// coefficients are exact rationals, or exact symbolic expressions when the equation or the initial
/// data carry free parameters
///# Example#
/// ```
/// use RustedTaylor::series_ODE::series_api::*;
/// let x = Expr::var("x");
/// let y = Expr::func("y", x.clone());
/// // y' = y, y(0) = 1
/// let eq = Equation::explicit(Expr::derivative(y.clone(), "x", 1), y);
/// let point = ExpansionPoint::new("x", Expr::zero());
/// let ic = InitialCondition::value("y", Expr::zero(), Expr::one());
/// let series = solve_scalar(&eq, "y", "x", &point, 4, &ic).unwrap();
/// assert_eq!(series.to_string(), "1 + x + x^2/2 + x^3/6 + x^4/24");
/// assert!(check_scalar(&eq, "y", "x", &point, 4, &ic, &series).unwrap());
/// ```
/// ________________________________________________________________________________________________________________________________________________
pub mod series_api;
///________________________________________________________________________________________________________________________________________________
/// the solution: a truncated power series in (x - x0), printing, numeric evaluation and a coefficient table
pub mod series_polynomial;
/// equation, expansion point, initial conditions and input validation
pub mod equation_form;
/// highest derivative order of a dependent function, layered detection
pub mod order_detector;
/// isolation of the highest derivative: F(T) = 0 -> T = H
pub mod rhs_extractor;
/// two-stage reduction of derivative expressions to their value at x0
pub mod substitution_engine;
/// coefficient recursion for the three solve modes
pub mod coefficient_recursion;
/// residual check of candidate series
pub mod residual_validator;
/// settings of the solver, read from code or from a toml file
pub mod config;
pub mod errors;
/// observational trace of the solver
pub mod trace;
#[cfg(test)]
mod series_ODE_tests;
