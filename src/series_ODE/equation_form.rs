//! Input model of a solve call: equations, expansion point, initial conditions and the
//! validated, canonicalized equation shape.
//!
//! All checks here run before any series computation; violations are reported as
//! `SeriesError::InputValidation` naming the failed precondition.
use crate::series_ODE::errors::SeriesError;
use crate::symbolic::symbolic_engine::Expr;
use num::{Signed, ToPrimitive};
use std::collections::HashSet;
use std::fmt;
use strum_macros::Display;

/// `lhs = rhs`
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    pub lhs: Expr,
    pub rhs: Expr,
}

impl Equation {
    pub fn new(lhs: Expr, rhs: Expr) -> Self {
        Equation { lhs, rhs }
    }

    /// `target = rhs`, e.g. `y'(x) = H(x, y)`
    pub fn explicit(target: Expr, rhs: Expr) -> Self {
        Equation { lhs: target, rhs }
    }

    /// `expr = 0`
    pub fn homogeneous(expr: Expr) -> Self {
        Equation {
            lhs: expr,
            rhs: Expr::zero(),
        }
    }

    pub fn map_sides<F>(&self, mut f: F) -> Result<Equation, SeriesError>
    where
        F: FnMut(&Expr) -> Result<Expr, SeriesError>,
    {
        Ok(Equation {
            lhs: f(&self.lhs)?,
            rhs: f(&self.rhs)?,
        })
    }

    pub fn contains_node(&self, node: &Expr) -> bool {
        self.lhs.contains_node(node) || self.rhs.contains_node(node)
    }
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.lhs, self.rhs)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionPoint {
    pub var: String,
    pub value: Expr,
}

impl ExpansionPoint {
    pub fn new(var: &str, value: Expr) -> Self {
        ExpansionPoint {
            var: var.to_string(),
            value,
        }
    }
}

/// `function^(order)(point) = value`
#[derive(Debug, Clone, PartialEq)]
pub struct InitialCondition {
    pub function: String,
    pub order: usize,
    pub point: Expr,
    pub value: Expr,
}

impl InitialCondition {
    /// `function(point) = value`
    pub fn value(function: &str, point: Expr, value: Expr) -> Self {
        InitialCondition {
            function: function.to_string(),
            order: 0,
            point,
            value,
        }
    }

    /// `function^(order)(point) = value`
    pub fn derivative(function: &str, order: usize, point: Expr, value: Expr) -> Self {
        InitialCondition {
            function: function.to_string(),
            order,
            point,
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum EquationKind {
    Scalar1stOrder,
    ScalarNthOrder,
    System,
}

/// Validated, canonicalized equation shape.
#[derive(Debug, Clone, PartialEq)]
pub enum EquationForm {
    Scalar1stOrder {
        equation: Equation,
        dep_var: String,
        indep_var: String,
    },
    ScalarNthOrder {
        equation: Equation,
        dep_var: String,
        indep_var: String,
        order: usize,
    },
    System {
        equations: Vec<Equation>,
        dep_vars: Vec<String>,
        indep_var: String,
    },
}

impl EquationForm {
    pub fn kind(&self) -> EquationKind {
        match self {
            EquationForm::Scalar1stOrder { .. } => EquationKind::Scalar1stOrder,
            EquationForm::ScalarNthOrder { .. } => EquationKind::ScalarNthOrder,
            EquationForm::System { .. } => EquationKind::System,
        }
    }

    pub fn indep_var(&self) -> &str {
        match self {
            EquationForm::Scalar1stOrder { indep_var, .. }
            | EquationForm::ScalarNthOrder { indep_var, .. }
            | EquationForm::System { indep_var, .. } => indep_var,
        }
    }

    /// dependent functions in component order
    pub fn dep_vars(&self) -> Vec<String> {
        match self {
            EquationForm::Scalar1stOrder { dep_var, .. }
            | EquationForm::ScalarNthOrder { dep_var, .. } => vec![dep_var.clone()],
            EquationForm::System { dep_vars, .. } => dep_vars.clone(),
        }
    }

    pub fn equations(&self) -> Vec<&Equation> {
        match self {
            EquationForm::Scalar1stOrder { equation, .. }
            | EquationForm::ScalarNthOrder { equation, .. } => vec![equation],
            EquationForm::System { equations, .. } => equations.iter().collect(),
        }
    }

    /// order of the highest derivative of every component
    pub fn differential_order(&self) -> usize {
        match self {
            EquationForm::ScalarNthOrder { order, .. } => *order,
            _ => 1,
        }
    }
}

//___________________________________VALIDATION____________________________________

/// Series order must be a non-negative integer.
pub fn validate_order(order: i64) -> Result<usize, SeriesError> {
    if order < 0 {
        return Err(SeriesError::input(format!(
            "order must be a non-negative integer, got {}",
            order
        )));
    }
    usize::try_from(order)
        .map_err(|_| SeriesError::input(format!("order {} does not fit the platform", order)))
}

/// Same as `validate_order` for an order given as an expression, e.g. from a front end.
pub fn validate_order_expr(order: &Expr) -> Result<usize, SeriesError> {
    let value = order.simplify();
    match value.as_rational() {
        Some(r) if r.is_integer() && !r.is_negative() => r.to_usize().ok_or_else(|| {
            SeriesError::input(format!("order {} is too large", r))
        }),
        _ => Err(SeriesError::input(format!(
            "order must be a non-negative integer, got {}",
            order
        ))),
    }
}

pub(crate) fn validate_names(dep_vars: &[String], indep_var: &str) -> Result<(), SeriesError> {
    if indep_var.trim().is_empty() {
        return Err(SeriesError::input("independent variable name is empty"));
    }
    if dep_vars.is_empty() {
        return Err(SeriesError::input("no dependent function given"));
    }
    let mut seen = HashSet::new();
    for dep in dep_vars {
        if dep.trim().is_empty() {
            return Err(SeriesError::input("dependent function name is empty"));
        }
        if dep == indep_var {
            return Err(SeriesError::input(format!(
                "dependent function {} has the name of the independent variable",
                dep
            )));
        }
        if !seen.insert(dep.as_str()) {
            return Err(SeriesError::input(format!(
                "dependent function {} is listed twice",
                dep
            )));
        }
    }
    Ok(())
}

pub(crate) fn validate_point(point: &ExpansionPoint, indep_var: &str) -> Result<(), SeriesError> {
    if point.var != indep_var {
        return Err(SeriesError::input(format!(
            "expansion point is given for {}, the independent variable is {}",
            point.var, indep_var
        )));
    }
    if point.value.contains_variable(indep_var) {
        return Err(SeriesError::input(format!(
            "expansion point {} depends on {}",
            point.value, indep_var
        )));
    }
    if point.value.contains_any_function() || point.value.contains_derivative() {
        return Err(SeriesError::input(format!(
            "expansion point {} must be a constant",
            point.value
        )));
    }
    if point.value.simplify().is_singular() {
        return Err(SeriesError::input(format!(
            "expansion point {} is undefined",
            point.value
        )));
    }
    Ok(())
}

fn validate_ic_point(ic: &InitialCondition, point: &ExpansionPoint) -> Result<(), SeriesError> {
    if !ic.point.same_value(&point.value) {
        return Err(SeriesError::input(format!(
            "initial condition for {} is given at {}, the expansion point is {} = {}",
            ic.function, ic.point, point.var, point.value
        )));
    }
    if ic.value.contains_variable(&point.var)
        || ic.value.contains_any_function()
        || ic.value.contains_derivative()
    {
        return Err(SeriesError::input(format!(
            "initial value {} of {} must be a constant",
            ic.value, ic.function
        )));
    }
    Ok(())
}

/// Values `y^(j)(x0)` for j = 0..n-1, exactly one condition per order.
pub(crate) fn validate_scalar_ics(
    ics: &[InitialCondition],
    dep_var: &str,
    n: usize,
    point: &ExpansionPoint,
) -> Result<Vec<Expr>, SeriesError> {
    if ics.len() != n {
        return Err(SeriesError::input(format!(
            "an equation of order {} in {} needs exactly {} initial conditions, got {}",
            n,
            dep_var,
            n,
            ics.len()
        )));
    }
    let mut values: Vec<Option<Expr>> = vec![None; n];
    for ic in ics {
        if ic.function != dep_var {
            return Err(SeriesError::input(format!(
                "initial condition is given for {}, expected {}",
                ic.function, dep_var
            )));
        }
        validate_ic_point(ic, point)?;
        if ic.order >= n {
            return Err(SeriesError::input(format!(
                "initial condition of order {} for {} exceeds the equation order {}",
                ic.order, dep_var, n
            )));
        }
        if values[ic.order].is_some() {
            return Err(SeriesError::input(format!(
                "initial condition of order {} for {} is given twice",
                ic.order, dep_var
            )));
        }
        values[ic.order] = Some(ic.value.simplify());
    }
    // n conditions, none repeated, all below n: every order is covered
    Ok(values.into_iter().flatten().collect())
}

/// One order-0 value per dependent function, returned in `dep_vars` order.
pub(crate) fn validate_system_ics(
    ics: &[InitialCondition],
    dep_vars: &[String],
    point: &ExpansionPoint,
) -> Result<Vec<Expr>, SeriesError> {
    if ics.len() != dep_vars.len() {
        return Err(SeriesError::input(format!(
            "a system of {} equations needs {} initial conditions, got {}",
            dep_vars.len(),
            dep_vars.len(),
            ics.len()
        )));
    }
    let mut values = Vec::with_capacity(dep_vars.len());
    for dep in dep_vars {
        let matching: Vec<&InitialCondition> =
            ics.iter().filter(|ic| &ic.function == dep).collect();
        let ic = match matching.as_slice() {
            [single] => *single,
            [] => {
                return Err(SeriesError::input(format!(
                    "no initial condition for {}",
                    dep
                )));
            }
            _ => {
                return Err(SeriesError::input(format!(
                    "more than one initial condition for {}",
                    dep
                )));
            }
        };
        if ic.order != 0 {
            return Err(SeriesError::input(format!(
                "systems take only order-0 initial conditions, {} has order {}",
                dep, ic.order
            )));
        }
        validate_ic_point(ic, point)?;
        values.push(ic.value.simplify());
    }
    Ok(values)
}

/// Binds bare dependent symbols to `f(x)` and checks every application is `f(x)` for a known `f`.
pub(crate) fn bind_and_check(
    expr: &Expr,
    dep_vars: &[String],
    indep_var: &str,
) -> Result<Expr, SeriesError> {
    let mut bound = expr.clone();
    for dep in dep_vars {
        bound = bound.bind_dependent(dep, indep_var);
    }
    let x = Expr::var(indep_var);
    let bad_application = |e: &Expr| match e {
        Expr::Func(name, arg) => !dep_vars.contains(name) || arg.as_ref() != &x,
        _ => false,
    };
    if bound.any_node(&bad_application) {
        return Err(SeriesError::input(format!(
            "in {}: dependent functions must be one of {:?} applied to {}",
            expr, dep_vars, indep_var
        )));
    }
    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point0() -> ExpansionPoint {
        ExpansionPoint::new("x", Expr::zero())
    }

    #[test]
    fn test_validate_order() {
        assert_eq!(validate_order(4).unwrap(), 4);
        assert!(matches!(validate_order(-1), Err(SeriesError::InputValidation(_))));
        assert_eq!(validate_order_expr(&Expr::int(3)).unwrap(), 3);
        assert!(validate_order_expr(&Expr::rational(5, 2)).is_err());
        assert!(validate_order_expr(&Expr::var("n")).is_err());
        assert!(validate_order_expr(&Expr::int(-2)).is_err());
    }

    #[test]
    fn test_nth_order_ics() {
        let ics = vec![
            InitialCondition::derivative("y", 1, Expr::zero(), Expr::int(2)),
            InitialCondition::value("y", Expr::zero(), Expr::int(1)),
        ];
        let values = validate_scalar_ics(&ics, "y", 2, &point0()).unwrap();
        assert_eq!(values, vec![Expr::int(1), Expr::int(2)]);
        // wrong count
        assert!(validate_scalar_ics(&ics, "y", 3, &point0()).is_err());
        // duplicated order
        let dup = vec![
            InitialCondition::value("y", Expr::zero(), Expr::int(1)),
            InitialCondition::value("y", Expr::zero(), Expr::int(2)),
        ];
        assert!(validate_scalar_ics(&dup, "y", 2, &point0()).is_err());
    }

    #[test]
    fn test_ic_point_must_match() {
        let ics = vec![InitialCondition::value("y", Expr::int(1), Expr::int(1))];
        let err = validate_scalar_ics(&ics, "y", 1, &point0()).unwrap_err();
        assert!(matches!(err, SeriesError::InputValidation(_)));
        // equal values written differently are accepted
        let ics = vec![InitialCondition::value(
            "y",
            Expr::rational(2, 2),
            Expr::int(1),
        )];
        let point = ExpansionPoint::new("x", Expr::int(1));
        assert!(validate_scalar_ics(&ics, "y", 1, &point).is_ok());
    }

    #[test]
    fn test_system_ics() {
        let deps = vec!["f".to_string(), "g".to_string()];
        let ics = vec![
            InitialCondition::value("g", Expr::zero(), Expr::int(1)),
            InitialCondition::value("f", Expr::zero(), Expr::int(0)),
        ];
        let values = validate_system_ics(&ics, &deps, &point0()).unwrap();
        assert_eq!(values, vec![Expr::int(0), Expr::int(1)]);
        assert!(validate_system_ics(&ics[..1], &deps, &point0()).is_err());
    }

    #[test]
    fn test_names_and_point() {
        assert!(validate_names(&["y".to_string()], "x").is_ok());
        assert!(validate_names(&["x".to_string()], "x").is_err());
        assert!(validate_names(&["y".to_string(), "y".to_string()], "x").is_err());
        assert!(validate_point(&ExpansionPoint::new("t", Expr::zero()), "x").is_err());
        assert!(validate_point(&ExpansionPoint::new("x", Expr::var("x")), "x").is_err());
        assert!(validate_point(&ExpansionPoint::new("x", Expr::var("a")), "x").is_ok());
    }

    #[test]
    fn test_bind_and_check() {
        let deps = vec!["y".to_string()];
        let e = Expr::var("y") * Expr::var("x");
        let bound = bind_and_check(&e, &deps, "x").unwrap();
        assert_eq!(bound, Expr::func("y", Expr::var("x")) * Expr::var("x"));
        let wrong_arg = Expr::func("y", Expr::int(2) * Expr::var("x"));
        assert!(bind_and_check(&wrong_arg, &deps, "x").is_err());
        let unknown = Expr::func("g", Expr::var("x"));
        assert!(bind_and_check(&unknown, &deps, "x").is_err());
    }

    #[test]
    fn test_form_kind() {
        let y = Expr::func("y", Expr::var("x"));
        let form = EquationForm::ScalarNthOrder {
            equation: Equation::explicit(Expr::derivative(y.clone(), "x", 2), y),
            dep_var: "y".to_string(),
            indep_var: "x".to_string(),
            order: 2,
        };
        assert_eq!(form.kind(), EquationKind::ScalarNthOrder);
        assert_eq!(form.kind().to_string(), "ScalarNthOrder");
        assert_eq!(form.differential_order(), 2);
        assert_eq!(form.dep_vars(), vec!["y".to_string()]);
    }
}
