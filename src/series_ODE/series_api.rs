//! Public operations: `solve_scalar`, `solve_nth_order`, `solve_system` and their `check_*`
//! counterparts.
//!
//! Every operation validates its whole input (order, names, expansion point, initial conditions)
//! before any derivative is computed.
//!
//! # Example
//! ```rust, ignore
//! use RustedTaylor::series_ODE::series_api::*;
//! let x = Expr::var("x");
//! let y = Expr::func("y", x.clone());
//! // y' = y, y(0) = 1
//! let eq = Equation::explicit(Expr::derivative(y.clone(), "x", 1), y);
//! let point = ExpansionPoint::new("x", Expr::zero());
//! let ic = InitialCondition::value("y", Expr::zero(), Expr::one());
//! let series = solve_scalar(&eq, "y", "x", &point, 4, &ic).unwrap();
//! assert_eq!(series.to_string(), "1 + x + x^2/2 + x^3/6 + x^4/24");
//! ```
pub use crate::series_ODE::config::SeriesConfig;
pub use crate::series_ODE::equation_form::{
    Equation, EquationForm, EquationKind, ExpansionPoint, InitialCondition,
};
pub use crate::series_ODE::errors::SeriesError;
pub use crate::series_ODE::series_polynomial::SeriesPolynomial;
pub use crate::symbolic::symbolic_engine::Expr;

use crate::Utils::logger::{init_logger, parse_loglevel};
use crate::series_ODE::coefficient_recursion::{
    RecursionContext, scalar_first_order, scalar_nth_order, system_first_order,
};
use crate::series_ODE::equation_form::{
    bind_and_check, validate_names, validate_order, validate_point, validate_scalar_ics,
    validate_system_ics,
};
use crate::series_ODE::order_detector::{detect_order, structural_max_order};
use crate::series_ODE::residual_validator::check_residual;
use crate::series_ODE::rhs_extractor::{extract_rhs, extract_rhs_vector};
use crate::series_ODE::trace::{LogTrace, NoopTrace, TraceEvent, TraceSink};
use log::{LevelFilter, info};
use std::time::Instant;

/// Entry point of the engine: configuration plus an observational trace sink.
pub struct TaylorSolver {
    pub config: SeriesConfig,
    trace: Box<dyn TraceSink>,
}

impl Default for TaylorSolver {
    fn default() -> Self {
        TaylorSolver::new(SeriesConfig::default())
    }
}

/// validated input of a scalar solve or check
struct ScalarTask {
    form: EquationForm,
    rhs: Expr,
    values: Vec<Expr>,
    order: usize,
}

/// validated input of a system solve or check
struct SystemTask {
    form: EquationForm,
    rhs: Vec<Expr>,
    values: Vec<Expr>,
    order: usize,
}

impl TaylorSolver {
    /// A debug log level also forwards the trace to the logger.
    pub fn new(config: SeriesConfig) -> Self {
        let trace: Box<dyn TraceSink> =
            match config.loglevel.as_deref().and_then(parse_loglevel) {
                Some(LevelFilter::Debug) => Box::new(LogTrace),
                _ => Box::new(NoopTrace),
            };
        TaylorSolver { config, trace }
    }

    pub fn with_trace(mut self, trace: Box<dyn TraceSink>) -> Self {
        self.trace = trace;
        self
    }

    fn start_logging(&self) {
        if let Some(level) = &self.config.loglevel {
            // a logger installed earlier stays in place
            let _ = init_logger(level, None);
        }
    }

    fn canonical_equation(
        &self,
        equation: &Equation,
        dep_vars: &[String],
        indep_var: &str,
        label: &str,
    ) -> Result<Equation, SeriesError> {
        let margin = self.config.safety_margin;
        let canonical = equation.map_sides(|side| {
            let bound = bind_and_check(side, dep_vars, indep_var)?;
            Ok(bound.canonicalize_with_margin(margin)?)
        })?;
        self.trace.record(TraceEvent::Canonical {
            function: label.to_string(),
            form: canonical.to_string(),
        });
        Ok(canonical)
    }

    fn detector_bound(&self, order: usize) -> usize {
        self.config.detection_upper_bound.max(order) + self.config.safety_margin
    }

    fn context<'a>(
        &'a self,
        indep_var: &'a str,
        point: &'a ExpansionPoint,
        functions: &'a [String],
    ) -> RecursionContext<'a> {
        RecursionContext {
            indep_var,
            x0: &point.value,
            functions,
            safety_margin: self.config.safety_margin,
            trace: self.trace.as_ref(),
        }
    }

    fn record_rhs(&self, function: &str, order: usize, rhs: &Expr) {
        info!("{}^({}) = {}", function, order, rhs);
        self.trace.record(TraceEvent::RhsIsolated {
            function: function.to_string(),
            order,
            rhs: rhs.to_string(),
        });
    }

    //___________________________________PREPARATION____________________________________

    /// Highest derivative order of `dep_var` over all equations of a system; the equations that
    /// mention a derivative of it are tried first.
    fn system_order(
        &self,
        canonical: &[Equation],
        dep_var: &str,
        indep_var: &str,
        order: usize,
    ) -> Result<usize, SeriesError> {
        let mentions = |eq: &&Equation| {
            structural_max_order(&eq.lhs, dep_var, indep_var).is_some()
                || structural_max_order(&eq.rhs, dep_var, indep_var).is_some()
        };
        let mut candidates: Vec<&Equation> = canonical.iter().filter(mentions).collect();
        if candidates.is_empty() {
            candidates = canonical.iter().collect();
        }
        let mut found: Option<usize> = None;
        let mut last_error = None;
        for eq in candidates {
            match detect_order(
                eq,
                dep_var,
                indep_var,
                self.detector_bound(order),
                self.trace.as_ref(),
            ) {
                Ok(k) => found = Some(found.map_or(k, |max| max.max(k))),
                Err(err) => last_error = Some(err),
            }
        }
        match (found, last_error) {
            (Some(k), _) => Ok(k),
            (None, Some(err)) => Err(err),
            (None, None) => Err(SeriesError::Detection(format!(
                "the system has no equation for {}",
                dep_var
            ))),
        }
    }

    fn prepare_first_order(
        &self,
        equation: &Equation,
        dep_var: &str,
        indep_var: &str,
        point: &ExpansionPoint,
        order: i64,
        ic: &InitialCondition,
    ) -> Result<ScalarTask, SeriesError> {
        let order = validate_order(order)?;
        let dep_vars = vec![dep_var.to_string()];
        validate_names(&dep_vars, indep_var)?;
        validate_point(point, indep_var)?;
        let values = validate_scalar_ics(std::slice::from_ref(ic), dep_var, 1, point)?;
        let canonical = self.canonical_equation(equation, &dep_vars, indep_var, dep_var)?;
        let found = [&canonical.lhs, &canonical.rhs]
            .into_iter()
            .filter_map(|side| structural_max_order(side, dep_var, indep_var))
            .max();
        match found {
            Some(1) => {}
            Some(k) => {
                return Err(SeriesError::input(format!(
                    "{} is of order {} in {}, use the n-th order solver",
                    canonical, k, dep_var
                )));
            }
            None => {
                return Err(SeriesError::input(format!(
                    "{} contains no first derivative of {}",
                    canonical, dep_var
                )));
            }
        }
        let target = Expr::derivative(Expr::func(dep_var, Expr::var(indep_var)), indep_var, 1);
        let rhs = extract_rhs(&canonical, &target)?;
        self.record_rhs(dep_var, 1, &rhs);
        Ok(ScalarTask {
            form: EquationForm::Scalar1stOrder {
                equation: canonical,
                dep_var: dep_var.to_string(),
                indep_var: indep_var.to_string(),
            },
            rhs,
            values,
            order,
        })
    }

    fn prepare_nth_order(
        &self,
        equation: &Equation,
        dep_var: &str,
        indep_var: &str,
        point: &ExpansionPoint,
        order: i64,
        ics: &[InitialCondition],
    ) -> Result<ScalarTask, SeriesError> {
        let order = validate_order(order)?;
        let dep_vars = vec![dep_var.to_string()];
        validate_names(&dep_vars, indep_var)?;
        validate_point(point, indep_var)?;
        let canonical = self.canonical_equation(equation, &dep_vars, indep_var, dep_var)?;
        let n = detect_order(
            &canonical,
            dep_var,
            indep_var,
            self.detector_bound(order),
            self.trace.as_ref(),
        )?;
        let values = validate_scalar_ics(ics, dep_var, n, point)?;
        let target = Expr::derivative(Expr::func(dep_var, Expr::var(indep_var)), indep_var, n);
        let rhs = extract_rhs(&canonical, &target)?;
        if structural_max_order(&rhs, dep_var, indep_var).is_some_and(|k| k >= n) {
            return Err(SeriesError::Isolation {
                equation: canonical.to_string(),
                reason: format!("the right-hand side of {} still contains it", target),
            });
        }
        self.record_rhs(dep_var, n, &rhs);
        Ok(ScalarTask {
            form: EquationForm::ScalarNthOrder {
                equation: canonical,
                dep_var: dep_var.to_string(),
                indep_var: indep_var.to_string(),
                order: n,
            },
            rhs,
            values,
            order,
        })
    }

    fn prepare_system(
        &self,
        equations: &[Equation],
        dep_vars: &[String],
        indep_var: &str,
        point: &ExpansionPoint,
        order: i64,
        ics: &[InitialCondition],
    ) -> Result<SystemTask, SeriesError> {
        let order = validate_order(order)?;
        if equations.len() != dep_vars.len() {
            return Err(SeriesError::input(format!(
                "{} equations given for {} dependent functions",
                equations.len(),
                dep_vars.len()
            )));
        }
        validate_names(dep_vars, indep_var)?;
        validate_point(point, indep_var)?;
        let values = validate_system_ics(ics, dep_vars, point)?;
        let label = dep_vars.join(", ");
        let canonical = equations
            .iter()
            .map(|equation| self.canonical_equation(equation, dep_vars, indep_var, &label))
            .collect::<Result<Vec<Equation>, SeriesError>>()?;
        for dep in dep_vars {
            let n = self.system_order(&canonical, dep, indep_var, order)?;
            if n != 1 {
                return Err(SeriesError::input(format!(
                    "system equations must be first order, {} appears with a derivative of order {}",
                    dep, n
                )));
            }
        }
        let targets: Vec<Expr> = dep_vars
            .iter()
            .map(|dep| Expr::derivative(Expr::func(dep, Expr::var(indep_var)), indep_var, 1))
            .collect();
        // one shared isolation pass before any component is advanced
        let rhs = extract_rhs_vector(&canonical, &targets)?;
        for (dep, h) in dep_vars.iter().zip(&rhs) {
            self.record_rhs(dep, 1, h);
        }
        Ok(SystemTask {
            form: EquationForm::System {
                equations: canonical,
                dep_vars: dep_vars.to_vec(),
                indep_var: indep_var.to_string(),
            },
            rhs,
            values,
            order,
        })
    }

    //___________________________________SOLVE____________________________________

    /// Series solution of `y' = H(x, y)` with `y(x0) = y0`.
    pub fn solve_scalar(
        &self,
        equation: &Equation,
        dep_var: &str,
        indep_var: &str,
        point: &ExpansionPoint,
        order: i64,
        ic: &InitialCondition,
    ) -> Result<SeriesPolynomial, SeriesError> {
        self.start_logging();
        let begin = Instant::now();
        let task = self.prepare_first_order(equation, dep_var, indep_var, point, order, ic)?;
        let functions = task.form.dep_vars();
        let ctx = self.context(indep_var, point, &functions);
        let series = scalar_first_order(&ctx, dep_var, &task.rhs, &task.values[0], task.order)?;
        info!(
            "{}: {} = {} (order {}, {} ms)",
            task.form.kind(),
            dep_var,
            series,
            task.order,
            begin.elapsed().as_millis()
        );
        Ok(series)
    }

    /// Series solution of an explicit n-th order equation with the n initial values
    /// `y(x0), y'(x0), ..., y^(n-1)(x0)`. The order n is detected from the equation.
    pub fn solve_nth_order(
        &self,
        equation: &Equation,
        dep_var: &str,
        indep_var: &str,
        point: &ExpansionPoint,
        order: i64,
        ics: &[InitialCondition],
    ) -> Result<SeriesPolynomial, SeriesError> {
        self.start_logging();
        let begin = Instant::now();
        let task = self.prepare_nth_order(equation, dep_var, indep_var, point, order, ics)?;
        let n = task.form.differential_order();
        let functions = task.form.dep_vars();
        let ctx = self.context(indep_var, point, &functions);
        let series = scalar_nth_order(&ctx, dep_var, &task.rhs, n, &task.values, task.order)?;
        info!(
            "{}: {} = {} (equation order {}, series order {}, {} ms)",
            task.form.kind(),
            dep_var,
            series,
            n,
            task.order,
            begin.elapsed().as_millis()
        );
        Ok(series)
    }

    /// Series solution of a first-order system `f_i' = H_i(x, f_1, ..., f_k)`, one series per
    /// dependent function in `dep_vars` order.
    pub fn solve_system(
        &self,
        equations: &[Equation],
        dep_vars: &[String],
        indep_var: &str,
        point: &ExpansionPoint,
        order: i64,
        ics: &[InitialCondition],
    ) -> Result<Vec<SeriesPolynomial>, SeriesError> {
        self.start_logging();
        let begin = Instant::now();
        let task = self.prepare_system(equations, dep_vars, indep_var, point, order, ics)?;
        let ctx = self.context(indep_var, point, dep_vars);
        let series = system_first_order(
            &ctx,
            &task.rhs,
            &task.values,
            task.order,
            self.config.parallel_system,
        )?;
        for s in &series {
            info!("{} = {}", s.function(), s);
        }
        info!(
            "{} of {} equations solved to order {} in {} ms",
            task.form.kind(),
            dep_vars.len(),
            task.order,
            begin.elapsed().as_millis()
        );
        Ok(series)
    }

    //___________________________________CHECK____________________________________

    /// true if the initial values of `series` are the given ones
    fn matches_initial_values(series: &SeriesPolynomial, values: &[Expr]) -> bool {
        // a series shorter than the initial data cannot contradict it
        values.iter().enumerate().all(|(j, value)| {
            series
                .derivative_at_center(j)
                .is_none_or(|at_center| at_center.same_value(value))
        })
    }

    /// Checks a candidate series of `y' = H(x, y)`: initial value and residual through `order - 1`.
    pub fn check_scalar(
        &self,
        equation: &Equation,
        dep_var: &str,
        indep_var: &str,
        point: &ExpansionPoint,
        order: i64,
        ic: &InitialCondition,
        series: &SeriesPolynomial,
    ) -> Result<bool, SeriesError> {
        self.start_logging();
        let task = self.prepare_first_order(equation, dep_var, indep_var, point, order, ic)?;
        if !Self::matches_initial_values(series, &task.values) {
            return Ok(false);
        }
        check_residual(
            std::slice::from_ref(series),
            &task.form,
            point,
            task.order,
            self.trace.as_ref(),
        )
    }

    /// Checks a candidate series of an n-th order equation: initial values and residual through
    /// `order - n`.
    pub fn check_nth_order(
        &self,
        equation: &Equation,
        dep_var: &str,
        indep_var: &str,
        point: &ExpansionPoint,
        order: i64,
        ics: &[InitialCondition],
        series: &SeriesPolynomial,
    ) -> Result<bool, SeriesError> {
        self.start_logging();
        let task = self.prepare_nth_order(equation, dep_var, indep_var, point, order, ics)?;
        if !Self::matches_initial_values(series, &task.values) {
            return Ok(false);
        }
        check_residual(
            std::slice::from_ref(series),
            &task.form,
            point,
            task.order,
            self.trace.as_ref(),
        )
    }

    /// Checks candidate series of a first-order system: initial values and every component's
    /// residual through `order - 1`.
    pub fn check_system(
        &self,
        equations: &[Equation],
        dep_vars: &[String],
        indep_var: &str,
        point: &ExpansionPoint,
        order: i64,
        ics: &[InitialCondition],
        series: &[SeriesPolynomial],
    ) -> Result<bool, SeriesError> {
        self.start_logging();
        let task = self.prepare_system(equations, dep_vars, indep_var, point, order, ics)?;
        if series.len() != dep_vars.len() {
            return Err(SeriesError::input(format!(
                "{} series given for {} dependent functions",
                series.len(),
                dep_vars.len()
            )));
        }
        let initial_ok = series
            .iter()
            .zip(&task.values)
            .all(|(s, value)| Self::matches_initial_values(s, std::slice::from_ref(value)));
        if !initial_ok {
            return Ok(false);
        }
        check_residual(series, &task.form, point, task.order, self.trace.as_ref())
    }
}

//___________________________________FREE FUNCTIONS____________________________________

pub fn solve_scalar(
    equation: &Equation,
    dep_var: &str,
    indep_var: &str,
    point: &ExpansionPoint,
    order: i64,
    ic: &InitialCondition,
) -> Result<SeriesPolynomial, SeriesError> {
    TaylorSolver::default().solve_scalar(equation, dep_var, indep_var, point, order, ic)
}

pub fn solve_nth_order(
    equation: &Equation,
    dep_var: &str,
    indep_var: &str,
    point: &ExpansionPoint,
    order: i64,
    ics: &[InitialCondition],
) -> Result<SeriesPolynomial, SeriesError> {
    TaylorSolver::default().solve_nth_order(equation, dep_var, indep_var, point, order, ics)
}

pub fn solve_system(
    equations: &[Equation],
    dep_vars: &[String],
    indep_var: &str,
    point: &ExpansionPoint,
    order: i64,
    ics: &[InitialCondition],
) -> Result<Vec<SeriesPolynomial>, SeriesError> {
    TaylorSolver::default().solve_system(equations, dep_vars, indep_var, point, order, ics)
}

pub fn check_scalar(
    equation: &Equation,
    dep_var: &str,
    indep_var: &str,
    point: &ExpansionPoint,
    order: i64,
    ic: &InitialCondition,
    series: &SeriesPolynomial,
) -> Result<bool, SeriesError> {
    TaylorSolver::default().check_scalar(equation, dep_var, indep_var, point, order, ic, series)
}

pub fn check_nth_order(
    equation: &Equation,
    dep_var: &str,
    indep_var: &str,
    point: &ExpansionPoint,
    order: i64,
    ics: &[InitialCondition],
    series: &SeriesPolynomial,
) -> Result<bool, SeriesError> {
    TaylorSolver::default().check_nth_order(equation, dep_var, indep_var, point, order, ics, series)
}

pub fn check_system(
    equations: &[Equation],
    dep_vars: &[String],
    indep_var: &str,
    point: &ExpansionPoint,
    order: i64,
    ics: &[InitialCondition],
    series: &[SeriesPolynomial],
) -> Result<bool, SeriesError> {
    TaylorSolver::default().check_system(equations, dep_vars, indep_var, point, order, ics, series)
}
