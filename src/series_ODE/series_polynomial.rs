//! Truncated power series over the basis (x - x0).
//!
//! The polynomial is kept as a genuine list of terms: every coefficient is normalised on its own
//! and the sum is never brought to a common denominator, so `1 + x + x^2/2 + x^3/6` stays readable.
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::utils::factorial;
use itertools::Itertools;
use num::{BigRational, One, Signed, ToPrimitive, Zero};
use std::fmt;
use tabled::{builder::Builder, settings::Style};

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesTerm {
    pub coefficient: Expr,
    pub power: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPolynomial {
    function: String,
    var: String,
    center: Expr,
    terms: Vec<SeriesTerm>,
}

impl SeriesPolynomial {
    pub fn new(function: &str, var: &str, center: Expr) -> Self {
        SeriesPolynomial {
            function: function.to_string(),
            var: var.to_string(),
            center,
            terms: Vec::new(),
        }
    }

    /// Builds a series from coefficients a_0, a_1, ... in increasing power.
    pub fn from_coefficients(
        function: &str,
        var: &str,
        center: Expr,
        coefficients: Vec<Expr>,
    ) -> Self {
        let mut series = SeriesPolynomial::new(function, var, center);
        for coefficient in coefficients {
            series.push_coefficient(coefficient);
        }
        series
    }

    /// Appends the coefficient of the next power.
    pub fn push_coefficient(&mut self, coefficient: Expr) {
        let power = self.terms.len();
        self.terms.push(SeriesTerm { coefficient, power });
    }

    pub fn terms(&self) -> &[SeriesTerm] {
        &self.terms
    }

    pub fn coefficient(&self, power: usize) -> Option<&Expr> {
        self.terms.get(power).map(|term| &term.coefficient)
    }

    /// highest power kept
    pub fn order(&self) -> usize {
        self.terms.len().saturating_sub(1)
    }

    pub fn center(&self) -> &Expr {
        &self.center
    }

    pub fn var(&self) -> &str {
        &self.var
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    fn base(&self) -> Expr {
        let x = Expr::Var(self.var.clone());
        if self.center.is_zero() {
            x
        } else {
            x - self.center.clone()
        }
    }

    /// The series as an expression in the independent variable, terms in increasing power.
    pub fn to_expr(&self) -> Expr {
        let base = self.base();
        let mut sum: Option<Expr> = None;
        for term in &self.terms {
            let monomial = match term.power {
                0 => term.coefficient.clone(),
                1 => term.coefficient.clone() * base.clone(),
                k => term.coefficient.clone() * base.clone().pow(Expr::int(k as i64)),
            };
            sum = Some(match sum {
                None => monomial,
                Some(acc) => acc + monomial,
            });
        }
        sum.unwrap_or_else(Expr::zero)
    }

    /// y^(k)(x0) = a_k * k!
    pub fn derivative_at_center(&self, k: usize) -> Option<Expr> {
        let coefficient = self.coefficient(k)?;
        let value = match coefficient {
            Expr::Const(c) => Expr::Const(c * factorial(k)),
            symbolic => (Expr::Const(factorial(k)) * symbolic.clone()).expand_normal(),
        };
        Some(value)
    }

    /// Numeric value of the truncated series; None if a coefficient or the center is symbolic.
    pub fn evaluate(&self, x: f64) -> Option<f64> {
        let center = self.center.as_rational()?.to_f64()?;
        let h = x - center;
        let mut sum = 0.0;
        for term in self.terms.iter().rev() {
            let c = term.coefficient.as_rational()?.to_f64()?;
            sum = sum * h + c;
        }
        Some(sum)
    }

    /// number of distinct non-zero coefficient values
    pub fn distinct_coefficients(&self) -> usize {
        self.terms
            .iter()
            .filter(|term| !term.coefficient.is_zero())
            .map(|term| term.coefficient.to_string())
            .unique()
            .count()
    }

    /// number of non-zero terms
    pub fn nonzero_terms(&self) -> usize {
        self.terms
            .iter()
            .filter(|term| !term.coefficient.is_zero())
            .count()
    }

    /// Pretty table of power, coefficient and derivative value at the expansion point.
    pub fn coefficient_table(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record(vec![
            "k".to_string(),
            format!("a_k of {}", self.function),
            format!("{}^(k)({})", self.function, self.center),
        ]);
        for term in &self.terms {
            let derivative = self
                .derivative_at_center(term.power)
                .map(|d| d.to_string())
                .unwrap_or_default();
            builder.push_record(vec![
                term.power.to_string(),
                term.coefficient.to_string(),
                derivative,
            ]);
        }
        let mut table = builder.build();
        table.with(Style::modern_rounded());
        table.to_string()
    }

    fn base_string(&self) -> String {
        match self.center.as_rational() {
            Some(c) if c.is_zero() => self.var.clone(),
            Some(c) if c.is_negative() => format!("({} + {})", self.var, -c),
            _ => format!("({} - {})", self.var, self.center),
        }
    }
}

fn power_string(base: &str, power: usize) -> String {
    match power {
        1 => base.to_string(),
        k => format!("{}^{}", base, k),
    }
}

/// |c| * m printed as `m`, `2*m`, `m/6` or `3*m/2`
fn rational_term(magnitude: &BigRational, monomial: &str) -> String {
    let numer = magnitude.numer();
    let denom = magnitude.denom();
    let head = if numer.is_one() {
        monomial.to_string()
    } else {
        format!("{}*{}", numer, monomial)
    };
    if denom.is_one() {
        head
    } else {
        format!("{}/{}", head, denom)
    }
}

/// sign and magnitude of a symbolic coefficient: a leading negative constant becomes the sign,
/// a product is printed without its outer parentheses
fn symbolic_term(coefficient: &Expr) -> (bool, String) {
    let (negative, magnitude) = match coefficient {
        Expr::Mul(lhs, rhs) => match lhs.as_ref() {
            Expr::Const(c) if c.is_negative() => {
                let c = -c;
                let rest = rhs.as_ref().clone();
                (true, if c.is_one() { rest } else { Expr::Const(c) * rest })
            }
            _ => (false, coefficient.clone()),
        },
        _ => (false, coefficient.clone()),
    };
    let printed = magnitude.to_string();
    match magnitude {
        Expr::Mul(..) => (negative, printed[1..printed.len() - 1].to_string()),
        _ => (negative, printed),
    }
}

impl fmt::Display for SeriesPolynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = self.base_string();
        let mut first = true;
        for term in self.terms.iter().filter(|t| !t.coefficient.is_zero()) {
            let (negative, body) = match (&term.coefficient, term.power) {
                (Expr::Const(c), 0) => (c.is_negative(), c.abs().to_string()),
                (Expr::Const(c), k) => {
                    let monomial = power_string(&base, k);
                    (c.is_negative(), rational_term(&c.abs(), &monomial))
                }
                (symbolic, 0) => symbolic_term(symbolic),
                (symbolic, k) => {
                    let (negative, body) = symbolic_term(symbolic);
                    (negative, format!("{}*{}", body, power_string(&base, k)))
                }
            };
            match (first, negative) {
                (true, true) => write!(f, "-{}", body)?,
                (true, false) => write!(f, "{}", body)?,
                (false, true) => write!(f, " - {}", body)?,
                (false, false) => write!(f, " + {}", body)?,
            }
            first = false;
        }
        if first {
            write!(f, "0")?;
        }
        Ok(())
    }
}
