//! # Symbolic Expression Simplification Module
//!
//! Exact simplification over arbitrary-precision rationals.
//!
//! ## Simplification Strategy
//!
//! 1. **Constant Folding**: arithmetic between `BigRational` constants, exact integer powers and
//!    rational powers whose root is exact. Division by an exact zero is never folded.
//! 2. **Algebraic Identities**: `x + 0 = x`, `x * 1 = x`, `x * 0 = 0`, `x^0 = 1`, `x^1 = x`, ...
//! 3. **Special Values**: `exp(0) = 1`, `ln(1) = 0`, `sin(0) = 0`, `cos(0) = 1`, ...
//! 4. **Polynomial Normal Form**: sums of monomials over opaque atoms with rational
//!    coefficients, used for symbolic coefficients, zero tests and linearity checks.
//!
//! Simplification never rewrites derivative nodes themselves, only their targets.

use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::utils::{rational_pow_exact, rational_powi};
use num::{BigInt, BigRational, One, Signed, ToPrimitive, Zero};
use std::collections::BTreeMap;

/// upper bound on the exponent of a sum that the normal form is willing to expand
const MAX_EXPANDED_POWER: i64 = 32;
const MAX_SIMPLIFY_PASSES: usize = 16;

impl Expr {
    //___________________________________SIMPLIFICATION____________________________________

    /// One bottom-up simplification pass.
    pub fn simplify_(&self) -> Expr {
        let node = self.map_children(|child| child.simplify_());
        match node {
            Expr::Add(lhs, rhs) => simplify_add(*lhs, *rhs),
            Expr::Sub(lhs, rhs) => simplify_sub(*lhs, *rhs),
            Expr::Mul(lhs, rhs) => simplify_mul(*lhs, *rhs),
            Expr::Div(lhs, rhs) => simplify_div(*lhs, *rhs),
            Expr::Pow(base, exp) => simplify_pow(*base, *exp),
            Expr::Exp(arg) if arg.is_zero() => Expr::one(),
            Expr::Ln(arg) if arg.is_one() => Expr::zero(),
            Expr::sin(arg) | Expr::tg(arg) | Expr::arcsin(arg) | Expr::arctg(arg)
                if arg.is_zero() =>
            {
                Expr::zero()
            }
            Expr::cos(arg) if arg.is_zero() => Expr::one(),
            Expr::arccos(arg) if arg.is_one() => Expr::zero(),
            other => other,
        }
    }

    /// Repeats `simplify_` until the expression stops changing.
    pub fn simplify(&self) -> Expr {
        let mut current = self.simplify_();
        for _ in 1..MAX_SIMPLIFY_PASSES {
            let next = current.simplify_();
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    /// true if a division by an exact zero (or 0^negative) survives simplification
    pub fn is_singular(&self) -> bool {
        self.any_node(&|e| match e {
            Expr::Div(_, den) => den.is_zero(),
            Expr::Pow(base, exp) => base.is_zero() && exp.is_negative_const(),
            _ => false,
        })
    }

    //___________________________________NORMAL FORM____________________________________

    /// Polynomial normal form of the expression over opaque atoms.
    pub fn normal_form(&self) -> PolyForm {
        to_poly(&self.simplify())
    }

    /// Expanded, like-terms-collected version of the expression.
    pub fn expand_normal(&self) -> Expr {
        self.normal_form().to_expr()
    }

    /// Exact zero test through the normal form.
    pub fn is_identically_zero(&self) -> bool {
        self.normal_form().is_zero()
    }

    /// true if both expressions have the same normal form
    pub fn same_value(&self, other: &Expr) -> bool {
        (self.clone() - other.clone()).is_identically_zero()
    }
}

fn neg_of(expr: Expr) -> Expr {
    simplify_mul(Expr::int(-1), expr)
}

fn simplify_add(lhs: Expr, rhs: Expr) -> Expr {
    match (&lhs, &rhs) {
        (Expr::Const(a), Expr::Const(b)) => Expr::Const(a + b),
        _ if lhs.is_zero() => rhs,
        _ if rhs.is_zero() => lhs,
        // a + (-c)*b = a - c*b keeps printed sums readable
        (_, Expr::Mul(c, b)) if c.is_negative_const() => {
            let positive = simplify_mul(neg_of(c.as_ref().clone()), b.as_ref().clone());
            simplify_sub(lhs, positive)
        }
        (_, Expr::Const(c)) if c.is_negative() => simplify_sub(lhs, Expr::Const(-c)),
        _ => Expr::Add(lhs.boxed(), rhs.boxed()),
    }
}

fn simplify_sub(lhs: Expr, rhs: Expr) -> Expr {
    match (&lhs, &rhs) {
        (Expr::Const(a), Expr::Const(b)) => Expr::Const(a - b),
        _ if rhs.is_zero() => lhs,
        _ if lhs.is_zero() => neg_of(rhs),
        _ if lhs == rhs => Expr::zero(),
        _ => Expr::Sub(lhs.boxed(), rhs.boxed()),
    }
}

fn simplify_mul(lhs: Expr, rhs: Expr) -> Expr {
    match (&lhs, &rhs) {
        (Expr::Const(a), Expr::Const(b)) => Expr::Const(a * b),
        _ if lhs.is_zero() || rhs.is_zero() => Expr::zero(),
        _ if lhs.is_one() => rhs,
        _ if rhs.is_one() => lhs,
        // constants are kept on the left
        (_, Expr::Const(_)) => simplify_mul(rhs, lhs),
        // c1 * (c2 * e) = (c1*c2) * e
        (Expr::Const(a), Expr::Mul(inner_l, inner_r)) => match inner_l.as_ref() {
            Expr::Const(b) => simplify_mul(Expr::Const(a * b), inner_r.as_ref().clone()),
            _ => Expr::Mul(lhs.boxed(), rhs.boxed()),
        },
        // (c * e1) * e2 = c * (e1 * e2)
        (Expr::Mul(inner_l, inner_r), _) if matches!(inner_l.as_ref(), Expr::Const(_)) => {
            let product = simplify_mul(inner_r.as_ref().clone(), rhs.clone());
            simplify_mul(inner_l.as_ref().clone(), product)
        }
        // e1 * (c * e2) = c * (e1 * e2)
        (_, Expr::Mul(inner_l, inner_r)) if matches!(inner_l.as_ref(), Expr::Const(_)) => {
            let product = simplify_mul(lhs.clone(), inner_r.as_ref().clone());
            simplify_mul(inner_l.as_ref().clone(), product)
        }
        // x^a * x^b = x^(a+b)
        (Expr::Pow(base1, exp1), Expr::Pow(base2, exp2)) if base1 == base2 => simplify_pow(
            base1.as_ref().clone(),
            simplify_add(exp1.as_ref().clone(), exp2.as_ref().clone()),
        ),
        (Expr::Pow(base, exp), other) | (other, Expr::Pow(base, exp))
            if base.as_ref() == other =>
        {
            simplify_pow(
                other.clone(),
                simplify_add(exp.as_ref().clone(), Expr::one()),
            )
        }
        _ if lhs == rhs => simplify_pow(lhs, Expr::int(2)),
        _ => Expr::Mul(lhs.boxed(), rhs.boxed()),
    }
}

fn simplify_div(lhs: Expr, rhs: Expr) -> Expr {
    match (&lhs, &rhs) {
        // division by an exact zero is left for `is_singular` to report
        _ if rhs.is_zero() => Expr::Div(lhs.boxed(), rhs.boxed()),
        (Expr::Const(a), Expr::Const(b)) => Expr::Const(a / b),
        _ if lhs.is_zero() => Expr::zero(),
        _ if rhs.is_one() => lhs,
        (_, Expr::Const(b)) => simplify_mul(Expr::Const(b.recip()), lhs),
        _ if lhs == rhs => Expr::one(),
        _ => Expr::Div(lhs.boxed(), rhs.boxed()),
    }
}

fn simplify_pow(base: Expr, exp: Expr) -> Expr {
    match (&base, &exp) {
        _ if exp.is_zero() => Expr::one(),
        _ if exp.is_one() => base,
        _ if base.is_one() => Expr::one(),
        (Expr::Const(b), Expr::Const(e)) => match rational_pow_exact(b, e) {
            Some(value) => Expr::Const(value),
            None => Expr::Pow(base.boxed(), exp.boxed()),
        },
        // (b^m)^n = b^(m*n) for integer m, n
        (Expr::Pow(inner_base, inner_exp), Expr::Const(n)) if n.is_integer() => {
            match inner_exp.as_ref() {
                Expr::Const(m) if m.is_integer() => {
                    simplify_pow(inner_base.as_ref().clone(), Expr::Const(m * n))
                }
                _ => Expr::Pow(base.boxed(), exp.boxed()),
            }
        }
        _ => Expr::Pow(base.boxed(), exp.boxed()),
    }
}

//___________________________________POLYNOMIAL NORMAL FORM____________________________________

/// Represents the atom part of a polynomial term (monomial): atom key -> exponent.
///
/// Atoms are every subexpression the normal form does not look into (symbols, function
/// applications, derivative nodes, elementary functions, non-integer powers); they are keyed
/// by the display string of their own normalised form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonomialKey(pub BTreeMap<String, i64>);

impl MonomialKey {
    fn unit() -> Self {
        MonomialKey(BTreeMap::new())
    }

    fn times(&self, other: &MonomialKey) -> MonomialKey {
        let mut merged = self.0.clone();
        for (atom, exp) in &other.0 {
            let entry = merged.entry(atom.clone()).or_insert(0);
            *entry += exp;
            if *entry == 0 {
                merged.remove(atom);
            }
        }
        MonomialKey(merged)
    }
}

/// Sum of monomials with exact rational coefficients.
#[derive(Clone, Debug, PartialEq)]
pub struct PolyForm {
    terms: BTreeMap<MonomialKey, BigRational>,
    atoms: BTreeMap<String, Expr>,
}

impl PolyForm {
    pub fn constant(value: BigRational) -> PolyForm {
        let mut terms = BTreeMap::new();
        if !value.is_zero() {
            terms.insert(MonomialKey::unit(), value);
        }
        PolyForm {
            terms,
            atoms: BTreeMap::new(),
        }
    }

    fn atom(expr: Expr, exp: i64) -> PolyForm {
        let key = expr.to_string();
        let mut monomial = BTreeMap::new();
        monomial.insert(key.clone(), exp);
        let mut atoms = BTreeMap::new();
        atoms.insert(key, expr);
        let mut terms = BTreeMap::new();
        terms.insert(MonomialKey(monomial), BigRational::one());
        PolyForm { terms, atoms }
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    /// The constant value, if the form has no atoms.
    pub fn as_constant(&self) -> Option<BigRational> {
        match self.terms.len() {
            0 => Some(BigRational::zero()),
            1 => self.terms.get(&MonomialKey::unit()).cloned(),
            _ => None,
        }
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    fn add(mut self, other: PolyForm) -> PolyForm {
        for (key, coeff) in other.terms {
            let entry = self.terms.entry(key.clone()).or_insert_with(BigRational::zero);
            *entry += coeff;
            if entry.is_zero() {
                self.terms.remove(&key);
            }
        }
        self.atoms.extend(other.atoms);
        self
    }

    fn scale(mut self, factor: &BigRational) -> PolyForm {
        if factor.is_zero() {
            return PolyForm::constant(BigRational::zero());
        }
        for coeff in self.terms.values_mut() {
            *coeff *= factor;
        }
        self
    }

    fn mul(&self, other: &PolyForm) -> PolyForm {
        let mut result = PolyForm::constant(BigRational::zero());
        for (key_a, coeff_a) in &self.terms {
            for (key_b, coeff_b) in &other.terms {
                let mut single = BTreeMap::new();
                single.insert(key_a.times(key_b), coeff_a * coeff_b);
                result = result.add(PolyForm {
                    terms: single,
                    atoms: BTreeMap::new(),
                });
            }
        }
        result.atoms.extend(self.atoms.clone());
        result.atoms.extend(other.atoms.clone());
        result.fold_roots()
    }

    /// Reduces powers of root atoms `b^(1/q)`: `(b^(1/q))^(k*q + r) = b^k * (b^(1/q))^r`, so
    /// different rational powers of the same base meet on one atom.
    fn fold_roots(self) -> PolyForm {
        let roots: BTreeMap<&String, (BigRational, i64)> = self
            .atoms
            .iter()
            .filter_map(|(key, atom)| root_parts(atom).map(|parts| (key, parts)))
            .collect();
        if roots.is_empty() {
            return self;
        }
        let mut result = PolyForm {
            terms: BTreeMap::new(),
            atoms: self.atoms.clone(),
        };
        for (key, coeff) in &self.terms {
            let mut coeff = coeff.clone();
            let mut monomial = BTreeMap::new();
            for (atom, exp) in &key.0 {
                let Some((base, q)) = roots.get(atom) else {
                    monomial.insert(atom.clone(), *exp);
                    continue;
                };
                match rational_powi(base, exp.div_euclid(*q)) {
                    Some(factor) => {
                        coeff *= factor;
                        let rest = exp.rem_euclid(*q);
                        if rest != 0 {
                            monomial.insert(atom.clone(), rest);
                        }
                    }
                    None => {
                        monomial.insert(atom.clone(), *exp);
                    }
                }
            }
            let mut single = BTreeMap::new();
            single.insert(MonomialKey(monomial), coeff);
            result = result.add(PolyForm {
                terms: single,
                atoms: BTreeMap::new(),
            });
        }
        result
    }

    fn powi(&self, exp: u64) -> PolyForm {
        let mut result = PolyForm::constant(BigRational::one());
        for _ in 0..exp {
            result = result.mul(self);
        }
        result
    }

    /// Inverse of a single monomial; None for sums.
    fn invert_monomial(&self) -> Option<PolyForm> {
        if self.terms.len() != 1 {
            return None;
        }
        let (key, coeff) = self.terms.iter().next()?;
        let inverted = MonomialKey(key.0.iter().map(|(a, e)| (a.clone(), -e)).collect());
        let mut terms = BTreeMap::new();
        terms.insert(inverted, coeff.recip());
        Some(PolyForm {
            terms,
            atoms: self.atoms.clone(),
        })
    }

    fn build_monomial(&self, key: &MonomialKey) -> Expr {
        let mut numerator: Vec<Expr> = Vec::new();
        let mut denominator: Vec<Expr> = Vec::new();
        for (atom_key, exp) in &key.0 {
            let atom = match self.atoms.get(atom_key) {
                Some(atom) => atom.clone(),
                None => Expr::Var(atom_key.clone()),
            };
            let factor = match exp.abs() {
                1 => atom,
                n => atom.pow(Expr::int(n)),
            };
            if *exp > 0 {
                numerator.push(factor);
            } else {
                denominator.push(factor);
            }
        }
        let num = numerator
            .into_iter()
            .reduce(|a, b| a * b)
            .unwrap_or_else(Expr::one);
        match denominator.into_iter().reduce(|a, b| a * b) {
            Some(den) => num / den,
            None => num,
        }
    }

    /// Rebuilds an expression: monomials in key order, constant term first.
    pub fn to_expr(&self) -> Expr {
        let mut result: Option<Expr> = None;
        for (key, coeff) in &self.terms {
            let magnitude = coeff.abs();
            let term = if key.0.is_empty() {
                Expr::Const(magnitude)
            } else if magnitude.is_one() {
                self.build_monomial(key)
            } else {
                Expr::Const(magnitude) * self.build_monomial(key)
            };
            result = Some(match result {
                None if coeff.is_negative() => neg_of(term),
                None => term,
                Some(acc) if coeff.is_negative() => acc - term,
                Some(acc) => acc + term,
            });
        }
        result.unwrap_or_else(Expr::zero)
    }
}

fn atom_of(expr: &Expr) -> PolyForm {
    // arguments of atoms are normalised so that equal atoms get equal keys
    let normalised = expr.map_children(|child| child.expand_normal());
    PolyForm::atom(normalised, 1)
}

/// `b^(1/q)` atom with an integer base b > 1
fn root_atom(base: &BigInt, q: i64) -> Expr {
    Expr::Pow(
        Expr::Const(BigRational::from_integer(base.clone())).boxed(),
        Expr::rational(1, q).boxed(),
    )
}

/// base and root degree of an atom built by `root_atom`
fn root_parts(atom: &Expr) -> Option<(BigRational, i64)> {
    match atom {
        Expr::Pow(base, exp) => match (base.as_ref(), exp.as_ref()) {
            (Expr::Const(b), Expr::Const(e))
                if b.is_integer() && *b > BigRational::one() && e.numer().is_one() =>
            {
                let q = e.denom().to_i64()?;
                (q > 1).then(|| (b.clone(), q))
            }
            _ => None,
        },
        _ => None,
    }
}

/// `c^(p/q)` for a positive rational c as `n^(p/q) * d^(-p/q)` over root atoms; exact roots
/// become constants
fn rational_root_power(c: &BigRational, e: &BigRational) -> Option<PolyForm> {
    if !c.is_positive() {
        return None;
    }
    let p = e.numer().to_i64()?;
    let q = e.denom().to_i64()?;
    let root_exp = BigRational::new(BigInt::one(), e.denom().clone());
    let mut result = PolyForm::constant(BigRational::one());
    for (part, sign) in [(c.numer(), 1), (c.denom(), -1)] {
        if part.is_one() {
            continue;
        }
        let whole = BigRational::from_integer(part.clone());
        let factor = match rational_pow_exact(&whole, &root_exp) {
            Some(root) => PolyForm::constant(rational_powi(&root, sign * p)?),
            None => PolyForm::atom(root_atom(part, q), sign * p),
        };
        result = result.mul(&factor);
    }
    Some(result)
}

fn to_poly(expr: &Expr) -> PolyForm {
    match expr {
        Expr::Const(c) => PolyForm::constant(c.clone()),
        Expr::Add(lhs, rhs) => to_poly(lhs).add(to_poly(rhs)),
        Expr::Sub(lhs, rhs) => to_poly(lhs).add(to_poly(rhs).scale(&-BigRational::one())),
        Expr::Mul(lhs, rhs) => to_poly(lhs).mul(&to_poly(rhs)),
        Expr::Div(lhs, rhs) => {
            let num = to_poly(lhs);
            let den = to_poly(rhs);
            match den.as_constant() {
                Some(c) if !c.is_zero() => num.scale(&c.recip()),
                Some(_) => atom_of(expr),
                None => match den.invert_monomial() {
                    Some(inv) => num.mul(&inv),
                    None => num.mul(&PolyForm::atom(den.to_expr(), -1)),
                },
            }
        }
        Expr::Pow(base, exp) => match exp.as_ref() {
            Expr::Const(e) if e.is_integer() => {
                let n = e.to_i64().unwrap_or(i64::MAX);
                let base_poly = to_poly(base);
                if let Some(b) = base_poly.as_constant() {
                    return match rational_powi(&b, n) {
                        Some(value) => PolyForm::constant(value),
                        None => atom_of(expr),
                    };
                }
                if (0..=MAX_EXPANDED_POWER).contains(&n) {
                    base_poly.powi(n as u64)
                } else if n < 0 && n >= -MAX_EXPANDED_POWER {
                    match base_poly.invert_monomial() {
                        Some(inv) => inv.powi(n.unsigned_abs()),
                        None => PolyForm::atom(base_poly.to_expr(), n),
                    }
                } else {
                    atom_of(expr)
                }
            }
            Expr::Const(e) => match to_poly(base).as_constant() {
                Some(b) => rational_root_power(&b, e).unwrap_or_else(|| atom_of(expr)),
                None => atom_of(expr),
            },
            _ => atom_of(expr),
        },
        _ => atom_of(expr),
    }
}
