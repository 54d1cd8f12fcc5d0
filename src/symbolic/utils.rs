// exact rational helpers shared by the simplifier and the series recursion
use num::integer::Roots;
use num::{BigInt, BigRational, Signed};
use num_traits::{One, Zero};

/// n! as an exact rational
pub fn factorial(n: usize) -> BigRational {
    let mut acc = BigInt::one();
    for i in 2..=n {
        acc *= BigInt::from(i);
    }
    BigRational::from_integer(acc)
}

/// (n+j)!/j! - the falling factorial that maps the j-th Taylor coefficient of y^(n)
/// onto the (n+j)-th coefficient of y
pub fn falling_factorial_ratio(n: usize, j: usize) -> BigRational {
    let mut acc = BigInt::one();
    for i in (j + 1)..=(n + j) {
        acc *= BigInt::from(i);
    }
    BigRational::from_integer(acc)
}

/// base^exp for integer exponents. Returns None for 0^negative.
pub fn rational_powi(base: &BigRational, exp: i64) -> Option<BigRational> {
    if exp < 0 && base.is_zero() {
        return None;
    }
    let mut result = BigRational::one();
    let mut factor = if exp < 0 { base.recip() } else { base.clone() };
    let mut e = exp.unsigned_abs();
    while e > 0 {
        if e & 1 == 1 {
            result *= &factor;
        }
        factor = &factor * &factor;
        e >>= 1;
    }
    Some(result)
}

fn exact_integer_root(value: &BigInt, q: u32) -> Option<BigInt> {
    if value.is_negative() {
        if q % 2 == 0 {
            return None;
        }
        return exact_integer_root(&-value, q).map(|r| -r);
    }
    let root = value.nth_root(q);
    if num::pow(root.clone(), q as usize) == *value {
        Some(root)
    } else {
        None
    }
}

/// base^(p/q) when the result is again rational, e.g. (9/4)^(1/2) = 3/2.
pub fn rational_pow_exact(base: &BigRational, exp: &BigRational) -> Option<BigRational> {
    if exp.is_integer() {
        let e: i64 = num::ToPrimitive::to_i64(exp.numer())?;
        return rational_powi(base, e);
    }
    let q: u32 = num::ToPrimitive::to_u32(exp.denom())?;
    let p: i64 = num::ToPrimitive::to_i64(exp.numer())?;
    let numer = exact_integer_root(base.numer(), q)?;
    let denom = exact_integer_root(base.denom(), q)?;
    rational_powi(&BigRational::new(numer, denom), p)
}
